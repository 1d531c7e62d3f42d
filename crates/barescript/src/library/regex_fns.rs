//! Regex functions.
//!
//! Three flags are surfaced (`i`, `m`, `s`). Capture groups come back as a
//! flat object keyed `"0"`, `"1"`, ... plus any named groups.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    args::{ArgSpec, ArgType, validate_args},
    error::FunctionResult,
    execute::Runtime,
    value::{RegexFlags, RegexValue, Value},
};

use super::LibraryFunction;

pub(super) fn functions(out: &mut Vec<Rc<LibraryFunction>>) {
    out.push(LibraryFunction::new("regexNew", regex_new));
    out.push(LibraryFunction::new("regexTest", regex_test));
    out.push(LibraryFunction::new("regexMatch", regex_match));
    out.push(LibraryFunction::new("regexReplace", regex_replace));
    out.push(LibraryFunction::new("regexSplit", regex_split));
}

/// Replaces every match with the replacement text (`$1`-style group
/// references apply).
fn regex_replace(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("regex").of(ArgType::Regex),
            ArgSpec::new("string").of(ArgType::String),
            ArgSpec::new("replacement").of(ArgType::String),
        ],
        args,
    )?;
    let (Value::Regex(regex), Value::String(text), Value::String(replacement)) = (&bound[0], &bound[1], &bound[2])
    else {
        return Ok(Value::Null);
    };
    let replaced = regex.regex.replace_all(text, replacement.as_ref());
    Ok(Value::string(replaced.into_owned()))
}

/// Splits the string on each non-empty match.
fn regex_split(runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("regex").of(ArgType::Regex),
            ArgSpec::new("string").of(ArgType::String),
        ],
        args,
    )?;
    let (Value::Regex(regex), Value::String(text)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    let mut parts = Vec::new();
    let mut last = 0;
    loop {
        match regex.regex.find_from_pos(text, last) {
            Ok(Some(found)) if found.end() > found.start() => {
                parts.push(Value::string(&text[last..found.start()]));
                last = found.end();
            }
            Ok(_) => break,
            Err(error) => {
                runtime.log_debug(&format!("BareScript: Function \"regexSplit\" failed, {error}"));
                return Ok(Value::Null);
            }
        }
    }
    parts.push(Value::string(&text[last..]));
    Ok(Value::array(parts))
}

fn regex_new(runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("pattern").of(ArgType::String),
            ArgSpec::new("flags").of(ArgType::String).nullable(),
        ],
        args,
    )?;
    let Value::String(pattern) = &bound[0] else {
        return Ok(Value::Null);
    };
    let mut flags = RegexFlags::default();
    if let Value::String(letters) = &bound[1] {
        flags.case_insensitive = letters.contains('i');
        flags.multi_line = letters.contains('m');
        flags.dot_matches_newline = letters.contains('s');
    }
    match RegexValue::compile(pattern, flags) {
        Ok(regex) => Ok(Value::Regex(regex)),
        Err(error) => {
            runtime.log_debug(&format!("BareScript: Function \"regexNew\" failed, {error}"));
            Ok(Value::Null)
        }
    }
}

fn regex_test(runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("regex").of(ArgType::Regex),
            ArgSpec::new("string").of(ArgType::String),
        ],
        args,
    )?;
    let (Value::Regex(regex), Value::String(text)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    match regex.regex.is_match(text) {
        Ok(matched) => Ok(Value::Bool(matched)),
        Err(error) => {
            runtime.log_debug(&format!("BareScript: Function \"regexTest\" failed, {error}"));
            Ok(Value::Null)
        }
    }
}

fn regex_match(runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("regex").of(ArgType::Regex),
            ArgSpec::new("string").of(ArgType::String),
        ],
        args,
    )?;
    let (Value::Regex(regex), Value::String(text)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    let captures = match regex.regex.captures(text) {
        Ok(captures) => captures,
        Err(error) => {
            runtime.log_debug(&format!("BareScript: Function \"regexMatch\" failed, {error}"));
            return Ok(Value::Null);
        }
    };
    let Some(captures) = captures else {
        return Ok(Value::Null);
    };
    let mut groups = IndexMap::new();
    for index in 0..captures.len() {
        let value = captures
            .get(index)
            .map_or(Value::Null, |group| Value::string(group.as_str()));
        groups.insert(index.to_string(), value);
    }
    for name in regex.regex.capture_names().flatten() {
        let value = captures
            .name(name)
            .map_or(Value::Null, |group| Value::string(group.as_str()));
        groups.insert(name.to_owned(), value);
    }
    Ok(Value::object(groups))
}
