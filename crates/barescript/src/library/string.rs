//! String functions backing the text expression aliases.

use std::rc::Rc;

use crate::{
    args::{ArgSpec, ArgType, validate_args},
    error::FunctionResult,
    execute::Runtime,
    value::Value,
};

use super::LibraryFunction;

pub(super) fn functions(out: &mut Vec<Rc<LibraryFunction>>) {
    out.push(LibraryFunction::new("stringLength", string_length));
    out.push(LibraryFunction::new("stringLower", |runtime, args| {
        text_fn(runtime, args, str::to_lowercase)
    }));
    out.push(LibraryFunction::new("stringUpper", |runtime, args| {
        text_fn(runtime, args, str::to_uppercase)
    }));
    out.push(LibraryFunction::new("stringTrim", |runtime, args| {
        text_fn(runtime, args, |text| text.trim().to_owned())
    }));
    out.push(LibraryFunction::new("stringSlice", string_slice));
    out.push(LibraryFunction::new("stringSplit", string_split));
    out.push(LibraryFunction::new("stringIndexOf", string_index_of));
    out.push(LibraryFunction::new("stringStartsWith", string_starts_with));
    out.push(LibraryFunction::new("stringEndsWith", string_ends_with));
    out.push(LibraryFunction::new("stringReplace", string_replace));
    out.push(LibraryFunction::new("stringRepeat", string_repeat));
    out.push(LibraryFunction::new("stringCharCodeAt", string_char_code_at));
    out.push(LibraryFunction::new("stringFromCharCode", string_from_char_code));
}

/// Character index of the first occurrence of `search` from `index` on,
/// or -1.
fn string_index_of(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("string").of(ArgType::String),
            ArgSpec::new("search").of(ArgType::String),
            ArgSpec::new("index")
                .of(ArgType::Number)
                .integer()
                .gte(0.0)
                .default_value(Value::Number(0.0)),
        ],
        args,
    )
    .map_err(|error| error.with_return_value(Value::Number(-1.0)))?;
    let (Value::String(text), Value::String(search), Value::Number(start)) = (&bound[0], &bound[1], &bound[2]) else {
        return Ok(Value::Number(-1.0));
    };
    let chars: Vec<char> = text.chars().collect();
    let needle: Vec<char> = search.chars().collect();
    let start = (*start as usize).min(chars.len());
    for index in start..=chars.len().saturating_sub(needle.len()) {
        if chars[index..].starts_with(&needle) {
            return Ok(Value::Number(index as f64));
        }
    }
    Ok(Value::Number(-1.0))
}

fn string_starts_with(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("string").of(ArgType::String),
            ArgSpec::new("search").of(ArgType::String),
        ],
        args,
    )?;
    let (Value::String(text), Value::String(search)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    Ok(Value::Bool(text.starts_with(search.as_ref())))
}

fn string_ends_with(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("string").of(ArgType::String),
            ArgSpec::new("search").of(ArgType::String),
        ],
        args,
    )?;
    let (Value::String(text), Value::String(search)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    Ok(Value::Bool(text.ends_with(search.as_ref())))
}

/// Replaces every occurrence of `search` with `replacement`.
fn string_replace(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("string").of(ArgType::String),
            ArgSpec::new("search").of(ArgType::String),
            ArgSpec::new("replacement").of(ArgType::String),
        ],
        args,
    )?;
    let (Value::String(text), Value::String(search), Value::String(replacement)) = (&bound[0], &bound[1], &bound[2])
    else {
        return Ok(Value::Null);
    };
    Ok(Value::string(text.replace(search.as_ref(), replacement)))
}

fn string_repeat(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("string").of(ArgType::String),
            ArgSpec::new("count").of(ArgType::Number).integer().gte(0.0),
        ],
        args,
    )?;
    let (Value::String(text), Value::Number(count)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    Ok(Value::string(text.repeat(*count as usize)))
}

fn string_char_code_at(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("string").of(ArgType::String),
            ArgSpec::new("index")
                .of(ArgType::Number)
                .integer()
                .gte(0.0)
                .default_value(Value::Number(0.0)),
        ],
        args,
    )?;
    let (Value::String(text), Value::Number(index)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    let code = text.chars().nth(*index as usize).map(|ch| f64::from(u32::from(ch)));
    Ok(code.map_or(Value::Null, Value::Number))
}

fn string_from_char_code(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("codes").last_arg_array()], args)?;
    let Value::Array(codes) = &bound[0] else {
        return Ok(Value::Null);
    };
    let mut text = String::new();
    for code in codes.borrow().iter() {
        let Value::Number(code) = code else {
            return Ok(Value::Null);
        };
        match u32::try_from(*code as i64).ok().and_then(char::from_u32) {
            Some(ch) => text.push(ch),
            None => return Ok(Value::Null),
        }
    }
    Ok(Value::string(text))
}

fn text_fn(_runtime: &mut Runtime, args: Vec<Value>, apply: fn(&str) -> String) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("string").of(ArgType::String)], args)?;
    let Value::String(text) = &bound[0] else {
        return Ok(Value::Null);
    };
    Ok(Value::string(apply(text)))
}

fn string_length(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("string").of(ArgType::String)], args)?;
    let Value::String(text) = &bound[0] else {
        return Ok(Value::Null);
    };
    Ok(Value::Number(text.chars().count() as f64))
}

/// Substring by character positions, clamped to the string's bounds; the end
/// defaults to the string length.
fn string_slice(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("string").of(ArgType::String),
            ArgSpec::new("begin").of(ArgType::Number).integer().gte(0.0),
            ArgSpec::new("end").of(ArgType::Number).integer().gte(0.0).nullable(),
        ],
        args,
    )?;
    let (Value::String(text), Value::Number(begin)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    let chars: Vec<char> = text.chars().collect();
    let begin = (*begin as usize).min(chars.len());
    let end = match bound[2] {
        Value::Number(end) => (end as usize).clamp(begin, chars.len()),
        _ => chars.len(),
    };
    Ok(Value::string(chars[begin..end].iter().collect::<String>()))
}

fn string_split(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("string").of(ArgType::String),
            ArgSpec::new("separator").of(ArgType::String),
        ],
        args,
    )?;
    let (Value::String(text), Value::String(separator)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    let parts = text.split(separator.as_ref()).map(Value::from).collect();
    Ok(Value::array(parts))
}
