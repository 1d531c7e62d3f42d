//! Statement coverage recording.
//!
//! Coverage lives on globals under the reserved `__bareScriptCoverage`
//! object so user scripts and host code observe it with ordinary object
//! operations:
//!
//! ```text
//! {enabled: true, scripts: {<name>: {script, covered: {<line>: {statement, count}}}}}
//! ```
//!
//! Every executed statement increments its line's count; a jump target is
//! counted when landed on. System include scripts are excluded.

use indexmap::IndexMap;

use crate::{
    model::{ScriptInfo, Statement},
    value::{Value, ValueObject},
};

/// Reserved globals key holding the coverage table.
pub const COVERAGE_GLOBAL: &str = "__bareScriptCoverage";

/// Records one executed statement, when coverage is enabled.
pub(crate) fn record(globals: &ValueObject, script: &ScriptInfo, statement: &Statement) {
    let coverage = match globals.borrow().get(COVERAGE_GLOBAL) {
        Some(Value::Object(coverage)) => coverage.clone(),
        _ => return,
    };
    let enabled = coverage.borrow().get("enabled").is_some_and(Value::is_truthy);
    if !enabled {
        return;
    }

    let scripts = match coverage
        .borrow_mut()
        .entry("scripts".to_owned())
        .or_insert_with(Value::empty_object)
    {
        Value::Object(scripts) => scripts.clone(),
        _ => return,
    };

    let line_number = statement.line_number();
    let entry = match scripts
        .borrow_mut()
        .entry(script.display_name().to_owned())
        .or_insert_with(|| script_entry(script))
    {
        Value::Object(entry) => entry.clone(),
        _ => return,
    };
    let covered = match entry.borrow_mut().entry("covered".to_owned()).or_insert_with(Value::empty_object) {
        Value::Object(covered) => covered.clone(),
        _ => return,
    };

    let mut covered = covered.borrow_mut();
    if let Value::Object(line) = covered
        .entry(line_number.to_string())
        .or_insert_with(|| line_entry(script, line_number))
    {
        let mut line = line.borrow_mut();
        let count = match line.get("count") {
            Some(Value::Number(count)) => *count,
            _ => 0.0,
        };
        line.insert("count".to_owned(), Value::Number(count + 1.0));
    }
}

fn script_entry(script: &ScriptInfo) -> Value {
    let mut entry = IndexMap::new();
    let text = script
        .lines
        .as_ref()
        .map_or(Value::Null, |lines| Value::string(lines.join("\n")));
    entry.insert("script".to_owned(), text);
    entry.insert("covered".to_owned(), Value::empty_object());
    Value::object(entry)
}

fn line_entry(script: &ScriptInfo, line_number: usize) -> Value {
    let mut entry = IndexMap::new();
    let statement = script
        .lines
        .as_ref()
        .and_then(|lines| lines.get(line_number.saturating_sub(1)))
        .map_or(Value::Null, |line| Value::string(line.trim()));
    entry.insert("statement".to_owned(), statement);
    entry.insert("count".to_owned(), Value::Number(0.0));
    Value::object(entry)
}
