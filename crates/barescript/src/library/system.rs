//! The system function group: type introspection, globals access, logging,
//! and the async fetch family.

use std::rc::Rc;

use crate::{
    args::{ArgSpec, ArgType, validate_args},
    error::FunctionResult,
    execute::Runtime,
    options::FetchRequest,
    value::{FunctionValue, Value},
};

use super::LibraryFunction;

pub(super) fn functions(out: &mut Vec<Rc<LibraryFunction>>) {
    out.push(LibraryFunction::new("systemBoolean", system_boolean));
    out.push(LibraryFunction::new("systemCompare", system_compare));
    out.push(LibraryFunction::new("systemIs", system_is));
    out.push(LibraryFunction::new("systemType", system_type));
    out.push(LibraryFunction::new("systemText", system_text));
    out.push(LibraryFunction::new("systemGlobalGet", system_global_get));
    out.push(LibraryFunction::new("systemGlobalSet", system_global_set));
    out.push(LibraryFunction::new("systemLog", system_log));
    out.push(LibraryFunction::new("systemLogDebug", system_log_debug));
    out.push(LibraryFunction::new_async("systemFetch", system_fetch));
}

fn system_boolean(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("value")], args)?;
    Ok(Value::Bool(bound[0].is_truthy()))
}

fn system_compare(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("left"), ArgSpec::new("right")], args)?;
    let ordering = bound[0].compare(&bound[1]);
    Ok(Value::Number(f64::from(ordering as i8)))
}

/// Reference identity for the shared kinds, bitwise value identity for the
/// primitives. Unlike `==`, NaN is not itself and equal-content arrays are
/// not the same array.
fn system_is(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("left"), ArgSpec::new("right")], args)?;
    let same = match (&bound[0], &bound[1]) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::Datetime(a), Value::Datetime(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
        (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
        (Value::Regex(a), Value::Regex(b)) => Rc::ptr_eq(a, b),
        (Value::Function(FunctionValue::Script(a)), Value::Function(FunctionValue::Script(b))) => Rc::ptr_eq(a, b),
        (Value::Function(FunctionValue::Library(a)), Value::Function(FunctionValue::Library(b))) => Rc::ptr_eq(a, b),
        _ => false,
    };
    Ok(Value::Bool(same))
}

/// The canonical string form of any value.
fn system_text(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("value")], args)?;
    Ok(Value::string(bound[0].to_display_string()))
}

fn system_type(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("value")], args)?;
    let name: &'static str = bound[0].type_of().into();
    Ok(Value::string(name))
}

fn system_global_get(runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[ArgSpec::new("name").of(ArgType::String), ArgSpec::new("defaultValue")],
        args,
    )?;
    let Value::String(name) = &bound[0] else {
        return Ok(Value::Null);
    };
    let value = runtime.globals().borrow().get(name.as_ref()).cloned();
    Ok(value.unwrap_or_else(|| bound[1].clone()))
}

fn system_global_set(runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("name").of(ArgType::String), ArgSpec::new("value")], args)?;
    let Value::String(name) = &bound[0] else {
        return Ok(Value::Null);
    };
    runtime.globals().borrow_mut().insert(name.to_string(), bound[1].clone());
    Ok(bound[1].clone())
}

fn system_log(runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("message")], args)?;
    runtime.log(&bound[0].to_display_string());
    Ok(Value::Null)
}

fn system_log_debug(runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("message")], args)?;
    runtime.log_debug(&bound[0].to_display_string());
    Ok(Value::Null)
}

/// Fetches one URL or an array of URLs. Array fetches are observed in
/// positional order; an individual failure logs and yields null for that
/// position rather than halting the script.
fn system_fetch(runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("url")], args)?;
    match &bound[0] {
        Value::Array(urls) => {
            let requests: Vec<Value> = urls.borrow().clone();
            let mut responses = Vec::with_capacity(requests.len());
            for request in &requests {
                responses.push(fetch_one(runtime, request));
            }
            Ok(Value::array(responses))
        }
        other => Ok(fetch_one(runtime, other)),
    }
}

fn fetch_one(runtime: &mut Runtime, request: &Value) -> Value {
    let request = match request {
        Value::String(url) => FetchRequest::get(url.to_string()),
        Value::Object(entries) => {
            let entries = entries.borrow();
            let Some(Value::String(url)) = entries.get("url") else {
                return Value::Null;
            };
            let body = match entries.get("body") {
                Some(Value::String(body)) => Some(body.to_string()),
                _ => None,
            };
            let mut headers = Vec::new();
            if let Some(Value::Object(map)) = entries.get("headers") {
                for (name, value) in map.borrow().iter() {
                    headers.push((name.clone(), value.to_display_string()));
                }
            }
            FetchRequest {
                url: url.to_string(),
                body,
                headers,
            }
        }
        _ => return Value::Null,
    };
    match runtime.fetch(&request) {
        Ok(response) if response.ok() => Value::string(response.body),
        Ok(response) => {
            runtime.log_debug(&format!(
                "BareScript: Function \"systemFetch\" failed for URL \"{}\" with status {}",
                request.url, response.status
            ));
            Value::Null
        }
        Err(error) => {
            runtime.log_debug(&format!(
                "BareScript: Function \"systemFetch\" failed for URL \"{}\", {error}",
                request.url
            ));
            Value::Null
        }
    }
}
