//! Array, object, and JSON functions.
//!
//! `arrayNew`, `arrayLength`, `arrayGet`, and `objectNew` are load-bearing:
//! the parser desugars `for` loops and array/object literals into calls to
//! them.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    args::{ArgSpec, ArgType, validate_args},
    error::{ArgsError, FunctionResult},
    execute::Runtime,
    value::Value,
};

use super::LibraryFunction;

pub(super) fn functions(out: &mut Vec<Rc<LibraryFunction>>) {
    out.push(LibraryFunction::new("arrayNew", array_new));
    out.push(LibraryFunction::new("arrayLength", array_length));
    out.push(LibraryFunction::new("arrayGet", array_get));
    out.push(LibraryFunction::new("arraySet", array_set));
    out.push(LibraryFunction::new("arrayPush", array_push));
    out.push(LibraryFunction::new("arrayPop", array_pop));
    out.push(LibraryFunction::new("arrayIndexOf", array_index_of));
    out.push(LibraryFunction::new("arrayJoin", array_join));
    out.push(LibraryFunction::new("arraySlice", array_slice));
    out.push(LibraryFunction::new("arraySort", array_sort));
    out.push(LibraryFunction::new("arrayCopy", array_copy));
    out.push(LibraryFunction::new("arrayExtend", array_extend));
    out.push(LibraryFunction::new("objectNew", object_new));
    out.push(LibraryFunction::new("objectGet", object_get));
    out.push(LibraryFunction::new("objectSet", object_set));
    out.push(LibraryFunction::new("objectHas", object_has));
    out.push(LibraryFunction::new("objectKeys", object_keys));
    out.push(LibraryFunction::new("objectDelete", object_delete));
    out.push(LibraryFunction::new("objectCopy", object_copy));
    out.push(LibraryFunction::new("objectAssign", object_assign));
    out.push(LibraryFunction::new("jsonStringify", json_stringify));
    out.push(LibraryFunction::new("jsonParse", json_parse));
}

fn array_new(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    Ok(Value::array(args))
}

fn array_length(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("array").of(ArgType::Array)], args)?;
    let Value::Array(values) = &bound[0] else {
        return Ok(Value::Null);
    };
    Ok(Value::Number(values.borrow().len() as f64))
}

fn array_get(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("array").of(ArgType::Array),
            ArgSpec::new("index").of(ArgType::Number).integer().gte(0.0),
        ],
        args,
    )?;
    let (Value::Array(values), Value::Number(index)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    let values = values.borrow();
    values
        .get(*index as usize)
        .cloned()
        .ok_or_else(|| ArgsError::new(format!("Invalid \"index\" argument value, {index}")).into())
}

fn array_set(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("array").of(ArgType::Array),
            ArgSpec::new("index").of(ArgType::Number).integer().gte(0.0),
            ArgSpec::new("value"),
        ],
        args,
    )?;
    let (Value::Array(values), Value::Number(index)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    let mut values = values.borrow_mut();
    let slot = values
        .get_mut(*index as usize)
        .ok_or_else(|| ArgsError::new(format!("Invalid \"index\" argument value, {index}")))?;
    slot.clone_from(&bound[2]);
    Ok(bound[2].clone())
}

fn array_push(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("array").of(ArgType::Array),
            ArgSpec::new("values").last_arg_array(),
        ],
        args,
    )?;
    let (Value::Array(values), Value::Array(pushed)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    values.borrow_mut().extend(pushed.borrow().iter().cloned());
    Ok(bound[0].clone())
}

fn array_pop(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("array").of(ArgType::Array)], args)?;
    let Value::Array(values) = &bound[0] else {
        return Ok(Value::Null);
    };
    let popped = values.borrow_mut().pop();
    popped.ok_or_else(|| ArgsError::new("Invalid \"array\" argument value, []").into())
}

/// Index of the first element equal to `value` from `index` on, or -1.
fn array_index_of(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("array").of(ArgType::Array),
            ArgSpec::new("value"),
            ArgSpec::new("index")
                .of(ArgType::Number)
                .integer()
                .gte(0.0)
                .default_value(Value::Number(0.0)),
        ],
        args,
    )
    .map_err(|error| error.with_return_value(Value::Number(-1.0)))?;
    let (Value::Array(values), Value::Number(start)) = (&bound[0], &bound[2]) else {
        return Ok(Value::Number(-1.0));
    };
    let values = values.borrow();
    let found = values
        .iter()
        .enumerate()
        .skip(*start as usize)
        .find(|(_, value)| **value == bound[1]);
    Ok(Value::Number(found.map_or(-1.0, |(index, _)| index as f64)))
}

fn array_join(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("array").of(ArgType::Array),
            ArgSpec::new("separator").of(ArgType::String),
        ],
        args,
    )?;
    let (Value::Array(values), Value::String(separator)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    let parts: Vec<String> = values.borrow().iter().map(Value::to_display_string).collect();
    Ok(Value::string(parts.join(separator)))
}

/// A new array of the elements from `start` up to `end` (defaulting to the
/// array length), clamped to the array's bounds.
fn array_slice(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("array").of(ArgType::Array),
            ArgSpec::new("start")
                .of(ArgType::Number)
                .integer()
                .gte(0.0)
                .default_value(Value::Number(0.0)),
            ArgSpec::new("end").of(ArgType::Number).integer().gte(0.0).nullable(),
        ],
        args,
    )?;
    let (Value::Array(values), Value::Number(start)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    let values = values.borrow();
    let start = (*start as usize).min(values.len());
    let end = match bound[2] {
        Value::Number(end) => (end as usize).clamp(start, values.len()),
        _ => values.len(),
    };
    Ok(Value::array(values[start..end].to_vec()))
}

/// Sorts the array in place by the total value order, descending on request,
/// and returns it.
fn array_sort(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("array").of(ArgType::Array),
            ArgSpec::new("descending").of(ArgType::Boolean),
        ],
        args,
    )?;
    let (Value::Array(values), Value::Bool(descending)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    let mut sorted = values.borrow_mut();
    sorted.sort_by(|a, b| if *descending { b.compare(a) } else { a.compare(b) });
    drop(sorted);
    Ok(bound[0].clone())
}

/// A shallow copy: a new array sharing the element values.
fn array_copy(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("array").of(ArgType::Array)], args)?;
    let Value::Array(values) = &bound[0] else {
        return Ok(Value::Null);
    };
    Ok(Value::array(values.borrow().clone()))
}

fn array_extend(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("array").of(ArgType::Array),
            ArgSpec::new("values").of(ArgType::Array),
        ],
        args,
    )?;
    let (Value::Array(values), Value::Array(added)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    let added: Vec<Value> = added.borrow().clone();
    values.borrow_mut().extend(added);
    Ok(bound[0].clone())
}

fn object_new(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let mut entries = IndexMap::new();
    let mut pairs = args.into_iter();
    while let Some(key) = pairs.next() {
        let value = pairs.next().unwrap_or(Value::Null);
        entries.insert(key.to_display_string(), value);
    }
    Ok(Value::object(entries))
}

fn object_get(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    // validation failures yield the caller-provided default
    let default = args.get(2).cloned().unwrap_or(Value::Null);
    let bound = validate_args(
        &[
            ArgSpec::new("object").of(ArgType::Object),
            ArgSpec::new("key").of(ArgType::String),
            ArgSpec::new("defaultValue"),
        ],
        args,
    )
    .map_err(|error| error.with_return_value(default.clone()))?;
    let (Value::Object(entries), Value::String(key)) = (&bound[0], &bound[1]) else {
        return Ok(default);
    };
    let entries = entries.borrow();
    Ok(entries.get(key.as_ref()).cloned().unwrap_or(default))
}

fn object_set(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("object").of(ArgType::Object),
            ArgSpec::new("key").of(ArgType::String),
            ArgSpec::new("value"),
        ],
        args,
    )?;
    let (Value::Object(entries), Value::String(key)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    entries.borrow_mut().insert(key.to_string(), bound[2].clone());
    Ok(bound[2].clone())
}

fn object_has(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("object").of(ArgType::Object),
            ArgSpec::new("key").of(ArgType::String),
        ],
        args,
    )?;
    let (Value::Object(entries), Value::String(key)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    let has = entries.borrow().contains_key(key.as_ref());
    Ok(Value::Bool(has))
}

fn object_keys(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("object").of(ArgType::Object)], args)?;
    let Value::Object(entries) = &bound[0] else {
        return Ok(Value::Null);
    };
    let keys = entries.borrow().keys().map(|key| Value::string(key.as_str())).collect();
    Ok(Value::array(keys))
}

fn object_delete(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("object").of(ArgType::Object),
            ArgSpec::new("key").of(ArgType::String),
        ],
        args,
    )?;
    let (Value::Object(entries), Value::String(key)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    // preserves the insertion order of the remaining entries
    let removed = entries.borrow_mut().shift_remove(key.as_ref());
    Ok(removed.unwrap_or(Value::Null))
}

/// A shallow copy: a new object sharing the entry values.
fn object_copy(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("object").of(ArgType::Object)], args)?;
    let Value::Object(entries) = &bound[0] else {
        return Ok(Value::Null);
    };
    Ok(Value::object(entries.borrow().clone()))
}

/// Copies the second object's entries into the first, overwriting existing
/// keys, and returns the first.
fn object_assign(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("object").of(ArgType::Object),
            ArgSpec::new("object2").of(ArgType::Object),
        ],
        args,
    )?;
    let (Value::Object(entries), Value::Object(added)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    let added: Vec<(String, Value)> = added
        .borrow()
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    let mut entries = entries.borrow_mut();
    for (key, value) in added {
        entries.insert(key, value);
    }
    drop(entries);
    Ok(bound[0].clone())
}

fn json_stringify(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("value"),
            ArgSpec::new("indent").of(ArgType::Number).integer().gte(1.0).nullable(),
        ],
        args,
    )?;
    let indent = match bound[1] {
        Value::Number(indent) => Some(indent as usize),
        _ => None,
    };
    Ok(Value::string(bound[0].to_json(indent)))
}

fn json_parse(runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("text").of(ArgType::String)], args)?;
    let Value::String(text) = &bound[0] else {
        return Ok(Value::Null);
    };
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(parsed) => Ok(from_json(parsed)),
        Err(error) => {
            runtime.log_debug(&format!("BareScript: Function \"jsonParse\" failed, {error}"));
            Ok(Value::Null)
        }
    }
}

fn from_json(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(value) => Value::Bool(value),
        serde_json::Value::Number(value) => Value::Number(value.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(value) => Value::string(value),
        serde_json::Value::Array(values) => Value::array(values.into_iter().map(from_json).collect()),
        serde_json::Value::Object(entries) => {
            Value::object(entries.into_iter().map(|(key, value)| (key, from_json(value))).collect())
        }
    }
}
