//! Number formatting and parsing functions.

use std::rc::Rc;

use crate::{
    args::{ArgSpec, ArgType, validate_args},
    error::FunctionResult,
    execute::Runtime,
    value::{Value, parse_integer, parse_number},
};

use super::LibraryFunction;

pub(super) fn functions(out: &mut Vec<Rc<LibraryFunction>>) {
    out.push(LibraryFunction::new("numberToFixed", number_to_fixed));
    out.push(LibraryFunction::new("numberParseFloat", number_parse_float));
    out.push(LibraryFunction::new("numberParseInt", number_parse_int));
}

/// Fixed-point rendering with the given number of fraction digits
/// (defaulting to two), optionally trimming trailing zeros.
fn number_to_fixed(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("number").of(ArgType::Number),
            ArgSpec::new("digits")
                .of(ArgType::Number)
                .integer()
                .gte(0.0)
                .default_value(Value::Number(2.0)),
            ArgSpec::new("trim").of(ArgType::Boolean),
        ],
        args,
    )?;
    let (Value::Number(number), Value::Number(digits), Value::Bool(trim)) = (&bound[0], &bound[1], &bound[2]) else {
        return Ok(Value::Null);
    };
    let mut text = format!("{:.*}", *digits as usize, number);
    if *trim && text.contains('.') {
        text = text.trim_end_matches('0').trim_end_matches('.').to_owned();
    }
    Ok(Value::string(text))
}

fn number_parse_float(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("string").of(ArgType::String)], args)?;
    let Value::String(text) = &bound[0] else {
        return Ok(Value::Null);
    };
    Ok(parse_number(text).map_or(Value::Null, Value::Number))
}

fn number_parse_int(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("string").of(ArgType::String),
            ArgSpec::new("radix")
                .of(ArgType::Number)
                .integer()
                .gte(2.0)
                .lte(36.0)
                .default_value(Value::Number(10.0)),
        ],
        args,
    )?;
    let (Value::String(text), Value::Number(radix)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    Ok(parse_integer(text, *radix as u32).map_or(Value::Null, Value::Number))
}
