//! Math functions backing the arithmetic expression aliases.

use std::rc::Rc;

use crate::{
    args::{ArgSpec, ArgType, validate_args},
    error::FunctionResult,
    execute::Runtime,
    value::Value,
};

use super::LibraryFunction;

pub(super) fn functions(out: &mut Vec<Rc<LibraryFunction>>) {
    out.push(LibraryFunction::new("mathAbs", |runtime, args| {
        number_fn(runtime, args, f64::abs)
    }));
    out.push(LibraryFunction::new("mathCeil", |runtime, args| {
        number_fn(runtime, args, f64::ceil)
    }));
    out.push(LibraryFunction::new("mathFloor", |runtime, args| {
        number_fn(runtime, args, f64::floor)
    }));
    out.push(LibraryFunction::new("mathRound", |runtime, args| {
        number_fn(runtime, args, f64::round)
    }));
    out.push(LibraryFunction::new("mathSqrt", |runtime, args| {
        number_fn(runtime, args, f64::sqrt)
    }));
    out.push(LibraryFunction::new("mathLn", |runtime, args| {
        number_fn(runtime, args, f64::ln)
    }));
    out.push(LibraryFunction::new("mathExp", |runtime, args| {
        number_fn(runtime, args, f64::exp)
    }));
    out.push(LibraryFunction::new("mathSign", |runtime, args| {
        number_fn(runtime, args, |number| {
            if number == 0.0 { 0.0 } else { number.signum() }
        })
    }));
    out.push(LibraryFunction::new("mathLog", math_log));
    out.push(LibraryFunction::new("mathPi", |_runtime, args| {
        validate_args(&[], args)?;
        Ok(Value::Number(std::f64::consts::PI))
    }));
    out.push(LibraryFunction::new("mathE", |_runtime, args| {
        validate_args(&[], args)?;
        Ok(Value::Number(std::f64::consts::E))
    }));
    out.push(LibraryFunction::new("mathMax", math_max));
    out.push(LibraryFunction::new("mathMin", math_min));
}

/// Logarithm of `number` in `base`, defaulting to base 10.
fn math_log(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("number").of(ArgType::Number).gt(0.0),
            ArgSpec::new("base")
                .of(ArgType::Number)
                .gt(0.0)
                .default_value(Value::Number(10.0)),
        ],
        args,
    )?;
    let (Value::Number(number), Value::Number(base)) = (&bound[0], &bound[1]) else {
        return Ok(Value::Null);
    };
    // the dedicated base-10 and base-2 forms are exact on exact powers
    let result = if *base == 10.0 {
        number.log10()
    } else if *base == 2.0 {
        number.log2()
    } else {
        number.log(*base)
    };
    Ok(Value::Number(result))
}

fn number_fn(_runtime: &mut Runtime, args: Vec<Value>, apply: fn(f64) -> f64) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("number").of(ArgType::Number)], args)?;
    let Value::Number(number) = bound[0] else {
        return Ok(Value::Null);
    };
    Ok(Value::Number(apply(number)))
}

fn math_max(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("values").last_arg_array()], args)?;
    Ok(extreme(&bound[0], std::cmp::Ordering::Greater))
}

fn math_min(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("values").last_arg_array()], args)?;
    Ok(extreme(&bound[0], std::cmp::Ordering::Less))
}

fn extreme(values: &Value, keep: std::cmp::Ordering) -> Value {
    let Value::Array(values) = values else {
        return Value::Null;
    };
    let values = values.borrow();
    let mut best: Option<&Value> = None;
    for value in values.iter() {
        match best {
            Some(current) if value.compare(current) != keep => {}
            _ => best = Some(value),
        }
    }
    best.cloned().unwrap_or(Value::Null)
}
