//! Datetime functions: construction and local-wallclock accessors.

use std::rc::Rc;

use chrono::{Datelike, Local, TimeZone, Timelike};

use crate::{
    args::{ArgSpec, ArgType, validate_args},
    error::FunctionResult,
    execute::Runtime,
    value::{Value, parse_datetime},
};

use super::LibraryFunction;

pub(super) fn functions(out: &mut Vec<Rc<LibraryFunction>>) {
    out.push(LibraryFunction::new("datetimeNew", datetime_new));
    out.push(LibraryFunction::new("datetimeNow", datetime_now));
    out.push(LibraryFunction::new("datetimeToday", datetime_today));
    out.push(LibraryFunction::new("datetimeISOFormat", datetime_iso_format));
    out.push(LibraryFunction::new("datetimeISOParse", datetime_iso_parse));
    out.push(LibraryFunction::new("datetimeYear", |runtime, args| {
        accessor(runtime, args, |datetime| f64::from(datetime.year()))
    }));
    out.push(LibraryFunction::new("datetimeMonth", |runtime, args| {
        accessor(runtime, args, |datetime| f64::from(datetime.month()))
    }));
    out.push(LibraryFunction::new("datetimeDay", |runtime, args| {
        accessor(runtime, args, |datetime| f64::from(datetime.day()))
    }));
    out.push(LibraryFunction::new("datetimeHour", |runtime, args| {
        accessor(runtime, args, |datetime| f64::from(datetime.hour()))
    }));
    out.push(LibraryFunction::new("datetimeMinute", |runtime, args| {
        accessor(runtime, args, |datetime| f64::from(datetime.minute()))
    }));
    out.push(LibraryFunction::new("datetimeSecond", |runtime, args| {
        accessor(runtime, args, |datetime| f64::from(datetime.second()))
    }));
    out.push(LibraryFunction::new("datetimeMillisecond", |runtime, args| {
        accessor(runtime, args, |datetime| f64::from(datetime.timestamp_subsec_millis()))
    }));
}

fn accessor(
    _runtime: &mut Runtime,
    args: Vec<Value>,
    read: fn(&chrono::DateTime<Local>) -> f64,
) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("datetime").of(ArgType::Datetime)], args)?;
    let Value::Datetime(datetime) = &bound[0] else {
        return Ok(Value::Null);
    };
    Ok(Value::Number(read(datetime)))
}

/// A local datetime from wallclock components; null when the components do
/// not name a real instant.
fn datetime_new(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(
        &[
            ArgSpec::new("year").of(ArgType::Number).integer(),
            ArgSpec::new("month").of(ArgType::Number).integer().gte(1.0).lte(12.0),
            ArgSpec::new("day").of(ArgType::Number).integer().gte(1.0).lte(31.0),
            ArgSpec::new("hour")
                .of(ArgType::Number)
                .integer()
                .gte(0.0)
                .lte(23.0)
                .default_value(Value::Number(0.0)),
            ArgSpec::new("minute")
                .of(ArgType::Number)
                .integer()
                .gte(0.0)
                .lte(59.0)
                .default_value(Value::Number(0.0)),
            ArgSpec::new("second")
                .of(ArgType::Number)
                .integer()
                .gte(0.0)
                .lte(59.0)
                .default_value(Value::Number(0.0)),
            ArgSpec::new("millisecond")
                .of(ArgType::Number)
                .integer()
                .gte(0.0)
                .lte(999.0)
                .default_value(Value::Number(0.0)),
        ],
        args,
    )?;
    let component = |index: usize| match bound[index] {
        Value::Number(value) => value as u32,
        _ => 0,
    };
    let Value::Number(year) = bound[0] else {
        return Ok(Value::Null);
    };
    let datetime = chrono::NaiveDate::from_ymd_opt(year as i32, component(1), component(2))
        .and_then(|date| date.and_hms_milli_opt(component(3), component(4), component(5), component(6)))
        .and_then(|naive| Local.from_local_datetime(&naive).single());
    Ok(datetime.map_or(Value::Null, Value::Datetime))
}

/// The current instant at millisecond granularity.
fn datetime_now(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    validate_args(&[], args)?;
    let now = Local::now();
    let truncated = Local
        .timestamp_millis_opt(now.timestamp_millis())
        .single()
        .unwrap_or(now);
    Ok(Value::Datetime(truncated))
}

/// Local midnight of the current day.
fn datetime_today(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    validate_args(&[], args)?;
    let now = Local::now();
    let today = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| Local.from_local_datetime(&midnight).single())
        .unwrap_or(now);
    Ok(Value::Datetime(today))
}

fn datetime_iso_format(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("datetime").of(ArgType::Datetime)], args)?;
    Ok(Value::string(bound[0].to_display_string()))
}

fn datetime_iso_parse(_runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
    let bound = validate_args(&[ArgSpec::new("string").of(ArgType::String)], args)?;
    let Value::String(text) = &bound[0] else {
        return Ok(Value::Null);
    };
    Ok(parse_datetime(text).map_or(Value::Null, Value::Datetime))
}
