//! Argument validation for library and host-provided functions.
//!
//! A function describes its parameters as a slice of [`ArgSpec`]s and calls
//! [`validate_args`] on the raw positional arguments. Validation failures are
//! returned as [`ArgsError`] data, never panics; the interpreter substitutes
//! the error's return value at the call site.

use crate::{
    error::ArgsError,
    value::{Value, ValueType},
};

/// Parameter types a spec can constrain to (every kind except null, which is
/// expressed through `nullable`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    Array,
    Boolean,
    Datetime,
    Function,
    Number,
    Object,
    Regex,
    String,
}

impl ArgType {
    fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value.type_of()),
            (Self::Array, ValueType::Array)
                | (Self::Datetime, ValueType::Datetime)
                | (Self::Function, ValueType::Function)
                | (Self::Number, ValueType::Number)
                | (Self::Object, ValueType::Object)
                | (Self::Regex, ValueType::Regex)
                | (Self::String, ValueType::String)
        )
    }
}

/// One parameter descriptor. Built with the `ArgSpec::new(..)` chain:
///
/// ```
/// use barescript::{ArgSpec, ArgType};
///
/// let specs = [
///     ArgSpec::new("values").of(ArgType::Array),
///     ArgSpec::new("index").of(ArgType::Number).integer().gte(0.0),
/// ];
/// assert_eq!(specs[1].name, "index");
/// ```
#[derive(Debug, Clone)]
pub struct ArgSpec {
    pub name: &'static str,
    pub arg_type: Option<ArgType>,
    pub nullable: bool,
    pub default: Option<Value>,
    /// When set on the final spec, the parameter collects all remaining
    /// arguments into an array.
    pub last_arg_array: bool,
    pub integer: bool,
    pub lt: Option<f64>,
    pub lte: Option<f64>,
    pub gt: Option<f64>,
    pub gte: Option<f64>,
}

impl ArgSpec {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            arg_type: None,
            nullable: false,
            default: None,
            last_arg_array: false,
            integer: false,
            lt: None,
            lte: None,
            gt: None,
            gte: None,
        }
    }

    #[must_use]
    pub fn of(mut self, arg_type: ArgType) -> Self {
        self.arg_type = Some(arg_type);
        self
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    #[must_use]
    pub fn last_arg_array(mut self) -> Self {
        self.last_arg_array = true;
        self
    }

    #[must_use]
    pub fn integer(mut self) -> Self {
        self.integer = true;
        self
    }

    #[must_use]
    pub fn lt(mut self, bound: f64) -> Self {
        self.lt = Some(bound);
        self
    }

    #[must_use]
    pub fn lte(mut self, bound: f64) -> Self {
        self.lte = Some(bound);
        self
    }

    #[must_use]
    pub fn gt(mut self, bound: f64) -> Self {
        self.gt = Some(bound);
        self
    }

    #[must_use]
    pub fn gte(mut self, bound: f64) -> Self {
        self.gte = Some(bound);
        self
    }
}

fn invalid(spec: &ArgSpec, value: &Value) -> ArgsError {
    ArgsError::new(format!("Invalid \"{}\" argument value, {}", spec.name, value.to_display_string()))
}

/// Validates raw positional arguments against the specs, left to right,
/// returning the bound parameter values.
///
/// Per parameter: absent arguments take the default, then `false` for
/// booleans, then null when untyped or nullable, and otherwise fail; a
/// trailing `last_arg_array` spec collects the remaining arguments into one
/// array; typed parameters coerce booleans through truthiness and require an
/// exact kind match otherwise; numeric bounds are checked after the kind.
/// Arguments beyond the specs fail with "Too many arguments".
pub fn validate_args(specs: &[ArgSpec], args: Vec<Value>) -> Result<Vec<Value>, ArgsError> {
    let mut args = args;
    let mut bound = Vec::with_capacity(specs.len());

    for (index, spec) in specs.iter().enumerate() {
        if spec.last_arg_array {
            let rest: Vec<Value> = if index < args.len() { args.split_off(index) } else { Vec::new() };
            bound.push(Value::array(rest));
            continue;
        }

        let mut value = if index < args.len() { args[index].clone() } else { Value::Null };
        let absent = index >= args.len() || matches!(value, Value::Null);
        if absent {
            if let Some(default) = &spec.default {
                bound.push(default.clone());
                continue;
            }
            if spec.arg_type == Some(ArgType::Boolean) {
                bound.push(Value::Bool(false));
                continue;
            }
            if spec.arg_type.is_none() || spec.nullable {
                bound.push(Value::Null);
                continue;
            }
            return Err(invalid(spec, &Value::Null));
        }

        match spec.arg_type {
            None => {}
            Some(ArgType::Boolean) => value = Value::Bool(value.is_truthy()),
            Some(arg_type) => {
                if !arg_type.matches(&value) {
                    return Err(invalid(spec, &value));
                }
            }
        }

        if let Value::Number(number) = value {
            let in_range = (!spec.integer || number.fract() == 0.0)
                && spec.lt.is_none_or(|bound| number < bound)
                && spec.lte.is_none_or(|bound| number <= bound)
                && spec.gt.is_none_or(|bound| number > bound)
                && spec.gte.is_none_or(|bound| number >= bound);
            if !in_range {
                return Err(invalid(spec, &value));
            }
        }

        bound.push(value);
    }

    let collects_rest = specs.last().is_some_and(|spec| spec.last_arg_array);
    if !collects_rest && args.len() > specs.len() {
        return Err(ArgsError::new(format!("Too many arguments ({})", args.len())));
    }

    Ok(bound)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_and_null_substitution() {
        let specs = [
            ArgSpec::new("text").of(ArgType::String),
            ArgSpec::new("count").of(ArgType::Number).default_value(Value::Number(1.0)),
            ArgSpec::new("flag").of(ArgType::Boolean),
            ArgSpec::new("extra"),
        ];
        let bound = validate_args(&specs, vec![Value::string("x")]).expect("valid");
        assert_eq!(
            bound,
            vec![Value::string("x"), Value::Number(1.0), Value::Bool(false), Value::Null]
        );
    }

    #[test]
    fn missing_typed_argument_fails() {
        let specs = [ArgSpec::new("values").of(ArgType::Array)];
        let error = validate_args(&specs, vec![]).expect_err("required");
        assert_eq!(error.message, "Invalid \"values\" argument value, null");
    }

    #[test]
    fn nullable_typed_argument_passes_null() {
        let specs = [ArgSpec::new("values").of(ArgType::Array).nullable()];
        let bound = validate_args(&specs, vec![Value::Null]).expect("valid");
        assert_eq!(bound, vec![Value::Null]);
    }

    #[test]
    fn boolean_coerces_through_truthiness() {
        let specs = [ArgSpec::new("flag").of(ArgType::Boolean)];
        let bound = validate_args(&specs, vec![Value::string("yes")]).expect("valid");
        assert_eq!(bound, vec![Value::Bool(true)]);
    }

    #[test]
    fn exact_kind_match_required() {
        let specs = [ArgSpec::new("entries").of(ArgType::Object)];
        let error = validate_args(&specs, vec![Value::array(vec![])]).expect_err("array is not object");
        assert_eq!(error.message, "Invalid \"entries\" argument value, []");
    }

    #[test]
    fn numeric_constraints() {
        let specs = [ArgSpec::new("index").of(ArgType::Number).integer().gte(0.0).lt(10.0)];
        assert!(validate_args(&specs, vec![Value::Number(3.0)]).is_ok());
        assert!(validate_args(&specs, vec![Value::Number(3.5)]).is_err());
        assert!(validate_args(&specs, vec![Value::Number(-1.0)]).is_err());
        assert!(validate_args(&specs, vec![Value::Number(10.0)]).is_err());
    }

    #[test]
    fn last_arg_array_collects_tail() {
        let specs = [ArgSpec::new("first"), ArgSpec::new("rest").last_arg_array()];
        let bound = validate_args(
            &specs,
            vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)],
        )
        .expect("valid");
        assert_eq!(
            bound,
            vec![Value::Number(1.0), Value::array(vec![Value::Number(2.0), Value::Number(3.0)])]
        );
        let empty = validate_args(&specs, vec![]).expect("valid");
        assert_eq!(empty, vec![Value::Null, Value::array(vec![])]);
    }

    #[test]
    fn too_many_arguments() {
        let specs = [ArgSpec::new("only")];
        let error = validate_args(&specs, vec![Value::Null, Value::Null, Value::Null]).expect_err("extra args");
        assert_eq!(error.message, "Too many arguments (3)");
    }
}
