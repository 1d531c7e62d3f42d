//! Dynamic values and the value-polymorphic operator tables.
//!
//! Every value in a running script is a [`Value`]. Arrays and objects have
//! reference semantics: cloning a value clones a handle, and mutation through
//! any handle is visible through all of them. Execution is single-threaded
//! within a run, so the shared interiors need no locking.

use std::{cell::RefCell, cmp::Ordering, fmt, rc::Rc, sync::LazyLock};

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Timelike};
use indexmap::IndexMap;
use serde::ser::Serialize as _;
use strum::{Display, EnumString, IntoStaticStr};

use crate::{
    expressions::{BinaryOperator, UnaryOperator},
    library::LibraryFunction,
    model::{FunctionDef, ScriptInfo},
};

/// Shared, in-place mutable array of values.
pub type ValueArray = Rc<RefCell<Vec<Value>>>;

/// Shared, insertion-ordered string-keyed mapping. Globals and locals stores
/// use this same representation, so user scripts, library functions, and the
/// interpreter all observe one container.
pub type ValueObject = Rc<RefCell<IndexMap<String, Value>>>;

/// A fresh, empty shared mapping, as used for globals and locals stores.
pub fn new_value_object() -> ValueObject {
    Rc::new(RefCell::new(IndexMap::new()))
}

/// A dynamically typed script value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    /// Double-precision float; the only numeric type.
    Number(f64),
    /// An instant with local-wallclock accessors, millisecond granularity.
    Datetime(DateTime<Local>),
    String(Rc<str>),
    Array(ValueArray),
    Object(ValueObject),
    /// Compiled pattern plus the three surfaced flag bits.
    Regex(Rc<RegexValue>),
    Function(FunctionValue),
}

/// The nine canonical type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ValueType {
    Array,
    Boolean,
    Datetime,
    Function,
    Null,
    Number,
    Object,
    Regex,
    String,
}

/// Flag bits surfaced on regex values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegexFlags {
    pub case_insensitive: bool,
    pub multi_line: bool,
    pub dot_matches_newline: bool,
}

impl RegexFlags {
    /// Inline-flag form, e.g. "im".
    pub fn inline(self) -> String {
        let mut flags = String::new();
        if self.case_insensitive {
            flags.push('i');
        }
        if self.multi_line {
            flags.push('m');
        }
        if self.dot_matches_newline {
            flags.push('s');
        }
        flags
    }
}

/// A compiled regex value. Equality and ordering are by source pattern and
/// flags, not by engine identity.
#[derive(Debug)]
pub struct RegexValue {
    pub source: String,
    pub flags: RegexFlags,
    pub regex: fancy_regex::Regex,
}

impl RegexValue {
    /// Compiles `source` with the given flags applied as inline flags.
    pub fn compile(source: &str, flags: RegexFlags) -> Result<Rc<Self>, fancy_regex::Error> {
        let inline = flags.inline();
        let pattern = if inline.is_empty() {
            source.to_owned()
        } else {
            format!("(?{inline}){source}")
        };
        Ok(Rc::new(Self {
            source: source.to_owned(),
            flags,
            regex: fancy_regex::Regex::new(&pattern)?,
        }))
    }
}

/// A callable value: either a user function from a parsed script or a
/// library/host function.
#[derive(Debug, Clone)]
pub enum FunctionValue {
    Script(Rc<ScriptFunction>),
    Library(Rc<LibraryFunction>),
}

impl FunctionValue {
    /// True when calling this function is a suspension point, legal only in
    /// async evaluation positions.
    pub fn is_async(&self) -> bool {
        match self {
            Self::Script(function) => function.def.is_async,
            Self::Library(function) => function.is_async,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Script(function) => &function.def.name,
            Self::Library(function) => &function.name,
        }
    }
}

/// A user function bound to the script it was defined in.
#[derive(Debug)]
pub struct ScriptFunction {
    pub def: Rc<FunctionDef>,
    pub script: Rc<ScriptInfo>,
}

impl Value {
    /// Wraps a string.
    pub fn string(text: impl Into<Rc<str>>) -> Self {
        Self::String(text.into())
    }

    /// Wraps a vector into a shared array value.
    pub fn array(values: Vec<Self>) -> Self {
        Self::Array(Rc::new(RefCell::new(values)))
    }

    /// Wraps a mapping into a shared object value.
    pub fn object(entries: IndexMap<String, Self>) -> Self {
        Self::Object(Rc::new(RefCell::new(entries)))
    }

    /// A fresh empty object value.
    pub fn empty_object() -> Self {
        Self::object(IndexMap::new())
    }

    /// The canonical type tag.
    pub fn type_of(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Null,
            Self::Bool(_) => ValueType::Boolean,
            Self::Number(_) => ValueType::Number,
            Self::Datetime(_) => ValueType::Datetime,
            Self::String(_) => ValueType::String,
            Self::Array(_) => ValueType::Array,
            Self::Object(_) => ValueType::Object,
            Self::Regex(_) => ValueType::Regex,
            Self::Function(_) => ValueType::Function,
        }
    }

    /// Truthiness used by jumps, short-circuit operators, and `!`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(value) => *value,
            Self::Number(value) => *value != 0.0 && !value.is_nan(),
            Self::String(value) => !value.is_empty(),
            Self::Array(values) => !values.borrow().is_empty(),
            Self::Datetime(_) | Self::Object(_) | Self::Regex(_) | Self::Function(_) => true,
        }
    }

    /// Canonical string form: shortest round-trip decimals for numbers,
    /// ISO-8601 with local offset for datetimes, key-sorted JSON for arrays
    /// and objects, `<regex>`/`<function>` for the opaque kinds.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Null => "null".to_owned(),
            Self::Bool(value) => value.to_string(),
            Self::Number(value) => number_string(*value),
            Self::Datetime(value) => datetime_string(*value),
            Self::String(value) => value.to_string(),
            Self::Array(_) | Self::Object(_) => self.to_json(None),
            Self::Regex(_) => "<regex>".to_owned(),
            Self::Function(_) => "<function>".to_owned(),
        }
    }

    /// JSON rendering. Object keys are sorted lexicographically so the output
    /// is stable under key insertion order; non-serializable values (regexes,
    /// functions, non-finite numbers) become null.
    pub fn to_json(&self, indent: Option<usize>) -> String {
        let json = self.to_json_value();
        match indent {
            None | Some(0) => serde_json::to_string(&json),
            Some(indent) => {
                let spaces = vec![b' '; indent];
                let mut out = Vec::new();
                let formatter = serde_json::ser::PrettyFormatter::with_indent(&spaces);
                let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
                json.serialize(&mut serializer).map(|()| String::from_utf8_lossy(&out).into_owned())
            }
        }
        .expect("JSON rendering of a value tree cannot fail")
    }

    fn to_json_value(&self) -> serde_json::Value {
        match self {
            Self::Null | Self::Regex(_) | Self::Function(_) => serde_json::Value::Null,
            Self::Bool(value) => serde_json::Value::Bool(*value),
            Self::Number(value) => {
                serde_json::Number::from_f64(*value).map_or(serde_json::Value::Null, serde_json::Value::Number)
            }
            Self::Datetime(value) => serde_json::Value::String(datetime_string(*value)),
            Self::String(value) => serde_json::Value::String(value.to_string()),
            Self::Array(values) => {
                serde_json::Value::Array(values.borrow().iter().map(Self::to_json_value).collect())
            }
            Self::Object(entries) => {
                let entries = entries.borrow();
                let mut keys: Vec<&String> = entries.keys().collect();
                keys.sort();
                let mut map = serde_json::Map::with_capacity(keys.len());
                for key in keys {
                    map.insert(key.clone(), entries[key.as_str()].to_json_value());
                }
                serde_json::Value::Object(map)
            }
        }
    }

    /// Total order over all values: null first, same-kind values by natural
    /// order, arrays lexicographically, and distinct kinds by type-tag name.
    ///
    /// Numbers use `total_cmp`, so NaN is self-equal and sorts after
    /// infinity; same-kind objects compare by sorted key/value pairs. Both
    /// choices keep the order total (reflexive, antisymmetric, transitive).
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Datetime(a), Self::Datetime(b)) => a.cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Array(a), Self::Array(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ordering::Equal;
                }
                let (a, b) = (a.borrow(), b.borrow());
                for (left, right) in a.iter().zip(b.iter()) {
                    let ordering = left.compare(right);
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Self::Object(a), Self::Object(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ordering::Equal;
                }
                let (a, b) = (a.borrow(), b.borrow());
                let mut a_keys: Vec<&String> = a.keys().collect();
                let mut b_keys: Vec<&String> = b.keys().collect();
                a_keys.sort();
                b_keys.sort();
                for (a_key, b_key) in a_keys.iter().zip(b_keys.iter()) {
                    let ordering = a_key.cmp(b_key).then_with(|| a[a_key.as_str()].compare(&b[b_key.as_str()]));
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                a_keys.len().cmp(&b_keys.len())
            }
            (Self::Regex(a), Self::Regex(b)) => {
                a.source.cmp(&b.source).then_with(|| a.flags.inline().cmp(&b.flags.inline()))
            }
            (Self::Function(a), Self::Function(b)) => {
                let identical = match (a, b) {
                    (FunctionValue::Script(a), FunctionValue::Script(b)) => Rc::ptr_eq(a, b),
                    (FunctionValue::Library(a), FunctionValue::Library(b)) => Rc::ptr_eq(a, b),
                    _ => false,
                };
                if identical {
                    Ordering::Equal
                } else {
                    a.name().cmp(b.name())
                }
            }
            (a, b) => {
                let a: &'static str = a.type_of().into();
                let b: &'static str = b.type_of().into();
                a.cmp(b)
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::string(value)
    }
}

fn number_string(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity".to_owned() } else { "-Infinity".to_owned() }
    } else if value == 0.0 {
        // negative zero renders as plain zero
        "0".to_owned()
    } else {
        value.to_string()
    }
}

fn datetime_string(value: DateTime<Local>) -> String {
    if value.nanosecond() == 0 {
        value.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
    } else {
        value.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
    }
}

static NUMBER_PATTERN: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^\s*[-+]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?\s*$").expect("static pattern")
});

/// Parses a decimal number with optional sign, fraction, and exponent.
/// Anything else, including the textual float forms `inf` and `NaN`, is
/// rejected.
pub fn parse_number(text: &str) -> Option<f64> {
    if NUMBER_PATTERN.is_match(text) {
        text.trim().parse().ok()
    } else {
        None
    }
}

/// Parses an integer in the given radix (2 to 36).
pub fn parse_integer(text: &str, radix: u32) -> Option<f64> {
    if !(2..=36).contains(&radix) {
        return None;
    }
    i64::from_str_radix(text.trim(), radix).ok().map(|value| value as f64)
}

/// Parses an ISO date (`YYYY-MM-DD`, local midnight) or an ISO datetime with
/// a `Z` or `±HH:MM` timezone suffix. The result is truncated to millisecond
/// granularity.
pub fn parse_datetime(text: &str) -> Option<DateTime<Local>> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Local.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).single();
    }
    let parsed = DateTime::parse_from_rfc3339(text).ok()?;
    Local.timestamp_millis_opt(parsed.timestamp_millis()).single()
}

/// Returns the operand as a 64-bit signed integer when it is an
/// integer-valued number, the domain of the bitwise operators.
fn as_int64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(*n as i64),
        _ => None,
    }
}

/// Applies a non-short-circuit binary operator.
///
/// Operand-type mismatches produce null rather than an error; the comparison
/// operators are total via [`Value::compare`]. `&&` and `||` never reach this
/// table (the evaluator short-circuits them).
pub fn binary_operation(op: BinaryOperator, left: &Value, right: &Value) -> Value {
    use BinaryOperator as Op;
    match op {
        Op::Add => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (Value::String(a), Value::String(b)) => Value::string(format!("{a}{b}")),
            (Value::String(a), b) => Value::string(format!("{a}{}", b.to_display_string())),
            (a, Value::String(b)) => Value::string(format!("{}{b}", a.to_display_string())),
            (Value::Number(a), Value::Datetime(b)) => Value::Datetime(*b + Duration::milliseconds(*a as i64)),
            (Value::Datetime(a), Value::Number(b)) => Value::Datetime(*a + Duration::milliseconds(*b as i64)),
            _ => Value::Null,
        },
        Op::Subtract => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a - b),
            (Value::Datetime(a), Value::Datetime(b)) => {
                Value::Number((a.timestamp_millis() - b.timestamp_millis()) as f64)
            }
            _ => Value::Null,
        },
        Op::Multiply | Op::Divide | Op::Modulo | Op::Exponent => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Value::Number(match op {
                Op::Multiply => a * b,
                // division and modulo inherit IEEE-754 semantics (1/0 is infinite)
                Op::Divide => a / b,
                Op::Modulo => a % b,
                _ => a.powf(*b),
            }),
            _ => Value::Null,
        },
        Op::BitAnd | Op::BitOr | Op::BitXor | Op::ShiftLeft | Op::ShiftRight => {
            match (as_int64(left), as_int64(right)) {
                (Some(a), Some(b)) => Value::Number(match op {
                    Op::BitAnd => a & b,
                    Op::BitOr => a | b,
                    Op::BitXor => a ^ b,
                    // 64-bit signed shift space; the count wraps at 64
                    Op::ShiftLeft => a.wrapping_shl(b as u32),
                    _ => a.wrapping_shr(b as u32),
                } as f64),
                _ => Value::Null,
            }
        }
        Op::Equal | Op::NotEqual | Op::Less | Op::LessEqual | Op::Greater | Op::GreaterEqual => {
            let ordering = left.compare(right);
            Value::Bool(match op {
                Op::Equal => ordering == Ordering::Equal,
                Op::NotEqual => ordering != Ordering::Equal,
                Op::Less => ordering == Ordering::Less,
                Op::LessEqual => ordering != Ordering::Greater,
                Op::Greater => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
        Op::And | Op::Or => Value::Null,
    }
}

/// Applies a unary prefix operator. `!` composes with truthiness on every
/// kind; `-` and `~` are null on non-numeric operands.
pub fn unary_operation(op: UnaryOperator, value: &Value) -> Value {
    match op {
        UnaryOperator::Not => Value::Bool(!value.is_truthy()),
        UnaryOperator::Negate => match value {
            Value::Number(n) => Value::Number(-n),
            _ => Value::Null,
        },
        UnaryOperator::BitNot => as_int64(value).map_or(Value::Null, |n| Value::Number(!n as f64)),
    }
}
