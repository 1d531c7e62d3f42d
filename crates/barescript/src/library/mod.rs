//! The runtime library: the host functions seeded into globals at script
//! entry, and the short-alias map injected into expression lookup.
//!
//! Each area has its own submodule. Every function validates its arguments
//! through the descriptor DSL in `args`, and failures flow back as data
//! through `FunctionError` rather than panics.

mod data;
mod datetime;
mod math;
mod number;
mod regex_fns;
mod string;
mod system;

use std::{fmt, rc::Rc};

use ahash::AHashMap;

use crate::{
    error::FunctionResult,
    execute::Runtime,
    value::{FunctionValue, Value, ValueObject},
};

/// A library or host-provided function: a name, an async marker, and the
/// implementation receiving the runtime and the raw positional arguments.
pub struct LibraryFunction {
    pub name: String,
    /// Async functions are suspension points: callable only from async
    /// evaluation positions.
    pub is_async: bool,
    imp: Box<dyn Fn(&mut Runtime, Vec<Value>) -> FunctionResult>,
}

impl LibraryFunction {
    pub fn new(
        name: impl Into<String>,
        imp: impl Fn(&mut Runtime, Vec<Value>) -> FunctionResult + 'static,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            is_async: false,
            imp: Box::new(imp),
        })
    }

    pub fn new_async(
        name: impl Into<String>,
        imp: impl Fn(&mut Runtime, Vec<Value>) -> FunctionResult + 'static,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            is_async: true,
            imp: Box::new(imp),
        })
    }

    pub fn call(&self, runtime: &mut Runtime, args: Vec<Value>) -> FunctionResult {
        (self.imp)(runtime, args)
    }
}

impl fmt::Debug for LibraryFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryFunction")
            .field("name", &self.name)
            .field("is_async", &self.is_async)
            .finish_non_exhaustive()
    }
}

/// Spreadsheet-style aliases resolved in expression evaluation after locals
/// and globals, mapping the short name to the library function it stands for.
const EXPRESSION_FUNCTIONS: &[(&str, &str)] = &[
    ("abs", "mathAbs"),
    ("ceil", "mathCeil"),
    ("date", "datetimeNew"),
    ("day", "datetimeDay"),
    ("exp", "mathExp"),
    ("fixed", "numberToFixed"),
    ("floor", "mathFloor"),
    ("hour", "datetimeHour"),
    ("indexOf", "stringIndexOf"),
    ("len", "stringLength"),
    ("ln", "mathLn"),
    ("log", "mathLog"),
    ("lower", "stringLower"),
    ("max", "mathMax"),
    ("min", "mathMin"),
    ("minute", "datetimeMinute"),
    ("month", "datetimeMonth"),
    ("now", "datetimeNow"),
    ("parseFloat", "numberParseFloat"),
    ("parseInt", "numberParseInt"),
    ("pi", "mathPi"),
    ("replace", "stringReplace"),
    ("rept", "stringRepeat"),
    ("round", "mathRound"),
    ("second", "datetimeSecond"),
    ("sign", "mathSign"),
    ("slice", "stringSlice"),
    ("split", "stringSplit"),
    ("sqrt", "mathSqrt"),
    ("text", "systemText"),
    ("today", "datetimeToday"),
    ("trim", "stringTrim"),
    ("upper", "stringUpper"),
    ("year", "datetimeYear"),
];

/// The library function the expression alias stands for, if any.
pub(crate) fn expression_function(alias: &str) -> Option<&'static str> {
    EXPRESSION_FUNCTIONS
        .iter()
        .find(|(name, _)| *name == alias)
        .map(|(_, target)| *target)
}

/// Builds the full library, keyed by function name.
pub(crate) fn library() -> AHashMap<String, Rc<LibraryFunction>> {
    let mut functions: Vec<Rc<LibraryFunction>> = Vec::new();
    data::functions(&mut functions);
    datetime::functions(&mut functions);
    math::functions(&mut functions);
    number::functions(&mut functions);
    regex_fns::functions(&mut functions);
    string::functions(&mut functions);
    system::functions(&mut functions);
    functions
        .into_iter()
        .map(|function| (function.name.clone(), function))
        .collect()
}

/// Seeds the library into the globals store, only where a name is not
/// already present.
pub(crate) fn seed_globals(globals: &ValueObject, library: &AHashMap<String, Rc<LibraryFunction>>) {
    let mut globals = globals.borrow_mut();
    for (name, function) in library {
        if !globals.contains_key(name) {
            globals.insert(name.clone(), Value::Function(FunctionValue::Library(function.clone())));
        }
    }
}
