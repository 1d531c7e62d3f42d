#![doc = include_str!("../../../README.md")]

mod args;
mod coverage;
mod doc;
mod error;
mod execute;
mod expressions;
mod includes;
mod library;
mod lint;
mod model;
mod options;
mod parse;
mod parse_expr;
mod url;
mod value;

pub use crate::{
    args::{ArgSpec, ArgType, validate_args},
    coverage::COVERAGE_GLOBAL,
    doc::{DocError, FunctionArgDoc, FunctionDoc, extract_docs},
    error::{ArgsError, ExecResult, FunctionError, FunctionResult, ParserError, RuntimeError},
    execute::{
        Runtime, evaluate_expression, evaluate_expression_async, execute_script, execute_script_async,
        script_exit_code,
    },
    expressions::{BinaryOperator, Expr, FunctionCall, UnaryOperator},
    includes::INCLUDES_GLOBAL,
    library::LibraryFunction,
    lint::lint_script,
    model::{FunctionDef, IncludeEntry, Script, ScriptInfo, Statement},
    options::{DEFAULT_MAX_STATEMENTS, ExecuteOptions, FetchFn, FetchRequest, FetchResponse, LogFn, UrlFn},
    parse::{parse_script, parse_script_from},
    parse_expr::parse_expression,
    url::url_file_relative,
    value::{
        FunctionValue, RegexFlags, RegexValue, ScriptFunction, Value, ValueArray, ValueObject, ValueType,
        binary_operation, new_value_object, parse_datetime, parse_integer, parse_number, unary_operation,
    },
};
