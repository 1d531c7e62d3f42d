//! Error kinds raised by the parser, the interpreters, and library functions.

use std::fmt::{self, Write};

use crate::value::Value;

/// Result type alias for operations that can fail with a [`RuntimeError`].
pub type ExecResult<T> = Result<T, RuntimeError>;

/// Result channel for library and host-provided functions.
///
/// A function either produces a value or one of the three structured failure
/// kinds in [`FunctionError`]. The interpreter recovers from `Args` at the
/// call site, propagates `Runtime`, and swallows `Other` to a null result
/// (logging it when debug is enabled).
pub type FunctionResult = Result<Value, FunctionError>;

/// Maximum width of the source excerpt embedded in a parser error message.
/// Longer lines are windowed around the error column with `...` markers.
const MAX_ERROR_LINE_WIDTH: usize = 120;

/// A script or expression syntax error.
///
/// Carries the offending source line and a 1-based line/column position. The
/// `Display` form embeds the line with a caret under the error column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserError {
    /// Short description of the defect, e.g. "Syntax error".
    pub error: String,
    /// The offending source line, without its terminator.
    pub line: String,
    /// 1-based column of the error within `line`.
    pub column_number: usize,
    /// 1-based line number within the script.
    pub line_number: usize,
    /// Name of the script being parsed, when known.
    pub script_name: Option<String>,
}

impl ParserError {
    pub(crate) fn new(
        error: impl Into<String>,
        line: impl Into<String>,
        column_number: usize,
        line_number: usize,
        script_name: Option<&str>,
    ) -> Self {
        Self {
            error: error.into(),
            line: line.into(),
            column_number,
            line_number,
            script_name: script_name.map(str::to_owned),
        }
    }
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, line number {}:", self.error, self.line_number)?;

        // Window long lines around the error column so the caret stays visible
        let chars: Vec<char> = self.line.chars().collect();
        let column_index = self.column_number.saturating_sub(1).min(chars.len());
        let (start, prefix) = if chars.len() <= MAX_ERROR_LINE_WIDTH {
            (0, "")
        } else {
            let start = column_index.saturating_sub(MAX_ERROR_LINE_WIDTH / 2);
            (start, if start > 0 { "..." } else { "" })
        };
        let end = (start + MAX_ERROR_LINE_WIDTH).min(chars.len());
        let suffix = if end < chars.len() { "..." } else { "" };
        let excerpt: String = chars[start..end].iter().collect();

        write!(f, "\n{prefix}{excerpt}{suffix}\n")?;
        for _ in 0..(prefix.len() + (column_index - start)) {
            f.write_char(' ')?;
        }
        f.write_char('^')
    }
}

impl std::error::Error for ParserError {}

/// A control-flow halting execution failure.
///
/// Produced for undefined functions, unknown jump labels, async calls in a
/// non-async scope, include failures, and the statement-count limit. The
/// message is decorated with `scriptName:lineNumber` when the failing
/// statement is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    /// Failure description.
    pub error: String,
    /// Name of the script whose statement failed, when known.
    pub script_name: Option<String>,
    /// 1-based line number of the failing statement, when known.
    pub line_number: Option<usize>,
}

impl RuntimeError {
    /// A runtime failure with no source location yet; the interpreter
    /// decorates it with the failing statement's location as it propagates.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            script_name: None,
            line_number: None,
        }
    }

    /// Attaches a script location unless one is already present.
    pub(crate) fn decorate(mut self, script_name: Option<&str>, line_number: usize) -> Self {
        if self.line_number.is_none() {
            self.script_name = script_name.map(str::to_owned);
            self.line_number = Some(line_number);
        }
        self
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(line_number) = self.line_number {
            let script_name = self.script_name.as_deref().unwrap_or("main");
            write!(f, "{script_name}:{line_number}: {}", self.error)
        } else {
            f.write_str(&self.error)
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<ParserError> for RuntimeError {
    fn from(error: ParserError) -> Self {
        Self {
            error: error.to_string(),
            script_name: error.script_name,
            line_number: None,
        }
    }
}

/// An argument-validation failure, modeled as data rather than a thrown
/// exception: callers of a library function that fails validation receive
/// the function's `return_value` instead of an error.
#[derive(Debug, Clone)]
pub struct ArgsError {
    /// Validation failure description.
    pub message: String,
    /// The value the enclosing call evaluates to, chosen per function.
    pub return_value: Value,
}

impl ArgsError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            return_value: Value::Null,
        }
    }

    /// Replaces the value substituted at the call site on failure.
    #[must_use]
    pub fn with_return_value(mut self, return_value: Value) -> Self {
        self.return_value = return_value;
        self
    }
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ArgsError {}

/// The failure channel available to library and host-provided functions.
#[derive(Debug)]
pub enum FunctionError {
    /// Argument validation failed; the call site substitutes the carried
    /// return value.
    Args(ArgsError),
    /// A genuine runtime failure that halts the script.
    Runtime(RuntimeError),
    /// Any other failure; the call evaluates to null and the message is
    /// logged when debug is enabled.
    Other(String),
}

impl From<ArgsError> for FunctionError {
    fn from(error: ArgsError) -> Self {
        Self::Args(error)
    }
}

impl From<RuntimeError> for FunctionError {
    fn from(error: RuntimeError) -> Self {
        Self::Runtime(error)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parser_error_display_embeds_caret() {
        let error = ParserError::new("Syntax error", "foo bar !", 9, 3, Some("test.bare"));
        assert_eq!(error.to_string(), "Syntax error, line number 3:\nfoo bar !\n        ^");
    }

    #[test]
    fn parser_error_display_truncates_long_lines() {
        let line = format!("{}!{}", "x".repeat(200), "y".repeat(200));
        let error = ParserError::new("Syntax error", line, 201, 1, None);
        let display = error.to_string();
        let mut lines = display.lines();
        assert_eq!(lines.next(), Some("Syntax error, line number 1:"));
        let excerpt = lines.next().expect("excerpt line");
        assert!(excerpt.starts_with("...") && excerpt.ends_with("..."));
        assert_eq!(excerpt.len(), 126);
        let caret = lines.next().expect("caret line");
        assert_eq!(caret.len(), caret.find('^').expect("caret") + 1);
        assert_eq!(&excerpt[caret.len() - 1..caret.len()], "!");
    }

    #[test]
    fn runtime_error_display_includes_location() {
        let error = RuntimeError::new("Unknown jump label \"done\"").decorate(Some("test.bare"), 12);
        assert_eq!(error.to_string(), "test.bare:12: Unknown jump label \"done\"");
        assert_eq!(RuntimeError::new("boom").to_string(), "boom");
    }
}
