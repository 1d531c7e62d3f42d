//! The script AST: a parsed script is a flat statement list, immutable after
//! parsing, and may be shared across concurrent runs.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::expressions::Expr;

/// A parsed script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Top-level statements in program order.
    pub statements: Vec<Statement>,
    /// Name used in diagnostics and coverage, when known.
    pub script_name: Option<String>,
    /// Source lines, kept for coverage statement text.
    pub script_lines: Option<Vec<String>>,
    /// True for system includes, which are excluded from coverage.
    pub system: bool,
}

impl Script {
    /// Serializes the parsed script to a compact binary form.
    ///
    /// Embedders can cache the result and [`load`](Self::load) it later to
    /// skip re-parsing.
    pub fn dump(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Restores a script serialized with [`dump`](Self::dump).
    pub fn load(data: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(data)
    }
}

/// One script statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// Evaluates `expr`; when `name` is present, assigns the result to that
    /// name in the current scope (locals inside a function call, globals
    /// otherwise).
    Expr {
        name: Option<String>,
        expr: Expr,
        line_number: usize,
        /// Number of source lines the statement spans (continuations).
        line_count: usize,
    },
    /// Jump to `label`: unconditional when `expr` is absent, otherwise taken
    /// iff the guard evaluates truthy.
    Jump {
        label: String,
        expr: Option<Expr>,
        line_number: usize,
    },
    /// Return from the current function (or end the script) with the guarded
    /// value, defaulting to null.
    Return { expr: Option<Expr>, line_number: usize },
    /// A jump target.
    Label { name: String, line_number: usize },
    /// Installs a user function into globals when stepped over.
    Function(Rc<FunctionDef>),
    /// External script units to fetch, parse, and execute. Meaningful only
    /// under the async interpreter.
    Include {
        includes: Vec<IncludeEntry>,
        line_number: usize,
    },
}

impl Statement {
    /// 1-based source line of the statement.
    pub fn line_number(&self) -> usize {
        match self {
            Self::Expr { line_number, .. }
            | Self::Jump { line_number, .. }
            | Self::Return { line_number, .. }
            | Self::Label { line_number, .. }
            | Self::Include { line_number, .. } => *line_number,
            Self::Function(def) => def.line_number,
        }
    }
}

/// A user function definition.
///
/// Functions capture globals only, never enclosing locals; the body is a
/// statement list executed with a fresh locals scope per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    /// True for `async function` definitions, callable only from async
    /// evaluation positions.
    pub is_async: bool,
    pub name: String,
    /// Positional argument names.
    pub args: Vec<String>,
    /// When true, the final argument collects all remaining call arguments
    /// into an array.
    pub last_arg_array: bool,
    pub statements: Vec<Statement>,
    pub line_number: usize,
}

/// One URL of an `include` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncludeEntry {
    pub url: String,
    /// True for `include <url>`, resolved against the system prefix.
    pub system: bool,
    pub line_number: usize,
}

/// Identity of the script a function was defined in, captured alongside the
/// function value for diagnostics and coverage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptInfo {
    pub name: Option<String>,
    pub lines: Option<Rc<Vec<String>>>,
    pub system: bool,
}

impl ScriptInfo {
    pub(crate) fn of(script: &Script) -> Rc<Self> {
        Rc::new(Self {
            name: script.script_name.clone(),
            lines: script.script_lines.clone().map(Rc::new),
            system: script.system,
        })
    }

    /// Name used in diagnostics, defaulting to "main".
    pub(crate) fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("main")
    }
}
