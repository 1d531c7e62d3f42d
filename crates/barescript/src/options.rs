//! Execution options: the host interface consumed by the interpreters.

use std::{fmt, rc::Rc};

use crate::value::ValueObject;

/// Default statement-count cap. Zero disables the cap entirely.
pub const DEFAULT_MAX_STATEMENTS: u64 = 1_000_000_000;

/// A fetch initiated by an include or by the fetch library functions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    /// Request body; its presence turns the request into a POST.
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    /// A plain GET of the given URL.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: None,
            headers: Vec::new(),
        }
    }
}

/// The host's answer to a [`FetchRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    /// A successful response carrying `body`.
    pub fn of(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// True for 2xx statuses.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Resolves fetches for includes and the fetch library functions. Fetch
/// calls are the async interpreter's suspension points; hosts model
/// cancellation and wall-clock limits by failing from here.
pub type FetchFn = Rc<dyn Fn(&FetchRequest) -> Result<FetchResponse, String>>;

/// Diagnostic sink for debug logging and `systemLog`.
pub type LogFn = Rc<dyn Fn(&str)>;

/// Rewrites every URL the interpreter is about to fetch.
pub type UrlFn = Rc<dyn Fn(&str) -> String>;

/// Options for script execution and expression evaluation.
///
/// Cloning is cheap: the callable members are reference-counted and the
/// globals store is shared, so an options clone observes the same run state.
#[derive(Clone)]
pub struct ExecuteOptions {
    /// Shared variable store; a fresh one is created when absent.
    pub globals: Option<ValueObject>,
    /// Enables include linting, verbose error logging, and execution timing
    /// logs.
    pub debug: bool,
    pub fetch_fn: Option<FetchFn>,
    pub log_fn: Option<LogFn>,
    pub url_fn: Option<UrlFn>,
    /// Base URL for system includes (`include <...>`).
    pub system_prefix: Option<String>,
    /// Statement-count cap; zero disables.
    pub max_statements: u64,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            globals: None,
            debug: false,
            fetch_fn: None,
            log_fn: None,
            url_fn: None,
            system_prefix: None,
            max_statements: DEFAULT_MAX_STATEMENTS,
        }
    }
}

impl fmt::Debug for ExecuteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecuteOptions")
            .field("globals", &self.globals.is_some())
            .field("debug", &self.debug)
            .field("fetch_fn", &self.fetch_fn.is_some())
            .field("log_fn", &self.log_fn.is_some())
            .field("url_fn", &self.url_fn.is_some())
            .field("system_prefix", &self.system_prefix)
            .field("max_statements", &self.max_statements)
            .finish()
    }
}

impl ExecuteOptions {
    /// Emits a message to the host log sink, when one is configured.
    pub fn log(&self, message: &str) {
        if let Some(log_fn) = &self.log_fn {
            log_fn(message);
        }
    }

    /// Emits a message to the host log sink in debug mode only.
    pub fn log_debug(&self, message: &str) {
        if self.debug {
            self.log(message);
        }
    }
}
