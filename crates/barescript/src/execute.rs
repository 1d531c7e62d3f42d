//! The statement stepper and expression evaluator.
//!
//! One machine implements both interpreters, parameterized by execution
//! mode. The async mode adds the two suspension behaviors (async callables
//! and `include` resolution) and everything else runs the identical code
//! path, which makes the sync/async value equivalence on suspension-free
//! scripts hold by construction.

use std::{cell::RefCell, rc::Rc, time::Instant};

use ahash::AHashMap;
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::{
    coverage,
    error::{ExecResult, FunctionError, RuntimeError},
    expressions::{BinaryOperator, Expr, FunctionCall},
    library,
    model::{Script, ScriptInfo, Statement},
    options::{ExecuteOptions, FetchRequest, FetchResponse},
    value::{FunctionValue, ScriptFunction, Value, ValueObject, binary_operation, new_value_object, unary_operation},
};

/// Which interpreter the machine is running as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExecMode {
    Sync,
    Async,
}

/// Executes a parsed script with the synchronous interpreter.
///
/// Globals are seeded with the runtime library (only where names are not
/// already present) and the statements run with no locals scope. Calling an
/// async function or reaching an `include` fails with a [`RuntimeError`].
pub fn execute_script(script: &Script, options: &ExecuteOptions) -> ExecResult<Value> {
    execute_with_mode(script, options, ExecMode::Sync)
}

/// Executes a parsed script with the cooperative-asynchronous interpreter:
/// identical semantics to [`execute_script`] plus async callables and
/// `include` resolution through the host fetch hook.
pub fn execute_script_async(script: &Script, options: &ExecuteOptions) -> ExecResult<Value> {
    execute_with_mode(script, options, ExecMode::Async)
}

fn execute_with_mode(script: &Script, options: &ExecuteOptions, mode: ExecMode) -> ExecResult<Value> {
    let started = Instant::now();
    let mut runtime = Runtime::new(options.clone(), mode);
    library::seed_globals(&runtime.globals, &runtime.library);
    let info = ScriptInfo::of(script);
    let result = runtime
        .execute_statements(&info, &script.statements, None)
        .map(|returned| returned.unwrap_or(Value::Null));
    if runtime.options.debug {
        runtime.options.log(&format!(
            "BareScript: Script executed in {:.1} milliseconds",
            started.elapsed().as_secs_f64() * 1000.0
        ));
    }
    result
}

/// Evaluates an expression with the synchronous evaluator.
///
/// Unlike script execution, globals are used as provided without library
/// seeding; when `builtins` is set, the expression function aliases resolve
/// after locals and globals.
pub fn evaluate_expression(
    expr: &Expr,
    options: &ExecuteOptions,
    locals: Option<&ValueObject>,
    builtins: bool,
) -> ExecResult<Value> {
    let mut runtime = Runtime::new(options.clone(), ExecMode::Sync);
    runtime.builtins = builtins;
    let info = Rc::new(ScriptInfo::default());
    runtime.evaluate(expr, &info, locals)
}

/// Async variant of [`evaluate_expression`]. The expression is probed first:
/// when no subtree resolves to an async callable, evaluation is delegated to
/// the synchronous path untouched.
pub fn evaluate_expression_async(
    expr: &Expr,
    options: &ExecuteOptions,
    locals: Option<&ValueObject>,
    builtins: bool,
) -> ExecResult<Value> {
    let mut runtime = Runtime::new(options.clone(), ExecMode::Sync);
    runtime.builtins = builtins;
    if runtime.expr_is_async(expr, locals) {
        runtime.mode = ExecMode::Async;
    }
    let info = Rc::new(ScriptInfo::default());
    runtime.evaluate(expr, &info, locals)
}

/// The process status a script result maps to when run as a program: an
/// integer result in 0..=255 is the status itself, anything else is 1 when
/// truthy and 0 otherwise.
pub fn script_exit_code(result: &Value) -> u8 {
    if let Value::Number(number) = result {
        if number.fract() == 0.0 && (0.0..=255.0).contains(number) {
            return *number as u8;
        }
    }
    u8::from(result.is_truthy())
}

/// Execution state for one run: the shared globals store, the statement
/// counter, the host options, and the interpreter mode. Library and
/// host-provided functions receive `&mut Runtime` as their call context.
pub struct Runtime {
    pub(crate) options: ExecuteOptions,
    globals: ValueObject,
    statement_count: u64,
    pub(crate) mode: ExecMode,
    builtins: bool,
    pub(crate) library: AHashMap<String, Rc<library::LibraryFunction>>,
}

impl Runtime {
    pub(crate) fn new(options: ExecuteOptions, mode: ExecMode) -> Self {
        let globals = options.globals.clone().unwrap_or_else(new_value_object);
        Self {
            options,
            globals,
            statement_count: 0,
            mode,
            builtins: true,
            library: library::library(),
        }
    }

    /// The run's shared variable store.
    pub fn globals(&self) -> &ValueObject {
        &self.globals
    }

    /// The host options for this run.
    pub fn options(&self) -> &ExecuteOptions {
        &self.options
    }

    /// Emits a message to the host log sink.
    pub fn log(&self, message: &str) {
        self.options.log(message);
    }

    /// Emits a message to the host log sink in debug mode only.
    pub fn log_debug(&self, message: &str) {
        self.options.log_debug(message);
    }

    /// Performs a host fetch, applying the URL rewrite hook first.
    pub fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, String> {
        let mut request = request.clone();
        if let Some(url_fn) = &self.options.url_fn {
            request.url = url_fn(&request.url);
        }
        self.fetch_resolved(&request)
    }

    /// Performs a host fetch of an already-resolved URL.
    pub(crate) fn fetch_resolved(&self, request: &FetchRequest) -> Result<FetchResponse, String> {
        match &self.options.fetch_fn {
            Some(fetch_fn) => fetch_fn(request),
            None => Err("no fetch function".to_owned()),
        }
    }

    /// Runs a statement list to completion. Returns the `Return` statement's
    /// value when one executes, `None` when the list runs off the end.
    pub(crate) fn execute_statements(
        &mut self,
        script: &Rc<ScriptInfo>,
        statements: &[Statement],
        locals: Option<&ValueObject>,
    ) -> ExecResult<Option<Value>> {
        // jump targets resolve by linear scan on first use, cached per frame
        let mut labels: Option<AHashMap<&str, usize>> = None;
        let mut index = 0;
        while let Some(statement) = statements.get(index) {
            self.statement_count += 1;
            let max_statements = self.options.max_statements;
            if max_statements > 0 && self.statement_count > max_statements {
                return Err(RuntimeError::new(format!(
                    "Exceeded maximum script statements ({max_statements})"
                ))
                .decorate(script.name.as_deref(), statement.line_number()));
            }
            if !script.system {
                coverage::record(&self.globals, script, statement);
            }

            let line_number = statement.line_number();
            let at = |error: RuntimeError| error.decorate(script.name.as_deref(), line_number);

            match statement {
                Statement::Expr { name, expr, .. } => {
                    let value = self.evaluate(expr, script, locals).map_err(at)?;
                    if let Some(name) = name {
                        let target = locals.unwrap_or(&self.globals);
                        target.borrow_mut().insert(name.clone(), value);
                    }
                }
                Statement::Jump { label, expr, .. } => {
                    let taken = match expr {
                        None => true,
                        Some(guard) => self.evaluate(guard, script, locals).map_err(at)?.is_truthy(),
                    };
                    if taken {
                        let targets = labels.get_or_insert_with(|| {
                            statements
                                .iter()
                                .enumerate()
                                .filter_map(|(target, statement)| match statement {
                                    Statement::Label { name, .. } => Some((name.as_str(), target)),
                                    _ => None,
                                })
                                .collect()
                        });
                        match targets.get(label.as_str()) {
                            Some(&target) => {
                                index = target;
                                continue;
                            }
                            None => {
                                return Err(at(RuntimeError::new(format!("Unknown jump label \"{label}\""))));
                            }
                        }
                    }
                }
                Statement::Return { expr, .. } => {
                    let value = match expr {
                        Some(expr) => self.evaluate(expr, script, locals).map_err(at)?,
                        None => Value::Null,
                    };
                    return Ok(Some(value));
                }
                Statement::Label { .. } => {}
                Statement::Function(def) => {
                    let function = FunctionValue::Script(Rc::new(ScriptFunction {
                        def: def.clone(),
                        script: script.clone(),
                    }));
                    self.globals.borrow_mut().insert(def.name.clone(), Value::Function(function));
                }
                Statement::Include { includes, .. } => match self.mode {
                    ExecMode::Sync => {
                        let url = includes.first().map_or("", |entry| entry.url.as_str());
                        return Err(at(RuntimeError::new(format!(
                            "Include of \"{url}\" within non-async scope"
                        ))));
                    }
                    ExecMode::Async => self.execute_includes(includes, script).map_err(at)?,
                },
            }
            index += 1;
        }
        Ok(None)
    }

    /// Evaluates one expression tree.
    pub(crate) fn evaluate(
        &mut self,
        expr: &Expr,
        script: &Rc<ScriptInfo>,
        locals: Option<&ValueObject>,
    ) -> ExecResult<Value> {
        match expr {
            Expr::Number(value) => Ok(Value::Number(*value)),
            Expr::String(value) => Ok(Value::string(value.as_str())),
            Expr::Variable(name) => Ok(self.lookup_variable(name, locals)),
            Expr::Function(call) => self.evaluate_call(call, script, locals),
            Expr::Binary { op, left, right } => match op {
                // && yields the left value when falsy, || when truthy; the
                // right side is never evaluated in those cases
                BinaryOperator::And => {
                    let value = self.evaluate(left, script, locals)?;
                    if value.is_truthy() {
                        self.evaluate(right, script, locals)
                    } else {
                        Ok(value)
                    }
                }
                BinaryOperator::Or => {
                    let value = self.evaluate(left, script, locals)?;
                    if value.is_truthy() { Ok(value) } else { self.evaluate(right, script, locals) }
                }
                _ => {
                    let left = self.evaluate(left, script, locals)?;
                    let right = self.evaluate(right, script, locals)?;
                    Ok(binary_operation(*op, &left, &right))
                }
            },
            Expr::Unary { op, expr } => {
                let value = self.evaluate(expr, script, locals)?;
                Ok(unary_operation(*op, &value))
            }
            Expr::Group(expr) => self.evaluate(expr, script, locals),
        }
    }

    fn lookup_variable(&self, name: &str, locals: Option<&ValueObject>) -> Value {
        match name {
            "null" => Value::Null,
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => {
                if let Some(locals) = locals {
                    if let Some(value) = locals.borrow().get(name) {
                        return value.clone();
                    }
                }
                self.globals.borrow().get(name).cloned().unwrap_or(Value::Null)
            }
        }
    }

    /// Resolves a call target: locals, then globals, then (when builtins are
    /// enabled) the expression function aliases and the library itself, so
    /// literal desugars like `objectNew` work without seeded globals.
    fn resolve_function(&self, name: &str, locals: Option<&ValueObject>) -> Option<Value> {
        if let Some(locals) = locals {
            if let Some(value) = locals.borrow().get(name) {
                return Some(value.clone());
            }
        }
        if let Some(value) = self.globals.borrow().get(name) {
            return Some(value.clone());
        }
        if self.builtins {
            let target = library::expression_function(name).unwrap_or(name);
            if let Some(function) = self.library.get(target) {
                return Some(Value::Function(FunctionValue::Library(function.clone())));
            }
        }
        None
    }

    fn evaluate_call(
        &mut self,
        call: &FunctionCall,
        script: &Rc<ScriptInfo>,
        locals: Option<&ValueObject>,
    ) -> ExecResult<Value> {
        // "if" is a special form: only the selected branch is evaluated
        if call.name == "if" {
            let selected = match call.args.first() {
                Some(condition) => self.evaluate(condition, script, locals)?.is_truthy(),
                None => false,
            };
            let branch = if selected { call.args.get(1) } else { call.args.get(2) };
            return match branch {
                Some(branch) => self.evaluate(branch, script, locals),
                None => Ok(Value::Null),
            };
        }

        let Some(Value::Function(function)) = self.resolve_function(&call.name, locals) else {
            return Err(RuntimeError::new(format!("Undefined function \"{}\"", call.name)));
        };

        let mut args: SmallVec<[Value; 4]> = SmallVec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(self.evaluate(arg, script, locals)?);
        }
        self.call_function(&function, args.into_vec())
    }

    /// Invokes a callable value with positional arguments, applying the
    /// host-function error policy: `ArgsError` recovers to the function's
    /// return value, `RuntimeError` propagates, anything else logs in debug
    /// mode and yields null.
    pub fn call_function(&mut self, function: &FunctionValue, args: Vec<Value>) -> ExecResult<Value> {
        if function.is_async() && self.mode == ExecMode::Sync {
            return Err(RuntimeError::new(format!(
                "Async function \"{}\" called within non-async scope",
                function.name()
            )));
        }
        match function {
            FunctionValue::Script(target) => {
                let def = &target.def;
                let mut frame = IndexMap::with_capacity(def.args.len());
                for (position, arg_name) in def.args.iter().enumerate() {
                    let value = if def.last_arg_array && position + 1 == def.args.len() {
                        Value::array(args.get(position..).unwrap_or(&[]).to_vec())
                    } else {
                        args.get(position).cloned().unwrap_or(Value::Null)
                    };
                    frame.insert(arg_name.clone(), value);
                }
                let frame = Rc::new(RefCell::new(frame));
                let returned = self.execute_statements(&target.script, &def.statements, Some(&frame))?;
                Ok(returned.unwrap_or(Value::Null))
            }
            FunctionValue::Library(target) => match target.call(self, args) {
                Ok(value) => Ok(value),
                Err(FunctionError::Args(error)) => Ok(error.return_value),
                Err(FunctionError::Runtime(error)) => Err(error),
                Err(FunctionError::Other(message)) => {
                    self.log_debug(&format!("BareScript: Function \"{}\" error, {message}", target.name));
                    Ok(Value::Null)
                }
            },
        }
    }

    /// Static probe: true when any call in the tree resolves to an async
    /// callable, directly or through an argument subtree.
    pub(crate) fn expr_is_async(&self, expr: &Expr, locals: Option<&ValueObject>) -> bool {
        let mut found = false;
        expr.visit_calls(&mut |call| {
            if !found {
                if let Some(Value::Function(function)) = self.resolve_function(&call.name, locals) {
                    found = function.is_async();
                }
            }
        });
        found
    }
}
