//! Static structural analysis of parsed scripts.
//!
//! Lint never executes code: it walks the statement list per scope (globals
//! and each function body), tracking assignment, use, label, and call
//! structure, and reports defects as `"<scriptName>:<line>: <message>"`
//! strings.

use ahash::{AHashMap, AHashSet};

use crate::{
    expressions::Expr,
    model::{FunctionDef, Script, Statement},
    value::{Value, ValueObject},
};

/// Names that are always resolvable: the keyword variables and the `if`
/// special form.
const BUILTIN_NAMES: [&str; 4] = ["false", "true", "null", "if"];

/// Lints a parsed script, optionally against a globals mapping. With a
/// mapping supplied, references to names that are neither built-in, assigned,
/// nor present in the mapping warn as unknown globals.
pub fn lint_script(script: &Script, globals: Option<&ValueObject>) -> Vec<String> {
    let script_name = script.script_name.as_deref().unwrap_or("main").to_owned();
    let mut linter = Linter {
        script_name,
        warnings: Vec::new(),
    };

    if script.statements.is_empty() {
        linter.warn(1, "Empty script".to_owned());
        return linter.warnings;
    }

    // function definitions and redefinitions
    let mut functions: Vec<&FunctionDef> = Vec::new();
    let mut function_names: AHashSet<&str> = AHashSet::new();
    for statement in &script.statements {
        if let Statement::Function(def) = statement {
            if !function_names.insert(def.name.as_str()) {
                linter.warn(def.line_number, format!("Redefinition of function \"{}\"", def.name));
            }
            functions.push(def);
        }
    }

    // names whose resolved call is a suspension point
    let mut async_names: AHashSet<String> = functions
        .iter()
        .filter(|def| def.is_async)
        .map(|def| def.name.clone())
        .collect();
    if let Some(globals) = globals {
        for (name, value) in globals.borrow().iter() {
            if let Value::Function(function) = value {
                if function.is_async() {
                    async_names.insert(name.clone());
                }
            }
        }
    }

    let mut global_scope = linter.analyze_scope(&script.statements, None);
    for def in &functions {
        // a function definition assigns its name at global scope
        global_scope
            .assigned
            .entry(def.name.clone())
            .or_insert((0, def.line_number));
    }

    for def in &functions {
        let function_scope = linter.analyze_scope(&def.statements, Some(def));
        linter.check_async(def, &async_names);
        if let Some(globals) = globals {
            linter.check_unknown_globals(&function_scope, &global_scope, globals);
        }
    }
    if let Some(globals) = globals {
        linter.check_unknown_globals(&global_scope, &global_scope, globals);
    }

    linter.warnings
}

/// Name facts collected from one scope's statement list.
#[derive(Default)]
struct Scope {
    /// Name -> (statement index, line) of the first assignment.
    assigned: AHashMap<String, (usize, usize)>,
    /// Name -> (statement index, line) of the first use.
    used: AHashMap<String, (usize, usize)>,
    /// Argument names, for function scopes.
    args: AHashSet<String>,
}

struct Linter {
    script_name: String,
    warnings: Vec<String>,
}

impl Linter {
    fn warn(&mut self, line_number: usize, message: String) {
        self.warnings.push(format!("{}:{line_number}: {message}", self.script_name));
    }

    /// Performs the per-scope analyses and returns the scope's name facts
    /// for the unknown-global check.
    fn analyze_scope(&mut self, statements: &[Statement], def: Option<&FunctionDef>) -> Scope {
        let mut scope = Scope::default();
        let mut labels: AHashMap<&str, usize> = AHashMap::new();
        let mut jumps: Vec<(&str, usize)> = Vec::new();

        if let Some(def) = def {
            for arg in &def.args {
                if !scope.args.insert(arg.clone()) {
                    self.warn(
                        def.line_number,
                        format!("Duplicate argument \"{arg}\" of function \"{}\"", def.name),
                    );
                }
            }
        }

        for (index, statement) in statements.iter().enumerate() {
            let line_number = statement.line_number();
            let mut record_uses = |scope: &mut Scope, expr: &Expr| {
                expr.visit_variables(&mut |name| {
                    scope.used.entry(name.to_owned()).or_insert((index, line_number));
                });
            };
            match statement {
                Statement::Expr { name, expr, .. } => {
                    record_uses(&mut scope, expr);
                    if let Some(name) = name {
                        scope.assigned.entry(name.clone()).or_insert((index, line_number));
                    } else if !expr.has_call() {
                        // a result-less statement with no call cannot have
                        // side effects
                        self.warn(line_number, "Pointless statement".to_owned());
                    }
                }
                Statement::Jump { label, expr, .. } => {
                    if let Some(expr) = expr {
                        record_uses(&mut scope, expr);
                    }
                    jumps.push((label.as_str(), line_number));
                }
                Statement::Return { expr, .. } => {
                    if let Some(expr) = expr {
                        record_uses(&mut scope, expr);
                    }
                }
                Statement::Label { name, .. } => {
                    if labels.contains_key(name.as_str()) {
                        self.warn(line_number, format!("Redefinition of label \"{name}\""));
                    } else {
                        labels.insert(name.as_str(), line_number);
                    }
                }
                Statement::Function(_) | Statement::Include { .. } => {}
            }
        }

        // label resolution
        let jumped: AHashSet<&str> = jumps.iter().map(|(label, _)| *label).collect();
        for (label, line_number) in &jumps {
            if !labels.contains_key(label) {
                self.warn(*line_number, format!("Unknown label \"{label}\""));
            }
        }
        let mut unused_labels: Vec<(&str, usize)> = labels
            .iter()
            .filter(|(label, _)| !jumped.contains(*label))
            .map(|(label, line_number)| (*label, *line_number))
            .collect();
        unused_labels.sort_by_key(|(_, line)| *line);
        for (label, line_number) in unused_labels {
            self.warn(line_number, format!("Unused label \"{label}\""));
        }

        // use before assignment, in this scope's statement order
        let mut early_uses: Vec<(&String, usize)> = scope
            .used
            .iter()
            .filter(|(name, (use_index, _))| {
                !scope.args.contains(*name)
                    && scope
                        .assigned
                        .get(*name)
                        .is_some_and(|(assign_index, _)| use_index <= assign_index)
            })
            .map(|(name, (_, use_line))| (name, *use_line))
            .collect();
        early_uses.sort_by_key(|(_, line)| *line);
        for (name, use_line) in early_uses {
            self.warn(use_line, format!("Variable \"{name}\" used before assignment"));
        }

        if let Some(def) = def {
            for arg in &def.args {
                if !scope.used.contains_key(arg) {
                    self.warn(
                        def.line_number,
                        format!("Unused argument \"{arg}\" of function \"{}\"", def.name),
                    );
                }
            }
            let mut unused: Vec<(&String, usize)> = scope
                .assigned
                .iter()
                .filter(|(name, _)| !scope.used.contains_key(*name) && !scope.args.contains(*name))
                .map(|(name, (_, assign_line))| (name, *assign_line))
                .collect();
            unused.sort_by_key(|(_, line)| *line);
            for (name, assign_line) in unused {
                self.warn(
                    assign_line,
                    format!("Unused variable \"{name}\" defined in function \"{}\"", def.name),
                );
            }
        }

        scope
    }

    /// Flags async-correctness defects on one function definition.
    fn check_async(&mut self, def: &FunctionDef, async_names: &AHashSet<String>) {
        let mut first_async_call: Option<usize> = None;
        for statement in &def.statements {
            if first_async_call.is_some() {
                break;
            }
            if let Some(expr) = statement_expr(statement) {
                let mut found = false;
                expr.visit_calls(&mut |call| {
                    if async_names.contains(&call.name) {
                        found = true;
                    }
                });
                if found {
                    first_async_call = Some(statement.line_number());
                }
            }
        }
        match (def.is_async, first_async_call) {
            (true, None) => {
                self.warn(def.line_number, format!("Unnecessary async function \"{}\"", def.name));
            }
            (false, Some(line_number)) => {
                self.warn(line_number, format!("Function \"{}\" requires async", def.name));
            }
            _ => {}
        }
    }

    /// Warns on references that resolve nowhere: not built-in, not assigned
    /// in the scope or at global scope, and not in the supplied globals.
    fn check_unknown_globals(&mut self, scope: &Scope, global_scope: &Scope, globals: &ValueObject) {
        let globals = globals.borrow();
        let mut unknown: Vec<(&String, usize)> = Vec::new();
        for (name, (_, use_line)) in &scope.used {
            if BUILTIN_NAMES.contains(&name.as_str())
                || scope.args.contains(name)
                || scope.assigned.contains_key(name)
                || global_scope.assigned.contains_key(name)
                || globals.contains_key(name)
            {
                continue;
            }
            unknown.push((name, *use_line));
        }
        unknown.sort_by_key(|(_, line)| *line);
        for (name, use_line) in unknown {
            self.warn(use_line, format!("Unknown global variable \"{name}\""));
        }
    }
}

fn statement_expr(statement: &Statement) -> Option<&Expr> {
    match statement {
        Statement::Expr { expr, .. } => Some(expr),
        Statement::Jump { expr, .. } | Statement::Return { expr, .. } => expr.as_ref(),
        _ => None,
    }
}
