//! Line-oriented script parser.
//!
//! Scripts parse one logical line at a time: lines split on CR?LF, backslash
//! continuations joined with a single space, comment and blank lines skipped,
//! and each remaining line matched by prioritized recognizers. The compound
//! constructs (`if`/`while`/`for`) are sugar, expanded here into `Jump` and
//! `Label` statements with compiler-generated `__bareScript*` label names.

use std::{rc::Rc, sync::LazyLock};

use regex::Regex;

use crate::{
    error::ParserError,
    expressions::{BinaryOperator, Expr, FunctionCall, UnaryOperator},
    model::{FunctionDef, IncludeEntry, Script, Statement},
    parse_expr::{ExprContext, parse_expression_text},
};

macro_rules! line_pattern {
    ($name:ident, $pattern:literal) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($pattern).expect("static pattern"));
    };
}

line_pattern!(CONTINUATION, r"\\\s*$");
line_pattern!(COMMENT, r"^\s*(?:#.*)?$");
line_pattern!(INCLUDE, r"^\s*include\s+(?:'(?<url>[^']*)'|<(?<url_system>[^>]*)>)\s*$");
line_pattern!(
    FUNCTION_BEGIN,
    r"^\s*(?:(?<async>async)\s+)?function\s+(?<name>[A-Za-z_]\w*)\s*\(\s*(?<args>[^)]*?)\s*\)\s*:\s*$"
);
line_pattern!(FUNCTION_END, r"^\s*endfunction\s*$");
line_pattern!(IF_BEGIN, r"^\s*if\s+(?<expr>.+?)\s*:\s*$");
line_pattern!(ELIF, r"^\s*elif\s+(?<expr>.+?)\s*:\s*$");
line_pattern!(ELSE, r"^\s*else\s*:\s*$");
line_pattern!(IF_END, r"^\s*endif\s*$");
line_pattern!(WHILE_BEGIN, r"^\s*while\s+(?<expr>.+?)\s*:\s*$");
line_pattern!(WHILE_END, r"^\s*endwhile\s*$");
line_pattern!(
    FOR_BEGIN,
    r"^\s*for\s+(?<value>[A-Za-z_]\w*)(?:\s*,\s*(?<index>[A-Za-z_]\w*))?\s+in\s+(?<expr>.+?)\s*:\s*$"
);
line_pattern!(FOR_END, r"^\s*endfor\s*$");
line_pattern!(BREAK, r"^\s*break\s*$");
line_pattern!(CONTINUE, r"^\s*continue\s*$");
line_pattern!(JUMP, r"^\s*jump\s+(?<name>[A-Za-z_]\w*)\s*$");
line_pattern!(JUMPIF, r"^\s*jumpif\s*\(\s*(?<expr>.+?)\s*\)\s+(?<name>[A-Za-z_]\w*)\s*$");
line_pattern!(RETURN, r"^\s*return(?:\s+(?<expr>.+?))?\s*$");
line_pattern!(LABEL, r"^\s*(?<name>[A-Za-z_]\w*)\s*:\s*$");
line_pattern!(ASSIGNMENT, r"^\s*(?<name>[A-Za-z_]\w*)\s*=\s*(?<expr>.*)$");

/// Parses script source text.
pub fn parse_script(text: &str, script_name: Option<&str>) -> Result<Script, ParserError> {
    parse_script_from(text, 1, script_name)
}

/// Parses script source text whose first line carries the given 1-based
/// number, for scripts extracted from larger documents.
pub fn parse_script_from(text: &str, start_line: usize, script_name: Option<&str>) -> Result<Script, ParserError> {
    let lines: Vec<&str> = split_lines(text);
    let mut parser = ScriptParser {
        script_name,
        statements: Vec::new(),
        function: None,
        blocks: Vec::new(),
        label_index: 0,
    };

    let mut index = 0;
    while index < lines.len() {
        let first = lines[index];
        if !CONTINUATION.is_match(first) {
            parser.parse_line(first, start_line + index, 1)?;
            index += 1;
            continue;
        }

        // join continuation lines with a single space
        let mut joined = CONTINUATION.replace(first, "").trim_end().to_owned();
        let mut line_count = 1;
        while index + line_count < lines.len() {
            let part = lines[index + line_count];
            line_count += 1;
            joined.push(' ');
            if CONTINUATION.is_match(part) {
                joined.push_str(CONTINUATION.replace(part, "").trim_end());
            } else {
                joined.push_str(part);
                break;
            }
        }
        parser.parse_line(&joined, start_line + index, line_count)?;
        index += line_count;
    }
    parser.finish(&lines)
}

fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line)).collect()
}

/// An open compound construct.
enum Block {
    If {
        /// Target of the current branch's failed guard; consumed by
        /// `elif`/`else` and emitted at `endif` when still pending.
        next_label: Option<String>,
        /// End-of-construct label, created at the first `elif`/`else`.
        done_label: Option<String>,
        line: String,
        line_number: usize,
    },
    While {
        loop_label: String,
        done_label: String,
        continue_label: Option<String>,
        index: usize,
        guard: Expr,
        line: String,
        line_number: usize,
    },
    For {
        loop_label: String,
        done_label: String,
        continue_label: Option<String>,
        index: usize,
        index_name: String,
        length_name: String,
        line: String,
        line_number: usize,
    },
}

impl Block {
    fn missing_end(&self) -> (&'static str, &str, usize) {
        match self {
            Self::If { line, line_number, .. } => ("Missing endif statement", line, *line_number),
            Self::While { line, line_number, .. } => ("Missing endwhile statement", line, *line_number),
            Self::For { line, line_number, .. } => ("Missing endfor statement", line, *line_number),
        }
    }
}

struct OpenFunction {
    def: FunctionDef,
    /// Depth of the block stack when the function opened; blocks below it
    /// belong to the enclosing scope.
    block_depth: usize,
    line: String,
}

struct ScriptParser<'a> {
    script_name: Option<&'a str>,
    statements: Vec<Statement>,
    function: Option<OpenFunction>,
    blocks: Vec<Block>,
    label_index: usize,
}

impl ScriptParser<'_> {
    fn error(&self, message: &str, line: &str, line_number: usize) -> ParserError {
        ParserError::new(message, line, 1, line_number, self.script_name)
    }

    fn sink(&mut self) -> &mut Vec<Statement> {
        match &mut self.function {
            Some(function) => &mut function.def.statements,
            None => &mut self.statements,
        }
    }

    fn next_index(&mut self) -> usize {
        self.label_index += 1;
        self.label_index
    }

    /// Blocks below this depth belong to the enclosing scope and cannot be
    /// closed from inside the current function.
    fn scope_floor(&self) -> usize {
        self.function.as_ref().map_or(0, |function| function.block_depth)
    }

    /// True when the current scope has an open block to close.
    fn has_open_block(&self) -> bool {
        self.blocks.len() > self.scope_floor()
    }

    /// Parses one logical line into zero or more statements.
    fn parse_line(&mut self, line: &str, line_number: usize, line_count: usize) -> Result<(), ParserError> {
        if COMMENT.is_match(line) {
            return Ok(());
        }

        if let Some(found) = INCLUDE.captures(line) {
            let (url, system) = match found.name("url") {
                Some(url) => (url.as_str(), false),
                None => (&found["url_system"], true),
            };
            let entry = IncludeEntry {
                url: url.to_owned(),
                system,
                line_number,
            };
            // adjacent include lines fold into one statement
            if let Some(Statement::Include { includes, .. }) = self.sink().last_mut() {
                includes.push(entry);
            } else {
                self.sink().push(Statement::Include {
                    includes: vec![entry],
                    line_number,
                });
            }
            return Ok(());
        }

        if let Some(found) = FUNCTION_BEGIN.captures(line) {
            if self.function.is_some() {
                return Err(self.error("Nested function definition", line, line_number));
            }
            let args_text = &found["args"];
            let mut args: Vec<String> = Vec::new();
            let mut last_arg_array = false;
            if !args_text.is_empty() {
                let mut parts = args_text.split(',').map(str::trim).peekable();
                while let Some(part) = parts.next() {
                    let (name, ellipsis) = match part.strip_suffix("...") {
                        Some(name) => (name.trim_end(), true),
                        None => (part, false),
                    };
                    if ellipsis && parts.peek().is_some() {
                        return Err(self.error("Syntax error", line, line_number));
                    }
                    if name.is_empty() || !is_identifier(name) {
                        return Err(self.error("Syntax error", line, line_number));
                    }
                    args.push(name.to_owned());
                    last_arg_array = ellipsis;
                }
            }
            self.function = Some(OpenFunction {
                def: FunctionDef {
                    is_async: found.name("async").is_some(),
                    name: found["name"].to_owned(),
                    args,
                    last_arg_array,
                    statements: Vec::new(),
                    line_number,
                },
                block_depth: self.blocks.len(),
                line: line.to_owned(),
            });
            return Ok(());
        }

        if FUNCTION_END.is_match(line) {
            let Some(function) = &self.function else {
                return Err(self.error("No matching function statement", line, line_number));
            };
            if self.blocks.len() > function.block_depth {
                let (message, opener, opener_line) = self.blocks[self.blocks.len() - 1].missing_end();
                let opener = opener.to_owned();
                return Err(self.error(message, &opener, opener_line));
            }
            if let Some(function) = self.function.take() {
                self.statements.push(Statement::Function(Rc::new(function.def)));
            }
            return Ok(());
        }

        if let Some(found) = IF_BEGIN.captures(line) {
            let guard = self.parse_guard(line, line_number, &found, "expr")?;
            let next_label = format!("__bareScriptIf{}", self.next_index());
            self.sink().push(Statement::Jump {
                label: next_label.clone(),
                expr: Some(negate(guard)),
                line_number,
            });
            self.blocks.push(Block::If {
                next_label: Some(next_label),
                done_label: None,
                line: line.to_owned(),
                line_number,
            });
            return Ok(());
        }

        if let Some(found) = ELIF.captures(line) {
            let guard = self.parse_guard(line, line_number, &found, "expr")?;
            if !self.has_open_block() {
                return Err(self.error("No matching if statement", line, line_number));
            }
            let branch_label = format!("__bareScriptIf{}", self.next_index());
            let done_index = self.next_index();
            let (previous, done) = match self.blocks.last_mut() {
                Some(Block::If {
                    next_label, done_label, ..
                }) if next_label.is_some() => {
                    let previous = next_label.take().unwrap_or_default();
                    *next_label = Some(branch_label.clone());
                    let done = done_label.get_or_insert_with(|| format!("__bareScriptDone{done_index}")).clone();
                    (previous, done)
                }
                _ => return Err(self.error("No matching if statement", line, line_number)),
            };
            self.sink().push(Statement::Jump {
                label: done,
                expr: None,
                line_number,
            });
            self.sink().push(Statement::Label {
                name: previous,
                line_number,
            });
            self.sink().push(Statement::Jump {
                label: branch_label,
                expr: Some(negate(guard)),
                line_number,
            });
            return Ok(());
        }

        if ELSE.is_match(line) {
            if !self.has_open_block() {
                return Err(self.error("No matching if statement", line, line_number));
            }
            let done_index = self.next_index();
            let (previous, done) = match self.blocks.last_mut() {
                Some(Block::If {
                    next_label, done_label, ..
                }) if next_label.is_some() => {
                    let previous = next_label.take().unwrap_or_default();
                    let done = done_label.get_or_insert_with(|| format!("__bareScriptDone{done_index}")).clone();
                    (previous, done)
                }
                _ => return Err(self.error("No matching if statement", line, line_number)),
            };
            self.sink().push(Statement::Jump {
                label: done,
                expr: None,
                line_number,
            });
            self.sink().push(Statement::Label {
                name: previous,
                line_number,
            });
            return Ok(());
        }

        if IF_END.is_match(line) {
            if !self.has_open_block() {
                return Err(self.error("No matching if statement", line, line_number));
            }
            match self.blocks.pop() {
                Some(Block::If {
                    next_label, done_label, ..
                }) => {
                    if let Some(label) = next_label {
                        self.sink().push(Statement::Label {
                            name: label,
                            line_number,
                        });
                    }
                    if let Some(label) = done_label {
                        self.sink().push(Statement::Label {
                            name: label,
                            line_number,
                        });
                    }
                }
                other => {
                    self.blocks.extend(other);
                    return Err(self.error("No matching if statement", line, line_number));
                }
            }
            return Ok(());
        }

        if let Some(found) = WHILE_BEGIN.captures(line) {
            let guard = self.parse_guard(line, line_number, &found, "expr")?;
            let index = self.next_index();
            let loop_label = format!("__bareScriptLoop{index}");
            let done_label = format!("__bareScriptDone{index}");
            self.sink().push(Statement::Jump {
                label: done_label.clone(),
                expr: Some(negate(guard.clone())),
                line_number,
            });
            self.sink().push(Statement::Label {
                name: loop_label.clone(),
                line_number,
            });
            self.blocks.push(Block::While {
                loop_label,
                done_label,
                continue_label: None,
                index,
                guard,
                line: line.to_owned(),
                line_number,
            });
            return Ok(());
        }

        if WHILE_END.is_match(line) {
            if !self.has_open_block() {
                return Err(self.error("No matching while statement", line, line_number));
            }
            let popped = match self.blocks.pop() {
                Some(block @ Block::While { .. }) => block,
                other => {
                    self.blocks.extend(other);
                    return Err(self.error("No matching while statement", line, line_number));
                }
            };
            let Block::While {
                loop_label,
                done_label,
                continue_label,
                guard,
                ..
            } = popped
            else {
                return Ok(());
            };
            if let Some(label) = continue_label {
                self.sink().push(Statement::Label {
                    name: label,
                    line_number,
                });
            }
            self.sink().push(Statement::Jump {
                label: loop_label,
                expr: Some(guard),
                line_number,
            });
            self.sink().push(Statement::Label {
                name: done_label,
                line_number,
            });
            return Ok(());
        }

        if let Some(found) = FOR_BEGIN.captures(line) {
            let values = self.parse_guard(line, line_number, &found, "expr")?;
            let index = self.next_index();
            let value_name = found["value"].to_owned();
            let index_name = found
                .name("index")
                .map_or_else(|| format!("__bareScriptIndex{index}"), |m| m.as_str().to_owned());
            let values_name = format!("__bareScriptValues{index}");
            let length_name = format!("__bareScriptLength{index}");
            let loop_label = format!("__bareScriptLoop{index}");
            let done_label = format!("__bareScriptDone{index}");
            self.sink().push(Statement::Expr {
                name: Some(values_name.clone()),
                expr: values,
                line_number,
                line_count,
            });
            self.sink().push(Statement::Expr {
                name: Some(length_name.clone()),
                expr: call("arrayLength", vec![Expr::Variable(values_name.clone())]),
                line_number,
                line_count: 1,
            });
            self.sink().push(Statement::Jump {
                label: done_label.clone(),
                expr: Some(negate(Expr::Variable(length_name.clone()))),
                line_number,
            });
            self.sink().push(Statement::Expr {
                name: Some(index_name.clone()),
                expr: Expr::Number(0.0),
                line_number,
                line_count: 1,
            });
            self.sink().push(Statement::Label {
                name: loop_label.clone(),
                line_number,
            });
            self.sink().push(Statement::Expr {
                name: Some(value_name),
                expr: call(
                    "arrayGet",
                    vec![Expr::Variable(values_name), Expr::Variable(index_name.clone())],
                ),
                line_number,
                line_count: 1,
            });
            self.blocks.push(Block::For {
                loop_label,
                done_label,
                continue_label: None,
                index,
                index_name,
                length_name,
                line: line.to_owned(),
                line_number,
            });
            return Ok(());
        }

        if FOR_END.is_match(line) {
            if !self.has_open_block() {
                return Err(self.error("No matching for statement", line, line_number));
            }
            let popped = match self.blocks.pop() {
                Some(block @ Block::For { .. }) => block,
                other => {
                    self.blocks.extend(other);
                    return Err(self.error("No matching for statement", line, line_number));
                }
            };
            let Block::For {
                loop_label,
                done_label,
                continue_label,
                index_name,
                length_name,
                ..
            } = popped
            else {
                return Ok(());
            };
            if let Some(label) = continue_label {
                self.sink().push(Statement::Label {
                    name: label,
                    line_number,
                });
            }
            self.sink().push(Statement::Expr {
                name: Some(index_name.clone()),
                expr: Expr::Binary {
                    op: BinaryOperator::Add,
                    left: Box::new(Expr::Variable(index_name.clone())),
                    right: Box::new(Expr::Number(1.0)),
                },
                line_number,
                line_count: 1,
            });
            self.sink().push(Statement::Jump {
                label: loop_label,
                expr: Some(Expr::Binary {
                    op: BinaryOperator::Less,
                    left: Box::new(Expr::Variable(index_name)),
                    right: Box::new(Expr::Variable(length_name)),
                }),
                line_number,
            });
            self.sink().push(Statement::Label {
                name: done_label,
                line_number,
            });
            return Ok(());
        }

        if BREAK.is_match(line) {
            let Some(label) = self.innermost_loop_label(false) else {
                return Err(self.error("Break statement outside of loop", line, line_number));
            };
            self.sink().push(Statement::Jump {
                label,
                expr: None,
                line_number,
            });
            return Ok(());
        }

        if CONTINUE.is_match(line) {
            let Some(label) = self.innermost_loop_label(true) else {
                return Err(self.error("Continue statement outside of loop", line, line_number));
            };
            self.sink().push(Statement::Jump {
                label,
                expr: None,
                line_number,
            });
            return Ok(());
        }

        if let Some(found) = JUMP.captures(line) {
            self.sink().push(Statement::Jump {
                label: found["name"].to_owned(),
                expr: None,
                line_number,
            });
            return Ok(());
        }

        if let Some(found) = JUMPIF.captures(line) {
            let guard = self.parse_guard(line, line_number, &found, "expr")?;
            self.sink().push(Statement::Jump {
                label: found["name"].to_owned(),
                expr: Some(guard),
                line_number,
            });
            return Ok(());
        }

        if let Some(found) = RETURN.captures(line) {
            let expr = match found.name("expr") {
                Some(_) => Some(self.parse_guard(line, line_number, &found, "expr")?),
                None => None,
            };
            self.sink().push(Statement::Return { expr, line_number });
            return Ok(());
        }

        if let Some(found) = LABEL.captures(line) {
            self.sink().push(Statement::Label {
                name: found["name"].to_owned(),
                line_number,
            });
            return Ok(());
        }

        if let Some(found) = ASSIGNMENT.captures(line) {
            // an "expression" starting with '=' means the line held '==':
            // fall through to the expression statement path
            if !found["expr"].starts_with('=') {
                let expr = self.parse_guard(line, line_number, &found, "expr")?;
                self.sink().push(Statement::Expr {
                    name: Some(found["name"].to_owned()),
                    expr,
                    line_number,
                    line_count,
                });
                return Ok(());
            }
        }

        let context = ExprContext {
            line,
            line_number,
            column_offset: 0,
            script_name: self.script_name,
        };
        let expr = parse_expression_text(line, context, true)?;
        self.sink().push(Statement::Expr {
            name: None,
            expr,
            line_number,
            line_count,
        });
        Ok(())
    }

    /// Parses a captured expression group, positioning errors at the
    /// capture's column within the line.
    fn parse_guard(
        &self,
        line: &str,
        line_number: usize,
        captures: &regex::Captures<'_>,
        group: &str,
    ) -> Result<Expr, ParserError> {
        let matched = captures.name(group).expect("named group present");
        let column_offset = line[..matched.start()].chars().count();
        let context = ExprContext {
            line,
            line_number,
            column_offset,
            script_name: self.script_name,
        };
        parse_expression_text(matched.as_str(), context, true)
    }

    /// The innermost enclosing loop's break target, or its continue target
    /// (created on first use), not crossing the current function boundary.
    fn innermost_loop_label(&mut self, for_continue: bool) -> Option<String> {
        let floor = self.scope_floor();
        for block in self.blocks[floor..].iter_mut().rev() {
            match block {
                Block::If { .. } => {}
                Block::While {
                    done_label,
                    continue_label,
                    index,
                    ..
                }
                | Block::For {
                    done_label,
                    continue_label,
                    index,
                    ..
                } => {
                    return Some(if for_continue {
                        continue_label
                            .get_or_insert_with(|| format!("__bareScriptContinue{index}"))
                            .clone()
                    } else {
                        done_label.clone()
                    });
                }
            }
        }
        None
    }

    fn finish(self, lines: &[&str]) -> Result<Script, ParserError> {
        if let Some(block) = self.blocks.last() {
            let (message, line, line_number) = block.missing_end();
            return Err(ParserError::new(message, line, 1, line_number, self.script_name));
        }
        if let Some(function) = &self.function {
            return Err(ParserError::new(
                "Missing endfunction statement",
                &function.line,
                1,
                function.def.line_number,
                self.script_name,
            ));
        }
        Ok(Script {
            statements: self.statements,
            script_name: self.script_name.map(str::to_owned),
            script_lines: Some(lines.iter().map(|&line| line.to_owned()).collect()),
            system: false,
        })
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next().is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

fn call(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Function(FunctionCall {
        name: name.to_owned(),
        args,
    })
}

fn negate(expr: Expr) -> Expr {
    Expr::Unary {
        op: UnaryOperator::Not,
        expr: Box::new(Expr::Group(Box::new(expr))),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(text: &str) -> Script {
        parse_script(text, Some("test.bare")).expect("script parses")
    }

    fn labels(script: &Script) -> Vec<&str> {
        script
            .statements
            .iter()
            .filter_map(|statement| match statement {
                Statement::Label { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let script = parse("# leading comment\n\n   \nx = 1\n");
        assert_eq!(script.statements.len(), 1);
        assert_eq!(script.statements[0].line_number(), 4);
    }

    #[test]
    fn continuation_joins_with_single_space() {
        let script = parse("x = 1 +   \\\n    2 + \\\n    3");
        let Statement::Expr {
            name, line_number, line_count, ..
        } = &script.statements[0]
        else {
            panic!("expected expression statement");
        };
        assert_eq!(name.as_deref(), Some("x"));
        assert_eq!(*line_number, 1);
        assert_eq!(*line_count, 3);
    }

    #[test]
    fn assignment_versus_comparison() {
        let script = parse("x = 1\nx == 1");
        assert!(matches!(&script.statements[0], Statement::Expr { name: Some(name), .. } if name == "x"));
        assert!(matches!(&script.statements[1], Statement::Expr { name: None, .. }));
    }

    #[test]
    fn function_definition() {
        let script = parse("async function join(sep, parts...):\n    return parts\nendfunction");
        let Statement::Function(def) = &script.statements[0] else {
            panic!("expected function statement");
        };
        assert!(def.is_async);
        assert_eq!(def.name, "join");
        assert_eq!(def.args, vec!["sep".to_owned(), "parts".to_owned()]);
        assert!(def.last_arg_array);
        assert_eq!(def.statements.len(), 1);
    }

    #[test]
    fn nested_function_is_rejected() {
        let error = parse_script("function a():\nfunction b():\nendfunction\nendfunction", None).unwrap_err();
        assert_eq!(error.error, "Nested function definition");
        assert_eq!(error.line_number, 2);
    }

    #[test]
    fn if_desugars_to_jumps_and_labels() {
        let script = parse("if a:\n    x = 1\nendif");
        let Statement::Jump { label, expr, .. } = &script.statements[0] else {
            panic!("expected jump");
        };
        assert_eq!(label, "__bareScriptIf1");
        assert!(expr.is_some());
        assert_eq!(labels(&script), vec!["__bareScriptIf1"]);
    }

    #[test]
    fn if_elif_else_desugar() {
        let script = parse("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\nendif");
        // guard jump, branch, done jump, branch label, guard jump, branch,
        // done jump, branch label, branch, branch label? no - else consumed it
        let jump_labels: Vec<&str> = script
            .statements
            .iter()
            .filter_map(|statement| match statement {
                Statement::Jump { label, .. } => Some(label.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            jump_labels,
            vec!["__bareScriptIf1", "__bareScriptDone3", "__bareScriptIf2", "__bareScriptDone3"]
        );
        assert_eq!(
            labels(&script),
            vec!["__bareScriptIf1", "__bareScriptIf2", "__bareScriptDone3"]
        );
    }

    #[test]
    fn while_desugar_checks_head_and_tail() {
        let script = parse("while n < 10:\n    n = n + 1\nendwhile");
        assert!(matches!(&script.statements[0], Statement::Jump { label, expr: Some(_), .. }
            if label == "__bareScriptDone1"));
        assert!(matches!(&script.statements[1], Statement::Label { name, .. } if name == "__bareScriptLoop1"));
        assert!(matches!(&script.statements[3], Statement::Jump { label, expr: Some(_), .. }
            if label == "__bareScriptLoop1"));
        assert!(matches!(&script.statements[4], Statement::Label { name, .. } if name == "__bareScriptDone1"));
    }

    #[test]
    fn for_desugar_synthesizes_temporaries() {
        let script = parse("for value, ix in values:\n    x = value\nendfor");
        let assigned: Vec<&str> = script
            .statements
            .iter()
            .filter_map(|statement| match statement {
                Statement::Expr { name: Some(name), .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            assigned,
            vec!["__bareScriptValues1", "__bareScriptLength1", "ix", "value", "x", "ix"]
        );
    }

    #[test]
    fn break_and_continue_target_innermost_loop() {
        let script = parse("while a:\n    while b:\n        break\n    endwhile\n    continue\nendwhile");
        let jumps: Vec<(&str, bool)> = script
            .statements
            .iter()
            .filter_map(|statement| match statement {
                Statement::Jump { label, expr, .. } => Some((label.as_str(), expr.is_some())),
                _ => None,
            })
            .collect();
        // break jumps to the inner done, continue to the outer continue label
        assert!(jumps.contains(&("__bareScriptDone2", false)));
        assert!(jumps.contains(&("__bareScriptContinue1", false)));
    }

    #[test]
    fn break_outside_loop_is_an_error() {
        let error = parse_script("break", None).unwrap_err();
        assert_eq!(error.error, "Break statement outside of loop");
        let error = parse_script("while a:\n    function f():\n        break\n    endfunction\nendwhile", None)
            .unwrap_err();
        assert_eq!(error.error, "Break statement outside of loop");
    }

    #[test]
    fn include_statements_fold_when_adjacent() {
        let script = parse("include 'a.bare'\ninclude <b.bare>\n\nx = 1\ninclude 'c.bare'");
        let Statement::Include { includes, .. } = &script.statements[0] else {
            panic!("expected include");
        };
        assert_eq!(includes.len(), 2);
        assert_eq!(includes[0].url, "a.bare");
        assert!(!includes[0].system);
        assert_eq!(includes[1].url, "b.bare");
        assert!(includes[1].system);
        assert!(matches!(&script.statements[2], Statement::Include { includes, .. } if includes.len() == 1));
    }

    #[test]
    fn jump_and_label_statements() {
        let script = parse("start:\njumpif (x > 1) start\njump done\ndone:");
        assert!(matches!(&script.statements[0], Statement::Label { name, .. } if name == "start"));
        assert!(matches!(&script.statements[1], Statement::Jump { label, expr: Some(_), .. } if label == "start"));
        assert!(matches!(&script.statements[2], Statement::Jump { label, expr: None, .. } if label == "done"));
    }

    #[test]
    fn missing_endif_points_at_opener() {
        let error = parse_script("if x:\n    return 1\n", None).unwrap_err();
        assert_eq!(error.error, "Missing endif statement");
        assert_eq!(error.line_number, 1);
        assert_eq!(error.column_number, 1);
        assert_eq!(error.line, "if x:");
    }

    #[test]
    fn missing_end_statements() {
        assert_eq!(parse_script("while x:\n", None).unwrap_err().error, "Missing endwhile statement");
        assert_eq!(parse_script("for v in x:\n", None).unwrap_err().error, "Missing endfor statement");
        assert_eq!(parse_script("function f():\n", None).unwrap_err().error, "Missing endfunction statement");
        assert_eq!(
            parse_script("function f():\n    if x:\nendfunction", None).unwrap_err().error,
            "Missing endif statement"
        );
    }

    #[test]
    fn stray_end_statements() {
        assert_eq!(parse_script("endif", None).unwrap_err().error, "No matching if statement");
        assert_eq!(parse_script("endwhile", None).unwrap_err().error, "No matching while statement");
        assert_eq!(parse_script("endfor", None).unwrap_err().error, "No matching for statement");
        assert_eq!(
            parse_script("endfunction", None).unwrap_err().error,
            "No matching function statement"
        );
    }

    #[test]
    fn expression_error_position_within_statement() {
        let error = parse_script("x = 1 + $", Some("test.bare")).unwrap_err();
        assert_eq!(error.error, "Syntax error");
        assert_eq!(error.line_number, 1);
        assert_eq!(error.column_number, 9);
        assert_eq!(error.script_name.as_deref(), Some("test.bare"));
    }

    #[test]
    fn start_line_offsets_statement_lines() {
        let script = parse_script_from("x = 1\ny = 2", 10, None).expect("parses");
        assert_eq!(script.statements[0].line_number(), 10);
        assert_eq!(script.statements[1].line_number(), 11);
    }

    #[test]
    fn script_round_trips_through_binary_form() {
        let script = parse("function f(a):\n    return a\nendfunction\nf(1)");
        let data = script.dump().expect("serializes");
        assert_eq!(Script::load(&data).expect("deserializes"), script);
    }
}
