//! Library documentation extraction from tagged source comments.
//!
//! Scans `//` and `#` comments for `$function`, `$group`, `$doc`, `$return`,
//! and `$arg <name>:` directives and assembles per-function documentation
//! records. Used by the documentation tooling, not by the interpreter.

use std::{fmt, sync::LazyLock};

use regex::Regex;

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(?://|#)\s?(?<text>.*)$").expect("static pattern"));
static DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$(?<keyword>function|group|doc|return):\s?(?<text>.*)$").expect("static pattern"));
static ARG_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$arg\s+(?<name>[A-Za-z_]\w*(?:\.\.\.)?):\s?(?<text>.*)$").expect("static pattern")
});

/// Documentation for one library function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionDoc {
    pub name: String,
    pub group: String,
    pub doc: Vec<String>,
    pub args: Vec<FunctionArgDoc>,
    pub return_doc: Vec<String>,
}

/// Documentation for one function argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionArgDoc {
    pub name: String,
    pub doc: Vec<String>,
}

/// Extraction failure: one message per defect found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocError {
    pub errors: Vec<String>,
}

impl fmt::Display for DocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.errors.join("\n"))
    }
}

impl std::error::Error for DocError {}

/// Extracts function documentation from `(file, text)` pairs.
///
/// Every function must carry a group and documentation text; a duplicate
/// function name, a directive outside a function, and an empty result are
/// errors.
pub fn extract_docs(files: &[(String, String)]) -> Result<Vec<FunctionDoc>, DocError> {
    let mut errors: Vec<String> = Vec::new();
    let mut functions: Vec<(FunctionDoc, String, usize)> = Vec::new();

    for (file, text) in files {
        let mut current: Option<usize> = None;
        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            let Some(comment) = COMMENT.captures(line) else {
                continue;
            };
            let content = comment["text"].trim_end();

            if let Some(found) = ARG_DIRECTIVE.captures(content) {
                let Some(function) = current.map(|index| &mut functions[index].0) else {
                    errors.push(format!("{file}:{line_number}: $arg directive outside function"));
                    continue;
                };
                let name = &found["name"];
                let text = &found["text"];
                let position = match function.args.iter().position(|arg| arg.name == name) {
                    Some(position) => position,
                    None => {
                        function.args.push(FunctionArgDoc {
                            name: name.to_owned(),
                            doc: Vec::new(),
                        });
                        function.args.len() - 1
                    }
                };
                push_doc_line(&mut function.args[position].doc, text);
                continue;
            }

            let Some(found) = DIRECTIVE.captures(content) else {
                continue;
            };
            let keyword = &found["keyword"];
            let text = found["text"].to_owned();
            if keyword == "function" {
                if let Some(existing) = functions.iter().position(|(function, _, _)| function.name == text) {
                    errors.push(format!("{file}:{line_number}: Redefinition of function \"{text}\""));
                    // keep collecting against the original record
                    current = Some(existing);
                    continue;
                }
                functions.push((
                    FunctionDoc {
                        name: text,
                        ..FunctionDoc::default()
                    },
                    file.clone(),
                    line_number,
                ));
                current = Some(functions.len() - 1);
                continue;
            }
            let Some(function) = current.map(|index| &mut functions[index].0) else {
                errors.push(format!("{file}:{line_number}: ${keyword} directive outside function"));
                continue;
            };
            match keyword {
                "group" => function.group = text,
                "doc" => push_doc_line(&mut function.doc, &text),
                _ => push_doc_line(&mut function.return_doc, &text),
            }
        }
    }

    for (function, file, line_number) in &functions {
        if function.group.is_empty() {
            errors.push(format!("{file}:{line_number}: Function \"{}\" missing group", function.name));
        }
        if function.doc.is_empty() {
            errors.push(format!(
                "{file}:{line_number}: Function \"{}\" missing documentation",
                function.name
            ));
        }
    }
    if functions.is_empty() {
        errors.push("No library documentation".to_owned());
    }
    if !errors.is_empty() {
        return Err(DocError { errors });
    }

    let mut records: Vec<FunctionDoc> = functions.into_iter().map(|(function, _, _)| function).collect();
    records.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(records)
}

/// Appends one documentation line, discarding leading blank lines.
fn push_doc_line(doc: &mut Vec<String>, text: &str) {
    if text.is_empty() && doc.is_empty() {
        return;
    }
    doc.push(text.to_owned());
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn file(text: &str) -> Vec<(String, String)> {
        vec![("lib.js".to_owned(), text.to_owned())]
    }

    #[test]
    fn extracts_sorted_function_records() {
        let files = file(
            "\
// $function: zebraSort
// $group: Sort
// $doc: Sorts zebras
code();
# $function: antSort
# $group: Sort
# $doc: Sorts ants
# $arg values: The values to sort
# $return: The sorted array
",
        );
        let records = extract_docs(&files).expect("extraction succeeds");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "antSort");
        assert_eq!(records[0].args.len(), 1);
        assert_eq!(records[0].args[0].name, "values");
        assert_eq!(records[0].args[0].doc, vec!["The values to sort".to_owned()]);
        assert_eq!(records[0].return_doc, vec!["The sorted array".to_owned()]);
        assert_eq!(records[1].name, "zebraSort");
    }

    #[test]
    fn leading_blank_doc_lines_are_discarded() {
        let files = file(
            "\
// $function: pad
// $group: Text
// $doc:
// $doc: Pads text
// $doc:
",
        );
        let records = extract_docs(&files).expect("extraction succeeds");
        assert_eq!(records[0].doc, vec!["Pads text".to_owned(), String::new()]);
    }

    #[test]
    fn directive_outside_function_is_an_error() {
        let error = extract_docs(&file("// $doc: stray")).expect_err("error expected");
        assert_eq!(
            error.errors,
            vec![
                "lib.js:1: $doc directive outside function".to_owned(),
                "No library documentation".to_owned(),
            ]
        );
    }

    #[test]
    fn duplicate_function_is_an_error() {
        let error = extract_docs(&file(
            "// $function: dup\n// $group: G\n// $doc: D\n// $function: dup\n// $group: G\n// $doc: D",
        ))
        .expect_err("error expected");
        assert_eq!(error.errors, vec!["lib.js:4: Redefinition of function \"dup\"".to_owned()]);
    }

    #[test]
    fn missing_group_and_doc_are_errors() {
        let error = extract_docs(&file("// $function: bare")).expect_err("error expected");
        assert_eq!(
            error.errors,
            vec![
                "lib.js:1: Function \"bare\" missing group".to_owned(),
                "lib.js:1: Function \"bare\" missing documentation".to_owned(),
            ]
        );
    }

    #[test]
    fn empty_input_is_an_error() {
        let error = extract_docs(&[]).expect_err("error expected");
        assert_eq!(error.errors, vec!["No library documentation".to_owned()]);
    }
}
