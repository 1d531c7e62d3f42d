//! The standalone expression evaluation surface.

use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;
use pretty_assertions::assert_eq;

use barescript::{ExecuteOptions, Value, ValueObject, evaluate_expression, parse_expression};

fn evaluate(text: &str) -> Value {
    let expr = parse_expression(text, false).expect("expression parses");
    evaluate_expression(&expr, &ExecuteOptions::default(), None, true).expect("expression evaluates")
}

fn store(entries: Vec<(&str, Value)>) -> ValueObject {
    let map: IndexMap<String, Value> = entries.into_iter().map(|(name, value)| (name.to_owned(), value)).collect();
    Rc::new(RefCell::new(map))
}

#[test]
fn arithmetic_with_precedence() {
    assert_eq!(evaluate("1 + 2 * 3"), Value::Number(7.0));
    assert_eq!(evaluate("(1 + 2) * 3"), Value::Number(9.0));
    assert_eq!(evaluate("2 ** 3 * 2"), Value::Number(16.0));
    assert_eq!(evaluate("7 % 4"), Value::Number(3.0));
    assert_eq!(evaluate("1 < 2 && 2 < 3"), Value::Bool(true));
    assert_eq!(evaluate("1 | 2 ^ 3 & 2"), Value::Number(1.0));
    assert_eq!(evaluate("1 << 3 >> 1"), Value::Number(4.0));
    assert_eq!(evaluate("-3 + 1"), Value::Number(-2.0));
    assert_eq!(evaluate("!0"), Value::Bool(true));
    assert_eq!(evaluate("~0"), Value::Number(-1.0));
}

#[test]
fn comparison_agrees_with_total_order() {
    assert_eq!(evaluate("null < 0"), Value::Bool(true));
    assert_eq!(evaluate("'a' < 'b'"), Value::Bool(true));
    assert_eq!(evaluate("1 == 1 && 1 != 2"), Value::Bool(true));
    // distinct kinds order by type-tag name: "number" < "string"
    assert_eq!(evaluate("1 < 'a'"), Value::Bool(true));
}

#[test]
fn aliases_resolve_after_locals_and_globals() {
    assert_eq!(evaluate("max(2, 7, 3)"), Value::Number(7.0));
    assert_eq!(evaluate("upper('ab')"), Value::string("AB"));
    assert_eq!(evaluate("fixed(3.14159, 3)"), Value::string("3.142"));
    assert_eq!(evaluate("parseInt('2a', 16)"), Value::Number(42.0));
    assert_eq!(evaluate("len(text(1234))"), Value::Number(4.0));
    assert_eq!(evaluate("year(date(2024, 3, 9))"), Value::Number(2024.0));
}

#[test]
fn globals_and_locals_resolution() {
    let globals = store(vec![("n", Value::Number(2.0))]);
    let locals = store(vec![("n", Value::Number(40.0))]);
    let options = ExecuteOptions {
        globals: Some(globals),
        ..ExecuteOptions::default()
    };
    let expr = parse_expression("n + 2", false).expect("parses");
    assert_eq!(evaluate_expression(&expr, &options, None, true).expect("evaluates"), Value::Number(4.0));
    assert_eq!(
        evaluate_expression(&expr, &options, Some(&locals), true).expect("evaluates"),
        Value::Number(42.0)
    );
}

#[test]
fn if_special_form_in_expressions() {
    let globals = store(vec![("flag", Value::Bool(true))]);
    let options = ExecuteOptions {
        globals: Some(globals),
        ..ExecuteOptions::default()
    };
    let expr = parse_expression("if(flag, 'on', 'off')", false).expect("parses");
    assert_eq!(evaluate_expression(&expr, &options, None, true).expect("evaluates"), Value::string("on"));
}

#[test]
fn object_literals_without_array_literals() {
    // the pure expression surface accepts object literals but not array
    // literals
    assert_eq!(evaluate("objectGet({'a': 3}, 'a')").to_display_string(), "3");
    assert!(parse_expression("[1, 2]", false).is_err());
}

#[test]
fn user_functions_from_globals_are_callable() {
    let globals = store(vec![]);
    let options = ExecuteOptions {
        globals: Some(globals.clone()),
        ..ExecuteOptions::default()
    };
    let script = barescript::parse_script("function inc(n):\n    return n + 1\nendfunction", None).expect("parses");
    barescript::execute_script(&script, &options).expect("executes");

    let expr = parse_expression("inc(41)", false).expect("parses");
    assert_eq!(evaluate_expression(&expr, &options, None, true).expect("evaluates"), Value::Number(42.0));
}
