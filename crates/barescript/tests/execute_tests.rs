//! End-to-end execution scenarios for the synchronous interpreter.

use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;
use pretty_assertions::assert_eq;

use barescript::{
    ExecuteOptions, Value, ValueObject, execute_script, parse_script, script_exit_code,
};

fn run(source: &str) -> Value {
    let script = parse_script(source, Some("test.bare")).expect("script parses");
    execute_script(&script, &ExecuteOptions::default()).expect("script executes")
}

fn globals_of(entries: Vec<(&str, Value)>) -> ValueObject {
    let map: IndexMap<String, Value> = entries.into_iter().map(|(name, value)| (name.to_owned(), value)).collect();
    Rc::new(RefCell::new(map))
}

#[test]
fn function_call_with_seeded_global() {
    let script = parse_script(
        "function double(n):\n    return n * 2\nendfunction\nreturn double(N)",
        None,
    )
    .expect("script parses");
    let options = ExecuteOptions {
        globals: Some(globals_of(vec![("N", Value::Number(10.0))])),
        ..ExecuteOptions::default()
    };
    assert_eq!(execute_script(&script, &options).expect("executes"), Value::Number(20.0));
}

#[test]
fn recursive_fibonacci() {
    let source = "\
function fibonacci(n):
    if n < 2:
        return n
    endif
    return fibonacci(n - 1) + fibonacci(n - 2)
endfunction
return fibonacci(10)";
    assert_eq!(run(source), Value::Number(55.0));
}

#[test]
fn string_number_addition_coerces() {
    assert_eq!(run("return 'x' + 1"), Value::string("x1"));
    assert_eq!(run("return 1 + 'x'"), Value::string("1x"));
}

#[test]
fn division_by_zero_is_infinite() {
    assert_eq!(run("return 1 / 0"), Value::Number(f64::INFINITY));
}

#[test]
fn short_circuit_skips_right_side() {
    // the right side never evaluates, so the undefined function is never called
    assert_eq!(run("return 0 && undefinedFn()"), Value::Number(0.0));
    assert_eq!(run("return 1 || undefinedFn()"), Value::Number(1.0));
    // and the operators return the deciding operand value, not a boolean
    assert_eq!(run("return 7 && 8"), Value::Number(8.0));
    assert_eq!(run("return 0 || ''"), Value::string(""));
}

#[test]
fn undefined_function_is_a_runtime_error() {
    let script = parse_script("return undefinedFn()", Some("test.bare")).expect("script parses");
    let error = execute_script(&script, &ExecuteOptions::default()).expect_err("fails");
    assert_eq!(error.error, "Undefined function \"undefinedFn\"");
    assert_eq!(error.to_string(), "test.bare:1: Undefined function \"undefinedFn\"");
}

#[test]
fn unknown_jump_label_is_a_runtime_error() {
    let script = parse_script("jump nowhere", None).expect("script parses");
    let error = execute_script(&script, &ExecuteOptions::default()).expect_err("fails");
    assert_eq!(error.error, "Unknown jump label \"nowhere\"");
    assert_eq!(error.line_number, Some(1));
}

#[test]
fn missing_variables_evaluate_to_null() {
    assert_eq!(run("return missing"), Value::Null);
    assert_eq!(run("return null"), Value::Null);
    assert_eq!(run("return true"), Value::Bool(true));
    assert_eq!(run("return false"), Value::Bool(false));
}

#[test]
fn if_special_form_evaluates_only_selected_branch() {
    assert_eq!(run("return if(1, 'yes', undefinedFn())"), Value::string("yes"));
    assert_eq!(run("return if(0, undefinedFn(), 'no')"), Value::string("no"));
    assert_eq!(run("return if(0, 'yes')"), Value::Null);
}

#[test]
fn locals_shadow_globals_and_release_on_return() {
    let source = "\
x = 1
function shadow():
    x = 2
    return x
endfunction
inner = shadow()
return arrayNew(inner, x)";
    let result = run(source);
    assert_eq!(result, Value::array(vec![Value::Number(2.0), Value::Number(1.0)]));
}

#[test]
fn function_definitions_install_into_globals() {
    let source = "\
function late():
    return early()
endfunction
function early():
    return 3
endfunction
return late()";
    assert_eq!(run(source), Value::Number(3.0));
}

#[test]
fn missing_arguments_default_to_null_and_last_arg_array_collects() {
    let source = "\
function tail(first, rest...):
    return arrayNew(first, rest)
endfunction
return tail(1, 2, 3)";
    assert_eq!(
        run(source),
        Value::array(vec![
            Value::Number(1.0),
            Value::array(vec![Value::Number(2.0), Value::Number(3.0)]),
        ])
    );
    assert_eq!(
        run("function pair(a, b):\n    return arrayNew(a, b)\nendfunction\nreturn pair(1)"),
        Value::array(vec![Value::Number(1.0), Value::Null])
    );
}

#[test]
fn while_and_for_loops() {
    let source = "\
total = 0
n = 0
while n < 5:
    n = n + 1
    if n == 3:
        continue
    endif
    total = total + n
endwhile
return total";
    assert_eq!(run(source), Value::Number(12.0));

    let source = "\
total = 0
for value, i in arrayNew(10, 20, 30):
    total = total + value + i
endfor
return total";
    assert_eq!(run(source), Value::Number(63.0));
}

#[test]
fn break_leaves_innermost_loop() {
    let source = "\
count = 0
while true:
    count = count + 1
    if count == 4:
        break
    endif
endwhile
return count";
    assert_eq!(run(source), Value::Number(4.0));
}

#[test]
fn whitespace_and_comments_do_not_change_results() {
    let plain = "x = 1\ny = x + 2\nreturn y";
    let noisy = "# setup\nx  =  1\n\n   # middle comment\ny = x +   2   # trailing\nreturn y";
    assert_eq!(run(plain), run(noisy));
}

#[test]
fn statement_limit_counts_executed_statements() {
    let source = "x = 1\ny = 2\nz = 3";
    let script = parse_script(source, None).expect("script parses");
    let ok = ExecuteOptions {
        max_statements: 3,
        ..ExecuteOptions::default()
    };
    assert_eq!(execute_script(&script, &ok).expect("executes"), Value::Null);

    let limited = ExecuteOptions {
        max_statements: 2,
        ..ExecuteOptions::default()
    };
    let error = execute_script(&script, &limited).expect_err("limit exceeded");
    assert_eq!(error.error, "Exceeded maximum script statements (2)");

    let unlimited = ExecuteOptions {
        max_statements: 0,
        ..ExecuteOptions::default()
    };
    assert_eq!(execute_script(&script, &unlimited).expect("executes"), Value::Null);
}

#[test]
fn taken_jump_targets_count_toward_the_limit() {
    // statements executed: assignment, jump, label, assignment = 4
    let source = "x = 1\njump done\ndone:\ny = 2";
    let script = parse_script(source, None).expect("script parses");
    let exact = ExecuteOptions {
        max_statements: 4,
        ..ExecuteOptions::default()
    };
    assert_eq!(execute_script(&script, &exact).expect("executes"), Value::Null);
    let short = ExecuteOptions {
        max_statements: 3,
        ..ExecuteOptions::default()
    };
    assert!(execute_script(&script, &short).is_err());
}

#[test]
fn coverage_records_per_line_hit_counts() {
    let source = "function f():\n    return 1\nendfunction\nf()\nf()";
    let script = parse_script(source, Some("covered.bare")).expect("script parses");
    let coverage = globals_of(vec![("enabled", Value::Bool(true))]);
    let globals = globals_of(vec![("__bareScriptCoverage", Value::Object(coverage))]);
    let options = ExecuteOptions {
        globals: Some(globals.clone()),
        ..ExecuteOptions::default()
    };
    execute_script(&script, &options).expect("executes");

    let globals = globals.borrow();
    let Some(Value::Object(coverage)) = globals.get("__bareScriptCoverage") else {
        panic!("coverage table missing");
    };
    let coverage = coverage.borrow();
    let Some(Value::Object(scripts)) = coverage.get("scripts") else {
        panic!("scripts entry missing");
    };
    let scripts = scripts.borrow();
    let Some(Value::Object(entry)) = scripts.get("covered.bare") else {
        panic!("script entry missing");
    };
    let entry = entry.borrow();
    let Some(Value::Object(covered)) = entry.get("covered") else {
        panic!("covered entry missing");
    };
    let covered = covered.borrow();
    let Some(Value::Object(line)) = covered.get("2") else {
        panic!("line entry missing");
    };
    let line = line.borrow();
    assert_eq!(line.get("count"), Some(&Value::Number(2.0)));
    assert_eq!(line.get("statement"), Some(&Value::string("return 1")));
}

#[test]
fn exit_codes_from_results() {
    assert_eq!(script_exit_code(&Value::Number(3.0)), 3);
    assert_eq!(script_exit_code(&Value::Number(0.0)), 0);
    assert_eq!(script_exit_code(&Value::Number(255.0)), 255);
    assert_eq!(script_exit_code(&Value::Number(300.0)), 1);
    assert_eq!(script_exit_code(&Value::Number(2.5)), 1);
    assert_eq!(script_exit_code(&Value::Null), 0);
    assert_eq!(script_exit_code(&Value::string("done")), 1);
}

#[test]
fn object_and_array_literals_in_statements() {
    let source = "\
entry = {'name': 'a', 'count': 2}
values = [1, 2, 3]
return arrayNew(objectGet(entry, 'count'), arrayLength(values))";
    assert_eq!(run(source), Value::array(vec![Value::Number(2.0), Value::Number(3.0)]));
}

#[test]
fn shared_globals_survive_across_scripts() {
    let globals = globals_of(vec![]);
    let options = ExecuteOptions {
        globals: Some(globals.clone()),
        ..ExecuteOptions::default()
    };
    let first = parse_script("counter = 41", None).expect("parses");
    execute_script(&first, &options).expect("executes");
    let second = parse_script("return counter + 1", None).expect("parses");
    assert_eq!(execute_script(&second, &options).expect("executes"), Value::Number(42.0));
}
