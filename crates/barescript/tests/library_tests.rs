//! Runtime library behavior through script execution, including the
//! argument-validation recovery policy.

use std::{cell::RefCell, rc::Rc};

use pretty_assertions::assert_eq;

use barescript::{ExecuteOptions, Value, execute_script, parse_script};

fn run(source: &str) -> Value {
    let script = parse_script(source, Some("test.bare")).expect("script parses");
    execute_script(&script, &ExecuteOptions::default()).expect("script executes")
}

fn numbers(values: &[f64]) -> Value {
    Value::array(values.iter().copied().map(Value::Number).collect())
}

#[test]
fn array_functions() {
    assert_eq!(run("return arrayLength(arrayNew(1, 2, 3))"), Value::Number(3.0));
    assert_eq!(run("a = arrayNew(1, 2)\narrayPush(a, 3, 4)\nreturn a"), numbers(&[1.0, 2.0, 3.0, 4.0]));
    assert_eq!(run("a = arrayNew(1, 2)\nlast = arrayPop(a)\nreturn arrayNew(last, arrayLength(a))"), numbers(&[2.0, 1.0]));
    assert_eq!(run("return arrayIndexOf(arrayNew('a', 'b', 'a'), 'a', 1)"), Value::Number(2.0));
    assert_eq!(run("return arrayIndexOf(arrayNew('a'), 'z')"), Value::Number(-1.0));
    assert_eq!(run("return arrayJoin(arrayNew(1, 'x', null), '-')"), Value::string("1-x-null"));
    assert_eq!(run("return arraySlice(arrayNew(1, 2, 3, 4), 1, 3)"), numbers(&[2.0, 3.0]));
    assert_eq!(run("return arraySort(arrayNew(3, 1, 2))"), numbers(&[1.0, 2.0, 3.0]));
    assert_eq!(run("return arraySort(arrayNew(3, 1, 2), true)"), numbers(&[3.0, 2.0, 1.0]));
    // copies are new arrays, extend mutates in place
    assert_eq!(run("a = arrayNew(1)\nb = arrayCopy(a)\narrayPush(b, 2)\nreturn arrayLength(a)"), Value::Number(1.0));
    assert_eq!(run("a = arrayNew(1)\narrayExtend(a, arrayNew(2, 3))\nreturn a"), numbers(&[1.0, 2.0, 3.0]));
    assert_eq!(run("a = arrayNew(1, 2)\narraySet(a, 0, 9)\nreturn a"), numbers(&[9.0, 2.0]));
}

#[test]
fn object_functions() {
    assert_eq!(run("o = objectNew('a', 1, 'b', 2)\nreturn objectGet(o, 'b')"), Value::Number(2.0));
    assert_eq!(run("o = objectNew()\nreturn objectGet(o, 'missing', 'dflt')"), Value::string("dflt"));
    assert_eq!(run("o = objectNew('a', 1)\nobjectSet(o, 'b', 2)\nreturn objectKeys(o)"),
        Value::array(vec![Value::string("a"), Value::string("b")]));
    assert_eq!(run("o = objectNew('a', 1)\nreturn objectHas(o, 'a')"), Value::Bool(true));
    assert_eq!(run("o = objectNew('a', 1, 'b', 2)\nobjectDelete(o, 'a')\nreturn objectKeys(o)"),
        Value::array(vec![Value::string("b")]));
    assert_eq!(run("o = objectNew('a', 1)\nobjectAssign(o, objectNew('a', 2, 'b', 3))\nreturn objectGet(o, 'a')"),
        Value::Number(2.0));
    // odd trailing key takes null
    assert_eq!(run("return objectGet(objectNew('only'), 'only')"), Value::Null);
}

#[test]
fn args_errors_recover_to_the_return_value() {
    // arrayLength requires an array; the call site sees null
    assert_eq!(run("return arrayLength(7)"), Value::Null);
    // arrayIndexOf recovers to -1
    assert_eq!(run("return arrayIndexOf(7, 'x')"), Value::Number(-1.0));
    // objectGet recovers to the supplied default
    assert_eq!(run("return objectGet(7, 'k', 'dflt')"), Value::string("dflt"));
    // too many arguments recovers to null
    assert_eq!(run("return systemBoolean(1, 2, 3)"), Value::Null);
    // out-of-range index recovers to null
    assert_eq!(run("return arrayGet(arrayNew(1), 5)"), Value::Null);
}

#[test]
fn system_functions() {
    assert_eq!(run("return systemBoolean('x')"), Value::Bool(true));
    assert_eq!(run("return systemBoolean(0)"), Value::Bool(false));
    assert_eq!(run("return systemCompare(1, 2)"), Value::Number(-1.0));
    assert_eq!(run("return systemCompare('b', 'a')"), Value::Number(1.0));
    assert_eq!(run("return systemType(arrayNew())"), Value::string("array"));
    assert_eq!(run("return systemType(null)"), Value::string("null"));
    assert_eq!(run("return systemText(12.5)"), Value::string("12.5"));
    assert_eq!(run("a = arrayNew(1)\nb = a\nreturn systemIs(a, b)"), Value::Bool(true));
    assert_eq!(run("return systemIs(arrayNew(1), arrayNew(1))"), Value::Bool(false));
    assert_eq!(run("systemGlobalSet('flag', 42)\nreturn systemGlobalGet('flag')"), Value::Number(42.0));
    assert_eq!(run("return systemGlobalGet('missing', 'dflt')"), Value::string("dflt"));
}

#[test]
fn system_log_writes_to_the_log_sink() {
    let messages = Rc::new(RefCell::new(Vec::new()));
    let sink = messages.clone();
    let options = ExecuteOptions {
        log_fn: Some(Rc::new(move |message: &str| sink.borrow_mut().push(message.to_owned()))),
        ..ExecuteOptions::default()
    };
    let script = parse_script("systemLog('hello ' + 42)\nsystemLogDebug('quiet')", None).expect("parses");
    execute_script(&script, &options).expect("executes");
    // systemLogDebug is silent outside debug mode
    assert_eq!(messages.borrow().as_slice(), ["hello 42".to_owned()]);
}

#[test]
fn math_functions() {
    assert_eq!(run("return mathAbs(-3)"), Value::Number(3.0));
    assert_eq!(run("return mathCeil(2.1)"), Value::Number(3.0));
    assert_eq!(run("return mathFloor(2.9)"), Value::Number(2.0));
    assert_eq!(run("return mathRound(2.5)"), Value::Number(3.0));
    assert_eq!(run("return mathSqrt(16)"), Value::Number(4.0));
    assert_eq!(run("return mathSign(-7)"), Value::Number(-1.0));
    assert_eq!(run("return mathSign(0)"), Value::Number(0.0));
    assert_eq!(run("return mathLog(1000)"), Value::Number(3.0));
    assert_eq!(run("return mathLog(8, 2)"), Value::Number(3.0));
    assert_eq!(run("return mathMax(1, 9, 4)"), Value::Number(9.0));
    assert_eq!(run("return mathMin(5, 2, 8)"), Value::Number(2.0));
    assert_eq!(run("return mathMax()"), Value::Null);
    assert_eq!(run("return mathExp(0)"), Value::Number(1.0));
}

#[test]
fn number_functions() {
    assert_eq!(run("return numberToFixed(2.125, 2)"), Value::string("2.12"));
    assert_eq!(run("return numberToFixed(2.5, 4, true)"), Value::string("2.5"));
    assert_eq!(run("return numberParseFloat('3.5e1')"), Value::Number(35.0));
    assert_eq!(run("return numberParseFloat('bogus')"), Value::Null);
    assert_eq!(run("return numberParseInt('ff', 16)"), Value::Number(255.0));
    assert_eq!(run("return numberParseInt('12')"), Value::Number(12.0));
}

#[test]
fn string_functions() {
    assert_eq!(run("return stringLength('héllo')"), Value::Number(5.0));
    assert_eq!(run("return stringUpper('ab')"), Value::string("AB"));
    assert_eq!(run("return stringLower('AB')"), Value::string("ab"));
    assert_eq!(run("return stringTrim('  x  ')"), Value::string("x"));
    assert_eq!(run("return stringSlice('abcdef', 1, 3)"), Value::string("bc"));
    assert_eq!(run("return stringSlice('abcdef', 4)"), Value::string("ef"));
    assert_eq!(run("return stringSplit('a,b,c', ',')"),
        Value::array(vec![Value::string("a"), Value::string("b"), Value::string("c")]));
    assert_eq!(run("return stringIndexOf('banana', 'na')"), Value::Number(2.0));
    assert_eq!(run("return stringIndexOf('banana', 'na', 3)"), Value::Number(4.0));
    assert_eq!(run("return stringIndexOf('banana', 'z')"), Value::Number(-1.0));
    assert_eq!(run("return stringStartsWith('banana', 'ban')"), Value::Bool(true));
    assert_eq!(run("return stringEndsWith('banana', 'ban')"), Value::Bool(false));
    assert_eq!(run("return stringReplace('a-b-c', '-', '+')"), Value::string("a+b+c"));
    assert_eq!(run("return stringRepeat('ab', 3)"), Value::string("ababab"));
    assert_eq!(run("return stringCharCodeAt('abc', 1)"), Value::Number(98.0));
    assert_eq!(run("return stringFromCharCode(104, 105)"), Value::string("hi"));
}

#[test]
fn regex_functions() {
    assert_eq!(run("return regexTest(regexNew('a+b'), 'caab')"), Value::Bool(true));
    assert_eq!(run("return regexTest(regexNew('A+B'), 'caab')"), Value::Bool(false));
    assert_eq!(run("return regexTest(regexNew('A+B', 'i'), 'caab')"), Value::Bool(true));
    assert_eq!(run("return regexNew('(unclosed')"), Value::Null);
    assert_eq!(
        run("m = regexMatch(regexNew('(?<word>\\\\w+)-(\\\\d+)'), 'abc-42')\nreturn objectGet(m, 'word')"),
        Value::string("abc")
    );
    assert_eq!(
        run("m = regexMatch(regexNew('(a)(b)?'), 'xa')\nreturn objectGet(m, '0')"),
        Value::string("a")
    );
    assert_eq!(run("return regexMatch(regexNew('z+'), 'abc')"), Value::Null);
    assert_eq!(run("return regexReplace(regexNew('\\\\d+'), 'a1b22', '#')"), Value::string("a#b#"));
    assert_eq!(run("return regexSplit(regexNew(',\\\\s*'), 'a, b,c')"),
        Value::array(vec![Value::string("a"), Value::string("b"), Value::string("c")]));
}

#[test]
fn datetime_functions() {
    assert_eq!(run("d = datetimeNew(2023, 6, 1, 12, 30, 15)\nreturn datetimeYear(d)"), Value::Number(2023.0));
    assert_eq!(run("d = datetimeNew(2023, 6, 1, 12, 30, 15)\nreturn datetimeMonth(d)"), Value::Number(6.0));
    assert_eq!(run("d = datetimeNew(2023, 6, 1, 12, 30, 15)\nreturn datetimeHour(d)"), Value::Number(12.0));
    assert_eq!(run("d = datetimeNew(2023, 6, 1, 12, 30, 15)\nreturn datetimeSecond(d)"), Value::Number(15.0));
    assert_eq!(run("return datetimeNew(2023, 2, 30)"), Value::Null);
    assert_eq!(
        run("return datetimeISOParse('bogus')"),
        Value::Null
    );
    assert_eq!(
        run("d = datetimeISOParse('2023-06-01T01:02:03Z')\nreturn datetimeISOParse(datetimeISOFormat(d)) == d"),
        Value::Bool(true)
    );
    assert_eq!(run("return systemType(datetimeToday())"), Value::string("datetime"));
    // datetime arithmetic is in milliseconds
    assert_eq!(
        run("d = datetimeNew(2023, 6, 1)\nreturn (d + 1500) - d"),
        Value::Number(1500.0)
    );
}

#[test]
fn json_functions() {
    assert_eq!(run("return jsonStringify(objectNew('b', 1, 'a', 2))"), Value::string("{\"a\":2,\"b\":1}"));
    assert_eq!(run("return jsonStringify(arrayNew(1, 'x'), 2)"), Value::string("[\n  1,\n  \"x\"\n]"));
    assert_eq!(run("o = jsonParse('{\"k\": [1, 2]}')\nreturn arrayLength(objectGet(o, 'k'))"), Value::Number(2.0));
    assert_eq!(run("return jsonParse('not json')"), Value::Null);
}
