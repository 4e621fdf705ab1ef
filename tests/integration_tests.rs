//! Integration tests for exprkit
//!
//! These tests drive the public API end to end: parse, validate,
//! evaluate and describe.

use exprkit::{
    describe, tokenize, Expression, FunctionMap, PropertyMap, Severity, Value, VariableMap,
};
use pretty_assertions::assert_eq;

/// Evaluate with the built-in library and no variables
fn eval(source: &str) -> Value {
    exprkit::evaluate(source, &FunctionMap::with_builtins(), &mut VariableMap::new())
}

fn eval_with(source: &str, vars: &mut VariableMap) -> Value {
    exprkit::evaluate(source, &FunctionMap::with_builtins(), vars)
}

#[test]
fn test_arithmetic_left_to_right() {
    assert_eq!(eval("1 + 2 * 3"), Value::Number(9.0));
    assert_eq!(eval("1 + (2 * 3)"), Value::Number(7.0));
    assert_eq!(eval("-(2 + 3)"), Value::Number(-5.0));
    assert_eq!(eval("10 / 4"), Value::Number(2.5));
}

#[test]
fn test_strings() {
    assert_eq!(eval("'abc' . 5"), Value::from("abc5"));
    assert_eq!(eval("'ünï' . \"cödé\""), Value::from("ünïcödé"));
    assert_eq!(eval("'10' == 10.0"), Value::Number(1.0));
    assert_eq!(eval("'it\\'s' . ''"), Value::from("it's"));
}

#[test]
fn test_logic_and_conditionals() {
    assert_eq!(eval("!(1 == 2)"), Value::Number(1.0));
    assert_eq!(eval("unset ? 'yes' : 'no'"), Value::from("no"));
    assert_eq!(eval("3 > 2 ? 'big' : 'small'"), Value::from("big"));
    assert_eq!(eval("0 | 2"), Value::Number(1.0));
}

#[test]
fn test_builtins_end_to_end() {
    assert_eq!(eval("upper('a') . strlen('héllo')"), Value::from("A5"));
    assert_eq!(eval("strlen(upper(substr('hello', 1, 3)))"), Value::Number(3.0));
    assert_eq!(eval("date::year(0)"), Value::Number(1970.0));
    assert_eq!(eval("MAX(1, 2)"), Value::Number(2.0));
    assert_eq!(eval("base64_decode(base64_encode('round'))"), Value::from("round"));
}

#[test]
fn test_function_errors() {
    let functions = FunctionMap::with_builtins();
    let expr = Expression::new("sqrt(-1) + 1");
    let evaluation = expr.evaluate_with_diagnostics(&functions, &mut VariableMap::new());
    assert_eq!(evaluation.value, Value::Null);
    assert!(evaluation
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Error && d.message.contains("sqrt")));

    // inside an argument the failure only nulls that argument
    assert_eq!(eval("max(sqrt(-1), 3)"), Value::Number(3.0));
}

#[test]
fn test_host_functions() {
    let mut functions = FunctionMap::with_builtins();
    functions.register("greet", |args: &[Value]| {
        let name = args.first().map(Value::to_text).unwrap_or_default();
        Value::from(format!("hi {}", name))
    });

    let mut vars = VariableMap::new();
    vars.insert("User", Value::from("ada"));
    let value = exprkit::evaluate("Greet(user)", &functions, &mut vars);
    assert_eq!(value, Value::from("hi ada"));
}

#[test]
fn test_assignment() {
    let mut vars = VariableMap::new();
    assert_eq!(eval_with("x = 10 / 4", &mut vars), Value::Number(2.5));
    assert_eq!(vars.get("X"), Some(&Value::Number(2.5)));

    // chained assignment only assigns the first name
    assert_eq!(eval_with("a = b = 3", &mut vars), Value::Number(3.0));
    assert_eq!(vars.get("a"), Some(&Value::Number(3.0)));
    assert_eq!(vars.get("b"), None);
}

#[test]
fn test_illegal_assignment_is_repaired() {
    let expr = Expression::new("(1 = 2) + 1");
    assert!(!expr.is_valid());
    assert_eq!(expr.pretty(), "( 2 ) + 1");
    let value = expr.evaluate(&FunctionMap::new(), &mut VariableMap::new());
    assert_eq!(value, Value::Number(3.0));
}

#[test]
fn test_evaluation_does_not_mutate_tree() {
    let expr = Expression::new("n = n + f(1, (2))");
    let before = expr.tokens().to_vec();

    let mut functions = FunctionMap::new();
    functions.register("f", |args: &[Value]| {
        Value::Number(args.iter().map(Value::to_number).sum())
    });
    let mut vars = VariableMap::new();
    vars.insert("n", Value::Number(0.0));

    for expected in [3.0, 6.0, 9.0] {
        assert_eq!(expr.evaluate(&functions, &mut vars), Value::Number(expected));
    }
    assert_eq!(expr.tokens(), before.as_slice());
}

#[test]
fn test_division_by_zero_is_reported() {
    let expr = Expression::new("5 / (2 - 2)");
    let evaluation = expr.evaluate_with_diagnostics(&FunctionMap::new(), &mut VariableMap::new());
    assert_eq!(evaluation.value, Value::Number(0.0));
    assert!(evaluation
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Warning && d.message.contains("division by zero")));
}

#[test]
fn test_describe_round_trip() {
    let sources = [
        "X = Upper( name ) . ' ' . 'it\\'s'",
        "a ? (b + 1) : c",
        "f(1, g(2), (3 * 4)) ^ -2",
        "!! flag | !other",
        "'tab\there' ne \"q\"",
    ];
    for source in sources {
        let once = describe(&tokenize(source));
        let twice = describe(&tokenize(&once));
        assert_eq!(once, twice, "unstable canonical form for {:?}", source);

        let reparsed = Expression::new(once.clone());
        assert_eq!(reparsed.pretty(), once);
    }
}

#[test]
fn test_parse_free_function() {
    let expr = exprkit::parse("Total = Price * QTY");
    assert!(expr.is_valid());
    assert_eq!(expr.to_string(), "total = price * qty");
}

#[test]
fn test_property_map() {
    let props = PropertyMap::from_yaml(
        "greeting: \"'hello ' . name\"\nlength: strlen(name)\nempty: \"''\"\n",
    )
    .unwrap();
    let functions = FunctionMap::with_builtins();
    let mut vars = VariableMap::new();
    vars.insert("name", Value::from("world"));

    assert_eq!(
        props.get("Greeting", Value::Null, &functions, &mut vars),
        Value::from("hello world")
    );
    assert_eq!(
        props.get("length", Value::Null, &functions, &mut vars),
        Value::Number(5.0)
    );
    assert_eq!(
        props.get("empty", "fallback", &functions, &mut vars),
        Value::from("fallback")
    );
    assert_eq!(props.pretty("length"), Some("strlen(name)".to_string()));
}
