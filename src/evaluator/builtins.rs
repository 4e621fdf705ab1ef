//! Built-in function library
//!
//! Registered into a [`FunctionMap`] by [`register_all`]. Every built-in
//! checks its arity and coerces its arguments with the usual value rules.
//! Time functions take an optional epoch-seconds argument (default: now)
//! and work in UTC.

use base64::Engine;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, Timelike, Utc};
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::errors::{ExprError, ExprResult};

use super::scope::FunctionMap;
use super::value::{format_number, Value};

type Builtin = fn(&[Value]) -> ExprResult<Value>;

const BUILTINS: &[(&str, Builtin)] = &[
    ("time", builtin_time),
    ("time::hour", builtin_time_hour),
    ("time::min", builtin_time_min),
    ("time::sec", builtin_time_sec),
    ("date::day", builtin_date_day),
    ("date::month", builtin_date_month),
    ("date::year", builtin_date_year),
    ("date::weekday", builtin_date_weekday),
    ("date::day_name", builtin_date_day_name),
    ("strftime", builtin_strftime),
    ("sqrt", builtin_sqrt),
    ("abs", builtin_abs),
    ("floor", builtin_floor),
    ("ceil", builtin_ceil),
    ("round", builtin_round),
    ("min", builtin_min),
    ("max", builtin_max),
    ("to_string", builtin_to_string),
    ("to_int", builtin_to_int),
    ("to_number", builtin_to_number),
    ("strlen", builtin_strlen),
    ("substr", builtin_substr),
    ("upper", builtin_upper),
    ("lower", builtin_lower),
    ("trim", builtin_trim),
    ("replace", builtin_replace),
    ("contains", builtin_contains),
    ("matches", builtin_matches),
    ("base64_encode", builtin_base64_encode),
    ("base64_decode", builtin_base64_decode),
];

/// Register every built-in function
pub fn register_all(functions: &mut FunctionMap) {
    for &(name, function) in BUILTINS {
        functions.register_fallible(name, function);
    }
}

/// Names of all built-in functions, in registration order
pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|(name, _)| *name)
}

// Time and date

/// The optional epoch argument at `index` as a UTC time, or now
fn time_arg(name: &str, args: &[Value], index: usize) -> ExprResult<DateTime<Utc>> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(Utc::now()),
        Some(v) => {
            let epoch = v.to_number();
            DateTime::from_timestamp(epoch as i64, 0).ok_or_else(|| {
                ExprError::argument_type(name, "an epoch time in range", format_number(epoch))
            })
        }
    }
}

fn time_part(name: &str, args: &[Value], part: fn(&DateTime<Utc>) -> i64) -> ExprResult<Value> {
    check_arity_range(name, args, 0, 1)?;
    let time = time_arg(name, args, 0)?;
    Ok(Value::Number(part(&time) as f64))
}

/// time() -> epoch seconds
fn builtin_time(args: &[Value]) -> ExprResult<Value> {
    check_arity("time", args, 0)?;
    Ok(Value::Number(Utc::now().timestamp() as f64))
}

fn builtin_time_hour(args: &[Value]) -> ExprResult<Value> {
    time_part("time::hour", args, |t| i64::from(t.hour()))
}

fn builtin_time_min(args: &[Value]) -> ExprResult<Value> {
    time_part("time::min", args, |t| i64::from(t.minute()))
}

fn builtin_time_sec(args: &[Value]) -> ExprResult<Value> {
    time_part("time::sec", args, |t| i64::from(t.second()))
}

fn builtin_date_day(args: &[Value]) -> ExprResult<Value> {
    time_part("date::day", args, |t| i64::from(t.day()))
}

fn builtin_date_month(args: &[Value]) -> ExprResult<Value> {
    time_part("date::month", args, |t| i64::from(t.month()))
}

fn builtin_date_year(args: &[Value]) -> ExprResult<Value> {
    time_part("date::year", args, |t| i64::from(t.year()))
}

/// date::weekday([epoch]) -> 0 (Sunday) .. 6
fn builtin_date_weekday(args: &[Value]) -> ExprResult<Value> {
    time_part("date::weekday", args, |t| {
        i64::from(t.weekday().num_days_from_sunday())
    })
}

/// date::day_name([epoch]) -> "Sun".."Sat"
fn builtin_date_day_name(args: &[Value]) -> ExprResult<Value> {
    check_arity_range("date::day_name", args, 0, 1)?;
    let time = time_arg("date::day_name", args, 0)?;
    Ok(Value::String(time.format("%a").to_string()))
}

/// strftime(format, [epoch]) -> string
fn builtin_strftime(args: &[Value]) -> ExprResult<Value> {
    check_arity_range("strftime", args, 1, 2)?;
    let format = args[0].to_text();
    let time = time_arg("strftime", args, 1)?;

    let items: Vec<Item<'_>> = StrftimeItems::new(&format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(ExprError::function_failed(
            "strftime",
            format!("invalid format string '{}'", format),
        ));
    }
    Ok(Value::String(
        time.format_with_items(items.into_iter()).to_string(),
    ))
}

// Math

fn unary_math(name: &str, args: &[Value], op: fn(f64) -> f64) -> ExprResult<Value> {
    check_arity(name, args, 1)?;
    Ok(Value::Number(op(args[0].to_number())))
}

/// sqrt(n) -> number; n must not be negative
fn builtin_sqrt(args: &[Value]) -> ExprResult<Value> {
    check_arity("sqrt", args, 1)?;
    let n = args[0].to_number();
    if n < 0.0 {
        return Err(ExprError::argument_type(
            "sqrt",
            "a non-negative number",
            format_number(n),
        ));
    }
    Ok(Value::Number(n.sqrt()))
}

fn builtin_abs(args: &[Value]) -> ExprResult<Value> {
    unary_math("abs", args, f64::abs)
}

fn builtin_floor(args: &[Value]) -> ExprResult<Value> {
    unary_math("floor", args, f64::floor)
}

fn builtin_ceil(args: &[Value]) -> ExprResult<Value> {
    unary_math("ceil", args, f64::ceil)
}

fn builtin_round(args: &[Value]) -> ExprResult<Value> {
    unary_math("round", args, f64::round)
}

/// min(n, ...) -> number
fn builtin_min(args: &[Value]) -> ExprResult<Value> {
    check_min_arity("min", args, 1)?;
    let n = args.iter().map(Value::to_number).fold(f64::INFINITY, f64::min);
    Ok(Value::Number(n))
}

/// max(n, ...) -> number
fn builtin_max(args: &[Value]) -> ExprResult<Value> {
    check_min_arity("max", args, 1)?;
    let n = args
        .iter()
        .map(Value::to_number)
        .fold(f64::NEG_INFINITY, f64::max);
    Ok(Value::Number(n))
}

// Conversion

fn builtin_to_string(args: &[Value]) -> ExprResult<Value> {
    check_arity("to_string", args, 1)?;
    Ok(Value::String(args[0].to_text()))
}

/// to_int(v) -> number truncated toward zero
fn builtin_to_int(args: &[Value]) -> ExprResult<Value> {
    check_arity("to_int", args, 1)?;
    Ok(Value::Number(args[0].to_number().trunc()))
}

fn builtin_to_number(args: &[Value]) -> ExprResult<Value> {
    check_arity("to_number", args, 1)?;
    Ok(Value::Number(args[0].to_number()))
}

// Strings

/// strlen(s) -> number of grapheme clusters
fn builtin_strlen(args: &[Value]) -> ExprResult<Value> {
    check_arity("strlen", args, 1)?;
    let count = args[0].to_text().graphemes(true).count();
    Ok(Value::Number(count as f64))
}

/// substr(s, start, [len]); a negative start counts from the end
fn builtin_substr(args: &[Value]) -> ExprResult<Value> {
    check_arity_range("substr", args, 2, 3)?;
    let text = args[0].to_text();
    let graphemes: Vec<&str> = text.graphemes(true).collect();
    let total = graphemes.len() as i64;

    let start = args[1].to_number() as i64;
    let start = if start < 0 { (total + start).max(0) } else { start.min(total) };

    let len = match args.get(2) {
        None => total - start,
        Some(v) => {
            let len = v.to_number();
            if len < 0.0 {
                return Err(ExprError::argument_type(
                    "substr",
                    "a non-negative length",
                    format_number(len),
                ));
            }
            (len as i64).min(total - start)
        }
    };

    let slice = &graphemes[start as usize..(start + len) as usize];
    Ok(Value::String(slice.concat()))
}

fn builtin_upper(args: &[Value]) -> ExprResult<Value> {
    check_arity("upper", args, 1)?;
    Ok(Value::String(args[0].to_text().to_uppercase()))
}

fn builtin_lower(args: &[Value]) -> ExprResult<Value> {
    check_arity("lower", args, 1)?;
    Ok(Value::String(args[0].to_text().to_lowercase()))
}

fn builtin_trim(args: &[Value]) -> ExprResult<Value> {
    check_arity("trim", args, 1)?;
    Ok(Value::String(args[0].to_text().trim().to_string()))
}

/// replace(s, from, to) -> string with every `from` replaced
fn builtin_replace(args: &[Value]) -> ExprResult<Value> {
    check_arity("replace", args, 3)?;
    let text = args[0].to_text();
    let from = args[1].to_text();
    if from.is_empty() {
        return Ok(Value::String(text));
    }
    Ok(Value::String(text.replace(&from, &args[2].to_text())))
}

/// contains(s, needle) -> 1/0
fn builtin_contains(args: &[Value]) -> ExprResult<Value> {
    check_arity("contains", args, 2)?;
    Ok(Value::from(args[0].to_text().contains(&args[1].to_text())))
}

/// matches(s, pattern) -> 1/0
fn builtin_matches(args: &[Value]) -> ExprResult<Value> {
    check_arity("matches", args, 2)?;
    let pattern = args[1].to_text();
    let regex = Regex::new(&pattern).map_err(|e| ExprError::function_failed("matches", e))?;
    Ok(Value::from(regex.is_match(&args[0].to_text())))
}

fn builtin_base64_encode(args: &[Value]) -> ExprResult<Value> {
    check_arity("base64_encode", args, 1)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(args[0].to_text().as_bytes());
    Ok(Value::String(encoded))
}

fn builtin_base64_decode(args: &[Value]) -> ExprResult<Value> {
    check_arity("base64_decode", args, 1)?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(args[0].to_text().as_bytes())
        .map_err(|e| ExprError::function_failed("base64_decode", format!("invalid base64: {}", e)))?;
    let decoded = String::from_utf8(bytes).map_err(|_| {
        ExprError::function_failed("base64_decode", "decoded data is not valid UTF-8")
    })?;
    Ok(Value::String(decoded))
}

// Helper functions

fn check_arity(name: &str, args: &[Value], expected: usize) -> ExprResult<()> {
    if args.len() != expected {
        Err(ExprError::wrong_argument_count(
            name,
            expected.to_string(),
            args.len(),
        ))
    } else {
        Ok(())
    }
}

fn check_arity_range(name: &str, args: &[Value], min: usize, max: usize) -> ExprResult<()> {
    if args.len() < min || args.len() > max {
        Err(ExprError::wrong_argument_count(
            name,
            format!("{} to {}", min, max),
            args.len(),
        ))
    } else {
        Ok(())
    }
}

fn check_min_arity(name: &str, args: &[Value], min: usize) -> ExprResult<()> {
    if args.len() < min {
        Err(ExprError::wrong_argument_count(
            name,
            format!("at least {}", min),
            args.len(),
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2000-02-29 00:00:00 UTC, a Tuesday
    const LEAP_DAY: f64 = 951_782_400.0;
    // 2023-11-14 22:13:20 UTC
    const SAMPLE: f64 = 1_700_000_000.0;

    fn call(name: &str, args: &[Value]) -> ExprResult<Value> {
        let functions = FunctionMap::with_builtins();
        let function = functions.get(name).unwrap();
        function(args)
    }

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn test_all_registered() {
        let functions = FunctionMap::with_builtins();
        for name in names() {
            assert!(functions.contains(name), "{} missing", name);
        }
        assert!(functions.contains("DATE::YEAR"));
    }

    #[test]
    fn test_time_arg() {
        let epoch = time_arg("t", &[num(0.0)], 0).unwrap();
        assert_eq!((epoch.year(), epoch.month(), epoch.day()), (1970, 1, 1));
        assert_eq!(epoch.weekday().num_days_from_sunday(), 4);
        assert_eq!(epoch.ordinal(), 1);

        let leap = time_arg("t", &[num(LEAP_DAY)], 0).unwrap();
        assert_eq!((leap.year(), leap.month(), leap.day()), (2000, 2, 29));
        assert_eq!(leap.ordinal(), 60);

        let before = time_arg("t", &[num(-1.0)], 0).unwrap();
        assert_eq!((before.year(), before.month(), before.day()), (1969, 12, 31));
        assert_eq!((before.hour(), before.minute(), before.second()), (23, 59, 59));

        assert!(matches!(
            time_arg("t", &[num(1e300)], 0),
            Err(ExprError::ArgumentType { .. })
        ));
    }

    #[test]
    fn test_time_parts() {
        assert_eq!(call("time::hour", &[num(SAMPLE)]).unwrap(), num(22.0));
        assert_eq!(call("time::min", &[num(SAMPLE)]).unwrap(), num(13.0));
        assert_eq!(call("time::sec", &[num(SAMPLE)]).unwrap(), num(20.0));
        assert_eq!(call("date::day", &[num(SAMPLE)]).unwrap(), num(14.0));
        assert_eq!(call("date::month", &[num(SAMPLE)]).unwrap(), num(11.0));
        assert_eq!(call("date::year", &[num(SAMPLE)]).unwrap(), num(2023.0));
        assert_eq!(call("date::weekday", &[num(SAMPLE)]).unwrap(), num(2.0));
        assert_eq!(
            call("date::day_name", &[num(LEAP_DAY)]).unwrap(),
            Value::from("Tue")
        );
    }

    #[test]
    fn test_time_defaults_to_now() {
        let year = call("date::year", &[]).unwrap().to_number();
        assert!(year >= 2023.0);
        assert!(call("time", &[]).unwrap().to_number() > SAMPLE);
        assert!(call("time", &[num(1.0)]).is_err());
    }

    #[test]
    fn test_strftime() {
        assert_eq!(
            call("strftime", &[Value::from("%Y-%m-%d %H:%M:%S"), num(SAMPLE)]).unwrap(),
            Value::from("2023-11-14 22:13:20")
        );
        assert_eq!(
            call("strftime", &[Value::from("%a day %j, 100%%"), num(LEAP_DAY)]).unwrap(),
            Value::from("Tue day 060, 100%")
        );
        assert_eq!(
            call("strftime", &[Value::from("%B %e, %Y"), num(SAMPLE)]).unwrap(),
            Value::from("November 14, 2023")
        );
        assert!(matches!(
            call("strftime", &[Value::from("%Q"), num(SAMPLE)]),
            Err(ExprError::FunctionFailed { .. })
        ));
    }

    #[test]
    fn test_math() {
        assert_eq!(call("sqrt", &[num(16.0)]).unwrap(), num(4.0));
        assert!(matches!(
            call("sqrt", &[num(-1.0)]),
            Err(ExprError::ArgumentType { .. })
        ));
        assert_eq!(call("abs", &[num(-3.5)]).unwrap(), num(3.5));
        assert_eq!(call("floor", &[num(2.7)]).unwrap(), num(2.0));
        assert_eq!(call("ceil", &[num(2.1)]).unwrap(), num(3.0));
        assert_eq!(call("round", &[Value::from("2.5")]).unwrap(), num(3.0));
        assert_eq!(call("min", &[num(3.0), num(-1.0), num(2.0)]).unwrap(), num(-1.0));
        assert_eq!(call("max", &[num(3.0), Value::from("7")]).unwrap(), num(7.0));
        assert!(matches!(
            call("max", &[]),
            Err(ExprError::WrongArgumentCount { .. })
        ));
    }

    #[test]
    fn test_conversion() {
        assert_eq!(call("to_string", &[num(42.0)]).unwrap(), Value::from("42"));
        assert_eq!(call("to_string", &[Value::Null]).unwrap(), Value::from(""));
        assert_eq!(call("to_int", &[num(-3.9)]).unwrap(), num(-3.0));
        assert_eq!(call("to_number", &[Value::from("12abc")]).unwrap(), num(12.0));
    }

    #[test]
    fn test_strings() {
        assert_eq!(call("strlen", &[Value::from("héllo👍🏽")]).unwrap(), num(6.0));
        assert_eq!(
            call("substr", &[Value::from("hello"), num(1.0), num(3.0)]).unwrap(),
            Value::from("ell")
        );
        assert_eq!(
            call("substr", &[Value::from("hello"), num(-2.0)]).unwrap(),
            Value::from("lo")
        );
        assert_eq!(
            call("substr", &[Value::from("hi"), num(5.0), num(2.0)]).unwrap(),
            Value::from("")
        );
        assert_eq!(call("upper", &[Value::from("abc")]).unwrap(), Value::from("ABC"));
        assert_eq!(call("lower", &[Value::from("ABC")]).unwrap(), Value::from("abc"));
        assert_eq!(call("trim", &[Value::from("  x ")]).unwrap(), Value::from("x"));
        assert_eq!(
            call("replace", &[Value::from("a-b-c"), Value::from("-"), Value::from("+")]).unwrap(),
            Value::from("a+b+c")
        );
        assert_eq!(
            call("contains", &[Value::from("haystack"), Value::from("st")]).unwrap(),
            num(1.0)
        );
    }

    #[test]
    fn test_matches() {
        assert_eq!(
            call("matches", &[Value::from("abc123"), Value::from(r"^[a-z]+\d+$")]).unwrap(),
            num(1.0)
        );
        assert_eq!(
            call("matches", &[Value::from("abc"), Value::from(r"\d")]).unwrap(),
            num(0.0)
        );
        assert!(matches!(
            call("matches", &[Value::from("abc"), Value::from("(")]),
            Err(ExprError::FunctionFailed { .. })
        ));
    }

    #[test]
    fn test_base64() {
        assert_eq!(
            call("base64_encode", &[Value::from("hello")]).unwrap(),
            Value::from("aGVsbG8=")
        );
        assert_eq!(
            call("base64_decode", &[Value::from("aGVsbG8=")]).unwrap(),
            Value::from("hello")
        );
        assert!(call("base64_decode", &[Value::from("!!!")]).is_err());
    }
}
