// Rust 1.93+ triggers false positives on thiserror/miette derive macro fields
#![allow(unused_assignments)]

//! exprkit: an embeddable expression language
//!
//! Expressions are small, dynamically typed formulas over numbers and
//! strings: arithmetic, string concatenation and comparison, logic,
//! `cond ? a : b` conditionals, calls into host-registered functions and
//! a single top-level `name = ...` assignment. Evaluation never fails
//! outright; problems become diagnostics and a null result.
//!
//! # Example
//!
//! ```rust
//! use exprkit::{FunctionMap, Value, VariableMap};
//!
//! let functions = FunctionMap::with_builtins();
//! let mut vars = VariableMap::new();
//! vars.insert("name", Value::from("world"));
//!
//! let greeting = exprkit::evaluate("'hello ' . upper(name)", &functions, &mut vars);
//! assert_eq!(greeting, Value::from("hello WORLD"));
//! ```

pub mod config;
pub mod errors;
pub mod evaluator;
pub mod expression;
pub mod formatter;
pub mod lexer;
pub mod property;
pub mod validator;

pub use config::{Config, MAX_EVAL_DEPTH};
pub use errors::{Diagnostic, Diagnostics, ExprError, ExprResult, Severity, Stage};
pub use evaluator::{Evaluator, Function, FunctionMap, LowercaseMap, Value, VariableMap};
pub use expression::{Evaluation, Expression};
pub use formatter::describe;
pub use lexer::token::{Operator, Token};
pub use lexer::{tokenize, Lexer};
pub use property::PropertyMap;
pub use validator::validate_assignment;

/// Parse and validate an expression
pub fn parse(source: &str) -> Expression {
    Expression::new(source)
}

/// Parse and evaluate an expression in one go
pub fn evaluate(source: &str, functions: &FunctionMap, variables: &mut VariableMap) -> Value {
    Expression::new(source).evaluate(functions, variables)
}
