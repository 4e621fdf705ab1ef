//! Operator semantics on reduced operands
//!
//! Results are always tokens: comparisons and logic produce 1/0, numeric
//! faults degrade to 0 with a diagnostic instead of failing.

use crate::errors::{Diagnostics, Stage};
use crate::lexer::token::{Operator, Token};

fn flag(b: bool) -> Token {
    Token::Number(if b { 1.0 } else { 0.0 })
}

pub fn not(n: f64) -> Token {
    flag(n == 0.0)
}

pub fn double_not(n: f64) -> Token {
    flag(n != 0.0)
}

/// Apply NOT or double-NOT to a scalar token
pub fn logical_not(op: Operator, operand: &Token) -> Token {
    let n = operand.to_number();
    match op {
        Operator::DoubleNot => double_not(n),
        _ => not(n),
    }
}

pub fn negate(operand: &Token) -> Token {
    Token::Number(-operand.to_number())
}

/// Apply a binary operator to two reduced operands
pub fn apply_binary(op: Operator, lhs: &Token, rhs: &Token, diagnostics: &mut Diagnostics) -> Token {
    match op {
        Operator::Add => {
            if rhs.is_text() && (lhs.is_text() || lhs.is_number()) {
                Token::Text(lhs.to_text() + &rhs.to_text())
            } else {
                Token::Number(lhs.to_number() + rhs.to_number())
            }
        }
        Operator::Sub => Token::Number(lhs.to_number() - rhs.to_number()),
        Operator::Mul => Token::Number(lhs.to_number() * rhs.to_number()),
        Operator::Div => divide(lhs.to_number(), rhs.to_number(), diagnostics),
        Operator::Mod => modulo(lhs.to_number(), rhs.to_number(), diagnostics),
        Operator::Pow => Token::Number(lhs.to_number().powf(rhs.to_number())),
        Operator::Cat => Token::Text(lhs.to_text() + &rhs.to_text()),
        Operator::Or => flag(lhs.to_number() != 0.0 || rhs.to_number() != 0.0),
        // only the right operand decides the result
        Operator::And => flag(rhs.to_number() != 0.0),
        Operator::Eq | Operator::Ne | Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge => {
            match op.string_counterpart() {
                Some(string_op) if lhs.is_text() || rhs.is_text() => {
                    compare_text(string_op, &lhs.to_text(), &rhs.to_text())
                }
                _ => compare_numbers(op, lhs.to_number(), rhs.to_number()),
            }
        }
        Operator::StrEq
        | Operator::StrNe
        | Operator::StrLt
        | Operator::StrLe
        | Operator::StrGt
        | Operator::StrGe => compare_text(op, &lhs.to_text(), &rhs.to_text()),
        Operator::Not | Operator::DoubleNot | Operator::Set | Operator::Comma => {
            diagnostics.error(
                Stage::Evaluator,
                format!("operator {} cannot combine two values", op),
            );
            Token::Undefined
        }
    }
}

fn compare_numbers(op: Operator, a: f64, b: f64) -> Token {
    flag(match op {
        Operator::Eq => a == b,
        Operator::Ne => a != b,
        Operator::Lt => a < b,
        Operator::Le => a <= b,
        Operator::Gt => a > b,
        _ => a >= b,
    })
}

fn compare_text(op: Operator, a: &str, b: &str) -> Token {
    let ordering = a.cmp(b);
    flag(match op {
        Operator::StrEq => ordering.is_eq(),
        Operator::StrNe => ordering.is_ne(),
        Operator::StrLt => ordering.is_lt(),
        Operator::StrLe => ordering.is_le(),
        Operator::StrGt => ordering.is_gt(),
        _ => ordering.is_ge(),
    })
}

/// Division that never fails
pub fn divide(a: f64, b: f64, diagnostics: &mut Diagnostics) -> Token {
    if b == 0.0 {
        diagnostics.warn(
            Stage::Evaluator,
            format!("division by zero ({} / 0), result is 0", a),
        );
        return Token::Number(0.0);
    }
    if a == 0.0 {
        return Token::Number(0.0);
    }

    let quotient = a / b;
    Token::Number(check_float(quotient, "division", diagnostics).unwrap_or_else(|| {
        if quotient != 0.0 && quotient * b != a {
            diagnostics.info(Stage::Evaluator, format!("division {} / {} is inexact", a, b));
        }
        quotient
    }))
}

/// Remainder that never fails
pub fn modulo(a: f64, b: f64, diagnostics: &mut Diagnostics) -> Token {
    if b == 0.0 {
        diagnostics.warn(
            Stage::Evaluator,
            format!("modulo by zero ({} % 0), result is 0", a),
        );
        return Token::Number(0.0);
    }
    let remainder = a % b;
    Token::Number(check_float(remainder, "modulo", diagnostics).unwrap_or(remainder))
}

/// Replacement value when `result` is a floating-point fault
fn check_float(result: f64, what: &str, diagnostics: &mut Diagnostics) -> Option<f64> {
    if result.is_nan() {
        diagnostics.warn(
            Stage::Evaluator,
            format!("{} domain error, result is 0", what),
        );
        Some(0.0)
    } else if result.is_infinite() {
        diagnostics.warn(
            Stage::Evaluator,
            format!("{} overflow, result is 0", what),
        );
        Some(0.0)
    } else if result != 0.0 && result.abs() < f64::MIN_POSITIVE {
        diagnostics.warn(
            Stage::Evaluator,
            format!("{} underflow, result is 0", what),
        );
        Some(0.0)
    } else {
        None
    }
}
