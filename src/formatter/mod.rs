//! Canonical text rendering of token trees
//!
//! Renders tokens back into source form:
//! - tokens separated by single spaces, `,` attached to what precedes it
//! - variable and function names lower-cased
//! - groups as `( ... )`, conditionals as `? a : b` with multi-token
//!   branches parenthesized
//! - strings single-quoted and escaped, numbers in their shortest form
//! - undefined tokens as `@`, which the lexer reads back as undefined
//!
//! The output re-lexes to an equivalent tree, and describing that tree
//! again yields the same text.

use crate::evaluator::value::format_number;
use crate::lexer::token::{Operator, Token};

/// Spelling of an undefined token
pub const UNDEFINED_MARKER: char = '@';

/// Render a token sequence as canonical source text
pub fn describe(tokens: &[Token]) -> String {
    let mut out = String::new();

    for token in tokens {
        if !out.is_empty() {
            out.push(' ');
        }
        match token {
            Token::Operator(Operator::Comma) => {
                if out.ends_with(' ') {
                    out.pop();
                }
                out.push(',');
            }
            Token::Operator(op) => out.push_str(op.symbol()),
            Token::Variable(name) => out.push_str(&name.to_lowercase()),
            Token::Function { name, args } => {
                out.push_str(&name.to_lowercase());
                out.push('(');
                out.push_str(&describe(args));
                out.push(')');
            }
            Token::Group(inner) => {
                out.push_str("( ");
                out.push_str(&describe(inner));
                out.push_str(" )");
            }
            Token::Conditional {
                when_true,
                when_false,
            } => {
                out.push('?');
                out.push_str(&describe_branch(when_true));
                out.push_str(" :");
                out.push_str(&describe_branch(when_false));
            }
            Token::Text(s) => out.push_str(&quote(s)),
            Token::Number(n) => out.push_str(&format_number(*n)),
            // a stray character the lexer turns back into Undefined
            Token::Undefined => out.push(UNDEFINED_MARKER),
        }
    }

    out
}

fn describe_branch(branch: &[Token]) -> String {
    if branch.len() == 1 {
        format!(" {}", describe(branch))
    } else {
        format!(" ( {} )", describe(branch))
    }
}

/// Single-quote a string literal, escaping what the lexer would misread
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_ascii_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
