//! Assignment validation
//!
//! Runs once over a freshly lexed token tree. Assignment is only legal as
//! `name = ...` at the very start of the root sequence; every other use of
//! `=` is repaired away. The pass never fails hard: it reports what it
//! changed and returns whether the tree was already well formed.

use crate::errors::{Diagnostics, Stage};
use crate::lexer::token::{Operator, Token};

/// Validate and repair assignment use in `tokens`.
///
/// `is_root` is true only for the top-level sequence. Returns false when an
/// illegal assignment or separator had to be removed anywhere in the tree.
pub fn validate_assignment(
    tokens: &mut Vec<Token>,
    source: &str,
    is_root: bool,
    diagnostics: &mut Diagnostics,
) -> bool {
    let mut valid = true;

    'restart: loop {
        let assigns = is_root
            && matches!(
                tokens.as_slice(),
                [Token::Variable(name), Token::Operator(Operator::Set), ..] if !name.is_empty()
            );

        for index in 0..tokens.len() {
            match &mut tokens[index] {
                Token::Operator(Operator::Set) if assigns && index == 1 => {}
                Token::Operator(Operator::Set) if assigns => {
                    diagnostics.warn(
                        Stage::Validator,
                        format!("chained assignment in '{}', extra '=' ignored", source),
                    );
                    tokens.remove(index);
                    continue 'restart;
                }
                Token::Operator(Operator::Set) => {
                    diagnostics.error(
                        Stage::Validator,
                        format!(
                            "assignment is only allowed as 'name = ...' at the start of '{}', removing '='",
                            source
                        ),
                    );
                    let drop_left = index > 0 && !matches!(tokens[index - 1], Token::Variable(_));
                    if drop_left {
                        tokens.drain(index - 1..=index);
                    } else {
                        tokens.remove(index);
                    }
                    valid = false;
                    continue 'restart;
                }
                Token::Group(inner) => {
                    valid &= validate_assignment(inner, source, false, diagnostics);
                }
                Token::Conditional {
                    when_true,
                    when_false,
                } => {
                    valid &= validate_assignment(when_true, source, false, diagnostics);
                    valid &= validate_assignment(when_false, source, false, diagnostics);
                }
                Token::Function { args, .. } => {
                    valid &= validate_arguments(args, source, diagnostics);
                }
                _ => {}
            }
        }

        return valid;
    }
}

/// Function arguments: no assignment at all, no empty argument slots
fn validate_arguments(args: &mut Vec<Token>, source: &str, diagnostics: &mut Diagnostics) -> bool {
    let mut valid = true;

    'restart: loop {
        for index in 0..args.len() {
            let after_operator = index == 0 || matches!(args[index - 1], Token::Operator(_));

            match &mut args[index] {
                Token::Operator(Operator::Set) => {
                    diagnostics.error(
                        Stage::Validator,
                        format!("assignment inside function arguments in '{}' removed", source),
                    );
                    args.remove(index);
                    valid = false;
                    continue 'restart;
                }
                Token::Operator(Operator::Comma) if after_operator => {
                    diagnostics.error(
                        Stage::Validator,
                        format!("misplaced argument separator in '{}' removed", source),
                    );
                    args.remove(index);
                    valid = false;
                    continue 'restart;
                }
                Token::Group(inner) => {
                    valid &= validate_assignment(inner, source, false, diagnostics);
                }
                Token::Conditional {
                    when_true,
                    when_false,
                } => {
                    valid &= validate_assignment(when_true, source, false, diagnostics);
                    valid &= validate_assignment(when_false, source, false, diagnostics);
                }
                Token::Function { args: inner, .. } => {
                    valid &= validate_arguments(inner, source, diagnostics);
                }
                _ => {}
            }
        }

        return valid;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Severity;
    use crate::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn validate(source: &str) -> (Vec<Token>, bool, Diagnostics) {
        let mut tokens = tokenize(source);
        let mut diagnostics = Diagnostics::new();
        let valid = validate_assignment(&mut tokens, source, true, &mut diagnostics);
        (tokens, valid, diagnostics)
    }

    fn set() -> Token {
        Token::Operator(Operator::Set)
    }

    #[test]
    fn test_root_assignment_is_legal() {
        let (tokens, valid, diagnostics) = validate("x = 5");
        assert!(valid);
        assert!(diagnostics.is_empty());
        assert_eq!(tokens, vec![Token::variable("x"), set(), Token::Number(5.0)]);
    }

    #[test]
    fn test_chained_assignment_collapses() {
        let (tokens, valid, diagnostics) = validate("x = y = 5");
        assert!(valid);
        assert!(diagnostics.mentions(Severity::Warning, "chained assignment"));
        assert_eq!(
            tokens,
            vec![
                Token::variable("x"),
                set(),
                Token::variable("y"),
                Token::Number(5.0)
            ]
        );
    }

    #[test]
    fn test_assignment_to_literal() {
        let (tokens, valid, diagnostics) = validate("5 = 3");
        assert!(!valid);
        assert!(diagnostics.has_errors());
        assert_eq!(tokens, vec![Token::Number(3.0)]);

        let (tokens, valid, _) = validate("'' = 4");
        assert!(!valid);
        assert_eq!(tokens, vec![Token::Number(4.0)]);
    }

    #[test]
    fn test_assignment_after_expression() {
        let (tokens, valid, _) = validate("a + b = 3");
        assert!(!valid);
        assert_eq!(
            tokens,
            vec![
                Token::variable("a"),
                Token::Operator(Operator::Add),
                Token::variable("b"),
                Token::Number(3.0)
            ]
        );
    }

    #[test]
    fn test_nested_assignment() {
        let (tokens, valid, _) = validate("1 + (x = 2)");
        assert!(!valid);
        assert_eq!(
            tokens[2],
            Token::Group(vec![Token::variable("x"), Token::Number(2.0)])
        );

        let (_, valid, _) = validate("c ? (a = 1) : 2");
        assert!(!valid);
    }

    #[test]
    fn test_assignment_in_arguments() {
        let (tokens, valid, diagnostics) = validate("f(x = 1)");
        assert!(!valid);
        assert!(diagnostics.mentions(Severity::Error, "function arguments"));
        assert_eq!(
            tokens,
            vec![Token::Function {
                name: "f".into(),
                args: vec![Token::variable("x"), Token::Number(1.0)],
            }]
        );
    }

    #[test]
    fn test_leading_separator() {
        let (tokens, valid, _) = validate("f(,1)");
        assert!(!valid);
        assert_eq!(
            tokens,
            vec![Token::Function {
                name: "f".into(),
                args: vec![Token::Number(1.0)],
            }]
        );
    }

    #[test]
    fn test_second_pass_changes_nothing() {
        let sources = [
            "x = 5",
            "a = b = 1",
            "x + y = 3",
            "5 = 3",
            "1 + (x = 2)",
            "f(a = 1, , 2)",
            "1 ? b = 2 : 3",
            "f(g(y = 1), (z = 2))",
        ];
        for source in sources {
            let (repaired, _, _) = validate(source);

            let mut again = repaired.clone();
            let mut diagnostics = Diagnostics::new();
            let valid = validate_assignment(&mut again, source, true, &mut diagnostics);

            assert!(valid, "second pass reported invalid for {:?}", source);
            assert_eq!(again, repaired, "second pass changed {:?}", source);
            assert!(diagnostics.is_empty(), "second pass reported for {:?}", source);
        }
    }

    #[test]
    fn test_well_formed_calls() {
        let (_, valid, diagnostics) = validate("x = f(1, g(2, 3)) + (4 * 2)");
        assert!(valid);
        assert!(diagnostics.is_empty());
    }
}
