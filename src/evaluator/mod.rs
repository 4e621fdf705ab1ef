//! Token-reduction evaluator
//!
//! The evaluator rewrites a token sequence step by step until a single
//! value remains. Each step, in order:
//! - resolves every variable
//! - invokes the first function call
//! - collapses the first parenthesized group
//! - pre-reduces the branches of the first conditional
//! - and only when none of the above applied, combines the leading
//!   operand with what follows it
//!
//! There is no operator precedence: operators apply strictly left to right,
//! parentheses are the only way to group.

pub mod builtins;
pub mod ops;
pub mod scope;
pub mod value;

use crate::config::Config;
use crate::errors::{suggestion_suffix, Diagnostics, ExprError, ExprResult, Stage};
use crate::formatter::describe;
use crate::lexer::token::{Operator, Token};

pub use scope::{Function, FunctionMap, LowercaseMap, VariableMap};
pub use value::Value;

/// Outcome of one reduction step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Progressed,
    Stalled,
}

/// Whether a sequence still has something left to reduce
fn needs_reduction(tokens: &[Token]) -> bool {
    match tokens {
        [] => false,
        [Token::Variable(_)
        | Token::Function { .. }
        | Token::Group(_)
        | Token::Operator(Operator::Sub)] => true,
        [_] => false,
        _ => true,
    }
}

/// Split raw call arguments on top-level commas; a trailing empty argument is dropped
fn split_arguments(args: Vec<Token>) -> Vec<Vec<Token>> {
    let mut groups = Vec::new();
    let mut current = Vec::new();
    for token in args {
        if token.is_operator(Operator::Comma) {
            groups.push(std::mem::take(&mut current));
        } else {
            current.push(token);
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

/// Evaluator over borrowed function and variable tables
pub struct Evaluator<'a> {
    functions: &'a FunctionMap,
    /// Written only by a top-level `name = ...` assignment
    variables: &'a mut VariableMap,
    config: Config,
    diagnostics: Diagnostics,
    /// Current recursion depth
    depth: usize,
}

impl<'a> Evaluator<'a> {
    /// Create a new evaluator
    pub fn new(functions: &'a FunctionMap, variables: &'a mut VariableMap) -> Self {
        Self::with_config(functions, variables, Config::default())
    }

    pub fn with_config(
        functions: &'a FunctionMap,
        variables: &'a mut VariableMap,
        config: Config,
    ) -> Self {
        Self {
            functions,
            variables,
            config,
            diagnostics: Diagnostics::new(),
            depth: 0,
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    /// Reduce a token sequence to its result.
    ///
    /// Never fails: errors abort the evaluation with an `Undefined` result
    /// and are reported as diagnostics. A sequence starting with
    /// `name =` stores the result (or null) in the variable table.
    pub fn evaluate(&mut self, mut tokens: Vec<Token>) -> Token {
        tracing::trace!(tokens = tokens.len(), "evaluating");

        let target = match tokens.as_slice() {
            [Token::Variable(name), Token::Operator(Operator::Set), ..] if !name.is_empty() => {
                Some(name.clone())
            }
            _ => None,
        };
        if target.is_some() {
            tokens.drain(..2);
        }

        let result = match self.drive(&mut tokens) {
            Err(err) => {
                self.diagnostics
                    .error(Stage::Evaluator, format!("evaluation aborted: {}", err));
                None
            }
            Ok(()) => match tokens.as_slice() {
                [token] if token.is_scalar() => Some(token.clone()),
                [Token::Undefined] => None,
                [] if target.is_none() => None,
                remaining => {
                    self.diagnostics.warn(
                        Stage::Evaluator,
                        format!("ambiguous result <{}>", describe(remaining)),
                    );
                    None
                }
            },
        };

        if let Some(name) = target {
            let value = result.as_ref().map_or(Value::Null, Token::to_value);
            if value.is_null() {
                self.diagnostics.warn(
                    Stage::Evaluator,
                    format!("no result to assign, variable '{}' set to null", name),
                );
            }
            tracing::debug!(variable = %name, value = %value, "assigned");
            self.variables.insert(name, value);
        }

        result.unwrap_or_default()
    }

    /// Top-level loop; errors propagate and abort the evaluation
    fn drive(&mut self, tokens: &mut Vec<Token>) -> ExprResult<()> {
        while needs_reduction(tokens) {
            if self.reduce(tokens)? == Step::Stalled {
                return Err(ExprError::Stalled {
                    remaining: describe(tokens),
                });
            }
        }
        Ok(())
    }

    /// Reduce a nested sequence; failures collapse it to `Undefined`
    fn reduce_to_single(&mut self, tokens: &mut Vec<Token>, context: &str) {
        while needs_reduction(tokens) {
            match self.reduce(tokens) {
                Ok(Step::Progressed) => {}
                Ok(Step::Stalled) => {
                    self.diagnostics.error(
                        Stage::Evaluator,
                        format!("{} could not be reduced: <{}>", context, describe(tokens)),
                    );
                    *tokens = vec![Token::Undefined];
                }
                Err(err) => {
                    self.diagnostics
                        .error(Stage::Evaluator, format!("error in {}: {}", context, err));
                    *tokens = vec![Token::Undefined];
                }
            }
        }
    }

    /// One reduction step, guarded by the nesting limit
    fn reduce(&mut self, tokens: &mut Vec<Token>) -> ExprResult<Step> {
        self.depth += 1;
        if self.depth > self.config.max_depth {
            self.depth -= 1;
            return Err(ExprError::RecursionLimitExceeded {
                limit: self.config.max_depth,
            });
        }
        let result = self.reduce_inner(tokens);
        self.depth -= 1;
        result
    }

    fn reduce_inner(&mut self, tokens: &mut Vec<Token>) -> ExprResult<Step> {
        if tokens.is_empty() {
            return Ok(Step::Stalled);
        }

        let mut progressed = self.resolve_variables(tokens);
        progressed |= self.resolve_function(tokens)?;
        progressed |= self.resolve_group(tokens);
        progressed |= self.resolve_conditional(tokens);

        if progressed {
            Ok(Step::Progressed)
        } else {
            Ok(self.apply_operators(tokens))
        }
    }

    fn resolve_variables(&mut self, tokens: &mut [Token]) -> bool {
        let mut changed = false;
        for token in tokens.iter_mut() {
            if let Token::Variable(name) = token {
                let name = std::mem::take(name);
                *token = self.lookup_variable(&name);
                changed = true;
            }
        }
        changed
    }

    /// Bound value, else a named constant, else the empty string
    fn lookup_variable(&mut self, name: &str) -> Token {
        if let Some(value) = self.variables.get(name) {
            return match value {
                Value::Null => Token::Text(String::new()),
                other => Token::from(other.clone()),
            };
        }

        match name.to_lowercase().as_str() {
            "true" => Token::Number(1.0),
            "false" => Token::Number(0.0),
            "pi" => Token::Number(std::f64::consts::PI),
            "pi_2" => Token::Number(std::f64::consts::FRAC_PI_2),
            "pi_4" => Token::Number(std::f64::consts::FRAC_PI_4),
            "e" => Token::Number(std::f64::consts::E),
            _ => {
                let known: Vec<&str> = self.variables.keys().collect();
                let hint = suggestion_suffix(name, &known);
                self.diagnostics.warn(
                    Stage::Evaluator,
                    format!("unknown variable '{}', using empty string{}", name, hint),
                );
                Token::Text(String::new())
            }
        }
    }

    fn resolve_function(&mut self, tokens: &mut [Token]) -> ExprResult<bool> {
        let Some(index) = tokens
            .iter()
            .position(|t| matches!(t, Token::Function { .. }))
        else {
            return Ok(false);
        };
        if let Token::Function { name, args } = std::mem::take(&mut tokens[index]) {
            tokens[index] = self.call_function(&name, args)?;
        }
        Ok(true)
    }

    fn call_function(&mut self, name: &str, args: Vec<Token>) -> ExprResult<Token> {
        if name.is_empty() {
            self.diagnostics
                .error(Stage::Evaluator, "function call without a name ignored");
            return Ok(Token::Undefined);
        }

        let functions = self.functions;
        let Some(function) = functions.get(name) else {
            let hint = suggestion_suffix(name, &functions.names());
            self.diagnostics.warn(
                Stage::Evaluator,
                format!("unknown function '{}' ignored{}", name, hint),
            );
            return Ok(Token::Undefined);
        };

        let values: Vec<Value> = split_arguments(args)
            .into_iter()
            .map(|mut arg| {
                self.reduce_to_single(&mut arg, "function argument");
                match arg.as_slice() {
                    [token] => token.to_value(),
                    _ => Value::Null,
                }
            })
            .collect();

        tracing::trace!(function = %name, args = values.len(), "calling function");
        Ok(Token::from(function(&values)?))
    }

    fn resolve_group(&mut self, tokens: &mut Vec<Token>) -> bool {
        let Some(index) = tokens.iter().position(|t| matches!(t, Token::Group(_))) else {
            return false;
        };
        let Token::Group(mut inner) = std::mem::take(&mut tokens[index]) else {
            return false;
        };

        self.reduce_to_single(&mut inner, "parentheses");
        match inner.pop() {
            Some(Token::Undefined) => {
                self.diagnostics.error(
                    Stage::Evaluator,
                    "parentheses evaluated to null, removing them",
                );
                tokens.remove(index);
            }
            Some(token) => tokens[index] = token,
            None => {
                self.diagnostics
                    .error(Stage::Evaluator, "empty parentheses removed");
                tokens.remove(index);
            }
        }
        true
    }

    fn resolve_conditional(&mut self, tokens: &mut [Token]) -> bool {
        let Some(Token::Conditional {
            when_true,
            when_false,
        }) = tokens
            .iter_mut()
            .find(|t| matches!(t, Token::Conditional { .. }))
        else {
            return false;
        };

        let mut changed = false;
        for (branch, which) in [(when_true, "true"), (when_false, "false")] {
            if branch.len() > 1 {
                self.reduce_to_single(branch, "conditional branch");
                changed = true;
            }
            if branch.is_empty() {
                self.diagnostics.warn(
                    Stage::Evaluator,
                    format!("conditional's {} result is empty, using null", which),
                );
                branch.push(Token::Undefined);
                changed = true;
            }
        }
        changed
    }

    /// Combine the leading operand with what follows it
    fn apply_operators(&mut self, tokens: &mut Vec<Token>) -> Step {
        match tokens.first() {
            None => return Step::Stalled,
            Some(Token::Operator(op)) => {
                let op = *op;
                self.apply_leading_operator(tokens, op);
                return Step::Progressed;
            }
            Some(Token::Conditional { .. }) => {
                self.diagnostics.error(
                    Stage::Evaluator,
                    "conditional without a condition, removing it",
                );
                tokens.remove(0);
                return Step::Progressed;
            }
            Some(_) if tokens.len() < 2 => return Step::Stalled,
            Some(_) => {}
        }

        match &tokens[1] {
            Token::Conditional {
                when_true,
                when_false,
            } => {
                let branch = if tokens[0].to_number() != 0.0 {
                    when_true
                } else {
                    when_false
                };
                let chosen = branch.first().cloned().unwrap_or_default();
                tokens[0] = chosen;
                tokens.remove(1);
            }
            Token::Operator(op) => {
                let op = *op;
                self.apply_binary(tokens, op);
            }
            _ => self.merge_adjacent(tokens),
        }
        Step::Progressed
    }

    fn apply_leading_operator(&mut self, tokens: &mut Vec<Token>, op: Operator) {
        if op.is_sign() {
            if tokens.len() < 2 {
                self.diagnostics.warn(
                    Stage::Evaluator,
                    format!("operator {} has no value to apply to, result is 0", op),
                );
                tokens[0] = Token::Number(0.0);
                return;
            }
            if self.fold_sign(tokens, 0) {
                return;
            }
        }
        self.diagnostics.error(
            Stage::Evaluator,
            format!("operator {} is missing its left side value, removing it", op),
        );
        tokens.remove(0);
    }

    /// Fold the sign operator at `index` into the operand after it
    fn fold_sign(&mut self, tokens: &mut Vec<Token>, index: usize) -> bool {
        let Some(op) = tokens.get(index).and_then(Token::as_operator) else {
            return false;
        };
        fn scalar_at(tokens: &[Token], i: usize) -> bool {
            tokens.get(i).is_some_and(Token::is_scalar)
        }

        match op {
            Operator::Not | Operator::DoubleNot => {
                if scalar_at(tokens, index + 1) {
                    tokens[index + 1] = ops::logical_not(op, &tokens[index + 1]);
                    tokens.remove(index);
                    true
                } else if tokens
                    .get(index + 1)
                    .is_some_and(|t| t.is_operator(Operator::Sub))
                    && scalar_at(tokens, index + 2)
                {
                    let negated = ops::negate(&tokens[index + 2]);
                    tokens[index + 2] = ops::logical_not(op, &negated);
                    tokens.drain(index..index + 2);
                    true
                } else {
                    false
                }
            }
            Operator::Sub => {
                let run = tokens[index..]
                    .iter()
                    .take_while(|t| t.is_operator(Operator::Sub))
                    .count();
                let operand = index + run;
                if !scalar_at(tokens, operand) {
                    return false;
                }
                if run % 2 == 1 {
                    tokens[operand] = ops::negate(&tokens[operand]);
                }
                tokens.drain(index..operand);
                true
            }
            _ => false,
        }
    }

    fn apply_binary(&mut self, tokens: &mut Vec<Token>, op: Operator) {
        if tokens.len() < 3 {
            self.diagnostics.error(
                Stage::Evaluator,
                format!("operator {} is missing its right side value, removing it", op),
            );
            tokens.remove(1);
            return;
        }

        match op {
            Operator::Not | Operator::DoubleNot => {
                if !self.fold_sign(tokens, 1) {
                    self.diagnostics.error(
                        Stage::Evaluator,
                        format!("operator {} has nothing to negate, removing it", op),
                    );
                    tokens.remove(1);
                }
                return;
            }
            Operator::Set | Operator::Comma => {
                self.diagnostics.error(
                    Stage::Evaluator,
                    format!("unexpected operator {}, removing it", op),
                );
                tokens.remove(1);
                return;
            }
            _ => {}
        }

        self.fold_sign(tokens, 2);
        if let Token::Operator(next) = &tokens[2] {
            self.diagnostics.error(
                Stage::Evaluator,
                format!(
                    "operator {} is missing its right side value (found {}), removing it",
                    op, next
                ),
            );
            tokens.remove(1);
            return;
        }

        let result = ops::apply_binary(op, &tokens[0], &tokens[2], &mut self.diagnostics);
        tokens[2] = result;
        tokens.drain(..2);
    }

    /// Two operands with no operator between them
    fn merge_adjacent(&mut self, tokens: &mut Vec<Token>) {
        let second = tokens.remove(1);
        let first = std::mem::take(&mut tokens[0]);

        tokens[0] = match (first, second) {
            (Token::Number(n), Token::Text(s)) if !s.is_empty() => {
                Token::Text(value::format_number(n) + &s)
            }
            (Token::Text(s), Token::Number(n)) if !s.is_empty() => {
                Token::Text(s + &value::format_number(n))
            }
            (Token::Number(n), Token::Text(_)) | (Token::Text(_), Token::Number(n)) => {
                Token::Number(n)
            }
            (Token::Number(a), Token::Number(b)) => Token::Number(a + b),
            (Token::Text(a), Token::Text(b)) => Token::Text(a + &b),
            (Token::Undefined, other) | (other, Token::Undefined) => other,
            (first, second) => {
                self.diagnostics.error(
                    Stage::Evaluator,
                    format!("cannot combine {} with {}, dropping the latter", first, second),
                );
                first
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Severity;
    use crate::lexer::tokenize;
    use std::sync::{Arc, Mutex};

    fn sum(args: &[Value]) -> Value {
        Value::Number(args.iter().map(Value::to_number).sum())
    }

    fn test_functions() -> FunctionMap {
        let mut functions = FunctionMap::new();
        functions.register("f", sum);
        functions.register("g", |args: &[Value]| {
            Value::Number(args.iter().map(Value::to_number).product())
        });
        functions.register("id", |args: &[Value]| args.first().cloned().unwrap_or_default());
        functions.register_fallible("boom", |_: &[Value]| {
            Err(ExprError::function_failed("boom", "exploded"))
        });
        functions
    }

    fn eval_in(source: &str, variables: &mut VariableMap) -> (Value, Diagnostics) {
        let functions = test_functions();
        let mut evaluator = Evaluator::new(&functions, variables);
        let result = evaluator.evaluate(tokenize(source));
        (result.to_value(), evaluator.into_diagnostics())
    }

    fn eval(source: &str) -> Value {
        eval_in(source, &mut VariableMap::new()).0
    }

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    fn text(s: &str) -> Value {
        Value::String(s.to_string())
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 1"), num(2.0));
        assert_eq!(eval("7 - 10"), num(-3.0));
        assert_eq!(eval("2 ^ 10"), num(1024.0));
        assert_eq!(eval("7 % 4"), num(3.0));
        assert_eq!(eval("1 / 4"), num(0.25));
    }

    #[test]
    fn test_left_to_right_without_precedence() {
        assert_eq!(eval("1 + 2 * 3"), num(9.0));
        assert_eq!(eval("1 + (2 * 3)"), num(7.0));
        assert_eq!(eval("(1+1)+(2+2)"), num(6.0));
    }

    #[test]
    fn test_concatenation() {
        assert_eq!(eval("'a' . 'b'"), text("ab"));
        assert_eq!(eval("1 . 2"), text("12"));
        assert_eq!(eval("'a' + 'b'"), text("ab"));
        assert_eq!(eval("2 + 'b'"), text("2b"));
    }

    #[test]
    fn test_signs() {
        assert_eq!(eval("-5"), num(-5.0));
        assert_eq!(eval("- 5 + 3"), num(-2.0));
        assert_eq!(eval("- - 5"), num(5.0));
        assert_eq!(eval("2 * -3"), num(-6.0));
        assert_eq!(eval("2 - -3"), num(5.0));
        assert_eq!(eval("-"), num(0.0));
    }

    #[test]
    fn test_logical_not() {
        assert_eq!(eval("!5"), num(0.0));
        assert_eq!(eval("!0"), num(1.0));
        assert_eq!(eval("! ! 5"), num(1.0));
        assert_eq!(eval("!! 0"), num(0.0));
        assert_eq!(eval("!! - 2"), num(1.0));
        assert_eq!(eval("1 & !0"), num(1.0));
    }

    #[test]
    fn test_logic_operators() {
        assert_eq!(eval("0 | 0"), num(0.0));
        assert_eq!(eval("0 | 3"), num(1.0));
        // AND is decided by its right operand alone
        assert_eq!(eval("0 & 1"), num(1.0));
        assert_eq!(eval("1 & 0"), num(0.0));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("2 < 10"), num(1.0));
        assert_eq!(eval("'2' < 10"), num(0.0));
        assert_eq!(eval("'abc' lt 'abd'"), num(1.0));
        assert_eq!(eval("3 eq 3"), num(1.0));
        assert_eq!(eval("'x' == 'x'"), num(1.0));
        assert_eq!(eval("1 != 1"), num(0.0));
    }

    #[test]
    fn test_conditionals() {
        assert_eq!(eval("1 == 1 ? 2 : 5"), num(2.0));
        assert_eq!(eval("1 == 2 ? 2 : 5"), num(5.0));

        let source = "bb ? ('hello ' . 'world') : 'not today'";
        let mut vars = VariableMap::new();
        vars.insert("bb", num(1.0));
        assert_eq!(eval_in(source, &mut vars).0, text("hello world"));
        vars.insert("bb", num(0.0));
        assert_eq!(eval_in(source, &mut vars).0, text("not today"));
    }

    #[test]
    fn test_conditional_branches_are_reduced() {
        let mut vars = VariableMap::new();
        vars.insert("x", num(4.0));
        assert_eq!(eval_in("1 ? x : 0", &mut vars).0, num(4.0));
        assert_eq!(eval_in("0 ? 1 : (x * 2)", &mut vars).0, num(8.0));
    }

    #[test]
    fn test_division_by_zero() {
        let (value, diagnostics) = eval_in("10 / 0", &mut VariableMap::new());
        assert_eq!(value, num(0.0));
        assert!(diagnostics.mentions(Severity::Warning, "division by zero"));
        assert_eq!(eval("10 % 0"), num(0.0));
    }

    #[test]
    fn test_assignment() {
        let mut vars = VariableMap::new();
        let (value, _) = eval_in("x = 5", &mut vars);
        assert_eq!(value, num(5.0));
        assert_eq!(vars.get("x"), Some(&num(5.0)));

        let (value, _) = eval_in("X = x * 2", &mut vars);
        assert_eq!(value, num(10.0));
        assert_eq!(vars.get("x"), Some(&num(10.0)));
    }

    #[test]
    fn test_assignment_without_result_sets_null() {
        let mut vars = VariableMap::new();
        vars.insert("x", num(1.0));
        let (value, diagnostics) = eval_in("x = boom()", &mut vars);
        assert_eq!(value, Value::Null);
        assert_eq!(vars.get("x"), Some(&Value::Null));
        assert!(diagnostics.mentions(Severity::Warning, "set to null"));
    }

    #[test]
    fn test_variables() {
        let mut vars = VariableMap::new();
        vars.insert("Name", text("world"));
        vars.insert("nothing", Value::Null);
        vars.insert("e", num(5.0));

        assert_eq!(eval_in("'hello ' . NAME", &mut vars).0, text("hello world"));
        assert_eq!(eval_in("nothing . 'y'", &mut vars).0, text("y"));
        assert_eq!(eval_in("e", &mut vars).0, num(5.0));
    }

    #[test]
    fn test_constants() {
        assert_eq!(eval("TRUE + 1"), num(2.0));
        assert_eq!(eval("false"), num(0.0));
        assert_eq!(eval("pi"), num(std::f64::consts::PI));
        assert_eq!(eval("pi_2 * 2"), num(std::f64::consts::PI));
        assert_eq!(eval("e"), num(std::f64::consts::E));
    }

    #[test]
    fn test_unknown_variable() {
        let mut vars = VariableMap::new();
        vars.insert("counter", num(1.0));
        let (value, diagnostics) = eval_in("countr + 1", &mut vars);
        assert_eq!(value, num(1.0));
        assert!(diagnostics.mentions(Severity::Warning, "did you mean 'counter'"));
    }

    #[test]
    fn test_implicit_adjacency() {
        assert_eq!(eval("1 'a'"), text("1a"));
        assert_eq!(eval("'a' 1"), text("a1"));
        assert_eq!(eval("1 2"), num(3.0));
        assert_eq!(eval("'a' 'b'"), text("ab"));
        assert_eq!(eval("'' 5"), num(5.0));
    }

    #[test]
    fn test_nested_function_calls() {
        assert_eq!(eval("f(1, g(2,3), 4)"), num(11.0));
        assert_eq!(eval("F(1, (2 + 3))"), num(6.0));
        assert_eq!(eval("f()"), num(0.0));
        assert_eq!(eval("id('x') . id(1)"), text("x1"));
    }

    #[test]
    fn test_inner_call_runs_first() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut functions = FunctionMap::new();
        for name in ["outer", "inner"] {
            let calls = Arc::clone(&calls);
            functions.register(name, move |args: &[Value]| {
                calls.lock().unwrap().push(name);
                args.first().cloned().unwrap_or_default()
            });
        }

        let mut vars = VariableMap::new();
        let mut evaluator = Evaluator::new(&functions, &mut vars);
        let result = evaluator.evaluate(tokenize("outer(inner(3))"));
        assert_eq!(result, Token::Number(3.0));
        assert_eq!(*calls.lock().unwrap(), vec!["inner", "outer"]);
    }

    #[test]
    fn test_unknown_function() {
        let (value, diagnostics) = eval_in("nothing(1) + 1", &mut VariableMap::new());
        assert_eq!(value, num(1.0));
        assert!(diagnostics.mentions(Severity::Warning, "unknown function 'nothing'"));
    }

    #[test]
    fn test_failing_function_aborts_at_top_level() {
        let (value, diagnostics) = eval_in("boom() + 1", &mut VariableMap::new());
        assert_eq!(value, Value::Null);
        assert!(diagnostics.mentions(Severity::Error, "evaluation aborted"));
    }

    #[test]
    fn test_failing_function_is_contained() {
        let (value, diagnostics) = eval_in("f(boom(), 2)", &mut VariableMap::new());
        assert_eq!(value, num(2.0));
        assert!(diagnostics.mentions(Severity::Error, "function argument"));

        let (value, _) = eval_in("(boom()) + 1", &mut VariableMap::new());
        assert_eq!(value, num(1.0));
    }

    #[test]
    fn test_missing_operands() {
        let (value, diagnostics) = eval_in("5 +", &mut VariableMap::new());
        assert_eq!(value, num(5.0));
        assert!(diagnostics.mentions(Severity::Error, "right side"));

        let (value, diagnostics) = eval_in("* 5", &mut VariableMap::new());
        assert_eq!(value, num(5.0));
        assert!(diagnostics.mentions(Severity::Error, "left side"));
    }

    #[test]
    fn test_empty_parentheses() {
        let (value, diagnostics) = eval_in("() 1", &mut VariableMap::new());
        assert_eq!(value, num(1.0));
        assert!(diagnostics.mentions(Severity::Error, "empty parentheses"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(eval(""), Value::Null);
    }

    #[test]
    fn test_recursion_limit() {
        let functions = test_functions();
        let mut vars = VariableMap::new();
        let config = Config::default().with_max_depth(2);
        let mut evaluator = Evaluator::with_config(&functions, &mut vars, config);
        evaluator.evaluate(tokenize("id(id(id(1)))"));
        assert!(evaluator
            .diagnostics()
            .mentions(Severity::Error, "maximum nesting depth"));
    }

    #[test]
    fn test_split_arguments() {
        let args = tokenize_arguments("1, 2 + 3,");
        let groups = split_arguments(args);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].len(), 3);
    }

    fn tokenize_arguments(source: &str) -> Vec<Token> {
        crate::lexer::Lexer::new(source).tokenize_arguments()
    }
}
