//! Parsed expressions
//!
//! An [`Expression`] owns its source text and the validated token tree
//! built from it. Evaluation works on a copy of the tree, so one expression
//! can be evaluated any number of times against different variables.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::config::Config;
use crate::errors::Diagnostic;
use crate::evaluator::{Evaluator, FunctionMap, Value, VariableMap};
use crate::formatter::describe;
use crate::lexer::token::Token;
use crate::lexer::Lexer;
use crate::validator::validate_assignment;

/// Result of one evaluation together with what was reported along the way
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub value: Value,
    pub diagnostics: Vec<Diagnostic>,
}

/// A parsed and validated expression
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    tokens: Vec<Token>,
    /// Parser and validator diagnostics
    diagnostics: Vec<Diagnostic>,
    valid: bool,
    config: Config,
}

impl Expression {
    /// Parse and validate `source`
    pub fn new(source: impl Into<String>) -> Self {
        Self::with_config(source, Config::default())
    }

    pub fn with_config(source: impl Into<String>, config: Config) -> Self {
        let mut expression = Self {
            source: String::new(),
            tokens: Vec::new(),
            diagnostics: Vec::new(),
            valid: true,
            config,
        };
        expression.set_source(source);
        expression
    }

    /// Replace the source text and parse it again
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();

        let (mut tokens, mut diagnostics) = {
            let mut lexer = Lexer::with_config(&self.source, self.config);
            let tokens = lexer.tokenize();
            (tokens, lexer.take_diagnostics())
        };
        self.valid = validate_assignment(&mut tokens, &self.source, true, &mut diagnostics);
        if !self.valid {
            tracing::debug!(source = %self.source, "expression repaired during validation");
        }

        self.tokens = tokens;
        self.diagnostics = diagnostics.into_vec();
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// False when validation had to repair an illegal assignment
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Canonical text of the parsed tree
    pub fn pretty(&self) -> String {
        describe(&self.tokens)
    }

    /// Evaluate against the given tables; a top-level `name = ...` writes
    /// its result into `variables`
    pub fn evaluate(&self, functions: &FunctionMap, variables: &mut VariableMap) -> Value {
        self.evaluate_with_diagnostics(functions, variables).value
    }

    pub fn evaluate_with_diagnostics(
        &self,
        functions: &FunctionMap,
        variables: &mut VariableMap,
    ) -> Evaluation {
        let mut evaluator = Evaluator::with_config(functions, variables, self.config);
        let value = evaluator.evaluate(self.tokens.clone()).to_value();
        Evaluation {
            value,
            diagnostics: evaluator.into_diagnostics().into_vec(),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty())
    }
}

impl FromStr for Expression {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Expression::new(s))
    }
}

impl From<&str> for Expression {
    fn from(source: &str) -> Self {
        Expression::new(source)
    }
}

impl From<String> for Expression {
    fn from(source: String) -> Self {
        Expression::new(source)
    }
}
