//! Error types, diagnostics, and result aliases for exprkit.
//!
//! Hard failures are variants of [`ExprError`], rendered via `miette`.
//! Everything the lexer, validator and evaluator repair on their own is
//! reported as a [`Diagnostic`]: emitted through `tracing` and collected so
//! callers can inspect what happened.

use std::fmt;
use std::ops::Range;

use miette::{LabeledSpan, SourceSpan};
use thiserror::Error;

/// Edit distance between two names, ignoring case the way name tables do
fn name_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    // previous and current row of the edit matrix
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Closest candidate within `max_distance` edits, first one wins ties
pub fn find_similar<S: AsRef<str>>(
    name: &str,
    candidates: &[S],
    max_distance: usize,
) -> Option<String> {
    candidates
        .iter()
        .map(|candidate| (name_distance(name, candidate.as_ref()), candidate.as_ref()))
        .filter(|(distance, _)| *distance <= max_distance)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.to_string())
}

/// Suffix for an "unknown name" message, e.g. `" (did you mean 'port'?)"`
pub fn suggestion_suffix<S: AsRef<str>>(name: &str, available: &[S]) -> String {
    // longer names tolerate more typos
    let max_distance = (name.len() / 3).clamp(1, 3);
    match find_similar(name, available, max_distance) {
        Some(candidate) => format!(" (did you mean '{}'?)", candidate),
        None => String::new(),
    }
}

/// Main error type for exprkit
#[derive(Error, Debug, miette::Diagnostic)]
pub enum ExprError {
    #[error("{function}() called with {found} argument(s), expected {expected}")]
    #[diagnostic(code(E0602), help("check the function's argument list"))]
    WrongArgumentCount {
        function: String,
        expected: String,
        found: usize,
    },

    #[error("{function}() expected {expected}, found {found}")]
    #[diagnostic(code(E0601))]
    ArgumentType {
        function: String,
        expected: String,
        found: String,
    },

    #[error("{function}() failed: {message}")]
    #[diagnostic(code(E0604))]
    FunctionFailed { function: String, message: String },

    #[error("maximum nesting depth of {limit} exceeded")]
    #[diagnostic(
        code(E0403),
        help("simplify the expression or raise Config::max_depth")
    )]
    RecursionLimitExceeded { limit: usize },

    #[error("evaluation made no progress on <{remaining}>")]
    #[diagnostic(code(E0404))]
    Stalled { remaining: String },

    #[error("I/O error: {message}")]
    #[diagnostic(code(E0901))]
    Io { message: String },

    #[error("{message}")]
    #[diagnostic(code(E0902))]
    InvalidInput { message: String },
}

impl ExprError {
    /// Create a WrongArgumentCount error
    pub fn wrong_argument_count(
        function: impl Into<String>,
        expected: impl Into<String>,
        found: usize,
    ) -> Self {
        ExprError::WrongArgumentCount {
            function: function.into(),
            expected: expected.into(),
            found,
        }
    }

    /// Create an ArgumentType error
    pub fn argument_type(
        function: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        ExprError::ArgumentType {
            function: function.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a FunctionFailed error
    pub fn function_failed(function: impl Into<String>, message: impl fmt::Display) -> Self {
        ExprError::FunctionFailed {
            function: function.into(),
            message: message.to_string(),
        }
    }

    pub fn io_error(message: impl fmt::Display) -> Self {
        ExprError::Io {
            message: message.to_string(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        ExprError::InvalidInput {
            message: message.into(),
        }
    }

    /// Get a simple error message (without source context)
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Result type for exprkit operations
pub type ExprResult<T> = Result<T, ExprError>;

/// How serious a diagnostic is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Pipeline stage that produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Parser,
    Validator,
    Evaluator,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Parser => write!(f, "parser"),
            Stage::Validator => write!(f, "validator"),
            Stage::Evaluator => write!(f, "evaluator"),
        }
    }
}

/// A non-fatal message from parsing, validation or evaluation
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize)]
#[error("{message}")]
pub struct Diagnostic {
    pub severity: Severity,
    pub stage: Stage,
    pub message: String,
    /// Byte range into the expression source, when known
    pub span: Option<Range<usize>>,
}

impl Diagnostic {
    pub fn new(severity: Severity, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            severity,
            stage,
            message: message.into(),
            span: None,
        }
    }

    pub fn with_span(mut self, span: Range<usize>) -> Self {
        self.span = Some(span);
        self
    }

    /// Forward this diagnostic to the `tracing` subscriber
    fn emit(&self) {
        match self.severity {
            Severity::Info => tracing::debug!(stage = %self.stage, "{}", self.message),
            Severity::Warning => tracing::warn!(stage = %self.stage, "{}", self.message),
            Severity::Error => tracing::error!(stage = %self.stage, "{}", self.message),
        }
    }
}

impl miette::Diagnostic for Diagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("exprkit::{}", self.stage)))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.severity {
            Severity::Info => miette::Severity::Advice,
            Severity::Warning => miette::Severity::Warning,
            Severity::Error => miette::Severity::Error,
        })
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.span.clone()?;
        let span: SourceSpan = span.into();
        Some(Box::new(std::iter::once(LabeledSpan::at(span, "here"))))
    }
}

/// Collected diagnostics of one pipeline run
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        diagnostic.emit();
        self.entries.push(diagnostic);
    }

    pub fn info(&mut self, stage: Stage, message: impl Into<String>) {
        self.push(Diagnostic::new(Severity::Info, stage, message));
    }

    pub fn warn(&mut self, stage: Stage, message: impl Into<String>) {
        self.push(Diagnostic::new(Severity::Warning, stage, message));
    }

    pub fn error(&mut self, stage: Stage, message: impl Into<String>) {
        self.push(Diagnostic::new(Severity::Error, stage, message));
    }

    pub fn warn_at(&mut self, stage: Stage, span: Range<usize>, message: impl Into<String>) {
        self.push(Diagnostic::new(Severity::Warning, stage, message).with_span(span));
    }

    pub fn error_at(&mut self, stage: Stage, span: Range<usize>, message: impl Into<String>) {
        self.push(Diagnostic::new(Severity::Error, stage, message).with_span(span));
    }

    /// Append already-emitted diagnostics without logging them again
    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        self.entries.extend(other);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    /// Whether any diagnostic at or above `severity` mentions `needle`
    pub fn mentions(&self, severity: Severity, needle: &str) -> bool {
        self.entries
            .iter()
            .any(|d| d.severity >= severity && d.message.contains(needle))
    }
}
