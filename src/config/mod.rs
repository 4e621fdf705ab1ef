//! Engine limits shared by the lexer and the evaluator.

use serde::{Deserialize, Serialize};

/// Maximum nesting depth before the lexer or evaluator bails out
pub const MAX_EVAL_DEPTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deepest group/call/branch nesting that is parsed and reduced
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: MAX_EVAL_DEPTH,
        }
    }
}

impl Config {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
