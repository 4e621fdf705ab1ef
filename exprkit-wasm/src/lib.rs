use wasm_bindgen::prelude::*;

use exprkit::{Diagnostic, Expression, FunctionMap, Severity, VariableMap};

#[wasm_bindgen]
pub struct EvalResult {
    output: String,
    error: String,
    success: bool,
}

#[wasm_bindgen]
impl EvalResult {
    #[wasm_bindgen(getter)]
    pub fn output(&self) -> String {
        self.output.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn error(&self) -> String {
        self.error.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn success(&self) -> bool {
        self.success
    }
}

impl EvalResult {
    fn failure(error: String) -> Self {
        EvalResult {
            output: String::new(),
            error,
            success: false,
        }
    }
}

/// Error-level messages, one per line
fn error_messages<'a>(diagnostics: impl IntoIterator<Item = &'a Diagnostic>) -> String {
    diagnostics
        .into_iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| d.message.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Evaluate an expression with the built-in functions.
///
/// - `source`: expression text
/// - `variables_json`: JSON object of variables, e.g. `{"price": 4, "name": "x"}`
#[wasm_bindgen]
pub fn evaluate(source: &str, variables_json: &str) -> EvalResult {
    let mut variables: VariableMap = if variables_json.trim().is_empty() {
        VariableMap::new()
    } else {
        match serde_json::from_str(variables_json) {
            Ok(vars) => vars,
            Err(e) => return EvalResult::failure(format!("invalid variables: {}", e)),
        }
    };

    let functions = FunctionMap::with_builtins();
    let expression = Expression::new(source);
    let evaluation = expression.evaluate_with_diagnostics(&functions, &mut variables);
    let error = error_messages(expression.diagnostics().iter().chain(&evaluation.diagnostics));

    EvalResult {
        output: evaluation.value.to_string(),
        success: error.is_empty(),
        error,
    }
}

/// Canonical form of an expression
#[wasm_bindgen]
pub fn describe(source: &str) -> EvalResult {
    let expression = Expression::new(source);
    EvalResult {
        output: expression.pretty(),
        error: error_messages(expression.diagnostics()),
        success: expression.is_valid(),
    }
}
