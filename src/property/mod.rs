//! Property maps: named expressions evaluated on lookup
//!
//! Keys are case-insensitive and keep insertion order. Values are
//! expression source text; JSON/YAML scalars are accepted and stored as
//! their text form.

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{ExprError, ExprResult};
use crate::evaluator::{FunctionMap, LowercaseMap, Value, VariableMap};
use crate::expression::Expression;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PropertyMap {
    entries: LowercaseMap<String>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of properties
    pub fn from_json(text: &str) -> ExprResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| ExprError::invalid_input(format!("invalid property JSON: {}", e)))
    }

    /// Parse a YAML mapping of properties
    pub fn from_yaml(text: &str) -> ExprResult<Self> {
        serde_yaml::from_str(text)
            .map_err(|e| ExprError::invalid_input(format!("invalid property YAML: {}", e)))
    }

    /// Set the expression text of a property
    pub fn insert(&mut self, key: impl Into<String>, expression: impl Into<String>) -> Option<String> {
        self.entries.insert(key, expression.into())
    }

    /// Evaluate a property.
    ///
    /// A missing or blank property, or one that evaluates to null or the
    /// empty string, yields `default`. With a null default, an empty string
    /// result yields the expression's canonical text instead.
    pub fn get(
        &self,
        key: &str,
        default: impl Into<Value>,
        functions: &FunctionMap,
        variables: &mut VariableMap,
    ) -> Value {
        let default = default.into();
        let Some(expression) = self.expression(key) else {
            return default;
        };

        match expression.evaluate(functions, variables) {
            Value::String(s) if s.is_empty() && default.is_null() => {
                let pretty = expression.pretty();
                if pretty.is_empty() {
                    default
                } else {
                    tracing::debug!(property = key, "property is empty, using its text");
                    Value::String(pretty)
                }
            }
            value if value.is_empty() => {
                tracing::debug!(property = key, "property has no value, using default");
                default
            }
            value => value,
        }
    }

    /// Expression text as stored
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .map(String::as_str)
            .filter(|text| !text.trim().is_empty())
    }

    /// Canonical form of the property's expression
    pub fn pretty(&self, key: &str) -> Option<String> {
        self.expression(key).map(|e| e.pretty())
    }

    pub fn expression(&self, key: &str) -> Option<Expression> {
        self.raw(key).map(Expression::new)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for PropertyMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = LowercaseMap::<Value>::deserialize(deserializer)?;
        Ok(Self {
            entries: raw.iter().map(|(k, v)| (k, v.to_text())).collect(),
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
