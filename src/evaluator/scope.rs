//! Variable and function tables visible to an evaluation
//!
//! Both tables look names up case-insensitively and iterate in insertion
//! order, yielding keys as they were first written.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::value::Value;
use crate::errors::ExprResult;

/// Ordered map with case-insensitive keys
#[derive(Clone)]
pub struct LowercaseMap<V> {
    /// lower-cased key -> (key as first inserted, value)
    entries: IndexMap<String, (String, V)>,
}

impl<V> Default for LowercaseMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> LowercaseMap<V> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Insert or replace; the original key spelling is kept on replace
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        match self.entries.get_mut(&key.to_lowercase()) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.insert(key.to_lowercase(), (key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(&key.to_lowercase()).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries.get_mut(&key.to_lowercase()).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_lowercase())
    }

    /// Remove an entry, keeping the order of the rest
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries
            .shift_remove(&key.to_lowercase())
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.values().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: fmt::Debug> fmt::Debug for LowercaseMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<V: PartialEq> PartialEq for LowercaseMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|theirs| theirs == v))
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for LowercaseMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Into<String>, V> Extend<(K, V)> for LowercaseMap<V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<V: Serialize> Serialize for LowercaseMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for LowercaseMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = IndexMap::<String, V>::deserialize(deserializer)?;
        Ok(raw.into_iter().collect())
    }
}

/// Variable bindings, mutated only by top-level assignment
pub type VariableMap = LowercaseMap<Value>;

/// A callable exposed to expressions
pub type Function = Arc<dyn Fn(&[Value]) -> ExprResult<Value> + Send + Sync>;

/// Functions callable from expressions
#[derive(Clone, Default)]
pub struct FunctionMap {
    functions: LowercaseMap<Function>,
}

impl FunctionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table pre-loaded with the built-in library
    pub fn with_builtins() -> Self {
        let mut functions = Self::new();
        super::builtins::register_all(&mut functions);
        functions
    }

    /// Register a function that cannot fail
    pub fn register<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.functions
            .insert(name, Arc::new(move |args: &[Value]| Ok(function(args))));
    }

    /// Register a function whose errors abort the call
    pub fn register_fallible<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&[Value]) -> ExprResult<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name, Arc::new(function));
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.functions.remove(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.functions.keys().map(str::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FunctionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.functions.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExprError;

    #[test]
    fn test_case_insensitive_lookup() {
        let mut vars = VariableMap::new();
        vars.insert("Counter", Value::Number(1.0));

        assert_eq!(vars.get("counter"), Some(&Value::Number(1.0)));
        assert_eq!(vars.get("COUNTER"), Some(&Value::Number(1.0)));
        assert!(vars.contains_key("cOuNtEr"));
        assert_eq!(vars.get("count"), None);
    }

    #[test]
    fn test_replace_keeps_first_spelling() {
        let mut vars = VariableMap::new();
        vars.insert("Total", Value::Number(1.0));
        let old = vars.insert("TOTAL", Value::Number(2.0));

        assert_eq!(old, Some(Value::Number(1.0)));
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.keys().collect::<Vec<_>>(), vec!["Total"]);
        assert_eq!(vars.get("total"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_insertion_order() {
        let vars: VariableMap = [("b", Value::Null), ("A", Value::Null), ("c", Value::Null)]
            .into_iter()
            .collect();
        assert_eq!(vars.keys().collect::<Vec<_>>(), vec!["b", "A", "c"]);

        let mut vars = vars;
        vars.remove("a");
        assert_eq!(vars.keys().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn test_deserialize() {
        let vars: VariableMap = serde_json::from_str(r#"{"Name": "x", "n": 2}"#).unwrap();
        assert_eq!(vars.get("name"), Some(&Value::String("x".into())));
        assert_eq!(vars.get("N"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_function_registration() {
        let mut functions = FunctionMap::new();
        functions.register("Double", |args: &[Value]| {
            Value::Number(args.first().map_or(0.0, Value::to_number) * 2.0)
        });
        functions.register_fallible("fail", |_: &[Value]| {
            Err(ExprError::function_failed("fail", "always"))
        });

        let double = functions.get("DOUBLE").unwrap();
        assert_eq!(double(&[Value::Number(4.0)]).unwrap(), Value::Number(8.0));
        assert!(functions.get("fail").unwrap()(&[]).is_err());
        assert_eq!(functions.names(), vec!["Double", "fail"]);
        assert!(functions.remove("double"));
        assert_eq!(functions.len(), 1);
    }
}
