//! Build variables consumed by flag templates.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The value of a build variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    String(String),
    Integer(i64),
    List(Vec<String>),
}

impl VariableValue {
    /// Truthiness used by `expand_if_true` / `expand_if_false`.
    pub fn is_truthy(&self) -> bool {
        match self {
            VariableValue::String(s) => !s.is_empty(),
            VariableValue::Integer(i) => *i != 0,
            VariableValue::List(items) => !items.is_empty(),
        }
    }

    /// The scalar form of this value, if it has one.
    pub fn as_scalar(&self) -> Option<String> {
        match self {
            VariableValue::String(s) => Some(s.clone()),
            VariableValue::Integer(i) => Some(i.to_string()),
            VariableValue::List(_) => None,
        }
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableValue::String(s) => f.write_str(s),
            VariableValue::Integer(i) => write!(f, "{}", i),
            VariableValue::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

/// Mapping from variable name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildVariables {
    values: BTreeMap<String, VariableValue>,
}

impl BuildVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: VariableValue) {
        self.values.insert(name.into(), value);
    }

    pub fn insert_string(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.insert(name, VariableValue::String(value.into()));
    }

    pub fn insert_integer(&mut self, name: impl Into<String>, value: i64) {
        self.insert(name, VariableValue::Integer(value));
    }

    pub fn insert_list(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.insert(name, VariableValue::List(values));
    }

    pub fn get(&self, name: &str) -> Option<&VariableValue> {
        self.values.get(name)
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(VariableValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VariableValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
