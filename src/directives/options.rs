//! Options accepted when creating directive markers.

use crate::utils::errors::{value_error, AccResult, ValueErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single region option value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Int(n) => write!(f, "{}", n),
            OptionValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Str(value)
    }
}

/// Clause hints handed to the tree owner with a new region marker.
///
/// Keys are not interpreted here; recognising them is the tree owner's job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionOptions {
    entries: BTreeMap<String, OptionValue>,
}

impl RegionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an option.
    pub fn with(mut self, key: &str, value: impl Into<OptionValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<OptionValue>) {
        self.entries.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Display for RegionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{}({})", k, v)).collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Clauses to pre-set on a new loop marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopMarkerOptions {
    pub sequential: bool,
    pub gang: bool,
    pub vector: bool,
    /// Skip the dependency oracle when marking
    pub force: bool,
}

impl LoopMarkerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sequential(mut self) -> Self {
        self.sequential = true;
        self
    }

    pub fn gang(mut self) -> Self {
        self.gang = true;
        self
    }

    pub fn vector(mut self) -> Self {
        self.vector = true;
        self
    }

    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    /// Reject `sequential` combined with `gang` or `vector`.
    pub fn validate(&self) -> AccResult<()> {
        if self.sequential && self.gang {
            return value_error(ValueErrorKind::ClauseConflict, "Cannot apply seq to a loop with a gang clause.");
        }
        if self.sequential && self.vector {
            return value_error(
                ValueErrorKind::ClauseConflict,
                "Cannot apply seq to a loop with a vector clause.",
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_options_display() {
        let options = RegionOptions::new().with("default_present", true).with("async", 2);
        assert_eq!(options.len(), 2);
        assert_eq!(options.get("async"), Some(&OptionValue::Int(2)));
        assert_eq!(options.to_string(), "async(2) default_present(true)");
    }

    #[test]
    fn test_loop_marker_options_validate() {
        assert!(LoopMarkerOptions::new().gang().vector().validate().is_ok());
        let err = LoopMarkerOptions::new().sequential().vector().validate().unwrap_err();
        assert_eq!(err.value_kind(), Some(ValueErrorKind::ClauseConflict));
        assert_eq!(err.to_string(), "Value error: Cannot apply seq to a loop with a vector clause.");
    }
}
