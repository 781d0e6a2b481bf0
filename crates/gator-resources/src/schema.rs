//! Strict schema checks over untyped YAML nodes
//!
//! Documents are decoded into a generic tree first and their key sets
//! verified against the expected fields before any typed value is built, so
//! every offending field is reported at once.

use gator_core::{Error, Result};
use serde_yaml::{Mapping, Value};

/// The exact key set an object may carry.
#[derive(Clone, Copy, Debug)]
pub struct FieldSet {
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

impl FieldSet {
    pub const fn new(required: &'static [&'static str], optional: &'static [&'static str]) -> Self {
        Self { required, optional }
    }

    fn allows(&self, key: &str) -> bool {
        self.required.contains(&key) || self.optional.contains(&key)
    }

    /// Verify `map` has no unknown keys, no non-string keys, and every required key.
    pub fn check(&self, map: &Mapping, context: &str) -> Result<()> {
        let mut unknown = Vec::new();
        for key in map.keys() {
            match key.as_str() {
                Some(k) if self.allows(k) => {}
                Some(k) => unknown.push(k.to_string()),
                None => unknown.push(format!("{:?}", key)),
            }
        }

        let missing: Vec<&str> = self
            .required
            .iter()
            .copied()
            .filter(|k| !map.contains_key(*k))
            .collect();

        if unknown.is_empty() && missing.is_empty() {
            return Ok(());
        }

        let mut problems = Vec::new();
        if !unknown.is_empty() {
            problems.push(format!("unknown field(s): {}", unknown.join(", ")));
        }
        if !missing.is_empty() {
            problems.push(format!("missing field(s): {}", missing.join(", ")));
        }
        Err(Error::invalid_specification(format!(
            "{}: {}",
            context,
            problems.join("; ")
        )))
    }
}

pub fn expect_mapping<'a>(value: &'a Value, context: &str) -> Result<&'a Mapping> {
    value.as_mapping().ok_or_else(|| {
        Error::invalid_specification(format!("{}: expected a mapping, got {}", context, type_name(value)))
    })
}

/// A required string field. Absent, null or non-string values are errors.
pub fn required_string(map: &Mapping, key: &str, context: &str) -> Result<String> {
    optional_string(map, key, context)?
        .ok_or_else(|| Error::invalid_specification(format!("{}: field '{}' is required", context, key)))
}

/// An optional string field; explicit `null` counts as absent.
pub fn optional_string(map: &Mapping, key: &str, context: &str) -> Result<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(Error::invalid_specification(format!(
            "{}: field '{}' must be a string, got {}",
            context,
            key,
            type_name(other)
        ))),
    }
}

/// An optional sequence field; explicit `null` counts as absent.
pub fn optional_sequence<'a>(map: &'a Mapping, key: &str, context: &str) -> Result<Option<&'a [Value]>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Sequence(items)) => Ok(Some(items.as_slice())),
        Some(other) => Err(Error::invalid_specification(format!(
            "{}: field '{}' must be a list, got {}",
            context,
            key,
            type_name(other)
        ))),
    }
}

pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
