//! Field-level access rules and validation errors for partial payloads.
//!
//! Whether a field may be written depends on the state of the target
//! record ([`WriteMode`]), never on who is calling.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Whether a payload creates a record or updates an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    /// Accepted when the record is created, read-only afterwards
    WriteOnCreate,
    ReadOnly,
}

/// Static access table for the fields of one payload shape.
#[derive(Debug)]
pub struct FieldPolicy {
    fields: &'static [(&'static str, Access)],
}

impl FieldPolicy {
    pub const fn new(fields: &'static [(&'static str, Access)]) -> Self {
        Self { fields }
    }

    pub fn access(&self, field: &str) -> Option<Access> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, access)| *access)
    }

    /// Unknown fields are never writable.
    pub fn is_writable(&self, field: &str, mode: WriteMode) -> bool {
        match (self.access(field), mode) {
            (Some(Access::ReadWrite), _) => true,
            (Some(Access::WriteOnCreate), WriteMode::Create) => true,
            _ => false,
        }
    }
}

/// Validation messages keyed by field path (`user.full_name`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

/// Reads typed values out of a JSON object under a [`FieldPolicy`].
///
/// Absent, unknown and non-writable fields read as `None`; type errors are
/// collected instead of short-circuiting so that one response can report
/// every bad field.
pub struct FieldReader<'a> {
    payload: &'a Map<String, Value>,
    policy: &'a FieldPolicy,
    mode: WriteMode,
    prefix: Option<String>,
    errors: FieldErrors,
}

impl<'a> FieldReader<'a> {
    pub fn new(payload: &'a Map<String, Value>, policy: &'a FieldPolicy, mode: WriteMode) -> Self {
        Self {
            payload,
            policy,
            mode,
            prefix: None,
            errors: FieldErrors::new(),
        }
    }

    fn path(&self, field: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}.{}", prefix, field),
            None => field.to_string(),
        }
    }

    fn writable_value(&self, field: &str) -> Option<&'a Value> {
        if !self.policy.is_writable(field, self.mode) {
            return None;
        }
        self.payload.get(field)
    }

    /// Non-nullable field; an explicit `null` is an error.
    pub fn field<T: DeserializeOwned>(&mut self, field: &str) -> Option<T> {
        let value = self.writable_value(field)?;
        if value.is_null() {
            self.reject(field, "This field may not be null.");
            return None;
        }
        self.parse(field, value)
    }

    /// Nullable field: `Some(None)` means "clear it".
    pub fn nullable<T: DeserializeOwned>(&mut self, field: &str) -> Option<Option<T>> {
        let value = self.writable_value(field)?;
        if value.is_null() {
            return Some(None);
        }
        self.parse(field, value).map(Some)
    }

    /// Reader over a nested object field.
    pub fn nested(&mut self, field: &str, policy: &'a FieldPolicy) -> Option<FieldReader<'a>> {
        let value = self.writable_value(field)?;
        match value.as_object() {
            Some(object) => Some(FieldReader {
                payload: object,
                policy,
                mode: self.mode,
                prefix: Some(self.path(field)),
                errors: FieldErrors::new(),
            }),
            None => {
                self.reject(field, "Expected an object.");
                None
            }
        }
    }

    pub fn reject(&mut self, field: &str, message: impl Into<String>) {
        let path = self.path(field);
        self.errors.add(path, message);
    }

    /// Fold a nested reader's errors back into this one.
    pub fn absorb(&mut self, nested: FieldReader<'_>) {
        self.errors.merge(nested.errors);
    }

    pub fn finish(self) -> Result<(), FieldErrors> {
        self.errors.into_result()
    }

    fn parse<T: DeserializeOwned>(&mut self, field: &str, value: &Value) -> Option<T> {
        match serde_json::from_value::<T>(value.clone()) {
            Ok(parsed) => Some(parsed),
            // Form bodies carry every value as a string.
            Err(first) => match value.as_str().map(serde_json::from_str::<T>) {
                Some(Ok(parsed)) => Some(parsed),
                _ => {
                    self.reject(field, format!("Invalid value: {}.", first));
                    None
                }
            },
        }
    }
}
