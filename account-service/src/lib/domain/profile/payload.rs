//! Reconstruction of nested objects from flattened form keys.
//!
//! Multipart and urlencoded clients send nested fields as `user[full_name]`
//! (or `user.full_name`). They are folded back into `{"user": {"full_name": ..}}`
//! before any validation runs.

use serde_json::Map;
use serde_json::Value;

use crate::domain::fields::FieldErrors;

/// Outcome of reconstructing a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstructed {
    pub payload: Map<String, Value>,
    /// Keys that could not be parsed or conflicted with another key
    pub rejected: Vec<String>,
}

impl Reconstructed {
    /// Field errors for the rejected keys, used in strict mode.
    pub fn rejection_errors(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for key in &self.rejected {
            errors.add(key.clone(), "Unrecognised nested field key.");
        }
        errors
    }
}

/// Fold flattened keys into nested objects.
///
/// Plain keys are copied first so that a flattened key can extend an object
/// sent in nested form. A flattened key is rejected when it is malformed or
/// when its path runs into a non-object value or an existing leaf.
pub fn reconstruct(raw: Map<String, Value>) -> Reconstructed {
    let mut payload = Map::new();
    let mut flattened = Vec::new();
    let mut rejected = Vec::new();

    for (key, value) in raw {
        if is_plain(&key) {
            payload.insert(key, value);
        } else {
            flattened.push((key, value));
        }
    }

    for (key, value) in flattened {
        let inserted = match parse_path(&key) {
            Some(path) => insert_path(&mut payload, &path, value),
            None => false,
        };
        if !inserted {
            rejected.push(key);
        }
    }

    Reconstructed { payload, rejected }
}

fn is_plain(key: &str) -> bool {
    !key.contains(&['[', ']', '.'][..])
}

fn is_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `a[b][c]` and `a.b.c` both parse to `[a, b, c]`; mixed forms do not parse.
fn parse_path(key: &str) -> Option<Vec<&str>> {
    if let Some(open) = key.find('[') {
        let (head, mut rest) = key.split_at(open);
        if head.contains('.') || !is_segment(head) {
            return None;
        }

        let mut path = vec![head];
        while !rest.is_empty() {
            let inner = rest.strip_prefix('[')?;
            let close = inner.find(']')?;
            let segment = &inner[..close];
            if !is_segment(segment) {
                return None;
            }
            path.push(segment);
            rest = &inner[close + 1..];
        }
        return Some(path);
    }

    if key.contains(']') {
        return None;
    }

    let path: Vec<&str> = key.split('.').collect();
    if path.len() < 2 || !path.iter().all(|segment| is_segment(segment)) {
        return None;
    }
    Some(path)
}

fn insert_path(target: &mut Map<String, Value>, path: &[&str], value: Value) -> bool {
    let Some((leaf, parents)) = path.split_last() else {
        return false;
    };

    let mut current = target;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        match entry.as_object_mut() {
            Some(object) => current = object,
            None => return false,
        }
    }

    if current.contains_key(*leaf) {
        return false;
    }
    current.insert(leaf.to_string(), value);
    true
}
