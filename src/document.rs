//! Document model for persistence
//!
//! Everything that survives a session is written into a JSON document tree
//! (nested maps, ordered arrays, scalar leaves). The [`Serializable`] trait
//! gives captures, parameters and capture sets a uniform contract against
//! that tree; the accessor helpers turn shape mismatches into
//! [`CalibError::MalformedDocument`] errors that carry the offending field
//! path, so a world load can skip one broken entity and keep going.

use crate::error::{CalibError, Result};
use serde_json::Value;

/// Uniform serialize/deserialize contract against a JSON document.
pub trait Serializable {
    /// Write this entity into a fresh document value.
    fn serialize(&self) -> Value;

    /// Restore this entity from a document value.
    ///
    /// Implementations must regenerate derived presentation state (date
    /// strings, preview meshes) from the restored fields rather than
    /// persisting it.
    fn deserialize(&mut self, doc: &Value) -> Result<()>;
}

/// Fetch a required field from an object document.
pub fn require<'a>(doc: &'a Value, field: &str) -> Result<&'a Value> {
    doc.get(field)
        .ok_or_else(|| CalibError::malformed(field, "required field is missing"))
}

/// Required boolean field.
pub fn require_bool(doc: &Value, field: &str) -> Result<bool> {
    require(doc, field)?
        .as_bool()
        .ok_or_else(|| CalibError::malformed(field, "expected a boolean"))
}

/// Required integer field.
pub fn require_i64(doc: &Value, field: &str) -> Result<i64> {
    require(doc, field)?
        .as_i64()
        .ok_or_else(|| CalibError::malformed(field, "expected an integer"))
}

/// Required float field (accepts integers).
pub fn require_f64(doc: &Value, field: &str) -> Result<f64> {
    require(doc, field)?
        .as_f64()
        .ok_or_else(|| CalibError::malformed(field, "expected a number"))
}

/// Required string field.
pub fn require_str<'a>(doc: &'a Value, field: &str) -> Result<&'a str> {
    require(doc, field)?
        .as_str()
        .ok_or_else(|| CalibError::malformed(field, "expected a string"))
}

/// Required array field.
pub fn require_array<'a>(doc: &'a Value, field: &str) -> Result<&'a Vec<Value>> {
    require(doc, field)?
        .as_array()
        .ok_or_else(|| CalibError::malformed(field, "expected an array"))
}

/// Required fixed-length array of numbers (colors, vectors).
pub fn require_f64_array(doc: &Value, field: &str, len: usize) -> Result<Vec<f64>> {
    let array = require_array(doc, field)?;
    if array.len() != len {
        return Err(CalibError::malformed(
            field,
            format!("expected an array of {} numbers, got {}", len, array.len()),
        ));
    }
    array
        .iter()
        .map(|v| {
            v.as_f64()
                .ok_or_else(|| CalibError::malformed(field, "expected a number element"))
        })
        .collect()
}

/// Optional field; `None` when absent or null.
pub fn optional<'a>(doc: &'a Value, field: &str) -> Option<&'a Value> {
    doc.get(field).filter(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_require_present() {
        let doc = json!({ "selected": true, "count": 3 });
        assert!(require_bool(&doc, "selected").unwrap());
        assert_eq!(require_i64(&doc, "count").unwrap(), 3);
    }

    #[test]
    fn test_require_missing_reports_path() {
        let doc = json!({});
        let err = require_bool(&doc, "selected").unwrap_err();
        assert!(err.to_string().contains("selected"));
    }

    #[test]
    fn test_require_wrong_shape() {
        let doc = json!({ "timestamp": "not-a-number" });
        assert!(require_i64(&doc, "timestamp").is_err());
    }

    #[test]
    fn test_require_f64_array_length() {
        let doc = json!({ "color": [200, 100] });
        assert!(require_f64_array(&doc, "color", 3).is_err());
        let doc = json!({ "color": [200, 100, 100] });
        assert_eq!(require_f64_array(&doc, "color", 3).unwrap().len(), 3);
    }

    #[test]
    fn test_optional_null_is_absent() {
        let doc = json!({ "maybe": null });
        assert!(optional(&doc, "maybe").is_none());
        assert!(optional(&doc, "missing").is_none());
    }
}
