//! Typed node parameters
//!
//! A [`Param`] is one named, primitive configuration value with an optional
//! declared range. Nodes serialize each parameter under its name, so the
//! stored document stays human-inspectable.

use crate::document::{self, Serializable};
use crate::error::{CalibError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A named configuration value with an optional inclusive range.
#[derive(Debug, Clone)]
pub struct Param<T> {
    name: &'static str,
    value: T,
    min: Option<T>,
    max: Option<T>,
}

impl<T: Clone + PartialOrd> Param<T> {
    pub fn new(name: &'static str, value: T) -> Self {
        Self {
            name,
            value,
            min: None,
            max: None,
        }
    }

    pub fn with_range(name: &'static str, value: T, min: T, max: T) -> Self {
        Self {
            name,
            value,
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self) -> T {
        self.value.clone()
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Set the value, clamped into the declared range.
    pub fn set(&mut self, value: T) {
        let mut value = value;
        if let Some(min) = &self.min {
            if value < *min {
                value = min.clone();
            }
        }
        if let Some(max) = &self.max {
            if *max < value {
                value = max.clone();
            }
        }
        self.value = value;
    }
}

impl<T> Serializable for Param<T>
where
    T: Clone + PartialOrd + Serialize + DeserializeOwned,
{
    fn serialize(&self) -> Value {
        serde_json::to_value(&self.value).unwrap_or(Value::Null)
    }

    fn deserialize(&mut self, doc: &Value) -> Result<()> {
        let value: T = serde_json::from_value(doc.clone())
            .map_err(|e| CalibError::malformed(self.name, e.to_string()))?;
        self.set(value);
        Ok(())
    }
}

/// Restore a parameter from its field in a node document, tolerating
/// absence (the parameter keeps its current value).
pub fn restore_param<T>(params: &mut Param<T>, doc: &Value) -> Result<()>
where
    T: Clone + PartialOrd + Serialize + DeserializeOwned,
{
    if let Some(field) = document::optional(doc, params.name()) {
        params.deserialize(field)?;
    }
    Ok(())
}
