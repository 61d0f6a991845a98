//! Capture records
//!
//! A capture is one timestamped, colored, selectable record of domain data:
//! one checkerboard detection, one correspondence sweep. Concrete payloads
//! live on the node that produces them; this module owns the shared base
//! state and the capability surface ([`Capture`]) that lets a
//! [`CaptureSet`](crate::capture::set::CaptureSet) store any payload type.
//!
//! A capture's identity (id, color, timestamp) never changes after
//! construction. Only the selection flag and, during deserialization, the
//! payload may mutate.

pub mod set;

use crate::document;
use crate::error::{CalibError, Result};
use chrono::{DateTime, Local, TimeZone, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CAPTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a capture within its owning set.
///
/// Ids are process-unique and never reused, so a stale id held across a
/// removal simply stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaptureId(u64);

impl CaptureId {
    fn next() -> Self {
        CaptureId(NEXT_CAPTURE_ID.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for CaptureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Capture#{}", self.0)
    }
}

/// Display color assigned to a capture for visual disambiguation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Base tone (200, 100, 100) rotated to a pseudo-random hue.
    pub fn random_hue() -> Self {
        let hue = rand::rng().random_range(0.0..360.0);
        Self::from_hue(hue)
    }

    /// Base tone rotated to the given hue angle in degrees.
    pub fn from_hue(hue_degrees: f64) -> Self {
        // The base tone has value 200/255 and saturation 0.5.
        hsv_to_rgb(hue_degrees, 0.5, 200.0 / 255.0)
    }

    fn to_document(self) -> Value {
        Value::Array(vec![self.r.into(), self.g.into(), self.b.into()])
    }

    fn from_document(doc: &Value, field: &str) -> Result<Self> {
        let rgb = document::require_f64_array(doc, field, 3)?;
        let channel = |v: f64| -> Result<u8> {
            if !(0.0..=255.0).contains(&v) {
                return Err(CalibError::malformed(field, "channel out of range"));
            }
            Ok(v as u8)
        };
        Ok(Rgb {
            r: channel(rgb[0])?,
            g: channel(rgb[1])?,
            b: channel(rgb[2])?,
        })
    }
}

fn hsv_to_rgb(hue_degrees: f64, saturation: f64, value: f64) -> Rgb {
    let h = hue_degrees.rem_euclid(360.0) / 60.0;
    let c = value * saturation;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    Rgb {
        r: ((r + m) * 255.0).round() as u8,
        g: ((g + m) * 255.0).round() as u8,
        b: ((b + m) * 255.0).round() as u8,
    }
}

/// Shared state of every capture record.
#[derive(Debug, Clone)]
pub struct CaptureBase {
    id: CaptureId,
    selected: bool,
    color: Rgb,
    timestamp: DateTime<Utc>,
    /// Derived display strings, rebuilt from the timestamp, never persisted.
    pub time_string: String,
    pub second_string: String,
    pub date_string: String,
}

impl CaptureBase {
    /// Fresh capture state: timestamp "now", random hue, deselected.
    pub fn new() -> Self {
        let mut base = Self {
            id: CaptureId::next(),
            selected: false,
            color: Rgb::random_hue(),
            timestamp: Utc::now(),
            time_string: String::new(),
            second_string: String::new(),
            date_string: String::new(),
        };
        base.rebuild_date_strings();
        base
    }

    pub fn id(&self) -> CaptureId {
        self.id
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Flip the raw selection flag. Event emission and sibling enforcement
    /// are the owning set's job; nothing outside this crate toggles the flag
    /// directly.
    pub(crate) fn set_selected_raw(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Write the base fields into a capture document.
    pub fn serialize_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("selected".into(), Value::Bool(self.selected));
        map.insert("color".into(), self.color.to_document());
        map.insert("timestamp".into(), self.timestamp.timestamp().into());
        map
    }

    /// Restore the base fields from a capture document.
    ///
    /// `selected` is required. A missing `color` falls back to the fresh
    /// random color assigned at construction; a missing `timestamp` keeps
    /// the construction-time "now". A field that is present but malformed
    /// is an error either way.
    pub fn deserialize_fields(&mut self, doc: &Value) -> Result<()> {
        self.selected = document::require_bool(doc, "selected")?;

        if document::optional(doc, "color").is_some() {
            self.color = Rgb::from_document(doc, "color")?;
        }

        if document::optional(doc, "timestamp").is_some() {
            let epoch = document::require_i64(doc, "timestamp")?;
            self.timestamp = Utc
                .timestamp_opt(epoch, 0)
                .single()
                .ok_or_else(|| CalibError::malformed("timestamp", "epoch out of range"))?;
        }

        self.rebuild_date_strings();
        Ok(())
    }

    /// Regenerate the human-readable display strings from the timestamp.
    pub fn rebuild_date_strings(&mut self) {
        let local = self.timestamp.with_timezone(&Local);
        self.time_string = local.format("%H:%M").to_string();
        self.second_string = local.format(":%S").to_string();
        self.date_string = local.format("%a %Y.%m.%d").to_string();
    }
}

impl Default for CaptureBase {
    fn default() -> Self {
        Self::new()
    }
}

/// Capability surface implemented by every concrete capture variant.
///
/// The capture set stores values of one concrete type but only ever relies
/// on this interface, so new payload shapes plug in without touching the
/// set.
pub trait Capture {
    /// Shared base state (selection flag, color, timestamp).
    fn base(&self) -> &CaptureBase;
    fn base_mut(&mut self) -> &mut CaptureBase;

    /// Construct a fresh, empty capture ready to be deserialized into.
    fn empty() -> Self
    where
        Self: Sized;

    /// Write the variant-specific payload fields into the capture document.
    fn serialize_payload(&self, doc: &mut Map<String, Value>);

    /// Restore the variant-specific payload fields. A missing required
    /// payload field is fatal for this capture.
    fn deserialize_payload(&mut self, doc: &Value) -> Result<()>;

    /// One-line payload summary for list displays.
    fn display_payload(&self) -> String {
        String::new()
    }

    /// Full capture document: base fields plus payload.
    fn serialize(&self) -> Value {
        let mut map = self.base().serialize_fields();
        self.serialize_payload(&mut map);
        Value::Object(map)
    }

    /// Restore base fields then payload, rebuilding derived display state.
    fn deserialize(&mut self, doc: &Value) -> Result<()> {
        self.base_mut().deserialize_fields(doc)?;
        self.deserialize_payload(doc)
    }

    fn id(&self) -> CaptureId {
        self.base().id()
    }

    fn is_selected(&self) -> bool {
        self.base().is_selected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_capture_ids_unique() {
        let a = CaptureBase::new();
        let b = CaptureBase::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_base_round_trip() {
        let mut base = CaptureBase::new();
        base.set_selected_raw(true);
        let doc = Value::Object(base.serialize_fields());

        let mut restored = CaptureBase::new();
        restored.deserialize_fields(&doc).unwrap();
        assert!(restored.is_selected());
        assert_eq!(restored.color(), base.color());
        assert_eq!(restored.timestamp().timestamp(), base.timestamp().timestamp());
    }

    #[test]
    fn test_missing_color_keeps_fresh_random() {
        let mut base = CaptureBase::new();
        base.deserialize_fields(&json!({ "selected": false, "timestamp": 1_700_000_000 }))
            .unwrap();
        assert_eq!(base.timestamp().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_malformed_timestamp_is_error() {
        let mut base = CaptureBase::new();
        let err = base
            .deserialize_fields(&json!({ "selected": false, "timestamp": "yesterday" }))
            .unwrap_err();
        assert!(err.to_string().contains("timestamp"));
    }

    #[test]
    fn test_missing_selected_is_error() {
        let mut base = CaptureBase::new();
        assert!(base.deserialize_fields(&json!({})).is_err());
    }

    #[test]
    fn test_date_strings_rebuilt() {
        let mut base = CaptureBase::new();
        base.deserialize_fields(&json!({ "selected": false, "timestamp": 0 }))
            .unwrap();
        // 1970-01-01 in every timezone's vicinity; format shape is what matters.
        assert_eq!(base.time_string.len(), 5);
        assert!(base.second_string.starts_with(':'));
        assert!(base.date_string.contains("1970") || base.date_string.contains("1969"));
    }

    #[test]
    fn test_hue_rotation_shape() {
        let red = Rgb::from_hue(0.0);
        assert!(red.r > red.g && red.r > red.b);
        let green = Rgb::from_hue(120.0);
        assert!(green.g > green.r && green.g > green.b);
    }
}
