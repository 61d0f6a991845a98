//! Summary node
//!
//! Holds the shared 3D view state that belongs to the scene rather than to
//! any one item: the viewport camera pose and the room grid parameters.
//! The viewport pose is persisted under a `"camera"` sub-document; when a
//! stored world has none, the pose defaults to looking across the room
//! from the minimum bound.

use crate::capture::set::RestoreCounts;
use crate::document::{self, Serializable};
use crate::error::Result;
use crate::graph::node::Node;
use crate::graph::params::{restore_param, Param};
use crate::nodes::{pose_from_document, pose_to_document};
use nalgebra::{Isometry3, Point3, Vector3};
use serde_json::{Map, Value};
use std::any::Any;

pub const TYPE_NAME: &str = "Summary";

pub struct Summary {
    grid_enabled: Param<bool>,
    grid_dark: Param<bool>,
    room_minimum: Param<[f64; 3]>,
    room_maximum: Param<[f64; 3]>,
    view_pose: Isometry3<f64>,
}

impl Summary {
    pub fn new() -> Self {
        let room_minimum = Param::new("room_minimum", [-3.0, -2.0, -4.0]);
        let room_maximum = Param::new("room_maximum", [3.0, 2.0, 4.0]);
        let view_pose = Self::default_view_pose(room_minimum.get(), room_maximum.get());
        Self {
            grid_enabled: Param::new("grid_enabled", true),
            grid_dark: Param::new("grid_dark", false),
            room_minimum,
            room_maximum,
            view_pose,
        }
    }

    pub fn grid_enabled(&self) -> bool {
        self.grid_enabled.get()
    }

    pub fn room_bounds(&self) -> ([f64; 3], [f64; 3]) {
        (self.room_minimum.get(), self.room_maximum.get())
    }

    pub fn view_pose(&self) -> &Isometry3<f64> {
        &self.view_pose
    }

    pub fn set_view_pose(&mut self, pose: Isometry3<f64>) {
        self.view_pose = pose;
    }

    /// Look across the room from the minimum bound's wall.
    fn default_view_pose(min: [f64; 3], max: [f64; 3]) -> Isometry3<f64> {
        let eye = Point3::new(0.0, min[1], min[2]);
        let target = Point3::new(0.0, max[1], max[2]);
        Isometry3::face_towards(&eye, &target, &Vector3::new(0.0, -1.0, 0.0))
    }

    fn bool_params_mut(&mut self) -> [&mut Param<bool>; 2] {
        [&mut self.grid_enabled, &mut self.grid_dark]
    }
}

impl Default for Summary {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for Summary {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn serialize(&self) -> Value {
        let mut doc = Map::new();
        doc.insert(
            self.grid_enabled.name().to_string(),
            self.grid_enabled.serialize(),
        );
        doc.insert(self.grid_dark.name().to_string(), self.grid_dark.serialize());
        doc.insert(
            self.room_minimum.name().to_string(),
            self.room_minimum.serialize(),
        );
        doc.insert(
            self.room_maximum.name().to_string(),
            self.room_maximum.serialize(),
        );
        doc.insert("camera".into(), pose_to_document(&self.view_pose));
        Value::Object(doc)
    }

    fn deserialize(&mut self, doc: &Value) -> Result<RestoreCounts> {
        for param in self.bool_params_mut() {
            restore_param(param, doc)?;
        }
        restore_param(&mut self.room_minimum, doc)?;
        restore_param(&mut self.room_maximum, doc)?;

        self.view_pose = match document::optional(doc, "camera") {
            Some(camera) => pose_from_document(camera)?,
            None => Self::default_view_pose(self.room_minimum.get(), self.room_maximum.get()),
        };
        Ok(RestoreCounts::default())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_view_pose_round_trip() {
        let mut summary = Summary::new();
        summary.set_view_pose(Isometry3::translation(1.0, 2.0, 3.0));
        let doc = Node::serialize(&summary);

        let mut restored = Summary::new();
        restored.deserialize(&doc).unwrap();
        assert_relative_eq!(
            restored.view_pose().translation.vector,
            summary.view_pose().translation.vector,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_missing_camera_defaults_from_room() {
        let mut summary = Summary::new();
        let doc = serde_json::json!({
            "grid_enabled": false,
            "room_minimum": [-1.0, -1.0, -1.0],
            "room_maximum": [1.0, 1.0, 1.0]
        });
        summary.deserialize(&doc).unwrap();
        assert!(!summary.grid_enabled());
        assert_relative_eq!(summary.view_pose().translation.vector.z, -1.0, epsilon = 1e-12);
    }
}
