//! Camera item node
//!
//! A posed camera with pinhole intrinsics. Frames come from an external
//! acquisition collaborator; procedure nodes consume its detections, solve,
//! and write the resulting model back here.

use crate::capture::set::RestoreCounts;
use crate::document;
use crate::error::{CalibError, Result};
use crate::graph::node::Node;
use crate::nodes::rigid_body::RigidBodyPose;
use crate::solve::CameraModel;
use nalgebra::Isometry3;
use serde_json::{Map, Value};
use std::any::Any;

pub const TYPE_NAME: &str = "Camera";

pub struct Camera {
    pose: RigidBodyPose,
    model: CameraModel,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            pose: RigidBodyPose::new(),
            model: CameraModel::default(),
        }
    }

    pub fn model(&self) -> &CameraModel {
        &self.model
    }

    /// Install a solved intrinsics model.
    pub fn set_intrinsics(&mut self, model: CameraModel) {
        self.model = model;
    }

    pub fn image_size(&self) -> (f64, f64) {
        (self.model.image_width, self.model.image_height)
    }

    pub fn pose(&self) -> &RigidBodyPose {
        &self.pose
    }

    pub fn pose_mut(&mut self) -> &mut RigidBodyPose {
        &mut self.pose
    }

    pub fn transform(&self) -> Isometry3<f64> {
        self.pose.transform()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for Camera {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn serialize(&self) -> Value {
        let mut doc = Map::new();
        self.pose.serialize_into(&mut doc);
        doc.insert(
            "model".into(),
            serde_json::to_value(&self.model).unwrap_or(Value::Null),
        );
        Value::Object(doc)
    }

    fn deserialize(&mut self, doc: &Value) -> Result<RestoreCounts> {
        self.pose.deserialize_from(doc)?;
        if let Some(model) = document::optional(doc, "model") {
            self.model = serde_json::from_value(model.clone())
                .map_err(|e| CalibError::malformed("model", e.to_string()))?;
        }
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
    fn test_camera_round_trip() {
        let mut camera = Camera::new();
        camera.set_intrinsics(CameraModel::with_image_size(1280.0, 720.0));
        camera
            .pose_mut()
            .set_transform(&Isometry3::translation(0.0, 1.5, -2.0));

        let doc = Node::serialize(&camera);
        let mut restored = Camera::new();
        restored.deserialize(&doc).unwrap();

        assert_relative_eq!(restored.model().fx, 1280.0);
        assert_relative_eq!(
            restored.transform().translation.vector.y,
            1.5,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_camera_rejects_malformed_model() {
        let mut camera = Camera::new();
        let doc = serde_json::json!({ "model": "broken" });
        assert!(camera.deserialize(&doc).is_err());
    }
}
