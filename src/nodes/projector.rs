//! Projector item node
//!
//! A posed projector described by resolution, throw ratio, pixel aspect and
//! lens offset. The equivalent pinhole matrix is derived from those
//! parameters on demand and can be written back from a solved matrix, which
//! recomputes the throw model.

use crate::capture::set::RestoreCounts;
use crate::document::Serializable;
use crate::error::Result;
use crate::graph::node::Node;
use crate::graph::params::{restore_param, Param};
use crate::nodes::rigid_body::RigidBodyPose;
use nalgebra::{Isometry3, Matrix3};
use serde_json::{Map, Value};
use std::any::Any;

pub const TYPE_NAME: &str = "Projector";

pub struct Projector {
    pose: RigidBodyPose,
    resolution_width: Param<f64>,
    resolution_height: Param<f64>,
    throw_ratio_x: Param<f64>,
    pixel_aspect_ratio: Param<f64>,
    lens_offset_x: Param<f64>,
    lens_offset_y: Param<f64>,
}

impl Projector {
    pub fn new() -> Self {
        Self {
            pose: RigidBodyPose::new(),
            resolution_width: Param::new("resolution_width", 1920.0),
            resolution_height: Param::new("resolution_height", 1080.0),
            throw_ratio_x: Param::new("throw_ratio_x", 1.4),
            pixel_aspect_ratio: Param::new("pixel_aspect_ratio", 1.0),
            lens_offset_x: Param::new("lens_offset_x", 0.0),
            lens_offset_y: Param::new("lens_offset_y", 0.5),
        }
    }

    pub fn width(&self) -> f64 {
        self.resolution_width.get()
    }

    pub fn height(&self) -> f64 {
        self.resolution_height.get()
    }

    pub fn set_resolution(&mut self, width: f64, height: f64) {
        self.resolution_width.set(width);
        self.resolution_height.set(height);
    }

    pub fn resolution_aspect_ratio(&self) -> f64 {
        self.width() / self.height()
    }

    pub fn throw_ratio_x(&self) -> f64 {
        self.throw_ratio_x.get()
    }

    pub fn throw_ratio_y(&self) -> f64 {
        self.throw_ratio_x.get() / self.pixel_aspect_ratio.get()
    }

    /// Equivalent pinhole matrix for the current throw model.
    pub fn camera_matrix(&self) -> Matrix3<f64> {
        let (w, h) = (self.width(), self.height());
        let fx = self.throw_ratio_x() * w;
        let fy = self.throw_ratio_y() * h;
        let cx = (0.5 - self.lens_offset_x.get()) * w;
        let cy = (0.5 + self.lens_offset_y.get()) * h;
        Matrix3::new(fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0)
    }

    /// Recompute the throw model from a solved pinhole matrix.
    pub fn set_intrinsics(&mut self, camera_matrix: &Matrix3<f64>) {
        let (w, h) = (self.width(), self.height());
        let throw_x = camera_matrix[(0, 0)] / w;
        let throw_y = camera_matrix[(1, 1)] / h;
        self.throw_ratio_x.set(throw_x);
        self.pixel_aspect_ratio.set(throw_x / throw_y);
        self.lens_offset_x.set(0.5 - camera_matrix[(0, 2)] / w);
        self.lens_offset_y.set(camera_matrix[(1, 2)] / h - 0.5);
    }

    pub fn set_extrinsics(&mut self, pose: &Isometry3<f64>) {
        self.pose.set_transform(pose);
    }

    pub fn pose(&self) -> &RigidBodyPose {
        &self.pose
    }

    pub fn transform(&self) -> Isometry3<f64> {
        self.pose.transform()
    }

    fn params(&self) -> [&Param<f64>; 6] {
        [
            &self.resolution_width,
            &self.resolution_height,
            &self.throw_ratio_x,
            &self.pixel_aspect_ratio,
            &self.lens_offset_x,
            &self.lens_offset_y,
        ]
    }

    fn params_mut(&mut self) -> [&mut Param<f64>; 6] {
        [
            &mut self.resolution_width,
            &mut self.resolution_height,
            &mut self.throw_ratio_x,
            &mut self.pixel_aspect_ratio,
            &mut self.lens_offset_x,
            &mut self.lens_offset_y,
        ]
    }
}

impl Default for Projector {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for Projector {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn serialize(&self) -> Value {
        let mut doc = Map::new();
        self.pose.serialize_into(&mut doc);
        for param in self.params() {
            doc.insert(param.name().to_string(), param.serialize());
        }
        Value::Object(doc)
    }

    fn deserialize(&mut self, doc: &Value) -> Result<RestoreCounts> {
        self.pose.deserialize_from(doc)?;
        for param in self.params_mut() {
            restore_param(param, doc)?;
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
    fn test_camera_matrix_round_trip() {
        let mut projector = Projector::new();
        let matrix = projector.camera_matrix();
        projector.set_intrinsics(&matrix);
        let back = projector.camera_matrix();
        assert_relative_eq!(matrix, back, epsilon = 1e-9);
    }

    #[test]
    fn test_throw_ratio_y_follows_pixel_aspect() {
        let projector = Projector::new();
        assert_relative_eq!(
            projector.throw_ratio_y(),
            projector.throw_ratio_x(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut projector = Projector::new();
        projector.set_resolution(3840.0, 2160.0);
        projector.set_extrinsics(&Isometry3::translation(2.0, 3.0, 0.0));

        let doc = Node::serialize(&projector);
        let mut restored = Projector::new();
        restored.deserialize(&doc).unwrap();

        assert_relative_eq!(restored.width(), 3840.0);
        assert_relative_eq!(
            restored.transform().translation.vector.x,
            2.0,
            epsilon = 1e-12
        );
    }
}
