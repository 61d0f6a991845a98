//! Checkerboard item node
//!
//! The calibration pattern: inner-corner counts and physical spacing. The
//! corner grid used for previews is derived state, regenerated whenever a
//! parameter changes or the node is deserialized, never persisted.

use crate::capture::set::RestoreCounts;
use crate::document::Serializable;
use crate::error::Result;
use crate::graph::node::Node;
use crate::graph::params::{restore_param, Param};
use nalgebra::Point3;
use serde_json::{Map, Value};
use std::any::Any;

pub const TYPE_NAME: &str = "Checkerboard";

pub struct Checkerboard {
    size_x: Param<u32>,
    size_y: Param<u32>,
    spacing: Param<f64>,
    preview_corners: Vec<Point3<f64>>,
}

impl Checkerboard {
    pub fn new() -> Self {
        let mut board = Self {
            size_x: Param::with_range("size_x", 9, 2, 20),
            size_y: Param::with_range("size_y", 5, 2, 20),
            spacing: Param::with_range("spacing", 0.025, 0.001, 1.0),
            preview_corners: Vec::new(),
        };
        board.update_preview();
        board
    }

    /// Inner corner counts (x, y).
    pub fn size(&self) -> (u32, u32) {
        (self.size_x.get(), self.size_y.get())
    }

    pub fn spacing(&self) -> f64 {
        self.spacing.get()
    }

    pub fn set_size(&mut self, size_x: u32, size_y: u32) {
        self.size_x.set(size_x);
        self.size_y.set(size_y);
        self.update_preview();
    }

    pub fn set_spacing(&mut self, spacing: f64) {
        self.spacing.set(spacing);
        self.update_preview();
    }

    /// Object-space corner positions, row-major, z = 0.
    pub fn object_points(&self) -> Vec<Point3<f64>> {
        let (sx, sy) = self.size();
        let spacing = self.spacing();
        let mut points = Vec::with_capacity((sx * sy) as usize);
        for y in 0..sy {
            for x in 0..sx {
                points.push(Point3::new(x as f64 * spacing, y as f64 * spacing, 0.0));
            }
        }
        points
    }

    /// Derived preview grid.
    pub fn preview_corners(&self) -> &[Point3<f64>] {
        &self.preview_corners
    }

    fn update_preview(&mut self) {
        self.preview_corners = self.object_points();
    }
}

impl Default for Checkerboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for Checkerboard {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn serialize(&self) -> Value {
        let mut doc = Map::new();
        doc.insert(self.size_x.name().to_string(), self.size_x.serialize());
        doc.insert(self.size_y.name().to_string(), self.size_y.serialize());
        doc.insert(self.spacing.name().to_string(), self.spacing.serialize());
        Value::Object(doc)
    }

    fn deserialize(&mut self, doc: &Value) -> Result<RestoreCounts> {
        restore_param(&mut self.size_x, doc)?;
        restore_param(&mut self.size_y, doc)?;
        restore_param(&mut self.spacing, doc)?;
        self.update_preview();
        Ok(RestoreCounts::default())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
