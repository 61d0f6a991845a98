//! Test data builders for creating test objects

use calibrig::capture::{Capture, CaptureBase};
use calibrig::document;
use calibrig::error::Result;
use calibrig::graph::{NodeId, NodeRegistry, World};
use calibrig::nodes::{
    self, BoardDetection, Camera, CameraIntrinsics, Checkerboard, Projector, ProjectorExtrinsics,
    Summary,
};
use nalgebra::{Point2, Point3};
use serde_json::{Map, Value};

/// Minimal capture carrying a single label, for exercising set semantics
/// without dragging calibration payloads in.
pub struct NoteCapture {
    base: CaptureBase,
    pub note: String,
}

impl NoteCapture {
    pub fn new(note: &str) -> Self {
        Self {
            base: CaptureBase::new(),
            note: note.to_string(),
        }
    }
}

impl Capture for NoteCapture {
    fn base(&self) -> &CaptureBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut CaptureBase {
        &mut self.base
    }

    fn empty() -> Self {
        Self::new("")
    }

    fn serialize_payload(&self, doc: &mut Map<String, Value>) {
        doc.insert("note".into(), self.note.clone().into());
    }

    fn deserialize_payload(&mut self, doc: &Value) -> Result<()> {
        self.note = document::require_str(doc, "note")?.to_string();
        Ok(())
    }

    fn display_payload(&self) -> String {
        self.note.clone()
    }
}

/// Builder for synthetic board detections
pub struct DetectionBuilder {
    corners: usize,
    offset: f64,
    image_width: f64,
    image_height: f64,
}

impl DetectionBuilder {
    pub fn new() -> Self {
        Self {
            corners: 4,
            offset: 0.0,
            image_width: 1920.0,
            image_height: 1080.0,
        }
    }

    pub fn corners(mut self, corners: usize) -> Self {
        self.corners = corners;
        self
    }

    pub fn offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    pub fn image_size(mut self, width: f64, height: f64) -> Self {
        self.image_width = width;
        self.image_height = height;
        self
    }

    pub fn build(self) -> BoardDetection {
        let image_points = (0..self.corners)
            .map(|i| Point2::new(100.0 + self.offset + 50.0 * i as f64, 200.0 + self.offset))
            .collect();
        let object_points = (0..self.corners)
            .map(|i| Point3::new(0.025 * i as f64, 0.0, 0.0))
            .collect();
        BoardDetection {
            image_points,
            object_points,
            image_width: self.image_width,
            image_height: self.image_height,
        }
    }
}

impl Default for DetectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Node ids of the standard test rig
pub struct RigIds {
    pub camera: NodeId,
    pub projector: NodeId,
    pub board: NodeId,
    pub intrinsics: NodeId,
    pub extrinsics: NodeId,
    pub summary: NodeId,
}

/// Registry with all built-in node types
pub fn builtin_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    nodes::register_builtins(&mut registry);
    registry
}

/// Fully wired camera/projector rig
pub fn rig_world() -> (World, RigIds) {
    let mut world = World::new();
    let ids = RigIds {
        camera: world.add(Box::new(Camera::new())),
        projector: world.add(Box::new(Projector::new())),
        board: world.add(Box::new(Checkerboard::new())),
        intrinsics: world.add(Box::new(CameraIntrinsics::new())),
        extrinsics: world.add(Box::new(ProjectorExtrinsics::new())),
        summary: world.add(Box::new(Summary::new())),
    };
    world.connect(ids.intrinsics, ids.camera).unwrap();
    world.connect(ids.intrinsics, ids.board).unwrap();
    world.connect(ids.extrinsics, ids.camera).unwrap();
    world.connect(ids.extrinsics, ids.projector).unwrap();
    world.connect(ids.extrinsics, ids.board).unwrap();
    (world, ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_builder() {
        let detection = DetectionBuilder::new().corners(6).offset(10.0).build();
        assert_eq!(detection.image_points.len(), 6);
        assert_eq!(detection.object_points.len(), 6);
        assert_eq!(detection.image_points[0].x, 110.0);
    }

    #[test]
    fn test_rig_world_is_wired() {
        let (world, ids) = rig_world();
        let intrinsics = world.get_as::<CameraIntrinsics>(ids.intrinsics).unwrap();
        assert_eq!(intrinsics.camera_ref().target(), Some(ids.camera));
    }
}
