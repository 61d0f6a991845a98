//! Projector extrinsics calibration procedure
//!
//! Holds correspondence sweeps in a single-selection capture set; exactly
//! one sweep is active at a time and `calibrate` poses the connected
//! projector from it.

use crate::capture::set::{CaptureSet, RestoreCounts};
use crate::capture::{Capture, CaptureBase};
use crate::document::{self, Serializable};
use crate::error::{CalibError, Result};
use crate::graph::node::{Node, NodeId, NodeRef, PinDescriptor};
use crate::nodes::calibrate::{
    points2_from_document, points2_to_document, points3_from_document, points3_to_document,
};
use crate::nodes::{camera, checkerboard, projector};
use crate::solve::{CameraModel, ExtrinsicsSolver, SolvedExtrinsics};
use nalgebra::{Point2, Point3};
use serde_json::{Map, Value};
use std::any::Any;

pub const TYPE_NAME: &str = "ProjectorExtrinsics";

/// One structured-light sweep: world points seen through the camera paired
/// with the projector pixels that lit them.
#[derive(Debug, Clone)]
pub struct CorrespondenceSweep {
    pub world_points: Vec<Point3<f64>>,
    pub projector_points: Vec<Point2<f64>>,
}

/// One captured sweep.
pub struct CorrespondenceCapture {
    base: CaptureBase,
    pub world_points: Vec<Point3<f64>>,
    pub projector_points: Vec<Point2<f64>>,
}

impl Capture for CorrespondenceCapture {
    fn base(&self) -> &CaptureBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut CaptureBase {
        &mut self.base
    }

    fn empty() -> Self {
        Self {
            base: CaptureBase::new(),
            world_points: Vec::new(),
            projector_points: Vec::new(),
        }
    }

    fn serialize_payload(&self, doc: &mut Map<String, Value>) {
        doc.insert("world_points".into(), points3_to_document(&self.world_points));
        doc.insert(
            "projector_points".into(),
            points2_to_document(&self.projector_points),
        );
    }

    fn deserialize_payload(&mut self, doc: &Value) -> Result<()> {
        self.world_points = points3_from_document(doc, "world_points")?;
        self.projector_points = points2_from_document(doc, "projector_points")?;
        if self.world_points.len() != self.projector_points.len() {
            return Err(CalibError::malformed(
                "world_points",
                format!(
                    "{} world points but {} projector points",
                    self.world_points.len(),
                    self.projector_points.len()
                ),
            ));
        }
        Ok(())
    }

    fn display_payload(&self) -> String {
        format!("{} correspondences", self.world_points.len())
    }
}

/// Procedure node posing a projector from a correspondence sweep.
pub struct ProjectorExtrinsics {
    camera: NodeRef,
    projector: NodeRef,
    board: NodeRef,
    sweeps: CaptureSet<CorrespondenceCapture>,
}

impl ProjectorExtrinsics {
    pub fn new() -> Self {
        Self {
            camera: NodeRef::absent(),
            projector: NodeRef::absent(),
            board: NodeRef::absent(),
            sweeps: CaptureSet::single_selection(),
        }
    }

    pub fn sweeps(&self) -> &CaptureSet<CorrespondenceCapture> {
        &self.sweeps
    }

    pub fn sweeps_mut(&mut self) -> &mut CaptureSet<CorrespondenceCapture> {
        &mut self.sweeps
    }

    pub fn projector_ref(&self) -> &NodeRef {
        &self.projector
    }

    /// Record a delivered sweep. The newest sweep becomes the active one,
    /// the set deselects whichever was active before.
    pub fn add_capture(&mut self, sweep: CorrespondenceSweep) {
        let mut capture = CorrespondenceCapture::empty();
        capture.world_points = sweep.world_points;
        capture.projector_points = sweep.projector_points;
        let id = self.sweeps.add(capture);
        self.sweeps.select(id);
    }

    /// Solve the projector pose from the active sweep, given the projector's
    /// current camera model.
    pub fn calibrate(
        &mut self,
        solver: &dyn ExtrinsicsSolver,
        model: &CameraModel,
    ) -> Result<SolvedExtrinsics> {
        let selection = self.sweeps.selection();
        let sweep = selection
            .first()
            .ok_or_else(|| CalibError::Solve("no sweep selected".to_string()))?;
        let solved = solver.solve(&sweep.world_points, &sweep.projector_points, model)?;
        tracing::info!(
            "Projector pose solved from {} correspondences: rms {:.4} px",
            sweep.world_points.len(),
            solved.rms_error
        );
        Ok(solved)
    }
}

impl Default for ProjectorExtrinsics {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for ProjectorExtrinsics {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn update(&mut self) -> Result<()> {
        self.sweeps.take_events();
        Ok(())
    }

    fn serialize(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("sweeps".into(), self.sweeps.serialize());
        Value::Object(doc)
    }

    fn deserialize(&mut self, doc: &Value) -> Result<RestoreCounts> {
        self.sweeps.restore(document::require(doc, "sweeps")?)
    }

    fn pins(&self) -> Vec<PinDescriptor> {
        vec![
            PinDescriptor {
                name: "camera",
                capability: camera::TYPE_NAME,
            },
            PinDescriptor {
                name: "projector",
                capability: projector::TYPE_NAME,
            },
            PinDescriptor {
                name: "board",
                capability: checkerboard::TYPE_NAME,
            },
        ]
    }

    fn pin_target(&self, pin: &str) -> Option<NodeId> {
        match pin {
            "camera" => self.camera.target(),
            "projector" => self.projector.target(),
            "board" => self.board.target(),
            _ => None,
        }
    }

    fn set_pin_target(&mut self, pin: &str, target: Option<NodeId>) -> Result<()> {
        match pin {
            "camera" => self.camera.set(target),
            "projector" => self.projector.set(target),
            "board" => self.board.set(target),
            _ => {
                return Err(CalibError::Graph(format!(
                    "ProjectorExtrinsics has no pin '{}'",
                    pin
                )))
            }
        }
        Ok(())
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
    use crate::solve::SeedSolver;
    use approx::assert_relative_eq;

    fn sweep() -> CorrespondenceSweep {
        CorrespondenceSweep {
            world_points: vec![Point3::new(0.0, 0.0, 2.0), Point3::new(0.5, 0.0, 2.0)],
            projector_points: vec![Point2::new(960.0, 540.0), Point2::new(1200.0, 540.0)],
        }
    }

    #[test]
    fn test_newest_sweep_becomes_active() {
        let mut node = ProjectorExtrinsics::new();
        node.add_capture(sweep());
        node.add_capture(sweep());
        assert_eq!(node.sweeps().len(), 2);
        assert_eq!(node.sweeps().selection().len(), 1);
        let active = node.sweeps().selected_ids()[0];
        assert_eq!(active, node.sweeps().iter().nth(1).unwrap().id());
    }

    #[test]
    fn test_calibrate_uses_active_sweep() {
        let mut node = ProjectorExtrinsics::new();
        node.add_capture(sweep());
        let solved = node
            .calibrate(&SeedSolver, &CameraModel::default())
            .unwrap();
        assert_relative_eq!(solved.pose.translation.vector.z, 1.0);
    }

    #[test]
    fn test_calibrate_without_sweep_fails() {
        let mut node = ProjectorExtrinsics::new();
        assert!(node
            .calibrate(&SeedSolver, &CameraModel::default())
            .is_err());
    }

    #[test]
    fn test_mismatched_point_counts_rejected_on_restore() {
        let mut capture = CorrespondenceCapture::empty();
        capture.world_points = vec![Point3::new(0.0, 0.0, 1.0)];
        capture.projector_points = Vec::new();
        let doc = capture.serialize();

        let mut restored = CorrespondenceCapture::empty();
        assert!(restored.deserialize(&doc).is_err());
    }

    #[test]
    fn test_round_trip_keeps_single_active_sweep() {
        let mut node = ProjectorExtrinsics::new();
        node.add_capture(sweep());
        node.add_capture(sweep());
        let doc = Node::serialize(&node);

        let mut restored = ProjectorExtrinsics::new();
        let counts = restored.deserialize(&doc).unwrap();
        assert_eq!(counts.restored, 2);
        assert_eq!(restored.sweeps().selection().len(), 1);
    }
}
