//! Camera intrinsics calibration procedure
//!
//! Accumulates board detections delivered by the acquisition collaborator
//! into a multi-selection capture set; `calibrate` solves over the selected
//! subset and writes each view's extrinsics and reprojection error back
//! onto its capture.

use crate::capture::set::{CaptureSet, CaptureSetEvent, RestoreCounts};
use crate::capture::{Capture, CaptureBase};
use crate::document::{self, Serializable};
use crate::error::{CalibError, Result};
use crate::graph::node::{Node, NodeId, NodeRef, PinDescriptor};
use crate::graph::params::{restore_param, Param};
use crate::nodes::calibrate::{
    points2_from_document, points2_to_document, points3_from_document, points3_to_document,
};
use crate::nodes::{camera, checkerboard, pose_from_document, pose_to_document};
use crate::solve::{BoardObservation, IntrinsicsSolver, SolvedIntrinsics};
use nalgebra::{Isometry3, Point2, Point3};
use serde_json::{Map, Value};
use std::any::Any;

pub const TYPE_NAME: &str = "CameraIntrinsics";

/// One board detection delivered by the acquisition/vision collaborator.
#[derive(Debug, Clone)]
pub struct BoardDetection {
    pub image_points: Vec<Point2<f64>>,
    pub object_points: Vec<Point3<f64>>,
    pub image_width: f64,
    pub image_height: f64,
}

/// One captured board view.
pub struct BoardCapture {
    base: CaptureBase,
    pub image_points: Vec<Point2<f64>>,
    pub object_points: Vec<Point3<f64>>,
    pub image_width: f64,
    pub image_height: f64,
    pub extrinsics: Isometry3<f64>,
    pub reprojection_error: f64,
}

impl Capture for BoardCapture {
    fn base(&self) -> &CaptureBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut CaptureBase {
        &mut self.base
    }

    fn empty() -> Self {
        Self {
            base: CaptureBase::new(),
            image_points: Vec::new(),
            object_points: Vec::new(),
            image_width: 0.0,
            image_height: 0.0,
            extrinsics: Isometry3::identity(),
            reprojection_error: 0.0,
        }
    }

    fn serialize_payload(&self, doc: &mut Map<String, Value>) {
        doc.insert("image_points".into(), points2_to_document(&self.image_points));
        doc.insert(
            "object_points".into(),
            points3_to_document(&self.object_points),
        );
        doc.insert("image_width".into(), self.image_width.into());
        doc.insert("image_height".into(), self.image_height.into());
        doc.insert("extrinsics".into(), pose_to_document(&self.extrinsics));
        doc.insert("reprojection_error".into(), self.reprojection_error.into());
    }

    fn deserialize_payload(&mut self, doc: &Value) -> Result<()> {
        self.image_points = points2_from_document(doc, "image_points")?;
        self.object_points = points3_from_document(doc, "object_points")?;
        self.image_width = document::require_f64(doc, "image_width")?;
        self.image_height = document::require_f64(doc, "image_height")?;
        self.extrinsics = pose_from_document(document::require(doc, "extrinsics")?)?;
        self.reprojection_error = document::require_f64(doc, "reprojection_error")?;
        Ok(())
    }

    fn display_payload(&self) -> String {
        format!(
            "{} corners, {:.3} px",
            self.image_points.len(),
            self.reprojection_error
        )
    }
}

/// Procedure node solving camera intrinsics from captured board views.
pub struct CameraIntrinsics {
    camera: NodeRef,
    board: NodeRef,
    captures: CaptureSet<BoardCapture>,
    reprojection_error: Param<f64>,
    selected_views: usize,
}

impl CameraIntrinsics {
    pub fn new() -> Self {
        Self {
            camera: NodeRef::absent(),
            board: NodeRef::absent(),
            captures: CaptureSet::multi_selection(),
            reprojection_error: Param::new("reprojection_error", 0.0),
            selected_views: 0,
        }
    }

    pub fn captures(&self) -> &CaptureSet<BoardCapture> {
        &self.captures
    }

    pub fn captures_mut(&mut self) -> &mut CaptureSet<BoardCapture> {
        &mut self.captures
    }

    pub fn reprojection_error(&self) -> f64 {
        self.reprojection_error.get()
    }

    /// Number of selected views as of the last tick.
    pub fn selected_views(&self) -> usize {
        self.selected_views
    }

    pub fn camera_ref(&self) -> &NodeRef {
        &self.camera
    }

    /// Entry point for the acquisition collaborator: wrap a delivered board
    /// detection into a capture. New captures join the solve selection.
    pub fn add_capture(&mut self, detection: BoardDetection) {
        let mut capture = BoardCapture::empty();
        capture.image_points = detection.image_points;
        capture.object_points = detection.object_points;
        capture.image_width = detection.image_width;
        capture.image_height = detection.image_height;
        let id = self.captures.add(capture);
        self.captures.select(id);
    }

    /// Solve intrinsics over the selected captures. Writes the aggregate
    /// error and each view's extrinsics/residual back, and returns the full
    /// outcome so the caller can install the model on the connected camera.
    pub fn calibrate(&mut self, solver: &dyn IntrinsicsSolver) -> Result<SolvedIntrinsics> {
        let selection = self.captures.selection();
        let first = selection
            .first()
            .ok_or_else(|| CalibError::Solve("no captures selected".to_string()))?;
        let image_size = (first.image_width, first.image_height);
        let observations: Vec<BoardObservation> = selection
            .iter()
            .map(|c| BoardObservation {
                image_points: c.image_points.clone(),
                object_points: c.object_points.clone(),
            })
            .collect();
        let selected_ids = self.captures.selected_ids();

        let solved = solver.solve(&observations, image_size)?;

        self.reprojection_error.set(solved.rms_error);
        for (id, view) in selected_ids.iter().zip(solved.per_view.iter()) {
            if let Some(capture) = self.captures.get_mut(*id) {
                capture.extrinsics = view.extrinsics;
                capture.reprojection_error = view.reprojection_error;
            }
        }
        tracing::info!(
            "Intrinsics solve over {} views: rms {:.4} px",
            solved.per_view.len(),
            solved.rms_error
        );
        Ok(solved)
    }
}

impl Default for CameraIntrinsics {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for CameraIntrinsics {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn update(&mut self) -> Result<()> {
        // Selection changes invalidate the derived view count.
        let events = self.captures.take_events();
        if events
            .iter()
            .any(|e| matches!(e, CaptureSetEvent::SelectionDirty))
        {
            self.selected_views = self.captures.selection().len();
        }
        Ok(())
    }

    fn serialize(&self) -> Value {
        let mut doc = Map::new();
        doc.insert(
            self.reprojection_error.name().to_string(),
            self.reprojection_error.serialize(),
        );
        doc.insert("captures".into(), self.captures.serialize());
        Value::Object(doc)
    }

    fn deserialize(&mut self, doc: &Value) -> Result<RestoreCounts> {
        restore_param(&mut self.reprojection_error, doc)?;
        let counts = self
            .captures
            .restore(document::require(doc, "captures")?)?;
        self.selected_views = self.captures.selection().len();
        Ok(counts)
    }

    fn pins(&self) -> Vec<PinDescriptor> {
        vec![
            PinDescriptor {
                name: "camera",
                capability: camera::TYPE_NAME,
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
            "board" => self.board.target(),
            _ => None,
        }
    }

    fn set_pin_target(&mut self, pin: &str, target: Option<NodeId>) -> Result<()> {
        match pin {
            "camera" => self.camera.set(target),
            "board" => self.board.set(target),
            _ => {
                return Err(CalibError::Graph(format!(
                    "CameraIntrinsics has no pin '{}'",
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
