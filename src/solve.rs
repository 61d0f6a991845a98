//! Solver seam
//!
//! The calibration math itself is an external collaborator: procedure nodes
//! gather the *selected* subset of their captures and hand it to one of
//! these traits through an explicit user action, never implicitly per tick.
//! The node stores whatever the solver returns (derived parameters plus
//! per-sample residuals).
//!
//! [`SeedSolver`] is the built-in stand-in backend: a deterministic
//! initial-guess generator that real CV backends replace.

use crate::error::{CalibError, Result};
use nalgebra::{Isometry3, Point2, Point3, Translation3, UnitQuaternion};
use serde::{Deserialize, Serialize};

/// Pinhole camera intrinsics with plumb-bob distortion terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraModel {
    pub image_width: f64,
    pub image_height: f64,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub distortion: [f64; 5],
}

impl CameraModel {
    /// Nominal model for an image size: focal length equal to the image
    /// width, principal point at the centre, zero distortion.
    pub fn with_image_size(width: f64, height: f64) -> Self {
        Self {
            image_width: width,
            image_height: height,
            fx: width,
            fy: width,
            cx: width / 2.0,
            cy: height / 2.0,
            distortion: [0.0; 5],
        }
    }
}

impl Default for CameraModel {
    fn default() -> Self {
        Self::with_image_size(1920.0, 1080.0)
    }
}

/// One view's worth of detected board correspondences.
#[derive(Debug, Clone)]
pub struct BoardObservation {
    pub image_points: Vec<Point2<f64>>,
    pub object_points: Vec<Point3<f64>>,
}

/// Per-view solve output: the board pose in camera space and the view's
/// reprojection error.
#[derive(Debug, Clone)]
pub struct ViewResidual {
    pub extrinsics: Isometry3<f64>,
    pub reprojection_error: f64,
}

/// Full intrinsics solve output.
#[derive(Debug, Clone)]
pub struct SolvedIntrinsics {
    pub model: CameraModel,
    pub rms_error: f64,
    pub per_view: Vec<ViewResidual>,
}

/// Intrinsics solve over a set of board observations.
pub trait IntrinsicsSolver {
    fn solve(
        &self,
        observations: &[BoardObservation],
        image_size: (f64, f64),
    ) -> Result<SolvedIntrinsics>;
}

/// Pose-only solve output.
#[derive(Debug, Clone)]
pub struct SolvedExtrinsics {
    pub pose: Isometry3<f64>,
    pub rms_error: f64,
}

/// Extrinsics solve from known world points and their projections.
pub trait ExtrinsicsSolver {
    fn solve(
        &self,
        world_points: &[Point3<f64>],
        image_points: &[Point2<f64>],
        model: &CameraModel,
    ) -> Result<SolvedExtrinsics>;
}

/// Deterministic initial-guess backend.
///
/// Produces the nominal camera model for the image size and unit-distance
/// poses with zero residuals. Stands in for an external CV backend so the
/// rest of the pipeline (capture flow, persistence, residual bookkeeping)
/// runs end to end without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeedSolver;

impl IntrinsicsSolver for SeedSolver {
    fn solve(
        &self,
        observations: &[BoardObservation],
        image_size: (f64, f64),
    ) -> Result<SolvedIntrinsics> {
        if observations.is_empty() {
            return Err(CalibError::Solve(
                "intrinsics solve needs at least one selected capture".to_string(),
            ));
        }
        for (index, view) in observations.iter().enumerate() {
            if view.image_points.len() != view.object_points.len() {
                return Err(CalibError::Solve(format!(
                    "observation {}: {} image points vs {} object points",
                    index,
                    view.image_points.len(),
                    view.object_points.len()
                )));
            }
            if view.image_points.is_empty() {
                return Err(CalibError::Solve(format!("observation {} is empty", index)));
            }
        }

        let per_view = observations
            .iter()
            .map(|_| ViewResidual {
                extrinsics: unit_distance_pose(),
                reprojection_error: 0.0,
            })
            .collect();

        Ok(SolvedIntrinsics {
            model: CameraModel::with_image_size(image_size.0, image_size.1),
            rms_error: 0.0,
            per_view,
        })
    }
}

impl ExtrinsicsSolver for SeedSolver {
    fn solve(
        &self,
        world_points: &[Point3<f64>],
        image_points: &[Point2<f64>],
        _model: &CameraModel,
    ) -> Result<SolvedExtrinsics> {
        if world_points.is_empty() || world_points.len() != image_points.len() {
            return Err(CalibError::Solve(format!(
                "extrinsics solve needs matched correspondences, got {} world / {} image",
                world_points.len(),
                image_points.len()
            )));
        }
        Ok(SolvedExtrinsics {
            pose: unit_distance_pose(),
            rms_error: 0.0,
        })
    }
}

fn unit_distance_pose() -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::new(0.0, 0.0, 1.0),
        UnitQuaternion::identity(),
    )
}
