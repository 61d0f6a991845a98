//! Calibration procedure nodes
//!
//! Procedures accumulate captures delivered by the acquisition collaborator
//! and run a solver over the selected subset on explicit request.

pub mod camera_intrinsics;
pub mod projector_extrinsics;

use crate::error::{CalibError, Result};
use nalgebra::{Point2, Point3};
use serde_json::Value;

pub(crate) fn points2_to_document(points: &[Point2<f64>]) -> Value {
    Value::Array(
        points
            .iter()
            .map(|p| Value::Array(vec![p.x.into(), p.y.into()]))
            .collect(),
    )
}

pub(crate) fn points3_to_document(points: &[Point3<f64>]) -> Value {
    Value::Array(
        points
            .iter()
            .map(|p| Value::Array(vec![p.x.into(), p.y.into(), p.z.into()]))
            .collect(),
    )
}

fn number_row(value: &Value, field: &str, len: usize) -> Result<Vec<f64>> {
    let row = value
        .as_array()
        .ok_or_else(|| CalibError::malformed(field, "expected an array element"))?;
    if row.len() != len {
        return Err(CalibError::malformed(
            field,
            format!("expected {} coordinates, got {}", len, row.len()),
        ));
    }
    row.iter()
        .map(|v| {
            v.as_f64()
                .ok_or_else(|| CalibError::malformed(field, "expected a number"))
        })
        .collect()
}

pub(crate) fn points2_from_document(doc: &Value, field: &str) -> Result<Vec<Point2<f64>>> {
    let array = doc
        .get(field)
        .and_then(|v| v.as_array())
        .ok_or_else(|| CalibError::malformed(field, "expected an array of points"))?;
    array
        .iter()
        .map(|row| number_row(row, field, 2).map(|c| Point2::new(c[0], c[1])))
        .collect()
}

pub(crate) fn points3_from_document(doc: &Value, field: &str) -> Result<Vec<Point3<f64>>> {
    let array = doc
        .get(field)
        .and_then(|v| v.as_array())
        .ok_or_else(|| CalibError::malformed(field, "expected an array of points"))?;
    array
        .iter()
        .map(|row| number_row(row, field, 3).map(|c| Point3::new(c[0], c[1], c[2])))
        .collect()
}
