//! Built-in node variants
//!
//! Item nodes describe physical things in the rig (camera, projector,
//! checkerboard, rigid body); procedure nodes accumulate captures and run
//! solves over the selected subset. `register_builtins` populates a
//! registry with every compiled-in variant so a stored world can be
//! rebuilt by type name.

pub mod calibrate;
pub mod camera;
pub mod checkerboard;
pub mod projector;
pub mod rigid_body;
pub mod summary;

pub use calibrate::camera_intrinsics::{BoardDetection, CameraIntrinsics};
pub use calibrate::projector_extrinsics::{CorrespondenceSweep, ProjectorExtrinsics};
pub use camera::Camera;
pub use checkerboard::Checkerboard;
pub use projector::Projector;
pub use rigid_body::{RigidBody, RigidBodyPose};
pub use summary::Summary;

use crate::document;
use crate::error::{CalibError, Result};
use crate::graph::registry::NodeRegistry;
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Quaternion};
use serde_json::{json, Value};

/// Register every built-in node variant.
pub fn register_builtins(registry: &mut NodeRegistry) {
    registry.register(camera::TYPE_NAME, || Box::new(Camera::new()));
    registry.register(projector::TYPE_NAME, || Box::new(Projector::new()));
    registry.register(checkerboard::TYPE_NAME, || Box::new(Checkerboard::new()));
    registry.register(rigid_body::TYPE_NAME, || Box::new(RigidBody::new()));
    registry.register(summary::TYPE_NAME, || Box::new(Summary::new()));
    registry.register(calibrate::camera_intrinsics::TYPE_NAME, || {
        Box::new(CameraIntrinsics::new())
    });
    registry.register(calibrate::projector_extrinsics::TYPE_NAME, || {
        Box::new(ProjectorExtrinsics::new())
    });
}

/// Serialize a rigid transform as `{ "translation": [x,y,z],
/// "rotation": [x,y,z,w] }`.
pub(crate) fn pose_to_document(pose: &Isometry3<f64>) -> Value {
    let t = &pose.translation.vector;
    let q = pose.rotation.quaternion();
    json!({
        "translation": [t.x, t.y, t.z],
        "rotation": [q.i, q.j, q.k, q.w],
    })
}

/// Restore a rigid transform written by [`pose_to_document`].
pub(crate) fn pose_from_document(doc: &Value) -> Result<Isometry3<f64>> {
    let t = document::require_f64_array(doc, "translation", 3)?;
    let q = document::require_f64_array(doc, "rotation", 4)?;
    let quaternion = Quaternion::new(q[3], q[0], q[1], q[2]);
    let rotation = UnitQuaternion::try_new(quaternion, 1e-9)
        .ok_or_else(|| CalibError::malformed("rotation", "quaternion is degenerate"))?;
    Ok(Isometry3::from_parts(
        Translation3::new(t[0], t[1], t[2]),
        rotation,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_pose_round_trip() {
        let pose = Isometry3::new(Vector3::new(1.0, -2.0, 0.5), Vector3::new(0.1, 0.2, 0.3));
        let doc = pose_to_document(&pose);
        let restored = pose_from_document(&doc).unwrap();
        assert_relative_eq!(pose.translation.vector, restored.translation.vector, epsilon = 1e-12);
        assert_relative_eq!(
            pose.rotation.angle_to(&restored.rotation),
            0.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_pose_rejects_degenerate_rotation() {
        let doc = json!({ "translation": [0, 0, 0], "rotation": [0, 0, 0, 0] });
        assert!(pose_from_document(&doc).is_err());
    }
}
