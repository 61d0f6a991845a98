//! Rigid-body pose
//!
//! Six posed parameters (translation plus Euler rotation, radians) shared
//! by every node that exists somewhere in the room. Camera and Projector
//! embed [`RigidBodyPose`]; the plain [`RigidBody`] node is the standalone
//! variant for untracked objects.

use crate::capture::set::RestoreCounts;
use crate::document::Serializable;
use crate::error::Result;
use crate::graph::node::Node;
use crate::graph::params::{restore_param, Param};
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use serde_json::{Map, Value};
use std::any::Any;

pub const TYPE_NAME: &str = "RigidBody";

/// Pose state stored as six named parameters.
#[derive(Debug, Clone)]
pub struct RigidBodyPose {
    translation: [Param<f64>; 3],
    rotation_euler: [Param<f64>; 3],
}

impl RigidBodyPose {
    pub fn new() -> Self {
        Self {
            translation: [
                Param::new("translation_x", 0.0),
                Param::new("translation_y", 0.0),
                Param::new("translation_z", 0.0),
            ],
            rotation_euler: [
                Param::new("rotation_x", 0.0),
                Param::new("rotation_y", 0.0),
                Param::new("rotation_z", 0.0),
            ],
        }
    }

    /// The rigid transform represented by the stored parameters.
    pub fn transform(&self) -> Isometry3<f64> {
        let translation = Translation3::new(
            self.translation[0].get(),
            self.translation[1].get(),
            self.translation[2].get(),
        );
        let rotation = UnitQuaternion::from_euler_angles(
            self.rotation_euler[0].get(),
            self.rotation_euler[1].get(),
            self.rotation_euler[2].get(),
        );
        Isometry3::from_parts(translation, rotation)
    }

    /// Decompose a transform back into the stored parameters.
    pub fn set_transform(&mut self, transform: &Isometry3<f64>) {
        let t = transform.translation.vector;
        self.translation[0].set(t.x);
        self.translation[1].set(t.y);
        self.translation[2].set(t.z);
        let (rx, ry, rz) = transform.rotation.euler_angles();
        self.rotation_euler[0].set(rx);
        self.rotation_euler[1].set(ry);
        self.rotation_euler[2].set(rz);
    }

    /// Set the pose from a solver's rotation/translation output.
    pub fn set_extrinsics(&mut self, rotation: UnitQuaternion<f64>, translation: Vector3<f64>) {
        self.set_transform(&Isometry3::from_parts(translation.into(), rotation));
    }

    fn params(&self) -> impl Iterator<Item = &Param<f64>> {
        self.translation.iter().chain(self.rotation_euler.iter())
    }

    fn params_mut(&mut self) -> impl Iterator<Item = &mut Param<f64>> {
        self.translation
            .iter_mut()
            .chain(self.rotation_euler.iter_mut())
    }

    /// Write the six pose parameters into a node document.
    pub fn serialize_into(&self, doc: &mut Map<String, Value>) {
        for param in self.params() {
            doc.insert(param.name().to_string(), param.serialize());
        }
    }

    /// Restore the six pose parameters from a node document.
    pub fn deserialize_from(&mut self, doc: &Value) -> Result<()> {
        for param in self.params_mut() {
            restore_param(param, doc)?;
        }
        Ok(())
    }
}

impl Default for RigidBodyPose {
    fn default() -> Self {
        Self::new()
    }
}

/// A standalone posed object in the rig.
pub struct RigidBody {
    pose: RigidBodyPose,
}

impl RigidBody {
    pub fn new() -> Self {
        Self {
            pose: RigidBodyPose::new(),
        }
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

impl Default for RigidBody {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for RigidBody {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn serialize(&self) -> Value {
        let mut doc = Map::new();
        self.pose.serialize_into(&mut doc);
        Value::Object(doc)
    }

    fn deserialize(&mut self, doc: &Value) -> Result<RestoreCounts> {
        self.pose.deserialize_from(doc)?;
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
    fn test_pose_transform_round_trip() {
        let mut pose = RigidBodyPose::new();
        let transform = Isometry3::new(
            Vector3::new(0.3, 1.2, -0.7),
            Vector3::new(0.2, -0.1, 0.4),
        );
        pose.set_transform(&transform);
        let back = pose.transform();
        assert_relative_eq!(
            transform.translation.vector,
            back.translation.vector,
            epsilon = 1e-12
        );
        assert_relative_eq!(transform.rotation.angle_to(&back.rotation), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_node_serialize_round_trip() {
        let mut body = RigidBody::new();
        body.pose_mut()
            .set_transform(&Isometry3::translation(1.0, 2.0, 3.0));
        let doc = Node::serialize(&body);

        let mut restored = RigidBody::new();
        restored.deserialize(&doc).unwrap();
        assert_relative_eq!(
            restored.transform().translation.vector,
            body.transform().translation.vector,
            epsilon = 1e-12
        );
    }
}
