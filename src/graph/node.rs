//! Node abstraction for the calibration graph
//!
//! A node is one unit of the graph: it owns typed parameters and zero or
//! more capture sets, exposes init/update/serialize/deserialize lifecycle
//! hooks and may declare typed connections (pins) to peer nodes.
//!
//! Lifecycle: `Constructed → Initialized → (Connected) → Running →
//! Destroyed`. `init` is called exactly once, after construction and before
//! any `update`; calling domain operations before `init` is a precondition
//! violation, not a runtime-guarded state.
//!
//! Connections are references by identity, never ownership: a [`NodeRef`]
//! holds a peer's [`NodeId`] and resolves it through the world on each
//! access, so a destroyed peer reports "absent" instead of dangling.

use crate::capture::set::RestoreCounts;
use crate::error::{CalibError, Result};
use serde_json::Value;
use std::any::Any;
use std::fmt;

/// Identity of a node within its world. Ids are never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const INVALID: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "NodeId(INVALID)")
        } else {
            write!(f, "NodeId({})", self.0)
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A declared input connection: the pin's name and the peer type name
/// (capability) it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinDescriptor {
    pub name: &'static str,
    pub capability: &'static str,
}

/// Non-owning reference to a peer node.
///
/// Holds only the peer's identity; liveness is checked at resolution time
/// (`World::resolve`). An unset or dead target is the normal "absent"
/// state, not a fault.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeRef {
    target: Option<NodeId>,
}

impl NodeRef {
    pub fn absent() -> Self {
        Self { target: None }
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn set(&mut self, target: Option<NodeId>) {
        self.target = target;
    }

    pub fn is_absent(&self) -> bool {
        self.target.is_none()
    }
}

/// A unit of the calibration graph.
///
/// `serialize` must write every parameter and every owned capture set under
/// stable keys; `deserialize` must be round-trip exact for everything
/// except derived caches, which are regenerated. Connection targets are
/// not part of a node's own document; the world records and re-resolves
/// them by identity during its phased load.
pub trait Node: Any {
    /// Stable type name, used for UI and as the serialization discriminator.
    fn type_name(&self) -> &'static str;

    /// One-time setup after construction, before any `update`.
    fn init(&mut self) {}

    /// Per-tick hook. Must be non-blocking; long-running work (solves) is
    /// triggered by explicit actions, never implicitly here.
    fn update(&mut self) -> Result<()> {
        Ok(())
    }

    /// Write parameters and capture sets into a document.
    fn serialize(&self) -> Value;

    /// Restore from a document. May assume declared connections already
    /// resolve to live peers (the world wires them first). Returns capture
    /// restore counts for the load summary.
    fn deserialize(&mut self, doc: &Value) -> Result<RestoreCounts>;

    /// Declared input pins, in declaration order.
    fn pins(&self) -> Vec<PinDescriptor> {
        Vec::new()
    }

    /// Current target of a declared pin, if wired.
    fn pin_target(&self, _pin: &str) -> Option<NodeId> {
        None
    }

    /// Wire (or clear) a declared pin.
    fn set_pin_target(&mut self, pin: &str, _target: Option<NodeId>) -> Result<()> {
        Err(CalibError::Graph(format!(
            "node '{}' has no pin '{}'",
            self.type_name(),
            pin
        )))
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl fmt::Debug for dyn Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_sentinel() {
        assert!(NodeId(0).is_valid());
        assert!(!NodeId::INVALID.is_valid());
        assert_eq!(format!("{}", NodeId::INVALID), "NodeId(INVALID)");
        assert_eq!(format!("{}", NodeId(3)), "NodeId(3)");
    }

    #[test]
    fn test_node_ref_absent_by_default() {
        let mut r = NodeRef::default();
        assert!(r.is_absent());
        r.set(Some(NodeId(4)));
        assert_eq!(r.target(), Some(NodeId(4)));
        r.set(None);
        assert!(r.is_absent());
    }
}
