//! Node-graph composition: nodes, typed connections, factory registry and
//! the owning world.

pub mod node;
pub mod params;
pub mod registry;
pub mod world;

pub use node::{Node, NodeId, NodeRef, PinDescriptor};
pub use params::{restore_param, Param};
pub use registry::{NodeFactory, NodeRegistry};
pub use world::{default_world_path, LoadReport, SaveReport, UpdateReport, World};
