//! # Calibrig: capture and node-graph core for spatial calibration rigs
//!
//! The library that backs a multi-device calibration session: cameras,
//! projectors and calibration targets live as nodes in a [`graph::World`],
//! procedure nodes accumulate timestamped captures in selectable sets, and
//! the whole graph persists to a single JSON document.
//!
//! ## Architecture
//!
//! - **Captures**: [`capture::set::CaptureSet`] owns timestamped, selectable
//!   samples. Mutations queue events that the owning node drains on its tick.
//! - **Graph**: nodes connect through typed pins held as weak references by
//!   id, so deleting a node simply leaves the reference dangling until it is
//!   rewired.
//! - **Persistence**: the world document is restored in three phases
//!   (instantiate via [`graph::NodeRegistry`], wire connections, then
//!   deserialize node state) and loads are best-effort: malformed entries
//!   are skipped and counted, never fatal.
//! - **Solving**: calibration math sits behind the [`solve::IntrinsicsSolver`]
//!   and [`solve::ExtrinsicsSolver`] seams.
//!
//! ## Configuration
//!
//! The world document is stored in the platform data directory under
//! `calibrig/world.json`:
//!
//! - **Linux**: `~/.local/share/calibrig/world.json`
//! - **macOS**: `~/Library/Application Support/calibrig/world.json`
//! - **Windows**: `%APPDATA%\calibrig\world.json`
//!
//! ## Example
//!
//! ```
//! use calibrig::graph::{NodeRegistry, World};
//! use calibrig::nodes::{self, Camera, CameraIntrinsics};
//!
//! let mut registry = NodeRegistry::new();
//! nodes::register_builtins(&mut registry);
//!
//! let mut world = World::new();
//! let camera = world.add(Box::new(Camera::new()));
//! let intrinsics = world.add(Box::new(CameraIntrinsics::new()));
//! world.connect(intrinsics, camera).unwrap();
//!
//! let document = world.to_document();
//! let mut restored = World::new();
//! let report = restored.from_document(&document, &registry).unwrap();
//! assert_eq!(report.nodes_restored, 2);
//! ```

pub mod capture;
pub mod document;
pub mod error;
pub mod graph;
pub mod nodes;
pub mod solve;

// Re-export commonly used types
pub use capture::set::CaptureSet;
pub use capture::{Capture, CaptureBase, CaptureId};
pub use error::{CalibError, Result};
pub use graph::{NodeRegistry, World};
pub use solve::{CameraModel, SeedSolver};
