//! The world: owning container of all nodes
//!
//! The world owns every node exclusively, in stable insertion order; that
//! order drives both the update tick and the serialization order of the
//! whole-graph document.
//!
//! Persistence is a whole-document snapshot. Saving keys each node by its
//! type name (`"Camera"`), suffixed with an instance index
//! (`"Camera_0"`, `"Camera_1"`) when several nodes share a type. Loading is
//! three-phase, and the ordering is mandatory: instantiate every node from
//! the registry, then re-establish all declared connections by identity,
//! then deserialize per-node state, so a node's `deserialize` can assume
//! its connections already resolve to live peers. A world load is a
//! best-effort union: one broken node or capture is reported and skipped,
//! never aborting the rest.

use crate::capture::set::RestoreCounts;
use crate::error::{CalibError, Result};
use crate::graph::node::{Node, NodeId};
use crate::graph::registry::NodeRegistry;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Application identifier for the platform data directory.
pub const APP_ID: &str = "calibrig";

/// Default world snapshot filename.
pub const WORLD_FILE: &str = "world.json";

/// Default save location under the platform data dir.
pub fn default_world_path() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID).join(WORLD_FILE))
}

/// Summary of an update pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub ticked: usize,
    pub failed: usize,
}

/// Summary of a whole-world save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub nodes_saved: usize,
}

/// Summary of a whole-world load: what was restored and what was skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub nodes_restored: usize,
    pub nodes_skipped: usize,
    pub connections_resolved: usize,
    pub connections_dangling: usize,
    pub captures: RestoreCounts,
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes restored, {} skipped; {} connections resolved, {} dangling; {} captures restored, {} skipped",
            self.nodes_restored,
            self.nodes_skipped,
            self.connections_resolved,
            self.connections_dangling,
            self.captures.restored,
            self.captures.skipped
        )
    }
}

struct WorldEntry {
    id: NodeId,
    node: Box<dyn Node>,
}

/// Owning container of all nodes; drives the tick and whole-graph
/// persistence.
#[derive(Default)]
pub struct World {
    entries: Vec<WorldEntry>,
    next_id: u32,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a node, run its one-time `init`, and return its identity.
    ///
    /// Identities are allocated internally and never reused, so insertion
    /// cannot collide.
    pub fn add(&mut self, mut node: Box<dyn Node>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        node.init();
        self.entries.push(WorldEntry { id, node });
        id
    }

    /// Destroy a node. Peers holding its id will resolve "absent" from now
    /// on. Returns false if the id was not present.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() < before
    }

    pub fn get(&self, id: NodeId) -> Option<&dyn Node> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Box<dyn Node>> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .map(|e| &mut e.node)
    }

    /// Typed access to a node.
    pub fn get_as<T: Node>(&self, id: NodeId) -> Option<&T> {
        self.get(id).and_then(|n| n.as_any().downcast_ref::<T>())
    }

    /// Typed mutable access to a node.
    pub fn get_as_mut<T: Node>(&mut self, id: NodeId) -> Option<&mut T> {
        self.get_mut(id)
            .and_then(|n| n.as_any_mut().downcast_mut::<T>())
    }

    /// Resolve a connection to a live, typed peer, or absent.
    pub fn resolve<T: Node>(&self, reference: &crate::graph::node::NodeRef) -> Option<&T> {
        reference.target().and_then(|id| self.get_as(id))
    }

    /// Nodes in stable world order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &dyn Node)> {
        self.entries.iter().map(|e| (e.id, e.node.as_ref()))
    }

    /// Wire `to` into the first matching pin of `from`.
    ///
    /// A pin matches when its declared capability equals the peer's type
    /// name; an unwired matching pin is preferred, otherwise the first
    /// matching pin is rewired.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        let peer_type = self
            .get(to)
            .ok_or_else(|| CalibError::Graph(format!("connect: target {} not found", to)))?
            .type_name();
        let from_node = self
            .get_mut(from)
            .ok_or_else(|| CalibError::Graph(format!("connect: source {} not found", from)))?;

        let pins = from_node.pins();
        let matching: Vec<_> = pins.iter().filter(|p| p.capability == peer_type).collect();
        let pin = matching
            .iter()
            .find(|p| from_node.pin_target(p.name).is_none())
            .or_else(|| matching.first())
            .ok_or_else(|| {
                CalibError::Graph(format!(
                    "node '{}' declares no pin accepting '{}'",
                    from_node.type_name(),
                    peer_type
                ))
            })?;
        from_node.set_pin_target(pin.name, Some(to))
    }

    /// Tick every node in stable order. A failing node is reported and does
    /// not prevent subsequent nodes from ticking in the same pass.
    pub fn update(&mut self) -> UpdateReport {
        let mut report = UpdateReport::default();
        for entry in &mut self.entries {
            report.ticked += 1;
            if let Err(e) = entry.node.update() {
                tracing::error!("Node '{}' update failed: {}", entry.node.type_name(), e);
                report.failed += 1;
            }
        }
        report
    }

    // ==================== Persistence ====================

    /// Identity key for each node, in world order: the bare type name, or
    /// `"<TypeName>_<instanceIndex>"` when several nodes share a type.
    fn identity_keys(&self) -> Vec<String> {
        let mut totals: HashMap<&str, usize> = HashMap::new();
        for entry in &self.entries {
            *totals.entry(entry.node.type_name()).or_default() += 1;
        }
        let mut seen: HashMap<&str, usize> = HashMap::new();
        self.entries
            .iter()
            .map(|entry| {
                let type_name = entry.node.type_name();
                let index = seen.entry(type_name).or_default();
                let key = if totals[type_name] == 1 {
                    type_name.to_string()
                } else {
                    format!("{}_{}", type_name, index)
                };
                *index += 1;
                key
            })
            .collect()
    }

    /// Serialize the whole world into a single document, keyed by node
    /// identity, in world order. Each node's document carries a
    /// `"connections"` object mapping its pins to peer identity keys.
    pub fn to_document(&self) -> Value {
        let keys = self.identity_keys();
        let key_of: HashMap<NodeId, &str> = self
            .entries
            .iter()
            .zip(keys.iter())
            .map(|(e, k)| (e.id, k.as_str()))
            .collect();

        let mut root = Map::new();
        for (entry, key) in self.entries.iter().zip(keys.iter()) {
            let mut doc = match entry.node.serialize() {
                Value::Object(map) => map,
                other => {
                    let mut map = Map::new();
                    map.insert("state".into(), other);
                    map
                }
            };

            let pins = entry.node.pins();
            if !pins.is_empty() {
                let mut connections = Map::new();
                for pin in pins {
                    let target = entry
                        .node
                        .pin_target(pin.name)
                        .and_then(|id| key_of.get(&id))
                        .map(|k| Value::String((*k).to_string()))
                        .unwrap_or(Value::Null);
                    connections.insert(pin.name.to_string(), target);
                }
                doc.insert("connections".into(), Value::Object(connections));
            }

            root.insert(key.clone(), Value::Object(doc));
        }
        Value::Object(root)
    }

    /// Rebuild the world from a document. Three phases, in mandatory order:
    /// instantiate all nodes via the registry, wire all connections by
    /// identity, then deserialize per-node state.
    pub fn from_document(&mut self, doc: &Value, registry: &NodeRegistry) -> Result<LoadReport> {
        let root = doc
            .as_object()
            .ok_or_else(|| CalibError::malformed("<root>", "expected an object"))?;

        self.entries.clear();
        let mut report = LoadReport::default();

        // Phase 1: instantiate every node by its recorded type name. A key
        // is either a bare type name or "<TypeName>_<instanceIndex>".
        let mut loaded: Vec<(NodeId, &str, &Value)> = Vec::new();
        let mut id_of_key: HashMap<&str, NodeId> = HashMap::new();
        for (key, node_doc) in root {
            let node = registry.create(key).ok().or_else(|| {
                let (prefix, suffix) = key.rsplit_once('_')?;
                suffix.parse::<usize>().ok()?;
                registry.create(prefix).ok()
            });
            let Some(node) = node else {
                tracing::warn!("Skipping node entry '{}': no registered factory", key);
                report.nodes_skipped += 1;
                continue;
            };
            let id = self.add(node);
            id_of_key.insert(key.as_str(), id);
            loaded.push((id, key.as_str(), node_doc));
        }

        // Phase 2: re-establish declared connections by identity.
        for (id, key, node_doc) in &loaded {
            let Some(connections) = node_doc.get("connections").and_then(|c| c.as_object())
            else {
                continue;
            };
            for (pin, target) in connections {
                let target_key = match target.as_str() {
                    Some(k) => k,
                    None => continue, // null = deliberately unwired
                };
                match id_of_key.get(target_key) {
                    Some(&target_id) => {
                        if let Some(node) = self.get_mut(*id) {
                            match node.set_pin_target(pin, Some(target_id)) {
                                Ok(()) => report.connections_resolved += 1,
                                Err(e) => {
                                    tracing::warn!("Connection '{}.{}': {}", key, pin, e);
                                    report.connections_dangling += 1;
                                }
                            }
                        }
                    }
                    None => {
                        tracing::warn!(
                            "Connection '{}.{}' targets missing node '{}'; left absent",
                            key,
                            pin,
                            target_key
                        );
                        report.connections_dangling += 1;
                    }
                }
            }
        }

        // Phase 3: deserialize per-node state.
        for (id, key, node_doc) in &loaded {
            let Some(node) = self.get_mut(*id) else {
                continue;
            };
            match node.deserialize(node_doc) {
                Ok(counts) => {
                    report.nodes_restored += 1;
                    report.captures.absorb(counts);
                }
                Err(e) => {
                    tracing::warn!("Node '{}' failed to deserialize: {}", key, e);
                    report.nodes_skipped += 1;
                }
            }
        }

        Ok(report)
    }

    /// Save the whole world as pretty-printed JSON.
    pub fn save_all(&self, path: impl AsRef<Path>) -> Result<SaveReport> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CalibError::Persistence(format!("Failed to create world directory: {}", e))
            })?;
        }
        let content = serde_json::to_string_pretty(&self.to_document())?;
        std::fs::write(path, content).map_err(|e| {
            CalibError::Persistence(format!("Failed to write world file {:?}: {}", path, e))
        })?;
        let report = SaveReport {
            nodes_saved: self.entries.len(),
        };
        tracing::info!("Saved {} nodes to {:?}", report.nodes_saved, path);
        Ok(report)
    }

    /// Load the whole world from a JSON snapshot.
    pub fn load_all(&mut self, path: impl AsRef<Path>, registry: &NodeRegistry) -> Result<LoadReport> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CalibError::Persistence(format!("Failed to read world file {:?}: {}", path, e))
        })?;
        let doc: Value = serde_json::from_str(&content)?;
        let report = self.from_document(&doc, registry)?;
        tracing::info!("Loaded world from {:?}: {}", path, report);
        Ok(report)
    }
}
