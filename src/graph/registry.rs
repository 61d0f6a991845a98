//! Node factory registry: data-driven node instantiation.
//!
//! The registry is the single source of truth mapping a stored type-name
//! string to a constructor, so a world document can be rebuilt without any
//! reflection. Every compiled-in node variant registers itself at process
//! start (see `nodes::register_builtins`); an unknown name during load is a
//! recoverable per-node error, not a fatal one.

use crate::error::{CalibError, Result};
use crate::graph::node::Node;
use std::collections::HashMap;

/// Factory function producing a fresh, un-initialized node.
pub type NodeFactory = fn() -> Box<dyn Node>;

/// Registration table: type name → constructor.
#[derive(Default)]
pub struct NodeRegistry {
    factories: HashMap<&'static str, NodeFactory>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node type. Re-registering a name replaces the factory.
    pub fn register(&mut self, type_name: &'static str, factory: NodeFactory) {
        self.factories.insert(type_name, factory);
    }

    /// Whether a type name has a registered factory.
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Instantiate a node from its stored type name.
    pub fn create(&self, type_name: &str) -> Result<Box<dyn Node>> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| CalibError::UnknownNodeType(type_name.to_string()))?;
        Ok(factory())
    }

    /// Registered type names, for diagnostics.
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::set::RestoreCounts;
    use serde_json::{json, Value};

    struct Dummy;

    impl Node for Dummy {
        fn type_name(&self) -> &'static str {
            "Dummy"
        }

        fn serialize(&self) -> Value {
            json!({})
        }

        fn deserialize(&mut self, _doc: &Value) -> crate::error::Result<RestoreCounts> {
            Ok(RestoreCounts::default())
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    #[test]
    fn test_registry_create() {
        let mut registry = NodeRegistry::new();
        registry.register("Dummy", || Box::new(Dummy));
        assert!(registry.contains("Dummy"));
        let node = registry.create("Dummy").unwrap();
        assert_eq!(node.type_name(), "Dummy");
    }

    #[test]
    fn test_registry_unknown_type() {
        let registry = NodeRegistry::new();
        let err = registry.create("Ghost").unwrap_err();
        assert!(matches!(err, CalibError::UnknownNodeType(_)));
    }
}
