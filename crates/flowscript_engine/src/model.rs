// SPDX-License-Identifier: MIT OR Apache-2.0
//! Save/load models for scripts.
//!
//! Pin IDs are minted fresh on every load, so persisted connections do not
//! reference them. Instead a pin is addressed by a stable locator: the
//! index of an attached pin in its node's pin list, or a collection/member
//! index pair. Node and script IDs are preserved verbatim.

use crate::node::NodeId;
use crate::pin::{PinDirection, PinId};
use crate::registry::NodeRegistry;
use crate::script::{GraphError, NodeScript, ScriptId};
use crate::storage::StorageError;
use serde::{Deserialize, Serialize};

/// Stable address of a pin within its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinLocator {
    /// Index into the node's attached pin list
    Fixed(usize),
    /// Member of one of the node's pin collections
    Collection {
        /// Index of the collection on the node
        collection: usize,
        /// Index of the member within the collection
        member: usize,
    },
}

/// Stable address of a pin within a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinAddress {
    /// Node owning the pin
    pub node: NodeId,
    /// Where on the node the pin sits
    pub locator: PinLocator,
}

/// A persisted connection between an output pin and an input pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionModel {
    /// Source side
    pub output: PinAddress,
    /// Sink side
    pub input: PinAddress,
}

/// A persisted node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeModel {
    /// Node identity, preserved across save/load
    pub id: NodeId,
    /// Kind identifier resolved through the registry on load
    pub kind: String,
    /// Display name
    pub name: String,
    /// Display description
    pub description: String,
    /// Designer position
    pub position: [f32; 2],
    /// Opaque configuration blob, if the kind has any
    pub storage: Option<String>,
    /// Member count of each pin collection, in collection order
    pub collection_sizes: Vec<usize>,
}

/// A persisted script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptModel {
    /// Script identity, preserved across save/load
    pub id: ScriptId,
    /// Display name
    pub name: String,
    /// Display description
    pub description: String,
    /// Nodes in insertion order
    pub nodes: Vec<NodeModel>,
    /// Connections, addressed by pin locators
    pub connections: Vec<ConnectionModel>,
}

impl ScriptModel {
    /// Export the model as pretty-printed RON.
    pub fn to_ron(&self) -> Result<String, StorageError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Import a model from RON text.
    pub fn from_ron(text: &str) -> Result<Self, LoadError> {
        Ok(ron::from_str(text)?)
    }
}

/// Error produced while loading a script from its model.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The registry does not know a persisted kind identifier
    #[error("unknown node kind: {0}")]
    UnknownKind(String),

    /// A structural operation failed during reassembly
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The RON text did not parse as a script model
    #[error("failed to parse script model: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

impl NodeScript {
    /// Snapshot the script into its persistable model.
    pub fn to_model(&self) -> ScriptModel {
        let nodes = self
            .nodes
            .values()
            .map(|node| NodeModel {
                id: node.id(),
                kind: node.kind_id().to_string(),
                name: node.name.clone(),
                description: node.description.clone(),
                position: node.position(),
                storage: self.behaviors.get(&node.id()).and_then(|b| b.storage()),
                collection_sizes: node.collections().iter().map(|c| c.pins().len()).collect(),
            })
            .collect();

        let mut connections = Vec::new();
        for pin in self.pins.values() {
            if pin.direction() != PinDirection::Output {
                continue;
            }
            let Some(output) = locate(self, pin.id()) else { continue };
            for peer in pin.connections() {
                if let Some(input) = locate(self, *peer) {
                    connections.push(ConnectionModel { output, input });
                }
            }
        }

        ScriptModel {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            nodes,
            connections,
        }
    }

    /// Reassemble a script from its model.
    ///
    /// Nodes are instantiated through the registry, their storage applied,
    /// collections grown to their persisted sizes and connections restored
    /// before every node is initialized. A connection whose endpoints no
    /// longer resolve (a kind's pin layout changed since the save) is
    /// logged and skipped rather than failing the load.
    pub fn from_model(model: &ScriptModel, registry: &NodeRegistry) -> Result<Self, LoadError> {
        let mut script = NodeScript::new(model.name.clone());
        script.id = model.id;
        script.description = model.description.clone();

        for node_model in &model.nodes {
            let kind = registry
                .get(&node_model.kind)
                .ok_or_else(|| LoadError::UnknownKind(node_model.kind.clone()))?;
            script.instantiate(kind, node_model.id)?;
            if let Some(node) = script.nodes.get_mut(&node_model.id) {
                node.name = node_model.name.clone();
                node.description = node_model.description.clone();
                node.position = node_model.position;
            }
            if let Some(blob) = &node_model.storage {
                script.update_storage(node_model.id, blob)?;
            }

            for (index, size) in node_model.collection_sizes.iter().enumerate() {
                let Some(collection) = script
                    .node(node_model.id)
                    .and_then(|n| n.collections().get(index))
                else {
                    tracing::warn!(
                        node = ?node_model.id,
                        index,
                        "persisted pin collection no longer exists, skipping"
                    );
                    continue;
                };
                let collection = collection.id();
                while script
                    .node(node_model.id)
                    .and_then(|n| n.collection(collection))
                    .map_or(0, |c| c.pins().len())
                    < *size
                {
                    script.collection_add(node_model.id, collection)?;
                }
            }
        }

        for connection in &model.connections {
            let output = resolve(&script, &connection.output);
            let input = resolve(&script, &connection.input);
            match (output, input) {
                (Some(output), Some(input)) => {
                    if let Err(error) = script.connect(output, input) {
                        tracing::warn!(%error, "persisted connection rejected, skipping");
                    }
                }
                _ => {
                    tracing::warn!(?connection, "persisted connection no longer resolves, skipping");
                }
            }
        }

        let ids: Vec<NodeId> = script.node_ids().collect();
        for id in ids {
            script.try_initialize(id);
        }
        Ok(script)
    }
}

fn locate(script: &NodeScript, pin: PinId) -> Option<PinAddress> {
    let owner = script.pins.get(&pin)?.node();
    let node = script.nodes.get(&owner)?;
    if let Some(index) = node.pins().iter().position(|id| *id == pin) {
        return Some(PinAddress {
            node: owner,
            locator: PinLocator::Fixed(index),
        });
    }
    for (collection, c) in node.collections().iter().enumerate() {
        if let Some(member) = c.pins().iter().position(|id| *id == pin) {
            return Some(PinAddress {
                node: owner,
                locator: PinLocator::Collection { collection, member },
            });
        }
    }
    None
}

fn resolve(script: &NodeScript, address: &PinAddress) -> Option<PinId> {
    let node = script.nodes.get(&address.node)?;
    match address.locator {
        PinLocator::Fixed(index) => node.pins().get(index).copied(),
        PinLocator::Collection { collection, member } => node
            .collections()
            .get(collection)?
            .pins()
            .get(member)
            .copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::testing;

    #[test]
    fn test_model_round_trip_preserves_result() {
        let registry = testing::registry();
        let mut script = NodeScript::new("round trip");
        let lhs = script.add_node(registry.get("test_constant").unwrap()).unwrap();
        let rhs = script.add_node(registry.get("test_constant").unwrap()).unwrap();
        let add = script.add_node(registry.get("test_add").unwrap()).unwrap();
        let exit = script.add_node(registry.get("test_exit").unwrap()).unwrap();
        script.update_storage(lhs, &testing::constant_blob(2.0)).unwrap();
        script.update_storage(rhs, &testing::constant_blob(3.0)).unwrap();
        script
            .connect(testing::output_pin(&script, lhs), testing::input_pins(&script, add)[0])
            .unwrap();
        script
            .connect(testing::output_pin(&script, rhs), testing::input_pins(&script, add)[1])
            .unwrap();
        script
            .connect(testing::output_pin(&script, add), testing::input_pins(&script, exit)[0])
            .unwrap();

        let text = script.to_model().to_ron().unwrap();
        let mut loaded =
            NodeScript::from_model(&ScriptModel::from_ron(&text).unwrap(), &registry).unwrap();

        assert_eq!(loaded.id(), script.id());
        assert_eq!(loaded.node_count(), 4);
        assert!(loaded.node(add).is_some());
        loaded.run();
        assert_eq!(loaded.result::<f32>(), Some(5.0));
    }

    #[test]
    fn test_model_round_trip_preserves_collection_sizes() {
        let registry = testing::registry();
        let mut script = NodeScript::new("collections");
        let sum = script.add_node(registry.get("test_sum").unwrap()).unwrap();
        let collection = script.node(sum).unwrap().collections()[0].id();
        script.collection_add(sum, collection).unwrap();
        script.collection_add(sum, collection).unwrap();

        let text = script.to_model().to_ron().unwrap();
        let loaded =
            NodeScript::from_model(&ScriptModel::from_ron(&text).unwrap(), &registry).unwrap();

        let restored = loaded.node(sum).unwrap().collections()[0].pins().len();
        assert_eq!(restored, 4);
    }

    #[test]
    fn test_unknown_kind_fails_the_load() {
        let registry = registry_with_constant_only();
        let mut script = NodeScript::new("unknown");
        let full = testing::registry();
        script.add_node(full.get("test_add").unwrap()).unwrap();

        let model = script.to_model();
        let error = NodeScript::from_model(&model, &registry).unwrap_err();
        assert!(matches!(error, LoadError::UnknownKind(kind) if kind == "test_add"));
    }

    #[test]
    fn test_unresolvable_connection_is_skipped() {
        let registry = testing::registry();
        let mut script = NodeScript::new("dangling");
        let constant = script.add_node(registry.get("test_constant").unwrap()).unwrap();
        let exit = script.add_node(registry.get("test_exit").unwrap()).unwrap();

        let mut model = script.to_model();
        model.connections.push(ConnectionModel {
            output: PinAddress {
                node: constant,
                locator: PinLocator::Fixed(7),
            },
            input: PinAddress {
                node: exit,
                locator: PinLocator::Fixed(0),
            },
        });

        let mut loaded = NodeScript::from_model(&model, &registry).unwrap();
        loaded.run();
        assert!(!loaded.exit_node_connected());
    }

    fn registry_with_constant_only() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry.register(testing::constant_kind());
        registry
    }
}
