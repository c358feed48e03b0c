// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node-kind descriptors and the registry mapping persisted kind
//! identifiers to them.
//!
//! The registry is an explicitly constructed object handed to the engine;
//! there is no process-wide store. Plugins register their kinds under a
//! source tag and unregister them again on unload.

use crate::node::{NodeBehavior, NodeBuilder};
use indexmap::IndexMap;
use std::any::Any;

/// Coarse grouping of node kinds, used by pickers in an editor layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCategory {
    /// Graph result sinks
    Exit,
    /// Constant values
    Constant,
    /// Numeric operations
    Math,
    /// Boolean operations
    Logic,
    /// Host data-model access
    DataModel,
    /// Everything else
    Custom,
}

/// Builds a node's pin layout and returns its behavior.
pub type BuildFn = fn(&mut NodeBuilder) -> Box<dyn NodeBehavior>;

/// Builds an opaque companion object for a node kind (editor view state);
/// the engine only transports it.
pub type CompanionFn = fn() -> Box<dyn Any + Send>;

/// Describes one kind of node: identity, display metadata and the
/// functions that bring an instance to life.
pub struct NodeKind {
    /// Persisted kind identifier
    pub id: String,
    /// Display name for new instances
    pub name: String,
    /// Display description for new instances
    pub description: String,
    /// Picker category
    pub category: NodeCategory,
    /// Whether instances act as a script's result sink
    pub is_exit: bool,
    /// Whether the editor must refuse to delete instances
    pub is_default: bool,
    /// Pin layout and behavior constructor
    pub build: BuildFn,
    /// Optional companion-object factory
    pub companion: Option<CompanionFn>,
}

struct Registration {
    kind: NodeKind,
    source: Option<String>,
}

/// Registry of available node kinds.
#[derive(Default)]
pub struct NodeRegistry {
    kinds: IndexMap<String, Registration>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node kind owned by the engine's host.
    pub fn register(&mut self, kind: NodeKind) {
        self.kinds.insert(kind.id.clone(), Registration { kind, source: None });
    }

    /// Register a node kind on behalf of a plugin identified by `source`.
    pub fn register_from(&mut self, source: &str, kind: NodeKind) {
        self.kinds.insert(
            kind.id.clone(),
            Registration {
                kind,
                source: Some(source.to_string()),
            },
        );
    }

    /// Remove a single kind; returns whether it was present.
    pub fn unregister(&mut self, id: &str) -> bool {
        self.kinds.shift_remove(id).is_some()
    }

    /// Remove every kind registered by `source` (plugin unload); returns
    /// how many were removed.
    pub fn unregister_source(&mut self, source: &str) -> usize {
        let before = self.kinds.len();
        self.kinds
            .retain(|_, registration| registration.source.as_deref() != Some(source));
        before - self.kinds.len()
    }

    /// Look up a kind by its persisted identifier.
    pub fn get(&self, id: &str) -> Option<&NodeKind> {
        self.kinds.get(id).map(|r| &r.kind)
    }

    /// All registered kinds, in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = &NodeKind> {
        self.kinds.values().map(|r| &r.kind)
    }

    /// Registered kinds in a given category.
    pub fn kinds_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeKind> {
        self.kinds().filter(move |k| k.category == category)
    }

    /// Build the companion object for a kind, if it declares one.
    pub fn companion_for(&self, id: &str) -> Option<Box<dyn Any + Send>> {
        self.get(id).and_then(|kind| kind.companion.map(|f| f()))
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("kinds", &self.kinds.keys().collect::<Vec<_>>())
            .finish()
    }
}
