// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural-change notifications consumed by an editor layer.
//!
//! Observers are an explicit list on the script; every notification is
//! raised after the mutation it describes has been applied.

use crate::node::NodeId;
use crate::pin::{PinCollectionId, PinId};

/// A notification about a structural or lifecycle change in a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptEvent {
    /// A pin was attached to a node
    PinAdded {
        /// Node the pin belongs to
        node: NodeId,
        /// The attached pin
        pin: PinId,
    },
    /// A pin was detached from a node (it remains in the retirement bucket)
    PinRemoved {
        /// Node the pin belonged to
        node: NodeId,
        /// The detached pin
        pin: PinId,
    },
    /// A pin collection was added to a node
    PinCollectionAdded {
        /// Node the collection belongs to
        node: NodeId,
        /// The added collection
        collection: PinCollectionId,
    },
    /// A pin collection was removed from a node
    PinCollectionRemoved {
        /// Node the collection belonged to
        node: NodeId,
        /// The removed collection
        collection: PinCollectionId,
    },
    /// A node's pins were reset ahead of evaluation
    NodeResetting {
        /// The node being reset
        node: NodeId,
    },
    /// A node's storage was replaced
    StorageModified {
        /// The node whose storage changed
        node: NodeId,
    },
}

/// Token identifying a subscribed observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type ObserverFn = Box<dyn FnMut(&ScriptEvent) + Send>;

/// Observer list owned by a script.
#[derive(Default)]
pub(crate) struct Observers {
    slots: Vec<(ObserverId, ObserverFn)>,
    next: u64,
}

impl Observers {
    pub(crate) fn subscribe(&mut self, observer: ObserverFn) -> ObserverId {
        let id = ObserverId(self.next);
        self.next += 1;
        self.slots.push((id, observer));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.slots.len();
        self.slots.retain(|(slot, _)| *slot != id);
        self.slots.len() != before
    }

    pub(crate) fn emit(&mut self, event: ScriptEvent) {
        for (_, observer) in &mut self.slots {
            observer(&event);
        }
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers").field("count", &self.slots.len()).finish()
    }
}
