// SPDX-License-Identifier: MIT OR Apache-2.0
//! Nodes: the units of computation, their lifecycle and pin management.

use crate::data::DataSource;
use crate::event::{Observers, ScriptEvent};
use crate::pin::{
    sever_all, InputPin, InputPinCollection, OutputPin, OutputPinCollection, Pin, PinCollection,
    PinCollectionId, PinDirection, PinId,
};
use crate::script::OrderState;
use crate::value::{CastError, PinValue, Value, ValueKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Error raised by a node while touching its pins or evaluating.
///
/// During a run these never propagate past the node boundary: the node is
/// marked broken and the rest of the script keeps running.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// The pin does not exist
    #[error("unknown pin: {0:?}")]
    UnknownPin(PinId),

    /// The pin belongs to a different node
    #[error("pin {0:?} is not owned by this node")]
    ForeignPin(PinId),

    /// The pin collection does not exist on this node
    #[error("unknown pin collection: {0:?}")]
    UnknownCollection(PinCollectionId),

    /// The pin held a value of an unexpected kind
    #[error("expected a {expected} value but the pin held {found}")]
    ValueMismatch {
        /// Kind the caller asked for
        expected: ValueKind,
        /// Kind actually held by the pin
        found: ValueKind,
    },

    /// A value could not be converted between kinds
    #[error(transparent)]
    Cast(#[from] CastError),

    /// The collection may not shrink below its minimum size
    #[error("the pin collection is at its minimum size")]
    CollectionAtMinimum,

    /// Division by zero inside an evaluation
    #[error("division by zero")]
    DivisionByZero,

    /// The script has no data source attached
    #[error("the script has no data source attached")]
    NoDataSource,

    /// Any other node-specific failure
    #[error("{0}")]
    Other(String),
}

/// The computation carried by a node.
///
/// One boxed instance exists per node. All pin access goes through the
/// [`NodeContext`]; any returned error breaks the node without stopping
/// the surrounding run.
pub trait NodeBehavior: Send {
    /// Called once after the owning script's full node and connection set
    /// is in place, so the behavior may inspect its own connections.
    fn initialize(&mut self, _ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        Ok(())
    }

    /// Read input pins and write output pins. Upstream nodes have already
    /// evaluated; input pins hold their propagated values.
    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError>;

    /// Replace the behavior's configuration from a persisted blob.
    ///
    /// Behaviors with configurable pin layouts rebuild their pins here via
    /// the bucket-backed context operations. Malformed blobs must fall
    /// back to defaults (see [`crate::storage::decode_or_default`]).
    fn apply_storage(&mut self, _blob: &str, _ctx: &mut NodeContext<'_>) {}

    /// Serialize the behavior's configuration, if it has any.
    fn storage(&self) -> Option<String> {
        None
    }
}

/// A node in a script.
#[derive(Debug)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) kind_id: String,
    /// Display name
    pub name: String,
    /// Display description
    pub description: String,
    pub(crate) position: [f32; 2],
    pub(crate) is_exit: bool,
    pub(crate) is_default: bool,
    pub(crate) broken: Option<String>,
    pub(crate) pins: Vec<PinId>,
    pub(crate) collections: Vec<PinCollection>,
    pub(crate) input_bucket: Vec<PinId>,
    pub(crate) output_bucket: Vec<PinId>,
}

impl Node {
    /// The node's identity, preserved across save/load.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Identifier of the node kind this node was built from.
    pub fn kind_id(&self) -> &str {
        &self.kind_id
    }

    /// Designer position; has no effect on evaluation.
    pub fn position(&self) -> [f32; 2] {
        self.position
    }

    /// Whether this node's input is read as the script result.
    pub fn is_exit(&self) -> bool {
        self.is_exit
    }

    /// Whether the editor must refuse to delete this node.
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Whether the node's last initialize or evaluate faulted.
    pub fn is_broken(&self) -> bool {
        self.broken.is_some()
    }

    /// Human-readable reason the node is broken, if it is.
    pub fn break_reason(&self) -> Option<&str> {
        self.broken.as_deref()
    }

    /// The attached pins, in creation order. Collection members are held
    /// by their collection instead.
    pub fn pins(&self) -> &[PinId] {
        &self.pins
    }

    /// The node's pin collections, in creation order.
    pub fn collections(&self) -> &[PinCollection] {
        &self.collections
    }

    /// Look up one of the node's pin collections.
    pub fn collection(&self, id: PinCollectionId) -> Option<&PinCollection> {
        self.collections.iter().find(|c| c.id == id)
    }

    /// Retired pins of the given direction, reused when pin layouts regrow.
    pub fn bucket(&self, direction: PinDirection) -> &[PinId] {
        match direction {
            PinDirection::Input => &self.input_bucket,
            PinDirection::Output => &self.output_bucket,
        }
    }

    pub(crate) fn break_with(&mut self, reason: String) {
        tracing::warn!(node = %self.name, %reason, "node broke");
        self.broken = Some(reason);
    }

    pub(crate) fn clear_broken(&mut self) {
        self.broken = None;
    }

    /// Attached pins followed by collection members: everything that takes
    /// part in reset and propagation.
    pub(crate) fn live_pin_ids(&self) -> Vec<PinId> {
        let mut ids = self.pins.clone();
        for collection in &self.collections {
            ids.extend_from_slice(&collection.pins);
        }
        ids
    }

    /// Every pin the node has ever created, bucket contents included.
    pub(crate) fn owned_pin_ids(&self) -> Vec<PinId> {
        let mut ids = self.live_pin_ids();
        for id in self.input_bucket.iter().chain(&self.output_bucket) {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }
}

/// Pin-layout builder handed to a node kind's build function.
pub struct NodeBuilder {
    node: NodeId,
    pub(crate) arena: Vec<Pin>,
    pub(crate) fixed: Vec<PinId>,
    pub(crate) collections: Vec<PinCollection>,
    pub(crate) input_bucket: Vec<PinId>,
    pub(crate) output_bucket: Vec<PinId>,
}

impl NodeBuilder {
    pub(crate) fn new(node: NodeId) -> Self {
        Self {
            node,
            arena: Vec::new(),
            fixed: Vec::new(),
            collections: Vec::new(),
            input_bucket: Vec::new(),
            output_bucket: Vec::new(),
        }
    }

    /// Create a typed input pin.
    pub fn input<T: PinValue>(&mut self, name: &str) -> InputPin<T> {
        InputPin::new(self.pin(PinDirection::Input, T::KIND, name))
    }

    /// Create a typed output pin.
    pub fn output<T: PinValue>(&mut self, name: &str) -> OutputPin<T> {
        OutputPin::new(self.pin(PinDirection::Output, T::KIND, name))
    }

    /// Create an input pin of a runtime-chosen kind.
    pub fn input_kind(&mut self, kind: ValueKind, name: &str) -> PinId {
        self.pin(PinDirection::Input, kind, name)
    }

    /// Create an output pin of a runtime-chosen kind.
    pub fn output_kind(&mut self, kind: ValueKind, name: &str) -> PinId {
        self.pin(PinDirection::Output, kind, name)
    }

    /// Create a typed input pin collection with `initial_count` members.
    pub fn input_collection<T: PinValue>(
        &mut self,
        name: &str,
        initial_count: usize,
    ) -> InputPinCollection<T> {
        InputPinCollection::new(self.collection(PinDirection::Input, T::KIND, name, initial_count))
    }

    /// Create a typed output pin collection with `initial_count` members.
    pub fn output_collection<T: PinValue>(
        &mut self,
        name: &str,
        initial_count: usize,
    ) -> OutputPinCollection<T> {
        OutputPinCollection::new(self.collection(PinDirection::Output, T::KIND, name, initial_count))
    }

    fn pin(&mut self, direction: PinDirection, kind: ValueKind, name: &str) -> PinId {
        let pin = Pin::new(self.node, direction, kind, name.to_string());
        let id = pin.id();
        self.arena.push(pin);
        self.fixed.push(id);
        id
    }

    fn collection(
        &mut self,
        direction: PinDirection,
        kind: ValueKind,
        name: &str,
        initial_count: usize,
    ) -> PinCollectionId {
        let mut members = Vec::with_capacity(initial_count);
        for _ in 0..initial_count {
            let pin = Pin::new(self.node, direction, kind, String::new());
            members.push(pin.id());
            match direction {
                PinDirection::Input => self.input_bucket.push(pin.id()),
                PinDirection::Output => self.output_bucket.push(pin.id()),
            }
            self.arena.push(pin);
        }

        let collection = PinCollection {
            id: PinCollectionId::new(),
            name: name.to_string(),
            direction,
            kind,
            pins: members,
            min_size: 1,
        };
        let id = collection.id;
        self.collections.push(collection);
        id
    }
}

/// A node's view of itself during initialize, evaluate and storage
/// application: typed pin access plus the bucket-backed structural
/// operations dynamic-arity nodes rely on.
pub struct NodeContext<'a> {
    pub(crate) node: &'a mut Node,
    pub(crate) pins: &'a mut IndexMap<PinId, Pin>,
    pub(crate) observers: &'a mut Observers,
    pub(crate) order: &'a mut OrderState,
    pub(crate) data_source: Option<&'a dyn DataSource>,
}

impl NodeContext<'_> {
    /// The node this context belongs to.
    pub fn node(&self) -> &Node {
        self.node
    }

    /// The host data source attached to the script, if any.
    pub fn data_source(&self) -> Option<&dyn DataSource> {
        self.data_source
    }

    fn pin_checked(&self, pin: PinId) -> Result<&Pin, NodeError> {
        let found = self.pins.get(&pin).ok_or(NodeError::UnknownPin(pin))?;
        if found.node() != self.node.id {
            return Err(NodeError::ForeignPin(pin));
        }
        Ok(found)
    }

    /// Read a typed input pin.
    pub fn read<T: PinValue>(&self, pin: &InputPin<T>) -> Result<T, NodeError> {
        self.read_pin(pin.id())
    }

    /// Write a typed output pin.
    pub fn write<T: PinValue>(&mut self, pin: &OutputPin<T>, value: T) -> Result<(), NodeError> {
        self.write_pin(pin.id(), value.into_value())
    }

    /// Read any of the node's pins as the given Rust type, converting
    /// numerics as needed.
    pub fn read_pin<T: PinValue>(&self, pin: PinId) -> Result<T, NodeError> {
        let pin = self.pin_checked(pin)?;
        T::from_value(pin.value()).ok_or(NodeError::ValueMismatch {
            expected: T::KIND,
            found: pin.value().kind(),
        })
    }

    /// Write a raw value to any of the node's pins, converting it to the
    /// pin's declared kind.
    pub fn write_pin(&mut self, pin: PinId, value: Value) -> Result<(), NodeError> {
        self.pin_checked(pin)?;
        let declared = self.pins[&pin].kind();
        let converted = value.cast_to(declared)?;
        if let Some(stored) = self.pins.get_mut(&pin) {
            stored.value = converted;
        }
        Ok(())
    }

    /// The declared kind of one of the node's pins.
    pub fn pin_kind(&self, pin: PinId) -> Result<ValueKind, NodeError> {
        Ok(self.pin_checked(pin)?.kind())
    }

    /// The member pins of one of the node's collections, in order.
    pub fn collection_pins(&self, collection: PinCollectionId) -> Result<Vec<PinId>, NodeError> {
        self.node
            .collection(collection)
            .map(|c| c.pins.to_vec())
            .ok_or(NodeError::UnknownCollection(collection))
    }

    /// Read every member of a typed input pin collection.
    pub fn read_collection<T: PinValue>(
        &self,
        collection: &InputPinCollection<T>,
    ) -> Result<Vec<T>, NodeError> {
        self.collection_pins(collection.id())?
            .into_iter()
            .map(|pin| self.read_pin(pin))
            .collect()
    }

    /// Create or reuse an input pin through the node's retirement bucket.
    ///
    /// Reuse keeps pin identity stable while a node's arity is edited, so
    /// cable references held by undo/redo commands stay valid. Numeric
    /// kinds are normalized to [`ValueKind::Numeric`].
    pub fn create_or_add_input_pin(&mut self, kind: ValueKind, name: &str) -> PinId {
        self.create_or_add(PinDirection::Input, kind, name)
    }

    /// Create or reuse an output pin through the node's retirement bucket.
    pub fn create_or_add_output_pin(&mut self, kind: ValueKind, name: &str) -> PinId {
        self.create_or_add(PinDirection::Output, kind, name)
    }

    fn create_or_add(&mut self, direction: PinDirection, kind: ValueKind, name: &str) -> PinId {
        let kind = kind.normalized();
        let bucket = match direction {
            PinDirection::Input => &self.node.input_bucket,
            PinDirection::Output => &self.node.output_bucket,
        };
        let reuse = bucket
            .iter()
            .copied()
            .find(|id| self.pins.get(id).is_some_and(|p| !p.is_attached()));

        let id = match reuse {
            Some(id) => {
                if let Some(pin) = self.pins.get_mut(&id) {
                    pin.change_kind(kind);
                    pin.name = name.to_string();
                    pin.attached = true;
                }
                id
            }
            None => {
                let pin = Pin::new(self.node.id, direction, kind, name.to_string());
                let id = pin.id();
                self.pins.insert(id, pin);
                match direction {
                    PinDirection::Input => self.node.input_bucket.push(id),
                    PinDirection::Output => self.node.output_bucket.push(id),
                }
                id
            }
        };

        self.node.pins.push(id);
        self.order.invalidate();
        self.observers.emit(ScriptEvent::PinAdded {
            node: self.node.id,
            pin: id,
        });
        id
    }

    /// Reattach a previously detached pin. Fails for pins owned by a
    /// different node.
    pub fn attach_pin(&mut self, pin: PinId) -> Result<(), NodeError> {
        self.pin_checked(pin)?;
        if self.node.pins.contains(&pin) {
            return Ok(());
        }

        if let Some(stored) = self.pins.get_mut(&pin) {
            stored.attached = true;
        }
        self.node.pins.push(pin);
        self.order.invalidate();
        self.observers.emit(ScriptEvent::PinAdded {
            node: self.node.id,
            pin,
        });
        Ok(())
    }

    /// Detach a pin from the node: it is disconnected, removed from the
    /// pin list and retained (with its identity) for later reattachment.
    pub fn detach_pin(&mut self, pin: PinId) -> Result<(), NodeError> {
        self.pin_checked(pin)?;
        if !self.node.pins.contains(&pin) {
            return Err(NodeError::ForeignPin(pin));
        }

        sever_all(self.pins, pin);
        self.node.pins.retain(|id| *id != pin);
        if let Some(stored) = self.pins.get_mut(&pin) {
            stored.attached = false;
        }
        self.order.invalidate();
        self.observers.emit(ScriptEvent::PinRemoved {
            node: self.node.id,
            pin,
        });
        Ok(())
    }

    /// Grow a pin collection by one member, reusing a retired pin of the
    /// matching direction and kind when one is available.
    pub fn collection_add(&mut self, collection: PinCollectionId) -> Result<PinId, NodeError> {
        let index = self
            .node
            .collections
            .iter()
            .position(|c| c.id == collection)
            .ok_or(NodeError::UnknownCollection(collection))?;
        let (direction, kind) = {
            let c = &self.node.collections[index];
            (c.direction, c.kind)
        };

        let bucket = match direction {
            PinDirection::Input => &self.node.input_bucket,
            PinDirection::Output => &self.node.output_bucket,
        };
        let reuse = bucket.iter().copied().find(|id| {
            self.pins
                .get(id)
                .is_some_and(|p| !p.is_attached() && p.kind() == kind)
        });

        let id = match reuse {
            Some(id) => {
                if let Some(pin) = self.pins.get_mut(&id) {
                    pin.attached = true;
                    pin.reset();
                }
                id
            }
            None => {
                let pin = Pin::new(self.node.id, direction, kind, String::new());
                let id = pin.id();
                self.pins.insert(id, pin);
                match direction {
                    PinDirection::Input => self.node.input_bucket.push(id),
                    PinDirection::Output => self.node.output_bucket.push(id),
                }
                id
            }
        };

        self.node.collections[index].pins.push(id);
        self.order.invalidate();
        self.observers.emit(ScriptEvent::PinAdded {
            node: self.node.id,
            pin: id,
        });
        Ok(id)
    }

    /// Shrink a pin collection: the member is disconnected and parked in
    /// the retirement bucket. Rejected at the collection's minimum size.
    pub fn collection_remove(
        &mut self,
        collection: PinCollectionId,
        pin: PinId,
    ) -> Result<(), NodeError> {
        let index = self
            .node
            .collections
            .iter()
            .position(|c| c.id == collection)
            .ok_or(NodeError::UnknownCollection(collection))?;
        if !self.node.collections[index].pins.contains(&pin) {
            return Err(NodeError::ForeignPin(pin));
        }
        if self.node.collections[index].pins.len() <= self.node.collections[index].min_size {
            return Err(NodeError::CollectionAtMinimum);
        }

        sever_all(self.pins, pin);
        self.node.collections[index].pins.retain(|id| *id != pin);
        if let Some(stored) = self.pins.get_mut(&pin) {
            stored.attached = false;
        }
        self.order.invalidate();
        self.observers.emit(ScriptEvent::PinRemoved {
            node: self.node.id,
            pin,
        });
        Ok(())
    }

    /// Remove a whole pin collection; members are disconnected and parked.
    pub fn remove_collection(&mut self, collection: PinCollectionId) -> Result<(), NodeError> {
        let index = self
            .node
            .collections
            .iter()
            .position(|c| c.id == collection)
            .ok_or(NodeError::UnknownCollection(collection))?;

        let members = self.node.collections[index].pins.clone();
        for pin in members {
            sever_all(self.pins, pin);
            if let Some(stored) = self.pins.get_mut(&pin) {
                stored.attached = false;
            }
        }
        self.node.collections.remove(index);
        self.order.invalidate();
        self.observers.emit(ScriptEvent::PinCollectionRemoved {
            node: self.node.id,
            collection,
        });
        Ok(())
    }
}
