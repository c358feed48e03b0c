// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pins and pin collections: the typed connection points owned by nodes.

use crate::node::NodeId;
use crate::value::{PinValue, Value, ValueKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use uuid::Uuid;

/// Unique identifier for a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinId(pub Uuid);

impl PinId {
    /// Create a new random pin ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PinId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a pin collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinCollectionId(pub Uuid);

impl PinCollectionId {
    /// Create a new random pin collection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PinCollectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinDirection {
    /// Input pin, holds at most one connection
    Input,
    /// Output pin, holds any number of connections
    Output,
}

/// A single typed connection point.
///
/// Pins live in their script's arena and are referenced by [`PinId`];
/// connections are stored as ID pairs on both endpoints. A pin whose
/// `attached` flag is false is parked in its node's retirement bucket and
/// keeps its identity for later reuse.
#[derive(Debug, Clone)]
pub struct Pin {
    pub(crate) id: PinId,
    pub(crate) node: NodeId,
    pub(crate) name: String,
    pub(crate) direction: PinDirection,
    pub(crate) kind: ValueKind,
    pub(crate) value: Value,
    pub(crate) connections: Vec<PinId>,
    pub(crate) attached: bool,
}

impl Pin {
    pub(crate) fn new(node: NodeId, direction: PinDirection, kind: ValueKind, name: String) -> Self {
        Self {
            id: PinId::new(),
            node,
            name,
            direction,
            kind,
            value: Value::default_for(kind),
            connections: Vec::new(),
            attached: true,
        }
    }

    /// The pin's identity, stable for the lifetime of its node.
    pub fn id(&self) -> PinId {
        self.id
    }

    /// The node owning this pin.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Display name of the pin.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direction of the pin.
    pub fn direction(&self) -> PinDirection {
        self.direction
    }

    /// Declared value kind of the pin.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Current value of the pin.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The pins this pin is connected to.
    pub fn connections(&self) -> &[PinId] {
        &self.connections
    }

    /// Whether the pin has at least one connection.
    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }

    /// Whether the pin is currently attached to its node (as opposed to
    /// parked in the retirement bucket).
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub(crate) fn reset(&mut self) {
        self.value = Value::default_for(self.kind);
    }

    /// Retype a bucket pin for reuse; resets the value to the new default.
    pub(crate) fn change_kind(&mut self, kind: ValueKind) {
        self.kind = kind;
        self.value = Value::default_for(kind);
    }
}

/// An ordered, dynamically-sized group of same-direction, same-kind pins.
///
/// Members removed from the collection are parked in the owning node's
/// retirement bucket; growing the collection reuses parked pins first so
/// identities survive shrink/regrow cycles.
#[derive(Debug, Clone)]
pub struct PinCollection {
    pub(crate) id: PinCollectionId,
    pub(crate) name: String,
    pub(crate) direction: PinDirection,
    pub(crate) kind: ValueKind,
    pub(crate) pins: Vec<PinId>,
    pub(crate) min_size: usize,
}

impl PinCollection {
    /// The collection's identity.
    pub fn id(&self) -> PinCollectionId {
        self.id
    }

    /// Display name of the collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direction shared by every member pin.
    pub fn direction(&self) -> PinDirection {
        self.direction
    }

    /// Value kind shared by every member pin.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// The member pins, in order.
    pub fn pins(&self) -> &[PinId] {
        &self.pins
    }

    /// Members may not be removed below this size.
    pub fn min_size(&self) -> usize {
        self.min_size
    }
}

/// Sever every connection of `pin`, removing the backreference from each
/// peer. Values are left untouched. Returns whether anything was severed.
pub(crate) fn sever_all(pins: &mut IndexMap<PinId, Pin>, pin: PinId) -> bool {
    let peers = match pins.get_mut(&pin) {
        Some(p) => std::mem::take(&mut p.connections),
        None => return false,
    };
    for peer in &peers {
        if let Some(other) = pins.get_mut(peer) {
            other.connections.retain(|id| *id != pin);
        }
    }
    !peers.is_empty()
}

/// Typed handle to an input pin, held by a node behavior.
pub struct InputPin<T> {
    id: PinId,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PinValue> InputPin<T> {
    pub(crate) fn new(id: PinId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// The pin this handle refers to.
    pub fn id(&self) -> PinId {
        self.id
    }
}

impl<T> Clone for InputPin<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for InputPin<T> {}

/// Typed handle to an output pin, held by a node behavior.
pub struct OutputPin<T> {
    id: PinId,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PinValue> OutputPin<T> {
    pub(crate) fn new(id: PinId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// The pin this handle refers to.
    pub fn id(&self) -> PinId {
        self.id
    }
}

impl<T> Clone for OutputPin<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for OutputPin<T> {}

/// Typed handle to an input pin collection, held by a node behavior.
pub struct InputPinCollection<T> {
    id: PinCollectionId,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PinValue> InputPinCollection<T> {
    pub(crate) fn new(id: PinCollectionId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// The collection this handle refers to.
    pub fn id(&self) -> PinCollectionId {
        self.id
    }
}

impl<T> Clone for InputPinCollection<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for InputPinCollection<T> {}

/// Typed handle to an output pin collection, held by a node behavior.
pub struct OutputPinCollection<T> {
    id: PinCollectionId,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PinValue> OutputPinCollection<T> {
    pub(crate) fn new(id: PinCollectionId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// The collection this handle refers to.
    pub fn id(&self) -> PinCollectionId {
        self.id
    }
}

impl<T> Clone for OutputPinCollection<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for OutputPinCollection<T> {}
