// SPDX-License-Identifier: MIT OR Apache-2.0
//! Embeddable node-based dataflow engine.
//!
//! Hosts assemble scripts out of registered node kinds, wire typed pins
//! together and run the whole graph once per tick; the value arriving at
//! the script's exit node is the result.
//!
//! ## Architecture
//!
//! The engine is built around a script-owned arena:
//! - Typed input/output pins with a numeric-unifying compatibility resolver
//! - Nodes carrying opaque behaviors with an initialize/evaluate lifecycle
//! - Cached topological evaluation with per-node failure isolation
//! - Pin retirement buckets so pin identity survives arity edits
//! - RON persistence addressing pins by stable locators

pub mod data;
pub mod event;
pub mod model;
pub mod node;
pub mod pin;
pub mod registry;
pub mod script;
pub mod shared;
pub mod storage;
pub mod value;

pub use data::DataSource;
pub use event::{ObserverId, ScriptEvent};
pub use model::{ConnectionModel, LoadError, NodeModel, PinAddress, PinLocator, ScriptModel};
pub use node::{Node, NodeBehavior, NodeBuilder, NodeContext, NodeError, NodeId};
pub use pin::{
    InputPin, InputPinCollection, OutputPin, OutputPinCollection, Pin, PinCollection,
    PinCollectionId, PinDirection, PinId,
};
pub use registry::{BuildFn, CompanionFn, NodeCategory, NodeKind, NodeRegistry};
pub use script::{ConnectError, GraphError, NodeScript, ScriptId, CYCLIC_DEPENDENCY_REASON};
pub use shared::SharedScript;
pub use storage::{decode_or_default, encode, StorageError};
pub use value::{castability, CastError, Castability, Numeric, PinValue, Value, ValueKind};
