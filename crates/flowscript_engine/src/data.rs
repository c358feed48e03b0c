// SPDX-License-Identifier: MIT OR Apache-2.0
//! Boundary to the host's external data model.

use crate::value::{Value, ValueKind};

/// Read access to values in the host's data model.
///
/// Implemented by the host and attached to a script; consumed by node
/// kinds that surface data-model values inside a graph. Paths are opaque
/// to the engine.
pub trait DataSource: Send + Sync {
    /// The kind of the value at `path`, if the path is valid.
    fn kind(&self, path: &str) -> Option<ValueKind>;

    /// The current value at `path`, if the path is valid.
    fn read(&self, path: &str) -> Option<Value>;
}
