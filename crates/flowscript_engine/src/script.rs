// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node scripts: the graph container and its evaluation loop.

use crate::data::DataSource;
use crate::event::{ObserverId, Observers, ScriptEvent};
use crate::node::{Node, NodeBehavior, NodeBuilder, NodeContext, NodeError, NodeId};
use crate::pin::{sever_all, Pin, PinCollectionId, PinDirection, PinId};
use crate::registry::{NodeKind, NodeRegistry};
use crate::storage::StorageError;
use crate::value::{castability, PinValue, Value, ValueKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Break reason applied to every node implicated in a dependency cycle.
pub const CYCLIC_DEPENDENCY_REASON: &str = "cyclic dependency";

/// Unique identifier for a script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptId(pub Uuid);

impl ScriptId {
    /// Create a new random script ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScriptId {
    fn default() -> Self {
        Self::new()
    }
}

/// Cached evaluation order: any structural mutation sends it back to
/// `Dirty`, the next run rebuilds it.
#[derive(Debug, Clone)]
pub(crate) enum OrderState {
    Dirty,
    Ordered(Vec<NodeId>),
}

impl OrderState {
    pub(crate) fn invalidate(&mut self) {
        *self = Self::Dirty;
    }
}

/// Rejection of a connection attempt. No state changes when one of these
/// is returned.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Pin not found in the script
    #[error("pin not found: {0:?}")]
    PinNotFound(PinId),

    /// Both pins belong to the same node
    #[error("both pins belong to the same node")]
    SameNode,

    /// Both pins have the same direction
    #[error("both pins have the same direction")]
    SameDirection,

    /// The value kinds scored as incompatible
    #[error("a {output} output cannot feed a {input} input")]
    Incompatible {
        /// Kind of the output pin
        output: ValueKind,
        /// Kind of the input pin
        input: ValueKind,
    },
}

/// Rejection of a structural operation on a script.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Node not found in the script
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// The registry does not know this kind identifier
    #[error("unknown node kind: {0}")]
    UnknownKind(String),

    /// A node with this ID already exists
    #[error("a node with id {0:?} already exists in the script")]
    DuplicateNodeId(NodeId),

    /// Scripts hold at most one exit node
    #[error("the script already has an exit node")]
    ExitNodeAlreadyPresent,

    /// A pin-level rejection (unknown pin, foreign pin, collection at
    /// its minimum size, ...)
    #[error(transparent)]
    Node(#[from] NodeError),

    /// Storage encoding failed
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A dataflow graph: a set of nodes, their connections and one designated
/// exit node whose input value is the graph's result.
///
/// The script exclusively owns its nodes and every pin they ever created;
/// connections are stored as pin-ID pairs on both endpoints, so cycles are
/// representable and cheap to tear down.
pub struct NodeScript {
    pub(crate) id: ScriptId,
    /// Display name
    pub name: String,
    /// Display description
    pub description: String,
    pub(crate) nodes: IndexMap<NodeId, Node>,
    pub(crate) pins: IndexMap<PinId, Pin>,
    pub(crate) behaviors: IndexMap<NodeId, Box<dyn NodeBehavior>>,
    pub(crate) exit_node: Option<NodeId>,
    pub(crate) order: OrderState,
    pub(crate) observers: Observers,
    pub(crate) data_source: Option<Arc<dyn DataSource>>,
}

impl NodeScript {
    /// Create a new empty script
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ScriptId::new(),
            name: name.into(),
            description: String::new(),
            nodes: IndexMap::new(),
            pins: IndexMap::new(),
            behaviors: IndexMap::new(),
            exit_node: None,
            order: OrderState::Dirty,
            observers: Observers::default(),
            data_source: None,
        }
    }

    /// The script's identity, preserved across save/load.
    pub fn id(&self) -> ScriptId {
        self.id
    }

    /// Attach the host's data model; consumed by data-model node kinds.
    pub fn set_data_source(&mut self, source: Arc<dyn DataSource>) {
        self.data_source = Some(source);
    }

    /// Get a node by ID
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a mutable node by ID (display metadata only; structure goes
    /// through the script API)
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// All nodes, in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All node IDs, in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Number of nodes in the script
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get a pin by ID
    pub fn pin(&self, id: PinId) -> Option<&Pin> {
        self.pins.get(&id)
    }

    /// The cached evaluation order, if it is current.
    pub fn evaluation_order(&self) -> Option<&[NodeId]> {
        match &self.order {
            OrderState::Ordered(order) => Some(order),
            OrderState::Dirty => None,
        }
    }

    /// Subscribe to structural notifications; returns a token for
    /// [`NodeScript::unsubscribe`].
    pub fn subscribe(&mut self, observer: impl FnMut(&ScriptEvent) + Send + 'static) -> ObserverId {
        self.observers.subscribe(Box::new(observer))
    }

    /// Drop a previously subscribed observer.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn context(&mut self, id: NodeId) -> Option<NodeContext<'_>> {
        let node = self.nodes.get_mut(&id)?;
        Some(NodeContext {
            node,
            pins: &mut self.pins,
            observers: &mut self.observers,
            order: &mut self.order,
            data_source: self.data_source.as_deref(),
        })
    }

    fn with_behavior<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut dyn NodeBehavior, &mut NodeContext<'_>) -> R,
    ) -> Option<R> {
        let behavior = self.behaviors.get_mut(&id)?;
        let node = self.nodes.get_mut(&id)?;
        let mut ctx = NodeContext {
            node,
            pins: &mut self.pins,
            observers: &mut self.observers,
            order: &mut self.order,
            data_source: self.data_source.as_deref(),
        };
        Some(f(behavior.as_mut(), &mut ctx))
    }

    // ------------------------------------------------------------------
    // Structural mutation
    // ------------------------------------------------------------------

    /// Instantiate a node kind and add it to the script.
    pub fn add_node(&mut self, kind: &NodeKind) -> Result<NodeId, GraphError> {
        let id = self.instantiate(kind, NodeId::new())?;
        self.try_initialize(id);
        Ok(id)
    }

    /// Instantiate without initializing; load and duplication paths call
    /// initialize themselves once connections are in place.
    pub(crate) fn instantiate(&mut self, kind: &NodeKind, id: NodeId) -> Result<NodeId, GraphError> {
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNodeId(id));
        }
        if kind.is_exit && self.exit_node.is_some() {
            return Err(GraphError::ExitNodeAlreadyPresent);
        }

        let mut builder = NodeBuilder::new(id);
        let behavior = (kind.build)(&mut builder);
        let node = Node {
            id,
            kind_id: kind.id.clone(),
            name: kind.name.clone(),
            description: kind.description.clone(),
            position: [0.0, 0.0],
            is_exit: kind.is_exit,
            is_default: kind.is_default,
            broken: None,
            pins: builder.fixed,
            collections: builder.collections,
            input_bucket: builder.input_bucket,
            output_bucket: builder.output_bucket,
        };
        for pin in builder.arena {
            self.pins.insert(pin.id(), pin);
        }

        let fixed = node.pins.clone();
        let collections: Vec<PinCollectionId> = node.collections.iter().map(|c| c.id()).collect();
        self.nodes.insert(id, node);
        self.behaviors.insert(id, behavior);
        if kind.is_exit {
            self.exit_node = Some(id);
        }
        self.order.invalidate();

        for pin in fixed {
            self.observers.emit(ScriptEvent::PinAdded { node: id, pin });
        }
        for collection in collections {
            self.observers
                .emit(ScriptEvent::PinCollectionAdded { node: id, collection });
        }
        Ok(id)
    }

    /// Remove a node: every pin it ever owned is disconnected first and
    /// then destroyed together with the node.
    ///
    /// The engine does not special-case default nodes; callers must check
    /// [`Node::is_default`] before offering deletion.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        let owned = match self.nodes.get(&id) {
            Some(node) => node.owned_pin_ids(),
            None => return Err(GraphError::NodeNotFound(id)),
        };
        for pin in &owned {
            sever_all(&mut self.pins, *pin);
        }
        for pin in &owned {
            self.pins.shift_remove(pin);
        }
        self.behaviors.shift_remove(&id);
        self.nodes.shift_remove(&id);
        if self.exit_node == Some(id) {
            self.exit_node = None;
        }
        self.order.invalidate();
        Ok(())
    }

    /// Duplicate a node: same kind, same storage, offset position.
    ///
    /// With `copy_connections` the copy's input pins receive the same
    /// incoming connections as the original's; the copy's output pins
    /// always start unconnected.
    pub fn duplicate_node(
        &mut self,
        id: NodeId,
        copy_connections: bool,
        registry: &NodeRegistry,
    ) -> Result<NodeId, GraphError> {
        let (kind_id, name, description, position) = {
            let node = self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))?;
            (
                node.kind_id.clone(),
                node.name.clone(),
                node.description.clone(),
                node.position,
            )
        };
        let storage = self.behaviors.get(&id).and_then(|b| b.storage());
        let kind = registry
            .get(&kind_id)
            .ok_or(GraphError::UnknownKind(kind_id))?;

        let copy = self.instantiate(kind, NodeId::new())?;
        if let Some(blob) = storage {
            self.with_behavior(copy, |behavior, ctx| behavior.apply_storage(&blob, ctx));
            self.observers.emit(ScriptEvent::StorageModified { node: copy });
        }
        if let Some(node) = self.nodes.get_mut(&copy) {
            node.name = name;
            node.description = description;
            node.position = [position[0] + 24.0, position[1] + 24.0];
        }

        if copy_connections {
            let sources: Vec<Option<PinId>> = self
                .input_pin_sequence(id)
                .into_iter()
                .map(|pin| {
                    self.pins
                        .get(&pin)
                        .and_then(|p| p.connections().first().copied())
                })
                .collect();
            let targets = self.input_pin_sequence(copy);
            for (source, target) in sources.into_iter().zip(targets) {
                if let Some(source) = source {
                    // mirrors the original's cable; cannot fail unless the
                    // storage produced a different layout
                    let _ = self.connect(source, target);
                }
            }
        }

        self.try_initialize(copy);
        Ok(copy)
    }

    /// Move a node in the designer. Position has no graph effect, so the
    /// cached order stays valid.
    pub fn move_node(&mut self, id: NodeId, x: f32, y: f32) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        node.position = [x, y];
        Ok(())
    }

    /// Reattach a previously removed pin to its node.
    pub fn add_pin(&mut self, node: NodeId, pin: PinId) -> Result<(), GraphError> {
        let mut ctx = self.context(node).ok_or(GraphError::NodeNotFound(node))?;
        ctx.attach_pin(pin)?;
        Ok(())
    }

    /// Detach a pin from its node, disconnecting it first. The pin keeps
    /// its identity for undo.
    pub fn remove_pin(&mut self, node: NodeId, pin: PinId) -> Result<(), GraphError> {
        let mut ctx = self.context(node).ok_or(GraphError::NodeNotFound(node))?;
        ctx.detach_pin(pin)?;
        Ok(())
    }

    /// Grow a pin collection by one member (bucket-backed).
    pub fn collection_add(
        &mut self,
        node: NodeId,
        collection: PinCollectionId,
    ) -> Result<PinId, GraphError> {
        let mut ctx = self.context(node).ok_or(GraphError::NodeNotFound(node))?;
        Ok(ctx.collection_add(collection)?)
    }

    /// Shrink a pin collection; the member is parked in the node's bucket.
    pub fn collection_remove(
        &mut self,
        node: NodeId,
        collection: PinCollectionId,
        pin: PinId,
    ) -> Result<(), GraphError> {
        let mut ctx = self.context(node).ok_or(GraphError::NodeNotFound(node))?;
        ctx.collection_remove(collection, pin)?;
        Ok(())
    }

    /// Remove a whole pin collection from a node.
    pub fn remove_pin_collection(
        &mut self,
        node: NodeId,
        collection: PinCollectionId,
    ) -> Result<(), GraphError> {
        let mut ctx = self.context(node).ok_or(GraphError::NodeNotFound(node))?;
        ctx.remove_collection(collection)?;
        Ok(())
    }

    /// Replace a node's configuration from a persisted blob.
    pub fn update_storage(&mut self, node: NodeId, blob: &str) -> Result<(), GraphError> {
        self.with_behavior(node, |behavior, ctx| behavior.apply_storage(blob, ctx))
            .ok_or(GraphError::NodeNotFound(node))?;
        self.observers.emit(ScriptEvent::StorageModified { node });
        Ok(())
    }

    /// Serialize a node's configuration, if its kind has any.
    pub fn serialize_storage(&self, node: NodeId) -> Result<Option<String>, GraphError> {
        self.behaviors
            .get(&node)
            .map(|b| b.storage())
            .ok_or(GraphError::NodeNotFound(node))
    }

    /// Explicitly unbreak a node so the next run re-attempts it.
    pub fn clear_broken(&mut self, node: NodeId) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&node).ok_or(GraphError::NodeNotFound(node))?;
        node.clear_broken();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    /// Connect two pins of opposite direction on different nodes.
    ///
    /// If the input side already has a connection it is silently torn down
    /// first: connecting to an input pin is exclusive.
    pub fn connect(&mut self, a: PinId, b: PinId) -> Result<(), ConnectError> {
        let pin_a = self.pins.get(&a).ok_or(ConnectError::PinNotFound(a))?;
        let pin_b = self.pins.get(&b).ok_or(ConnectError::PinNotFound(b))?;
        if pin_a.node() == pin_b.node() {
            return Err(ConnectError::SameNode);
        }
        if pin_a.direction() == pin_b.direction() {
            return Err(ConnectError::SameDirection);
        }

        let (output, input) = if pin_a.direction() == PinDirection::Output {
            (a, b)
        } else {
            (b, a)
        };
        let output_kind = self.pins[&output].kind();
        let input_kind = self.pins[&input].kind();
        if !castability(output_kind, input_kind).is_compatible() {
            return Err(ConnectError::Incompatible {
                output: output_kind,
                input: input_kind,
            });
        }

        if let Some(prior) = self.pins[&input].connections().first().copied() {
            self.sever(prior, input);
        }
        if let Some(pin) = self.pins.get_mut(&output) {
            pin.connections.push(input);
        }
        if let Some(pin) = self.pins.get_mut(&input) {
            pin.connections.push(output);
        }
        self.order.invalidate();
        Ok(())
    }

    /// Remove the connection between two pins, if present. Pin values are
    /// left untouched.
    pub fn disconnect(&mut self, a: PinId, b: PinId) -> bool {
        let removed = self.sever(a, b);
        if removed {
            self.order.invalidate();
        }
        removed
    }

    /// Remove every connection of a pin.
    pub fn disconnect_all(&mut self, pin: PinId) -> bool {
        let removed = sever_all(&mut self.pins, pin);
        if removed {
            self.order.invalidate();
        }
        removed
    }

    fn sever(&mut self, a: PinId, b: PinId) -> bool {
        let mut removed = false;
        if let Some(pin) = self.pins.get_mut(&a) {
            let before = pin.connections.len();
            pin.connections.retain(|id| *id != b);
            removed |= pin.connections.len() != before;
        }
        if let Some(pin) = self.pins.get_mut(&b) {
            let before = pin.connections.len();
            pin.connections.retain(|id| *id != a);
            removed |= pin.connections.len() != before;
        }
        removed
    }

    /// The node's input pins in a stable order: attached pins first, then
    /// collection members.
    fn input_pin_sequence(&self, id: NodeId) -> Vec<PinId> {
        let Some(node) = self.nodes.get(&id) else {
            return Vec::new();
        };
        node.live_pin_ids()
            .into_iter()
            .filter(|pin| {
                self.pins
                    .get(pin)
                    .is_some_and(|p| p.direction() == PinDirection::Input)
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    /// Evaluate the whole script once.
    ///
    /// Rebuilds the cached evaluation order if a structural mutation
    /// invalidated it, then runs every orderable node: reset, propagate
    /// input values from connected outputs, evaluate. A faulting node is
    /// marked broken and skipped past; the run itself never aborts.
    pub fn run(&mut self) {
        if matches!(self.order, OrderState::Dirty) {
            self.rebuild_order();
        }
        let order = match &self.order {
            OrderState::Ordered(order) => order.clone(),
            OrderState::Dirty => Vec::new(),
        };

        for id in order {
            self.reset_node(id);
            if let Err(error) = self.propagate_inputs(id) {
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.break_with(format!("failed to read inputs: {error}"));
                }
                continue;
            }
            self.try_evaluate(id);
        }
    }

    /// Whether the exit node's input pin has an incoming connection.
    ///
    /// What an unconnected exit *means* is host policy: a condition host
    /// conventionally treats such a script as always true. The engine only
    /// guarantees the pin holds the upstream value, or the kind's default
    /// when unconnected.
    pub fn exit_node_connected(&self) -> bool {
        self.exit_input_pin().is_some_and(Pin::is_connected)
    }

    /// The designated exit node, if the script has one.
    pub fn exit_node(&self) -> Option<NodeId> {
        self.exit_node
    }

    /// The raw value on the exit node's input pin.
    pub fn result_value(&self) -> Option<Value> {
        self.exit_input_pin().map(|p| p.value().clone())
    }

    /// The value on the exit node's input pin, read as a Rust type.
    pub fn result<T: PinValue>(&self) -> Option<T> {
        self.exit_input_pin().and_then(|p| T::from_value(p.value()))
    }

    fn exit_input_pin(&self) -> Option<&Pin> {
        let node = self.nodes.get(&self.exit_node?)?;
        node.live_pin_ids()
            .into_iter()
            .filter_map(|pin| self.pins.get(&pin))
            .find(|p| p.direction() == PinDirection::Input)
    }

    pub(crate) fn try_initialize(&mut self, id: NodeId) {
        let result = self.with_behavior(id, |behavior, ctx| behavior.initialize(ctx));
        if let Some(Err(error)) = result {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.break_with(format!("failed to initialize: {error}"));
            }
        }
    }

    fn try_evaluate(&mut self, id: NodeId) {
        let result = self.with_behavior(id, |behavior, ctx| behavior.evaluate(ctx));
        if let Some(Err(error)) = result {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.break_with(format!("failed to evaluate: {error}"));
            }
        }
    }

    fn reset_node(&mut self, id: NodeId) {
        let pins = match self.nodes.get(&id) {
            Some(node) => node.live_pin_ids(),
            None => return,
        };
        for pin in pins {
            if let Some(pin) = self.pins.get_mut(&pin) {
                pin.reset();
            }
        }
        self.observers.emit(ScriptEvent::NodeResetting { node: id });
    }

    /// Copy each connected input pin's value from its source output pin,
    /// converting through the numeric unification. Unconnected inputs keep
    /// their defaults.
    fn propagate_inputs(&mut self, id: NodeId) -> Result<(), NodeError> {
        let pins = match self.nodes.get(&id) {
            Some(node) => node.live_pin_ids(),
            None => return Ok(()),
        };
        for pin in pins {
            let (kind, source) = match self.pins.get(&pin) {
                Some(p) if p.direction() == PinDirection::Input => {
                    (p.kind(), p.connections().first().copied())
                }
                _ => continue,
            };
            let Some(source) = source else { continue };
            let value = match self.pins.get(&source) {
                Some(s) => s.value().clone(),
                None => continue,
            };
            let converted = value.cast_to(kind)?;
            if let Some(stored) = self.pins.get_mut(&pin) {
                stored.value = converted;
            }
        }
        Ok(())
    }

    /// Kahn's algorithm over the node dependency graph, insertion order as
    /// the deterministic tie-break. Nodes on a cycle are marked broken and
    /// excluded; the acyclic remainder still runs.
    fn rebuild_order(&mut self) {
        for node in self.nodes.values_mut() {
            if node.break_reason() == Some(CYCLIC_DEPENDENCY_REASON) {
                node.clear_broken();
            }
        }

        let mut upstream: IndexMap<NodeId, HashSet<NodeId>> =
            IndexMap::with_capacity(self.nodes.len());
        for (id, node) in &self.nodes {
            let mut dependencies = HashSet::new();
            for pin in node.live_pin_ids() {
                let Some(pin) = self.pins.get(&pin) else { continue };
                if pin.direction() != PinDirection::Input {
                    continue;
                }
                for peer in pin.connections() {
                    if let Some(peer) = self.pins.get(peer) {
                        dependencies.insert(peer.node());
                    }
                }
            }
            upstream.insert(*id, dependencies);
        }

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut placed: HashSet<NodeId> = HashSet::with_capacity(self.nodes.len());
        loop {
            let mut progressed = false;
            for (id, dependencies) in &upstream {
                if placed.contains(id) {
                    continue;
                }
                if dependencies.iter().all(|d| placed.contains(d)) {
                    order.push(*id);
                    placed.insert(*id);
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }

        let cyclic: Vec<NodeId> = upstream
            .keys()
            .filter(|id| !placed.contains(*id))
            .copied()
            .collect();
        for id in cyclic {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.break_with(CYCLIC_DEPENDENCY_REASON.to_string());
            }
        }

        tracing::debug!(nodes = order.len(), "rebuilt evaluation order");
        self.order = OrderState::Ordered(order);
    }
}

impl std::fmt::Debug for NodeScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeScript")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .field("pins", &self.pins.len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Minimal node kinds shared by the engine's test suites.

    use super::*;
    use crate::node::NodeBehavior;
    use crate::pin::{InputPin, InputPinCollection, OutputPin};
    use crate::registry::{NodeCategory, NodeKind};
    use crate::storage::{decode_or_default, encode};
    use crate::value::Numeric;

    struct ConstantNumeric {
        value: f32,
        output: OutputPin<Numeric>,
    }

    impl NodeBehavior for ConstantNumeric {
        fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
            ctx.write(&self.output, Numeric::new(self.value))
        }

        fn apply_storage(&mut self, blob: &str, _ctx: &mut NodeContext<'_>) {
            self.value = decode_or_default(blob);
        }

        fn storage(&self) -> Option<String> {
            encode(&self.value).ok()
        }
    }

    fn build_constant(builder: &mut NodeBuilder) -> Box<dyn NodeBehavior> {
        Box::new(ConstantNumeric {
            value: 0.0,
            output: builder.output::<Numeric>("Value"),
        })
    }

    struct Add {
        a: InputPin<Numeric>,
        b: InputPin<Numeric>,
        output: OutputPin<Numeric>,
    }

    impl NodeBehavior for Add {
        fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
            let sum = ctx.read(&self.a)? + ctx.read(&self.b)?;
            ctx.write(&self.output, sum)
        }
    }

    fn build_add(builder: &mut NodeBuilder) -> Box<dyn NodeBehavior> {
        Box::new(Add {
            a: builder.input::<Numeric>("A"),
            b: builder.input::<Numeric>("B"),
            output: builder.output::<Numeric>("Sum"),
        })
    }

    struct Sum {
        values: InputPinCollection<Numeric>,
        output: OutputPin<Numeric>,
    }

    impl NodeBehavior for Sum {
        fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
            let total: Numeric = ctx.read_collection(&self.values)?.into_iter().sum();
            ctx.write(&self.output, total)
        }
    }

    fn build_sum(builder: &mut NodeBuilder) -> Box<dyn NodeBehavior> {
        Box::new(Sum {
            values: builder.input_collection::<Numeric>("Values", 2),
            output: builder.output::<Numeric>("Sum"),
        })
    }

    struct Passthrough {
        input: InputPin<Numeric>,
        output: OutputPin<Numeric>,
    }

    impl NodeBehavior for Passthrough {
        fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
            let value = ctx.read(&self.input)?;
            ctx.write(&self.output, value)
        }
    }

    fn build_pass(builder: &mut NodeBuilder) -> Box<dyn NodeBehavior> {
        Box::new(Passthrough {
            input: builder.input::<Numeric>("In"),
            output: builder.output::<Numeric>("Out"),
        })
    }

    struct Not {
        input: InputPin<bool>,
        output: OutputPin<bool>,
    }

    impl NodeBehavior for Not {
        fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
            let value = ctx.read(&self.input)?;
            ctx.write(&self.output, !value)
        }
    }

    fn build_not(builder: &mut NodeBuilder) -> Box<dyn NodeBehavior> {
        Box::new(Not {
            input: builder.input::<bool>("In"),
            output: builder.output::<bool>("Out"),
        })
    }

    struct AlwaysFails;

    impl NodeBehavior for AlwaysFails {
        fn evaluate(&mut self, _ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
            Err(NodeError::Other("boom".into()))
        }
    }

    fn build_fail(builder: &mut NodeBuilder) -> Box<dyn NodeBehavior> {
        let _ = builder.output::<Numeric>("Out");
        Box::new(AlwaysFails)
    }

    struct Exit;

    impl NodeBehavior for Exit {
        fn evaluate(&mut self, _ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
            Ok(())
        }
    }

    fn build_exit(builder: &mut NodeBuilder) -> Box<dyn NodeBehavior> {
        let _ = builder.input::<Numeric>("Result");
        Box::new(Exit)
    }

    fn kind(id: &str, category: NodeCategory, is_exit: bool, build: crate::registry::BuildFn) -> NodeKind {
        NodeKind {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            category,
            is_exit,
            is_default: is_exit,
            build,
            companion: None,
        }
    }

    pub(crate) fn constant_kind() -> NodeKind {
        kind("test_constant", NodeCategory::Constant, false, build_constant)
    }

    pub(crate) fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry.register(constant_kind());
        registry.register(kind("test_add", NodeCategory::Math, false, build_add));
        registry.register(kind("test_sum", NodeCategory::Math, false, build_sum));
        registry.register(kind("test_pass", NodeCategory::Custom, false, build_pass));
        registry.register(kind("test_not", NodeCategory::Logic, false, build_not));
        registry.register(kind("test_fail", NodeCategory::Custom, false, build_fail));
        registry.register(kind("test_exit", NodeCategory::Exit, true, build_exit));
        registry
    }

    pub(crate) fn constant_blob(value: f32) -> String {
        encode(&value).unwrap()
    }

    /// The node's first attached output pin.
    pub(crate) fn output_pin(script: &NodeScript, node: NodeId) -> PinId {
        script
            .node(node)
            .unwrap()
            .pins()
            .iter()
            .copied()
            .find(|pin| script.pin(*pin).unwrap().direction() == PinDirection::Output)
            .unwrap()
    }

    /// The node's attached input pins, in creation order.
    pub(crate) fn input_pins(script: &NodeScript, node: NodeId) -> Vec<PinId> {
        script
            .node(node)
            .unwrap()
            .pins()
            .iter()
            .copied()
            .filter(|pin| script.pin(*pin).unwrap().direction() == PinDirection::Input)
            .collect()
    }
}
