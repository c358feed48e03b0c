// SPDX-License-Identifier: MIT OR Apache-2.0
//! Numeric switch: a selection input picks one of N option inputs.
//!
//! The option count lives in storage; arity changes go through the node's
//! retirement bucket so option pins keep their identity across shrink and
//! regrow (undo of an arity edit restores the old cables).

use flowscript_engine::{
    decode_or_default, encode, InputPin, NodeBehavior, NodeBuilder, NodeCategory, NodeContext,
    NodeError, NodeKind, Numeric, OutputPin, PinId, ValueKind,
};
use serde::{Deserialize, Serialize};

/// Persisted configuration of the numeric switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchStorage {
    /// Number of option inputs
    pub options: usize,
}

impl Default for SwitchStorage {
    fn default() -> Self {
        Self { options: 2 }
    }
}

struct NumericSwitch {
    storage: SwitchStorage,
    selection: InputPin<Numeric>,
    options: Vec<PinId>,
    output: OutputPin<Numeric>,
}

impl NumericSwitch {
    fn rebuild(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        while self.options.len() > self.storage.options.max(1) {
            if let Some(pin) = self.options.pop() {
                ctx.detach_pin(pin)?;
            }
        }
        while self.options.len() < self.storage.options.max(1) {
            let name = format!("Option {}", self.options.len() + 1);
            self.options
                .push(ctx.create_or_add_input_pin(ValueKind::Numeric, &name));
        }
        Ok(())
    }
}

impl NodeBehavior for NumericSwitch {
    fn initialize(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        self.rebuild(ctx)
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        let selection = ctx.read(&self.selection)?.to_i64();
        let index = selection.clamp(0, self.options.len() as i64 - 1) as usize;
        let value: Numeric = ctx.read_pin(self.options[index])?;
        ctx.write(&self.output, value)
    }

    fn apply_storage(&mut self, blob: &str, ctx: &mut NodeContext<'_>) {
        self.storage = decode_or_default(blob);
        if let Err(error) = self.rebuild(ctx) {
            tracing::warn!(%error, "failed to rebuild switch options");
        }
    }

    fn storage(&self) -> Option<String> {
        encode(&self.storage).ok()
    }
}

fn build_numeric_switch(builder: &mut NodeBuilder) -> Box<dyn NodeBehavior> {
    Box::new(NumericSwitch {
        storage: SwitchStorage::default(),
        selection: builder.input::<Numeric>("Selection"),
        options: Vec::new(),
        output: builder.output::<Numeric>("Result"),
    })
}

/// Selects one of N Numeric options by a (clamped) selection index.
pub fn numeric_switch() -> NodeKind {
    NodeKind {
        id: "numeric_switch".into(),
        name: "Switch".into(),
        description: "Forwards the selected option".into(),
        category: NodeCategory::Math,
        is_exit: false,
        is_default: false,
        build: build_numeric_switch,
        companion: None,
    }
}
