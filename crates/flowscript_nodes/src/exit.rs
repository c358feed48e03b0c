// SPDX-License-Identifier: MIT OR Apache-2.0
//! Exit nodes: the sinks whose input value is read as the script result.

use flowscript_engine::{
    NodeBehavior, NodeBuilder, NodeCategory, NodeContext, NodeError, NodeKind, Numeric,
};

struct Exit;

impl NodeBehavior for Exit {
    fn evaluate(&mut self, _ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        // the engine reads the input pin directly; nothing to compute
        Ok(())
    }
}

fn build_exit_bool(builder: &mut NodeBuilder) -> Box<dyn NodeBehavior> {
    let _ = builder.input::<bool>("Result");
    Box::new(Exit)
}

fn build_exit_numeric(builder: &mut NodeBuilder) -> Box<dyn NodeBehavior> {
    let _ = builder.input::<Numeric>("Result");
    Box::new(Exit)
}

/// Exit node for condition scripts, carrying a single Bool input.
pub fn exit_bool() -> NodeKind {
    NodeKind {
        id: "exit_bool".into(),
        name: "Exit".into(),
        description: "The result of the script".into(),
        category: NodeCategory::Exit,
        is_exit: true,
        is_default: true,
        build: build_exit_bool,
        companion: None,
    }
}

/// Exit node for value-producing scripts, carrying a single Numeric input.
pub fn exit_numeric() -> NodeKind {
    NodeKind {
        id: "exit_numeric".into(),
        name: "Exit".into(),
        description: "The result of the script".into(),
        category: NodeCategory::Exit,
        is_exit: true,
        is_default: true,
        build: build_exit_numeric,
        companion: None,
    }
}
