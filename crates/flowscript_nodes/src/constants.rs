// SPDX-License-Identifier: MIT OR Apache-2.0
//! Constant-value nodes. The value itself is the node's storage.

use flowscript_engine::{
    decode_or_default, encode, NodeBehavior, NodeBuilder, NodeCategory, NodeContext, NodeError,
    NodeKind, Numeric, OutputPin, PinValue,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

struct Constant<T> {
    value: T,
    output: OutputPin<T>,
}

impl<T> NodeBehavior for Constant<T>
where
    T: PinValue + Clone + Default + Serialize + DeserializeOwned + Send,
{
    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        ctx.write(&self.output, self.value.clone())
    }

    fn apply_storage(&mut self, blob: &str, _ctx: &mut NodeContext<'_>) {
        self.value = decode_or_default(blob);
    }

    fn storage(&self) -> Option<String> {
        encode(&self.value).ok()
    }
}

fn build_constant<T>(builder: &mut NodeBuilder) -> Box<dyn NodeBehavior>
where
    T: PinValue + Clone + Default + Serialize + DeserializeOwned + Send + 'static,
{
    Box::new(Constant {
        value: T::default(),
        output: builder.output::<T>("Value"),
    })
}

fn kind(id: &str, name: &str, build: flowscript_engine::BuildFn) -> NodeKind {
    NodeKind {
        id: id.into(),
        name: name.into(),
        description: "A fixed value".into(),
        category: NodeCategory::Constant,
        is_exit: false,
        is_default: false,
        build,
        companion: None,
    }
}

/// A fixed Bool value, `false` by default.
pub fn bool_constant() -> NodeKind {
    kind("bool_constant", "Bool value", build_constant::<bool>)
}

/// A fixed Numeric value, `0` by default.
pub fn numeric_constant() -> NodeKind {
    kind("numeric_constant", "Numeric value", build_constant::<Numeric>)
}

/// A fixed Text value, empty by default.
pub fn text_constant() -> NodeKind {
    kind("text_constant", "Text value", build_constant::<String>)
}
