// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reading values out of the host's data model.
//!
//! The output pin's kind is resolved from the data source when the node
//! initializes or its path changes; numeric kinds are normalized so the
//! pin connects to any numeric input. Rebinding goes through the
//! retirement bucket, so the pin keeps its identity while the kind is
//! unchanged.

use flowscript_engine::{
    decode_or_default, encode, NodeBehavior, NodeBuilder, NodeCategory, NodeContext, NodeError,
    NodeKind, PinId, Value, ValueKind,
};
use serde::{Deserialize, Serialize};

/// Persisted configuration of the data-model read node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataModelStorage {
    /// Path into the host's data model
    pub path: String,
}

struct DataModelValue {
    storage: DataModelStorage,
    output: Option<PinId>,
}

impl DataModelValue {
    fn rebind(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        let kind = ctx
            .data_source()
            .and_then(|source| source.kind(&self.storage.path))
            .unwrap_or(ValueKind::Numeric)
            .normalized();

        if let Some(pin) = self.output {
            if ctx.pin_kind(pin)? == kind {
                return Ok(());
            }
            ctx.detach_pin(pin)?;
        }
        self.output = Some(ctx.create_or_add_output_pin(kind, "Value"));
        Ok(())
    }
}

impl NodeBehavior for DataModelValue {
    fn initialize(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        self.rebind(ctx)
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        let Some(pin) = self.output else {
            return Ok(());
        };
        let kind = ctx.pin_kind(pin)?;
        let value = ctx
            .data_source()
            .ok_or(NodeError::NoDataSource)?
            .read(&self.storage.path)
            .unwrap_or_else(|| Value::default_for(kind));
        ctx.write_pin(pin, value)
    }

    fn apply_storage(&mut self, blob: &str, ctx: &mut NodeContext<'_>) {
        self.storage = decode_or_default(blob);
        if let Err(error) = self.rebind(ctx) {
            tracing::warn!(%error, "failed to rebind data model output");
        }
    }

    fn storage(&self) -> Option<String> {
        encode(&self.storage).ok()
    }
}

fn build_data_model_value(_builder: &mut NodeBuilder) -> Box<dyn NodeBehavior> {
    // the output pin is created at initialize, once the kind is known
    Box::new(DataModelValue {
        storage: DataModelStorage::default(),
        output: None,
    })
}

/// Reads a value from the host's data model at a stored path.
pub fn data_model_value() -> NodeKind {
    NodeKind {
        id: "data_model_value".into(),
        name: "Data model value".into(),
        description: "Reads a value from the data model".into(),
        category: NodeCategory::DataModel,
        is_exit: false,
        is_default: false,
        build: build_data_model_value,
        companion: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::{exit_bool, exit_numeric};
    use flowscript_engine::{DataSource, NodeRegistry, NodeScript, Numeric, PinDirection};
    use std::sync::Arc;

    struct FakeModel;

    impl DataSource for FakeModel {
        fn kind(&self, path: &str) -> Option<ValueKind> {
            match path {
                "sensors.temperature" => Some(ValueKind::Float),
                "player.alive" => Some(ValueKind::Bool),
                _ => None,
            }
        }

        fn read(&self, path: &str) -> Option<Value> {
            match path {
                "sensors.temperature" => Some(Value::Float(21.5)),
                "player.alive" => Some(Value::Bool(true)),
                _ => None,
            }
        }
    }

    fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry.register(data_model_value());
        registry.register(exit_numeric());
        registry.register(exit_bool());
        registry
    }

    fn output_pin(script: &NodeScript, node: flowscript_engine::NodeId) -> PinId {
        script
            .node(node)
            .unwrap()
            .pins()
            .iter()
            .copied()
            .find(|pin| script.pin(*pin).unwrap().direction() == PinDirection::Output)
            .unwrap()
    }

    #[test]
    fn test_numeric_paths_normalize_and_read() {
        let registry = registry();
        let mut script = NodeScript::new("data");
        script.set_data_source(Arc::new(FakeModel));
        let node = script.add_node(registry.get("data_model_value").unwrap()).unwrap();
        let exit = script.add_node(registry.get("exit_numeric").unwrap()).unwrap();
        script
            .update_storage(
                node,
                &encode(&DataModelStorage {
                    path: "sensors.temperature".into(),
                })
                .unwrap(),
            )
            .unwrap();

        let output = output_pin(&script, node);
        assert_eq!(script.pin(output).unwrap().kind(), ValueKind::Numeric);
        let exit_input = script.node(exit).unwrap().pins()[0];
        script.connect(output, exit_input).unwrap();

        script.run();
        assert_eq!(script.result::<Numeric>(), Some(Numeric::new(21.5)));
    }

    #[test]
    fn test_path_change_rebinds_the_output_kind() {
        let registry = registry();
        let mut script = NodeScript::new("data");
        script.set_data_source(Arc::new(FakeModel));
        let node = script.add_node(registry.get("data_model_value").unwrap()).unwrap();
        let numeric_pin = output_pin(&script, node);

        script
            .update_storage(
                node,
                &encode(&DataModelStorage {
                    path: "player.alive".into(),
                })
                .unwrap(),
            )
            .unwrap();
        let bool_pin = output_pin(&script, node);
        assert_eq!(script.pin(bool_pin).unwrap().kind(), ValueKind::Bool);
        // the bucket hands the same pin back under its new kind
        assert_eq!(bool_pin, numeric_pin);
    }

    #[test]
    fn test_unreadable_path_yields_the_default() {
        let registry = registry();
        let mut script = NodeScript::new("data");
        script.set_data_source(Arc::new(FakeModel));
        let node = script.add_node(registry.get("data_model_value").unwrap()).unwrap();
        let exit = script.add_node(registry.get("exit_numeric").unwrap()).unwrap();
        script
            .update_storage(
                node,
                &encode(&DataModelStorage {
                    path: "does.not.exist".into(),
                })
                .unwrap(),
            )
            .unwrap();
        let exit_input = script.node(exit).unwrap().pins()[0];
        script.connect(output_pin(&script, node), exit_input).unwrap();

        script.run();
        assert!(!script.node(node).unwrap().is_broken());
        assert_eq!(script.result::<Numeric>(), Some(Numeric::default()));
    }

    #[test]
    fn test_missing_data_source_breaks_the_node() {
        let registry = registry();
        let mut script = NodeScript::new("data");
        let node = script.add_node(registry.get("data_model_value").unwrap()).unwrap();

        script.run();
        let reason = script.node(node).unwrap().break_reason().unwrap();
        assert!(reason.contains("no data source"));
    }
}
