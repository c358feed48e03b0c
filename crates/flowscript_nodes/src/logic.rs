// SPDX-License-Identifier: MIT OR Apache-2.0
//! Boolean nodes: combinators, negation and numeric comparison.

use flowscript_engine::{
    decode_or_default, encode, InputPin, InputPinCollection, NodeBehavior, NodeBuilder,
    NodeCategory, NodeContext, NodeError, NodeKind, Numeric, OutputPin,
};
use serde::{Deserialize, Serialize};

/// Combinator applied by the boolean operator node, stored on the node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanOperator {
    /// True when every input is true
    #[default]
    And,
    /// True when any input is true
    Or,
    /// True when an odd number of inputs is true
    Xor,
}

struct BooleanOp {
    operator: BooleanOperator,
    values: InputPinCollection<bool>,
    output: OutputPin<bool>,
}

impl NodeBehavior for BooleanOp {
    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        let values = ctx.read_collection(&self.values)?;
        let result = match self.operator {
            BooleanOperator::And => values.iter().all(|v| *v),
            BooleanOperator::Or => values.iter().any(|v| *v),
            BooleanOperator::Xor => values.iter().fold(false, |acc, v| acc ^ *v),
        };
        ctx.write(&self.output, result)
    }

    fn apply_storage(&mut self, blob: &str, _ctx: &mut NodeContext<'_>) {
        self.operator = decode_or_default(blob);
    }

    fn storage(&self) -> Option<String> {
        encode(&self.operator).ok()
    }
}

fn build_boolean_operator(builder: &mut NodeBuilder) -> Box<dyn NodeBehavior> {
    Box::new(BooleanOp {
        operator: BooleanOperator::default(),
        values: builder.input_collection::<bool>("Values", 2),
        output: builder.output::<bool>("Result"),
    })
}

/// And/Or/Xor over a growable collection of Bool inputs.
pub fn boolean_operator() -> NodeKind {
    NodeKind {
        id: "boolean_operator".into(),
        name: "Boolean operator".into(),
        description: "Combines all connected values".into(),
        category: NodeCategory::Logic,
        is_exit: false,
        is_default: false,
        build: build_boolean_operator,
        companion: None,
    }
}

struct NegateBool {
    input: InputPin<bool>,
    output: OutputPin<bool>,
}

impl NodeBehavior for NegateBool {
    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        let value = ctx.read(&self.input)?;
        ctx.write(&self.output, !value)
    }
}

fn build_negate_bool(builder: &mut NodeBuilder) -> Box<dyn NodeBehavior> {
    Box::new(NegateBool {
        input: builder.input::<bool>("In"),
        output: builder.output::<bool>("Out"),
    })
}

/// Bool negation.
pub fn negate_bool() -> NodeKind {
    NodeKind {
        id: "negate_bool".into(),
        name: "Negate".into(),
        description: "Inverts the input".into(),
        category: NodeCategory::Logic,
        is_exit: false,
        is_default: false,
        build: build_negate_bool,
        companion: None,
    }
}

/// Relation applied by the compare node, stored on the node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOperator {
    /// A == B
    #[default]
    Equal,
    /// A != B
    NotEqual,
    /// A < B
    LessThan,
    /// A <= B
    LessThanOrEqual,
    /// A > B
    GreaterThan,
    /// A >= B
    GreaterThanOrEqual,
}

struct Compare {
    operator: CompareOperator,
    a: InputPin<Numeric>,
    b: InputPin<Numeric>,
    output: OutputPin<bool>,
}

impl NodeBehavior for Compare {
    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        let a = ctx.read(&self.a)?;
        let b = ctx.read(&self.b)?;
        let result = match self.operator {
            CompareOperator::Equal => a == b,
            CompareOperator::NotEqual => a != b,
            CompareOperator::LessThan => a < b,
            CompareOperator::LessThanOrEqual => a <= b,
            CompareOperator::GreaterThan => a > b,
            CompareOperator::GreaterThanOrEqual => a >= b,
        };
        ctx.write(&self.output, result)
    }

    fn apply_storage(&mut self, blob: &str, _ctx: &mut NodeContext<'_>) {
        self.operator = decode_or_default(blob);
    }

    fn storage(&self) -> Option<String> {
        encode(&self.operator).ok()
    }
}

fn build_compare(builder: &mut NodeBuilder) -> Box<dyn NodeBehavior> {
    Box::new(Compare {
        operator: CompareOperator::default(),
        a: builder.input::<Numeric>("A"),
        b: builder.input::<Numeric>("B"),
        output: builder.output::<bool>("Result"),
    })
}

/// Numeric comparison producing a Bool.
pub fn compare() -> NodeKind {
    NodeKind {
        id: "compare".into(),
        name: "Compare".into(),
        description: "Compares A against B".into(),
        category: NodeCategory::Logic,
        is_exit: false,
        is_default: false,
        build: build_compare,
        companion: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{bool_constant, numeric_constant};
    use crate::exit::exit_bool;
    use flowscript_engine::{NodeId, NodeRegistry, NodeScript, PinDirection, PinId};

    fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry.register(bool_constant());
        registry.register(numeric_constant());
        registry.register(boolean_operator());
        registry.register(negate_bool());
        registry.register(compare());
        registry.register(exit_bool());
        registry
    }

    fn input_pins(script: &NodeScript, node: NodeId) -> Vec<PinId> {
        script
            .node(node)
            .unwrap()
            .pins()
            .iter()
            .copied()
            .filter(|pin| script.pin(*pin).unwrap().direction() == PinDirection::Input)
            .collect()
    }

    fn bool_source(script: &mut NodeScript, registry: &NodeRegistry, value: bool) -> PinId {
        let id = script.add_node(registry.get("bool_constant").unwrap()).unwrap();
        script.update_storage(id, &encode(&value).unwrap()).unwrap();
        script.node(id).unwrap().pins()[0]
    }

    #[test]
    fn test_boolean_operators() {
        let registry = registry();
        let cases = [
            (BooleanOperator::And, false),
            (BooleanOperator::Or, true),
            (BooleanOperator::Xor, true),
        ];
        for (operator, expected) in cases {
            let mut script = NodeScript::new("logic");
            let node = script.add_node(registry.get("boolean_operator").unwrap()).unwrap();
            let exit = script.add_node(registry.get("exit_bool").unwrap()).unwrap();
            script.update_storage(node, &encode(&operator).unwrap()).unwrap();

            let members = script.node(node).unwrap().collections()[0].pins().to_vec();
            for (value, member) in [true, false].iter().zip(members) {
                let source = bool_source(&mut script, &registry, *value);
                script.connect(source, member).unwrap();
            }
            let output = script.node(node).unwrap().pins()[0];
            script.connect(output, input_pins(&script, exit)[0]).unwrap();

            script.run();
            assert_eq!(script.result::<bool>(), Some(expected), "{operator:?}");
        }
    }

    #[test]
    fn test_negate() {
        let registry = registry();
        let mut script = NodeScript::new("logic");
        let node = script.add_node(registry.get("negate_bool").unwrap()).unwrap();
        let exit = script.add_node(registry.get("exit_bool").unwrap()).unwrap();
        let source = bool_source(&mut script, &registry, false);
        script.connect(source, input_pins(&script, node)[0]).unwrap();
        let output = *script.node(node).unwrap().pins().last().unwrap();
        script.connect(output, input_pins(&script, exit)[0]).unwrap();

        script.run();
        assert_eq!(script.result::<bool>(), Some(true));
    }

    #[test]
    fn test_compare_relations() {
        let registry = registry();
        let cases = [
            (CompareOperator::Equal, false),
            (CompareOperator::NotEqual, true),
            (CompareOperator::LessThan, true),
            (CompareOperator::LessThanOrEqual, true),
            (CompareOperator::GreaterThan, false),
            (CompareOperator::GreaterThanOrEqual, false),
        ];
        for (operator, expected) in cases {
            let mut script = NodeScript::new("logic");
            let a = script.add_node(registry.get("numeric_constant").unwrap()).unwrap();
            let b = script.add_node(registry.get("numeric_constant").unwrap()).unwrap();
            script.update_storage(a, &encode(&Numeric::new(2.0)).unwrap()).unwrap();
            script.update_storage(b, &encode(&Numeric::new(3.0)).unwrap()).unwrap();
            let node = script.add_node(registry.get("compare").unwrap()).unwrap();
            let exit = script.add_node(registry.get("exit_bool").unwrap()).unwrap();
            script.update_storage(node, &encode(&operator).unwrap()).unwrap();

            let a_out = script.node(a).unwrap().pins()[0];
            let b_out = script.node(b).unwrap().pins()[0];
            script.connect(a_out, input_pins(&script, node)[0]).unwrap();
            script.connect(b_out, input_pins(&script, node)[1]).unwrap();
            let output = *script.node(node).unwrap().pins().last().unwrap();
            script.connect(output, input_pins(&script, exit)[0]).unwrap();

            script.run();
            assert_eq!(script.result::<bool>(), Some(expected), "{operator:?}");
        }
    }
}
