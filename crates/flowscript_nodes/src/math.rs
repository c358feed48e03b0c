// SPDX-License-Identifier: MIT OR Apache-2.0
//! Numeric nodes: binary arithmetic and collection sums.

use flowscript_engine::{
    decode_or_default, encode, InputPin, InputPinCollection, NodeBehavior, NodeBuilder,
    NodeCategory, NodeContext, NodeError, NodeKind, Numeric, OutputPin,
};
use serde::{Deserialize, Serialize};

/// Operation applied by the arithmetic node, stored on the node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithmeticOperator {
    /// A + B
    #[default]
    Add,
    /// A - B
    Subtract,
    /// A * B
    Multiply,
    /// A / B, faulting on a zero divisor
    Divide,
    /// A % B, faulting on a zero divisor
    Modulo,
}

struct Arithmetic {
    operator: ArithmeticOperator,
    a: InputPin<Numeric>,
    b: InputPin<Numeric>,
    output: OutputPin<Numeric>,
}

impl NodeBehavior for Arithmetic {
    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        let a = ctx.read(&self.a)?;
        let b = ctx.read(&self.b)?;
        let result = match self.operator {
            ArithmeticOperator::Add => a + b,
            ArithmeticOperator::Subtract => a - b,
            ArithmeticOperator::Multiply => a * b,
            ArithmeticOperator::Divide => a.checked_div(b).ok_or(NodeError::DivisionByZero)?,
            ArithmeticOperator::Modulo => a.checked_rem(b).ok_or(NodeError::DivisionByZero)?,
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

fn build_arithmetic(builder: &mut NodeBuilder) -> Box<dyn NodeBehavior> {
    Box::new(Arithmetic {
        operator: ArithmeticOperator::default(),
        a: builder.input::<Numeric>("A"),
        b: builder.input::<Numeric>("B"),
        output: builder.output::<Numeric>("Result"),
    })
}

/// Binary arithmetic on two Numeric inputs; the operator lives in storage.
pub fn arithmetic() -> NodeKind {
    NodeKind {
        id: "arithmetic".into(),
        name: "Arithmetic".into(),
        description: "Applies an operator to A and B".into(),
        category: NodeCategory::Math,
        is_exit: false,
        is_default: false,
        build: build_arithmetic,
        companion: None,
    }
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

/// Sum over a growable collection of Numeric inputs.
pub fn sum() -> NodeKind {
    NodeKind {
        id: "sum".into(),
        name: "Sum".into(),
        description: "Adds all connected values".into(),
        category: NodeCategory::Math,
        is_exit: false,
        is_default: false,
        build: build_sum,
        companion: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::numeric_constant;
    use crate::exit::exit_numeric;
    use flowscript_engine::{NodeId, NodeRegistry, NodeScript, PinDirection, PinId};

    fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry.register(numeric_constant());
        registry.register(arithmetic());
        registry.register(sum());
        registry.register(exit_numeric());
        registry
    }

    fn constant(script: &mut NodeScript, registry: &NodeRegistry, value: f32) -> PinId {
        let id = script.add_node(registry.get("numeric_constant").unwrap()).unwrap();
        script
            .update_storage(id, &encode(&Numeric::new(value)).unwrap())
            .unwrap();
        script.node(id).unwrap().pins()[0]
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

    #[test]
    fn test_arithmetic_operators() {
        let registry = registry();
        let cases = [
            (ArithmeticOperator::Add, 9.0),
            (ArithmeticOperator::Subtract, 3.0),
            (ArithmeticOperator::Multiply, 18.0),
            (ArithmeticOperator::Divide, 2.0),
            (ArithmeticOperator::Modulo, 0.0),
        ];
        for (operator, expected) in cases {
            let mut script = NodeScript::new("math");
            let a = constant(&mut script, &registry, 6.0);
            let b = constant(&mut script, &registry, 3.0);
            let node = script.add_node(registry.get("arithmetic").unwrap()).unwrap();
            let exit = script.add_node(registry.get("exit_numeric").unwrap()).unwrap();
            script.update_storage(node, &encode(&operator).unwrap()).unwrap();
            script.connect(a, input_pins(&script, node)[0]).unwrap();
            script.connect(b, input_pins(&script, node)[1]).unwrap();
            let output = *script.node(node).unwrap().pins().last().unwrap();
            script.connect(output, input_pins(&script, exit)[0]).unwrap();

            script.run();
            assert_eq!(script.result::<f32>(), Some(expected), "{operator:?}");
        }
    }

    #[test]
    fn test_division_by_zero_breaks_the_node() {
        let registry = registry();
        let mut script = NodeScript::new("math");
        let a = constant(&mut script, &registry, 6.0);
        let node = script.add_node(registry.get("arithmetic").unwrap()).unwrap();
        script
            .update_storage(node, &encode(&ArithmeticOperator::Divide).unwrap())
            .unwrap();
        script.connect(a, input_pins(&script, node)[0]).unwrap();

        script.run();
        let reason = script.node(node).unwrap().break_reason().unwrap();
        assert!(reason.contains("division by zero"));
    }

    #[test]
    fn test_sum_over_grown_collection() {
        let registry = registry();
        let mut script = NodeScript::new("math");
        let node = script.add_node(registry.get("sum").unwrap()).unwrap();
        let exit = script.add_node(registry.get("exit_numeric").unwrap()).unwrap();
        let collection = script.node(node).unwrap().collections()[0].id();
        script.collection_add(node, collection).unwrap();

        for (value, member) in [1.0f32, 2.0, 4.0].iter().zip(
            script.node(node).unwrap().collections()[0].pins().to_vec(),
        ) {
            let source = constant(&mut script, &registry, *value);
            script.connect(source, member).unwrap();
        }
        let output = script.node(node).unwrap().pins()[0];
        script.connect(output, input_pins(&script, exit)[0]).unwrap();

        script.run();
        assert_eq!(script.result::<f32>(), Some(7.0));
    }
}
