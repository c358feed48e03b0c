// SPDX-License-Identifier: MIT OR Apache-2.0
//! Builtin node kinds for the flowscript engine.
//!
//! Hosts call [`register_builtin`] once on their registry; plugins add
//! their own kinds next to these.

pub mod constants;
pub mod data_model;
pub mod exit;
pub mod logic;
pub mod math;
pub mod switch;

pub use data_model::DataModelStorage;
pub use logic::{BooleanOperator, CompareOperator};
pub use math::ArithmeticOperator;
pub use switch::SwitchStorage;

use flowscript_engine::NodeRegistry;

/// Register every builtin node kind.
pub fn register_builtin(registry: &mut NodeRegistry) {
    registry.register(exit::exit_bool());
    registry.register(exit::exit_numeric());
    registry.register(constants::bool_constant());
    registry.register(constants::numeric_constant());
    registry.register(constants::text_constant());
    registry.register(math::arithmetic());
    registry.register(math::sum());
    registry.register(logic::boolean_operator());
    registry.register(logic::negate_bool());
    registry.register(logic::compare());
    registry.register(switch::numeric_switch());
    registry.register(data_model::data_model_value());
}
