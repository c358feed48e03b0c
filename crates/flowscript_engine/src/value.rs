// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pin values, value kinds and the type-compatibility resolver.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};

/// The kind of value a pin can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// Boolean value
    Bool,
    /// Integer value (host data models may expose these directly)
    Integer,
    /// Floating point value (host data models may expose these directly)
    Float,
    /// Unified numeric value, absorbs all primitive numeric kinds
    Numeric,
    /// Text value
    Text,
}

impl ValueKind {
    /// Whether this kind participates in [`Numeric`] unification.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float | Self::Numeric)
    }

    /// Collapse numeric kinds into [`ValueKind::Numeric`]; other kinds pass through.
    pub fn normalized(self) -> Self {
        if self.is_numeric() {
            Self::Numeric
        } else {
            self
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Numeric => "numeric",
            Self::Text => "text",
        };
        f.write_str(name)
    }
}

/// A number, either decimal or not, used by the node system wherever
/// heterogeneous numeric pins need to interconnect.
///
/// Conversions out of `Numeric` are deliberately lossy and match the
/// behavior user graphs rely on: conversion to an integer rounds half
/// away from zero, conversion to a byte additionally clamps to `0..=255`.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Numeric(f32);

impl Numeric {
    /// Create a new numeric from a raw float.
    pub fn new(value: f32) -> Self {
        Self(value)
    }

    /// The raw float backing this numeric.
    pub fn as_f32(self) -> f32 {
        self.0
    }

    /// Lossy conversion to an integer, rounding half away from zero.
    pub fn to_i64(self) -> i64 {
        self.0.round() as i64
    }

    /// Lossy conversion to a byte, clamping to `0..=255`.
    pub fn to_u8(self) -> u8 {
        self.0.clamp(0.0, 255.0).round() as u8
    }

    /// Division that treats a zero divisor as a failure instead of
    /// producing an infinity.
    pub fn checked_div(self, divisor: Self) -> Option<Self> {
        if divisor.0 == 0.0 {
            None
        } else {
            Some(Self(self.0 / divisor.0))
        }
    }

    /// Remainder that treats a zero divisor as a failure.
    pub fn checked_rem(self, divisor: Self) -> Option<Self> {
        if divisor.0 == 0.0 {
            None
        } else {
            Some(Self(self.0 % divisor.0))
        }
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<f32> for Numeric {
    fn from(value: f32) -> Self {
        Self(value)
    }
}

impl From<f64> for Numeric {
    fn from(value: f64) -> Self {
        Self(value as f32)
    }
}

impl From<i32> for Numeric {
    fn from(value: i32) -> Self {
        Self(value as f32)
    }
}

impl From<i64> for Numeric {
    fn from(value: i64) -> Self {
        Self(value as f32)
    }
}

impl From<u8> for Numeric {
    fn from(value: u8) -> Self {
        Self(f32::from(value))
    }
}

impl From<Numeric> for f32 {
    fn from(value: Numeric) -> Self {
        value.0
    }
}

impl From<Numeric> for f64 {
    fn from(value: Numeric) -> Self {
        f64::from(value.0)
    }
}

impl Add for Numeric {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Numeric {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul for Numeric {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}

impl Div for Numeric {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        Self(self.0 / rhs.0)
    }
}

impl Rem for Numeric {
    type Output = Self;

    fn rem(self, rhs: Self) -> Self {
        Self(self.0 % rhs.0)
    }
}

impl Neg for Numeric {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Sum for Numeric {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|n| n.0).sum())
    }
}

/// A value held by a pin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Integer
    Integer(i64),
    /// Float
    Float(f64),
    /// Unified numeric
    Numeric(Numeric),
    /// Text
    Text(String),
}

impl Value {
    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Integer(_) => ValueKind::Integer,
            Self::Float(_) => ValueKind::Float,
            Self::Numeric(_) => ValueKind::Numeric,
            Self::Text(_) => ValueKind::Text,
        }
    }

    /// The default value for a kind: `false`, `0`, `0.0` or the empty string.
    pub fn default_for(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Bool => Self::Bool(false),
            ValueKind::Integer => Self::Integer(0),
            ValueKind::Float => Self::Float(0.0),
            ValueKind::Numeric => Self::Numeric(Numeric::default()),
            ValueKind::Text => Self::Text(String::new()),
        }
    }

    /// Read this value through the numeric unification, if it is numeric.
    pub fn as_numeric(&self) -> Option<Numeric> {
        match self {
            Self::Integer(i) => Some(Numeric::from(*i)),
            Self::Float(f) => Some(Numeric::from(*f)),
            Self::Numeric(n) => Some(*n),
            Self::Bool(_) | Self::Text(_) => None,
        }
    }

    /// Convert this value into the requested kind.
    ///
    /// Numeric kinds convert freely through [`Numeric`] (lossy where the
    /// target is an integer); any other cross-kind conversion fails.
    pub fn cast_to(&self, kind: ValueKind) -> Result<Self, CastError> {
        if self.kind() == kind {
            return Ok(self.clone());
        }

        if kind.is_numeric() {
            if let Some(numeric) = self.as_numeric() {
                return Ok(match kind {
                    ValueKind::Integer => Self::Integer(numeric.to_i64()),
                    ValueKind::Float => Self::Float(numeric.into()),
                    _ => Self::Numeric(numeric),
                });
            }
        }

        Err(CastError {
            from: self.kind(),
            to: kind,
        })
    }
}

/// Failed conversion between two value kinds.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("cannot convert a {from} value into a {to} value")]
pub struct CastError {
    /// Kind of the value being converted
    pub from: ValueKind,
    /// Kind the conversion was asked to produce
    pub to: ValueKind,
}

/// How well a value of one kind satisfies a pin declared as another kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Castability {
    /// The kinds cannot be connected
    Incompatible,
    /// Compatible through numeric unification
    Convertible,
    /// Exact kind match
    Exact,
}

impl Castability {
    /// Numeric score; zero means the connection is rejected.
    pub fn score(self) -> u8 {
        match self {
            Self::Incompatible => 0,
            Self::Convertible => 1,
            Self::Exact => 2,
        }
    }

    /// Whether a connection between the scored kinds is allowed.
    pub fn is_compatible(self) -> bool {
        self != Self::Incompatible
    }
}

/// Score whether a value of kind `from` may flow into a pin declared as `to`.
pub fn castability(from: ValueKind, to: ValueKind) -> Castability {
    if from == to {
        Castability::Exact
    } else if from.is_numeric() && to.is_numeric() {
        Castability::Convertible
    } else {
        Castability::Incompatible
    }
}

/// Bridge between Rust types and pin [`Value`]s.
///
/// All primitive numeric implementations declare [`ValueKind::Numeric`],
/// which is what lets an integer-producing node feed a float-consuming
/// node and vice versa.
pub trait PinValue: Sized {
    /// The pin kind a pin of this Rust type declares.
    const KIND: ValueKind;

    /// Wrap this value for storage in a pin.
    fn into_value(self) -> Value;

    /// Read this type out of a pin value, converting numerics as needed.
    fn from_value(value: &Value) -> Option<Self>;
}

impl PinValue for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl PinValue for String {
    const KIND: ValueKind = ValueKind::Text;

    fn into_value(self) -> Value {
        Value::Text(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(t) => Some(t.clone()),
            _ => None,
        }
    }
}

impl PinValue for Numeric {
    const KIND: ValueKind = ValueKind::Numeric;

    fn into_value(self) -> Value {
        Value::Numeric(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_numeric()
    }
}

macro_rules! numeric_pin_value {
    ($ty:ty, $read:expr) => {
        impl PinValue for $ty {
            const KIND: ValueKind = ValueKind::Numeric;

            fn into_value(self) -> Value {
                Value::Numeric(Numeric::from(self))
            }

            fn from_value(value: &Value) -> Option<Self> {
                value.as_numeric().map($read)
            }
        }
    };
}

numeric_pin_value!(f32, Numeric::as_f32);
numeric_pin_value!(f64, f64::from);
numeric_pin_value!(i64, Numeric::to_i64);
numeric_pin_value!(i32, |n: Numeric| n.to_i64() as i32);
numeric_pin_value!(u8, Numeric::to_u8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_castability_scores() {
        assert_eq!(castability(ValueKind::Bool, ValueKind::Bool).score(), 2);
        assert_eq!(castability(ValueKind::Numeric, ValueKind::Numeric).score(), 2);
        assert_eq!(castability(ValueKind::Integer, ValueKind::Numeric).score(), 1);
        assert_eq!(castability(ValueKind::Float, ValueKind::Integer).score(), 1);
        assert_eq!(castability(ValueKind::Bool, ValueKind::Numeric).score(), 0);
        assert_eq!(castability(ValueKind::Text, ValueKind::Bool).score(), 0);
        assert!(!castability(ValueKind::Text, ValueKind::Numeric).is_compatible());
    }

    #[test]
    fn test_numeric_rounds_half_away_from_zero() {
        assert_eq!(Numeric::new(2.5).to_i64(), 3);
        assert_eq!(Numeric::new(-2.5).to_i64(), -3);
        assert_eq!(Numeric::new(2.4).to_i64(), 2);
        assert_eq!(Numeric::new(300.0).to_u8(), 255);
        assert_eq!(Numeric::new(-4.0).to_u8(), 0);
    }

    #[test]
    fn test_numeric_checked_division() {
        assert_eq!(
            Numeric::new(6.0).checked_div(Numeric::new(2.0)),
            Some(Numeric::new(3.0))
        );
        assert_eq!(Numeric::new(6.0).checked_div(Numeric::default()), None);
        assert_eq!(Numeric::new(6.0).checked_rem(Numeric::default()), None);
    }

    #[test]
    fn test_cast_between_numeric_kinds() {
        let value = Value::Float(2.6);
        assert_eq!(value.cast_to(ValueKind::Integer).unwrap(), Value::Integer(3));
        assert_eq!(
            value.cast_to(ValueKind::Numeric).unwrap(),
            Value::Numeric(Numeric::new(2.6))
        );

        let err = Value::Text("nope".into()).cast_to(ValueKind::Numeric).unwrap_err();
        assert_eq!(err.from, ValueKind::Text);
        assert_eq!(err.to, ValueKind::Numeric);
    }

    #[test]
    fn test_numeric_sum() {
        let total: Numeric = [1.0, 2.5, 3.5].iter().map(|f| Numeric::new(*f)).sum();
        assert_eq!(total, Numeric::new(7.0));
    }
}
