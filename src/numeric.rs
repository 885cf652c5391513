//! Wire-safe rendering of chain-native integers.
//!
//! JSON numbers cannot carry 64-bit (let alone 256-bit) chain integers
//! without losing precision, so every field that may originate as one
//! (agent ids, gas figures, feedback counts) is rendered as a canonical
//! decimal string before it leaves the gateway.

use std::fmt;

use alloy::primitives::U256;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// A numeric value as it arrives from an upstream collaborator.
///
/// Serializes as its normalized decimal string, or `null` when the value
/// has no canonical form (non-finite float, blank string).
#[derive(Debug, Clone, PartialEq)]
pub enum RawNumeric {
    /// Unsigned 256-bit integer (uint256 on chain).
    Big(U256),
    /// Exact integer decoded from JSON.
    Integer(i128),
    /// Double-precision number.
    Float(f64),
    /// Decimal string rendered upstream.
    Text(String),
}

/// Normalize a possibly-absent numeric value into its canonical decimal string.
///
/// Rules, in order:
/// - absent → `None`
/// - big / exact integer → exact decimal rendering
/// - finite float → truncated toward zero, then rendered
/// - non-blank string → trimmed, otherwise unchanged
/// - anything else → `None`
pub fn normalize(value: Option<&RawNumeric>) -> Option<String> {
    match value? {
        RawNumeric::Big(v) => Some(v.to_string()),
        RawNumeric::Integer(v) => Some(v.to_string()),
        RawNumeric::Float(v) if v.is_finite() => Some(render_truncated(*v)),
        RawNumeric::Float(_) => None,
        RawNumeric::Text(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
    }
}

fn render_truncated(value: f64) -> String {
    let truncated = value.trunc();
    // -0.0 would otherwise render as "-0"
    if truncated == 0.0 {
        return "0".to_string();
    }
    format!("{truncated}")
}

impl RawNumeric {
    /// Interpret a JSON value as a numeric. Objects, arrays, booleans and
    /// `null` are not numerics.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Some(Self::Integer(i128::from(u)))
                } else if let Some(i) = n.as_i64() {
                    Some(Self::Integer(i128::from(i)))
                } else {
                    n.as_f64().map(Self::Float)
                }
            }
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// Canonical decimal string for this value, if it has one.
    pub fn canonical(&self) -> Option<String> {
        normalize(Some(self))
    }
}

impl From<U256> for RawNumeric {
    fn from(value: U256) -> Self {
        Self::Big(value)
    }
}

impl From<u64> for RawNumeric {
    fn from(value: u64) -> Self {
        Self::Integer(i128::from(value))
    }
}

impl From<i64> for RawNumeric {
    fn from(value: i64) -> Self {
        Self::Integer(i128::from(value))
    }
}

impl From<f64> for RawNumeric {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for RawNumeric {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawNumeric {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl Serialize for RawNumeric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.canonical() {
            Some(s) => serializer.serialize_str(&s),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for RawNumeric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RawNumericVisitor)
    }
}

struct RawNumericVisitor;

impl Visitor<'_> for RawNumericVisitor {
    type Value = RawNumeric;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer, a number, or a decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(RawNumeric::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(RawNumeric::from(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Self::Value, E> {
        Ok(match i128::try_from(v) {
            Ok(i) => RawNumeric::Integer(i),
            Err(_) => RawNumeric::Big(U256::from(v)),
        })
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<Self::Value, E> {
        Ok(RawNumeric::Integer(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(RawNumeric::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(RawNumeric::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(RawNumeric::Text(v))
    }
}
