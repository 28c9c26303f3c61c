//! Conversion of raw attribute readings into gauge values.

use smartthings_common::AttributeValue;
use thiserror::Error;

/// Joules in one kilowatt-hour.
pub const JOULES_PER_KWH: f64 = 3_600_000.0;

pub const OPEN_CLOSED: [&str; 2] = ["open", "closed"];
pub const INACTIVE_ACTIVE: [&str; 2] = ["inactive", "active"];
pub const ABSENT_PRESENT: [&str; 2] = ["not present", "present"];
pub const OFF_ON: [&str; 2] = ["off", "on"];

/// Why a reading could not be turned into a gauge value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoercionError {
    /// The reading has the wrong runtime type for the attribute.
    #[error("invalid non-{expected} argument {value}")]
    TypeMismatch {
        expected: &'static str,
        value: AttributeValue,
    },

    /// The reading is a string outside the two expected options.
    #[error("invalid option {value:?}. Expected {low:?} or {high:?}")]
    InvalidEnumValue {
        value: String,
        low: &'static str,
        high: &'static str,
    },
}

/// Coercion rule attached to a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coercion {
    /// `"clear"` is 0, any other string is 1.
    Clear,
    /// Numeric pass-through.
    Float,
    /// Numeric reading multiplied by a constant factor.
    Scaled(f64),
    /// First option is 0, second option is 1.
    OneOf([&'static str; 2]),
}

impl Coercion {
    /// Apply the rule to an already normalized reading.
    pub fn apply(&self, value: &AttributeValue) -> Result<f64, CoercionError> {
        match *self {
            Coercion::Clear => value_clear(value),
            Coercion::Float => value_float(value),
            Coercion::Scaled(factor) => value_float(value).map(|v| v * factor),
            Coercion::OneOf(options) => value_one_of(value, options),
        }
    }
}

/// Map `"clear"` to 0 and every other string to 1.
///
/// Any non-clear string counts as an active alarm, including values outside
/// the alarm vocabulary.
pub fn value_clear(value: &AttributeValue) -> Result<f64, CoercionError> {
    match value {
        AttributeValue::String(s) if s == "clear" => Ok(0.0),
        AttributeValue::String(_) => Ok(1.0),
        other => Err(type_mismatch("string", other)),
    }
}

/// Map the first option to 0 and the second to 1.
pub fn value_one_of(
    value: &AttributeValue,
    options: [&'static str; 2],
) -> Result<f64, CoercionError> {
    let [low, high] = options;
    match value {
        AttributeValue::String(s) if s == low => Ok(0.0),
        AttributeValue::String(s) if s == high => Ok(1.0),
        AttributeValue::String(s) => Err(CoercionError::InvalidEnumValue {
            value: s.clone(),
            low,
            high,
        }),
        other => Err(type_mismatch("string", other)),
    }
}

/// Pass a numeric reading through unchanged. Numeric strings are rejected.
pub fn value_float(value: &AttributeValue) -> Result<f64, CoercionError> {
    match value {
        AttributeValue::Number(v) => Ok(*v),
        other => Err(type_mismatch("floating-point", other)),
    }
}

fn type_mismatch(expected: &'static str, value: &AttributeValue) -> CoercionError {
    CoercionError::TypeMismatch {
        expected,
        value: value.clone(),
    }
}
