use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A device as reported by the SmartThings API.
///
/// Devices are fetched fresh on every collection pass and never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDevice")]
pub struct Device {
    /// Stable device identifier.
    pub id: String,

    /// Human-readable display name.
    #[serde(rename = "displayName")]
    pub name: String,

    /// Current attribute readings keyed by attribute name (e.g., "battery").
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Device {
    /// Create a device with no attributes.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute reading to this device.
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Wire shape of a device in the `/devices` response.
#[derive(Deserialize)]
struct RawDevice {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "displayName")]
    display_name: Option<String>,
    #[serde(default)]
    attributes: BTreeMap<String, AttributeValue>,
}

impl From<RawDevice> for Device {
    fn from(raw: RawDevice) -> Self {
        Self {
            id: raw.id,
            name: raw.display_name.or(raw.name).unwrap_or_default(),
            attributes: raw.attributes,
        }
    }
}

/// A loosely typed attribute reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Absent reading.
    Null,

    /// Boolean reading.
    Bool(bool),

    /// Numeric reading; integers are widened to `f64`.
    Number(f64),

    /// Textual reading (e.g., "open", "clear").
    String(String),

    /// Array or object reading. No coercion accepts it.
    Composite(serde_json::Value),
}

impl AttributeValue {
    /// Replace an absent reading with the empty string.
    ///
    /// Coercion always sees a normalized value, so a missing reading behaves
    /// like `""`.
    pub fn normalized(self) -> Self {
        match self {
            AttributeValue::Null => AttributeValue::String(String::new()),
            other => other,
        }
    }

    /// Name of the variant, for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::Null => "null",
            AttributeValue::Bool(_) => "bool",
            AttributeValue::Number(_) => "number",
            AttributeValue::String(_) => "string",
            AttributeValue::Composite(_) => "composite",
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => write!(f, "null"),
            AttributeValue::Bool(v) => write!(f, "{}", v),
            AttributeValue::Number(v) => write!(f, "{}", v),
            AttributeValue::String(v) => write!(f, "{:?}", v),
            AttributeValue::Composite(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Number(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Number(v as f64)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(AttributeValue::Null, Into::into)
    }
}
