//! Static mapping from SmartThings attribute names to Prometheus metrics.

use std::collections::BTreeMap;

use crate::coerce::{ABSENT_PRESENT, Coercion, INACTIVE_ACTIVE, JOULES_PER_KWH, OFF_ON, OPEN_CLOSED};

/// Label carrying the device identifier.
pub const LABEL_ID: &str = "id";
/// Label carrying the device display name.
pub const LABEL_NAME: &str = "name";

/// Identity of one exported gauge family.
///
/// The name excludes the namespace, which is added at exposition time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricDefinition {
    pub name: &'static str,
    pub help: &'static str,
}

impl MetricDefinition {
    pub const fn new(name: &'static str, help: &'static str) -> Self {
        Self { name, help }
    }
}

/// One row of the catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogEntry {
    pub attribute: &'static str,
    pub definition: MetricDefinition,
    pub coercion: Coercion,
}

/// The full attribute table.
const ENTRIES: &[CatalogEntry] = &[
    entry(
        "alarmState",
        "alarm_cleared",
        "0 if the alarm is clear.",
        Coercion::Clear,
    ),
    entry(
        "battery",
        "battery_percentage",
        "Percentage of battery remaining.",
        Coercion::Float,
    ),
    entry(
        "carbonMonoxide",
        "carbon_monoxide_detected",
        "1 if carbon monoxide is detected.",
        Coercion::Clear,
    ),
    entry(
        "contact",
        "contact_closed",
        "1 if the contact is closed.",
        Coercion::OneOf(OPEN_CLOSED),
    ),
    entry(
        "energy",
        "energy_usage_joules",
        "Energy usage in joules.",
        Coercion::Scaled(JOULES_PER_KWH),
    ),
    entry(
        "motion",
        "motion_detected",
        "1 if motion is detected.",
        Coercion::OneOf(INACTIVE_ACTIVE),
    ),
    entry(
        "power",
        "power_usage_watts",
        "Current power usage in watts.",
        Coercion::Float,
    ),
    entry(
        "presence",
        "presence_detected",
        "1 if presence is detected.",
        Coercion::OneOf(ABSENT_PRESENT),
    ),
    entry(
        "smoke",
        "smoke_detected",
        "1 if smoke is detected.",
        Coercion::Clear,
    ),
    entry(
        "switch",
        "switch_enabled",
        "1 if the switch is on.",
        Coercion::OneOf(OFF_ON),
    ),
    entry(
        "temperature",
        "temperature_fahrenheit",
        "Temperature in fahrenheit.",
        Coercion::Float,
    ),
];

const fn entry(
    attribute: &'static str,
    name: &'static str,
    help: &'static str,
    coercion: Coercion,
) -> CatalogEntry {
    CatalogEntry {
        attribute,
        definition: MetricDefinition::new(name, help),
        coercion,
    }
}

/// Immutable attribute-to-metric registry.
///
/// Built once at startup and shared read-only by every collection pass.
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    entries: BTreeMap<&'static str, CatalogEntry>,
}

impl MetricCatalog {
    /// Build a catalog from a list of entries. Later duplicates of an attribute
    /// are ignored.
    pub fn from_entries(entries: &[CatalogEntry]) -> Self {
        let mut map = BTreeMap::new();
        for entry in entries {
            map.entry(entry.attribute).or_insert(*entry);
        }
        Self { entries: map }
    }

    /// The catalog of every attribute the exporter understands.
    pub fn smartthings() -> Self {
        Self::from_entries(ENTRIES)
    }

    /// Find the entry for an attribute. Unknown attributes yield `None`.
    pub fn lookup(&self, attribute: &str) -> Option<&CatalogEntry> {
        self.entries.get(attribute)
    }

    /// Every metric definition, ordered by attribute name.
    pub fn definitions(&self) -> impl Iterator<Item = &MetricDefinition> {
        self.entries.values().map(|e| &e.definition)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Check a name against the Prometheus metric name grammar
/// `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}
