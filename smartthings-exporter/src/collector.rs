//! Device collector turning SmartThings attributes into Prometheus samples.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use prometheus_client::collector::Collector;
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{
    DescriptorEncoder, EncodeLabel, EncodeLabelSet, EncodeMetric, LabelSetEncoder,
};
use prometheus_client::metrics::MetricType;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::ConstGauge;
use prometheus_client::metrics::info::Info;
use prometheus_client::registry::Registry;
use smartthings_common::{Device, DeviceSource};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::catalog::{LABEL_ID, LABEL_NAME, MetricCatalog, MetricDefinition};

/// Counter of readings that failed coercion, cumulative since process start.
pub const INVALID_METRIC: MetricDefinition =
    MetricDefinition::new("invalid_metric", "Total number of metrics that were invalid.");

/// Errors that abort a collection pass.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Failed to fetch device list: {0}")]
    Fetch(#[from] smartthings_common::Error),

    #[error("Failed to encode metrics: {0}")]
    Encode(#[from] std::fmt::Error),
}

/// Labels identifying the device a sample belongs to.
///
/// Values are kept raw and escaped when encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceLabels {
    pub id: String,
    pub name: String,
}

impl EncodeLabelSet for DeviceLabels {
    fn encode(&self, mut encoder: LabelSetEncoder) -> Result<(), std::fmt::Error> {
        (LABEL_ID, escape_label_value(&self.id)).encode(encoder.encode_label())?;
        (LABEL_NAME, escape_label_value(&self.name)).encode(encoder.encode_label())?;
        Ok(())
    }
}

impl From<&Device> for DeviceLabels {
    fn from(device: &Device) -> Self {
        Self {
            id: device.id.clone(),
            name: device.name.clone(),
        }
    }
}

/// One gauge sample produced by a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub definition: MetricDefinition,
    pub labels: DeviceLabels,
    pub value: f64,
}

/// Result of one collection pass.
#[derive(Debug, Clone, Default)]
pub struct CollectionPass {
    /// Samples in no particular order.
    pub samples: Vec<Sample>,
    /// Number of devices returned by the source.
    pub devices: usize,
    /// Readings that failed coercion during this pass.
    pub failures: u64,
}

impl CollectionPass {
    /// Value of a metric for a device, if it was emitted.
    pub fn value(&self, metric: &str, device_id: &str) -> Option<f64> {
        self.samples
            .iter()
            .find(|s| s.definition.name == metric && s.labels.id == device_id)
            .map(|s| s.value)
    }
}

impl Collector for CollectionPass {
    fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), std::fmt::Error> {
        // Each family must be described once, with all its samples together.
        let mut families: BTreeMap<MetricDefinition, Vec<&Sample>> = BTreeMap::new();
        for sample in &self.samples {
            families.entry(sample.definition).or_default().push(sample);
        }

        for (definition, samples) in families {
            let mut metric_encoder = encoder.encode_descriptor(
                definition.name,
                definition.help,
                None,
                MetricType::Gauge,
            )?;
            for sample in samples {
                let family_encoder = metric_encoder.encode_family(&sample.labels)?;
                ConstGauge::new(sample.value).encode(family_encoder)?;
            }
        }

        Ok(())
    }
}

/// Summary of the latest successful pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassSummary {
    pub devices: usize,
    pub samples: usize,
    pub failures: u64,
    pub duration: Duration,
}

/// Collects device attributes on demand.
///
/// Holds no mutable state besides the cumulative failure counter and the
/// latest pass summary, so concurrent scrapes are safe.
pub struct DeviceCollector {
    catalog: Arc<MetricCatalog>,
    source: Arc<dyn DeviceSource>,
    namespace: String,
    invalid_metric: Counter,
    last_pass: RwLock<Option<PassSummary>>,
}

impl DeviceCollector {
    /// Create a new collector.
    pub fn new(
        catalog: Arc<MetricCatalog>,
        source: Arc<dyn DeviceSource>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            source,
            namespace: namespace.into(),
            invalid_metric: Counter::default(),
            last_pass: RwLock::new(None),
        }
    }

    /// Every metric this collector can emit.
    pub fn describe(&self) -> Vec<MetricDefinition> {
        self.catalog
            .definitions()
            .copied()
            .chain(std::iter::once(INVALID_METRIC))
            .collect()
    }

    /// Run one pass: fetch all devices and coerce every known attribute.
    ///
    /// Only a failed fetch aborts the pass. Coercion failures are counted,
    /// logged and skipped.
    pub async fn collect(&self) -> Result<CollectionPass, CollectError> {
        let started = Instant::now();

        let devices = self.source.devices().await.map_err(|e| {
            error!(error = %e, "Failed to read list of devices");
            CollectError::Fetch(e)
        })?;

        let mut pass = CollectionPass {
            devices: devices.len(),
            ..Default::default()
        };
        for device in devices {
            self.collect_device(device, &mut pass);
        }

        let summary = PassSummary {
            devices: pass.devices,
            samples: pass.samples.len(),
            failures: pass.failures,
            duration: started.elapsed(),
        };
        debug!(
            devices = summary.devices,
            samples = summary.samples,
            failures = summary.failures,
            duration_ms = summary.duration.as_millis() as u64,
            "Collection pass complete"
        );
        *self.last_pass.write() = Some(summary);

        Ok(pass)
    }

    fn collect_device(&self, device: Device, pass: &mut CollectionPass) {
        let labels = DeviceLabels::from(&device);

        for (attribute, raw) in device.attributes {
            let Some(entry) = self.catalog.lookup(&attribute) else {
                continue;
            };

            let raw = raw.normalized();
            match entry.coercion.apply(&raw) {
                Ok(value) => pass.samples.push(Sample {
                    definition: entry.definition,
                    labels: labels.clone(),
                    value,
                }),
                Err(e) => {
                    self.invalid_metric.inc();
                    pass.failures += 1;
                    warn!(
                        device_id = %labels.id,
                        device_name = %labels.name,
                        attribute = %attribute,
                        value_kind = raw.kind(),
                        error = %e,
                        "Cannot process sensor data"
                    );
                }
            }
        }
    }

    /// Run one pass and encode it in OpenMetrics text format.
    ///
    /// The output also carries the cumulative failure counter and build info.
    pub async fn scrape(&self) -> Result<String, CollectError> {
        let pass = self.collect().await?;

        let mut registry = if self.namespace.is_empty() {
            Registry::default()
        } else {
            Registry::with_prefix(&self.namespace)
        };
        // Registry appends the trailing period to help text itself.
        registry.register(
            INVALID_METRIC.name,
            INVALID_METRIC.help.trim_end_matches('.'),
            self.invalid_metric.clone(),
        );
        registry.register(
            "exporter_build",
            "Build information of the exporter",
            Info::new(vec![(
                "version".to_string(),
                env!("CARGO_PKG_VERSION").to_string(),
            )]),
        );
        registry.register_collector(Box::new(pass));

        let mut body = String::new();
        encode(&mut body, &registry)?;
        Ok(body)
    }

    /// Cumulative number of readings that failed coercion.
    pub fn invalid_metrics(&self) -> u64 {
        self.invalid_metric.get()
    }

    /// Summary of the latest successful pass, if any.
    pub fn last_pass(&self) -> Option<PassSummary> {
        *self.last_pass.read()
    }
}

/// Shareable collector handle.
pub type SharedCollector = Arc<DeviceCollector>;

/// Escape special characters in label values.
///
/// The text encoder writes label values verbatim.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use smartthings_common::{AttributeValue, Error};

    struct StaticSource(Vec<Device>);

    #[async_trait]
    impl DeviceSource for StaticSource {
        async fn devices(&self) -> smartthings_common::Result<Vec<Device>> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl DeviceSource for FailingSource {
        async fn devices(&self) -> smartthings_common::Result<Vec<Device>> {
            Err(Error::Status {
                url: "http://localhost/devices".to_string(),
                status: 500,
            })
        }
    }

    fn make_collector(source: impl DeviceSource + 'static) -> DeviceCollector {
        DeviceCollector::new(
            Arc::new(MetricCatalog::smartthings()),
            Arc::new(source),
            "smartthings",
        )
    }

    #[tokio::test]
    async fn test_collect_known_attributes() {
        let collector = make_collector(StaticSource(vec![
            Device::new("1", "Door")
                .with_attribute("contact", "closed")
                .with_attribute("battery", 87.5),
        ]));

        let pass = collector.collect().await.unwrap();

        assert_eq!(pass.devices, 1);
        assert_eq!(pass.samples.len(), 2);
        assert_eq!(pass.value("contact_closed", "1"), Some(1.0));
        assert_eq!(pass.value("battery_percentage", "1"), Some(87.5));
        assert_eq!(pass.failures, 0);
        assert_eq!(collector.invalid_metrics(), 0);

        let sample = &pass.samples[0];
        assert_eq!(sample.labels.id, "1");
        assert_eq!(sample.labels.name, "Door");
    }

    #[tokio::test]
    async fn test_unknown_attributes_skipped_without_failure() {
        let collector = make_collector(StaticSource(vec![
            Device::new("1", "Thermostat")
                .with_attribute("humidity", 40.0)
                .with_attribute("thermostatMode", "heat")
                .with_attribute("lock", AttributeValue::Null),
        ]));

        let pass = collector.collect().await.unwrap();

        assert!(pass.samples.is_empty());
        assert_eq!(pass.failures, 0);
        assert_eq!(collector.invalid_metrics(), 0);
    }

    #[tokio::test]
    async fn test_failure_isolated_to_attribute() {
        let collector = make_collector(StaticSource(vec![
            Device::new("1", "Hallway")
                .with_attribute("motion", "maybe")
                .with_attribute("temperature", 71.0),
            Device::new("2", "Outlet")
                .with_attribute("switch", "on")
                .with_attribute("power", "12"),
        ]));

        let pass = collector.collect().await.unwrap();

        assert_eq!(pass.value("temperature_fahrenheit", "1"), Some(71.0));
        assert_eq!(pass.value("switch_enabled", "2"), Some(1.0));
        assert_eq!(pass.value("motion_detected", "1"), None);
        assert_eq!(pass.value("power_usage_watts", "2"), None);
        assert_eq!(pass.failures, 2);
        assert_eq!(collector.invalid_metrics(), 2);
    }

    #[tokio::test]
    async fn test_null_reading_normalized() {
        let collector = make_collector(StaticSource(vec![
            Device::new("1", "Detector")
                .with_attribute("smoke", AttributeValue::Null)
                .with_attribute("contact", AttributeValue::Null)
                .with_attribute("battery", AttributeValue::Null),
        ]));

        let pass = collector.collect().await.unwrap();

        // "" is a non-clear string; it matches neither contact option and is not a number.
        assert_eq!(pass.value("smoke_detected", "1"), Some(1.0));
        assert_eq!(pass.samples.len(), 1);
        assert_eq!(pass.failures, 2);
    }

    #[tokio::test]
    async fn test_energy_scaled_to_joules() {
        let collector = make_collector(StaticSource(vec![
            Device::new("7", "Meter").with_attribute("energy", 1.5),
        ]));

        let pass = collector.collect().await.unwrap();
        assert_eq!(pass.value("energy_usage_joules", "7"), Some(5_400_000.0));
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_pass() {
        let collector = make_collector(FailingSource);

        let result = collector.collect().await;

        assert!(matches!(result, Err(CollectError::Fetch(_))));
        assert_eq!(collector.invalid_metrics(), 0);
        assert!(collector.last_pass().is_none());
        assert!(collector.scrape().await.is_err());
    }

    #[tokio::test]
    async fn test_failure_counter_is_cumulative() {
        let collector = make_collector(StaticSource(vec![
            Device::new("2", "Leak").with_attribute("presence", "nope"),
        ]));

        collector.collect().await.unwrap();
        collector.collect().await.unwrap();
        let pass = collector.collect().await.unwrap();

        assert_eq!(pass.failures, 1);
        assert_eq!(collector.invalid_metrics(), 3);
    }

    #[tokio::test]
    async fn test_last_pass_summary() {
        let collector = make_collector(StaticSource(vec![
            Device::new("1", "Door").with_attribute("contact", "open"),
            Device::new("2", "Leak").with_attribute("presence", "nope"),
        ]));

        collector.collect().await.unwrap();
        let summary = collector.last_pass().unwrap();

        assert_eq!(summary.devices, 2);
        assert_eq!(summary.samples, 1);
        assert_eq!(summary.failures, 1);
    }

    #[test]
    fn test_describe_lists_catalog_and_counter() {
        let collector = make_collector(StaticSource(Vec::new()));
        let definitions = collector.describe();

        assert_eq!(definitions.len(), MetricCatalog::smartthings().len() + 1);
        assert!(definitions.contains(&INVALID_METRIC));
        assert!(definitions.iter().any(|d| d.name == "contact_closed"));
    }

    #[tokio::test]
    async fn test_scrape_encodes_families() {
        let collector = make_collector(StaticSource(vec![
            Device::new("1", "Door").with_attribute("contact", "closed"),
            Device::new("3", "Back Door").with_attribute("contact", "open"),
            Device::new("2", "Leak").with_attribute("presence", "nope"),
        ]));

        let body = collector.scrape().await.unwrap();

        assert_eq!(
            body.matches("# TYPE smartthings_contact_closed gauge").count(),
            1
        );
        assert!(body.contains("# HELP smartthings_contact_closed 1 if the contact is closed"));
        assert!(body.contains(r#"smartthings_contact_closed{id="1",name="Door"} 1"#));
        assert!(body.contains(r#"smartthings_contact_closed{id="3",name="Back Door"} 0"#));
        assert!(body.contains("# TYPE smartthings_invalid_metric counter"));
        assert!(body.contains("smartthings_invalid_metric_total 1"));
        assert!(body.contains("smartthings_exporter_build_info{version="));
        assert!(!body.contains("presence_detected{"));
        assert!(body.ends_with("# EOF\n"));
    }

    #[tokio::test]
    async fn test_scrape_escapes_label_values() {
        let collector = make_collector(StaticSource(vec![
            Device::new("1", "Kid's \"Room\"\nx").with_attribute("contact", "closed"),
            Device::new("a\\b", "Garage").with_attribute("switch", "on"),
        ]));

        let body = collector.scrape().await.unwrap();

        assert!(
            body.contains(r#"smartthings_contact_closed{id="1",name="Kid's \"Room\"\nx"} 1"#)
        );
        assert!(body.contains(r#"smartthings_switch_enabled{id="a\\b",name="Garage"} 1"#));
        assert!(
            body.lines()
                .all(|l| l.starts_with('#') || l.starts_with("smartthings_"))
        );
    }

    #[tokio::test]
    async fn test_composite_known_attribute_counts_as_failure() {
        let battery = AttributeValue::Composite(serde_json::json!([90, 80]));
        let axis = AttributeValue::Composite(serde_json::json!({"x": 1}));
        let collector = make_collector(StaticSource(vec![
            Device::new("1", "Multi")
                .with_attribute("battery", battery)
                .with_attribute("threeAxis", axis)
                .with_attribute("motion", "active"),
        ]));

        let pass = collector.collect().await.unwrap();

        assert_eq!(pass.value("motion_detected", "1"), Some(1.0));
        assert_eq!(pass.value("battery_percentage", "1"), None);
        assert_eq!(pass.failures, 1);
        assert_eq!(collector.invalid_metrics(), 1);
    }

    #[test]
    fn test_escape_label_value() {
        assert_eq!(escape_label_value("simple"), "simple");
        assert_eq!(escape_label_value("with\"quote"), "with\\\"quote");
        assert_eq!(escape_label_value("with\\backslash"), "with\\\\backslash");
        assert_eq!(escape_label_value("with\nnewline"), "with\\nnewline");
    }

    #[test]
    fn test_empty_pass_encodes_nothing() {
        let mut registry = Registry::default();
        registry.register_collector(Box::new(CollectionPass::default()));

        let mut body = String::new();
        encode(&mut body, &registry).unwrap();

        assert_eq!(body, "# EOF\n");
    }
}
