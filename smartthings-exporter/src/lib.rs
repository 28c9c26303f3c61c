//! Prometheus exporter for SmartThings devices.
//!
//! This crate polls the SmartThings SmartApp API on every scrape and exposes
//! selected device attributes as Prometheus gauges.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ SmartThings API │<────│ DeviceCollector │<────│   HTTP Server   │
//! │   (/devices)    │     │ catalog+coerce  │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! Each request to the metrics path fetches the device list, looks every
//! attribute up in the [`catalog::MetricCatalog`], converts the reading with
//! its [`coerce::Coercion`] rule and encodes the resulting gauges. Readings
//! that cannot be converted are counted in `smartthings_invalid_metric_total`
//! and never abort the scrape.
//!
//! The counter family is `smartthings_invalid_metric`. Its sample carries the
//! OpenMetrics `_total` suffix, so dashboards and alerts that queried the bare
//! `smartthings_invalid_metric` series must switch to
//! `smartthings_invalid_metric_total`.
//!
//! # Usage
//!
//! ```bash
//! smartthings-exporter --config config.json5
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod catalog;
pub mod coerce;
pub mod collector;
pub mod config;
pub mod http;

pub use catalog::{CatalogEntry, MetricCatalog, MetricDefinition};
pub use coerce::{Coercion, CoercionError};
pub use collector::{CollectError, CollectionPass, DeviceCollector, SharedCollector};
pub use config::ExporterConfig;
pub use http::HttpServer;
