//! # Service Container
//!
//! Configuration and the shared services built from it.

pub mod config;
pub mod services;

pub use config::{BrokerSettings, ConfigError, IngestConfig, ReportingSettings, ServerSettings, StoreSettings};
pub use services::IngestContainer;
