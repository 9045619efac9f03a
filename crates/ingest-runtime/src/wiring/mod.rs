//! # Runtime Wiring
//!
//! Background tasks that connect the services in the container:
//!
//! - `relay`: flush bus → broadcast hub
//! - `reporter`: periodic stats log line and gauges

pub mod relay;
pub mod reporter;

pub use relay::{relay_event, run_relay};
pub use reporter::{collect_report, publish_report, run_reporter, StatsReport};
