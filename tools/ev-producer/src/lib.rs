//! Load generator for the analytics ingestion service.
//!
//! - `generator`: random events in the producer wire shape
//! - `producer`: keyed publishing to the log with delivery reports
//! - `verify`: document count read back from the store

pub mod generator;
pub mod producer;
pub mod verify;

pub use generator::{generate_event, generate_events, UserIdMix, EVENT_TYPES, SOURCES};
pub use producer::{EventProducer, ProducerError};
pub use verify::{CountClient, VerifyError};
