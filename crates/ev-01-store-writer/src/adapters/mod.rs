//! # Adapters Layer
//!
//! - `elasticsearch`: the production store over its HTTP API.
//! - `memory`: an in-process store with the same strict mapping, used by
//!   tests and local runs.

pub mod elasticsearch;
pub mod memory;

pub use elasticsearch::{ElasticsearchConfig, ElasticsearchStore};
pub use memory::{InMemoryStore, StoreOp};
