//! # Store Writer (ev-01)
//!
//! Durable, idempotent persistence of processed events into a search store.
//!
//! ## Responsibilities
//!
//! - Provision the index and its retention policy on startup
//! - Write batches in one bulk request, addressed by `eventId`
//! - Report per-document refusals without failing the batch
//! - Retry retryable failures with exponential backoff
//! - Document count, newest-first search and cluster health
//!
//! ## Hexagonal Architecture
//!
//! - **Domain Layer** (`domain/`): schema, outcomes, errors, retry policy
//! - **Ports Layer** (`ports/`): `DocumentWriter` (inbound), `BulkStore` (outbound)
//! - **Service** (`service.rs`): `StoreWriter`
//! - **Adapters Layer** (`adapters/`): Elasticsearch and in-memory stores

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{ElasticsearchConfig, ElasticsearchStore, InMemoryStore, StoreOp};
pub use domain::{
    BulkItemResult, ClusterStatus, DocumentFailure, RetryPolicy, StoreError, WriteOutcome,
    WriterConfig, WriterError, DEFAULT_INDEX, LIFECYCLE_POLICY_NAME,
};
pub use ports::{BulkStore, DocumentWriter};
pub use service::StoreWriter;
