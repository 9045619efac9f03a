//! Domain layer for the ingestion pipeline.

pub mod config;
pub mod errors;
pub mod message;
pub mod offsets;
pub mod stats;
pub mod transform;
pub mod window;

pub use config::*;
pub use errors::*;
pub use message::*;
pub use offsets::*;
pub use stats::*;
pub use transform::*;
pub use window::*;
