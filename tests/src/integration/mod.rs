//! # Integration Scenarios
//!
//! Cross-crate behaviour of pipeline, store writer, flush bus and hub.

pub mod at_least_once;
pub mod end_to_end;
pub mod live_fanout;
