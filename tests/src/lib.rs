//! # Event Stream Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Shared builders (events, harness, frame decoding)
//! └── integration/      # Cross-crate scenarios
//!     ├── at_least_once.rs   # parse isolation, windowing, commit ordering
//!     ├── live_fanout.rs     # history ring, replay, slow subscribers
//!     └── end_to_end.rs      # runtime container: log → store → live
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p ev-tests
//!
//! # By category
//! cargo test -p ev-tests integration::at_least_once
//! cargo test -p ev-tests integration::live_fanout
//!
//! # Benchmarks
//! cargo bench -p ev-tests
//! ```

#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
