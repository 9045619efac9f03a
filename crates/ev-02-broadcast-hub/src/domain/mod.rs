//! # Domain Layer
//!
//! Connection identity, the history ring and hub configuration.

pub mod config;
pub mod errors;
pub mod history;

pub use config::*;
pub use errors::*;
pub use history::*;

use std::fmt;
use std::sync::Arc;

/// An encoded outbound frame, shared by every connection it is sent to.
pub type Frame = Arc<str>;

/// Hub-assigned connection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}
