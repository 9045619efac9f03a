//! # Domain Layer
//!
//! Index layout, write outcomes and retry rules. No I/O.

pub mod entities;
pub mod errors;
pub mod schema;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use schema::*;
pub use value_objects::*;
