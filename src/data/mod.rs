//! Modeling dataset representation and ingest.
//!
//! - lightweight named-column table (`frame`)
//! - CSV ingest + row-level validation (`ingest`)

pub mod frame;
pub mod ingest;

pub use frame::*;
pub use ingest::*;
