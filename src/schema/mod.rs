//! Sample record schema
//!
//! This module defines the flat input record the ingestion layer produces and
//! the adapter that turns batches of records into engine input.

mod adapter;
mod record;

pub use adapter::*;
pub use record::*;
