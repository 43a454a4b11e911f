//! Sleep Sessions - deterministic reconstruction of daily sleep sessions
//!
//! Transforms a raw, unordered batch of wearable interval samples (sleep-stage
//! annotations plus coarse "in bed" envelope markers) into the sleep sessions a
//! person actually had, grouped by calendar day:
//! sanitize → envelope anomaly filter → gap clustering → session building →
//! daily aggregation.
//!
//! The engine is pure: no I/O, no shared state, identical output for the same
//! sample set regardless of order.
//!
//! ## Modules
//!
//! - **Engine**: `sanitize`, `anomaly`, `clusterer`, `builder`, `aggregator`,
//!   orchestrated by `pipeline`
//! - **Schema**: flat JSON sample records and their adapter

pub mod aggregator;
pub mod anomaly;
pub mod builder;
pub mod clusterer;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod sanitize;
pub mod schema;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{NoiseFloorBasis, ReconstructionConfig};
pub use error::ReconstructError;
pub use pipeline::{reconstruct, samples_to_daily_json, SessionReconstructor};
pub use types::{
    DailySleepSummary, RawSample, ReconstructionReport, ReconstructionStats, SleepSession,
    SleepStage,
};

// Schema exports
pub use schema::{SampleAdapter, SampleRecord, SCHEMA_VERSION};

/// Engine version
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "sleep-sessions";
