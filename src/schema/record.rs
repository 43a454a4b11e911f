//! Sample record schema definition
//!
//! The flat JSON shape the ingestion layer emits for every interval in a
//! health export. Timestamps and stage tags stay as strings here; conversion
//! into `RawSample` decides what is usable.

use crate::types::{RawSample, SleepStage};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Current record schema version
pub const SCHEMA_VERSION: &str = "sleep.sample.v1";

/// One interval record as delivered by the ingestion layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Interval start timestamp
    #[serde(alias = "startDate", alias = "start_date")]
    pub start: String,
    /// Interval end timestamp
    #[serde(alias = "endDate", alias = "end_date")]
    pub end: String,
    /// Vendor stage tag (e.g. "InBed", "AsleepCore")
    #[serde(alias = "value", alias = "stageTag", alias = "stage_tag")]
    pub stage: String,
    /// Opaque source identifier
    #[serde(
        default,
        alias = "sourceName",
        alias = "source_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub source: Option<String>,
}

impl SampleRecord {
    /// Create a record from typed values
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, stage: &str) -> Self {
        SampleRecord {
            start: start.to_rfc3339(),
            end: end.to_rfc3339(),
            stage: stage.to_string(),
            source: None,
        }
    }

    /// Add a source identifier
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn parsed_start(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.start)
    }

    pub fn parsed_end(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.end)
    }

    pub fn parsed_stage(&self) -> SleepStage {
        SleepStage::from_tag(&self.stage)
    }

    /// Convert to a `RawSample`; `None` when either timestamp is unparseable
    pub fn to_sample(&self) -> Option<RawSample> {
        let sample = RawSample {
            start: self.parsed_start()?,
            end: self.parsed_end()?,
            stage: self.parsed_stage(),
            source: self.source.clone(),
        };
        Some(sample)
    }

    /// Every problem with this record, empty when it is fully usable
    pub fn issues(&self) -> Vec<RecordIssue> {
        let mut issues = Vec::new();

        let start = self.parsed_start();
        if start.is_none() {
            issues.push(RecordIssue::InvalidStart(self.start.clone()));
        }
        let end = self.parsed_end();
        if end.is_none() {
            issues.push(RecordIssue::InvalidEnd(self.end.clone()));
        }
        if let (Some(start), Some(end)) = (start, end) {
            if end <= start {
                issues.push(RecordIssue::NonPositiveDuration {
                    start: self.start.clone(),
                    end: self.end.clone(),
                });
            }
        }
        if self.parsed_stage() == SleepStage::Unknown {
            issues.push(RecordIssue::UnknownStage(self.stage.clone()));
        }

        issues
    }
}

/// Problems found in a single record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordIssue {
    #[error("Unparseable start timestamp: {0}")]
    InvalidStart(String),

    #[error("Unparseable end timestamp: {0}")]
    InvalidEnd(String),

    #[error("End {end} is not after start {start}")]
    NonPositiveDuration { start: String, end: String },

    #[error("Unknown stage tag: {0}")]
    UnknownStage(String),
}

/// Parse the timestamp formats seen in health exports.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS ±HHMM`, and offset-less
/// `YYYY-MM-DD[T ]HH:MM:SS[.fff]` (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S %z") {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}
