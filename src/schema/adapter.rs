//! Adapter for converting sample records into engine input
//!
//! Decodes JSON arrays and NDJSON streams of `SampleRecord`s and turns them
//! into `RawSample`s. Individual bad records never fail a batch: they are
//! dropped here (unparseable timestamps) or later by the engine, and can be
//! listed with `validate_records`.

use crate::error::ReconstructError;
use crate::schema::record::{RecordIssue, SampleRecord};
use crate::types::RawSample;

/// Adapter for sample record documents
pub struct SampleAdapter;

impl SampleAdapter {
    /// Parse a JSON string containing an array of records
    pub fn parse_array(json: &str) -> Result<Vec<SampleRecord>, ReconstructError> {
        let records: Vec<SampleRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) containing records
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<SampleRecord>, ReconstructError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<SampleRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(ReconstructError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Convert records to samples, dropping those with unparseable timestamps
    pub fn to_samples(records: &[SampleRecord]) -> Vec<RawSample> {
        records.iter().filter_map(SampleRecord::to_sample).collect()
    }

    /// List every problem in a batch of records
    pub fn validate_records(records: &[SampleRecord]) -> Vec<ValidationIssue> {
        records
            .iter()
            .enumerate()
            .flat_map(|(index, record)| {
                record.issues().into_iter().map(move |issue| ValidationIssue {
                    index,
                    source: record.source.clone(),
                    issue,
                })
            })
            .collect()
    }
}

/// A problem found in one record of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub index: usize,
    pub source: Option<String>,
    pub issue: RecordIssue,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SleepStage;

    const NDJSON: &str = r#"
{"start": "2024-01-15T22:00:00Z", "end": "2024-01-16T07:00:00Z", "stage": "InBed"}

{"start": "2024-01-15T22:30:00Z", "end": "2024-01-16T06:30:00Z", "stage": "Core", "source": "ring"}
{"start": "garbage", "end": "2024-01-16T06:30:00Z", "stage": "Core"}
"#;

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let records = SampleAdapter::parse_ndjson(NDJSON).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].source.as_deref(), Some("ring"));
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let err = SampleAdapter::parse_ndjson("{\"start\": 1}\n").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_parse_array() {
        let json = r#"[{"start": "2024-01-15T22:00:00Z", "end": "2024-01-15T23:00:00Z", "stage": "Deep"}]"#;
        let records = SampleAdapter::parse_array(json).unwrap();
        assert_eq!(records.len(), 1);
        assert!(SampleAdapter::parse_array("not json").is_err());
    }

    #[test]
    fn test_to_samples_drops_unparseable() {
        let records = SampleAdapter::parse_ndjson(NDJSON).unwrap();
        let samples = SampleAdapter::to_samples(&records);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].stage, SleepStage::InBed);
        assert_eq!(samples[1].stage, SleepStage::Core);
    }

    #[test]
    fn test_validate_records() {
        let records = SampleAdapter::parse_ndjson(NDJSON).unwrap();
        let issues = SampleAdapter::validate_records(&records);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].index, 2);
        assert!(matches!(issues[0].issue, RecordIssue::InvalidStart(_)));
    }
}
