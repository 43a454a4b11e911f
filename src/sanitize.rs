//! Input sanitization
//!
//! Drops samples the engine must never see (malformed intervals, unknown
//! stage tags, exact re-deliveries), puts the rest in a total order, and
//! separates envelope markers from stage samples.

use crate::types::{RawSample, SleepStage};

/// Samples ready for the reconstruction stages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizedBatch {
    /// InBed markers, sorted
    pub envelopes: Vec<RawSample>,
    /// Core/Deep/REM/Awake samples, sorted
    pub stage_samples: Vec<RawSample>,
    /// Samples with `end <= start`
    pub malformed: usize,
    /// Samples tagged `Unknown`
    pub unknown: usize,
    /// Exact duplicates removed
    pub duplicates: usize,
}

/// Sanitizer for raw sample batches
pub struct Sanitizer;

impl Sanitizer {
    pub fn sanitize(samples: &[RawSample]) -> SanitizedBatch {
        let mut batch = SanitizedBatch::default();

        let mut kept: Vec<RawSample> = Vec::with_capacity(samples.len());
        for sample in samples {
            if !sample.is_valid() {
                batch.malformed += 1;
                continue;
            }
            match sample.stage {
                SleepStage::Unknown => batch.unknown += 1,
                SleepStage::InBed
                | SleepStage::Core
                | SleepStage::Deep
                | SleepStage::Rem
                | SleepStage::Awake => kept.push(sample.clone()),
            }
        }

        kept.sort();
        let before = kept.len();
        kept.dedup();
        batch.duplicates = before - kept.len();

        let (envelopes, stage_samples): (Vec<_>, Vec<_>) =
            kept.into_iter().partition(|s| s.stage.is_envelope());
        batch.envelopes = envelopes;
        batch.stage_samples = stage_samples;

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
    }

    #[test]
    fn test_drops_malformed_and_unknown() {
        let samples = vec![
            RawSample::new(at(2, 0), at(1, 0), SleepStage::Core),
            RawSample::new(at(2, 0), at(2, 0), SleepStage::Deep),
            RawSample::new(at(1, 0), at(2, 0), SleepStage::Unknown),
            RawSample::new(at(1, 0), at(2, 0), SleepStage::Rem),
        ];

        let batch = Sanitizer::sanitize(&samples);
        assert_eq!(batch.malformed, 2);
        assert_eq!(batch.unknown, 1);
        assert_eq!(batch.stage_samples.len(), 1);
        assert!(batch.envelopes.is_empty());
    }

    #[test]
    fn test_sorts_partitions_and_dedups() {
        let samples = vec![
            RawSample::new(at(3, 0), at(4, 0), SleepStage::Core),
            RawSample::new(at(0, 0), at(8, 0), SleepStage::InBed),
            RawSample::new(at(1, 0), at(2, 0), SleepStage::Deep),
            RawSample::new(at(3, 0), at(4, 0), SleepStage::Core),
            RawSample::new(at(3, 0), at(4, 0), SleepStage::Core).with_source("phone"),
        ];

        let batch = Sanitizer::sanitize(&samples);
        assert_eq!(batch.duplicates, 1);
        assert_eq!(batch.envelopes, vec![RawSample::new(at(0, 0), at(8, 0), SleepStage::InBed)]);
        assert_eq!(
            batch.stage_samples,
            vec![
                RawSample::new(at(1, 0), at(2, 0), SleepStage::Deep),
                RawSample::new(at(3, 0), at(4, 0), SleepStage::Core),
                RawSample::new(at(3, 0), at(4, 0), SleepStage::Core).with_source("phone"),
            ]
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(Sanitizer::sanitize(&[]), SanitizedBatch::default());
    }
}
