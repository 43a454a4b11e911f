//! Envelope anomaly filtering
//!
//! In-bed markers occasionally arrive with absurd spans (months long). Such a
//! marker would bridge every gap it touches, so markers longer than the
//! configured ceiling are discarded before clustering and never seen again.

use crate::config::ReconstructionConfig;
use crate::types::RawSample;

/// Result of filtering envelope markers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredEnvelopes {
    /// Markers trusted for bridging and extension, in input order
    pub trusted: Vec<RawSample>,
    /// Number of markers discarded as implausible
    pub rejected: usize,
}

/// Filter for implausible envelope markers
pub struct EnvelopeFilter;

impl EnvelopeFilter {
    /// Keep markers whose duration does not exceed the configured ceiling
    pub fn filter(envelopes: &[RawSample], config: &ReconstructionConfig) -> FilteredEnvelopes {
        let ceiling = config.max_envelope_duration();

        let trusted: Vec<RawSample> = envelopes
            .iter()
            .filter(|marker| {
                let plausible = marker.stage.is_envelope() && marker.duration() <= ceiling;
                if !plausible {
                    log::trace!(
                        "discarding envelope {} -> {} ({} min)",
                        marker.start,
                        marker.end,
                        marker.duration().num_minutes()
                    );
                }
                plausible
            })
            .cloned()
            .collect();

        FilteredEnvelopes {
            rejected: envelopes.len() - trusted.len(),
            trusted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SleepStage;
    use chrono::{TimeDelta, TimeZone, Utc};

    fn marker(hours: i64) -> RawSample {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 22, 0, 0).unwrap();
        RawSample::new(start, start + TimeDelta::hours(hours), SleepStage::InBed)
    }

    #[test]
    fn test_keeps_plausible_markers() {
        let filtered = EnvelopeFilter::filter(&[marker(9)], &ReconstructionConfig::default());
        assert_eq!(filtered.trusted.len(), 1);
        assert_eq!(filtered.rejected, 0);
    }

    #[test]
    fn test_ceiling_is_inclusive() {
        let filtered = EnvelopeFilter::filter(&[marker(24), marker(25)], &ReconstructionConfig::default());
        assert_eq!(filtered.trusted, vec![marker(24)]);
        assert_eq!(filtered.rejected, 1);
    }

    #[test]
    fn test_rejects_months_long_marker() {
        let filtered = EnvelopeFilter::filter(&[marker(24 * 120)], &ReconstructionConfig::default());
        assert!(filtered.trusted.is_empty());
        assert_eq!(filtered.rejected, 1);
    }

    #[test]
    fn test_custom_ceiling() {
        let config = ReconstructionConfig::default().with_max_envelope_hours(12);
        let filtered = EnvelopeFilter::filter(&[marker(9), marker(14)], &config);
        assert_eq!(filtered.trusted, vec![marker(9)]);
    }
}
