//! Session building
//!
//! Turns one raw cluster into at most one `SleepSession`: computes the raw
//! bounds, widens them by every trusted envelope marker that bridged a gap or
//! overlaps the cluster, derives the overnight flag, and applies the noise
//! floor.

use crate::clusterer::RawCluster;
use crate::config::{NoiseFloorBasis, ReconstructionConfig};
use crate::types::{RawSample, SleepSession};
use chrono::{DateTime, Utc};

/// Builder for sessions from raw clusters
pub struct SessionBuilder;

impl SessionBuilder {
    /// Build a session from `cluster`.
    ///
    /// `envelopes` is the trusted marker list the cluster's bridging indices
    /// point into. Returns `None` when the cluster has no valid samples or
    /// falls below the noise floor.
    pub fn build(
        cluster: &RawCluster,
        envelopes: &[RawSample],
        config: &ReconstructionConfig,
    ) -> Option<SleepSession> {
        let samples: Vec<RawSample> = cluster
            .samples
            .iter()
            .filter(|s| s.stage.is_stage_sample() && s.is_valid())
            .cloned()
            .collect();

        let raw_start = samples.iter().map(|s| s.start).min()?;
        let raw_end = samples.iter().map(|s| s.end).max()?;

        let measured = match config.noise_floor {
            NoiseFloorBasis::CoveredDuration => RawSample::total_duration(&samples),
            NoiseFloorBasis::Span => raw_end - raw_start,
        };
        if measured < config.min_session_duration() {
            log::trace!(
                "dropping cluster at {} as noise ({} min)",
                raw_start,
                measured.num_minutes()
            );
            return None;
        }

        let (start, end) = envelopes
            .iter()
            .enumerate()
            .filter(|(idx, marker)| {
                marker.stage.is_envelope()
                    && (cluster.bridging.contains(idx) || overlaps(marker, raw_start, raw_end))
            })
            .fold((raw_start, raw_end), |(start, end), (_, marker)| {
                (start.min(marker.start), end.max(marker.end))
            });

        let date = config.local_date(start);
        let is_overnight = date != config.local_date(end);

        Some(SleepSession {
            start,
            end,
            date,
            is_overnight,
            samples,
        })
    }
}

/// Positive-length intersection between a marker and `[start, end]`
fn overlaps(marker: &RawSample, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    marker.start < end && marker.end > start
}
