//! Gap clustering
//!
//! Walks stage samples in chronological order and partitions them into raw
//! clusters. A gap at or above the threshold closes the running cluster unless
//! a trusted envelope marker covers the whole gap, start to end.

use crate::config::ReconstructionConfig;
use crate::types::RawSample;
use chrono::{DateTime, Utc};

/// A run of stage samples not separated by an unbridged gap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCluster {
    /// Contributing samples in chronological order (never empty from `GapClusterer`)
    pub samples: Vec<RawSample>,
    /// Indices into the trusted envelope list of markers that bridged a gap
    pub bridging: Vec<usize>,
    /// Number of gaps that were bridged rather than split
    pub bridged_gaps: usize,
    /// Maximum sample end seen so far
    pub end: DateTime<Utc>,
}

impl RawCluster {
    fn open(sample: &RawSample) -> Self {
        Self {
            samples: vec![sample.clone()],
            bridging: Vec::new(),
            bridged_gaps: 0,
            end: sample.end,
        }
    }

    fn push(&mut self, sample: &RawSample) {
        self.end = self.end.max(sample.end);
        self.samples.push(sample.clone());
    }

    fn bridge(&mut self, markers: Vec<usize>) {
        self.bridged_gaps += 1;
        for idx in markers {
            if !self.bridging.contains(&idx) {
                self.bridging.push(idx);
            }
        }
    }

    /// Earliest sample start; `None` only for a hand-built empty cluster
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.samples.first().map(|s| s.start)
    }
}

/// Gap-threshold clusterer with envelope bridging
pub struct GapClusterer;

impl GapClusterer {
    /// Partition `stage_samples` into clusters.
    ///
    /// `stage_samples` must be sorted by start. Envelope markers and invalid
    /// intervals in the slice are skipped. `envelopes` must already be
    /// anomaly-filtered.
    pub fn cluster(
        stage_samples: &[RawSample],
        envelopes: &[RawSample],
        config: &ReconstructionConfig,
    ) -> Vec<RawCluster> {
        debug_assert!(stage_samples.windows(2).all(|w| w[0].start <= w[1].start));

        let threshold = config.gap_threshold();
        let mut clusters = Vec::new();
        let mut current: Option<RawCluster> = None;

        for sample in stage_samples
            .iter()
            .filter(|s| s.stage.is_stage_sample() && s.is_valid())
        {
            let Some(cluster) = current.as_mut() else {
                current = Some(RawCluster::open(sample));
                continue;
            };

            let gap = sample.start - cluster.end;
            if gap < threshold {
                cluster.push(sample);
                continue;
            }

            let covering = covering_markers(envelopes, cluster.end, sample.start);
            if covering.is_empty() {
                log::trace!(
                    "splitting at {} ({} min gap)",
                    sample.start,
                    gap.num_minutes()
                );
                clusters.push(std::mem::replace(cluster, RawCluster::open(sample)));
            } else {
                log::trace!(
                    "bridging {} min gap at {} with {} envelope(s)",
                    gap.num_minutes(),
                    sample.start,
                    covering.len()
                );
                cluster.bridge(covering);
                cluster.push(sample);
            }
        }

        clusters.extend(current);
        clusters
    }
}

/// Indices of markers covering the whole span `[gap_start, gap_end]`
fn covering_markers(
    envelopes: &[RawSample],
    gap_start: DateTime<Utc>,
    gap_end: DateTime<Utc>,
) -> Vec<usize> {
    envelopes
        .iter()
        .enumerate()
        .filter(|(_, m)| m.start <= gap_start && m.end >= gap_end)
        .map(|(idx, _)| idx)
        .collect()
}
