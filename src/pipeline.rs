//! Pipeline orchestration
//!
//! This module provides the public API of the engine. It runs one batch of
//! samples through every stage and returns per-day session summaries.

use crate::aggregator::DailyAggregator;
use crate::anomaly::EnvelopeFilter;
use crate::builder::SessionBuilder;
use crate::clusterer::GapClusterer;
use crate::config::ReconstructionConfig;
use crate::error::ReconstructError;
use crate::sanitize::Sanitizer;
use crate::schema::{SampleAdapter, SampleRecord};
use crate::types::{DailySleepSummary, RawSample, ReconstructionReport, ReconstructionStats};

/// Reconstruct daily sleep sessions with the default configuration.
///
/// Input order does not matter. Bad data is filtered, never rejected, so an
/// empty or entirely invalid batch yields an empty result.
///
/// # Example
/// ```ignore
/// let days = reconstruct(&samples);
/// for day in &days {
///     println!("{}: {} session(s)", day.date, day.sessions.len());
/// }
/// ```
pub fn reconstruct(samples: &[RawSample]) -> Vec<DailySleepSummary> {
    SessionReconstructor::new().reconstruct(samples)
}

/// Convert a JSON array of sample records into a JSON array of daily summaries.
///
/// # Arguments
/// * `raw_json` - JSON array of `SampleRecord`s
///
/// # Returns
/// JSON array of `DailySleepSummary`, sorted by date
pub fn samples_to_daily_json(raw_json: String) -> Result<String, ReconstructError> {
    SessionReconstructor::new().process_json(&raw_json)
}

/// Reconstruction engine bound to one configuration.
///
/// Holds no state between calls; a single instance may be shared freely.
#[derive(Debug, Clone, Default)]
pub struct SessionReconstructor {
    config: ReconstructionConfig,
}

impl SessionReconstructor {
    /// Create a reconstructor with default thresholds
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reconstructor with a validated configuration
    pub fn with_config(config: ReconstructionConfig) -> Result<Self, ReconstructError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Load configuration from JSON
    pub fn from_config_json(json: &str) -> Result<Self, ReconstructError> {
        Ok(Self {
            config: ReconstructionConfig::from_json(json)?,
        })
    }

    pub fn config(&self) -> &ReconstructionConfig {
        &self.config
    }

    /// Reconstruct daily summaries from samples
    pub fn reconstruct(&self, samples: &[RawSample]) -> Vec<DailySleepSummary> {
        self.reconstruct_with_report(samples).summaries
    }

    /// Reconstruct daily summaries and report what each stage dropped.
    ///
    /// Stages:
    /// 1. Sanitizer - drop malformed/unknown/duplicate samples, sort
    /// 2. EnvelopeFilter - discard implausible in-bed markers
    /// 3. GapClusterer - split on unbridged gaps
    /// 4. SessionBuilder - bounds, envelope extension, noise floor
    /// 5. DailyAggregator - group by start date
    pub fn reconstruct_with_report(&self, samples: &[RawSample]) -> ReconstructionReport {
        let config = &self.config;

        // Stage 1: Sanitize
        let batch = Sanitizer::sanitize(samples);

        // Stage 2: Filter implausible envelopes
        let envelopes = EnvelopeFilter::filter(&batch.envelopes, config);

        // Stage 3: Cluster stage samples
        let clusters = GapClusterer::cluster(&batch.stage_samples, &envelopes.trusted, config);

        // Stage 4: Build sessions
        let sessions: Vec<_> = clusters
            .iter()
            .filter_map(|cluster| SessionBuilder::build(cluster, &envelopes.trusted, config))
            .collect();

        let stats = ReconstructionStats {
            input_samples: samples.len(),
            malformed_samples: batch.malformed,
            unknown_samples: batch.unknown,
            duplicate_samples: batch.duplicates,
            envelope_markers: batch.envelopes.len(),
            rejected_envelopes: envelopes.rejected,
            clusters: clusters.len(),
            bridged_gaps: clusters.iter().map(|c| c.bridged_gaps).sum(),
            noise_clusters: clusters.len() - sessions.len(),
            sessions: sessions.len(),
        };

        // Stage 5: Aggregate by day
        let summaries = DailyAggregator::aggregate(sessions);

        log::debug!(
            "reconstructed {} session(s) over {} day(s) from {} sample(s) \
             ({} malformed, {} unknown, {} duplicate, {} envelope(s) rejected, {} noise cluster(s))",
            stats.sessions,
            summaries.len(),
            stats.input_samples,
            stats.malformed_samples,
            stats.unknown_samples,
            stats.duplicate_samples,
            stats.rejected_envelopes,
            stats.noise_clusters
        );

        ReconstructionReport { summaries, stats }
    }

    /// Reconstruct from sample records; unparseable records count as malformed
    pub fn reconstruct_records(&self, records: &[SampleRecord]) -> ReconstructionReport {
        let samples = SampleAdapter::to_samples(records);
        let mut report = self.reconstruct_with_report(&samples);
        report.stats.input_samples = records.len();
        report.stats.malformed_samples += records.len() - samples.len();
        report
    }

    /// Process a JSON array of sample records into a JSON array of summaries
    pub fn process_json(&self, raw_json: &str) -> Result<String, ReconstructError> {
        let records = SampleAdapter::parse_array(raw_json)?;
        let report = self.reconstruct_records(&records);
        serde_json::to_string(&report.summaries)
            .map_err(|e| ReconstructError::EncodingError(e.to_string()))
    }
}
