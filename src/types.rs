//! Core types for sleep session reconstruction
//!
//! This module defines the data structures that flow through each stage of the
//! engine: raw interval samples, reconstructed sessions, and daily summaries.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Stage annotation attached to a raw interval sample.
///
/// `InBed` marks an envelope (the person was in bed, not necessarily asleep).
/// `Unknown` covers every tag the engine does not understand and is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepStage {
    InBed,
    Core,
    Deep,
    Rem,
    Awake,
    Unknown,
}

impl SleepStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SleepStage::InBed => "in_bed",
            SleepStage::Core => "core",
            SleepStage::Deep => "deep",
            SleepStage::Rem => "rem",
            SleepStage::Awake => "awake",
            SleepStage::Unknown => "unknown",
        }
    }

    /// Interpret a vendor stage tag.
    ///
    /// Matching is case-insensitive and ignores `_`, `-` and spaces. Health
    /// export prefixes (`HKCategoryValueSleepAnalysis`) and `Asleep` prefixes
    /// are accepted. Unspecified asleep tags count as core sleep.
    pub fn from_tag(tag: &str) -> SleepStage {
        let normalized: String = tag
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        let normalized = normalized
            .strip_prefix("hkcategoryvaluesleepanalysis")
            .unwrap_or(&normalized);

        match normalized {
            "inbed" => SleepStage::InBed,
            "core" | "asleepcore" | "light" | "asleep" | "asleepunspecified" => SleepStage::Core,
            "deep" | "asleepdeep" => SleepStage::Deep,
            "rem" | "asleeprem" => SleepStage::Rem,
            "awake" => SleepStage::Awake,
            _ => SleepStage::Unknown,
        }
    }

    /// Envelope markers are coarse in-bed intervals, never sleep evidence
    pub fn is_envelope(&self) -> bool {
        matches!(self, SleepStage::InBed)
    }

    /// Stage samples are the only records that form sessions
    pub fn is_stage_sample(&self) -> bool {
        match self {
            SleepStage::Core | SleepStage::Deep | SleepStage::Rem | SleepStage::Awake => true,
            SleepStage::InBed | SleepStage::Unknown => false,
        }
    }
}

/// One recorded interval from a wearable export.
///
/// Field order matters: the derived `Ord` is the total order the engine sorts
/// by, so reconstruction does not depend on input order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RawSample {
    /// Interval start (UTC)
    pub start: DateTime<Utc>,
    /// Interval end (UTC), strictly after `start` when valid
    pub end: DateTime<Utc>,
    /// Stage annotation
    pub stage: SleepStage,
    /// Opaque source identifier (device or app name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl RawSample {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, stage: SleepStage) -> Self {
        Self {
            start,
            end,
            stage,
            source: None,
        }
    }

    /// Attach a source identifier
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Sum of sample durations, saturating at `TimeDelta::MAX`/`MIN`
    pub fn total_duration<'a>(samples: impl IntoIterator<Item = &'a RawSample>) -> TimeDelta {
        saturating_total(samples.into_iter().map(RawSample::duration))
    }

    /// An interval is valid only when it has positive length
    pub fn is_valid(&self) -> bool {
        self.end > self.start
    }
}

/// A reconstructed, contiguous period of sleep-related activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepSession {
    /// Effective start, after any envelope extension (UTC)
    pub start: DateTime<Utc>,
    /// Effective end, after any envelope extension (UTC)
    pub end: DateTime<Utc>,
    /// Calendar day the session is attributed to (the local date of `start`)
    pub date: NaiveDate,
    /// Whether the session crosses a local calendar-date boundary
    pub is_overnight: bool,
    /// Contributing stage samples in chronological order
    pub samples: Vec<RawSample>,
}

impl SleepSession {
    /// Effective span of the session
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Sum of contributing sample durations; gaps are not counted
    pub fn covered_duration(&self) -> TimeDelta {
        RawSample::total_duration(&self.samples)
    }

    /// Sum of durations of samples tagged with `stage`
    pub fn stage_duration(&self, stage: SleepStage) -> TimeDelta {
        RawSample::total_duration(self.samples.iter().filter(|s| s.stage == stage))
    }

    /// Earliest start among contributing samples
    pub fn raw_start(&self) -> Option<DateTime<Utc>> {
        self.samples.iter().map(|s| s.start).min()
    }

    /// Latest end among contributing samples
    pub fn raw_end(&self) -> Option<DateTime<Utc>> {
        self.samples.iter().map(|s| s.end).max()
    }

    /// True when an envelope marker pushed either boundary outward
    pub fn was_extended(&self) -> bool {
        self.raw_start().is_some_and(|s| s != self.start)
            || self.raw_end().is_some_and(|e| e != self.end)
    }
}

/// Sessions attributed to one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySleepSummary {
    /// Calendar date (YYYY-MM-DD)
    pub date: NaiveDate,
    /// Sessions sorted ascending by start
    pub sessions: Vec<SleepSession>,
}

impl DailySleepSummary {
    /// Covered stage-sample time across all sessions of the day
    pub fn total_covered_duration(&self) -> TimeDelta {
        saturating_total(self.sessions.iter().map(SleepSession::covered_duration))
    }

    pub fn overnight_count(&self) -> usize {
        self.sessions.iter().filter(|s| s.is_overnight).count()
    }
}

/// Add durations without overflow; long-span inputs clamp instead of panicking
fn saturating_total(durations: impl Iterator<Item = TimeDelta>) -> TimeDelta {
    durations.fold(TimeDelta::zero(), |acc, d| {
        acc.checked_add(&d).unwrap_or(if d < TimeDelta::zero() {
            TimeDelta::MIN
        } else {
            TimeDelta::MAX
        })
    })
}

/// Counters describing what each stage kept and dropped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructionStats {
    /// Records or samples handed to the engine
    pub input_samples: usize,
    /// Dropped for unparseable timestamps or `end <= start`
    pub malformed_samples: usize,
    /// Dropped for an unrecognized stage tag
    pub unknown_samples: usize,
    /// Exact duplicates removed
    pub duplicate_samples: usize,
    /// Valid in-bed markers seen
    pub envelope_markers: usize,
    /// In-bed markers discarded as implausibly long
    pub rejected_envelopes: usize,
    /// Raw clusters formed
    pub clusters: usize,
    /// Gaps kept inside a cluster because an envelope covered them
    pub bridged_gaps: usize,
    /// Clusters dropped below the noise floor
    pub noise_clusters: usize,
    /// Sessions emitted
    pub sessions: usize,
}

/// Daily summaries together with reconstruction diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructionReport {
    pub summaries: Vec<DailySleepSummary>,
    pub stats: ReconstructionStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
    }

    #[test]
    fn test_stage_tag_parsing() {
        assert_eq!(SleepStage::from_tag("InBed"), SleepStage::InBed);
        assert_eq!(SleepStage::from_tag("in_bed"), SleepStage::InBed);
        assert_eq!(
            SleepStage::from_tag("HKCategoryValueSleepAnalysisAsleepREM"),
            SleepStage::Rem
        );
        assert_eq!(SleepStage::from_tag("AsleepDeep"), SleepStage::Deep);
        assert_eq!(SleepStage::from_tag("Core"), SleepStage::Core);
        assert_eq!(SleepStage::from_tag("AsleepUnspecified"), SleepStage::Core);
        assert_eq!(SleepStage::from_tag("awake"), SleepStage::Awake);
        assert_eq!(SleepStage::from_tag("Napping"), SleepStage::Unknown);
        assert_eq!(SleepStage::from_tag(""), SleepStage::Unknown);
    }

    #[test]
    fn test_stage_classification() {
        assert!(SleepStage::InBed.is_envelope());
        assert!(!SleepStage::InBed.is_stage_sample());
        assert!(SleepStage::Awake.is_stage_sample());
        assert!(!SleepStage::Unknown.is_stage_sample());
        assert!(!SleepStage::Unknown.is_envelope());
    }

    #[test]
    fn test_sample_validity() {
        assert!(RawSample::new(at(1, 0), at(2, 0), SleepStage::Core).is_valid());
        assert!(!RawSample::new(at(2, 0), at(2, 0), SleepStage::Core).is_valid());
        assert!(!RawSample::new(at(3, 0), at(2, 0), SleepStage::Core).is_valid());
    }

    #[test]
    fn test_session_durations() {
        let session = SleepSession {
            start: at(0, 0),
            end: at(4, 0),
            date: at(0, 0).date_naive(),
            is_overnight: false,
            samples: vec![
                RawSample::new(at(0, 30), at(1, 30), SleepStage::Core),
                RawSample::new(at(2, 0), at(2, 30), SleepStage::Deep),
                RawSample::new(at(2, 30), at(3, 0), SleepStage::Core),
            ],
        };

        assert_eq!(session.duration(), TimeDelta::hours(4));
        assert_eq!(session.covered_duration(), TimeDelta::minutes(120));
        assert_eq!(session.stage_duration(SleepStage::Core), TimeDelta::minutes(90));
        assert_eq!(session.stage_duration(SleepStage::Rem), TimeDelta::zero());
        assert!(session.was_extended());
    }

    #[test]
    fn test_durations_saturate_on_overflow() {
        let span = RawSample::new(DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC, SleepStage::Core);
        let samples: Vec<RawSample> = (0..700)
            .map(|i| span.clone().with_source(format!("dev{}", i)))
            .collect();
        assert_eq!(RawSample::total_duration(&samples), TimeDelta::MAX);

        let session = SleepSession {
            start: span.start,
            end: span.end,
            date: span.start.date_naive(),
            is_overnight: true,
            samples,
        };
        assert_eq!(session.covered_duration(), TimeDelta::MAX);
        assert_eq!(session.stage_duration(SleepStage::Core), TimeDelta::MAX);

        let day = DailySleepSummary {
            date: session.date,
            sessions: vec![session.clone(), session],
        };
        assert_eq!(day.total_covered_duration(), TimeDelta::MAX);
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        let json = serde_json::to_string(&SleepStage::InBed).unwrap();
        assert_eq!(json, "\"in_bed\"");
    }
}
