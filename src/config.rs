//! Reconstruction configuration
//!
//! Every threshold the engine applies lives here so callers can tune policy
//! without touching the stages. Defaults reproduce the dashboard behavior.

use crate::error::ReconstructError;
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Default gap (minutes) at which a new session starts
pub const DEFAULT_GAP_THRESHOLD_MINUTES: i64 = 120;

/// Default ceiling (hours) for a plausible continuous in-bed stretch
pub const DEFAULT_MAX_ENVELOPE_HOURS: i64 = 24;

/// Default minimum duration (minutes) for a cluster to count as sleep
pub const DEFAULT_MIN_SESSION_MINUTES: i64 = 15;

const MAX_UTC_OFFSET_MINUTES: i32 = 18 * 60;

/// What the noise floor is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseFloorBasis {
    /// Sum of contributing stage-sample durations
    #[default]
    CoveredDuration,
    /// Raw span from first sample start to last sample end
    Span,
}

/// Tunable thresholds for the reconstruction engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    /// Gaps at or above this many minutes split sessions unless bridged
    pub gap_threshold_minutes: i64,
    /// Envelope markers longer than this many hours are discarded
    pub max_envelope_hours: i64,
    /// Clusters below this many minutes are dropped as sensor noise
    pub min_session_minutes: i64,
    /// Fixed offset applied before taking calendar dates
    pub utc_offset_minutes: i32,
    /// Measure used for the noise floor
    pub noise_floor: NoiseFloorBasis,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            gap_threshold_minutes: DEFAULT_GAP_THRESHOLD_MINUTES,
            max_envelope_hours: DEFAULT_MAX_ENVELOPE_HOURS,
            min_session_minutes: DEFAULT_MIN_SESSION_MINUTES,
            utc_offset_minutes: 0,
            noise_floor: NoiseFloorBasis::default(),
        }
    }
}

impl ReconstructionConfig {
    pub fn with_gap_threshold_minutes(mut self, minutes: i64) -> Self {
        self.gap_threshold_minutes = minutes;
        self
    }

    pub fn with_max_envelope_hours(mut self, hours: i64) -> Self {
        self.max_envelope_hours = hours;
        self
    }

    pub fn with_min_session_minutes(mut self, minutes: i64) -> Self {
        self.min_session_minutes = minutes;
        self
    }

    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    pub fn with_noise_floor(mut self, basis: NoiseFloorBasis) -> Self {
        self.noise_floor = basis;
        self
    }

    pub fn gap_threshold(&self) -> TimeDelta {
        TimeDelta::try_minutes(self.gap_threshold_minutes).unwrap_or(TimeDelta::MAX)
    }

    pub fn max_envelope_duration(&self) -> TimeDelta {
        TimeDelta::try_hours(self.max_envelope_hours).unwrap_or(TimeDelta::MAX)
    }

    pub fn min_session_duration(&self) -> TimeDelta {
        TimeDelta::try_minutes(self.min_session_minutes).unwrap_or(TimeDelta::MAX)
    }

    /// Offset used for calendar attribution.
    ///
    /// Falls back to UTC when the configured value is out of range; `validate`
    /// reports that case for callers that care.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }

    /// Local calendar date of an instant
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset()).date_naive()
    }

    /// Check that every threshold is usable
    pub fn validate(&self) -> Result<(), ReconstructError> {
        if self.gap_threshold_minutes <= 0 {
            return Err(ReconstructError::InvalidConfig(format!(
                "gap_threshold_minutes must be positive, got {}",
                self.gap_threshold_minutes
            )));
        }
        if self.max_envelope_hours <= 0 {
            return Err(ReconstructError::InvalidConfig(format!(
                "max_envelope_hours must be positive, got {}",
                self.max_envelope_hours
            )));
        }
        if self.min_session_minutes < 0 {
            return Err(ReconstructError::InvalidConfig(format!(
                "min_session_minutes must not be negative, got {}",
                self.min_session_minutes
            )));
        }
        if self.utc_offset_minutes.unsigned_abs() > MAX_UTC_OFFSET_MINUTES.unsigned_abs() {
            return Err(ReconstructError::InvalidConfig(format!(
                "utc_offset_minutes must be within ±{}, got {}",
                MAX_UTC_OFFSET_MINUTES,
                self.utc_offset_minutes
            )));
        }
        Ok(())
    }

    /// Load and validate configuration from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, ReconstructError> {
        let config: ReconstructionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON
    pub fn to_json(&self) -> Result<String, ReconstructError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ReconstructError::EncodingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_defaults() {
        let config = ReconstructionConfig::default();
        assert_eq!(config.gap_threshold(), TimeDelta::minutes(120));
        assert_eq!(config.max_envelope_duration(), TimeDelta::hours(24));
        assert_eq!(config.min_session_duration(), TimeDelta::minutes(15));
        assert_eq!(config.noise_floor, NoiseFloorBasis::CoveredDuration);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config = ReconstructionConfig::from_json(r#"{"utc_offset_minutes": -300}"#).unwrap();
        assert_eq!(config.utc_offset_minutes, -300);
        assert_eq!(config.gap_threshold_minutes, DEFAULT_GAP_THRESHOLD_MINUTES);
        assert_eq!(config.noise_floor, NoiseFloorBasis::CoveredDuration);
    }

    #[test]
    fn test_json_round_trip_preserves_settings() {
        let config = ReconstructionConfig::default()
            .with_gap_threshold_minutes(90)
            .with_noise_floor(NoiseFloorBasis::Span);
        let restored = ReconstructionConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ReconstructionConfig::default()
            .with_gap_threshold_minutes(0)
            .validate()
            .is_err());
        assert!(ReconstructionConfig::default()
            .with_max_envelope_hours(-1)
            .validate()
            .is_err());
        assert!(ReconstructionConfig::default()
            .with_min_session_minutes(-5)
            .validate()
            .is_err());
        assert!(ReconstructionConfig::default()
            .with_utc_offset_minutes(20 * 60)
            .validate()
            .is_err());
        assert!(matches!(
            ReconstructionConfig::from_json(r#"{"gap_threshold_minutes": -10}"#),
            Err(ReconstructError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_eighteen_hour_offset_accepted() {
        for minutes in [MAX_UTC_OFFSET_MINUTES, -MAX_UTC_OFFSET_MINUTES] {
            let config = ReconstructionConfig::default().with_utc_offset_minutes(minutes);
            assert!(config.validate().is_ok());
            assert_eq!(config.offset().local_minus_utc(), minutes * 60);
        }

        let err = ReconstructionConfig::default()
            .with_utc_offset_minutes(MAX_UTC_OFFSET_MINUTES + 1)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("±1080"));
        assert!(ReconstructionConfig::default()
            .with_utc_offset_minutes(i32::MIN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_local_date_uses_offset() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 16, 3, 0, 0).unwrap();
        let utc = ReconstructionConfig::default();
        let new_york = ReconstructionConfig::default().with_utc_offset_minutes(-300);

        assert_eq!(utc.local_date(instant), NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
        assert_eq!(
            new_york.local_date(instant),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
    }
}
