//! Daily aggregation
//!
//! Groups sessions by the calendar day they are attributed to (the local date
//! of their start) and orders everything chronologically. Days without a
//! session do not appear.

use crate::types::{DailySleepSummary, SleepSession};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Aggregator from sessions to per-day summaries
pub struct DailyAggregator;

impl DailyAggregator {
    pub fn aggregate(sessions: Vec<SleepSession>) -> Vec<DailySleepSummary> {
        let mut by_date: BTreeMap<NaiveDate, Vec<SleepSession>> = BTreeMap::new();
        for session in sessions {
            by_date.entry(session.date).or_default().push(session);
        }

        by_date
            .into_iter()
            .map(|(date, mut sessions)| {
                sessions.sort_by(|a, b| {
                    a.start
                        .cmp(&b.start)
                        .then(a.end.cmp(&b.end))
                        .then_with(|| a.samples.cmp(&b.samples))
                });
                DailySleepSummary { date, sessions }
            })
            .collect()
    }
}
