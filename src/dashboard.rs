//! JST calendar dashboard built from half-hourly readings
//!
//! One snapshot needs two fetches: the last 12 hours for the latest interval
//! and the compact recent list, and everything since the start of the
//! previous month for the calendar sums. Sums stay in `Decimal` until the
//! snapshot is built.

use crate::error::Result;
use crate::kraken::{HHReading, ReadingsRepository};
use crate::logging::{StructuredLogger, get_logger};
use crate::time::{JstBoundaries, to_jst_iso};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One entry of the compact recent list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentReading {
    /// Interval end in JST ISO-8601
    pub end_jst: String,
    pub kwh: f64,
}

/// Output of one refresh cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub account_number: String,
    pub today_kwh: f64,
    pub yesterday_kwh: f64,
    pub month_to_date_kwh: f64,
    pub last_month_kwh: f64,
    /// `None` when the recent window had no readings
    pub last_half_hour_kwh: Option<f64>,
    pub last_interval_end_jst: Option<String>,
    /// Ascending by end time
    pub recent_readings: Vec<RecentReading>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct CalendarSums {
    today: Decimal,
    yesterday: Decimal,
    month_to_date: Decimal,
    last_month: Decimal,
}

impl CalendarSums {
    fn add(&mut self, reading: &HHReading, b: &JstBoundaries) {
        let start = reading.start_at;

        if start >= b.month_start {
            self.month_to_date += reading.value;
        } else if start >= b.prev_month_start && start < b.prev_month_end {
            self.last_month += reading.value;
        }

        if start >= b.today_midnight {
            self.today += reading.value;
        } else if start >= b.yesterday_midnight && start < b.today_midnight {
            self.yesterday += reading.value;
        }
    }
}

fn to_kwh(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

/// Fold fetched readings into a snapshot.
///
/// `recent` must be ascending by start (the repository guarantees it); the
/// compact list is additionally ordered by end time.
pub fn fold_snapshot(
    account_number: String,
    boundaries: &JstBoundaries,
    recent: &[HHReading],
    range: &[HHReading],
) -> DashboardSnapshot {
    let sums = range.iter().fold(CalendarSums::default(), |mut acc, r| {
        acc.add(r, boundaries);
        acc
    });

    let last = recent.last();

    let mut by_end: Vec<&HHReading> = recent.iter().collect();
    by_end.sort_by_key(|r| r.end_at);
    let recent_readings = by_end
        .into_iter()
        .map(|r| RecentReading {
            end_jst: to_jst_iso(r.end_at),
            kwh: to_kwh(r.value),
        })
        .collect();

    DashboardSnapshot {
        account_number,
        today_kwh: to_kwh(sums.today),
        yesterday_kwh: to_kwh(sums.yesterday),
        month_to_date_kwh: to_kwh(sums.month_to_date),
        last_month_kwh: to_kwh(sums.last_month),
        last_half_hour_kwh: last.map(|r| to_kwh(r.value)),
        last_interval_end_jst: last.map(|r| to_jst_iso(r.end_at)),
        recent_readings,
    }
}

/// Computes [`DashboardSnapshot`]s from the readings repository
pub struct DashboardAggregator {
    repository: Arc<ReadingsRepository>,
    logger: StructuredLogger,
}

impl DashboardAggregator {
    pub fn new(repository: Arc<ReadingsRepository>) -> Self {
        Self {
            repository,
            logger: get_logger("dashboard"),
        }
    }

    pub const fn repository(&self) -> &Arc<ReadingsRepository> {
        &self.repository
    }

    pub async fn compute_snapshot(&self, now: DateTime<Utc>) -> Result<DashboardSnapshot> {
        let boundaries = JstBoundaries::at(now)?;

        let recent = self.repository.fetch(boundaries.recent_start, now).await?;
        let range = self
            .repository
            .fetch(boundaries.prev_month_start, now)
            .await?;

        let account_number = self
            .repository
            .session()
            .account_number()
            .await
            .unwrap_or_default();

        let logger = self.logger.for_account(&account_number);
        let snapshot = fold_snapshot(account_number, &boundaries, &recent, &range);
        logger.debug(&format!(
            "snapshot today={} yesterday={} mtd={} last_month={} recent={}",
            snapshot.today_kwh,
            snapshot.yesterday_kwh,
            snapshot.month_to_date_kwh,
            snapshot.last_month_kwh,
            snapshot.recent_readings.len()
        ));
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_api_datetime;
    use chrono::Duration;
    use std::str::FromStr;

    fn reading(start: DateTime<Utc>, value: &str) -> HHReading {
        HHReading {
            start_at: start,
            end_at: start + Duration::minutes(30),
            version: None,
            value: Decimal::from_str(value).unwrap(),
        }
    }

    fn at(s: &str) -> DateTime<Utc> {
        parse_api_datetime(s).unwrap()
    }

    #[test]
    fn midnight_belongs_to_today() {
        let b = JstBoundaries::at(at("2024-05-20T12:00:00+09:00")).unwrap();
        let range = vec![
            reading(b.today_midnight - Duration::nanoseconds(1), "1.0"),
            reading(b.today_midnight, "2.0"),
        ];
        let snap = fold_snapshot(String::new(), &b, &[], &range);
        assert!((snap.today_kwh - 2.0).abs() < 1e-12);
        assert!((snap.yesterday_kwh - 1.0).abs() < 1e-12);
    }

    #[test]
    fn reading_counts_in_month_and_day_families() {
        let b = JstBoundaries::at(at("2024-05-20T12:00:00+09:00")).unwrap();
        let range = vec![reading(at("2024-05-20T08:00:00+09:00"), "0.5")];
        let snap = fold_snapshot(String::new(), &b, &[], &range);
        assert!((snap.today_kwh - 0.5).abs() < 1e-12);
        assert!((snap.month_to_date_kwh - 0.5).abs() < 1e-12);
        assert!(snap.yesterday_kwh.abs() < 1e-12);
        assert!(snap.last_month_kwh.abs() < 1e-12);
    }

    #[test]
    fn decimal_sums_do_not_drift() {
        let b = JstBoundaries::at(at("2024-05-20T12:00:00+09:00")).unwrap();
        let start = at("2024-05-20T00:00:00+09:00");
        let range: Vec<_> = (0..10)
            .map(|i| reading(start + Duration::minutes(30 * i), "0.1"))
            .collect();
        let snap = fold_snapshot(String::new(), &b, &[], &range);
        assert_eq!(snap.today_kwh, 1.0);
    }

    #[test]
    fn empty_inputs_fold_to_zero_and_unknown() {
        let b = JstBoundaries::at(at("2024-05-20T12:00:00+09:00")).unwrap();
        let snap = fold_snapshot("A-1".to_string(), &b, &[], &[]);
        assert_eq!(snap.account_number, "A-1");
        assert_eq!(snap.today_kwh, 0.0);
        assert_eq!(snap.last_half_hour_kwh, None);
        assert_eq!(snap.last_interval_end_jst, None);
        assert!(snap.recent_readings.is_empty());
    }

    #[test]
    fn recent_list_is_ordered_by_end() {
        let b = JstBoundaries::at(at("2024-05-20T12:00:00+09:00")).unwrap();
        let first = reading(at("2024-05-20T10:00:00+09:00"), "0.2");
        let second = reading(at("2024-05-20T10:30:00+09:00"), "0.3");
        let snap = fold_snapshot(String::new(), &b, &[first, second], &[]);

        let ends: Vec<_> = snap.recent_readings.iter().map(|r| r.end_jst.as_str()).collect();
        assert_eq!(ends, ["2024-05-20T10:30:00+09:00", "2024-05-20T11:00:00+09:00"]);
        assert_eq!(snap.last_half_hour_kwh, Some(0.3));
        assert_eq!(
            snap.last_interval_end_jst.as_deref(),
            Some("2024-05-20T11:00:00+09:00")
        );
    }
}
