//! Yen costs derived from a snapshot and a flat price per kWh

use crate::dashboard::DashboardSnapshot;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostSummary {
    pub yen_per_kwh: f64,
    pub today_yen: f64,
    pub yesterday_yen: f64,
    pub month_to_date_yen: f64,
    pub last_month_yen: f64,
    pub last_half_hour_yen: Option<f64>,
}

impl CostSummary {
    pub fn from_snapshot(snapshot: &DashboardSnapshot, yen_per_kwh: f64) -> Self {
        let cost = |kwh: f64| round_yen(kwh * yen_per_kwh);
        Self {
            yen_per_kwh,
            today_yen: cost(snapshot.today_kwh),
            yesterday_yen: cost(snapshot.yesterday_kwh),
            month_to_date_yen: cost(snapshot.month_to_date_kwh),
            last_month_yen: cost(snapshot.last_month_kwh),
            last_half_hour_yen: snapshot.last_half_hour_kwh.map(cost),
        }
    }
}

// Rounded to sen (1/100 yen)
fn round_yen(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
