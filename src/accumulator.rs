//! Lifetime energy total fed from the snapshot's recent readings
//!
//! The accumulator keeps a high-water mark: the end of the latest interval
//! already added. Each tick adds every recent interval ending after the mark
//! as it stood before the tick, then moves the mark to the last one added.

use crate::dashboard::RecentReading;
use crate::logging::{StructuredLogger, get_logger};
use crate::time::parse_api_datetime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// What the host persists across restarts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CumulativeState {
    /// kWh, never decreasing
    pub total: f64,
    /// End marker (JST ISO-8601) of the last applied interval
    pub last_applied_end: Option<String>,
}

/// Order two end markers by instant, falling back to ordinal string order
/// when either side does not parse
pub fn compare_end_markers(a: &str, b: &str) -> Ordering {
    match (parse_api_datetime(a), parse_api_datetime(b)) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

pub struct CumulativeEnergyAccumulator {
    state: CumulativeState,
    logger: StructuredLogger,
}

impl Default for CumulativeEnergyAccumulator {
    fn default() -> Self {
        Self::from_state(CumulativeState::default())
    }
}

impl CumulativeEnergyAccumulator {
    pub fn from_state(state: CumulativeState) -> Self {
        Self {
            state,
            logger: get_logger("accumulator"),
        }
    }

    /// Rebuild from what the host saved.
    ///
    /// A missing, unparseable, non-finite or negative total starts from
    /// zero; a blank marker is treated as absent.
    pub fn restore(persisted_total: Option<&str>, last_applied_end: Option<String>) -> Self {
        let logger = get_logger("accumulator");

        let total = match persisted_total.map(str::trim) {
            Some(raw) => match raw.parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => v,
                _ => {
                    logger.warn(&format!("ignoring invalid persisted total '{raw}'"));
                    0.0
                }
            },
            None => 0.0,
        };
        let last_applied_end = last_applied_end.filter(|m| !m.trim().is_empty());

        logger.info(&format!(
            "restored total={} last_applied_end={}",
            total,
            last_applied_end.as_deref().unwrap_or("none")
        ));

        Self {
            state: CumulativeState {
                total,
                last_applied_end,
            },
            logger,
        }
    }

    pub const fn total(&self) -> f64 {
        self.state.total
    }

    pub fn last_applied_end(&self) -> Option<&str> {
        self.state.last_applied_end.as_deref()
    }

    pub const fn state(&self) -> &CumulativeState {
        &self.state
    }

    /// Fold one tick's recent readings (ascending by end) into the total.
    ///
    /// Returns the kWh added by this tick.
    pub fn apply(&mut self, recent: &[RecentReading]) -> f64 {
        let previous_mark = self.state.last_applied_end.clone();
        let mut working_mark = previous_mark.clone();
        let mut added = 0.0;

        for item in recent {
            let is_new = previous_mark
                .as_deref()
                .is_none_or(|mark| compare_end_markers(&item.end_jst, mark) == Ordering::Greater);
            if !is_new {
                continue;
            }

            if item.kwh.is_finite() && item.kwh >= 0.0 {
                added += item.kwh;
            } else {
                self.logger.warn(&format!(
                    "skipping invalid interval value {} at {}",
                    item.kwh, item.end_jst
                ));
            }
            working_mark = Some(item.end_jst.clone());
        }

        self.state.total += added;
        self.state.last_applied_end = working_mark;

        if added > 0.0 {
            self.logger.debug(&format!(
                "added {} kWh total={} mark={}",
                added,
                self.state.total,
                self.state.last_applied_end.as_deref().unwrap_or("none")
            ));
        }
        added
    }
}
