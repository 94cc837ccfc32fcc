//! One refresh cycle, as the host scheduler sees it
//!
//! A successful refresh replaces the stored snapshot; a failed one keeps the
//! previous snapshot and reports whether re-authentication is needed. The
//! accumulator is ticked separately from the latest snapshot and its state is
//! written to the store after every tick.

use crate::accumulator::CumulativeEnergyAccumulator;
use crate::config::Config;
use crate::cost::CostSummary;
use crate::dashboard::{DashboardAggregator, DashboardSnapshot};
use crate::error::{MeterError, Result};
use crate::kraken::{AuthSession, MeteringClient, ReadingsRepository};
use crate::logging::{StructuredLogger, get_logger};
use crate::persistence::StateStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// A refresh that produced no new snapshot
#[derive(Debug, Error)]
#[error("refresh failed: {source}")]
pub struct RefreshFailure {
    /// Credentials were rejected; the session has been reset
    pub reauth_required: bool,
    pub source: MeterError,
}

impl From<MeterError> for RefreshFailure {
    fn from(source: MeterError) -> Self {
        Self {
            reauth_required: source.is_reauth_required(),
            source,
        }
    }
}

pub struct Coordinator {
    aggregator: DashboardAggregator,
    accumulator: CumulativeEnergyAccumulator,
    store: StateStore,
    yen_per_kwh: f64,
    refresh_timeout: Duration,
    snapshot: Option<DashboardSnapshot>,
    last_error: Option<String>,
    logger: StructuredLogger,
}

impl Coordinator {
    /// Accumulator state is restored from `store` here
    pub fn new(aggregator: DashboardAggregator, store: StateStore, yen_per_kwh: f64) -> Self {
        let accumulator = store.restore_accumulator();
        Self {
            aggregator,
            accumulator,
            store,
            yen_per_kwh,
            refresh_timeout: Duration::from_secs(120),
            snapshot: None,
            last_error: None,
            logger: get_logger("coordinator"),
        }
    }

    /// Wire client, session, repository and aggregator from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = MeteringClient::from_config(&config.api)?;
        let session = Arc::new(AuthSession::new(
            client,
            config.api.email.clone(),
            config.api.password.clone(),
        ));
        let repository = Arc::new(ReadingsRepository::new(session));
        let aggregator = DashboardAggregator::new(repository);
        let store = StateStore::new(&config.state_file);

        // Two fetches plus a possible login and account lookup
        let timeout = Duration::from_secs(config.api.timeout_seconds.saturating_mul(4));
        Ok(
            Self::new(aggregator, store, config.pricing.yen_per_kwh)
                .with_refresh_timeout(timeout),
        )
    }

    #[must_use]
    pub const fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub const fn snapshot(&self) -> Option<&DashboardSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub const fn accumulator(&self) -> &CumulativeEnergyAccumulator {
        &self.accumulator
    }

    pub fn costs(&self) -> Option<CostSummary> {
        self.snapshot
            .as_ref()
            .map(|s| CostSummary::from_snapshot(s, self.yen_per_kwh))
    }

    /// Check credentials without touching the stored snapshot
    pub async fn validate_credentials(&self) -> Result<()> {
        self.aggregator.repository().validate_credentials().await
    }

    pub async fn refresh(&mut self) -> std::result::Result<DashboardSnapshot, RefreshFailure> {
        self.refresh_at(Utc::now()).await
    }

    pub async fn refresh_at(
        &mut self,
        now: DateTime<Utc>,
    ) -> std::result::Result<DashboardSnapshot, RefreshFailure> {
        let cycle_id = uuid::Uuid::new_v4().to_string();
        let logger = self.logger.for_cycle(&cycle_id);

        let outcome = tokio::time::timeout(
            self.refresh_timeout,
            self.aggregator.compute_snapshot(now),
        )
        .await
        .map_err(MeterError::from)
        .and_then(|r| r);

        match outcome {
            Ok(snapshot) => {
                logger.info(&format!(
                    "refresh ok today={} kWh last={:?}",
                    snapshot.today_kwh, snapshot.last_interval_end_jst
                ));
                self.snapshot = Some(snapshot.clone());
                self.last_error = None;
                Ok(snapshot)
            }
            Err(e) => {
                let failure = RefreshFailure::from(e);
                if failure.reauth_required {
                    logger.warn(&format!(
                        "refresh needs re-authentication: {}",
                        failure.source
                    ));
                } else {
                    logger.error(&format!(
                        "refresh failed, keeping previous snapshot: {}",
                        failure.source
                    ));
                }
                self.last_error = Some(failure.source.to_string());
                Err(failure)
            }
        }
    }

    /// Feed the latest snapshot's recent list to the accumulator and persist.
    ///
    /// Returns the kWh added; zero when there is no snapshot yet.
    pub fn tick_accumulator(&mut self) -> Result<f64> {
        let Some(snapshot) = self.snapshot.as_ref() else {
            return Ok(0.0);
        };
        let added = self.accumulator.apply(&snapshot.recent_readings);
        self.store.save(self.accumulator.state())?;
        Ok(added)
    }
}
