use crate::error::{MeterError, Result};
use crate::kraken::auth::AuthSession;
use crate::kraken::queries::HALF_HOURLY_READINGS_QUERY;
use crate::kraken::types::HHReading;
use crate::logging::{StructuredLogger, get_logger, truncate_for_log};
use crate::time::to_utc_iso;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Half-hourly readings for the session's account, always ordered by start
pub struct ReadingsRepository {
    session: Arc<AuthSession>,
    logger: StructuredLogger,
}

impl ReadingsRepository {
    pub fn new(session: Arc<AuthSession>) -> Self {
        Self {
            session,
            logger: get_logger("readings"),
        }
    }

    pub const fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    /// Readings whose interval falls in `[start, end]`, ascending by start.
    ///
    /// An authentication failure resets the session before it is returned,
    /// so the next call logs in from scratch.
    pub async fn fetch(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<HHReading>> {
        let creds = self.session.ensure_valid().await?;
        let logger = self.logger.for_account(&creds.account_number);

        let variables = json!({
            "accountNumber": creds.account_number,
            "fromDatetime": to_utc_iso(start),
            "toDatetime": to_utc_iso(end),
        });

        let data = match self
            .session
            .client()
            .post(
                HALF_HOURLY_READINGS_QUERY,
                variables,
                Some(&creds.authorization),
                "hh",
            )
            .await
        {
            Ok(data) => data,
            Err(e) if e.is_reauth_required() => {
                self.session.reset().await;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let raw = raw_readings(&data).inspect_err(|_| {
            let dump = Value::Object(data.clone()).to_string();
            logger.error(&format!(
                "hh response shape data={}",
                truncate_for_log(&dump, 1200)
            ));
        })?;

        let mut readings = raw
            .iter()
            .map(HHReading::from_raw)
            .collect::<Result<Vec<_>>>()?;
        readings.sort_by_key(|r| r.start_at);

        logger.debug(&format!(
            "fetched {} readings from={} to={}",
            readings.len(),
            to_utc_iso(start),
            to_utc_iso(end)
        ));
        Ok(readings)
    }

    /// Log in and read the last hour; used to check credentials at setup
    pub async fn validate_credentials(&self) -> Result<()> {
        self.session.ensure_valid().await?;
        let now = Utc::now();
        self.fetch(now - Duration::hours(1), now).await?;
        Ok(())
    }
}

/// Walk `account.properties[0].electricitySupplyPoints[0].halfHourlyReadings`
fn raw_readings(data: &Map<String, Value>) -> Result<&[Value]> {
    let missing = |segment: &str| {
        MeterError::protocol(format!("Unexpected response shape missing {segment}"))
    };

    let account = data
        .get("account")
        .filter(|v| v.is_object())
        .ok_or_else(|| missing("account"))?;

    let properties = account
        .get("properties")
        .and_then(Value::as_array)
        .ok_or_else(|| missing("properties"))?;
    let property = properties
        .first()
        .ok_or_else(|| MeterError::protocol("No properties returned"))?;

    let supply_points = property
        .get("electricitySupplyPoints")
        .and_then(Value::as_array)
        .ok_or_else(|| missing("electricitySupplyPoints"))?;
    let supply_point = supply_points
        .first()
        .ok_or_else(|| MeterError::protocol("No electricitySupplyPoints returned"))?;

    match supply_point.get("halfHourlyReadings") {
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(Value::Null) => Ok(&[]),
        _ => Err(missing("halfHourlyReadings")),
    }
}
