use crate::error::{MeterError, Result};
use crate::time::parse_api_datetime;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// One half-hourly consumption interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HHReading {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// Opaque revision label ("1", "2", "daily", ...)
    pub version: Option<String>,
    /// kWh, exact
    pub value: Decimal,
}

impl HHReading {
    /// Build a reading from one raw `halfHourlyReadings` record
    pub fn from_raw(raw: &Value) -> Result<Self> {
        Ok(Self {
            start_at: timestamp_field(raw, "startAt")?,
            end_at: timestamp_field(raw, "endAt")?,
            version: raw.get("version").and_then(version_label),
            value: parse_decimal(required_field(raw, "value")?)?,
        })
    }
}

fn required_field<'a>(raw: &'a Value, name: &str) -> Result<&'a Value> {
    raw.get(name)
        .filter(|v| !v.is_null())
        .ok_or_else(|| MeterError::protocol(format!("Reading missing {name}")))
}

fn timestamp_field(raw: &Value, name: &str) -> Result<DateTime<Utc>> {
    let text = required_field(raw, name)?
        .as_str()
        .ok_or_else(|| MeterError::protocol(format!("Reading {name} is not a string")))?;
    parse_api_datetime(text)
}

fn version_label(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Parse a meter value through its text form.
///
/// Numbers go through serde_json's shortest round-trip rendering, so `0.123`
/// becomes exactly `0.123` rather than the nearest binary float.
pub fn parse_decimal(v: &Value) -> Result<Decimal> {
    let text = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(MeterError::protocol(format!(
                "Reading value is not numeric: {other}"
            )));
        }
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| MeterError::protocol(format!("Invalid reading value '{text}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_string_and_number_values_exactly() {
        assert_eq!(parse_decimal(&json!("0.1234")).unwrap().to_string(), "0.1234");
        assert_eq!(parse_decimal(&json!(0.1234)).unwrap().to_string(), "0.1234");
        assert_eq!(parse_decimal(&json!(2)).unwrap().to_string(), "2");
        assert_eq!(parse_decimal(&json!("1e-4")).unwrap().to_string(), "0.0001");
        assert!(parse_decimal(&json!(true)).is_err());
        assert!(parse_decimal(&json!("abc")).is_err());
    }

    #[test]
    fn keeps_version_as_opaque_label() {
        let base = json!({
            "startAt": "2024-01-01T00:00:00+09:00",
            "endAt": "2024-01-01T00:30:00+09:00",
            "value": "0.100"
        });

        let mut raw = base.clone();
        raw["version"] = json!("daily");
        assert_eq!(HHReading::from_raw(&raw).unwrap().version.as_deref(), Some("daily"));

        let mut raw = base.clone();
        raw["version"] = json!(3);
        assert_eq!(HHReading::from_raw(&raw).unwrap().version.as_deref(), Some("3"));

        let reading = HHReading::from_raw(&base).unwrap();
        assert_eq!(reading.version, None);
        assert_eq!(reading.value.to_string(), "0.100");
    }

    #[test]
    fn missing_fields_are_protocol_errors() {
        let raw = json!({"startAt": "2024-01-01T00:00:00Z", "value": "1"});
        let err = HHReading::from_raw(&raw).unwrap_err();
        assert!(err.to_string().contains("endAt"));
    }
}
