use crate::config::ApiConfig;
use crate::error::{MeterError, Result};
use crate::kraken::transport::{HttpRequest, HttpTransport, ReqwestTransport};
use crate::logging::{StructuredLogger, get_logger, truncate_for_log};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;

/// Longest body excerpt written to the log
const LOG_BODY_CHARS: usize = 1200;

/// Substrings of a GraphQL error list that mean the session is not accepted
const AUTH_ERROR_MARKERS: [&str; 2] = ["unauthorized", "unauthenticated"];

/// GraphQL client for the Kraken endpoint.
///
/// Issues exactly one POST per call; retry policy belongs to the caller.
#[derive(Clone)]
pub struct MeteringClient {
    endpoint: String,
    transport: Arc<dyn HttpTransport>,
    logger: StructuredLogger,
}

impl MeteringClient {
    pub fn new(endpoint: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
            logger: get_logger("kraken"),
        }
    }

    /// Client over a reqwest transport configured from `api`
    pub fn from_config(api: &ApiConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(Duration::from_secs(api.timeout_seconds))?;
        Ok(Self::new(api.endpoint(), Arc::new(transport)))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send `{query, variables}` and return the `data` object.
    ///
    /// `authorization` is the complete header value (e.g. `JWT <token>`).
    /// `tag` only labels log lines.
    pub async fn post(
        &self,
        query: &str,
        variables: Value,
        authorization: Option<&str>,
        tag: &str,
    ) -> Result<Map<String, Value>> {
        let variables = if variables.is_null() {
            Value::Object(Map::new())
        } else {
            variables
        };

        self.logger
            .debug(&format!("request {} url={}", tag, self.endpoint));

        let response = self
            .transport
            .post_json(HttpRequest {
                url: self.endpoint.clone(),
                authorization: authorization.map(str::to_string),
                body: json!({ "query": query, "variables": variables }),
            })
            .await
            .inspect_err(|e| self.logger.error(&format!("{tag} transport failure: {e}")))?;

        interpret_response(response.status, &response.body).inspect_err(|e| {
            self.logger.error(&format!(
                "{} http={} {} body={}",
                tag,
                response.status,
                e,
                truncate_for_log(&response.body, LOG_BODY_CHARS)
            ));
        })
    }
}

/// Non-empty `errors` entry of a GraphQL body
fn graphql_errors(body: &Value) -> Option<&Value> {
    let errors = body.get("errors")?;
    let present = match errors {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::String(s) => !s.is_empty(),
        Value::Number(_) => true,
    };
    present.then_some(errors)
}

fn is_auth_failure(errors_text: &str) -> bool {
    let lower = errors_text.to_lowercase();
    AUTH_ERROR_MARKERS.iter().any(|m| lower.contains(m))
}

/// Classify a raw HTTP response into the `data` object or an error.
///
/// Order matters: an unparseable body is a protocol error even on 5xx, an
/// error status wins over GraphQL errors, and only 2xx/3xx GraphQL errors are
/// inspected for authentication failures.
pub fn interpret_response(status: u16, body_text: &str) -> Result<Map<String, Value>> {
    let body: Value = serde_json::from_str(body_text)
        .map_err(|_| MeterError::protocol("invalid response body"))?;

    if status >= 400 {
        return Err(match graphql_errors(&body) {
            Some(errors) => {
                MeterError::protocol(format!("HTTP {status} GraphQL errors: {errors}"))
            }
            None => MeterError::protocol(format!("HTTP {status}")),
        });
    }

    if let Some(errors) = graphql_errors(&body) {
        let text = errors.to_string();
        return Err(if is_auth_failure(&text) {
            MeterError::auth(text)
        } else {
            MeterError::protocol(text)
        });
    }

    match body.get("data") {
        Some(Value::Object(data)) => Ok(data.clone()),
        _ => Err(MeterError::protocol("missing data")),
    }
}
