// Shared helpers; not every test file uses every helper
#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use oejp_meter::error::{MeterError, Result};
use oejp_meter::kraken::{
    AuthSession, HttpRequest, HttpResponse, HttpTransport, MeteringClient, ReadingsRepository,
};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const ENDPOINT: &str = "https://kraken.test/v1/graphql/";

/// Transport that replays queued responses and records every request
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.push_raw(status, &body.to_string());
    }

    pub fn push_raw(&self, status: u16, body: &str) {
        self.responses.lock().unwrap().push_back(Ok(HttpResponse {
            status,
            body: body.to_string(),
        }));
    }

    pub fn push_error(&self, err: MeterError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Operation name of each request: "login", "accounts" or "hh"
    pub fn operations(&self) -> Vec<&'static str> {
        self.requests()
            .iter()
            .map(|r| {
                let query = r.body["query"].as_str().unwrap_or_default();
                if query.contains("obtainKrakenToken") {
                    "login"
                } else if query.contains("accountViewer") {
                    "accounts"
                } else if query.contains("halfHourlyReadings") {
                    "hh"
                } else {
                    "other"
                }
            })
            .collect()
    }

    pub fn count(&self, op: &str) -> usize {
        self.operations().iter().filter(|o| **o == op).count()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn post_json(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request);
        // Let concurrent callers interleave
        tokio::task::yield_now().await;
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(MeterError::transport("no scripted response left")))
    }
}

/// Unsigned JWT-shaped token with the given `exp`
pub fn jwt(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({ "sub": "user", "exp": exp }).to_string());
    format!("{header}.{payload}.signature")
}

pub fn login_body(token: &str) -> Value {
    json!({
        "data": {
            "obtainKrakenToken": {
                "token": token,
                "refreshToken": "refresh",
                "refreshExpiresIn": 604_800
            }
        }
    })
}

pub fn accounts_body(number: &str) -> Value {
    json!({ "data": { "viewer": { "accounts": [ { "number": number } ] } } })
}

/// Readings body from `(startAt, endAt, value)` triples
pub fn readings_body(items: &[(&str, &str, &str)]) -> Value {
    let readings: Vec<Value> = items
        .iter()
        .map(|(start, end, value)| {
            json!({ "startAt": start, "endAt": end, "version": "1", "value": value })
        })
        .collect();
    json!({
        "data": {
            "account": {
                "properties": [
                    { "electricitySupplyPoints": [ { "halfHourlyReadings": readings } ] }
                ]
            }
        }
    })
}

pub fn session_over(transport: &Arc<ScriptedTransport>) -> Arc<AuthSession> {
    let client = MeteringClient::new(ENDPOINT, transport.clone());
    Arc::new(AuthSession::new(client, "user@example.jp", "hunter2"))
}

pub fn repository_over(transport: &Arc<ScriptedTransport>) -> Arc<ReadingsRepository> {
    Arc::new(ReadingsRepository::new(session_over(transport)))
}

/// Queue a login and account lookup with a token valid far into the future
pub fn script_login(transport: &ScriptedTransport, account: &str) {
    transport.push_json(200, login_body(&jwt(4_102_444_800)));
    transport.push_json(200, accounts_body(account));
}
