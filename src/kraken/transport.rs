//! HTTP transport seam for the GraphQL client
//!
//! The client only needs "POST this JSON, give me status and body text", so
//! the transport is a trait and tests can script responses without a server.

use crate::error::Result;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;

/// Raw HTTP response as seen by the GraphQL layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Outgoing POST with a JSON body
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    /// Complete `Authorization` header value, if any
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

/// Transport capable of POSTing JSON and returning status plus body text.
///
/// Network failures and timeouts must surface as `MeterError::Transport`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// reqwest-backed transport (Rustls)
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("oejp-meter/", env!("APP_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .post(&request.url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(&request.body);

        if let Some(auth) = request.authorization.as_deref() {
            builder = builder.header(AUTHORIZATION, auth);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(HttpResponse { status, body })
    }
}
