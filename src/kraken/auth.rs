//! Lazily refreshed Kraken session
//!
//! The session owns the JWT, its (unverified) expiry and the account number.
//! All three live behind one async mutex held for the whole of
//! [`AuthSession::ensure_valid`], so overlapping refreshes queue behind an
//! in-flight login instead of racing it.
//!
//! The expiry is read from the token payload without checking the signature.
//! It only decides when to log in again proactively; the server still
//! enforces authorization.

use crate::error::{MeterError, Result};
use crate::kraken::client::MeteringClient;
use crate::kraken::queries::{ACCOUNT_VIEWER_QUERY, OBTAIN_TOKEN_MUTATION};
use crate::logging::{StructuredLogger, get_logger};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use tokio::sync::Mutex;

/// Log in again when the token expires within this margin
pub const REFRESH_MARGIN_SECONDS: i64 = 120;

/// What an authenticated request needs from the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    /// Complete `Authorization` header value
    pub authorization: String,
    pub account_number: String,
}

#[derive(Default)]
struct SessionState {
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    account_number: Option<String>,
}

pub struct AuthSession {
    client: MeteringClient,
    email: String,
    password: String,
    state: Mutex<SessionState>,
    logger: StructuredLogger,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("endpoint", &self.client.endpoint())
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl AuthSession {
    pub fn new(client: MeteringClient, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            client,
            email: email.into(),
            password: password.into(),
            state: Mutex::new(SessionState::default()),
            logger: get_logger("auth"),
        }
    }

    pub const fn client(&self) -> &MeteringClient {
        &self.client
    }

    /// Make sure a token and account number are available, logging in or
    /// resolving the account as needed
    pub async fn ensure_valid(&self) -> Result<SessionCredentials> {
        self.ensure_valid_at(Utc::now()).await
    }

    /// [`AuthSession::ensure_valid`] against an explicit clock
    ///
    /// An authentication failure clears the whole session, so the next call
    /// starts with a fresh login.
    pub async fn ensure_valid_at(&self, now: DateTime<Utc>) -> Result<SessionCredentials> {
        let mut state = self.state.lock().await;

        let result = self.refresh_locked(&mut state, now).await;
        if let Err(e) = &result
            && e.is_reauth_required()
        {
            *state = SessionState::default();
            self.logger
                .warn(&format!("session rejected, cleared for fresh login: {e}"));
        }
        result
    }

    async fn refresh_locked(
        &self,
        state: &mut SessionState,
        now: DateTime<Utc>,
    ) -> Result<SessionCredentials> {
        if state.token.is_none() {
            self.login(state).await?;
        }

        if let Some(expires_at) = state.expires_at
            && now + Duration::seconds(REFRESH_MARGIN_SECONDS) >= expires_at
        {
            self.logger.debug("token near expiry, re-login");
            self.login(state).await?;
        }

        if state.account_number.is_none() {
            self.load_account_number(state).await?;
        }

        match (&state.token, &state.account_number) {
            (Some(token), Some(account_number)) => Ok(SessionCredentials {
                authorization: format!("JWT {token}"),
                account_number: account_number.clone(),
            }),
            _ => Err(MeterError::auth("Session incomplete after login")),
        }
    }

    /// Drop token, expiry and account so the next call starts from scratch
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        *state = SessionState::default();
        self.logger.info("session reset, next request will log in");
    }

    /// Cached account number, if resolved
    pub async fn account_number(&self) -> Option<String> {
        self.state.lock().await.account_number.clone()
    }

    /// Expiry decoded from the current token, if any
    pub async fn token_expiry(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.expires_at
    }

    async fn login(&self, state: &mut SessionState) -> Result<()> {
        let data = self
            .client
            .post(
                OBTAIN_TOKEN_MUTATION,
                json!({ "input": { "email": self.email, "password": self.password } }),
                None,
                "login",
            )
            .await?;

        let token = data
            .get("obtainKrakenToken")
            .and_then(|obj| obj.get("token"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| MeterError::auth("Login failed"))?;

        state.expires_at = token_expiry(token);
        state.token = Some(token.to_string());

        match state.expires_at {
            Some(exp) => self
                .logger
                .debug(&format!("login ok token_exp={}", exp.to_rfc3339())),
            None => self.logger.debug("login ok token_exp=unknown"),
        }
        Ok(())
    }

    async fn load_account_number(&self, state: &mut SessionState) -> Result<()> {
        let token = state
            .token
            .as_deref()
            .ok_or_else(|| MeterError::auth("No token for account lookup"))?;

        let data = self
            .client
            .post(
                ACCOUNT_VIEWER_QUERY,
                json!({}),
                Some(&format!("JWT {token}")),
                "accounts",
            )
            .await?;

        let accounts = data
            .get("viewer")
            .and_then(|v| v.get("accounts"))
            .and_then(Value::as_array)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| MeterError::auth("No accounts found"))?;

        let number = accounts
            .first()
            .and_then(|a| a.get("number"))
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| MeterError::auth("Account number missing"))?;

        self.logger
            .debug(&format!("account selected number={number}"));
        state.account_number = Some(number.to_string());
        Ok(())
    }
}

/// Read the `exp` claim of a JWT without verifying it.
///
/// Returns `None` for anything that is not three dot-separated segments with
/// a base64url JSON payload carrying a numeric `exp`.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('.');
    let (Some(_), Some(payload), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?;

    if let Some(secs) = exp.as_i64() {
        return DateTime::from_timestamp(secs, 0);
    }
    let secs = exp.as_f64().filter(|s| s.is_finite())?;
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_with(payload: &str) -> String {
        format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", URL_SAFE_NO_PAD.encode(payload))
    }

    #[test]
    fn decodes_integer_and_float_exp() {
        let t = token_expiry(&jwt_with(r#"{"exp":1704067200}"#)).unwrap();
        assert_eq!(t.timestamp(), 1_704_067_200);

        let t = token_expiry(&jwt_with(r#"{"exp":1704067200.5}"#)).unwrap();
        assert_eq!(t.timestamp_millis(), 1_704_067_200_500);
    }

    #[test]
    fn undecodable_tokens_have_unknown_expiry() {
        assert!(token_expiry("opaque-token").is_none());
        assert!(token_expiry("a.b").is_none());
        assert!(token_expiry("a.b.c.d").is_none());
        assert!(token_expiry("a.!!!.c").is_none());
        assert!(token_expiry(&jwt_with("not json")).is_none());
        assert!(token_expiry(&jwt_with(r#"{"exp":"soon"}"#)).is_none());
        assert!(token_expiry(&jwt_with(r#"{"sub":"x"}"#)).is_none());
    }

    #[test]
    fn accepts_padded_payload() {
        let payload = base64::engine::general_purpose::URL_SAFE.encode(r#"{"exp":100}"#);
        let token = format!("h.{payload}.s");
        assert_eq!(token_expiry(&token).unwrap().timestamp(), 100);
    }
}
