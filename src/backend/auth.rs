use super::{check_status, BackendClient, DataService, Query};
use crate::error::{ConsoleError, ConsoleResult};
use crate::models::ADMIN_USERS;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::OnceLock;

/// Authenticated session returned by the hosted auth service.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub email: Option<String>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => false,
        }
    }

    /// A session that can still authorize requests.
    pub fn is_usable(&self) -> bool {
        !self.access_token.trim().is_empty() && !self.is_expired(Utc::now())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<TokenUser>,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Read the claims of a JWT without verifying it; the backend does that.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid")
    })
}

pub fn validate_credentials(email: &str, password: &str) -> ConsoleResult<()> {
    if !email_regex().is_match(email.trim()) {
        return Err(ConsoleError::Validation(
            "Enter a valid email address".to_string(),
        ));
    }
    if password.is_empty() {
        return Err(ConsoleError::Validation("Password is required".to_string()));
    }
    Ok(())
}

impl BackendClient {
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> ConsoleResult<Session> {
        validate_credentials(email, password)?;

        let url = self.endpoint("auth/v1/token");
        let response = self
            .http()
            .post(url)
            .query(&[("grant_type", "password")])
            .header("apikey", self.anon_key())
            .json(&json!({ "email": email.trim(), "password": password }))
            .send()
            .await?;
        let response = check_status(response).await?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ConsoleError::MalformedResponse(e.to_string()))?;

        let claims = decode_claims(&token.access_token).unwrap_or_default();
        let expires_at = token
            .expires_at
            .or(claims.exp)
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .or_else(|| token.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)));
        let email = token
            .user
            .and_then(|u| u.email)
            .or(claims.email)
            .or_else(|| Some(email.trim().to_string()));

        log::info!("Signed in as {}", email.as_deref().unwrap_or("unknown"));

        Ok(Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            email,
        })
    }

    pub async fn sign_out(&self, session: &Session) -> ConsoleResult<()> {
        let url = self.endpoint("auth/v1/logout");
        let response = self
            .with_session(session)
            .authorize(self.http().post(url))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// Check the signed-in email against the `admin_users` table.
    pub async fn is_admin(&self, session: &Session) -> ConsoleResult<bool> {
        let email = match session.email.as_deref() {
            Some(email) if !email.trim().is_empty() => email.trim().to_lowercase(),
            _ => return Ok(false),
        };

        let rows = self
            .with_session(session)
            .select(
                ADMIN_USERS,
                &Query::new().select("email").ilike("email", &email).limit(1),
            )
            .await?;

        Ok(rows.iter().any(|row| {
            row.get("email")
                .and_then(Value::as_str)
                .map(|e| e.trim().eq_ignore_ascii_case(&email))
                .unwrap_or(false)
        }))
    }

    /// Sign in and make sure the account is an admin. Non-admin sessions are
    /// signed out again before the error is returned.
    pub async fn require_admin(&self, email: &str, password: &str) -> ConsoleResult<Session> {
        let session = self.sign_in_with_password(email, password).await?;
        if self.is_admin(&session).await? {
            return Ok(session);
        }

        if let Err(e) = self.sign_out(&session).await {
            log::warn!("Failed to sign out non-admin session: {e}");
        }
        Err(ConsoleError::Service(
            "This account is not authorized for the admin console".to_string(),
        ))
    }
}
