//! Client for the hosted backend: REST data API, auth and object storage.

pub mod auth;
pub mod query;
pub mod storage;

pub use auth::Session;
pub use query::Query;

use crate::config::BackendConfig;
use crate::error::{ConsoleError, ConsoleResult};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Read access to the relational data service. Everything above the HTTP
/// layer talks to this trait so loaders can be exercised without a backend.
#[async_trait]
pub trait DataService: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> ConsoleResult<Vec<Value>>;

    async fn count(&self, table: &str, query: &Query) -> ConsoleResult<u64>;
}

/// Handle on the hosted backend. Built once from configuration and passed to
/// whatever needs it.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> ConsoleResult<Self> {
        let parsed = Url::parse(&config.url)
            .map_err(|e| ConsoleError::Validation(format!("invalid backend url: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("snapwin-admin/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            access_token: None,
        })
    }

    /// Same client, authorizing requests as the signed-in admin.
    pub fn with_session(&self, session: &Session) -> Self {
        Self {
            access_token: Some(session.access_token.clone()),
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Attach the api key and bearer token expected by every backend service.
    pub(crate) fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    /// Patch one row by id. Used for optimistic edits that need confirming.
    pub async fn update_row(&self, table: &str, id: &str, patch: &Value) -> ConsoleResult<()> {
        let url = self.endpoint(&format!("rest/v1/{table}"));
        let response = self
            .authorize(self.client.patch(url))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    fn table_request(&self, table: &str, query: &Query) -> RequestBuilder {
        let url = self.endpoint(&format!("rest/v1/{table}"));
        self.authorize(self.client.get(url))
            .query(&query.to_params())
            .header("Accept", "application/json")
    }
}

#[async_trait]
impl DataService for BackendClient {
    async fn select(&self, table: &str, query: &Query) -> ConsoleResult<Vec<Value>> {
        log::debug!("Selecting from {table}: {:?}", query.to_params());

        let response = self.table_request(table, query).send().await?;
        let response = check_status(response).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| ConsoleError::MalformedResponse(e.to_string()))?;

        match body {
            Value::Array(rows) => Ok(rows),
            other => Err(ConsoleError::MalformedResponse(format!(
                "expected an array of rows from {table}, got {other}"
            ))),
        }
    }

    async fn count(&self, table: &str, query: &Query) -> ConsoleResult<u64> {
        let response = self
            .table_request(table, &query.clone().limit(1))
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let response = check_status(response).await?;

        let content_range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        parse_content_range_total(&content_range).ok_or_else(|| {
            ConsoleError::MalformedResponse(format!(
                "missing row count in content-range '{content_range}' for {table}"
            ))
        })
    }
}

/// Total from a `Content-Range` header such as `0-49/1234` or `*/0`.
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

/// Turn a non-success response into a `Service` error carrying the backend's
/// own message when it sent one.
pub(crate) async fn check_status(response: Response) -> ConsoleResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ServiceErrorBody>(&text)
        .ok()
        .and_then(|body| {
            body.message
                .or(body.error_description)
                .or(body.msg)
                .or(body.error)
        })
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));

    log::warn!("Backend request failed ({status}): {message}");
    Err(ConsoleError::Service(message))
}
