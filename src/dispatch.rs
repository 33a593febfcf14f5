//! Sending notification campaigns through the hosted dispatch function.
//!
//! This is the only path that creates campaigns; the function also writes
//! one delivery row per recipient.

use crate::backend::{BackendClient, Session};
use crate::config::DispatchConfig;
use crate::error::{ConsoleError, ConsoleResult};
use crate::models::{CampaignMode, Criteria};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Validated request body for the dispatch function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignRequest {
    pub mode: CampaignMode,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub criteria: Criteria,
}

impl CampaignRequest {
    pub fn builder(mode: CampaignMode) -> CampaignRequestBuilder {
        CampaignRequestBuilder {
            mode,
            title: String::new(),
            body: String::new(),
            data: None,
            criteria: Criteria::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CampaignRequestBuilder {
    mode: CampaignMode,
    title: String,
    body: String,
    data: Option<Map<String, Value>>,
    criteria: Criteria,
}

impl CampaignRequestBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Opaque payload forwarded to recipients' devices.
    pub fn data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn raffle_id(mut self, raffle_id: impl Into<String>) -> Self {
        self.criteria.raffle_id = Some(raffle_id.into());
        self
    }

    pub fn raffle_ids<I, S>(mut self, raffle_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.criteria.raffle_ids = raffle_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn customer_ids<I, S>(mut self, customer_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.criteria.customer_ids = customer_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn attempt_passed(mut self, passed: bool) -> Self {
        self.criteria.attempt_passed = Some(passed);
        self
    }

    pub fn only_completed_tickets(mut self, only_completed: bool) -> Self {
        self.criteria.only_completed_tickets = Some(only_completed);
        self
    }

    /// Validate the form and keep only the criteria that belong to the mode.
    pub fn build(self) -> ConsoleResult<CampaignRequest> {
        let title = self.title.trim().to_string();
        let body = self.body.trim().to_string();
        if title.is_empty() {
            return Err(invalid("Title is required"));
        }
        if body.is_empty() {
            return Err(invalid("Message body is required"));
        }

        let given = self.criteria;
        let only_completed = Some(given.only_completed_tickets());
        let raffle_id = given
            .raffle_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        let criteria = match &self.mode {
            CampaignMode::AllUsers => Criteria::default(),
            CampaignMode::RaffleUsers => Criteria {
                raffle_id: Some(raffle_id.ok_or_else(|| invalid("Select a raffle"))?),
                only_completed_tickets: only_completed,
                ..Default::default()
            },
            CampaignMode::MultiRaffleUnion => {
                let raffle_ids = dedup_ids(given.raffle_ids);
                if raffle_ids.is_empty() {
                    return Err(invalid("Select at least one raffle"));
                }
                Criteria {
                    raffle_ids,
                    only_completed_tickets: only_completed,
                    ..Default::default()
                }
            }
            CampaignMode::SelectedCustomers => {
                let customer_ids = dedup_ids(given.customer_ids);
                if customer_ids.is_empty() {
                    return Err(invalid("Select at least one customer"));
                }
                Criteria {
                    customer_ids,
                    ..Default::default()
                }
            }
            CampaignMode::AttemptStatus => Criteria {
                attempt_passed: Some(
                    given
                        .attempt_passed
                        .ok_or_else(|| invalid("Choose passed or failed attempts"))?,
                ),
                raffle_id,
                ..Default::default()
            },
            CampaignMode::Unrecognized(raw) => {
                return Err(invalid(&format!("Unsupported mode: {raw}")));
            }
        };

        Ok(CampaignRequest {
            mode: self.mode,
            title,
            body,
            data: self.data.filter(|d| !d.is_empty()),
            criteria,
        })
    }
}

fn invalid(message: &str) -> ConsoleError {
    ConsoleError::Validation(message.to_string())
}

fn dedup_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

/// Result of a successful dispatch call, passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub ok: bool,
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub recipient_count: u64,
}

#[derive(Debug, Deserialize)]
struct DispatchErrorBody {
    error: String,
    #[serde(default)]
    details: Option<Value>,
}

/// Interpret the dispatch function's reply.
pub fn parse_dispatch_response(status: u16, body: &str) -> ConsoleResult<DispatchOutcome> {
    if !(200..300).contains(&status) {
        return Err(match serde_json::from_str::<DispatchErrorBody>(body) {
            Ok(err) if !err.error.trim().is_empty() => ConsoleError::Dispatch {
                message: err.error,
                details: err.details.and_then(details_text),
            },
            _ => ConsoleError::Dispatch {
                message: format!("request failed with status {status}"),
                details: None,
            },
        });
    }

    let outcome: DispatchOutcome = serde_json::from_str(body)
        .map_err(|e| ConsoleError::MalformedResponse(format!("dispatch response: {e}")))?;

    if !outcome.ok {
        return Err(ConsoleError::Dispatch {
            message: "dispatch reported failure".to_string(),
            details: None,
        });
    }

    Ok(outcome)
}

fn details_text(details: Value) -> Option<String> {
    match details {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

pub struct DispatchClient {
    backend: BackendClient,
    function_name: String,
}

impl DispatchClient {
    pub fn new(backend: BackendClient, config: &DispatchConfig) -> Self {
        Self {
            backend,
            function_name: config.function_name.clone(),
        }
    }

    pub fn endpoint(&self) -> String {
        self.backend
            .endpoint(&format!("functions/v1/{}", self.function_name))
    }

    /// Send one campaign. No retry is attempted; failures are returned as-is.
    pub async fn send(
        &self,
        request: &CampaignRequest,
        session: Option<&Session>,
    ) -> ConsoleResult<DispatchOutcome> {
        let session = match session {
            Some(session) if session.is_usable() => session,
            _ => return Err(ConsoleError::Unauthenticated),
        };

        log::info!(
            "Dispatching '{}' campaign '{}'",
            request.mode,
            request.title
        );

        let response = self
            .backend
            .with_session(session)
            .authorize(self.backend.http().post(self.endpoint()))
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        let outcome = parse_dispatch_response(status, &body)?;

        log::info!(
            "Campaign {} sent to {} recipients",
            outcome.campaign_id.as_deref().unwrap_or("-"),
            outcome.recipient_count
        );
        Ok(outcome)
    }
}
