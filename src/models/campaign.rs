use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Targeting strategy selecting which customers receive a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CampaignMode {
    AllUsers,
    RaffleUsers,
    SelectedCustomers,
    MultiRaffleUnion,
    AttemptStatus,
    Unrecognized(String),
}

impl CampaignMode {
    pub fn as_str(&self) -> &str {
        match self {
            CampaignMode::AllUsers => "all_users",
            CampaignMode::RaffleUsers => "raffle_users",
            CampaignMode::SelectedCustomers => "selected_customers",
            CampaignMode::MultiRaffleUnion => "multi_raffle_union",
            CampaignMode::AttemptStatus => "attempt_status",
            CampaignMode::Unrecognized(raw) => raw,
        }
    }

    /// Short label used as the mode chip in listings.
    pub fn label(&self) -> &str {
        match self {
            CampaignMode::AllUsers => "All users",
            CampaignMode::RaffleUsers => "Raffle participants",
            CampaignMode::SelectedCustomers => "Selected customers",
            CampaignMode::MultiRaffleUnion => "Multiple raffles",
            CampaignMode::AttemptStatus => "Attempt status",
            CampaignMode::Unrecognized(_) => "Unknown",
        }
    }
}

impl From<&str> for CampaignMode {
    fn from(raw: &str) -> Self {
        match raw.trim() {
            "all_users" => CampaignMode::AllUsers,
            "raffle_users" => CampaignMode::RaffleUsers,
            "selected_customers" => CampaignMode::SelectedCustomers,
            "multi_raffle_union" => CampaignMode::MultiRaffleUnion,
            "attempt_status" => CampaignMode::AttemptStatus,
            other => CampaignMode::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for CampaignMode {
    fn from(raw: String) -> Self {
        CampaignMode::from(raw.as_str())
    }
}

impl From<CampaignMode> for String {
    fn from(mode: CampaignMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for CampaignMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mode-specific targeting parameters. Decoding is lenient: a field holding
/// the wrong JSON type is treated as absent rather than failing the campaign.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct Criteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raffle_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub raffle_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub customer_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_passed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_completed_tickets: Option<bool>,
}

impl Criteria {
    /// Ticket completion filter; absent means completed tickets only.
    pub fn only_completed_tickets(&self) -> bool {
        self.only_completed_tickets.unwrap_or(true)
    }
}

impl From<Value> for Criteria {
    fn from(value: Value) -> Self {
        let empty = Map::new();
        let map = value.as_object().unwrap_or(&empty);

        Criteria {
            raffle_id: non_empty_string(map.get("raffle_id")),
            raffle_ids: string_list(map.get("raffle_ids")),
            customer_ids: string_list(map.get("customer_ids")),
            attempt_passed: map.get("attempt_passed").and_then(Value::as_bool),
            only_completed_tickets: map.get("only_completed_tickets").and_then(Value::as_bool),
        }
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value.and_then(Value::as_array) {
        Some(items) => items
            .iter()
            .filter_map(|item| non_empty_string(Some(item)))
            .collect(),
        None => Vec::new(),
    }
}

/// One notification broadcast, as stored in `admin_notification_campaigns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<String>,
    pub mode: CampaignMode,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub criteria: Criteria,
    #[serde(default)]
    pub recipient_count: u64,
}
