use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One per-recipient outcome row in `admin_notification_deliveries`.
///
/// The push telemetry columns are written asynchronously by the dispatch
/// function and are sometimes never written at all, hence the `Option`s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub campaign_id: String,
    pub customer_id: String,
    #[serde(default)]
    pub push_token: Option<String>,
    #[serde(default)]
    pub inserted_inbox: Option<bool>,
    #[serde(default)]
    pub push_attempted: Option<bool>,
    #[serde(default)]
    pub push_ok: Option<bool>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Delivery {
    pub fn inserted_inbox(&self) -> bool {
        self.inserted_inbox.unwrap_or(false)
    }

    pub fn stored_attempted(&self) -> bool {
        self.push_attempted.unwrap_or(false)
    }

    pub fn stored_ok(&self) -> bool {
        self.push_ok.unwrap_or(false)
    }

    /// Error text, ignoring blank strings.
    pub fn error_text(&self) -> Option<&str> {
        self.error
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    /// Response payload, ignoring `null`, `{}`, `[]` and blank strings.
    pub fn response_payload(&self) -> Option<&Value> {
        self.response.as_ref().filter(|value| match value {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
    }
}

/// Database-flag filter used when paging deliveries. Coarser than the
/// inferred status: it only looks at the stored telemetry columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryStatusFilter {
    #[default]
    All,
    Pending,
    Ok,
    Failed,
}

impl DeliveryStatusFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "all" => Some(DeliveryStatusFilter::All),
            "pending" => Some(DeliveryStatusFilter::Pending),
            "ok" | "success" => Some(DeliveryStatusFilter::Ok),
            "failed" | "error" => Some(DeliveryStatusFilter::Failed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn delivery(response: Option<Value>, error: Option<&str>) -> Delivery {
        Delivery {
            id: "d1".to_string(),
            created_at: Utc::now(),
            campaign_id: "c1".to_string(),
            customer_id: "u1".to_string(),
            push_token: None,
            inserted_inbox: Some(true),
            push_attempted: None,
            push_ok: None,
            provider: None,
            response,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_blank_error_is_absent() {
        assert_eq!(delivery(None, Some("   ")).error_text(), None);
        assert_eq!(
            delivery(None, Some("DeviceNotRegistered")).error_text(),
            Some("DeviceNotRegistered")
        );
    }

    #[test]
    fn test_empty_payloads_are_absent() {
        assert!(delivery(Some(Value::Null), None).response_payload().is_none());
        assert!(delivery(Some(json!({})), None).response_payload().is_none());
        assert!(delivery(Some(json!([])), None).response_payload().is_none());
        assert!(delivery(Some(json!({"status": "ok"})), None)
            .response_payload()
            .is_some());
    }

    #[test]
    fn test_null_telemetry_columns_decode() {
        let row: Delivery = serde_json::from_value(json!({
            "id": "d1",
            "created_at": "2024-05-01T10:00:00+00:00",
            "campaign_id": "c1",
            "customer_id": "u1",
            "push_attempted": null,
            "push_ok": null,
            "response": null
        }))
        .unwrap();

        assert!(!row.stored_attempted());
        assert!(!row.stored_ok());
        assert!(!row.inserted_inbox());
    }

    #[test]
    fn test_status_filter_parse() {
        assert_eq!(
            DeliveryStatusFilter::parse("FAILED"),
            Some(DeliveryStatusFilter::Failed)
        );
        assert_eq!(
            DeliveryStatusFilter::parse("all"),
            Some(DeliveryStatusFilter::All)
        );
        assert_eq!(DeliveryStatusFilter::parse("sent"), None);
    }
}
