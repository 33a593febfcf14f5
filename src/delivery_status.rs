use crate::models::Delivery;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Delivery outcome derived on read from the stored telemetry. Never written
/// back to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveStatus {
    Pending,
    Ok,
    Failed,
    AttemptedUnknown,
}

impl EffectiveStatus {
    pub fn attempted(self) -> bool {
        !matches!(self, EffectiveStatus::Pending)
    }

    /// `Some(ok)` once the outcome is known, `None` while pending or indeterminate.
    pub fn ok(self) -> Option<bool> {
        match self {
            EffectiveStatus::Ok => Some(true),
            EffectiveStatus::Failed => Some(false),
            EffectiveStatus::Pending | EffectiveStatus::AttemptedUnknown => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EffectiveStatus::Pending => "pending",
            EffectiveStatus::Ok => "ok",
            EffectiveStatus::Failed => "failed",
            EffectiveStatus::AttemptedUnknown => "attempted_unknown",
        }
    }
}

impl fmt::Display for EffectiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infer the effective status of one delivery.
///
/// The dispatch function does not always write `push_attempted`/`push_ok`
/// even when a push went out, so when the stored flag is not set the error
/// and response columns are consulted, in that order.
pub fn infer_status(delivery: &Delivery) -> EffectiveStatus {
    let stored_attempted = delivery.stored_attempted();
    let error = delivery.error_text();
    let payload = delivery.response_payload();

    let attempted = stored_attempted || error.is_some() || payload.is_some();
    if !attempted {
        return EffectiveStatus::Pending;
    }

    // The stored flag is authoritative once it has actually been written.
    if stored_attempted {
        return if delivery.stored_ok() {
            EffectiveStatus::Ok
        } else {
            EffectiveStatus::Failed
        };
    }

    if error.is_some() {
        return EffectiveStatus::Failed;
    }

    match payload.and_then(ok_from_payload) {
        Some(true) => EffectiveStatus::Ok,
        Some(false) => EffectiveStatus::Failed,
        None => EffectiveStatus::AttemptedUnknown,
    }
}

fn ok_from_payload(payload: &Value) -> Option<bool> {
    if let Some(status) = payload.get("status").and_then(Value::as_str) {
        match status.trim().to_lowercase().as_str() {
            "ok" | "success" => return Some(true),
            "error" | "failed" => return Some(false),
            _ => {}
        }
    }

    payload.get("ok").and_then(Value::as_bool)
}

/// Per-campaign tally of effective statuses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliverySummary {
    pub total: usize,
    pub inbox_inserted: usize,
    pub pending: usize,
    pub ok: usize,
    pub failed: usize,
    pub attempted_unknown: usize,
}

impl DeliverySummary {
    pub fn from_deliveries<'a>(deliveries: impl IntoIterator<Item = &'a Delivery>) -> Self {
        let mut summary = DeliverySummary::default();
        for delivery in deliveries {
            summary.record(delivery);
        }
        summary
    }

    pub fn record(&mut self, delivery: &Delivery) {
        self.total += 1;
        if delivery.inserted_inbox() {
            self.inbox_inserted += 1;
        }
        match infer_status(delivery) {
            EffectiveStatus::Pending => self.pending += 1,
            EffectiveStatus::Ok => self.ok += 1,
            EffectiveStatus::Failed => self.failed += 1,
            EffectiveStatus::AttemptedUnknown => self.attempted_unknown += 1,
        }
    }

    pub fn attempted(&self) -> usize {
        self.ok + self.failed + self.attempted_unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn delivery(
        attempted: Option<bool>,
        ok: Option<bool>,
        error: Option<&str>,
        response: Option<Value>,
    ) -> Delivery {
        Delivery {
            id: "d1".to_string(),
            created_at: Utc::now(),
            campaign_id: "c1".to_string(),
            customer_id: "u1".to_string(),
            push_token: Some("ExponentPushToken[abc]".to_string()),
            inserted_inbox: Some(true),
            push_attempted: attempted,
            push_ok: ok,
            provider: Some("expo".to_string()),
            response,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_stored_flag_is_authoritative() {
        // Error and payload would both say "failed", but the stored flags win.
        let d = delivery(
            Some(true),
            Some(true),
            Some("timeout"),
            Some(json!({"status": "error"})),
        );
        assert_eq!(infer_status(&d), EffectiveStatus::Ok);

        let d = delivery(Some(true), Some(false), None, Some(json!({"status": "ok"})));
        assert_eq!(infer_status(&d), EffectiveStatus::Failed);

        let d = delivery(Some(true), None, None, None);
        assert_eq!(infer_status(&d), EffectiveStatus::Failed);
    }

    #[test]
    fn test_stored_attempted_matches_stored_ok_for_all_combinations() {
        let errors = [None, Some("boom")];
        let payloads = [
            None,
            Some(json!({"status": "success"})),
            Some(json!({"ok": false})),
        ];
        for ok in [true, false] {
            for error in errors {
                for payload in payloads.clone() {
                    let status = infer_status(&delivery(Some(true), Some(ok), error, payload));
                    assert!(status.attempted());
                    assert_eq!(status.ok(), Some(ok));
                }
            }
        }
    }

    #[test]
    fn test_nothing_recorded_is_pending() {
        assert_eq!(
            infer_status(&delivery(None, None, None, None)),
            EffectiveStatus::Pending
        );
        assert_eq!(
            infer_status(&delivery(Some(false), Some(true), None, Some(json!({})))),
            EffectiveStatus::Pending
        );
        assert_eq!(
            infer_status(&delivery(Some(false), None, Some("  "), Some(Value::Null))),
            EffectiveStatus::Pending
        );
    }

    #[test]
    fn test_error_without_flag_is_failed() {
        let status = infer_status(&delivery(
            Some(false),
            None,
            Some("DeviceNotRegistered"),
            Some(json!({"status": "ok"})),
        ));
        assert_eq!(status, EffectiveStatus::Failed);
        assert!(status.attempted());
        assert_eq!(status.ok(), Some(false));
    }

    #[test]
    fn test_payload_status_is_case_insensitive() {
        for (raw, expected) in [
            ("OK", EffectiveStatus::Ok),
            ("Success", EffectiveStatus::Ok),
            ("ERROR", EffectiveStatus::Failed),
            ("failed", EffectiveStatus::Failed),
        ] {
            let d = delivery(None, None, None, Some(json!({ "status": raw })));
            assert_eq!(infer_status(&d), expected, "status {raw}");
        }
    }

    #[test]
    fn test_payload_ok_field_fallback() {
        let d = delivery(None, None, None, Some(json!({"status": "queued", "ok": true})));
        assert_eq!(infer_status(&d), EffectiveStatus::Ok);

        let d = delivery(None, None, None, Some(json!({"ok": false})));
        assert_eq!(infer_status(&d), EffectiveStatus::Failed);
    }

    #[test]
    fn test_unreadable_payload_is_attempted_unknown() {
        let d = delivery(None, None, None, Some(json!({"id": "ticket-123"})));
        assert_eq!(infer_status(&d), EffectiveStatus::AttemptedUnknown);

        let d = delivery(None, None, None, Some(json!({"status": "queued", "ok": "yes"})));
        assert_eq!(infer_status(&d), EffectiveStatus::AttemptedUnknown);
    }

    #[test]
    fn test_summary_counts() {
        let deliveries = vec![
            delivery(Some(true), Some(true), None, None),
            delivery(None, None, Some("boom"), None),
            delivery(None, None, None, None),
            delivery(None, None, None, Some(json!({"receipt": 1}))),
        ];

        let summary = DeliverySummary::from_deliveries(&deliveries);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.inbox_inserted, 4);
        assert_eq!(summary.ok, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.attempted_unknown, 1);
        assert_eq!(summary.attempted(), 3);
    }
}
