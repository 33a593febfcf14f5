use crate::delivery_status::infer_status;
use crate::models::Delivery;
use crate::paginator::CustomerCache;
use anyhow::{bail, Context, Result};
use std::path::Path;

pub const DELIVERY_COLUMNS: [&str; 11] = [
    "id",
    "created_at",
    "customer_id",
    "customer_name",
    "customer_email",
    "inbox_inserted",
    "push_attempted",
    "push_ok",
    "effective_status",
    "provider",
    "error",
];

fn needs_quoting(field: &str) -> bool {
    field.contains([',', '"', '\n', '\r'])
}

fn escape_field(field: &str) -> String {
    if needs_quoting(field) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_record<S: AsRef<str>>(out: &mut String, record: &[S]) {
    let line: Vec<String> = record.iter().map(|f| escape_field(f.as_ref())).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

/// Render a table as RFC 4180 CSV with a trailing newline.
pub fn to_csv<H, R, S>(headers: &[H], rows: &[R]) -> String
where
    H: AsRef<str>,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut out = String::new();
    push_record(&mut out, headers);
    for row in rows {
        push_record(&mut out, row.as_ref());
    }
    out
}

/// Parse CSV produced by [`to_csv`] (or any RFC 4180 input) back into records.
pub fn parse_csv(text: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                other => field.push(other),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            other => field.push(other),
        }
    }

    if in_quotes {
        bail!("unterminated quoted field");
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}

fn flag(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "true",
        Some(false) => "false",
        None => "",
    }
}

pub fn delivery_record(delivery: &Delivery, customers: &CustomerCache) -> Vec<String> {
    let customer = customers.get(&delivery.customer_id);
    vec![
        delivery.id.clone(),
        delivery.created_at.to_rfc3339(),
        delivery.customer_id.clone(),
        customer
            .and_then(|c| c.full_name.clone())
            .unwrap_or_default(),
        customer.and_then(|c| c.email.clone()).unwrap_or_default(),
        flag(delivery.inserted_inbox).to_string(),
        flag(delivery.push_attempted).to_string(),
        flag(delivery.push_ok).to_string(),
        infer_status(delivery).to_string(),
        delivery.provider.clone().unwrap_or_default(),
        delivery.error.clone().unwrap_or_default(),
    ]
}

pub fn deliveries_csv(deliveries: &[Delivery], customers: &CustomerCache) -> String {
    let rows: Vec<Vec<String>> = deliveries
        .iter()
        .map(|d| delivery_record(d, customers))
        .collect();
    to_csv(&DELIVERY_COLUMNS, &rows)
}

pub fn write_csv<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    std::fs::write(&path, content.as_bytes())
        .with_context(|| format!("Failed to write CSV file: {}", path.as_ref().display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Customer;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_quotes_only_when_needed() {
        let csv = to_csv(&["name", "note"], &[vec!["plain", "a,b"], vec!["say \"hi\"", ""]]);
        assert_eq!(csv, "name,note\nplain,\"a,b\"\n\"say \"\"hi\"\"\",\n");
    }

    #[test]
    fn test_round_trip_awkward_value() {
        let awkward = "Hello, \"winner\"\nsee you at the draw";
        let rows = vec![vec!["r1".to_string(), awkward.to_string()]];
        let csv = to_csv(&["id", "message"], &rows);
        assert!(csv.ends_with('\n'));

        let parsed = parse_csv(&csv).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], vec!["id", "message"]);
        assert_eq!(parsed[1][1], awkward);
    }

    #[test]
    fn test_parse_handles_crlf_and_empty_fields() {
        let parsed = parse_csv("a,b,c\r\n1,,3\r\n").unwrap();
        assert_eq!(parsed, vec![vec!["a", "b", "c"], vec!["1", "", "3"]]);

        assert!(parse_csv("a,\"open\n").is_err());
    }

    #[test]
    fn test_deliveries_csv_columns() {
        let delivery = Delivery {
            id: "d1".to_string(),
            created_at: Utc::now(),
            campaign_id: "c1".to_string(),
            customer_id: "u1".to_string(),
            push_token: None,
            inserted_inbox: Some(true),
            push_attempted: None,
            push_ok: None,
            provider: Some("expo".to_string()),
            response: Some(json!({"status": "error"})),
            error: Some("DeviceNotRegistered, token stale".to_string()),
        };
        let mut customers = CustomerCache::new();
        customers.merge(vec![Customer {
            id: "u1".to_string(),
            full_name: Some("Ada Lovelace".to_string()),
            email: Some("ada@example.com".to_string()),
        }]);

        let parsed = parse_csv(&deliveries_csv(&[delivery], &customers)).unwrap();
        assert_eq!(parsed[0], DELIVERY_COLUMNS.to_vec());
        let row = &parsed[1];
        assert_eq!(row[3], "Ada Lovelace");
        assert_eq!(row[4], "ada@example.com");
        assert_eq!(row[5], "true");
        assert_eq!(row[6], "");
        assert_eq!(row[8], "failed");
        assert_eq!(row[10], "DeviceNotRegistered, token stale");
    }
}
