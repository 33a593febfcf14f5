use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode untyped rows at the boundary. Rows that do not fit `T` are dropped
/// (and logged) instead of failing the whole collection.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Vec<T> {
    let total = rows.len();
    let decoded: Vec<T> = rows.into_iter().filter_map(decode_row).collect();

    if decoded.len() < total {
        log::debug!(
            "Dropped {} of {} rows that failed to decode as {}",
            total - decoded.len(),
            total,
            std::any::type_name::<T>()
        );
    }

    decoded
}

pub fn decode_row<T: DeserializeOwned>(row: Value) -> Option<T> {
    let id = row.get("id").cloned();
    match serde_json::from_value(row) {
        Ok(record) => Some(record),
        Err(e) => {
            log::debug!("Dropping malformed row (id: {id:?}): {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Campaign, Delivery};
    use serde_json::json;

    #[test]
    fn test_malformed_rows_are_dropped() {
        let rows = vec![
            json!({
                "id": "d1",
                "created_at": "2024-05-01T10:00:00+00:00",
                "campaign_id": "c1",
                "customer_id": "u1"
            }),
            // missing customer_id
            json!({
                "id": "d2",
                "created_at": "2024-05-01T10:00:00+00:00",
                "campaign_id": "c1"
            }),
            json!("not an object"),
        ];

        let deliveries: Vec<Delivery> = decode_rows(rows);
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].id, "d1");
    }

    #[test]
    fn test_bad_timestamp_drops_campaign() {
        let rows = vec![json!({
            "id": "c1",
            "created_at": "yesterday",
            "mode": "all_users",
            "title": "t",
            "body": "b"
        })];

        let campaigns: Vec<Campaign> = decode_rows(rows);
        assert!(campaigns.is_empty());
    }
}
