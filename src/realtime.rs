//! Change-feed events and the local collections they keep up to date.

use crate::config::RealtimeConfig;
use crate::debounce::Debouncer;
use crate::models::{Campaign, Customer, Delivery, Raffle};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One insert/update/delete notification for a table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    #[serde(rename = "eventType", alias = "type")]
    pub kind: ChangeKind,
    #[serde(default, rename = "new", alias = "record")]
    pub new_record: Option<Value>,
    #[serde(default, rename = "old", alias = "old_record")]
    pub old_record: Option<Value>,
}

impl ChangeEvent {
    /// Decode a raw feed payload; anything unrecognizable is ignored.
    pub fn decode(payload: &Value) -> Option<Self> {
        match serde_json::from_value(payload.clone()) {
            Ok(event) => Some(event),
            Err(e) => {
                log::debug!("Ignoring unrecognized change payload: {e}");
                None
            }
        }
    }

    /// Id of the affected row, from the new record or else the old one.
    pub fn record_id(&self) -> Option<&str> {
        [&self.new_record, &self.old_record]
            .into_iter()
            .flatten()
            .find_map(|record| record.get("id").and_then(Value::as_str))
    }
}

pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Campaign {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Delivery {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Customer {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Raffle {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Newest-first list for one table, merged incrementally from change events.
#[derive(Debug, Clone)]
pub struct LiveList<T> {
    table: String,
    items: Vec<T>,
}

impl<T: Keyed + DeserializeOwned> LiveList<T> {
    pub fn new(table: impl Into<String>, items: Vec<T>) -> Self {
        Self {
            table: table.into(),
            items,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
    }

    /// Merge one event. Returns whether the list changed.
    pub fn apply(&mut self, event: &ChangeEvent) -> bool {
        if event.table != self.table {
            return false;
        }

        match event.kind {
            ChangeKind::Insert | ChangeKind::Update => {
                let Some(record) = event
                    .new_record
                    .clone()
                    .and_then(crate::normalize::decode_row::<T>)
                else {
                    return false;
                };
                match self.items.iter().position(|item| item.key() == record.key()) {
                    Some(index) => self.items[index] = record,
                    None => self.items.insert(0, record),
                }
                true
            }
            ChangeKind::Delete => match event.record_id() {
                Some(id) => {
                    let before = self.items.len();
                    self.items.retain(|item| item.key() != id);
                    self.items.len() != before
                }
                None => false,
            },
        }
    }
}

/// Debounced re-fetch of one table whenever the change feed reports activity.
#[derive(Debug)]
pub struct RefetchTrigger {
    table: String,
    debouncer: Debouncer,
}

impl RefetchTrigger {
    pub fn new(table: impl Into<String>, delay: Duration) -> Self {
        Self {
            table: table.into(),
            debouncer: Debouncer::new(delay),
        }
    }

    /// Trigger using the configured quiet period.
    pub fn from_config(table: impl Into<String>, config: &RealtimeConfig) -> Self {
        Self::new(table, Duration::from_millis(config.debounce_ms))
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn delay(&self) -> Duration {
        self.debouncer.delay()
    }

    /// Schedule `refetch` if the event concerns this table. Returns whether a
    /// run was (re)scheduled.
    pub fn notify<F, Fut>(&mut self, event: &ChangeEvent, refetch: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if event.table != self.table {
            return false;
        }
        self.debouncer.trigger(refetch);
        true
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}
