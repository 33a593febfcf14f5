use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Raffle {
    pub id: String,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl Raffle {
    pub const SELECT: &'static str = "id,title,status";
}

/// Caller-supplied lookup from raffle id to display name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaffleNames(HashMap<String, String>);

impl RaffleNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.0.insert(id.into(), name.into());
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.0
            .get(id)
            .map(String::as_str)
            .filter(|name| !name.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RaffleNames {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut names = RaffleNames::new();
        for (id, name) in iter {
            names.insert(id, name);
        }
        names
    }
}

impl From<&[Raffle]> for RaffleNames {
    fn from(raffles: &[Raffle]) -> Self {
        raffles
            .iter()
            .map(|r| (r.id.clone(), r.title.clone()))
            .collect()
    }
}
