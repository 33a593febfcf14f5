use serde::{Deserialize, Serialize};

/// Minimal customer record used to label deliveries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default, alias = "name")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Customer {
    pub const SELECT: &'static str = "id,full_name,email";

    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}
