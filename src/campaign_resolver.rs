//! Human-readable audience descriptions for stored campaigns.
//!
//! Name resolution here is a pure lookup against a caller-supplied map; the
//! loaders in [`crate::campaigns`] are responsible for fetching raffle names.

use crate::models::{CampaignMode, Criteria, RaffleNames};
use serde::Serialize;

pub const EM_DASH: &str = "—";
const MAX_LISTED_RAFFLES: usize = 4;
const SHORT_ID_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudienceDescription {
    pub summary: String,
    pub chips: Vec<String>,
}

impl AudienceDescription {
    fn from_chips(chips: Vec<String>) -> Self {
        Self {
            summary: chips.join(" · "),
            chips,
        }
    }
}

pub fn describe_audience(
    mode: &CampaignMode,
    criteria: &Criteria,
    names: &RaffleNames,
) -> AudienceDescription {
    match mode {
        CampaignMode::AllUsers => AudienceDescription::from_chips(vec!["Everyone".to_string()]),
        CampaignMode::RaffleUsers => AudienceDescription::from_chips(vec![
            format!("Raffle: {}", single_raffle_label(criteria, names)),
            tickets_qualifier(criteria).to_string(),
        ]),
        CampaignMode::MultiRaffleUnion => AudienceDescription::from_chips(vec![
            format!("Raffles: {}", raffle_list_label(&criteria.raffle_ids, names)),
            tickets_qualifier(criteria).to_string(),
        ]),
        CampaignMode::SelectedCustomers => {
            let count = match criteria.customer_ids.len() {
                0 => EM_DASH.to_string(),
                n => n.to_string(),
            };
            AudienceDescription::from_chips(vec![format!("Customers: {count}")])
        }
        CampaignMode::AttemptStatus => {
            let attempt = match criteria.attempt_passed {
                Some(true) => "Passed",
                Some(false) => "Failed",
                None => "Passed/Failed",
            };
            let scope = match criteria.raffle_id {
                Some(_) => single_raffle_label(criteria, names),
                None => "All raffles".to_string(),
            };
            AudienceDescription::from_chips(vec![
                format!("Attempt: {attempt}"),
                format!("Scope: {scope}"),
            ])
        }
        CampaignMode::Unrecognized(_) => AudienceDescription {
            summary: EM_DASH.to_string(),
            chips: Vec::new(),
        },
    }
}

pub fn tickets_qualifier(criteria: &Criteria) -> &'static str {
    if criteria.only_completed_tickets() {
        "Completed tickets only"
    } else {
        "All tickets"
    }
}

/// First few characters of an opaque id, for display when no name is known.
pub fn short_id(id: &str) -> String {
    if id.chars().count() > SHORT_ID_LEN {
        let head: String = id.chars().take(SHORT_ID_LEN).collect();
        format!("{head}…")
    } else {
        id.to_string()
    }
}

fn single_raffle_label(criteria: &Criteria, names: &RaffleNames) -> String {
    match criteria.raffle_id.as_deref() {
        Some(id) => names
            .get(id)
            .map(str::to_string)
            .unwrap_or_else(|| short_id(id)),
        None => EM_DASH.to_string(),
    }
}

fn raffle_list_label(ids: &[String], names: &RaffleNames) -> String {
    if ids.is_empty() {
        return EM_DASH.to_string();
    }

    let resolved: Vec<&str> = ids
        .iter()
        .take(MAX_LISTED_RAFFLES)
        .filter_map(|id| names.get(id))
        .collect();

    if resolved.is_empty() {
        return match ids.len() {
            1 => "1 raffle".to_string(),
            n => format!("{n} raffles"),
        };
    }

    let hidden = ids.len() - resolved.len();
    if hidden > 0 {
        format!("{} +{hidden}", resolved.join(", "))
    } else {
        resolved.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(pairs: &[(&str, &str)]) -> RaffleNames {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_all_users() {
        let d = describe_audience(&CampaignMode::AllUsers, &Criteria::default(), &names(&[]));
        assert_eq!(d.summary, "Everyone");
        assert_eq!(d.chips, vec!["Everyone"]);
    }

    #[test]
    fn test_raffle_users_resolves_name_and_defaults_to_completed() {
        let criteria = Criteria {
            raffle_id: Some("r1".to_string()),
            ..Default::default()
        };
        let d = describe_audience(
            &CampaignMode::RaffleUsers,
            &criteria,
            &names(&[("r1", "Summer Car Draw")]),
        );
        assert_eq!(
            d.chips,
            vec!["Raffle: Summer Car Draw", "Completed tickets only"]
        );
        assert_eq!(d.summary, "Raffle: Summer Car Draw · Completed tickets only");
    }

    #[test]
    fn test_raffle_users_falls_back_to_short_id_then_dash() {
        let criteria = Criteria {
            raffle_id: Some("0b5f2c1e-8d5b-4a52-9d6e-1f7a0c3b9e44".to_string()),
            only_completed_tickets: Some(false),
            ..Default::default()
        };
        let d = describe_audience(&CampaignMode::RaffleUsers, &criteria, &names(&[]));
        assert_eq!(d.chips, vec!["Raffle: 0b5f2c1e…", "All tickets"]);

        let d = describe_audience(&CampaignMode::RaffleUsers, &Criteria::default(), &names(&[]));
        assert_eq!(d.chips[0], "Raffle: —");
    }

    #[test]
    fn test_multi_raffle_union_partial_names() {
        let criteria = Criteria {
            raffle_ids: ["a", "b", "c", "d", "e"].map(String::from).to_vec(),
            only_completed_tickets: Some(false),
            ..Default::default()
        };
        let d = describe_audience(
            &CampaignMode::MultiRaffleUnion,
            &criteria,
            &names(&[("a", "Foo"), ("b", "Bar")]),
        );
        assert_eq!(d.chips, vec!["Raffles: Foo, Bar +3", "All tickets"]);
    }

    #[test]
    fn test_multi_raffle_union_caps_listed_names() {
        let criteria = Criteria {
            raffle_ids: ["a", "b", "c", "d", "e", "f"].map(String::from).to_vec(),
            ..Default::default()
        };
        let d = describe_audience(
            &CampaignMode::MultiRaffleUnion,
            &criteria,
            &names(&[("a", "A"), ("b", "B"), ("c", "C"), ("d", "D"), ("e", "E")]),
        );
        assert_eq!(
            d.chips,
            vec!["Raffles: A, B, C, D +2", "Completed tickets only"]
        );
    }

    #[test]
    fn test_multi_raffle_union_without_names_counts() {
        let criteria = Criteria {
            raffle_ids: ["a", "b", "c"].map(String::from).to_vec(),
            ..Default::default()
        };
        let d = describe_audience(&CampaignMode::MultiRaffleUnion, &criteria, &names(&[]));
        assert_eq!(d.chips[0], "Raffles: 3 raffles");
    }

    #[test]
    fn test_selected_customers_count() {
        let criteria = Criteria {
            customer_ids: ["u1", "u2"].map(String::from).to_vec(),
            raffle_id: Some("ignored".to_string()),
            ..Default::default()
        };
        let d = describe_audience(&CampaignMode::SelectedCustomers, &criteria, &names(&[]));
        assert_eq!(d.chips, vec!["Customers: 2"]);

        let d = describe_audience(
            &CampaignMode::SelectedCustomers,
            &Criteria::default(),
            &names(&[]),
        );
        assert_eq!(d.chips, vec!["Customers: —"]);
    }

    #[test]
    fn test_attempt_status_unresolved_scope() {
        let criteria = Criteria {
            attempt_passed: Some(true),
            raffle_id: Some("x".to_string()),
            ..Default::default()
        };
        let d = describe_audience(&CampaignMode::AttemptStatus, &criteria, &names(&[]));
        assert_eq!(d.chips, vec!["Attempt: Passed", "Scope: x"]);
    }

    #[test]
    fn test_attempt_status_defaults() {
        let d = describe_audience(
            &CampaignMode::AttemptStatus,
            &Criteria::default(),
            &names(&[]),
        );
        assert_eq!(d.chips, vec!["Attempt: Passed/Failed", "Scope: All raffles"]);

        let criteria = Criteria {
            attempt_passed: Some(false),
            raffle_id: Some("r1".to_string()),
            ..Default::default()
        };
        let d = describe_audience(
            &CampaignMode::AttemptStatus,
            &criteria,
            &names(&[("r1", "Watch Draw")]),
        );
        assert_eq!(d.chips, vec!["Attempt: Failed", "Scope: Watch Draw"]);
    }

    #[test]
    fn test_unrecognized_mode() {
        let d = describe_audience(
            &CampaignMode::Unrecognized("vip".to_string()),
            &Criteria::default(),
            &names(&[]),
        );
        assert_eq!(d.summary, "—");
        assert!(d.chips.is_empty());
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id("abcdefgh"), "abcdefgh");
        assert_eq!(short_id("abcdefghi"), "abcdefgh…");
    }
}
