//! Page-level loaders for campaigns and the raffle names they reference.

use crate::backend::{DataService, Query};
use crate::campaign_resolver::{describe_audience, AudienceDescription};
use crate::error::{ConsoleError, ConsoleResult};
use crate::models::{Campaign, CampaignMode, Raffle, RaffleNames, CAMPAIGNS, RAFFLES};
use crate::normalize::decode_rows;
use std::collections::HashSet;

pub async fn list_campaigns(service: &dyn DataService, limit: usize) -> ConsoleResult<Vec<Campaign>> {
    let rows = service
        .select(
            CAMPAIGNS,
            &Query::new().order("created_at", true).limit(limit.max(1)),
        )
        .await?;
    Ok(decode_rows(rows))
}

pub async fn fetch_campaign(service: &dyn DataService, id: &str) -> ConsoleResult<Campaign> {
    let rows = service
        .select(CAMPAIGNS, &Query::new().eq("id", id).limit(1))
        .await?;
    decode_rows::<Campaign>(rows)
        .into_iter()
        .next()
        .ok_or_else(|| ConsoleError::Service(format!("campaign not found: {id}")))
}

/// Raffle ids referenced by the campaign's active mode.
pub fn raffle_ids_for(campaign: &Campaign) -> Vec<String> {
    let criteria = &campaign.criteria;
    match campaign.mode {
        CampaignMode::RaffleUsers | CampaignMode::AttemptStatus => {
            criteria.raffle_id.iter().cloned().collect()
        }
        CampaignMode::MultiRaffleUnion => criteria.raffle_ids.clone(),
        _ => Vec::new(),
    }
}

pub async fn fetch_raffle_names(
    service: &dyn DataService,
    ids: &[String],
) -> ConsoleResult<RaffleNames> {
    let mut seen = HashSet::new();
    let unique: Vec<&str> = ids
        .iter()
        .map(String::as_str)
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .collect();
    if unique.is_empty() {
        return Ok(RaffleNames::new());
    }

    let rows = service
        .select(
            RAFFLES,
            &Query::new().select(Raffle::SELECT).in_("id", unique),
        )
        .await?;
    let raffles: Vec<Raffle> = decode_rows(rows);
    Ok(RaffleNames::from(raffles.as_slice()))
}

/// Campaign rows with their audience resolved for display.
#[derive(Debug, Clone)]
pub struct CampaignView {
    pub campaign: Campaign,
    pub audience: AudienceDescription,
}

/// Resolve raffle names for a batch of campaigns with a single lookup.
pub async fn describe_campaigns(
    service: &dyn DataService,
    campaigns: Vec<Campaign>,
) -> ConsoleResult<Vec<CampaignView>> {
    let ids: Vec<String> = campaigns.iter().flat_map(raffle_ids_for).collect();
    let names = fetch_raffle_names(service, &ids).await?;

    Ok(campaigns
        .into_iter()
        .map(|campaign| CampaignView {
            audience: describe_audience(&campaign.mode, &campaign.criteria, &names),
            campaign,
        })
        .collect())
}
