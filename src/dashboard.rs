use crate::backend::{DataService, Query};
use crate::error::ConsoleResult;
use crate::models::{CAMPAIGNS, RAFFLES, SUPPORT_REQUESTS, TICKETS};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub raffles: u64,
    pub active_raffles: u64,
    pub completed_tickets: u64,
    pub open_support_requests: u64,
    pub campaigns: u64,
}

/// Load the dashboard counters concurrently. Any failing count fails the
/// whole load.
pub async fn load_dashboard(service: &dyn DataService) -> ConsoleResult<DashboardStats> {
    let all = Query::new().select("id");
    let active = all.clone().eq("status", "active");
    let completed = all.clone().eq("status", "completed");
    let open = all.clone().eq("status", "open");

    let (raffles, active_raffles, completed_tickets, open_support_requests, campaigns) =
        tokio::try_join!(
            service.count(RAFFLES, &all),
            service.count(RAFFLES, &active),
            service.count(TICKETS, &completed),
            service.count(SUPPORT_REQUESTS, &open),
            service.count(CAMPAIGNS, &all),
        )?;

    Ok(DashboardStats {
        raffles,
        active_raffles,
        completed_tickets,
        open_support_requests,
        campaigns,
    })
}
