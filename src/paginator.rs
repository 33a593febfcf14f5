//! Paged retrieval of a campaign's delivery rows, with lazy customer lookup.

use crate::backend::{DataService, Query};
use crate::error::ConsoleResult;
use crate::models::{Customer, Delivery, DeliveryStatusFilter, CUSTOMERS, DELIVERIES};
use crate::normalize::decode_rows;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_CUSTOMER_BATCH: usize = 500;

/// Customers already resolved for the current view. Entries are only ever
/// added; the whole cache is dropped with the paginator. Ids the backend had
/// no row for are remembered too, so they are not asked for again.
#[derive(Debug, Clone, Default)]
pub struct CustomerCache {
    entries: HashMap<String, Customer>,
    unknown: HashSet<String>,
}

impl CustomerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Customer> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Looked up already, but the backend returned no row for it.
    pub fn is_unknown(&self, id: &str) -> bool {
        self.unknown.contains(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids not cached yet, deduplicated, in first-seen order.
    pub fn missing<'a, I>(&self, ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        ids.into_iter()
            .filter(|id| {
                !id.is_empty() && !self.contains(id) && !self.is_unknown(id) && seen.insert(*id)
            })
            .map(str::to_string)
            .collect()
    }

    pub fn merge(&mut self, customers: Vec<Customer>) {
        for customer in customers {
            self.unknown.remove(&customer.id);
            self.entries.insert(customer.id.clone(), customer);
        }
    }

    /// Merge the result of looking up `requested`; ids with no row in
    /// `customers` are marked unknown.
    pub fn merge_lookup(&mut self, requested: &[String], customers: Vec<Customer>) {
        self.merge(customers);
        for id in requested {
            if !self.entries.contains_key(id) {
                self.unknown.insert(id.clone());
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    /// Replace the accumulated rows and restart from the first page.
    Reset,
    /// Fetch the next page and add it to the accumulated rows.
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub fetched: usize,
    pub has_more: bool,
}

pub struct DeliveryPaginator {
    service: Arc<dyn DataService>,
    campaign_id: String,
    filter: DeliveryStatusFilter,
    page_size: usize,
    customer_batch: usize,
    next_page: usize,
    rows: Vec<Delivery>,
    has_more: bool,
    last_error: Option<String>,
    customers: CustomerCache,
}

impl DeliveryPaginator {
    pub fn new(service: Arc<dyn DataService>, campaign_id: impl Into<String>) -> Self {
        Self {
            service,
            campaign_id: campaign_id.into(),
            filter: DeliveryStatusFilter::All,
            page_size: DEFAULT_PAGE_SIZE,
            customer_batch: DEFAULT_CUSTOMER_BATCH,
            next_page: 0,
            rows: Vec::new(),
            has_more: false,
            last_error: None,
            customers: CustomerCache::new(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_customer_batch(mut self, batch: usize) -> Self {
        self.customer_batch = batch.max(1);
        self
    }

    /// Change the status filter. A different filter drops the accumulated
    /// rows and rewinds the cursor, so the next load starts at the first page.
    pub fn set_filter(&mut self, filter: DeliveryStatusFilter) {
        if filter == self.filter {
            return;
        }
        self.filter = filter;
        self.rows.clear();
        self.next_page = 0;
        self.has_more = false;
    }

    pub fn filter(&self) -> DeliveryStatusFilter {
        self.filter
    }

    pub fn rows(&self) -> &[Delivery] {
        &self.rows
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn customers(&self) -> &CustomerCache {
        &self.customers
    }

    pub fn page_query(&self, page: usize) -> Query {
        let from = page * self.page_size;
        let query = Query::new()
            .select("*")
            .eq("campaign_id", &self.campaign_id);

        // A flag that was never written is read as false.
        let query = match self.filter {
            DeliveryStatusFilter::All => query,
            DeliveryStatusFilter::Pending => {
                query.or_(["push_attempted.is.null", "push_attempted.eq.false"])
            }
            DeliveryStatusFilter::Ok => query.eq("push_attempted", true).eq("push_ok", true),
            DeliveryStatusFilter::Failed => query
                .eq("push_attempted", true)
                .or_(["push_ok.is.null", "push_ok.eq.false"]),
        };

        query
            .order("created_at", true)
            .range(from, from + self.page_size - 1)
    }

    pub async fn load(&mut self, mode: PageMode) -> ConsoleResult<PageInfo> {
        let page = match mode {
            PageMode::Reset => 0,
            PageMode::Append => self.next_page,
        };

        let raw = match self.service.select(DELIVERIES, &self.page_query(page)).await {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!(
                    "Failed to load deliveries page {page} for campaign {}: {e}",
                    self.campaign_id
                );
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        let has_more = raw.len() == self.page_size;
        let page_rows: Vec<Delivery> = decode_rows(raw);
        let fetched = page_rows.len();

        if mode == PageMode::Reset {
            self.rows.clear();
        }
        self.rows.extend(page_rows);
        self.next_page = page + 1;
        self.has_more = has_more;
        self.last_error = None;

        log::debug!(
            "Loaded {fetched} deliveries (page {page}, total {}, more: {has_more})",
            self.rows.len()
        );

        let start = self.rows.len() - fetched;
        self.resolve_customers(start).await;

        Ok(PageInfo { fetched, has_more })
    }

    /// Reset and keep appending until the last page or `max_pages` pages.
    pub async fn load_all(&mut self, max_pages: usize) -> ConsoleResult<&[Delivery]> {
        let mut info = self.load(PageMode::Reset).await?;
        let mut pages = 1;
        while info.has_more && pages < max_pages {
            info = self.load(PageMode::Append).await?;
            pages += 1;
        }
        Ok(&self.rows)
    }

    async fn resolve_customers(&mut self, start: usize) {
        let missing = self
            .customers
            .missing(self.rows[start..].iter().map(|d| d.customer_id.as_str()));
        if missing.is_empty() {
            return;
        }

        for batch in missing.chunks(self.customer_batch) {
            let query = Query::new()
                .select(Customer::SELECT)
                .in_("id", batch.iter());
            match self.service.select(CUSTOMERS, &query).await {
                Ok(raw) => self.customers.merge_lookup(batch, decode_rows(raw)),
                Err(e) => log::warn!("Customer lookup failed for {} ids: {e}", batch.len()),
            }
        }
    }
}

impl std::fmt::Debug for DeliveryPaginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryPaginator")
            .field("campaign_id", &self.campaign_id)
            .field("filter", &self.filter)
            .field("page_size", &self.page_size)
            .field("rows", &self.rows.len())
            .field("has_more", &self.has_more)
            .finish()
    }
}
