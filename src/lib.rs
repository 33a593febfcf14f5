pub mod backend;
pub mod campaign_resolver;
pub mod campaigns;
pub mod config;
pub mod csv_export;
pub mod dashboard;
pub mod debounce;
pub mod delivery_status;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod normalize;
pub mod optimistic;
pub mod paginator;
pub mod realtime;
pub mod session;

pub use backend::{BackendClient, DataService, Query, Session};
pub use campaign_resolver::{describe_audience, AudienceDescription};
pub use config::Config;
pub use delivery_status::{infer_status, DeliverySummary, EffectiveStatus};
pub use dispatch::{CampaignRequest, DispatchClient, DispatchOutcome};
pub use error::{ConsoleError, ConsoleResult};
pub use paginator::{CustomerCache, DeliveryPaginator, PageMode};
