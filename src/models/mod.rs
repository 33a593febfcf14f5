pub mod campaign;
pub mod customer;
pub mod delivery;
pub mod raffle;

pub use campaign::{Campaign, CampaignMode, Criteria};
pub use customer::Customer;
pub use delivery::{Delivery, DeliveryStatusFilter};
pub use raffle::{Raffle, RaffleNames};

pub const RAFFLES: &str = "raffles";
pub const TICKETS: &str = "tickets";
pub const CUSTOMERS: &str = "customers";
pub const SUPPORT_REQUESTS: &str = "support_requests";
pub const ADMIN_USERS: &str = "admin_users";
pub const CAMPAIGNS: &str = "admin_notification_campaigns";
pub const DELIVERIES: &str = "admin_notification_deliveries";

pub const RAFFLE_IMAGES_BUCKET: &str = "raffle-images";
