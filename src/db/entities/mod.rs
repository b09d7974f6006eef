//! SeaORM entities mapping the uptime tables.
//!
//! Column names follow the schema in `migrations/`; conversions into the
//! domain types in [`crate::db::models`] live next to each entity.

pub mod alert_settings;
pub mod service;
pub mod service_url;
pub mod uptime_check;
pub mod user;

pub mod prelude {
    pub use super::alert_settings::Entity as AlertSettings;
    pub use super::service::Entity as Service;
    pub use super::service_url::Entity as ServiceUrl;
    pub use super::uptime_check::Entity as UptimeCheck;
    pub use super::user::Entity as User;
}
