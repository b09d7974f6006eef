//! Query functions over the uptime tables.
//!
//! Each sub-module owns one table family and works on SeaORM models; the
//! conversion to domain types happens in [`crate::db::store::SeaOrmStore`].

pub mod check_service;
pub mod target_service;
pub mod user_service;

pub use check_service::*;
pub use target_service::*;
pub use user_service::*;
