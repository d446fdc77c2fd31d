pub mod app_config;
pub mod booking_repo;
pub mod catalog_repo;
pub mod database;
pub mod memory;

pub use app_config::Config;
pub use booking_repo::PgBookingStore;
pub use catalog_repo::PgResourceCatalog;
pub use database::Db;
pub use memory::{MemoryBookingStore, MemoryResourceCatalog};
