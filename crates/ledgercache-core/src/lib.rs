//! Ledgercache core library.
//!
//! Client side of a personal finance tracker: REST API client, data models,
//! a local backup cache, and the sync service that backs the backend up into
//! the cache and restores the cache into an emptied backend.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod sync;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, ApiError, FinanceApi};
pub use auth::{Session, SessionContext};
pub use cache::{CacheManager, KeyValueStore};
pub use config::{Config, SyncOptions};
pub use sync::{Connectivity, SyncPhase, SyncService, SyncStatus};
