//! Local backup cache for offline access and restore.
//!
//! `CacheManager` keeps two entries, the user backup and the transaction
//! backup, plus the restore-on-start flag, in a `KeyValueStore`. Entries are
//! JSON wrapped in a `CachedData` envelope carrying the backup time.

pub mod manager;
pub mod store;

pub use manager::{CacheAges, CacheManager, CachedData, STARTED_KEY, TRANSACTIONS_KEY, USERS_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore};
