use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use super::store::{FileStore, KeyValueStore, MemoryStore};
use crate::models::{CachedTransaction, CachedUser};

/// Cache key for the user backup
pub const USERS_KEY: &str = "ledger_users";

/// Cache key for the transaction backup (all users)
pub const TRANSACTIONS_KEY: &str = "ledger_transactions";

/// Set once restore-on-start has run for this cache
pub const STARTED_KEY: &str = "app_started";

/// Consider a backup stale after 1 hour.
const CACHE_STALE_MINUTES: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Covers clock skew as well
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() > CACHE_STALE_MINUTES
    }
}

/// Typed access to the backup entries kept in a [`KeyValueStore`].
/// Clone is cheap; clones share the same store.
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<dyn KeyValueStore>,
}

impl CacheManager {
    /// File-backed cache rooted at `cache_dir`
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        Ok(Self::with_store(Arc::new(FileStore::new(cache_dir)?)))
    }

    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.store)
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<CachedData<T>>> {
        let Some(contents) = self.store.get(name)? else {
            return Ok(None);
        };

        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache entry: {}", name))?;

        Ok(Some(cached))
    }

    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let cached = CachedData::new(data);
        let contents = serde_json::to_string_pretty(&cached)?;
        self.store.set(name, &contents)
    }

    /// Load a list entry, treating a missing or unreadable entry as empty
    fn load_list<T: DeserializeOwned>(&self, name: &str) -> Vec<T> {
        match self.load::<Vec<T>>(name) {
            Ok(Some(cached)) => cached.data,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(cache = name, error = %e, "Ignoring unreadable cache entry");
                Vec::new()
            }
        }
    }

    // ===== Users =====

    pub fn load_users(&self) -> Result<Option<CachedData<Vec<CachedUser>>>> {
        self.load(USERS_KEY)
    }

    pub fn save_users(&self, users: &[CachedUser]) -> Result<()> {
        self.save(USERS_KEY, &users)
    }

    /// Cached users, empty when nothing has been backed up
    pub fn stored_users(&self) -> Vec<CachedUser> {
        self.load_list(USERS_KEY)
    }

    // ===== Transactions =====

    pub fn load_transactions(&self) -> Result<Option<CachedData<Vec<CachedTransaction>>>> {
        self.load(TRANSACTIONS_KEY)
    }

    pub fn save_transactions(&self, transactions: &[CachedTransaction]) -> Result<()> {
        self.save(TRANSACTIONS_KEY, &transactions)
    }

    /// Cached transactions for every user
    pub fn stored_transactions(&self) -> Vec<CachedTransaction> {
        self.load_list(TRANSACTIONS_KEY)
    }

    /// Cached transactions owned by `user_id`, in cache order
    pub fn stored_transactions_for(&self, user_id: i64) -> Vec<CachedTransaction> {
        self.stored_transactions()
            .into_iter()
            .filter(|t| t.user_id == user_id)
            .collect()
    }

    // ===== Restore gate =====

    pub fn is_started(&self) -> bool {
        match self.store.get(STARTED_KEY) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                debug!(error = %e, "Failed to read start flag");
                false
            }
        }
    }

    pub fn mark_started(&self) -> Result<()> {
        self.store.set(STARTED_KEY, "true")
    }

    /// Remove both backups and reset the restore gate
    pub fn clear(&self) -> Result<()> {
        for key in [USERS_KEY, TRANSACTIONS_KEY, STARTED_KEY] {
            self.store.remove(key)?;
        }
        Ok(())
    }

    // ===== Cache Age Information =====

    /// Helper to load cache and log errors without failing
    fn load_age<T>(
        &self,
        name: &str,
        loader: impl FnOnce() -> Result<Option<CachedData<T>>>,
    ) -> Option<String> {
        match loader() {
            Ok(Some(cached)) => Some(cached.age_display()),
            Ok(None) => None,
            Err(e) => {
                debug!(cache = name, error = %e, "Failed to load cache for age display");
                None
            }
        }
    }

    pub fn get_cache_ages(&self) -> CacheAges {
        CacheAges {
            users: self.load_age(USERS_KEY, || self.load_users()),
            transactions: self.load_age(TRANSACTIONS_KEY, || self.load_transactions()),
        }
    }

    /// True when the transaction backup is missing, unreadable or older than an hour
    pub fn any_stale(&self) -> bool {
        match self.load_transactions() {
            Ok(Some(cached)) => cached.is_stale(),
            Ok(None) => true,
            Err(e) => {
                debug!(error = %e, "Failed to load cache for staleness check");
                true
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct CacheAges {
    pub users: Option<String>,
    pub transactions: Option<String>,
}

impl CacheAges {
    pub fn users_age(&self) -> String {
        self.users.clone().unwrap_or_else(|| "never".to_string())
    }

    pub fn transactions_age(&self) -> String {
        self.transactions.clone().unwrap_or_else(|| "never".to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use chrono::Duration;
    use tempfile::TempDir;

    fn user(id: i64, name: &str) -> CachedUser {
        CachedUser {
            id,
            username: Some(name.to_string()),
            email: None,
        }
    }

    fn transaction(id: i64, user_id: i64) -> CachedTransaction {
        CachedTransaction {
            id: Some(id),
            user_id,
            kind: TransactionType::Income,
            amount: 10.0,
            description: None,
            category: None,
            date: None,
        }
    }

    #[test]
    fn test_cached_data_age_display_just_now() {
        let cached = CachedData::new(vec![1, 2, 3]);
        assert_eq!(cached.age_display(), "just now");
    }

    #[test]
    fn test_cached_data_age_display_rounding() {
        let mut cached = CachedData::new(());
        cached.cached_at = Utc::now() - Duration::minutes(95);
        assert_eq!(cached.age_display(), "2h ago");

        cached.cached_at = Utc::now() - Duration::minutes(24 * 60 + 5 * 60);
        assert_eq!(cached.age_display(), "1d ago");
    }

    #[test]
    fn test_cached_data_is_stale() {
        let fresh = CachedData::new(vec![1]);
        assert!(!fresh.is_stale());

        let mut old = CachedData::new(vec![1]);
        old.cached_at = Utc::now() - Duration::minutes(61);
        assert!(old.is_stale());
    }

    #[test]
    fn test_users_round_trip_on_disk() {
        let dir = TempDir::new().expect("temp dir");
        let cache = CacheManager::new(dir.path().to_path_buf()).expect("cache");

        assert!(cache.stored_users().is_empty());
        cache.save_users(&[user(1, "alice"), user(2, "bob")]).expect("save users");

        let reopened = CacheManager::new(dir.path().to_path_buf()).expect("cache");
        let users = reopened.stored_users();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].username.as_deref(), Some("bob"));
    }

    #[test]
    fn test_stored_transactions_for_filters_by_user() {
        let cache = CacheManager::in_memory();
        cache
            .save_transactions(&[transaction(1, 7), transaction(2, 8), transaction(3, 7)])
            .expect("save transactions");

        let ids: Vec<_> = cache.stored_transactions_for(7).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![Some(1), Some(3)]);
        assert_eq!(cache.stored_transactions().len(), 3);
    }

    #[test]
    fn test_corrupt_entry_reads_as_empty() {
        let cache = CacheManager::in_memory();
        cache.store().set(USERS_KEY, "{not json").expect("set raw");
        assert!(cache.stored_users().is_empty());
        assert!(cache.load_users().is_err());
    }

    #[test]
    fn test_clear_resets_backups_and_gate() {
        let cache = CacheManager::in_memory();
        cache.save_users(&[user(1, "alice")]).expect("save users");
        cache.mark_started().expect("mark started");
        assert!(cache.is_started());

        cache.clear().expect("clear");
        assert!(!cache.is_started());
        assert!(cache.stored_users().is_empty());
        assert_eq!(cache.get_cache_ages().users_age(), "never");
    }

    #[test]
    fn test_cache_ages_after_save() {
        let cache = CacheManager::in_memory();
        assert!(cache.any_stale());
        cache.save_transactions(&[transaction(1, 7)]).expect("save");
        let ages = cache.get_cache_ages();
        assert_eq!(ages.transactions_age(), "just now");
        assert_eq!(ages.users_age(), "never");
        assert!(!cache.any_stale());
    }
}
