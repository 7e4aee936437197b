use crate::models::CachedUser;

use super::Connectivity;

/// What a user backup pass wrote to the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserBackup {
    /// Full user list fetched from the backend
    Remote { count: usize },
    /// User list unavailable; only the session user was merged in
    CurrentUserOnly,
    /// User list unavailable and no session user to fall back on
    Skipped,
    /// Writing the cache failed
    Failed,
}

/// What a transaction backup pass wrote to the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionBackup {
    Saved { count: usize },
    NoSession,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    pub users: UserBackup,
    pub transactions: TransactionBackup,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRestore {
    /// Cached users known to exist remotely after the pass
    pub present: Vec<CachedUser>,
    pub created: usize,
    pub failed: usize,
    /// Cached entries without a username
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSkip {
    NoSession,
    NothingCached,
    RemoteHasData { count: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionRestore {
    Skipped(RestoreSkip),
    Replayed {
        /// Size of each batch, in replay order
        batches: Vec<usize>,
        restored: usize,
        failed: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreReport {
    /// Backend unreachable; nothing was replayed
    Offline,
    Restored {
        users: UserRestore,
        transactions: TransactionRestore,
    },
}

/// Result of the restore-on-start gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupOutcome {
    Restored(RestoreReport),
    /// Restore already ran for this cache; only reachability was probed
    AlreadyStarted(Connectivity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Remote,
    Cache,
}

/// Data tagged with where it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct Sourced<T> {
    pub data: T,
    pub source: DataSource,
}

impl<T> Sourced<T> {
    pub fn remote(data: T) -> Self {
        Self {
            data,
            source: DataSource::Remote,
        }
    }

    pub fn cache(data: T) -> Self {
        Self {
            data,
            source: DataSource::Cache,
        }
    }

    pub fn is_cached(&self) -> bool {
        self.source == DataSource::Cache
    }
}
