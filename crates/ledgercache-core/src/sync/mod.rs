//! LocalCacheSync: mirrors the backend into the local cache and replays the
//! cache into an empty backend.
//!
//! - `SyncService`: backup/restore passes, fallback reads, writes
//! - `AutoBackup`: periodic backup task with a teardown pass
//! - `SyncStatus`: phase plus tri-state connectivity, published on a watch channel
//!
//! Backup and restore passes never return errors; failures are logged and
//! reported through the pass reports.

pub mod merge;
pub mod report;
pub mod scheduler;
pub mod service;
pub mod single_flight;
pub mod status;

pub use report::{
    BackupReport, DataSource, RestoreReport, RestoreSkip, Sourced, StartupOutcome,
    TransactionBackup, TransactionRestore, UserBackup, UserRestore,
};
pub use scheduler::AutoBackup;
pub use service::SyncService;
pub use single_flight::SingleFlight;
pub use status::{Connectivity, SyncPhase, SyncStatus};
