//! Backup and restore between the finance backend and the local cache.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use futures::future::{join_all, BoxFuture, FutureExt};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::FinanceApi;
use crate::auth::SessionContext;
use crate::cache::CacheManager;
use crate::config::SyncOptions;
use crate::models::{
    CachedTransaction, CachedUser, FinancialSummary, NewTransaction, NewUser, RemoteUser,
    UserUpdate,
};

use super::merge::{replace_user_transactions, upsert_users};
use super::report::{
    BackupReport, RestoreReport, RestoreSkip, Sourced, StartupOutcome, TransactionBackup,
    TransactionRestore, UserBackup, UserRestore,
};
use super::single_flight::SingleFlight;
use super::status::{Connectivity, SyncPhase, SyncStatus};

/// Keeps the local cache and the finance backend in step.
///
/// Clone is cheap; clones share state, so one service can be handed to the
/// auto-backup task and the UI at the same time.
pub struct SyncService<A: FinanceApi + 'static> {
    inner: Arc<Inner<A>>,
}

impl<A: FinanceApi + 'static> Clone for SyncService<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<A> {
    api: A,
    cache: CacheManager,
    options: SyncOptions,
    status: watch::Sender<SyncStatus>,
    /// Serializes backup and restore passes
    pass_lock: tokio::sync::Mutex<()>,
    /// Guards read-modify-write of cache entries
    cache_lock: Mutex<()>,
    /// In-flight passes, keyed by session user id
    backup_flight: SingleFlight<Option<i64>, BackupReport>,
    restore_flight: SingleFlight<Option<i64>, RestoreReport>,
}

impl<A: FinanceApi + 'static> SyncService<A> {
    pub fn new(api: A, cache: CacheManager, options: SyncOptions) -> Self {
        let (status, _) = watch::channel(SyncStatus::default());
        Self {
            inner: Arc::new(Inner {
                api,
                cache,
                options,
                status,
                pass_lock: tokio::sync::Mutex::new(()),
                cache_lock: Mutex::new(()),
                backup_flight: SingleFlight::new(),
                restore_flight: SingleFlight::new(),
            }),
        }
    }

    pub fn api(&self) -> &A {
        &self.inner.api
    }

    pub fn cache(&self) -> &CacheManager {
        &self.inner.cache
    }

    pub fn options(&self) -> &SyncOptions {
        &self.inner.options
    }

    pub fn status(&self) -> SyncStatus {
        *self.inner.status.borrow()
    }

    /// Watch phase and connectivity changes
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    // =========================================================================
    // Passes
    // =========================================================================

    /// Back up users, then the session user's transactions.
    /// Concurrent callers for the same user share a single in-flight pass.
    pub async fn backup_all(&self, session: Option<&SessionContext>) -> BackupReport {
        let key = session.map(SessionContext::user_id);
        let pass = self.backup_pass(session);
        self.inner.backup_flight.run(key, pass).await
    }

    /// Backup that starts after the caller's write, never joining a pass
    /// whose remote reads may predate it.
    async fn backup_after_write(&self, session: &SessionContext) -> BackupReport {
        let pass = self.backup_pass(Some(session));
        self.inner
            .backup_flight
            .run_fresh(Some(session.user_id()), pass)
            .await
    }

    fn backup_pass(
        &self,
        session: Option<&SessionContext>,
    ) -> impl FnOnce() -> BoxFuture<'static, BackupReport> {
        let inner = Arc::clone(&self.inner);
        let session = session.cloned();
        move || {
            async move {
                let _pass = inner.pass_lock.lock().await;
                inner.backup_all(session.as_ref()).await
            }
            .boxed()
        }
    }

    pub async fn backup_users(&self, session: Option<&SessionContext>) -> UserBackup {
        let _pass = self.inner.pass_lock.lock().await;
        self.inner.backup_users(session).await
    }

    pub async fn backup_transactions(&self, session: Option<&SessionContext>) -> TransactionBackup {
        let _pass = self.inner.pass_lock.lock().await;
        self.inner.backup_transactions(session).await
    }

    /// Probe the backend and, if it answers, replay the backup into it.
    /// Concurrent callers for the same user share a single in-flight pass.
    pub async fn restore_data(&self, session: Option<&SessionContext>) -> RestoreReport {
        let inner = Arc::clone(&self.inner);
        let key = session.map(SessionContext::user_id);
        let session = session.cloned();
        self.inner
            .restore_flight
            .run(key, move || async move {
                let _pass = inner.pass_lock.lock().await;
                inner.restore_data(session.as_ref()).await
            })
            .await
    }

    pub async fn restore_users(&self) -> UserRestore {
        let _pass = self.inner.pass_lock.lock().await;
        self.inner.restore_users().await
    }

    pub async fn restore_transactions(
        &self,
        session: Option<&SessionContext>,
    ) -> TransactionRestore {
        let _pass = self.inner.pass_lock.lock().await;
        self.inner.restore_transactions(session).await
    }

    /// Restore once per cache, on the first start; later starts only probe.
    pub async fn startup(&self, session: Option<&SessionContext>) -> StartupOutcome {
        if self.inner.cache.is_started() {
            debug!("Restore already ran for this cache, probing only");
            return StartupOutcome::AlreadyStarted(self.probe().await);
        }

        if let Err(e) = self.inner.cache.mark_started() {
            warn!(error = %e, "Failed to persist start flag");
        }
        StartupOutcome::Restored(self.restore_data(session).await)
    }

    /// Explicit reachability probe. The only way connectivity changes
    /// outside of a restore pass.
    pub async fn probe(&self) -> Connectivity {
        let connectivity = self.inner.probe().await;
        let phase = match connectivity {
            Connectivity::Offline => SyncPhase::Offline,
            _ => SyncPhase::Online,
        };
        self.inner.set_status(phase, connectivity);
        connectivity
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn stored_users(&self) -> Vec<CachedUser> {
        self.inner.cache.stored_users()
    }

    pub fn stored_transactions(&self) -> Vec<CachedTransaction> {
        self.inner.cache.stored_transactions()
    }

    /// Transactions for the session user, from the backend when possible,
    /// otherwise from the local backup.
    pub async fn user_transactions(
        &self,
        session: &SessionContext,
    ) -> Sourced<Vec<CachedTransaction>> {
        let user_id = session.user_id();
        if !self.status().is_offline() {
            match self.inner.api.list_transactions(user_id).await {
                Ok(fresh) => {
                    if let Err(e) = self.inner.store_user_transactions(user_id, &fresh) {
                        warn!(user_id, error = %e, "Failed to refresh transaction backup");
                    }
                    return Sourced::remote(fresh);
                }
                Err(e) => {
                    warn!(user_id, error = %e, "Failed to load transactions, using local backup");
                }
            }
        }

        let cached = self.inner.cache.stored_transactions_for(user_id);
        info!(user_id, count = cached.len(), "Loaded transactions from local backup");
        Sourced::cache(cached)
    }

    /// Income/expense totals, computed from the local backup when the
    /// backend cannot answer.
    pub async fn summary(&self, session: &SessionContext) -> Sourced<FinancialSummary> {
        let user_id = session.user_id();
        if !self.status().is_offline() {
            match self.inner.api.summary(user_id).await {
                Ok(summary) => return Sourced::remote(summary),
                Err(e) => {
                    warn!(
                        user_id,
                        error = %e,
                        "Failed to load summary, computing from local backup"
                    );
                }
            }
        }

        let cached = self.inner.cache.stored_transactions_for(user_id);
        Sourced::cache(FinancialSummary::from_transactions(&cached))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Log in with the backend and start a session
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionContext> {
        let user = self.inner.api.authenticate(username, password).await?;
        info!(user_id = user.id, "Logged in");
        Ok(SessionContext::from_remote(&user))
    }

    /// Create an account and start a session for it
    pub async fn register(&self, user: NewUser) -> Result<SessionContext> {
        let created = self
            .inner
            .api
            .create_user(&user)
            .await
            .with_context(|| format!("Failed to register {}", user.username))?;
        let session = SessionContext::from_remote(&created);
        info!(user_id = session.user_id(), "Registered user");
        self.backup_users(Some(&session)).await;
        Ok(session)
    }

    pub async fn update_profile(
        &self,
        session: &SessionContext,
        update: &UserUpdate,
    ) -> Result<SessionContext> {
        let updated: RemoteUser = self
            .inner
            .api
            .update_user(session.user_id(), update)
            .await
            .context("Failed to update profile")?;
        let mut next = session.clone();
        next.user = updated.to_cached();
        self.backup_users(Some(&next)).await;
        Ok(next)
    }

    pub async fn create_transaction(
        &self,
        session: &SessionContext,
        transaction: NewTransaction,
    ) -> Result<CachedTransaction> {
        let payload = NewTransaction {
            user_id: session.user_id(),
            ..transaction
        };
        let created = self
            .inner
            .api
            .create_transaction(&payload)
            .await
            .context("Failed to create transaction")?;
        self.backup_after_write(session).await;
        Ok(created)
    }

    pub async fn update_transaction(
        &self,
        session: &SessionContext,
        id: i64,
        transaction: NewTransaction,
    ) -> Result<CachedTransaction> {
        let payload = NewTransaction {
            user_id: session.user_id(),
            ..transaction
        };
        let updated = self
            .inner
            .api
            .update_transaction(id, &payload)
            .await
            .with_context(|| format!("Failed to update transaction {}", id))?;
        self.backup_after_write(session).await;
        Ok(updated)
    }

    pub async fn delete_transaction(&self, session: &SessionContext, id: i64) -> Result<()> {
        self.inner
            .api
            .delete_transaction(id)
            .await
            .with_context(|| format!("Failed to delete transaction {}", id))?;
        self.backup_after_write(session).await;
        Ok(())
    }
}

impl<A: FinanceApi> Inner<A> {
    fn set_status(&self, phase: SyncPhase, connectivity: Connectivity) {
        self.status.send_replace(SyncStatus { phase, connectivity });
    }

    fn set_phase(&self, phase: SyncPhase) {
        self.status.send_modify(|status| status.phase = phase);
    }

    async fn probe(&self) -> Connectivity {
        match self.api.probe().await {
            Ok(()) => Connectivity::Online,
            Err(e) => {
                warn!(error = %e, "Backend not reachable");
                Connectivity::Offline
            }
        }
    }

    fn store_users(&self, incoming: &[CachedUser]) -> Result<()> {
        let _guard = self.cache_lock.lock().unwrap_or_else(|p| p.into_inner());
        let merged = upsert_users(self.cache.stored_users(), incoming);
        self.cache.save_users(&merged)
    }

    fn store_user_transactions(&self, user_id: i64, fresh: &[CachedTransaction]) -> Result<()> {
        let _guard = self.cache_lock.lock().unwrap_or_else(|p| p.into_inner());
        let merged = replace_user_transactions(self.cache.stored_transactions(), user_id, fresh);
        self.cache.save_transactions(&merged)
    }

    async fn backup_all(&self, session: Option<&SessionContext>) -> BackupReport {
        let was_online = self.status.borrow().phase == SyncPhase::Online;
        if was_online {
            self.set_phase(SyncPhase::BackingUp);
        }

        let users = self.backup_users(session).await;
        let transactions = self.backup_transactions(session).await;

        if was_online {
            self.status.send_if_modified(|status| {
                if status.phase == SyncPhase::BackingUp {
                    status.phase = SyncPhase::Online;
                    true
                } else {
                    false
                }
            });
        }

        info!(users = ?users, transactions = ?transactions, "Data backup completed");
        BackupReport { users, transactions }
    }

    async fn backup_users(&self, session: Option<&SessionContext>) -> UserBackup {
        let (incoming, outcome) = match self.api.list_users().await {
            Ok(remote) => {
                let users: Vec<CachedUser> = remote.iter().map(RemoteUser::to_cached).collect();
                let count = users.len();
                (users, UserBackup::Remote { count })
            }
            Err(e) => {
                info!(error = %e, "User list unavailable, backing up current user only");
                match session {
                    Some(session) => (vec![session.user.clone()], UserBackup::CurrentUserOnly),
                    None => return UserBackup::Skipped,
                }
            }
        };

        match self.store_users(&incoming) {
            Ok(()) => {
                debug!(count = incoming.len(), "Backed up users");
                outcome
            }
            Err(e) => {
                error!(error = %e, "Failed to write user backup");
                UserBackup::Failed
            }
        }
    }

    async fn backup_transactions(&self, session: Option<&SessionContext>) -> TransactionBackup {
        let Some(session) = session else {
            debug!("No session, skipping transaction backup");
            return TransactionBackup::NoSession;
        };
        let user_id = session.user_id();

        let fresh = match self.api.list_transactions(user_id).await {
            Ok(fresh) => fresh,
            Err(e) => {
                error!(user_id, error = %e, "Failed to backup transactions");
                return TransactionBackup::Failed;
            }
        };

        match self.store_user_transactions(user_id, &fresh) {
            Ok(()) => {
                debug!(user_id, count = fresh.len(), "Backed up transactions");
                TransactionBackup::Saved { count: fresh.len() }
            }
            Err(e) => {
                error!(user_id, error = %e, "Failed to write transaction backup");
                TransactionBackup::Failed
            }
        }
    }

    async fn restore_data(&self, session: Option<&SessionContext>) -> RestoreReport {
        self.set_phase(SyncPhase::Restoring);

        if self.probe().await == Connectivity::Offline {
            warn!("Backend API not available, using local data only");
            self.set_status(SyncPhase::Offline, Connectivity::Offline);
            return RestoreReport::Offline;
        }
        self.status.send_modify(|status| status.connectivity = Connectivity::Online);

        let users = self.restore_users().await;
        let transactions = self.restore_transactions(session).await;

        self.set_phase(SyncPhase::Online);
        info!("Data restoration completed");
        RestoreReport::Restored { users, transactions }
    }

    async fn restore_users(&self) -> UserRestore {
        let stored = self.cache.stored_users();
        let mut report = UserRestore::default();
        if stored.is_empty() {
            info!("No users to restore");
            return report;
        }

        let total = stored.len();
        info!(count = total, "Restoring users");

        for user in stored {
            let Some(username) = user.username().map(str::to_string) else {
                warn!(user_id = user.id, "Skipping cached user with no username");
                report.skipped += 1;
                continue;
            };

            match self.api.find_user_by_username(&username).await {
                Ok(Some(_)) => {
                    debug!(username = %username, "User already exists, skipping");
                    report.present.push(user);
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(username = %username, error = %e, "Failed to check whether user exists");
                }
            }

            let new_user = NewUser {
                email: user.email_or_placeholder(&username),
                username: username.clone(),
                password: self.options.restored_user_password.clone(),
            };
            match self.api.create_user(&new_user).await {
                Ok(_) => {
                    info!(username = %username, "Restored user");
                    report.created += 1;
                    report.present.push(user);
                }
                Err(e) => {
                    warn!(username = %username, error = %e, "Failed to restore user");
                    report.failed += 1;
                }
            }
        }

        info!(
            present = report.present.len(),
            created = report.created,
            total,
            "User restore finished"
        );
        report
    }

    async fn restore_transactions(&self, session: Option<&SessionContext>) -> TransactionRestore {
        let Some(session) = session else {
            warn!("No current user, cannot restore transactions");
            return TransactionRestore::Skipped(RestoreSkip::NoSession);
        };
        let user_id = session.user_id();

        let pending = self.cache.stored_transactions_for(user_id);
        if pending.is_empty() {
            debug!(user_id, "No cached transactions to restore");
            return TransactionRestore::Skipped(RestoreSkip::NothingCached);
        }

        // Restore is all-or-nothing per user
        match self.api.list_transactions(user_id).await {
            Ok(existing) if !existing.is_empty() => {
                info!(
                    user_id,
                    count = existing.len(),
                    "User already has transactions, skipping restore"
                );
                return TransactionRestore::Skipped(RestoreSkip::RemoteHasData {
                    count: existing.len(),
                });
            }
            Ok(_) => {}
            Err(e) => {
                warn!(user_id, error = %e, "Failed to check existing transactions");
            }
        }

        let batch_size = self.options.batch_size.max(1);
        let total = pending.len();
        let batch_count = total.div_ceil(batch_size);
        info!(user_id, count = total, batches = batch_count, "Restoring transactions");

        let mut batches = Vec::with_capacity(batch_count);
        let mut restored = 0;
        let mut failed = 0;

        for (index, batch) in pending.chunks(batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.options.batch_delay).await;
            }

            let payloads: Vec<NewTransaction> =
                batch.iter().map(|t| t.to_replay(user_id)).collect();
            let results = join_all(payloads.iter().map(|p| self.api.create_transaction(p))).await;

            for result in results {
                match result {
                    Ok(_) => restored += 1,
                    Err(e) => {
                        warn!(user_id, error = %e, "Failed to restore transaction");
                        failed += 1;
                    }
                }
            }

            batches.push(batch.len());
            debug!(batch = index + 1, of = batch_count, "Replayed transaction batch");
        }

        info!(user_id, restored, total, "Transaction restore finished");
        TransactionRestore::Replayed {
            batches,
            restored,
            failed,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
