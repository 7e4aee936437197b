use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    CachedTransaction, FinancialSummary, NewTransaction, NewUser, RemoteUser, UserUpdate,
};

/// Remote finance tracker operations the sync service depends on.
///
/// `ApiClient` is the HTTP implementation. Errors for non-2xx responses are
/// `ApiError` values wrapped in `anyhow::Error`.
#[async_trait]
pub trait FinanceApi: Send + Sync {
    /// Reachability probe. Any HTTP answer counts as reachable; only a
    /// network-level failure is an error.
    async fn probe(&self) -> Result<()>;

    /// Log in with the backend and return the user record
    async fn authenticate(&self, username: &str, password: &str) -> Result<RemoteUser>;

    async fn list_users(&self) -> Result<Vec<RemoteUser>>;

    /// Look up a user by username. `Ok(None)` when the backend reports 404.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<RemoteUser>>;

    async fn create_user(&self, user: &NewUser) -> Result<RemoteUser>;

    async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<RemoteUser>;

    async fn list_transactions(&self, user_id: i64) -> Result<Vec<CachedTransaction>>;

    async fn create_transaction(&self, transaction: &NewTransaction) -> Result<CachedTransaction>;

    async fn update_transaction(
        &self,
        id: i64,
        transaction: &NewTransaction,
    ) -> Result<CachedTransaction>;

    async fn delete_transaction(&self, id: i64) -> Result<()>;

    async fn summary(&self, user_id: i64) -> Result<FinancialSummary>;
}
