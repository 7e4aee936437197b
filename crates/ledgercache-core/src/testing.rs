//! In-memory `FinanceApi` used by the unit tests.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::time::Instant;

use crate::api::{ApiError, FinanceApi};
use crate::models::{
    CachedTransaction, CachedUser, FinancialSummary, NewTransaction, NewUser, RemoteUser,
    TransactionType, UserUpdate,
};

/// Number of calls per endpoint
#[derive(Debug, Default, Clone, Copy)]
pub struct Calls {
    pub probe: usize,
    pub list_users: usize,
    pub find_user: usize,
    pub create_user: usize,
    pub list_transactions: usize,
    pub create_transaction: usize,
    pub summary: usize,
}

#[derive(Debug, Clone)]
pub struct CreateTiming {
    pub description: Option<String>,
    pub started: Instant,
    pub finished: Instant,
}

#[derive(Default)]
pub struct FakeState {
    pub users: Vec<RemoteUser>,
    pub transactions: Vec<CachedTransaction>,
    pub next_id: i64,
    /// Every call fails as a network error
    pub unreachable: bool,
    /// `GET /api/users` answers 404
    pub users_endpoint_missing: bool,
    /// `GET /api/transactions/user/{id}` answers 500
    pub transactions_endpoint_failing: bool,
    /// Descriptions whose create request answers 500
    pub failing_descriptions: HashSet<String>,
    /// Usernames whose create request answers 500
    pub failing_usernames: HashSet<String>,
    /// Delay applied before every call
    pub latency: Option<Duration>,
    /// Delay between reading the transaction list and answering, like a
    /// response still on the wire
    pub list_latency: Option<Duration>,
    /// Time each create request spends in the backend
    pub create_latency: Option<Duration>,
    /// Start and finish of every create request, in completion order
    pub create_timings: Vec<CreateTiming>,
    pub calls: Calls,
    pub created_users: Vec<NewUser>,
    pub created_transactions: Vec<NewTransaction>,
}

pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_id: 1000,
                ..Default::default()
            }),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn with_user(self, id: i64, username: &str) -> Self {
        self.state().users.push(RemoteUser {
            id,
            username: Some(username.to_string()),
            email: Some(format!("{}@mail.test", username)),
        });
        self
    }

    pub fn with_transactions(self, transactions: Vec<CachedTransaction>) -> Self {
        self.state().transactions.extend(transactions);
        self
    }

    pub fn calls(&self) -> Calls {
        self.state().calls
    }

    async fn enter(&self) -> Result<()> {
        let latency = self.state().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.state().unreachable {
            return Err(anyhow!("connection refused"));
        }
        Ok(())
    }

    fn server_error(what: &str) -> anyhow::Error {
        ApiError::ServerError(what.to_string()).into()
    }
}

pub fn cached_user(id: i64, username: &str) -> CachedUser {
    CachedUser {
        id,
        username: Some(username.to_string()),
        email: None,
    }
}

pub fn transaction(id: i64, user_id: i64, amount: f64) -> CachedTransaction {
    CachedTransaction {
        id: Some(id),
        user_id,
        kind: TransactionType::Expense,
        amount,
        description: Some(format!("item {}", id)),
        category: Some("General".to_string()),
        date: Some("2024-05-01T09:00:00".to_string()),
    }
}

#[async_trait]
impl FinanceApi for FakeApi {
    async fn probe(&self) -> Result<()> {
        self.state().calls.probe += 1;
        self.enter().await
    }

    async fn authenticate(&self, username: &str, _password: &str) -> Result<RemoteUser> {
        self.enter().await?;
        self.state()
            .users
            .iter()
            .find(|u| u.username.as_deref() == Some(username))
            .cloned()
            .ok_or_else(|| {
                ApiError::Unauthorized("Invalid username or password".to_string()).into()
            })
    }

    async fn list_users(&self) -> Result<Vec<RemoteUser>> {
        self.state().calls.list_users += 1;
        self.enter().await?;
        let state = self.state();
        if state.users_endpoint_missing {
            return Err(ApiError::NotFound("/api/users".to_string()).into());
        }
        Ok(state.users.clone())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<RemoteUser>> {
        self.state().calls.find_user += 1;
        self.enter().await?;
        Ok(self
            .state()
            .users
            .iter()
            .find(|u| u.username.as_deref() == Some(username))
            .cloned())
    }

    async fn create_user(&self, user: &NewUser) -> Result<RemoteUser> {
        self.state().calls.create_user += 1;
        self.enter().await?;
        let mut state = self.state();
        if state.failing_usernames.contains(&user.username) {
            return Err(Self::server_error("create user"));
        }
        state.next_id += 1;
        let created = RemoteUser {
            id: state.next_id,
            username: Some(user.username.clone()),
            email: Some(user.email.clone()),
        };
        state.users.push(created.clone());
        state.created_users.push(user.clone());
        Ok(created)
    }

    async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<RemoteUser> {
        self.enter().await?;
        let mut state = self.state();
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("user {}", id)))?;
        if let Some(ref username) = update.username {
            user.username = Some(username.clone());
        }
        if let Some(ref email) = update.email {
            user.email = Some(email.clone());
        }
        Ok(user.clone())
    }

    async fn list_transactions(&self, user_id: i64) -> Result<Vec<CachedTransaction>> {
        self.state().calls.list_transactions += 1;
        self.enter().await?;
        let (snapshot, list_latency) = {
            let state = self.state();
            if state.transactions_endpoint_failing {
                return Err(Self::server_error("list transactions"));
            }
            let snapshot: Vec<CachedTransaction> = state
                .transactions
                .iter()
                .filter(|t| t.user_id == user_id)
                .cloned()
                .collect();
            (snapshot, state.list_latency)
        };
        if let Some(latency) = list_latency {
            tokio::time::sleep(latency).await;
        }
        Ok(snapshot)
    }

    async fn create_transaction(&self, transaction: &NewTransaction) -> Result<CachedTransaction> {
        self.state().calls.create_transaction += 1;
        self.enter().await?;
        let started = Instant::now();
        let create_latency = self.state().create_latency;
        if let Some(latency) = create_latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state();
        state.create_timings.push(CreateTiming {
            description: transaction.description.clone(),
            started,
            finished: Instant::now(),
        });
        if let Some(ref description) = transaction.description {
            if state.failing_descriptions.contains(description) {
                return Err(Self::server_error("create transaction"));
            }
        }
        state.next_id += 1;
        let created = CachedTransaction {
            id: Some(state.next_id),
            user_id: transaction.user_id,
            kind: transaction.kind,
            amount: transaction.amount,
            description: transaction.description.clone(),
            category: transaction.category.clone(),
            date: transaction.date.clone(),
        };
        state.transactions.push(created.clone());
        state.created_transactions.push(transaction.clone());
        Ok(created)
    }

    async fn update_transaction(
        &self,
        id: i64,
        transaction: &NewTransaction,
    ) -> Result<CachedTransaction> {
        self.enter().await?;
        let mut state = self.state();
        let existing = state
            .transactions
            .iter_mut()
            .find(|t| t.id == Some(id))
            .ok_or_else(|| ApiError::NotFound(format!("transaction {}", id)))?;
        existing.kind = transaction.kind;
        existing.amount = transaction.amount;
        existing.description = transaction.description.clone();
        existing.category = transaction.category.clone();
        existing.date = transaction.date.clone();
        Ok(existing.clone())
    }

    async fn delete_transaction(&self, id: i64) -> Result<()> {
        self.enter().await?;
        let mut state = self.state();
        let before = state.transactions.len();
        state.transactions.retain(|t| t.id != Some(id));
        if state.transactions.len() == before {
            return Err(ApiError::NotFound(format!("transaction {}", id)).into());
        }
        Ok(())
    }

    async fn summary(&self, user_id: i64) -> Result<FinancialSummary> {
        self.state().calls.summary += 1;
        self.enter().await?;
        let state = self.state();
        if state.transactions_endpoint_failing {
            return Err(Self::server_error("summary"));
        }
        Ok(FinancialSummary::from_transactions(
            state.transactions.iter().filter(|t| t.user_id == user_id),
        ))
    }
}
