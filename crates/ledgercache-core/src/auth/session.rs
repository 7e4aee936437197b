use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::KeyValueStore;
use crate::models::{CachedUser, RemoteUser};

/// Store key holding the persisted session
const SESSION_KEY: &str = "session";

/// The authenticated user for the current app session.
///
/// Created at login or registration and handed explicitly to every
/// operation that acts on behalf of the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user: CachedUser,
    pub started_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(user: CachedUser) -> Self {
        Self {
            user,
            started_at: Utc::now(),
        }
    }

    pub fn from_remote(user: &RemoteUser) -> Self {
        Self::new(user.to_cached())
    }

    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    pub fn username(&self) -> String {
        self.user.display_name()
    }
}

/// Persists the current [`SessionContext`] between runs.
pub struct Session {
    store: Arc<dyn KeyValueStore>,
    pub data: Option<SessionContext>,
}

impl Session {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store, data: None }
    }

    /// Load session from the store
    pub fn load(&mut self) -> Result<bool> {
        match self.store.get(SESSION_KEY)? {
            Some(contents) => {
                let data: SessionContext =
                    serde_json::from_str(&contents).context("Failed to parse session")?;
                self.data = Some(data);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Save session to the store
    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let contents = serde_json::to_string_pretty(data)?;
            self.store.set(SESSION_KEY, &contents)?;
        }
        Ok(())
    }

    /// Start a new session and persist it
    pub fn begin(&mut self, context: SessionContext) -> Result<()> {
        self.data = Some(context);
        self.save()
    }

    /// Clear session data (logout)
    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        self.store.remove(SESSION_KEY)
    }

    pub fn context(&self) -> Option<&SessionContext> {
        self.data.as_ref()
    }
}
