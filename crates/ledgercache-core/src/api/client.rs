//! HTTP client for the finance tracker REST API.
//!
//! This module provides the `ApiClient` struct, the `reqwest` implementation
//! of [`FinanceApi`].

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::models::{
    CachedTransaction, FinancialSummary, NewTransaction, NewUser, RemoteUser, UserUpdate,
};

use super::{ApiError, FinanceApi};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// API client for the finance tracker backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client for the backend at `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid API base URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API base URL cannot be used as a base: {}", base_url);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                anyhow::anyhow!("API base URL cannot be used as a base: {}", self.base_url)
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Send a request, retrying with exponential backoff while rate limited.
    async fn execute<F>(&self, url: &Url, build: F) -> Result<reqwest::Response>
    where
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build(&self.client)
                .send()
                .await
                .map_err(ApiError::from)
                .with_context(|| format!("Failed to send request to {}", url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(
                        url = %url,
                        retry = retries,
                        backoff_ms = backoff_ms,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.execute(&url, |c| c.get(url.clone())).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T> {
        let response = self.execute(&url, |c| c.post(url.clone()).json(body)).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    async fn put<T: DeserializeOwned, B: Serialize + Sync>(&self, url: Url, body: &B) -> Result<T> {
        let response = self.execute(&url, |c| c.put(url.clone()).json(body)).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }
}

#[async_trait]
impl FinanceApi for ApiClient {
    async fn probe(&self) -> Result<()> {
        // No GET mapping exists at this path, so 405 is the usual answer.
        let url = self.endpoint(&["api", "transactions"])?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Backend unreachable at {}", url))?;
        debug!(status = %response.status(), "Backend answered reachability probe");
        Ok(())
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<RemoteUser> {
        let url = self.endpoint(&["api", "auth", "login"])?;
        self.post(url, &LoginRequest { username, password })
            .await
            .context("Login request failed")
    }

    async fn list_users(&self) -> Result<Vec<RemoteUser>> {
        let url = self.endpoint(&["api", "users"])?;
        self.get(url).await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<RemoteUser>> {
        let url = self.endpoint(&["api", "users", "username", username])?;
        match self.get(url).await {
            Ok(user) => Ok(Some(user)),
            Err(e) if ApiError::is_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_user(&self, user: &NewUser) -> Result<RemoteUser> {
        let url = self.endpoint(&["api", "users"])?;
        self.post(url, user).await
    }

    async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<RemoteUser> {
        let url = self.endpoint(&["api", "users", &id.to_string()])?;
        self.put(url, update).await
    }

    async fn list_transactions(&self, user_id: i64) -> Result<Vec<CachedTransaction>> {
        let url = self.endpoint(&["api", "transactions", "user", &user_id.to_string()])?;
        self.get(url).await
    }

    async fn create_transaction(&self, transaction: &NewTransaction) -> Result<CachedTransaction> {
        let url = self.endpoint(&["api", "transactions"])?;
        self.post(url, transaction).await
    }

    async fn update_transaction(
        &self,
        id: i64,
        transaction: &NewTransaction,
    ) -> Result<CachedTransaction> {
        let url = self.endpoint(&["api", "transactions", &id.to_string()])?;
        self.put(url, transaction).await
    }

    async fn delete_transaction(&self, id: i64) -> Result<()> {
        let url = self.endpoint(&["api", "transactions", &id.to_string()])?;
        self.execute(&url, |c| c.delete(url.clone())).await?;
        Ok(())
    }

    async fn summary(&self, user_id: i64) -> Result<FinancialSummary> {
        let url = self.endpoint(&["api", "transactions", "user", &user_id.to_string(), "summary"])?;
        self.get(url).await
    }
}

// ============================================================================
// Tests
// ============================================================================
