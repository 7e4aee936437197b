//! REST API client module for the finance tracker backend.
//!
//! `FinanceApi` is the seam the sync service talks to; `ApiClient` is its
//! HTTP implementation covering users, login and transactions.

pub mod client;
pub mod error;
pub mod finance;

pub use client::ApiClient;
pub use error::ApiError;
pub use finance::FinanceApi;
