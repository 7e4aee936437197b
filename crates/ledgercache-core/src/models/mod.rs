//! Data models for finance tracker entities.
//!
//! - `CachedUser`, `RemoteUser`, `NewUser`, `UserUpdate`: user records
//! - `CachedTransaction`, `NewTransaction`: income/expense records
//! - `FinancialSummary`: dashboard totals

pub mod transaction;
pub mod user;

pub use transaction::{
    normalize_utc_date, CachedTransaction, FinancialSummary, NewTransaction, TransactionType,
};
pub use user::{CachedUser, NewUser, RemoteUser, UserUpdate};
