//! Session management for the authenticated user.
//!
//! This module provides:
//! - `SessionContext`: the logged-in user, passed explicitly to operations
//! - `Session`: persistence of the context between runs
//!
//! Login itself is delegated to the backend; passwords are never stored.

pub mod session;

pub use session::{Session, SessionContext};
