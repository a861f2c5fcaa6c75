//! Salesforce REST / Tooling API access.
//!
//! [`Connection`] wraps an authenticated session against the versioned data
//! endpoints: SOQL queries with transparent pagination and a single
//! refresh-and-retry on authorization failure. [`catalog`] layers the typed
//! Tooling queries the command list is resolved from on top of it.

pub mod catalog;
pub mod connection;
pub mod error;

pub use connection::{ApiVersion, Connection};
pub use error::{ConnectionError, AUTH_REFRESH_FAILED_CODE};
