//! Platform integration layer for the OrgNav client core.
//!
//! Builds on `orgnav-common` (auth lifecycle, scoped cache, tenant
//! identity) and adds the outward-facing Salesforce API surface: the
//! resilient query connection and the typed catalog fetches the command
//! list is resolved from.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod salesforce;

pub use salesforce::{ApiVersion, Connection, ConnectionError};
