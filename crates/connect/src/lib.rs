//! `policyfeed-connect`: fetch-only adapters for external data sources.
//!
//! A connector knows one source definition and nothing about the others.
//! Expected failures (network, auth, malformed payloads) never escape
//! [`SourceConnector::fetch`]; they come back as a failed [`FetchReport`]
//! with no rows so one broken source cannot abort the run.
//!
//! [`FetchReport`]: policyfeed_core::FetchReport

pub mod client;
pub mod connector;
pub mod error;
pub mod extract;
pub mod query;
pub mod secrets;

pub use client::{HttpFetcher, RetryPolicy};
pub use connector::{Connector, ConnectorSettings, SourceConnector, SourceFetch};
pub use error::FetchError;
pub use secrets::{EnvSecrets, MapSecrets, SecretStore};
