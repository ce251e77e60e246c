//! # Event Console Library
//!
//! Backend of the platform testing console: proxies console events to the
//! interact and collection ingestion APIs and reads customer profiles,
//! authenticating every outbound call with a client-credentials bearer
//! token that is cached per credential identity.
//!
//! Modules:
//! - `credentials`: per-request credential resolution (overrides over defaults)
//! - `cache`: process-wide token cache with a fixed freshness window
//! - `sources`: credential exchange and the token issuer
//! - `dispatch`: outbound event / profile calls
//! - `server`: HTTP surface consumed by the console
//! - `config`: service configuration

pub mod cache;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod server;
pub mod sources;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::config::service::ServiceConfig;
pub use crate::error::{CredentialExchangeFailure, ProxyError};
pub use crate::sources::issuer::TokenIssuer;
