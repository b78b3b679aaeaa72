//! Cached, self-refreshing OAuth2 credentials for the Spotify Web API
//!
//! This crate keeps track of access tokens for the Spotify accounts service
//! so that calls to the Web API never go out with an expired credential.
//! Tokens are kept in a durable cache keyed by the local identity they were
//! issued for and the scopes they grant. When a cached token has expired it
//! is exchanged through its refresh token; when there is none at all, a full
//! authorization flow is run.
//!
//! Two flows are supported:
//!
//! * _Authorization code_, for a named user. The user is sent to an
//!   authorization URL through an [`Operator`][operator::Operator] and the
//!   URL their browser is redirected to is handed back. The anti-forgery
//!   `state` on that redirect must match the one that was sent.
//! * _Client credentials_, for the empty identity. These app-only tokens
//!   carry no refresh token and are never cached; they are simply reissued.
//!
//! Everything is synchronous. Nothing refreshes in the background and nothing
//! is retried.
//!
//! ```no_run
//! use encore_tokens::{
//!     cache::FileTokenCache, config::ClientConfig, endpoint::dto::ClientCredentials,
//!     endpoint::HttpTokenEndpoint, operator::ConsoleOperator, scope::{well_known, Scopes},
//!     Client, ClientId, ClientSecret, Identity, TokenBroker,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new(
//!     ClientCredentials {
//!         client_id: ClientId::from_static("my-client-id"),
//!         client_secret: ClientSecret::from_static("my-client-secret"),
//!     },
//!     url::Url::parse("http://127.0.0.1:8888/callback")?,
//! );
//!
//! let broker = TokenBroker::new(
//!     config,
//!     FileTokenCache::load(".")?,
//!     HttpTokenEndpoint::new(reqwest::blocking::Client::new()),
//!     ConsoleOperator::stdio(),
//! );
//!
//! let mut client = Client::connect(
//!     broker,
//!     Identity::from_static("someone@example.com"),
//!     Scopes::single(well_known::PLAYLIST_READ_PRIVATE),
//! )?;
//!
//! let header = client.current_token()?.bearer_header();
//! # drop(header);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! * `http` (default): Provides [`HttpTokenEndpoint`][endpoint::HttpTokenEndpoint],
//!   built on `reqwest`'s blocking client.
//! * `rand` (default): Random anti-forgery state values.
//! * `rustls-tls` (default) / `default-tls`: Selects the TLS stack `reqwest`
//!   uses to reach the accounts service.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

pub mod authorize;
mod braids;
pub mod broker;
pub mod cache;
mod client;
pub mod config;
pub mod endpoint;
mod error;
pub mod operator;
pub mod scope;
mod tokens;

pub use braids::*;
pub use broker::TokenBroker;
pub use client::Client;
pub use error::Error;
pub use tokens::{Token, TokenRecord};
