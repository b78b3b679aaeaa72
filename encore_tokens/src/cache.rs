//! Durable storage for issued tokens
//!
//! Tokens are keyed by the identity they were issued for together with the
//! canonical form of their granted scopes, so one identity may hold several
//! tokens with different permission grants at once.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::{scope::Scopes, IdentityRef, Token};

pub mod file;
pub mod in_memory;

pub use file::FileTokenCache;
pub use in_memory::InMemoryTokenCache;

/// Builds the cache key for an identity and scope set
///
/// The key has the form `{identity}:{scopes}`.
pub fn cache_key(identity: &IdentityRef, scopes: &Scopes) -> String {
    format!("{}:{}", identity.as_str(), scopes)
}

/// A store of previously issued tokens
///
/// Implementations are not synchronized; a cache must have a single writer.
pub trait TokenCache {
    /// Retrieves the token stored under exactly this identity and scope set
    fn get(&self, identity: &IdentityRef, scopes: &Scopes) -> Result<Token, CacheError>;

    /// Checks for a token under this identity and scope set
    fn contains(&self, identity: &IdentityRef, scopes: &Scopes) -> bool;

    /// Stores a token under its own identity and scopes, replacing any
    /// previous entry
    fn put(&mut self, token: &Token) -> Result<(), CacheError>;
}

impl<T: TokenCache + ?Sized> TokenCache for Box<T> {
    #[inline]
    fn get(&self, identity: &IdentityRef, scopes: &Scopes) -> Result<Token, CacheError> {
        (**self).get(identity, scopes)
    }

    #[inline]
    fn contains(&self, identity: &IdentityRef, scopes: &Scopes) -> bool {
        (**self).contains(identity, scopes)
    }

    #[inline]
    fn put(&mut self, token: &Token) -> Result<(), CacheError> {
        (**self).put(token)
    }
}

/// An error while reading from or writing to a token cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// No token is stored under the requested key
    #[error("no cached token under key `{key}`")]
    NotFound {
        /// The key that was looked up
        key: String,
    },
    /// The backing file could not be read or written
    #[error("unable to access token cache at {}", path.display())]
    Io {
        /// Location of the cache file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
    /// The backing file exists but does not hold a valid cache
    ///
    /// The file must be removed by hand before the cache can be used again.
    #[error("token cache at {} is malformed", path.display())]
    Decode {
        /// Location of the cache file
        path: PathBuf,
        /// The underlying parse error
        #[source]
        source: serde_json::Error,
    },
    /// The cache contents could not be encoded
    #[error("unable to encode token cache")]
    Encode(#[source] serde_json::Error),
}

impl CacheError {
    /// Whether this error is a plain cache miss
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
