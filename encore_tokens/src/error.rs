use thiserror::Error;

use crate::{authorize::AuthorizationError, cache::CacheError, endpoint::TokenRequestError};

/// An error while acquiring a token
///
/// No error is retried. A cache miss is never surfaced through this type by
/// the broker; it starts an authorization flow instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The token endpoint request failed
    #[error(transparent)]
    TokenRequest(#[from] TokenRequestError),
    /// The user-delegated authorization flow failed
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    /// The token cache could not be read or written
    #[error(transparent)]
    Cache(#[from] CacheError),
}
