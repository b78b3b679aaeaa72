//! Building authorization requests and reading the redirect that answers them

use std::{collections::HashMap, io};

use thiserror::Error;
use url::Url;

use crate::{
    config::{ClientConfig, AUTHORIZE_URL},
    scope::Scopes,
    AuthState, AuthStateRef, AuthorizationCode,
};

/// An error in the user-delegated authorization flow
#[derive(Debug, Error)]
pub enum AuthorizationError {
    /// The redirect carried a different anti-forgery state than was sent
    ///
    /// The redirect may have been forged, so no token is requested.
    #[error("incorrect state, expected `{expected}` but received `{received}`")]
    StateMismatch {
        /// The state sent with the authorization request
        expected: AuthState,
        /// The state found on the redirect
        received: AuthState,
    },
    /// The user declined, or the accounts service refused the request
    #[error("authorization was denied: {error}")]
    Denied {
        /// The `error` parameter from the redirect
        error: String,
    },
    /// The redirect lacked a required query parameter
    #[error("redirect url has no `{name}` parameter")]
    MissingParameter {
        /// Name of the missing parameter
        name: &'static str,
    },
    /// A URL could not be parsed
    #[error("malformed url")]
    MalformedUrl(#[from] url::ParseError),
    /// The operator could not be reached
    #[error("unable to obtain the redirect url from the operator")]
    Operator(#[source] io::Error),
}

/// Builds the URL the user must visit to grant `scopes`
pub fn authorization_url(
    config: &ClientConfig,
    scopes: &Scopes,
) -> Result<Url, AuthorizationError> {
    let mut url = Url::parse(AUTHORIZE_URL)?;
    url.query_pairs_mut()
        .append_pair("client_id", config.credentials().client_id.as_str())
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", config.redirect_uri().as_str())
        .append_pair("state", config.state().as_str())
        .append_pair("scope", &scopes.to_string())
        .append_pair("show_dialog", if config.show_dialog() { "true" } else { "false" });
    Ok(url)
}

/// Extracts the authorization code from the URL the browser was sent back to
///
/// The `state` parameter is checked before anything else.
pub fn parse_redirect(
    expected: &AuthStateRef,
    redirect_url: &str,
) -> Result<AuthorizationCode, AuthorizationError> {
    let url = Url::parse(redirect_url.trim())?;
    let mut params: HashMap<String, String> = url.query_pairs().into_owned().collect();

    let received = params
        .remove("state")
        .ok_or(AuthorizationError::MissingParameter { name: "state" })?;
    if received != expected.as_str() {
        return Err(AuthorizationError::StateMismatch {
            expected: expected.to_owned(),
            received: AuthState::from(received),
        });
    }

    if let Some(error) = params.remove("error") {
        return Err(AuthorizationError::Denied { error });
    }

    params
        .remove("code")
        .map(AuthorizationCode::from)
        .ok_or(AuthorizationError::MissingParameter { name: "code" })
}
