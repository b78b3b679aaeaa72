//! DTOs for talking to the accounts service token endpoint

use encore_clock::{Clock, DurationSecs};
use serde::{Deserialize, Serialize};

use crate::{
    scope::Scopes, AccessToken, AuthorizationCode, ClientId, ClientSecret, Identity,
    RefreshToken, RefreshTokenRef, Token,
};

/// Client credentials
///
/// These authenticate the application itself, never the user.
#[derive(Clone, Debug)]
pub struct ClientCredentials {
    /// The client ID
    pub client_id: ClientId,

    /// The client secret
    pub client_secret: ClientSecret,
}

/// The grant presented to the token endpoint, sent as form data
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "grant_type", rename_all = "snake_case")]
pub enum Grant {
    /// Exchange an authorization code returned on the redirect
    AuthorizationCode {
        /// The code from the redirect
        code: AuthorizationCode,
        /// The redirect URI used in the authorization request
        redirect_uri: String,
    },
    /// Exchange a refresh token for a new access token
    RefreshToken {
        /// The refresh token
        refresh_token: RefreshToken,
    },
    /// Obtain an app-only token
    ClientCredentials,
}

impl Grant {
    /// The value of the `grant_type` form field
    pub fn grant_type(&self) -> &'static str {
        match self {
            Self::AuthorizationCode { .. } => "authorization_code",
            Self::RefreshToken { .. } => "refresh_token",
            Self::ClientCredentials => "client_credentials",
        }
    }
}

/// A successful token endpoint response
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenResponse {
    /// The access token
    pub access_token: AccessToken,
    /// The token type, always `Bearer` in practice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// The granted scopes, absent for app-only tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scopes>,
    /// Lifetime in seconds
    pub expires_in: DurationSecs,
    /// A new refresh token, if the authority rotated it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<RefreshToken>,
}

impl TokenResponse {
    /// Projects the response into a token held for `identity`
    ///
    /// The `requested` scopes stand in when the authority does not report the
    /// granted scopes, and `previous_refresh` is kept when it does not rotate
    /// the refresh token.
    pub fn into_token<C: Clock>(
        self,
        identity: Identity,
        requested: &Scopes,
        previous_refresh: Option<&RefreshTokenRef>,
        clock: &C,
    ) -> Token {
        let refresh_token = self
            .refresh_token
            .or_else(|| previous_refresh.map(ToOwned::to_owned));

        Token::new_with_clock(
            identity,
            self.access_token,
            refresh_token,
            self.scope.unwrap_or_else(|| requested.clone()),
            self.expires_in,
            None,
            clock,
        )
    }
}
