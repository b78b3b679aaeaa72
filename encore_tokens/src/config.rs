//! Provider endpoints and per-application configuration

use url::Url;

use crate::{endpoint::dto::ClientCredentials, AuthState, AuthStateRef};

/// The accounts service authorization endpoint
pub const AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";

/// The accounts service token endpoint
pub const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// The base of the Web API, for requests made with an acquired token
pub const API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Everything the broker needs to know about the registered application
#[derive(Clone, Debug)]
pub struct ClientConfig {
    credentials: ClientCredentials,
    redirect_uri: Url,
    state: AuthState,
    show_dialog: bool,
}

impl ClientConfig {
    /// Constructs a configuration for an application
    ///
    /// The anti-forgery state is random when the `rand` feature is enabled
    /// and `"0"` otherwise; override it with [`with_state`][Self::with_state].
    pub fn new(credentials: ClientCredentials, redirect_uri: Url) -> Self {
        Self {
            credentials,
            redirect_uri,
            state: default_state(),
            show_dialog: false,
        }
    }

    /// Uses a caller-supplied anti-forgery state
    pub fn with_state(mut self, state: AuthState) -> Self {
        self.state = state;
        self
    }

    /// Forces the consent dialog even if the user already approved the app
    pub fn with_show_dialog(mut self, show_dialog: bool) -> Self {
        self.show_dialog = show_dialog;
        self
    }

    /// The application's credentials
    #[inline]
    pub fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    /// Where the accounts service sends the browser after authorization
    #[inline]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// The anti-forgery state sent with authorization requests
    #[inline]
    pub fn state(&self) -> &AuthStateRef {
        &self.state
    }

    /// Whether the consent dialog is always shown
    #[inline]
    pub fn show_dialog(&self) -> bool {
        self.show_dialog
    }
}

#[cfg(feature = "rand")]
fn default_state() -> AuthState {
    AuthState::random()
}

#[cfg(not(feature = "rand"))]
fn default_state() -> AuthState {
    AuthState::from_static("0")
}
