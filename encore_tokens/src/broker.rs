//! Deciding between cached, refreshed and newly authorized tokens

use encore_clock::{Clock, System};
use url::Url;

use crate::{
    authorize::{self, AuthorizationError},
    cache::TokenCache,
    config::ClientConfig,
    endpoint::{dto::Grant, TokenEndpoint},
    operator::Operator,
    scope::Scopes,
    Error, Identity, IdentityRef, RefreshTokenRef, Token,
};

/// Turns an (identity, scopes) request into a valid token
///
/// For a user identity the broker first consults the cache, refreshes an
/// expired hit, and otherwise runs the authorization code flow through the
/// [`Operator`]. For the empty (app-only) identity the cache is skipped and
/// the client credentials flow runs every time. New user tokens are written
/// back to the cache.
///
/// The broker is not synchronized. Concurrent use against the same cache
/// needs an external lock, or duplicate refreshes will race to rewrite it.
#[derive(Debug)]
pub struct TokenBroker<K, E, O, C = System> {
    config: ClientConfig,
    cache: K,
    endpoint: E,
    operator: O,
    clock: C,
}

impl<K, E, O> TokenBroker<K, E, O, System> {
    /// Constructs a broker using the system clock
    pub fn new(config: ClientConfig, cache: K, endpoint: E, operator: O) -> Self {
        Self {
            config,
            cache,
            endpoint,
            operator,
            clock: System,
        }
    }
}

impl<K, E, O, C> TokenBroker<K, E, O, C> {
    /// Sets a custom clock to be used
    ///
    /// Useful for testing purposes
    pub fn with_clock<D>(self, clock: D) -> TokenBroker<K, E, O, D> {
        TokenBroker {
            config: self.config,
            cache: self.cache,
            endpoint: self.endpoint,
            operator: self.operator,
            clock,
        }
    }

    /// The application configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The token cache
    pub fn cache(&self) -> &K {
        &self.cache
    }

    /// The clock used for expiry decisions
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Mutable access to the clock
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// The URL a user must visit to grant `scopes`
    pub fn authorization_url(&self, scopes: &Scopes) -> Result<Url, AuthorizationError> {
        authorize::authorization_url(&self.config, scopes)
    }
}

impl<K, E, O, C> TokenBroker<K, E, O, C>
where
    K: TokenCache,
    E: TokenEndpoint,
    O: Operator,
    C: Clock,
{
    /// Acquires a valid token for `identity` with `scopes`
    #[tracing::instrument(skip_all, fields(identity = %identity.as_str(), scopes = %scopes))]
    pub fn acquire_token(
        &mut self,
        identity: &IdentityRef,
        scopes: &Scopes,
    ) -> Result<Token, Error> {
        if identity.is_app_only() {
            tracing::debug!("app-only identity, skipping cache");
            return self.authorize_app(scopes);
        }

        if self.cache.contains(identity, scopes) {
            let cached = self.cache.get(identity, scopes)?;
            if !cached.is_expired_with_clock(&self.clock) {
                tracing::debug!(expiry = cached.expiry().0, "using cached token");
                return Ok(cached);
            }

            tracing::debug!(expiry = cached.expiry().0, "cached token has expired");
            return self.refresh(&cached);
        }

        tracing::debug!("no cached token, authorizing user");
        let token = self.authorize_user(identity, scopes)?;
        self.store(&token, scopes)?;
        Ok(token)
    }

    /// Obtains a replacement for `token`
    ///
    /// User tokens are exchanged through their refresh token and the result
    /// is cached. App-only tokens are simply reissued and never cached.
    #[tracing::instrument(
        skip_all,
        fields(identity = %token.identity().as_str(), scopes = %token.scopes())
    )]
    pub fn refresh(&mut self, token: &Token) -> Result<Token, Error> {
        let identity = token.identity();
        if identity.is_app_only() {
            return self.authorize_app(token.scopes());
        }

        let refreshed = match token.refresh_token() {
            Some(refresh_token) => {
                let grant = Grant::RefreshToken {
                    refresh_token: refresh_token.to_owned(),
                };
                self.exchange(identity, &grant, token.scopes(), Some(refresh_token))?
            }
            None => {
                tracing::warn!("token has no refresh token, authorizing user again");
                self.authorize_user(identity, token.scopes())?
            }
        };

        self.store(&refreshed, token.scopes())?;
        Ok(refreshed)
    }

    /// Runs the authorization code flow for `identity`
    ///
    /// Blocks until the operator returns the redirect URL. The result is not
    /// cached.
    pub fn authorize_user(
        &mut self,
        identity: &IdentityRef,
        scopes: &Scopes,
    ) -> Result<Token, Error> {
        let url = self.authorization_url(scopes)?;

        tracing::info!(%url, "waiting for user authorization");
        let redirect = self
            .operator
            .obtain_redirect_url(&url)
            .map_err(AuthorizationError::Operator)?;

        let code = authorize::parse_redirect(self.config.state(), &redirect)?;
        let grant = Grant::AuthorizationCode {
            code,
            redirect_uri: self.config.redirect_uri().to_string(),
        };

        self.exchange(identity, &grant, scopes, None)
    }

    /// Runs the client credentials flow
    pub fn authorize_app(&mut self, scopes: &Scopes) -> Result<Token, Error> {
        self.exchange(&Identity::from_static(""), &Grant::ClientCredentials, scopes, None)
    }

    fn exchange(
        &self,
        identity: &IdentityRef,
        grant: &Grant,
        requested: &Scopes,
        previous_refresh: Option<&RefreshTokenRef>,
    ) -> Result<Token, Error> {
        let resp = self.endpoint.exchange(self.config.credentials(), grant)?;
        Ok(resp.into_token(identity.to_owned(), requested, previous_refresh, &self.clock))
    }

    fn store(&mut self, token: &Token, requested: &Scopes) -> Result<(), Error> {
        if token.scopes() != requested {
            tracing::warn!(
                requested = %requested,
                granted = %token.scopes(),
                "granted scopes differ from the request, token is cached under the granted scopes"
            );
        }
        self.cache.put(token)?;
        Ok(())
    }
}
