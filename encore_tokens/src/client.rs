use encore_clock::{Clock, System};

use crate::{
    broker::TokenBroker, cache::TokenCache, endpoint::TokenEndpoint, operator::Operator,
    scope::Scopes, Error, Identity, IdentityRef, Token,
};

/// A token holder for one identity and scope set
///
/// The client acquires its token when it is created and refreshes it lazily
/// whenever [`current_token`][Self::current_token] finds it expired. Taking
/// `&mut self` there keeps a client to a single caller at a time; share one
/// across threads only behind a mutex.
#[derive(Debug)]
pub struct Client<K, E, O, C = System> {
    broker: TokenBroker<K, E, O, C>,
    identity: Identity,
    scopes: Scopes,
    token: Token,
}

impl<K, E, O, C> Client<K, E, O, C>
where
    K: TokenCache,
    E: TokenEndpoint,
    O: Operator,
    C: Clock,
{
    /// Acquires a token for `identity` and `scopes` and holds on to it
    ///
    /// An empty identity yields an app-only client.
    pub fn connect(
        mut broker: TokenBroker<K, E, O, C>,
        identity: Identity,
        scopes: Scopes,
    ) -> Result<Self, Error> {
        let token = broker.acquire_token(&identity, &scopes)?;
        tracing::debug!(%token, "client connected");

        Ok(Self {
            broker,
            identity,
            scopes,
            token,
        })
    }

    /// Returns a valid token, refreshing the held one first if it expired
    pub fn current_token(&mut self) -> Result<&Token, Error> {
        if self.token.is_expired_with_clock(self.broker.clock()) {
            tracing::debug!(expiry = self.token.expiry().0, "held token has expired");
            self.token = self.broker.refresh(&self.token)?;
        }

        Ok(&self.token)
    }
}

impl<K, E, O, C> Client<K, E, O, C> {
    /// The identity the client acts for
    pub fn identity(&self) -> &IdentityRef {
        &self.identity
    }

    /// The scopes the client requested
    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    /// The underlying broker
    pub fn broker(&self) -> &TokenBroker<K, E, O, C> {
        &self.broker
    }

    /// Mutable access to the underlying broker
    pub fn broker_mut(&mut self) -> &mut TokenBroker<K, E, O, C> {
        &mut self.broker
    }
}
