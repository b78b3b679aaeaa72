use std::fmt;

use encore_clock::{Clock, DurationSecs, System, UnixTime};
use serde::{Deserialize, Serialize};

use crate::{
    scope::Scopes, AccessToken, AccessTokenRef, Identity, IdentityRef, RefreshToken,
    RefreshTokenRef,
};

/// An access token held for a local identity, with its validity window
///
/// Tokens are immutable. Refreshing a token yields a new `Token`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    identity: Identity,
    access_token: AccessToken,
    refresh_token: Option<RefreshToken>,
    scopes: Scopes,
    lifetime: DurationSecs,
    issued: UnixTime,
}

impl Token {
    /// Constructs a token, using the system clock when `issued` is unknown
    ///
    /// An `issued` time of `None` or zero means the token was obtained just now.
    pub fn new(
        identity: Identity,
        access_token: AccessToken,
        refresh_token: Option<RefreshToken>,
        scopes: Scopes,
        lifetime: DurationSecs,
        issued: Option<UnixTime>,
    ) -> Self {
        Self::new_with_clock(
            identity,
            access_token,
            refresh_token,
            scopes,
            lifetime,
            issued,
            &System,
        )
    }

    /// Constructs a token, asking `clock` for the time when `issued` is unknown
    pub fn new_with_clock<C: Clock>(
        identity: Identity,
        access_token: AccessToken,
        refresh_token: Option<RefreshToken>,
        scopes: Scopes,
        lifetime: DurationSecs,
        issued: Option<UnixTime>,
        clock: &C,
    ) -> Self {
        let issued = issued
            .filter(|t| !t.is_zero())
            .unwrap_or_else(|| clock.now());

        Self {
            identity,
            access_token,
            refresh_token: refresh_token.filter(|rt| !rt.as_str().is_empty()),
            scopes,
            lifetime,
            issued,
        }
    }

    /// Re-tags the token with a different local identity
    #[must_use]
    pub fn with_identity(self, identity: Identity) -> Self {
        Self { identity, ..self }
    }

    /// Gets the identity the token is held for
    #[inline]
    pub fn identity(&self) -> &IdentityRef {
        &self.identity
    }

    /// Gets the access token
    #[inline]
    pub fn access_token(&self) -> &AccessTokenRef {
        &self.access_token
    }

    /// Gets the refresh token, if the authority issued one
    #[inline]
    pub fn refresh_token(&self) -> Option<&RefreshTokenRef> {
        self.refresh_token.as_deref()
    }

    /// Gets the scopes granted to the token
    #[inline]
    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    /// Gets the token's lifetime
    #[inline]
    pub fn lifetime(&self) -> DurationSecs {
        self.lifetime
    }

    /// Gets the time that the token was issued
    #[inline]
    pub fn issued(&self) -> UnixTime {
        self.issued
    }

    /// Gets the time that the token will expire
    #[inline]
    pub fn expiry(&self) -> UnixTime {
        self.issued + self.lifetime
    }

    /// Gets the interval during which the token is valid
    #[inline]
    pub fn valid_interval(&self) -> std::ops::Range<UnixTime> {
        self.issued..self.expiry()
    }

    /// Whether the token has expired
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_with_clock(&System)
    }

    /// Whether the token has expired according to the provided clock
    #[inline]
    pub fn is_expired_with_clock<C: Clock>(&self, clock: &C) -> bool {
        self.is_expired_at(clock.now())
    }

    /// Whether the token is expired as of the provided time
    ///
    /// A token is already expired at the instant of its expiry.
    #[inline]
    pub fn is_expired_at(&self, time: UnixTime) -> bool {
        time >= self.expiry()
    }

    /// Gets a duration for how much longer the token would be valid as of the
    /// provided time
    #[inline]
    pub fn until_expired_at(&self, time: UnixTime) -> DurationSecs {
        self.expiry() - time
    }

    /// Value for an `Authorization` header on Web API requests
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.access_token.as_str())
    }

    /// Converts the token into its persisted form
    pub fn to_record(&self) -> TokenRecord {
        TokenRecord {
            user_email: self.identity.clone(),
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            scope: self.scopes.clone(),
            expires_in: self.lifetime,
            time_obtained: Some(self.issued),
        }
    }

    /// Restores a token from its persisted form
    pub fn from_record(record: TokenRecord) -> Self {
        Self::from_record_with_clock(record, &System)
    }

    /// Restores a token from its persisted form, using `clock` if the record
    /// does not say when the token was obtained
    pub fn from_record_with_clock<C: Clock>(record: TokenRecord, clock: &C) -> Self {
        if record.time_obtained.map_or(true, UnixTime::is_zero) {
            tracing::warn!(
                identity = %record.user_email,
                scope = %record.scope,
                "token record has no time_obtained, treating it as issued now"
            );
        }

        Self::new_with_clock(
            record.user_email,
            record.access_token,
            record.refresh_token,
            record.scope,
            record.expires_in,
            record.time_obtained,
            clock,
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Token({}, expired={})", self.scopes, self.is_expired())
    }
}

/// A token as stored in the token cache
///
/// Field names follow the cache file format. An absent refresh token is
/// written as an empty string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// The local identity
    pub user_email: Identity,
    /// The access token
    pub access_token: AccessToken,
    /// The refresh token, if any
    #[serde(default, with = "empty_as_none")]
    pub refresh_token: Option<RefreshToken>,
    /// The granted scopes
    pub scope: Scopes,
    /// Lifetime in seconds
    pub expires_in: DurationSecs,
    /// When the token was issued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_obtained: Option<UnixTime>,
}

mod empty_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::RefreshToken;

    pub fn serialize<S: Serializer>(
        value: &Option<RefreshToken>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_ref().map_or("", |rt| rt.as_str()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<RefreshToken>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.filter(|s| !s.is_empty()).map(RefreshToken::from))
    }
}

#[cfg(test)]
mod tests {
    use encore_clock::TestClock;

    use super::*;
    use crate::scope::well_known::PLAYLIST_READ_PRIVATE;

    const T: UnixTime = UnixTime(1_700_000_000);
    const L: DurationSecs = DurationSecs(3600);

    fn token(refresh: Option<&'static str>, issued: Option<UnixTime>) -> Token {
        Token::new_with_clock(
            Identity::from_static("a@b.com"),
            AccessToken::from_static("access"),
            refresh.map(RefreshToken::from_static),
            Scopes::single(PLAYLIST_READ_PRIVATE),
            L,
            issued,
            &TestClock::new(T),
        )
    }

    #[test]
    fn expiry_boundary_counts_as_expired() {
        let token = token(Some("refresh"), Some(T));
        assert_eq!(token.expiry(), UnixTime(T.0 + L.0));
        assert!(!token.is_expired_at(UnixTime(T.0 + L.0 - 1)));
        assert!(token.is_expired_at(UnixTime(T.0 + L.0)));
        assert!(token.is_expired_at(UnixTime(T.0 + L.0 + 1)));
    }

    #[test]
    fn expiry_follows_the_clock() {
        let token = token(None, Some(T));
        let mut clock = TestClock::new(T);
        assert!(!token.is_expired_with_clock(&clock));
        clock.inc(L.0);
        assert!(token.is_expired_with_clock(&clock));
        assert_eq!(token.until_expired_at(clock.now()), DurationSecs(0));
    }

    #[test]
    fn missing_issue_time_means_now() {
        assert_eq!(token(None, None).issued(), T);
        assert_eq!(token(None, Some(UnixTime(0))).issued(), T);
    }

    #[test]
    fn record_round_trip() {
        let original = token(Some("refresh"), Some(UnixTime(1_000)));
        let restored = Token::from_record(original.to_record());
        assert_eq!(restored, original);
    }

    #[test]
    fn record_round_trip_without_refresh_token() {
        let original = token(None, Some(UnixTime(1_000)));
        let record = original.to_record();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["refresh_token"], "");

        let restored = Token::from_record(serde_json::from_value(json).unwrap());
        assert_eq!(restored.refresh_token(), None);
        assert_eq!(restored, original);
    }

    #[test]
    fn record_without_issue_time_is_reissued_now() {
        let original = token(Some("refresh"), Some(UnixTime(1_000)));
        let mut record = original.to_record();
        record.time_obtained = None;

        let later = TestClock::new(UnixTime(2_000));
        let restored = Token::from_record_with_clock(record, &later);
        assert_eq!(restored.issued(), UnixTime(2_000));
        assert_ne!(restored.issued(), original.issued());
        assert_eq!(restored.access_token(), original.access_token());
    }

    #[test]
    fn record_tolerates_missing_fields() {
        let record: TokenRecord = serde_json::from_str(
            r#"{"user_email":"a@b.com","access_token":"abc","scope":"playlist-read-private","expires_in":3600}"#,
        )
        .unwrap();

        assert_eq!(record.refresh_token, None);
        assert_eq!(record.time_obtained, None);
        assert_eq!(record.scope, Scopes::single(PLAYLIST_READ_PRIVATE));
    }

    #[test]
    fn record_requires_scope() {
        let err = serde_json::from_str::<TokenRecord>(
            r#"{"user_email":"a@b.com","access_token":"abc","expires_in":3600}"#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("scope"));
    }

    #[test]
    fn record_uses_cache_field_names() {
        let json = serde_json::to_value(token(Some("r"), Some(UnixTime(5))).to_record()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "user_email": "a@b.com",
                "access_token": "access",
                "refresh_token": "r",
                "scope": "playlist-read-private",
                "expires_in": 3600,
                "time_obtained": 5,
            })
        );
    }

    #[test]
    fn bearer_header_carries_the_access_token() {
        assert_eq!(token(None, Some(T)).bearer_header(), "Bearer access");
    }

    #[test]
    fn display_hides_the_secret() {
        let shown = token(None, Some(UnixTime(1))).to_string();
        assert_eq!(shown, "Token(playlist-read-private, expired=true)");
    }
}
