use std::{cell::RefCell, collections::VecDeque, fs, io};

use encore_clock::{DurationSecs, TestClock, UnixTime};
use encore_tokens::{
    cache::{file::CACHE_FILE_NAME, FileTokenCache, TokenCache},
    config::ClientConfig,
    endpoint::{
        dto::{ClientCredentials, Grant, TokenResponse},
        TokenEndpoint, TokenRequestError,
    },
    scope::{well_known, Scopes},
    AccessToken, AuthState, ClientId, ClientSecret, Identity, RefreshToken, TokenBroker,
};
use url::Url;

const START: UnixTime = UnixTime(1_700_000_000);

#[derive(Default)]
struct ScriptedEndpoint {
    grants: RefCell<Vec<Grant>>,
    script: RefCell<VecDeque<TokenResponse>>,
}

impl ScriptedEndpoint {
    fn then(self, access: &str, refresh: Option<&str>) -> Self {
        self.script.borrow_mut().push_back(TokenResponse {
            access_token: AccessToken::from(access),
            token_type: Some("Bearer".to_owned()),
            scope: Some(Scopes::single(well_known::PLAYLIST_READ_PRIVATE)),
            expires_in: DurationSecs(3600),
            refresh_token: refresh.map(RefreshToken::from),
        });
        self
    }
}

impl TokenEndpoint for ScriptedEndpoint {
    fn exchange(
        &self,
        _: &ClientCredentials,
        grant: &Grant,
    ) -> Result<TokenResponse, TokenRequestError> {
        self.grants.borrow_mut().push(grant.clone());
        Ok(self
            .script
            .borrow_mut()
            .pop_front()
            .expect("no scripted response left"))
    }
}

fn config() -> ClientConfig {
    ClientConfig::new(
        ClientCredentials {
            client_id: ClientId::from_static("client"),
            client_secret: ClientSecret::from_static("secret"),
        },
        Url::parse("http://127.0.0.1:8888/callback").unwrap(),
    )
    .with_state(AuthState::from_static("8341"))
}

#[test]
fn miss_then_hit_then_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let endpoint = ScriptedEndpoint::default()
        .then("first", Some("refresh-1"))
        .then("second", Some("refresh-2"));

    let mut prompts = 0;
    let operator = |url: &Url| -> io::Result<String> {
        prompts += 1;
        assert!(url.as_str().contains("state=8341"));
        assert!(url.as_str().contains("scope=playlist-read-private"));
        Ok("http://127.0.0.1:8888/callback?code=xyz&state=8341".to_owned())
    };

    let mut broker = TokenBroker::new(
        config(),
        FileTokenCache::load(dir.path()).unwrap(),
        &endpoint,
        operator,
    )
    .with_clock(TestClock::new(START));

    let identity = Identity::from_static("a@b.com");
    let scopes = Scopes::single(well_known::PLAYLIST_READ_PRIVATE);

    // 1. empty cache: the user is asked, the code is exchanged, the token is cached
    let first = broker.acquire_token(&identity, &scopes).unwrap();
    assert_eq!(first.access_token().as_str(), "first");
    assert_eq!(
        endpoint.grants.borrow().as_slice(),
        [Grant::AuthorizationCode {
            code: "xyz".into(),
            redirect_uri: "http://127.0.0.1:8888/callback".to_owned(),
        }]
    );

    let raw = fs::read_to_string(dir.path().join(CACHE_FILE_NAME)).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        json["a@b.com:playlist-read-private"]["access_token"],
        "first"
    );

    // 2. before expiry: served from the cache without a request
    broker.clock_mut().inc(3599);
    let again = broker.acquire_token(&identity, &scopes).unwrap();
    assert_eq!(again, first);
    assert_eq!(endpoint.grants.borrow().len(), 1);

    // 3. after expiry: refreshed and overwritten
    broker.clock_mut().inc(1);
    let refreshed = broker.acquire_token(&identity, &scopes).unwrap();
    assert_eq!(refreshed.access_token().as_str(), "second");
    assert_eq!(
        endpoint.grants.borrow()[1],
        Grant::RefreshToken {
            refresh_token: "refresh-1".into()
        }
    );

    let reloaded = FileTokenCache::load(dir.path()).unwrap();
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.get(&identity, &scopes).unwrap(), refreshed);

    drop(broker);
    assert_eq!(prompts, 1);
}

#[test]
fn cache_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let identity = Identity::from_static("a@b.com");
    let scopes = Scopes::single(well_known::PLAYLIST_READ_PRIVATE);

    let endpoint = ScriptedEndpoint::default().then("first", Some("refresh-1"));
    let operator = |_: &Url| -> io::Result<String> {
        Ok("http://127.0.0.1:8888/callback?code=xyz&state=8341".to_owned())
    };
    let mut broker = TokenBroker::new(
        config(),
        FileTokenCache::load(dir.path()).unwrap(),
        &endpoint,
        operator,
    )
    .with_clock(TestClock::new(START));
    let issued = broker.acquire_token(&identity, &scopes).unwrap();

    let idle = ScriptedEndpoint::default();
    let no_prompt =
        |_: &Url| -> io::Result<String> { panic!("a cached token should not need the user") };
    let mut restarted = TokenBroker::new(
        config(),
        FileTokenCache::load(dir.path()).unwrap(),
        &idle,
        no_prompt,
    )
    .with_clock(TestClock::new(UnixTime(START.0 + 60)));

    let token = restarted.acquire_token(&identity, &scopes).unwrap();
    assert_eq!(token, issued);
    assert!(idle.grants.borrow().is_empty());
}

#[test]
fn legacy_record_expires_and_is_refreshed() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join(CACHE_FILE_NAME),
        r#"{
            "a@b.com:playlist-read-private": {
                "user_email": "a@b.com",
                "access_token": "legacy",
                "refresh_token": "legacy-refresh",
                "scope": "playlist-read-private",
                "expires_in": 3600
            }
        }"#,
    )
    .unwrap();

    let endpoint = ScriptedEndpoint::default().then("second", Some("refresh-2"));
    let no_prompt =
        |_: &Url| -> io::Result<String> { panic!("a cached token should not need the user") };
    let mut broker = TokenBroker::new(
        config(),
        FileTokenCache::load_with_clock(dir.path(), &TestClock::new(START)).unwrap(),
        &endpoint,
        no_prompt,
    )
    .with_clock(TestClock::new(START));

    let identity = Identity::from_static("a@b.com");
    let scopes = Scopes::single(well_known::PLAYLIST_READ_PRIVATE);

    broker.clock_mut().inc(3599);
    let cached = broker.acquire_token(&identity, &scopes).unwrap();
    assert_eq!(cached.access_token().as_str(), "legacy");
    assert_eq!(cached.issued(), START);
    assert!(endpoint.grants.borrow().is_empty());

    broker.clock_mut().inc(1);
    let refreshed = broker.acquire_token(&identity, &scopes).unwrap();
    assert_eq!(refreshed.access_token().as_str(), "second");
    assert_eq!(
        endpoint.grants.borrow().as_slice(),
        [Grant::RefreshToken {
            refresh_token: "legacy-refresh".into()
        }]
    );
}
