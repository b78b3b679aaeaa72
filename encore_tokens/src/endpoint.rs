//! The accounts service token endpoint

use thiserror::Error;

pub mod dto;

use dto::{ClientCredentials, Grant, TokenResponse};

/// Something that can exchange a grant for a token
///
/// Implementations authenticate with the client's own credentials. Failures
/// are reported as-is; nothing here retries.
pub trait TokenEndpoint {
    /// Presents `grant` to the token endpoint
    fn exchange(
        &self,
        credentials: &ClientCredentials,
        grant: &Grant,
    ) -> Result<TokenResponse, TokenRequestError>;
}

impl<T: TokenEndpoint + ?Sized> TokenEndpoint for &T {
    #[inline]
    fn exchange(
        &self,
        credentials: &ClientCredentials,
        grant: &Grant,
    ) -> Result<TokenResponse, TokenRequestError> {
        (**self).exchange(credentials, grant)
    }
}

impl<T: TokenEndpoint + ?Sized> TokenEndpoint for Box<T> {
    #[inline]
    fn exchange(
        &self,
        credentials: &ClientCredentials,
        grant: &Grant,
    ) -> Result<TokenResponse, TokenRequestError> {
        (**self).exchange(credentials, grant)
    }
}

/// An error while attempting to request a new token from the authority
#[derive(Debug, Error)]
pub enum TokenRequestError {
    /// The authority answered with a non-success status
    #[error("token endpoint responded {status}: {reason}")]
    Http {
        /// The HTTP status code
        status: u16,
        /// The canonical reason phrase for the status
        reason: String,
        /// The response body, usually an OAuth2 error object
        body: String,
    },
    /// Unable to deserialize the token body
    #[error("error deserializing token body from authority")]
    TokenBody(#[from] serde_json::Error),
    /// Unable to read the response
    #[cfg(feature = "http")]
    #[error("error reading response body")]
    BodyRead(#[source] reqwest::Error),
    /// Unable to send a token request to the authority
    #[cfg(feature = "http")]
    #[error("error sending request to authority")]
    RequestSend(#[source] reqwest::Error),
}

#[cfg(feature = "http")]
pub use http::HttpTokenEndpoint;

#[cfg(feature = "http")]
mod http {
    use super::{ClientCredentials, Grant, TokenEndpoint, TokenRequestError, TokenResponse};
    use crate::config::TOKEN_URL;

    /// The token endpoint reached over HTTPS with a blocking `reqwest` client
    #[derive(Debug, Clone)]
    pub struct HttpTokenEndpoint {
        client: reqwest::blocking::Client,
        token_url: String,
    }

    impl HttpTokenEndpoint {
        /// Constructs an endpoint for the Spotify accounts service
        pub fn new(client: reqwest::blocking::Client) -> Self {
            Self {
                client,
                token_url: TOKEN_URL.to_owned(),
            }
        }

        /// Points the endpoint at a different token URL
        pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
            self.token_url = token_url.into();
            self
        }

        /// The token URL requests are sent to
        pub fn token_url(&self) -> &str {
            &self.token_url
        }
    }

    impl TokenEndpoint for HttpTokenEndpoint {
        #[tracing::instrument(
            err,
            skip(self, credentials, grant),
            fields(
                token_url = %self.token_url,
                grant_type = grant.grant_type(),
                client_id = %credentials.client_id,
            ),
        )]
        fn exchange(
            &self,
            credentials: &ClientCredentials,
            grant: &Grant,
        ) -> Result<TokenResponse, TokenRequestError> {
            tracing::trace!("requesting token from authority");

            let resp = self
                .client
                .post(&self.token_url)
                .basic_auth(
                    credentials.client_id.as_str(),
                    Some(credentials.client_secret.as_str()),
                )
                .form(grant)
                .send()
                .map_err(TokenRequestError::RequestSend)?;

            let status = resp.status();
            tracing::debug!(
                response.status = status.as_u16(),
                "received token response from issuing authority"
            );

            if !status.is_success() {
                let body = resp.text().map_err(TokenRequestError::BodyRead)?;
                return Err(TokenRequestError::Http {
                    status: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or("Unknown").to_owned(),
                    body,
                });
            }

            let body = resp.bytes().map_err(TokenRequestError::BodyRead)?;
            let resp: TokenResponse = serde_json::from_slice(&body)?;

            tracing::info!(
                has_refresh_token = resp.refresh_token.is_some(),
                lifetime = resp.expires_in.0,
                "received new tokens"
            );

            Ok(resp)
        }
    }

    #[cfg(test)]
    mod tests {
        use encore_clock::DurationSecs;
        use wiremock::{
            matchers::{body_string, header, method, path},
            Mock, MockServer, ResponseTemplate,
        };

        use super::*;
        use crate::{ClientId, ClientSecret, RefreshToken};

        fn credentials() -> ClientCredentials {
            ClientCredentials {
                client_id: ClientId::from_static("id"),
                client_secret: ClientSecret::from_static("secret"),
            }
        }

        /// Runs a blocking exchange against the mock server's token path
        async fn exchange(
            server: &MockServer,
            grant: Grant,
        ) -> Result<TokenResponse, TokenRequestError> {
            let token_url = format!("{}/api/token", server.uri());
            tokio::task::spawn_blocking(move || {
                HttpTokenEndpoint::new(reqwest::blocking::Client::new())
                    .with_token_url(token_url)
                    .exchange(&credentials(), &grant)
            })
            .await
            .unwrap()
        }

        #[tokio::test]
        async fn posts_form_with_basic_auth() {
            let server = MockServer::start().await;

            Mock::given(method("POST"))
                .and(path("/api/token"))
                // base64("id:secret")
                .and(header("authorization", "Basic aWQ6c2VjcmV0"))
                .and(header("content-type", "application/x-www-form-urlencoded"))
                .and(body_string("grant_type=refresh_token&refresh_token=r1"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "access_token": "fresh",
                    "token_type": "Bearer",
                    "expires_in": 3600,
                })))
                .expect(1)
                .mount(&server)
                .await;

            let grant = Grant::RefreshToken {
                refresh_token: RefreshToken::from_static("r1"),
            };
            let resp = exchange(&server, grant).await.unwrap();

            assert_eq!(resp.access_token.as_str(), "fresh");
            assert_eq!(resp.expires_in, DurationSecs(3600));
            assert_eq!(resp.refresh_token, None);
        }

        #[tokio::test]
        async fn non_success_status_is_an_http_error() {
            let server = MockServer::start().await;

            Mock::given(method("POST"))
                .and(path("/api/token"))
                .and(body_string("grant_type=client_credentials"))
                .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                    "error": "invalid_grant",
                    "error_description": "Invalid refresh token",
                })))
                .expect(1)
                .mount(&server)
                .await;

            let err = exchange(&server, Grant::ClientCredentials)
                .await
                .unwrap_err();

            match err {
                TokenRequestError::Http {
                    status,
                    reason,
                    body,
                } => {
                    assert_eq!(status, 400);
                    assert_eq!(reason, "Bad Request");
                    assert!(body.contains("invalid_grant"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn malformed_body_is_a_decode_error() {
            let server = MockServer::start().await;

            Mock::given(method("POST"))
                .and(path("/api/token"))
                .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"token":"nope"}"#))
                .expect(1)
                .mount(&server)
                .await;

            let err = exchange(&server, Grant::ClientCredentials)
                .await
                .unwrap_err();

            assert!(matches!(err, TokenRequestError::TokenBody(_)));
        }
    }
}
