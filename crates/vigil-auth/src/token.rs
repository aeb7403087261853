//! Client-credentials token exchange.

use std::time::Duration;

use tokio::time::Instant;

use crate::errors::AuthError;

/// A bearer credential with its expiry instant.
#[derive(Clone, Debug)]
pub struct AppToken {
    /// The bearer value sent in `Authorization` headers.
    pub access_token: String,
    /// When the token stops being valid.
    pub expires_at: Instant,
}

impl AppToken {
    /// Time remaining until expiry (zero if already expired).
    pub fn remaining(&self, now: Instant) -> Duration {
        self.expires_at.duration_since(now)
    }
}

/// Performs the client-credentials exchange against the OAuth token endpoint.
#[derive(Clone, Debug)]
pub struct TokenExchange {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl TokenExchange {
    /// Build an exchange from the configured application identity.
    ///
    /// Fails with [`AuthError::MissingIdentity`] if either the client id or
    /// the client secret is absent.
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(AuthError::MissingIdentity);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            token_url: token_url.into(),
            client_id,
            client_secret,
        })
    }

    /// Application client id (also sent as the `Client-ID` header elsewhere).
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Perform the exchange and return a fresh token.
    #[tracing::instrument(skip_all)]
    pub async fn acquire(&self) -> Result<AppToken, AuthError> {
        let resp = self
            .http
            .post(&self.token_url)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let message = resp.text().await.unwrap_or_default();
            return Err(AuthError::Rejected { status, message });
        }

        let data: TokenResponse = resp.json().await?;
        tracing::info!(expires_in_secs = data.expires_in, "obtained app access token");
        Ok(AppToken {
            access_token: data.access_token,
            expires_at: Instant::now() + Duration::from_secs(data.expires_in),
        })
    }
}

/// Token endpoint response.
#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn missing_identity_rejected_at_construction() {
        let result = TokenExchange::new("http://localhost/token", "", "secret");
        assert!(matches!(result.unwrap_err(), AuthError::MissingIdentity));

        let result = TokenExchange::new("http://localhost/token", "id", "");
        assert!(matches!(result.unwrap_err(), AuthError::MissingIdentity));
    }

    #[test]
    fn remaining_saturates_at_zero() {
        let token = AppToken {
            access_token: "tok".into(),
            expires_at: Instant::now(),
        };
        let later = Instant::now() + Duration::from_secs(5);
        assert_eq!(token.remaining(later), Duration::ZERO);
    }

    #[tokio::test]
    async fn acquire_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(query_param("grant_type", "client_credentials"))
            .and(query_param("client_id", "cid"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "app-tok",
                "expires_in": 3600,
            })))
            .mount(&server)
            .await;

        let exchange =
            TokenExchange::new(format!("{}/oauth2/token", server.uri()), "cid", "secret").unwrap();
        let token = exchange.acquire().await.unwrap();
        assert_eq!(token.access_token, "app-tok");
        assert!(token.remaining(Instant::now()) > Duration::from_secs(3500));
    }

    #[tokio::test]
    async fn acquire_rejected_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("invalid client"))
            .mount(&server)
            .await;

        let exchange =
            TokenExchange::new(format!("{}/oauth2/token", server.uri()), "cid", "secret").unwrap();
        let err = exchange.acquire().await.unwrap_err();
        match err {
            AuthError::Rejected { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "invalid client");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn acquire_malformed_body_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let exchange =
            TokenExchange::new(format!("{}/oauth2/token", server.uri()), "cid", "secret").unwrap();
        let err = exchange.acquire().await.unwrap_err();
        assert!(matches!(err, AuthError::Http(_)));
    }
}
