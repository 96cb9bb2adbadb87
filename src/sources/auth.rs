//! Service-to-service authentication via the OAuth client-credentials flow.
//!
//! A missing token is a handled state, not an error: every failure path here
//! returns `None` and the catalog call proceeds without an `Authorization`
//! header.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::config::OAuthConfig;
use crate::error::RefMatchError;

const TOKEN_API: &str = "token-issuer";
const TOKEN_TIMEOUT: Duration = Duration::from_secs(10);
/// Refresh this long before the issuer's stated expiry.
const EXPIRY_BUFFER: Duration = Duration::from_secs(60);
const DEFAULT_EXPIRES_IN: u64 = 3600;

#[derive(Clone)]
pub struct TokenProvider {
    inner: Arc<Inner>,
}

struct Inner {
    enabled: bool,
    token_url: String,
    client_id: String,
    client_secret: String,
    scopes: String,
    client: reqwest::Client,
    cached: RwLock<Option<Credential>>,
    /// Held across a refresh so concurrent cache misses converge on one
    /// token request instead of each calling the issuer.
    refresh: Mutex<()>,
}

struct Credential {
    token: String,
    expires_at: Instant,
}

impl Credential {
    fn is_fresh(&self) -> bool {
        Instant::now() + EXPIRY_BUFFER < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

impl TokenProvider {
    pub fn new(config: &OAuthConfig) -> Result<Self, RefMatchError> {
        Ok(Self {
            inner: Arc::new(Inner {
                enabled: config.enabled,
                token_url: config.token_url.clone(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                scopes: config.scopes.clone(),
                client: crate::sources::shared_client()?,
                cached: RwLock::new(None),
                refresh: Mutex::new(()),
            }),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    /// Returns a bearer token, or `None` when authentication is disabled or
    /// the issuer cannot currently produce one.
    pub async fn get_token(&self) -> Option<String> {
        if !self.inner.enabled {
            return None;
        }

        if let Some(token) = self.cached_token().await {
            debug!("using cached service token");
            return Some(token);
        }

        let _guard = self.inner.refresh.lock().await;
        // Another caller may have refreshed while we waited for the guard.
        if let Some(token) = self.cached_token().await {
            return Some(token);
        }

        match self.request_token().await {
            Ok(credential) => {
                let token = credential.token.clone();
                *self.inner.cached.write().await = Some(credential);
                debug!("service token refreshed");
                Some(token)
            }
            Err(err) => {
                warn!(error = %err, "token request failed; proceeding unauthenticated");
                None
            }
        }
    }

    async fn cached_token(&self) -> Option<String> {
        let cached = self.inner.cached.read().await;
        cached
            .as_ref()
            .filter(|credential| credential.is_fresh())
            .map(|credential| credential.token.clone())
    }

    async fn request_token(&self) -> Result<Credential, RefMatchError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.as_str()),
            ("scope", self.inner.scopes.as_str()),
        ];

        let resp = self
            .inner
            .client
            .post(&self.inner.token_url)
            .form(&form)
            .timeout(TOKEN_TIMEOUT)
            .send()
            .await
            .map_err(|source| RefMatchError::Transport {
                api: TOKEN_API.to_string(),
                source,
            })?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|source| RefMatchError::Transport {
                api: TOKEN_API.to_string(),
                source,
            })?;
        if !status.is_success() {
            let excerpt = crate::sources::body_excerpt(&bytes);
            return Err(RefMatchError::Api {
                api: TOKEN_API.to_string(),
                message: format!("HTTP {status}: {excerpt}"),
            });
        }

        let parsed: TokenResponse =
            serde_json::from_slice(&bytes).map_err(|source| RefMatchError::ApiJson {
                api: TOKEN_API.to_string(),
                source,
            })?;

        let token = parsed
            .access_token
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| RefMatchError::Api {
                api: TOKEN_API.to_string(),
                message: "Token response missing access_token".into(),
            })?;
        let expires_in = parsed.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);

        Ok(Credential {
            token,
            expires_at: Instant::now() + Duration::from_secs(expires_in),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> TokenProvider {
        TokenProvider::new(&OAuthConfig {
            enabled: true,
            token_url: format!("{}/v1/oauth/token", server.uri()),
            client_id: "refmatch".into(),
            client_secret: "s3cret".into(),
            scopes: "system:catalog:read".into(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn disabled_provider_never_calls_the_issuer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = TokenProvider::new(&OAuthConfig {
            enabled: false,
            token_url: format!("{}/v1/oauth/token", server.uri()),
            client_id: "refmatch".into(),
            client_secret: String::new(),
            scopes: String::new(),
        })
        .unwrap();

        assert_eq!(provider.get_token().await, None);
    }

    #[tokio::test]
    async fn token_is_cached_across_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/oauth/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=refmatch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-1",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        assert_eq!(provider.get_token().await.as_deref(), Some("tok-1"));
        assert_eq!(provider.get_token().await.as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn concurrent_cold_calls_issue_one_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(100))
                    .set_body_json(serde_json::json!({
                        "access_token": "tok-sf",
                        "expires_in": 3600
                    })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let (a, b) = tokio::join!(provider.get_token(), provider.get_token());
        assert_eq!(a.as_deref(), Some("tok-sf"));
        assert_eq!(b.as_deref(), Some("tok-sf"));
    }

    #[tokio::test]
    async fn expiry_inside_the_buffer_forces_refresh() {
        let server = MockServer::start().await;
        // expires_in below the 60s buffer: the cached entry is never fresh.
        Mock::given(method("POST"))
            .and(path("/v1/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-short",
                "expires_in": 30
            })))
            .expect(2)
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        assert_eq!(provider.get_token().await.as_deref(), Some("tok-short"));
        assert_eq!(provider.get_token().await.as_deref(), Some("tok-short"));
    }

    #[tokio::test]
    async fn issuer_failure_yields_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/oauth/token"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        assert_eq!(provider.get_token().await, None);
    }

    #[tokio::test]
    async fn missing_access_token_yields_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "expires_in": 3600 })),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        assert_eq!(provider.get_token().await, None);
    }
}
