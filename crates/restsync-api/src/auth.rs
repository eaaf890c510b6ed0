// Request authorization: basic credentials, static bearer tokens and
// OAuth2 client-credentials with a cached, self-refreshing token.

use std::collections::BTreeMap;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;

/// Refresh tokens this long before the server-declared expiry.
const EXPIRY_DELTA: Duration = Duration::from_secs(10);

/// OAuth2 client-credentials grant settings.
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    pub client_id: String,
    pub client_secret: SecretString,
    pub token_endpoint: Url,
    pub scopes: Vec<String>,
    /// Extra form parameters sent to the token endpoint.
    pub endpoint_params: BTreeMap<String, Vec<String>>,
}

/// How requests are authorized. At most one policy is active per client.
#[derive(Debug, Clone, Default)]
pub enum Authorization {
    /// Only the preset headers (if any) are sent.
    #[default]
    None,
    /// HTTP basic authentication.
    Basic {
        username: String,
        password: SecretString,
    },
    /// A static token sent as `Authorization: Bearer <token>`.
    Bearer(SecretString),
    /// Tokens obtained from an OAuth2 token endpoint.
    OAuth2(OAuth2Config),
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    access_token: SecretString,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_at
            .is_none_or(|at| Instant::now() + EXPIRY_DELTA < at)
    }
}

/// Caches the client-credentials token and refreshes it under its own lock.
///
/// Concurrent callers that find the token stale queue on the lock, so only
/// one refresh request reaches the token endpoint.
pub(crate) struct TokenSource {
    config: OAuth2Config,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub(crate) fn new(config: OAuth2Config) -> Self {
        Self {
            config,
            cached: Mutex::new(None),
        }
    }

    /// Return a valid access token, fetching a new one when needed.
    ///
    /// `http` is the client's own transport so TLS and proxy settings apply
    /// to the token request too.
    pub(crate) async fn token(&self, http: &reqwest::Client) -> Result<SecretString, Error> {
        let mut guard = self.cached.lock().await;
        if let Some(ref cached) = *guard {
            if cached.is_fresh() {
                trace!("reusing cached OAuth2 token");
                return Ok(cached.access_token.clone());
            }
        }

        let fresh = self.fetch(http).await?;
        let token = fresh.access_token.clone();
        *guard = Some(fresh);
        Ok(token)
    }

    async fn fetch(&self, http: &reqwest::Client) -> Result<CachedToken, Error> {
        let config = &self.config;
        debug!(endpoint = %config.token_endpoint, "requesting OAuth2 token");

        let mut form: Vec<(String, String)> =
            vec![("grant_type".into(), "client_credentials".into())];
        if !config.scopes.is_empty() {
            form.push(("scope".into(), config.scopes.join(" ")));
        }
        for (name, values) in &config.endpoint_params {
            for value in values {
                form.push((name.clone(), value.clone()));
            }
        }

        let resp = http
            .post(config.token_endpoint.clone())
            .basic_auth(&config.client_id, Some(config.client_secret.expose_secret()))
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Authentication {
                message: format!("token request failed: {e}"),
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Authentication {
            message: format!("failed to read token response: {e}"),
        })?;

        if !status.is_success() {
            return Err(Error::Authentication {
                message: format!("token endpoint returned HTTP {status}: {body}"),
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::Authentication {
                message: format!("invalid token response: {e}"),
            })?;

        if parsed.access_token.is_empty() {
            return Err(Error::Authentication {
                message: "token endpoint returned an empty access_token".into(),
            });
        }

        Ok(CachedToken {
            access_token: SecretString::from(parsed.access_token),
            expires_at: parsed
                .expires_in
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_without_expiry_is_always_fresh() {
        let token = CachedToken {
            access_token: SecretString::from("t".to_string()),
            expires_at: None,
        };
        assert!(token.is_fresh());
    }

    #[tokio::test(start_paused = true)]
    async fn token_goes_stale_inside_expiry_delta() {
        let token = CachedToken {
            access_token: SecretString::from("t".to_string()),
            expires_at: Some(Instant::now() + Duration::from_secs(60)),
        };
        assert!(token.is_fresh());

        tokio::time::advance(Duration::from_secs(51)).await;
        assert!(!token.is_fresh());
    }
}
