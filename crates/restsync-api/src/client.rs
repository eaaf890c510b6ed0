// HTTP client for a single REST API root.
//
// Composes URLs from the base URI and a caller-supplied path, applies
// preset headers and the authorization policy, waits on the shared
// token bucket, dispatches with retries, and normalizes the response
// body (XSSI prefix stripped, empty 2xx bodies become `{}`).

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{Authorization, TokenSource};
use crate::error::Error;
use crate::rate_limit::RateLimiter;
use crate::retry::RetryPolicy;
use crate::transport::TransportConfig;

/// Body substituted for an empty 2xx response.
pub const EMPTY_OBJECT: &str = "{}";

/// Everything needed to build an [`HttpClient`].
#[derive(Debug, Clone, Default)]
pub struct HttpClientConfig {
    /// API root, e.g. `https://api.example.com/v1`. A trailing slash is stripped.
    pub base_url: String,
    pub transport: TransportConfig,
    pub authorization: Authorization,
    /// Headers sent with every request.
    pub headers: BTreeMap<String, String>,
    /// Prefix stripped once from the start of every response body.
    pub xssi_prefix: Option<String>,
    /// Requests per second. `None` = unbounded.
    pub rate_limit: Option<f64>,
    pub retry: RetryPolicy,
    /// Dump every request and response.
    pub debug: bool,
}

/// A normalized 2xx response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

enum AuthState {
    Preset,
    Basic {
        username: String,
        password: secrecy::SecretString,
    },
    OAuth2(TokenSource),
}

/// Async client for one REST API root.
///
/// Safe to share across tasks: the only mutable state is the rate limiter,
/// the OAuth2 token cache and the cookie jar, each internally synchronized.
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
    auth: AuthState,
    xssi_prefix: Option<String>,
    limiter: Option<RateLimiter>,
    retry: RetryPolicy,
    debug: bool,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("rate_limit", &self.limiter.as_ref().map(RateLimiter::rate))
            .field("retry", &self.retry)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Build a client, validating the URI, headers, retry bounds and rate.
    pub fn new(config: HttpClientConfig) -> Result<Self, Error> {
        let base_url = config.base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            return Err(Error::Build {
                message: "base URI must not be empty".into(),
            });
        }
        Url::parse(&base_url)?;
        config.retry.validate()?;

        let limiter = config.rate_limit.map(RateLimiter::new).transpose()?;

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::Build {
                message: format!("invalid header name '{name}': {e}"),
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| Error::Build {
                message: format!("invalid value for header '{name}': {e}"),
            })?;
            headers.insert(name, value);
        }

        let auth = match config.authorization {
            Authorization::None => AuthState::Preset,
            Authorization::Bearer(token) => {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                    .map_err(|e| Error::Build {
                        message: format!("invalid bearer token: {e}"),
                    })?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
                AuthState::Preset
            }
            Authorization::Basic { username, password } => {
                AuthState::Basic { username, password }
            }
            Authorization::OAuth2(oauth) => AuthState::OAuth2(TokenSource::new(oauth)),
        };

        let http = config.transport.build_client()?;

        Ok(Self {
            http,
            base_url,
            headers,
            auth,
            xssi_prefix: config.xssi_prefix.filter(|p| !p.is_empty()),
            limiter,
            retry: config.retry,
            debug: config.debug,
        })
    }

    /// The API root (no trailing slash).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether client-wide wire dumps are enabled.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── Send ─────────────────────────────────────────────────────────

    /// Send `body` (omitted when empty) to `base + path`.
    ///
    /// Returns the normalized body of a 2xx response, or
    /// [`Error::HttpStatus`] carrying the raw body for anything else.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: &str,
        force_debug: bool,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, Error> {
        let url = Url::parse(&format!("{}{path}", self.base_url))?;
        let dump = self.debug || force_debug;
        debug!("{method} {url}");

        let bearer = match self.auth {
            AuthState::OAuth2(ref source) => {
                let token = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(Error::Cancelled),
                    token = source.token(&self.http) => token?,
                };
                Some(token)
            }
            _ => None,
        };

        if let Some(ref limiter) = self.limiter {
            limiter.acquire(cancel).await?;
        }

        let mut attempt = 0;
        loop {
            let request = self.build_request(&method, &url, body, bearer.as_ref())?;
            if dump {
                dump_request(&request);
            }

            let result = self.dispatch(request, cancel).await.and_then(|raw| {
                if dump {
                    info!(
                        target: "restsync::wire",
                        status = raw.status,
                        body = %raw.body,
                        "response dump"
                    );
                }
                self.normalize(raw)
            });

            match result {
                Err(err) if self.retry.should_retry(attempt, &err) => {
                    let wait = self.retry.backoff(attempt);
                    attempt += 1;
                    warn!(error = %err, attempt, ?wait, "{method} {url} failed, retrying");
                    sleep_or_cancel(wait, cancel).await?;
                }
                other => return other,
            }
        }
    }

    fn build_request(
        &self,
        method: &Method,
        url: &Url,
        body: &str,
        bearer: Option<&secrecy::SecretString>,
    ) -> Result<reqwest::Request, Error> {
        let mut headers = HeaderMap::new();
        if !body.is_empty() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }

        let mut builder = self.http.request(method.clone(), url.clone());
        match self.auth {
            AuthState::Basic {
                ref username,
                ref password,
            } => {
                headers.remove(AUTHORIZATION);
                builder = builder.basic_auth(username, Some(password.expose_secret()));
            }
            AuthState::OAuth2(_) => {
                if let Some(token) = bearer {
                    let mut value =
                        HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                            .map_err(|e| Error::Authentication {
                                message: format!("token is not a valid header value: {e}"),
                            })?;
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
            }
            AuthState::Preset => {}
        }

        builder = builder.headers(headers);
        if !body.is_empty() {
            builder = builder.body(body.to_owned());
        }

        builder.build().map_err(|e| Error::Build {
            message: e.to_string(),
        })
    }

    async fn dispatch(
        &self,
        request: reqwest::Request,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, Error> {
        let exchange = async {
            let resp = self.http.execute(request).await?;
            let status = resp.status().as_u16();
            let body = resp.text().await?;
            Ok::<_, Error>(ApiResponse { status, body })
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            result = exchange => result,
        }
    }

    fn normalize(&self, raw: ApiResponse) -> Result<ApiResponse, Error> {
        let ApiResponse { status, mut body } = raw;

        if let Some(ref prefix) = self.xssi_prefix {
            if let Some(rest) = body.strip_prefix(prefix.as_str()) {
                body = rest.to_owned();
            }
        }

        if !(200..300).contains(&status) {
            return Err(Error::HttpStatus { status, body });
        }

        if body.is_empty() {
            body = EMPTY_OBJECT.to_owned();
        }

        Ok(ApiResponse { status, body })
    }
}

async fn sleep_or_cancel(wait: Duration, cancel: &CancellationToken) -> Result<(), Error> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        () = tokio::time::sleep(wait) => Ok(()),
    }
}

/// Log the request line, headers and body. Sensitive header values are redacted.
fn dump_request(request: &reqwest::Request) {
    let headers: Vec<String> = request
        .headers()
        .iter()
        .map(|(name, value)| {
            if value.is_sensitive() {
                format!("{name}: [REDACTED]")
            } else {
                format!("{name}: {}", value.to_str().unwrap_or("<binary>"))
            }
        })
        .collect();
    let body = request
        .body()
        .and_then(reqwest::Body::as_bytes)
        .map(String::from_utf8_lossy)
        .unwrap_or_default();

    info!(
        target: "restsync::wire",
        method = %request.method(),
        url = %request.url(),
        headers = ?headers,
        body = %body,
        "request dump"
    );
}
