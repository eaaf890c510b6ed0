// Transport configuration for building the shared reqwest::Client.
//
// TLS trust, client identity, request timeout and the optional cookie
// jar all live here so the HTTP client and the OAuth2 token fetch go
// through the same connection pool and proxy settings.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;

use crate::error::Error;

const USER_AGENT: &str = concat!("restsync/", env!("CARGO_PKG_VERSION"));

/// PEM-encoded client certificate and private key for mutual TLS.
///
/// Both halves are required; the type makes a lone cert or key
/// unrepresentable.
#[derive(Clone)]
pub struct ClientIdentity {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
}

impl std::fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("cert_pem", &format_args!("{} bytes", self.cert_pem.len()))
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

/// TLS trust settings.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// Accept any server certificate.
    pub insecure: bool,
    /// Additional PEM root CA bundle.
    pub root_ca_pem: Option<Vec<u8>>,
    /// Client certificate for mutual TLS.
    pub identity: Option<ClientIdentity>,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone, Default)]
pub struct TransportConfig {
    pub tls: TlsConfig,
    /// Per-request timeout covering the send and the body read. `None` = unbounded.
    pub timeout: Option<Duration>,
    pub cookie_jar: Option<Arc<Jar>>,
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// Proxy settings are taken from the environment (`HTTPS_PROXY` etc.),
    /// which is reqwest's default behaviour.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if self.tls.insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ref pem) = self.tls.root_ca_pem {
            let certs = reqwest::Certificate::from_pem_bundle(pem)
                .map_err(|e| Error::Tls(format!("invalid root CA bundle: {e}")))?;
            if certs.is_empty() {
                return Err(Error::Tls("root CA bundle contains no certificates".into()));
            }
            for cert in certs {
                builder = builder.add_root_certificate(cert);
            }
        }

        if let Some(ref identity) = self.tls.identity {
            let mut pem = identity.cert_pem.clone();
            if !pem.ends_with(b"\n") {
                pem.push(b'\n');
            }
            pem.extend_from_slice(&identity.key_pem);
            let identity = reqwest::Identity::from_pem(&pem)
                .map_err(|e| Error::Tls(format!("invalid client certificate/key pair: {e}")))?;
            builder = builder.identity(identity);
        }

        if let Some(ref jar) = self.cookie_jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Create a config with a fresh cookie jar (shared session state).
    pub fn with_cookie_jar(mut self) -> Self {
        self.cookie_jar = Some(Arc::new(Jar::default()));
        self
    }
}
