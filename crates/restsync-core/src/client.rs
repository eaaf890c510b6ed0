// ── API client ──
//
// Binds the HTTP transport to the client-wide defaults every object
// inherits. Cheaply cloneable; one instance is shared by any number
// of `ApiObject`s.

use std::sync::Arc;

use restsync_api::{CancellationToken, HttpClient, Method};
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::CoreError;

pub const DEFAULT_ID_ATTRIBUTE: &str = "id";

/// Shared handle to one REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    http: HttpClient,
    create_method: Method,
    read_method: Method,
    update_method: Method,
    destroy_method: Method,
    id_attribute: String,
    copy_keys: Vec<String>,
    write_returns_object: bool,
    create_returns_object: bool,
    test_path: Option<String>,
}

impl ApiClient {
    /// Build the client without touching the network.
    pub fn new(config: ClientConfig) -> Result<Self, CoreError> {
        let http = HttpClient::new(config.http)?;

        let id_attribute = config
            .id_attribute
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_ID_ATTRIBUTE.to_owned());

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                create_method: config.create_method.unwrap_or(Method::POST),
                read_method: config.read_method.unwrap_or(Method::GET),
                update_method: config.update_method.unwrap_or(Method::PUT),
                destroy_method: config.destroy_method.unwrap_or(Method::DELETE),
                id_attribute,
                copy_keys: config.copy_keys,
                write_returns_object: config.write_returns_object,
                create_returns_object: config.create_returns_object,
                test_path: config.test_path.filter(|p| !p.is_empty()),
            }),
        })
    }

    /// Build the client and run the configured test-path probe, if any.
    pub async fn connect(
        config: ClientConfig,
        cancel: &CancellationToken,
    ) -> Result<Self, CoreError> {
        let client = Self::new(config)?;
        client.probe(cancel).await?;
        Ok(client)
    }

    /// Issue a read to the test path. Any non-2xx answer is fatal.
    pub async fn probe(&self, cancel: &CancellationToken) -> Result<(), CoreError> {
        let Some(ref path) = self.inner.test_path else {
            debug!("no test path configured, skipping probe");
            return Ok(());
        };

        self.inner
            .http
            .send(self.read_method().clone(), path, "", false, cancel)
            .await?;
        info!(path = %path, "API test path answered");
        Ok(())
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn http(&self) -> &HttpClient {
        &self.inner.http
    }

    pub fn create_method(&self) -> &Method {
        &self.inner.create_method
    }

    pub fn read_method(&self) -> &Method {
        &self.inner.read_method
    }

    pub fn update_method(&self) -> &Method {
        &self.inner.update_method
    }

    pub fn destroy_method(&self) -> &Method {
        &self.inner.destroy_method
    }

    pub fn id_attribute(&self) -> &str {
        &self.inner.id_attribute
    }

    pub fn copy_keys(&self) -> &[String] {
        &self.inner.copy_keys
    }

    pub fn write_returns_object(&self) -> bool {
        self.inner.write_returns_object
    }

    pub fn create_returns_object(&self) -> bool {
        self.inner.create_returns_object
    }

    pub fn test_path(&self) -> Option<&str> {
        self.inner.test_path.as_deref()
    }
}
