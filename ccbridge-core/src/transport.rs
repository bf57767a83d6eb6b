//! HTTP transport for backend requests
//!
//! The bridge only needs a blocking GET that yields a status code and body. [`Transport`] is the
//! seam; [`HttpTransport`] implements it with a pooled `reqwest` client driven on the transport
//! library's I/O runtime, while the calling host thread blocks on the result.

use crate::{Error, Result};
use bytes::Bytes;
use reqwest::{redirect, Certificate, Client, ClientBuilder};
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, instrument, warn};

/// Redirects followed before a request fails
pub const MAX_REDIRECTS: usize = 3;

/// TCP keep-alive interval
const TCP_KEEPALIVE: Duration = Duration::from_secs(60);

/// HTTP client behavior; one pooled client exists per distinct value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransportSettings {
    /// Overall request timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Connection establishment timeout; `None` waits indefinitely
    pub connect_timeout: Option<Duration>,
    /// Verify the server certificate chain
    pub verify_tls: bool,
    /// Extra trusted CA bundle (PEM)
    pub ca_file: Option<PathBuf>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(4)),
            connect_timeout: Some(Duration::from_secs(2)),
            verify_tls: true,
            ca_file: None,
        }
    }
}

/// Completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking HTTP GET.
///
/// Implementations report connect, TLS and timeout failures as [`Error::RequestFailed`] and
/// return every completed exchange, whatever its status, as `Ok`.
pub trait Transport {
    fn get(&self, url: &str) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        (**self).get(url)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        (**self).get(url)
    }
}

/// Build a `reqwest` client for the given settings
pub fn build_client(settings: &TransportSettings) -> Result<Client> {
    let mut builder = ClientBuilder::new()
        .redirect(redirect::Policy::limited(MAX_REDIRECTS))
        .tcp_keepalive(TCP_KEEPALIVE)
        .pool_idle_timeout(Duration::from_secs(90))
        .http1_only()
        .use_rustls_tls()
        .danger_accept_invalid_certs(!settings.verify_tls);

    if let Some(timeout) = settings.timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(timeout) = settings.connect_timeout {
        builder = builder.connect_timeout(timeout);
    }

    if let Some(path) = &settings.ca_file {
        let pem = std::fs::read(path).map_err(|e| {
            Error::TransportInitFailed(format!(
                "Failed to read CA bundle {}: {}",
                path.display(),
                e
            ))
        })?;
        let certificate = Certificate::from_pem(&pem).map_err(|e| {
            Error::TransportInitFailed(format!("Invalid CA bundle {}: {}", path.display(), e))
        })?;
        builder = builder.add_root_certificate(certificate);
    }

    if !settings.verify_tls {
        warn!("TLS certificate verification is disabled");
    }

    builder
        .build()
        .map_err(|e| Error::TransportInitFailed(format!("Failed to build HTTP client: {}", e)))
}

/// `reqwest`-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    runtime: Handle,
}

impl HttpTransport {
    /// Wrap an existing client; requests are driven on `runtime`
    pub fn new(client: Client, runtime: Handle) -> Self {
        Self { client, runtime }
    }

    /// Build a dedicated client for `settings`
    pub fn with_settings(settings: &TransportSettings, runtime: Handle) -> Result<Self> {
        Ok(Self::new(build_client(settings)?, runtime))
    }

    #[instrument(skip_all, level = "debug")]
    async fn fetch(&self, url: &str) -> Result<HttpResponse> {
        debug!("GET {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            let e = e.without_url();
            warn!("Backend request failed: {}", e);
            Error::from(e)
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| Error::from(e.without_url()))?;

        debug!(status, bytes = body.len(), "Backend responded");
        Ok(HttpResponse { status, body })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        // Blocking inside a runtime worker would panic.
        if Handle::try_current().is_ok() {
            return Err(Error::RequestFailed(
                "blocking GET issued from inside an async runtime".to_string(),
            ));
        }
        self.runtime.block_on(self.fetch(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(HttpResponse::new(200, "ok").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(HttpResponse::new(299, "").is_success());
        assert!(!HttpResponse::new(199, "").is_success());
        assert!(!HttpResponse::new(301, "").is_success());
        assert!(!HttpResponse::new(404, "").is_success());
        assert!(!HttpResponse::new(500, "").is_success());
    }

    #[test]
    fn test_client_builds_with_defaults() {
        assert!(build_client(&TransportSettings::default()).is_ok());
    }

    #[test]
    fn test_client_builds_without_timeouts() {
        let settings = TransportSettings {
            timeout: None,
            connect_timeout: None,
            ..TransportSettings::default()
        };
        assert!(build_client(&settings).is_ok());
    }

    #[test]
    fn test_client_builds_without_verification() {
        let settings = TransportSettings {
            verify_tls: false,
            ..TransportSettings::default()
        };
        assert!(build_client(&settings).is_ok());
    }

    #[test]
    fn test_missing_ca_bundle_fails_init() {
        let settings = TransportSettings {
            ca_file: Some(PathBuf::from("/nonexistent/ccbridge/ca.pem")),
            ..TransportSettings::default()
        };
        let err = build_client(&settings).unwrap_err();
        assert!(matches!(err, Error::TransportInitFailed(_)));
        assert!(err.to_string().contains("ca.pem"));
    }

    #[test]
    fn test_settings_are_cache_keys() {
        use std::collections::HashSet;
        let mut seen = HashSet::new();
        seen.insert(TransportSettings::default());
        seen.insert(TransportSettings::default());
        seen.insert(TransportSettings {
            timeout: Some(Duration::from_secs(10)),
            ..TransportSettings::default()
        });
        assert_eq!(seen.len(), 2);
    }

    #[tokio::test]
    async fn test_get_inside_runtime_is_rejected() {
        let runtime = Handle::current();
        let transport = HttpTransport::with_settings(&TransportSettings::default(), runtime).unwrap();
        let err = transport.get("http://127.0.0.1:9/").unwrap_err();
        assert!(matches!(err, Error::RequestFailed(_)));
    }
}
