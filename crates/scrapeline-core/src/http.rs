//! HTTP transport: one POST of a JSON body, with proxy slot and timeout.
//!
//! [`Transport`] is the seam between the fetch logic and the network. The
//! reqwest implementation keeps one pooled client per proxy (reqwest binds
//! proxies at client construction) plus one direct client.

use std::future::Future;
use std::time::Duration;

use reqwest::header::HeaderMap;

/// Connect timeout, independent of the per-request timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Status and raw body of one HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Error types for transport operations
#[derive(Debug)]
pub enum TransportError {
    /// Request did not complete within the per-attempt timeout
    Timeout,
    /// Connection, TLS, or body read failure
    Http {
        status: Option<u16>,
        message: String,
    },
    /// Client could not be built (bad proxy URL, TLS backend, bad header)
    Setup(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => f.write_str("request timed out"),
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Setup(message) => write!(f, "HTTP client setup: {message}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl TransportError {
    /// Create error from reqwest error, without the request URL
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Timeout;
        }
        // Strip the URL so proxy credentials never reach logs
        let mut message = e.to_string();
        if let Some(url) = e.url() {
            message = message.replace(url.as_str(), "<url>");
        }
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message,
        }
    }
}

/// Deterministic proxy assignment: `slot mod proxy_count`, `None` when no proxies.
pub fn proxy_for_slot(slot: usize, proxy_count: usize) -> Option<usize> {
    if proxy_count == 0 {
        None
    } else {
        Some(slot % proxy_count)
    }
}

/// Opaque request/response function used by fetchers.
pub trait Transport: Send + Sync {
    /// Number of configured proxies (0 = direct connection only)
    fn proxy_count(&self) -> usize;

    /// POST `body` as JSON through proxy `proxy` (index into the proxy list).
    fn post_json(
        &self,
        body: Vec<u8>,
        proxy: Option<usize>,
        timeout: Duration,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// reqwest-backed transport for a single endpoint
pub struct ReqwestTransport {
    endpoint: String,
    direct: reqwest::Client,
    proxied: Vec<reqwest::Client>,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("endpoint", &self.endpoint)
            .field("proxies", &self.proxied.len())
            .finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    /// Build clients for `endpoint`, one per proxy URL, each pooling up to
    /// `pool_size` idle connections.
    pub fn new(
        endpoint: impl Into<String>,
        proxies: &[String],
        pool_size: usize,
    ) -> Result<Self, TransportError> {
        Self::with_headers(endpoint, proxies, pool_size, HeaderMap::new())
    }

    /// Same as [`new`](Self::new), sending `headers` on every request
    pub fn with_headers(
        endpoint: impl Into<String>,
        proxies: &[String],
        pool_size: usize,
        headers: HeaderMap,
    ) -> Result<Self, TransportError> {
        let direct = build_client(None, pool_size, &headers)?;
        let proxied = proxies
            .iter()
            .map(|url| {
                let proxy = reqwest::Proxy::all(url)
                    .map_err(|e| TransportError::Setup(format!("invalid proxy: {e}")))?;
                build_client(Some(proxy), pool_size, &headers)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            endpoint: endpoint.into(),
            direct,
            proxied,
        })
    }

    fn client(&self, proxy: Option<usize>) -> &reqwest::Client {
        proxy
            .and_then(|i| self.proxied.get(i))
            .unwrap_or(&self.direct)
    }
}

fn build_client(
    proxy: Option<reqwest::Proxy>,
    pool_size: usize,
    headers: &HeaderMap,
) -> Result<reqwest::Client, TransportError> {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(pool_size)
        .default_headers(headers.clone());
    if let Some(proxy) = proxy {
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| TransportError::Setup(e.to_string()))
}

impl Transport for ReqwestTransport {
    fn proxy_count(&self) -> usize {
        self.proxied.len()
    }

    async fn post_json(
        &self,
        body: Vec<u8>,
        proxy: Option<usize>,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let exchange = async {
            let resp = self
                .client(proxy)
                .post(&self.endpoint)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await?;
            let status = resp.status().as_u16();
            let body = resp.bytes().await?.to_vec();
            Ok::<_, reqwest::Error>(HttpResponse { status, body })
        };

        // Covers connect + send + body read
        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result.map_err(|e| TransportError::from_reqwest(&e)),
            Err(_) => Err(TransportError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_slot_wraps() {
        assert_eq!(proxy_for_slot(0, 3), Some(0));
        assert_eq!(proxy_for_slot(4, 3), Some(1));
        assert_eq!(proxy_for_slot(5, 3), Some(2));
    }

    #[test]
    fn no_proxies_means_direct() {
        assert_eq!(proxy_for_slot(0, 0), None);
        assert_eq!(proxy_for_slot(17, 0), None);
    }

    #[test]
    fn display_http_with_status() {
        let err = TransportError::Http {
            status: Some(502),
            message: "bad gateway".into(),
        };
        assert_eq!(format!("{err}"), "HTTP 502: bad gateway");
    }

    #[test]
    fn display_timeout() {
        assert_eq!(format!("{}", TransportError::Timeout), "request timed out");
    }

    #[test]
    fn one_client_per_proxy() {
        let proxies = vec![
            "http://127.0.0.1:3128".to_string(),
            "http://127.0.0.1:3129".to_string(),
        ];
        let t = ReqwestTransport::new("http://localhost/graphql", &proxies, 4).unwrap();
        assert_eq!(t.proxy_count(), 2);
    }
}
