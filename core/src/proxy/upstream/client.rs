//! Upstream client for forwarding matched requests

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Response};
use tokio::time::Duration;

use crate::config::TimeoutsConfig;
use crate::proxy::rule::ProxyRule;

/// Holds one client per TLS policy, built once at startup. Rules with
/// `secure = false` use the client that skips certificate validation.
#[derive(Clone)]
pub struct UpstreamClient {
    verified: Client,
    insecure: Client,
}

impl UpstreamClient {
    pub fn new(timeouts: &TimeoutsConfig) -> Self {
        let verified = Self::builder(timeouts)
            .build()
            .expect("Failed to create HTTP client");
        let insecure = Self::builder(timeouts)
            .danger_accept_invalid_certs(true)
            .build()
            .expect("Failed to create HTTP client");

        Self { verified, insecure }
    }

    fn builder(timeouts: &TimeoutsConfig) -> reqwest::ClientBuilder {
        Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_timeout))
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(Duration::from_secs(timeouts.request_timeout))
            // A tunnel relays 3xx responses verbatim
            .redirect(reqwest::redirect::Policy::none())
    }

    /// Forward one request to the upstream. No retries; the caller
    /// relays whatever comes back.
    pub async fn forward(
        &self,
        rule: &ProxyRule,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Option<reqwest::Body>,
    ) -> Result<Response, reqwest::Error> {
        let client = if rule.secure() {
            &self.verified
        } else {
            &self.insecure
        };

        let mut request = client.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        request.send().await
    }
}
