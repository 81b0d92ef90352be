//! Reachability probe for locally hosted backends

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// Lightweight reachability check run before dispatching to a backend
/// that is optionally absent in a deployment
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Whether the endpoint answered within the budget
    async fn ping(&self, timeout: Duration) -> bool;
}

/// HTTP GET probe against a fixed endpoint
pub struct HttpHealthProbe {
    client: Client,
    endpoint: Url,
}

impl HttpHealthProbe {
    /// Probe the given endpoint
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn ping(&self, timeout: Duration) -> bool {
        let request = self.client.get(self.endpoint.clone()).send();
        match tokio::time::timeout(timeout, request).await {
            Ok(Ok(response)) => response.status().is_success(),
            Ok(Err(error)) => {
                tracing::debug!(endpoint = %self.endpoint, %error, "health probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(endpoint = %self.endpoint, "health probe timed out");
                false
            }
        }
    }
}
