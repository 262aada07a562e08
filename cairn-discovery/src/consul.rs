//! Consul agent client

use crate::agent::{AgentBackend, AgentChecks, AgentServices, RegistrationRequest};
use crate::error::{BackendError, BackendResult, DiscoveryError};
use async_trait::async_trait;
use cairn_config::ServiceConfig;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Timeout used when none is configured.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for a Consul-compatible agent API.
#[derive(Debug, Clone)]
pub struct ConsulAgent {
    base_url: Url,
    client: reqwest::Client,
}

impl ConsulAgent {
    /// Create a client for the agent API rooted at `base_url`.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use cairn_discovery::ConsulAgent;
    ///
    /// let consul = ConsulAgent::new("http://localhost:8500/v1")?;
    /// ```
    pub fn new(base_url: &str) -> Result<Self, DiscoveryError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a per-request transport timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, DiscoveryError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DiscoveryError::InvalidConfiguration(format!("agent URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(DiscoveryError::InvalidConfiguration(format!(
                "agent URL cannot be a base: {}",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("cairn-discovery/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DiscoveryError::InvalidConfiguration(e.to_string()))?;

        Ok(Self { base_url, client })
    }

    /// Create a client from the service configuration.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, DiscoveryError> {
        Self::with_timeout(&config.agent_url, config.request_timeout)
    }

    /// Agent API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> BackendResult<T> {
        let body = self.send::<()>(Method::GET, segments, None).await?;
        let url = self.endpoint(segments);
        serde_json::from_slice(&body).map_err(|e| BackendError::transport("GET", url.as_str(), e))
    }

    async fn put<B: Serialize + ?Sized>(&self, segments: &[&str], body: Option<&B>) -> BackendResult<()> {
        self.send(Method::PUT, segments, body).await.map(|_| ())
    }

    /// Issue one request and return the body of a success response.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> BackendResult<bytes::Bytes> {
        let url = self.endpoint(segments);
        debug!(method = %method, url = %url, "calling agent");

        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::transport(method.as_str(), url.as_str(), e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BackendError::transport(method.as_str(), url.as_str(), e))?;

        if status.is_success() {
            Ok(bytes)
        } else {
            Err(BackendError::rejected(
                method.as_str(),
                url.as_str(),
                status.as_u16(),
                rejection_message(status, &bytes),
            ))
        }
    }
}

fn rejection_message(status: StatusCode, body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    } else {
        text.to_string()
    }
}

#[async_trait]
impl AgentBackend for ConsulAgent {
    async fn services(&self) -> BackendResult<AgentServices> {
        self.get_json(&["agent", "services"]).await
    }

    async fn checks(&self) -> BackendResult<AgentChecks> {
        self.get_json(&["agent", "checks"]).await
    }

    async fn register(&self, request: &RegistrationRequest) -> BackendResult<()> {
        self.put(&["agent", "service", "register"], Some(request)).await
    }

    async fn deregister(&self, instance_id: &str) -> BackendResult<()> {
        self.put::<()>(&["agent", "service", "deregister", instance_id], None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consul_agent_creation() {
        let consul = ConsulAgent::new("http://localhost:8500/v1");
        assert!(consul.is_ok());
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ConsulAgent::new("not a url"),
            Err(DiscoveryError::InvalidConfiguration(_))
        ));
        assert!(ConsulAgent::new("mailto:ops@example.com").is_err());
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let consul = ConsulAgent::new("http://localhost:8500/v1").unwrap();
        assert_eq!(
            consul.endpoint(&["agent", "services"]).as_str(),
            "http://localhost:8500/v1/agent/services"
        );

        let consul = ConsulAgent::new("http://localhost:8500/v1/").unwrap();
        assert_eq!(
            consul.endpoint(&["agent", "service", "deregister", "orders 1/a"]).as_str(),
            "http://localhost:8500/v1/agent/service/deregister/orders%201%2Fa"
        );
    }

    #[test]
    fn test_rejection_message() {
        assert_eq!(
            rejection_message(StatusCode::INTERNAL_SERVER_ERROR, b""),
            "Internal Server Error"
        );
        assert_eq!(
            rejection_message(StatusCode::NOT_FOUND, b" Unknown service ID \n"),
            "Unknown service ID"
        );
    }
}
