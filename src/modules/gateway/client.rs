use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder};

use super::discovery::{DiscoveryError, ServiceRegistry};

/// HTTP client that addresses services by logical id.
///
/// URLs of the form `http://<service-id>/path` are rewritten onto one of the
/// service's registered instances before the request is built.
#[derive(Debug, Clone)]
pub struct LoadBalancedClient {
    http: reqwest::Client,
    registry: Arc<ServiceRegistry>,
}

impl LoadBalancedClient {
    pub fn new(http: reqwest::Client, registry: Arc<ServiceRegistry>) -> Self {
        Self { http, registry }
    }

    /// Client whose every call gives up after `timeout`
    pub fn with_timeout(
        registry: Arc<ServiceRegistry>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::new(http, registry))
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn request(&self, method: Method, logical: &str) -> Result<RequestBuilder, DiscoveryError> {
        let url = self.registry.resolve(logical)?;
        tracing::trace!(%method, logical, resolved = %url, "resolved upstream call");
        Ok(self.http.request(method, url))
    }

    pub fn get(&self, logical: &str) -> Result<RequestBuilder, DiscoveryError> {
        self.request(Method::GET, logical)
    }
}
