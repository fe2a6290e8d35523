//! Static service discovery with round-robin instance selection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use reservation_kernel::settings::DiscoverySettings;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("unknown service '{0}'")]
    UnknownService(String),

    #[error("service '{0}' has no instances")]
    NoInstances(String),

    #[error("invalid instance url '{url}' for service '{service}': {source}")]
    InvalidInstance {
        service: String,
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid service url '{0}'")]
    InvalidServiceUrl(String),
}

#[derive(Debug)]
struct ServiceEntry {
    instances: Vec<Url>,
    cursor: AtomicUsize,
}

/// Registry of service ids to instance base URLs.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, ServiceEntry>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &DiscoverySettings) -> Result<Self, DiscoveryError> {
        let mut registry = Self::new();
        for (service, urls) in &settings.services {
            registry.register(service, urls)?;
        }
        Ok(registry)
    }

    /// Register (or replace) the instances of `service`
    pub fn register<S: AsRef<str>>(
        &mut self,
        service: &str,
        urls: &[S],
    ) -> Result<(), DiscoveryError> {
        let instances = urls
            .iter()
            .map(|url| {
                Url::parse(url.as_ref()).map_err(|source| DiscoveryError::InvalidInstance {
                    service: service.to_string(),
                    url: url.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(service, instances = instances.len(), "service registered");
        self.services.insert(
            service.to_string(),
            ServiceEntry {
                instances,
                cursor: AtomicUsize::new(0),
            },
        );
        Ok(())
    }

    pub fn instances(&self, service: &str) -> Option<&[Url]> {
        self.services
            .get(service)
            .map(|entry| entry.instances.as_slice())
    }

    /// Next instance of `service`, rotating through the list
    pub fn choose(&self, service: &str) -> Result<Url, DiscoveryError> {
        let entry = self
            .services
            .get(service)
            .ok_or_else(|| DiscoveryError::UnknownService(service.to_string()))?;

        if entry.instances.is_empty() {
            return Err(DiscoveryError::NoInstances(service.to_string()));
        }

        let index = entry.cursor.fetch_add(1, Ordering::Relaxed) % entry.instances.len();
        Ok(entry.instances[index].clone())
    }

    /// Rewrite `http://<service-id>/path?query` onto a concrete instance
    pub fn resolve(&self, logical: &str) -> Result<Url, DiscoveryError> {
        let parsed =
            Url::parse(logical).map_err(|_| DiscoveryError::InvalidServiceUrl(logical.to_string()))?;
        let service = parsed
            .host_str()
            .ok_or_else(|| DiscoveryError::InvalidServiceUrl(logical.to_string()))?;

        let mut target = self.choose(service)?;
        let base = target.path().trim_end_matches('/').to_string();
        target.set_path(&format!("{base}{}", parsed.path()));
        target.set_query(parsed.query());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ServiceRegistry {
        let mut registry = ServiceRegistry::new();
        registry
            .register(
                "reservation-service",
                &["http://10.0.0.1:8000", "http://10.0.0.2:8000"],
            )
            .unwrap();
        registry
    }

    #[test]
    fn choose_round_robins() {
        let registry = registry();
        let picks: Vec<String> = (0..4)
            .map(|_| registry.choose("reservation-service").unwrap().to_string())
            .collect();
        assert_eq!(
            picks,
            vec![
                "http://10.0.0.1:8000/",
                "http://10.0.0.2:8000/",
                "http://10.0.0.1:8000/",
                "http://10.0.0.2:8000/",
            ]
        );
    }

    #[test]
    fn resolve_keeps_path_and_query() {
        let registry = registry();
        let url = registry
            .resolve("http://reservation-service/reservations/search/by-name?rn=Dr%20Luc")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://10.0.0.1:8000/reservations/search/by-name?rn=Dr%20Luc"
        );
    }

    #[test]
    fn resolve_appends_to_instance_base_path() {
        let mut registry = ServiceRegistry::new();
        registry
            .register("svc", &["http://10.0.0.9:9000/api/"])
            .unwrap();
        let url = registry.resolve("http://svc/message").unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.9:9000/api/message");
    }

    #[test]
    fn unknown_and_empty_services_are_errors() {
        let mut registry = registry();
        registry.register::<&str>("empty", &[]).unwrap();

        assert!(matches!(
            registry.choose("missing"),
            Err(DiscoveryError::UnknownService(_))
        ));
        assert!(matches!(
            registry.choose("empty"),
            Err(DiscoveryError::NoInstances(_))
        ));
    }

    #[test]
    fn invalid_instance_url_is_rejected() {
        let mut registry = ServiceRegistry::new();
        let err = registry.register("svc", &["not a url"]).unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidInstance { .. }));
    }

    #[test]
    fn builds_from_settings() {
        let registry = ServiceRegistry::from_settings(&DiscoverySettings::default()).unwrap();
        assert!(registry.instances("unknown").is_none());
        assert_eq!(registry.instances("reservation-service").unwrap().len(), 1);
    }
}
