//! Upstream reads with fallback.
//!
//! [`DirectFetcher`] talks to the backing service and surfaces every
//! failure. [`FallbackFetcher`] wraps any [`Fetcher`] and turns failures into
//! fixed fallback values, so the gateway's read endpoints always answer.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::client::LoadBalancedClient;
use super::discovery::DiscoveryError;
use crate::modules::reservations::models::ReservationCollection;

/// Returned by the message read when the backing service cannot be reached.
pub const SERVICE_MESSAGE_FALLBACK: &str = "Unable to contact Reservation Service";

/// Upper bound on pages fetched by one names walk.
pub const MAX_PAGES: u32 = 10_000;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("upstream call failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Every reservation name in store order
    async fn reservation_names(&self) -> Result<Vec<String>, FetchError>;

    /// The backing service's configured message
    async fn service_message(&self) -> Result<String, FetchError>;
}

/// Reads straight from the backing service through the load balancer.
#[derive(Debug, Clone)]
pub struct DirectFetcher {
    client: LoadBalancedClient,
    service: String,
}

impl DirectFetcher {
    pub fn new(client: LoadBalancedClient, service: impl Into<String>) -> Self {
        Self {
            client,
            service: service.into(),
        }
    }

    async fn page(&self, number: u32) -> Result<ReservationCollection, FetchError> {
        let collection = self
            .client
            .get(&format!("http://{}/reservations?page={number}", self.service))?
            .send()
            .await?
            .error_for_status()?
            .json::<ReservationCollection>()
            .await?;
        Ok(collection)
    }
}

#[async_trait]
impl Fetcher for DirectFetcher {
    async fn reservation_names(&self) -> Result<Vec<String>, FetchError> {
        let mut names = Vec::new();
        for number in 0..MAX_PAGES {
            let collection = self.page(number).await?;
            // Driven by the requested counter, never by the echoed page number
            let last = match collection.page {
                Some(page) => number + 1 >= page.total_pages,
                None => true,
            };
            if collection.reservations().is_empty() {
                return Ok(names);
            }
            names.extend(collection.into_names());
            if last {
                return Ok(names);
            }
        }
        tracing::warn!(pages = MAX_PAGES, "names walk hit the page limit");
        Ok(names)
    }

    async fn service_message(&self) -> Result<String, FetchError> {
        let message = self
            .client
            .get(&format!("http://{}/message", self.service))?
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(message)
    }
}

#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    async fn reservation_names(&self) -> Result<Vec<String>, FetchError> {
        (**self).reservation_names().await
    }

    async fn service_message(&self) -> Result<String, FetchError> {
        (**self).service_message().await
    }
}

/// Swaps upstream failures for fallback values.
#[derive(Debug, Clone)]
pub struct FallbackFetcher<F> {
    inner: F,
}

impl<F: Fetcher> FallbackFetcher<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }

    /// Names from upstream, or empty when the call fails
    pub async fn reservation_names(&self) -> Vec<String> {
        match self.inner.reservation_names().await {
            Ok(names) => names,
            Err(error) => {
                tracing::warn!(%error, "reservation names unavailable, using fallback");
                Vec::new()
            }
        }
    }

    pub async fn service_message(&self) -> String {
        match self.inner.service_message().await {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(%error, "service message unavailable, using fallback");
                SERVICE_MESSAGE_FALLBACK.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::gateway::discovery::ServiceRegistry;
    use axum::{extract::Query, routing::get, Json, Router};
    use reservation_db::Reservation;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::net::TcpListener;

    const NAMES: [&str; 5] = ["Dr bilel", "DR Moez", "Dr thierry", "Dr Luc", "Dr Nicolas"];

    /// Fake backing service serving NAMES two per page
    async fn fake_service() -> String {
        async fn list(Query(params): Query<HashMap<String, u32>>) -> Json<serde_json::Value> {
            let number = params.get("page").copied().unwrap_or(0);
            let items: Vec<Reservation> = NAMES
                .iter()
                .enumerate()
                .skip(number as usize * 2)
                .take(2)
                .map(|(i, name)| Reservation {
                    id: Some(i as i64 + 1),
                    name: name.to_string(),
                })
                .collect();
            Json(serde_json::json!({
                "_embedded": { "reservations": items },
                "page": { "size": 2, "totalElements": NAMES.len(), "totalPages": 3, "number": number }
            }))
        }

        let app = Router::new()
            .route("/reservations", get(list))
            .route("/message", get(|| async { "Hello from upstream" }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// Address nothing listens on
    async fn dead_address() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    fn fetcher_for(base: &str) -> DirectFetcher {
        let mut registry = ServiceRegistry::new();
        registry.register("reservation-service", &[base]).unwrap();
        let client =
            LoadBalancedClient::with_timeout(Arc::new(registry), Duration::from_millis(500))
                .unwrap();
        DirectFetcher::new(client, "reservation-service")
    }

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn walk_ends_when_upstream_repeats_page_number() {
        let app = Router::new().route(
            "/reservations",
            get(|| async {
                Json(serde_json::json!({
                    "_embedded": { "reservations": [{ "id": 1, "reservationName": "Dr bilel" }] },
                    "page": { "size": 1, "totalElements": 2, "totalPages": 2, "number": 0 }
                }))
            }),
        );
        let fallback = FallbackFetcher::new(fetcher_for(&serve(app).await));

        let names = tokio::time::timeout(Duration::from_secs(3), fallback.reservation_names())
            .await
            .expect("names walk did not terminate");
        assert_eq!(names, vec!["Dr bilel", "Dr bilel"]);
    }

    #[tokio::test]
    async fn walk_ends_on_empty_page() {
        let app = Router::new().route(
            "/reservations",
            get(|| async {
                Json(serde_json::json!({
                    "_embedded": { "reservations": [] },
                    "page": { "size": 20, "totalElements": 0, "totalPages": 4000000000u32, "number": 0 }
                }))
            }),
        );
        let fetcher = fetcher_for(&serve(app).await);

        let names = tokio::time::timeout(Duration::from_secs(3), fetcher.reservation_names())
            .await
            .expect("names walk did not terminate")
            .unwrap();
        assert!(names.is_empty());
    }

    #[tokio::test]
    async fn direct_fetcher_walks_every_page() {
        let fetcher = fetcher_for(&fake_service().await);
        let names = fetcher.reservation_names().await.unwrap();
        assert_eq!(names, NAMES);
    }

    #[tokio::test]
    async fn direct_fetcher_reads_message_text() {
        let fetcher = fetcher_for(&fake_service().await);
        assert_eq!(
            fetcher.service_message().await.unwrap(),
            "Hello from upstream"
        );
    }

    #[tokio::test]
    async fn direct_fetcher_surfaces_transport_errors() {
        let fetcher = fetcher_for(&dead_address().await);
        assert!(matches!(
            fetcher.reservation_names().await,
            Err(FetchError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn fallback_replaces_failures() {
        let fallback = FallbackFetcher::new(fetcher_for(&dead_address().await));
        assert!(fallback.reservation_names().await.is_empty());
        assert_eq!(fallback.service_message().await, SERVICE_MESSAGE_FALLBACK);
    }

    #[tokio::test]
    async fn fallback_passes_successes_through() {
        let fallback = FallbackFetcher::new(fetcher_for(&fake_service().await));
        assert_eq!(fallback.reservation_names().await.len(), NAMES.len());
        assert_eq!(fallback.service_message().await, "Hello from upstream");
    }

    #[tokio::test]
    async fn fallback_covers_unknown_service() {
        let client = LoadBalancedClient::new(reqwest::Client::new(), Arc::new(ServiceRegistry::new()));
        let fallback = FallbackFetcher::new(DirectFetcher::new(client, "missing"));
        assert!(fallback.reservation_names().await.is_empty());
        assert_eq!(fallback.service_message().await, SERVICE_MESSAGE_FALLBACK);
    }
}
