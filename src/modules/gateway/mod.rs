//! API gateway: asynchronous writes over the message channel, load-balanced
//! reads with fallback, and a path-prefix reverse proxy.

pub mod client;
pub mod discovery;
pub mod fetcher;
pub mod proxy;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use axum::Router;
use reservation_events::MessageChannel;
use reservation_kernel::{InitCtx, Module, Settings};

use client::LoadBalancedClient;
use discovery::ServiceRegistry;
use fetcher::{DirectFetcher, FallbackFetcher, Fetcher};
use routes::GatewayState;

pub struct GatewayModule {
    state: GatewayState,
    client: LoadBalancedClient,
}

impl GatewayModule {
    pub fn new(
        channel: Arc<dyn MessageChannel>,
        fetcher: Arc<dyn Fetcher>,
        client: LoadBalancedClient,
    ) -> Self {
        Self {
            state: GatewayState {
                channel,
                fetcher: Arc::new(FallbackFetcher::new(fetcher)),
            },
            client,
        }
    }

    /// Wire discovery, the load-balanced client and the fallback reads from
    /// configuration
    pub fn from_settings(
        settings: &Settings,
        channel: Arc<dyn MessageChannel>,
    ) -> anyhow::Result<Self> {
        let registry = ServiceRegistry::from_settings(&settings.discovery)
            .context("invalid discovery configuration")?;
        let client = LoadBalancedClient::with_timeout(
            Arc::new(registry),
            Duration::from_millis(settings.gateway.call_timeout_ms),
        )
        .context("failed to build upstream HTTP client")?;
        let fetcher = DirectFetcher::new(client.clone(), settings.gateway.upstream_service.clone());

        Ok(Self::new(channel, Arc::new(fetcher), client))
    }
}

#[async_trait]
impl Module for GatewayModule {
    fn name(&self) -> &'static str {
        "gateway"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let upstream = &ctx.settings.gateway.upstream_service;
        match self.client.registry().instances(upstream) {
            Some(instances) if !instances.is_empty() => {
                tracing::info!(
                    service = %upstream,
                    instances = instances.len(),
                    "gateway upstream resolved"
                );
            }
            _ => tracing::warn!(
                service = %upstream,
                "gateway upstream has no instances; reads will use fallbacks"
            ),
        }
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone(), self.client.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "paths": {
                "/reservations": {
                    "post": {
                        "summary": "Publish a reservation for asynchronous creation",
                        "tags": ["Gateway"],
                        "requestBody": {
                            "required": true,
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ReservationInput" } } }
                        },
                        "responses": {
                            "200": { "description": "Published; no body" },
                            "500": {
                                "description": "Channel unavailable",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
                            }
                        }
                    }
                },
                "/reservations/names": {
                    "get": {
                        "summary": "All reservation names, empty when the service is unreachable",
                        "tags": ["Gateway"],
                        "responses": {
                            "200": {
                                "description": "Names in store order",
                                "content": {
                                    "application/json": {
                                        "schema": { "type": "array", "items": { "type": "string" } }
                                    }
                                }
                            }
                        }
                    }
                },
                "/reservations/service-message": {
                    "get": {
                        "summary": "Backing service message, or a fixed fallback",
                        "tags": ["Gateway"],
                        "responses": {
                            "200": {
                                "description": "Message text",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                },
                "/{service}/{path}": {
                    "get": {
                        "summary": "Forward to a discovered service (any method)",
                        "tags": ["Proxy"],
                        "parameters": [
                            { "name": "service", "in": "path", "required": true, "schema": { "type": "string" } },
                            { "name": "path", "in": "path", "required": true, "schema": { "type": "string" } }
                        ],
                        "responses": {
                            "404": { "description": "Unknown service" },
                            "502": { "description": "Service unreachable" }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "ReservationInput": {
                        "type": "object",
                        "properties": { "reservationName": { "type": "string" } },
                        "required": ["reservationName"]
                    }
                }
            }
        }))
    }
}
