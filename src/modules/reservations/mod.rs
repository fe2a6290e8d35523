//! Backing service: durable reservation store, its HTTP surface, the
//! channel consumer and startup seeding.

pub mod consumer;
pub mod models;
pub mod routes;

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use axum::Router;
use reservation_db::{ReservationRepository, SCHEMA};
use reservation_events::{InMemoryChannel, Inbox};
use reservation_kernel::{InitCtx, Migration, Module};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use consumer::{ConsumerState, ReservationConsumer};
use routes::ReservationsState;

pub struct ReservationsModule {
    repository: Arc<dyn ReservationRepository>,
    inbound: InMemoryChannel,
    inbox: Mutex<Option<Inbox>>,
    consumer: Mutex<Option<JoinHandle<()>>>,
    consumer_state: Mutex<Option<watch::Receiver<ConsumerState>>>,
}

impl ReservationsModule {
    /// `inbound` and `inbox` are the two halves of the channel the
    /// consumer drains.
    pub fn new(
        repository: Arc<dyn ReservationRepository>,
        inbound: InMemoryChannel,
        inbox: Inbox,
    ) -> Self {
        Self {
            repository,
            inbound,
            inbox: Mutex::new(Some(inbox)),
            consumer: Mutex::new(None),
            consumer_state: Mutex::new(None),
        }
    }

    /// Consumer state, once the module has started
    pub fn consumer_state(&self) -> Option<watch::Receiver<ConsumerState>> {
        self.consumer_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Persist the seed names when the store is empty, then log the store
    async fn seed(&self, names: &[String]) -> anyhow::Result<()> {
        if self.repository.count().await? > 0 {
            tracing::info!("store already populated, skipping seed");
            return Ok(());
        }

        for name in names {
            self.repository.create(name).await?;
        }

        for reservation in self.repository.find_all_unpaged().await? {
            tracing::info!(%reservation, "seeded");
        }
        Ok(())
    }
}

#[async_trait]
impl Module for ReservationsModule {
    fn name(&self) -> &'static str {
        "reservations"
    }

    fn routes(&self) -> Router {
        routes::router(ReservationsState {
            repository: self.repository.clone(),
            inbound: self.inbound.clone(),
        })
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "paths": {
                "/reservations": {
                    "get": {
                        "summary": "List reservations (paged)",
                        "tags": ["Reservations"],
                        "parameters": [
                            { "name": "page", "in": "query", "schema": { "type": "integer" } },
                            { "name": "size", "in": "query", "schema": { "type": "integer" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "Paged collection",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ReservationCollection" } } }
                            }
                        }
                    },
                    "post": {
                        "summary": "Create a reservation",
                        "tags": ["Reservations"],
                        "responses": {
                            "201": {
                                "description": "Created reservation",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Reservation" } } }
                            }
                        }
                    }
                },
                "/reservations/{id}": {
                    "get": {
                        "summary": "Get a reservation",
                        "tags": ["Reservations"],
                        "parameters": [
                            { "name": "id", "in": "path", "required": true, "schema": { "type": "integer" } }
                        ],
                        "responses": {
                            "200": { "description": "Reservation" },
                            "404": {
                                "description": "Not found",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
                            }
                        }
                    }
                },
                "/reservations/search/by-name": {
                    "get": {
                        "summary": "Find reservations by exact name",
                        "tags": ["Reservations"],
                        "parameters": [
                            { "name": "rn", "in": "query", "required": true, "schema": { "type": "string" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "Matching reservations",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ReservationCollection" } } }
                            }
                        }
                    }
                },
                "/channel/input": {
                    "post": {
                        "summary": "Relay a channel message to the consumer",
                        "tags": ["Channel"],
                        "responses": { "202": { "description": "Queued" } }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Reservation": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "description": "Assigned on persistence" },
                            "reservationName": { "type": "string" }
                        },
                        "required": ["reservationName"]
                    },
                    "ReservationCollection": {
                        "type": "object",
                        "properties": {
                            "_embedded": {
                                "type": "object",
                                "properties": {
                                    "reservations": {
                                        "type": "array",
                                        "items": { "$ref": "#/components/schemas/Reservation" }
                                    }
                                }
                            },
                            "page": { "type": "object" }
                        }
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: SCHEMA,
        }]
    }

    async fn start(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if ctx.settings.seed.enabled {
            self.seed(&ctx.settings.seed.names).await?;
        }

        let inbox = self
            .inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(inbox) = inbox else {
            anyhow::bail!("reservations module started twice");
        };

        let consumer = ReservationConsumer::new(self.repository.clone());
        *self
            .consumer_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(consumer.subscribe());
        let handle = tokio::spawn(consumer.run(inbox));
        *self.consumer.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        tracing::info!(module = self.name(), "reservations module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        let handle = self
            .consumer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
        tracing::info!(module = self.name(), "reservations module stopped");
        Ok(())
    }
}
