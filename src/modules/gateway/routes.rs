use std::sync::Arc;

use axum::{
    extract::State,
    routing::{any, get, post},
    Json, Router,
};
use reservation_db::Reservation;
use reservation_events::{Message, MessageChannel};
use reservation_http::AppError;

use super::client::LoadBalancedClient;
use super::fetcher::{FallbackFetcher, Fetcher};
use super::proxy;

#[derive(Clone)]
pub struct GatewayState {
    pub channel: Arc<dyn MessageChannel>,
    pub fetcher: Arc<FallbackFetcher<Arc<dyn Fetcher>>>,
}

pub fn router(state: GatewayState, client: LoadBalancedClient) -> Router {
    let api = Router::new()
        .route("/reservations", post(publish_reservation))
        .route("/reservations/names", get(reservation_names))
        .route("/reservations/service-message", get(service_message))
        .with_state(state);

    let proxy = Router::new()
        .route("/{service}/{*path}", any(proxy::forward))
        .with_state(client);

    api.merge(proxy)
}

/// Publish the name on the channel; persistence happens asynchronously
async fn publish_reservation(
    State(state): State<GatewayState>,
    Json(body): Json<Reservation>,
) -> Result<(), AppError> {
    let message = Message::new(body.name);
    let id = message.id;
    state.channel.send(message).await.map_err(|error| {
        tracing::error!(message_id = %id, %error, "failed to publish reservation");
        AppError::internal(error)
    })?;
    tracing::info!(message_id = %id, "reservation published");
    Ok(())
}

async fn reservation_names(State(state): State<GatewayState>) -> Json<Vec<String>> {
    Json(state.fetcher.reservation_names().await)
}

async fn service_message(State(state): State<GatewayState>) -> String {
    state.fetcher.service_message().await
}
