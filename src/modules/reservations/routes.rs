use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use reservation_db::{PageRequest, Reservation, ReservationRepository, DEFAULT_PAGE_SIZE};
use reservation_events::{InMemoryChannel, Message, MessageChannel, INBOUND_PATH};
use reservation_http::AppError;
use serde::Deserialize;

use super::models::ReservationCollection;

#[derive(Clone)]
pub struct ReservationsState {
    pub repository: Arc<dyn ReservationRepository>,
    /// Local queue feeding the consumer; relayed messages land here
    pub inbound: InMemoryChannel,
}

pub fn router(state: ReservationsState) -> Router {
    Router::new()
        .route("/reservations", get(list_reservations).post(create_reservation))
        .route("/reservations/{id}", get(get_reservation))
        .route("/reservations/search/by-name", get(find_by_name))
        .route(INBOUND_PATH, post(accept_relayed))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct NameParams {
    pub rn: String,
}

/// Paged collection ordered by id
async fn list_reservations(
    State(state): State<ReservationsState>,
    Query(params): Query<PageParams>,
) -> Result<Json<ReservationCollection>, AppError> {
    let request = PageRequest::new(
        params.page.unwrap_or(0),
        params.size.unwrap_or(DEFAULT_PAGE_SIZE),
    );
    let page = state
        .repository
        .find_all(request)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(page.into()))
}

async fn get_reservation(
    State(state): State<ReservationsState>,
    Path(id): Path<i64>,
) -> Result<Json<Reservation>, AppError> {
    state
        .repository
        .find_by_id(id)
        .await
        .map_err(AppError::internal)?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("reservation {id} not found")))
}

/// Synchronous create; an id sent by the client is ignored
async fn create_reservation(
    State(state): State<ReservationsState>,
    Json(body): Json<Reservation>,
) -> Result<(StatusCode, Json<Reservation>), AppError> {
    let created = state
        .repository
        .create(&body.name)
        .await
        .map_err(AppError::internal)?;
    tracing::info!(%created, "reservation created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn find_by_name(
    State(state): State<ReservationsState>,
    Query(params): Query<NameParams>,
) -> Result<Json<ReservationCollection>, AppError> {
    let found = state
        .repository
        .find_by_reservation_name(&params.rn)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(ReservationCollection::unpaged(found)))
}

/// Inbound end of the HTTP relay channel
async fn accept_relayed(
    State(state): State<ReservationsState>,
    Json(message): Json<Message>,
) -> Result<StatusCode, AppError> {
    state
        .inbound
        .send(message)
        .await
        .map_err(AppError::internal)?;
    Ok(StatusCode::ACCEPTED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::reservations::test_support::{read_json, repository};
    use axum::body::Body;
    use axum::http::{header, Request};
    use reservation_events::in_memory;
    use tower::ServiceExt;

    async fn app() -> (Router, Arc<dyn ReservationRepository>, reservation_events::Inbox) {
        let repository: Arc<dyn ReservationRepository> = repository().await;
        let (inbound, inbox) = in_memory();
        let router = router(ReservationsState {
            repository: repository.clone(),
            inbound,
        });
        (router, repository, inbox)
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn list_returns_paged_collection() {
        let (router, repo, _inbox) = app().await;
        for name in ["Dr bilel", "DR Moez", "Dr thierry"] {
            repo.create(name).await.unwrap();
        }

        let response = router
            .oneshot(
                Request::get("/reservations?page=1&size=2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let collection: ReservationCollection = read_json(response).await;
        assert_eq!(collection.clone().into_names(), vec!["Dr thierry"]);
        let page = collection.page.unwrap();
        assert_eq!(page.total_elements, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.number, 1);
    }

    #[tokio::test]
    async fn search_by_name_matches_exactly() {
        let (router, repo, _inbox) = app().await;
        repo.create("Dr bilel").await.unwrap();
        repo.create("Dr Luc").await.unwrap();

        let response = router
            .oneshot(
                Request::get("/reservations/search/by-name?rn=Dr%20bilel")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let collection: ReservationCollection = read_json(response).await;
        assert_eq!(collection.reservations().len(), 1);
        assert_eq!(collection.reservations()[0].name, "Dr bilel");
        assert!(collection.page.is_none());
    }

    #[tokio::test]
    async fn create_then_get_by_id() {
        let (router, _repo, _inbox) = app().await;

        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/reservations",
                serde_json::json!({ "reservationName": "Dr Nicolas" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: Reservation = read_json(response).await;
        let id = created.id.unwrap();

        let response = router
            .oneshot(
                Request::get(format!("/reservations/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched: Reservation = read_json(response).await;
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn unknown_id_is_404() {
        let (router, _repo, _inbox) = app().await;
        let response = router
            .oneshot(Request::get("/reservations/404").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn relayed_message_is_queued_for_consumer() {
        let (router, _repo, mut inbox) = app().await;
        let message = Message::new("Dr Dominique");

        let response = router
            .oneshot(json_request(
                "POST",
                INBOUND_PATH,
                serde_json::to_value(&message).unwrap(),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(inbox.try_recv(), Some(message));
    }
}
