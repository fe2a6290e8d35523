//! Configurable message endpoint with live configuration refresh.

use async_trait::async_trait;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use reservation_http::AppError;
use reservation_kernel::{Module, SharedSettings};

pub struct MessageModule {
    settings: SharedSettings,
}

impl MessageModule {
    pub fn new(settings: SharedSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Module for MessageModule {
    fn name(&self) -> &'static str {
        "message"
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/message", get(message))
            .route("/refresh", post(refresh))
            .with_state(self.settings.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "paths": {
                "/message": {
                    "get": {
                        "summary": "Configured message",
                        "tags": ["Message"],
                        "responses": {
                            "200": {
                                "description": "Current value of `message`",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                },
                "/refresh": {
                    "post": {
                        "summary": "Reload configuration",
                        "tags": ["Message"],
                        "responses": {
                            "200": {
                                "description": "Keys whose values changed",
                                "content": {
                                    "application/json": {
                                        "schema": { "type": "array", "items": { "type": "string" } }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }))
    }
}

/// Read at request time so refreshed values show up immediately
async fn message(State(settings): State<SharedSettings>) -> String {
    settings.current().message.clone()
}

async fn refresh(State(settings): State<SharedSettings>) -> Result<Json<Vec<String>>, AppError> {
    let changed = settings.refresh()?;
    Ok(Json(changed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use reservation_kernel::{shared::SettingsLoader, Settings};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn get_message(router: Router) -> String {
        let response = router
            .oneshot(Request::get("/message").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn returns_configured_message_verbatim() {
        let settings = SharedSettings::new(Settings {
            message: "  Hello, world!  ".to_string(),
            ..Settings::default()
        });
        let module = MessageModule::new(settings);

        assert_eq!(get_message(module.routes()).await, "  Hello, world!  ");
    }

    #[tokio::test]
    async fn live_update_is_served_without_rebuilding_router() {
        let settings = SharedSettings::new(Settings::default());
        let router = MessageModule::new(settings.clone()).routes();

        assert_eq!(get_message(router.clone()).await, "Hello default");
        settings.update(|s| s.message = "Hello updated".to_string());
        assert_eq!(get_message(router).await, "Hello updated");
    }

    #[tokio::test]
    async fn refresh_reloads_and_reports_changed_keys() {
        let loader: SettingsLoader = Arc::new(|| -> anyhow::Result<Settings> {
            Ok(Settings {
                message: "Hello refreshed".to_string(),
                ..Settings::default()
            })
        });
        let settings = SharedSettings::with_loader(Settings::default(), loader);
        let router = MessageModule::new(settings).routes();

        let response = router
            .clone()
            .oneshot(Request::post("/refresh").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let changed: Vec<String> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(changed, vec!["message"]);

        assert_eq!(get_message(router).await, "Hello refreshed");
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_value() {
        let loader: SettingsLoader = Arc::new(|| -> anyhow::Result<Settings> {
            anyhow::bail!("config file unreadable")
        });
        let settings = SharedSettings::with_loader(Settings::default(), loader);
        let router = MessageModule::new(settings).routes();

        let response = router
            .clone()
            .oneshot(Request::post("/refresh").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(get_message(router).await, "Hello default");
    }
}
