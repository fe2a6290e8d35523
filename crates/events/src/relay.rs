use std::time::Duration;

use async_trait::async_trait;

use crate::{ChannelError, Message, MessageChannel};

/// Path on the backing service that accepts relayed messages.
pub const INBOUND_PATH: &str = "/channel/input";

/// Channel that forwards each message to a remote inbound endpoint.
///
/// Used when the gateway and the backing service run as separate
/// processes. The remote side acknowledges with a 2xx once the message is
/// queued, not once it is persisted.
#[derive(Debug, Clone)]
pub struct HttpRelayChannel {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRelayChannel {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MessageChannel for HttpRelayChannel {
    async fn send(&self, message: Message) -> Result<(), ChannelError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                endpoint = %self.endpoint,
                message_id = %message.id,
                status = status.as_u16(),
                "relay rejected message"
            );
            return Err(ChannelError::Rejected(status.as_u16()));
        }

        tracing::debug!(endpoint = %self.endpoint, message_id = %message.id, "message relayed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use std::sync::{Arc, Mutex};

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}{INBOUND_PATH}")
    }

    #[tokio::test]
    async fn relays_message_json() {
        let received: Arc<Mutex<Vec<Message>>> = Arc::default();
        let router = Router::new()
            .route(
                INBOUND_PATH,
                post(
                    |State(store): State<Arc<Mutex<Vec<Message>>>>, Json(m): Json<Message>| async move {
                        store.lock().unwrap().push(m);
                        StatusCode::ACCEPTED
                    },
                ),
            )
            .with_state(received.clone());
        let endpoint = spawn(router).await;

        let channel = HttpRelayChannel::new(endpoint, Duration::from_secs(5)).unwrap();
        let message = Message::new("Dr Nicolas");
        channel.send(message.clone()).await.unwrap();

        assert_eq!(*received.lock().unwrap(), vec![message]);
    }

    #[tokio::test]
    async fn non_success_status_is_rejected() {
        let router = Router::new().route(
            INBOUND_PATH,
            post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let endpoint = spawn(router).await;

        let channel = HttpRelayChannel::new(endpoint, Duration::from_secs(5)).unwrap();
        let err = channel.send(Message::new("x")).await.unwrap_err();
        assert!(matches!(err, ChannelError::Rejected(503)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let channel = HttpRelayChannel::new(
            format!("http://{addr}{INBOUND_PATH}"),
            Duration::from_secs(2),
        )
        .unwrap();
        let err = channel.send(Message::new("x")).await.unwrap_err();
        assert!(matches!(err, ChannelError::Transport(_)));
    }
}
