//! Inbound channel consumer: persists each received name as a reservation.

use std::sync::Arc;

use reservation_db::{DbError, Reservation, ReservationRepository};
use reservation_events::{Inbox, Message};
use tokio::sync::watch;

/// Consumer lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// Waiting for the next inbound message
    Idle,
    /// Persisting a received message
    Processing,
}

/// Outcome of handling one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accepted {
    Created(Reservation),
    /// The message id was processed before; nothing was written
    Duplicate,
}

/// Single-task consumer of the reservation channel.
///
/// Messages are handled one at a time. Persistence goes through
/// [`ReservationRepository::create_once`], so redelivered messages are
/// absorbed rather than duplicated.
pub struct ReservationConsumer {
    repository: Arc<dyn ReservationRepository>,
    state: watch::Sender<ConsumerState>,
}

impl ReservationConsumer {
    pub fn new(repository: Arc<dyn ReservationRepository>) -> Self {
        let (state, _) = watch::channel(ConsumerState::Idle);
        Self { repository, state }
    }

    /// Observe state transitions
    pub fn subscribe(&self) -> watch::Receiver<ConsumerState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ConsumerState {
        *self.state.borrow()
    }

    /// Persist one message
    pub async fn accept(&self, message: &Message) -> Result<Accepted, DbError> {
        let created = self
            .repository
            .create_once(&message.id.to_string(), &message.payload)
            .await?;

        Ok(match created {
            Some(reservation) => Accepted::Created(reservation),
            None => Accepted::Duplicate,
        })
    }

    /// Drain `inbox` until every sender is dropped.
    ///
    /// A persistence fault drops the message after logging it.
    pub async fn run(self, mut inbox: Inbox) {
        tracing::info!("reservation consumer started");

        while let Some(message) = inbox.recv().await {
            self.state.send_replace(ConsumerState::Processing);

            match self.accept(&message).await {
                Ok(Accepted::Created(reservation)) => {
                    tracing::info!(message_id = %message.id, %reservation, "reservation accepted");
                }
                Ok(Accepted::Duplicate) => {
                    tracing::debug!(message_id = %message.id, "duplicate delivery ignored");
                }
                Err(e) => {
                    tracing::error!(
                        message_id = %message.id,
                        error = %e,
                        "failed to persist reservation, dropping message"
                    );
                }
            }

            self.state.send_replace(ConsumerState::Idle);
        }

        tracing::info!("reservation consumer stopped");
    }
}
