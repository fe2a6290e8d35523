//! Message channel primitives.
//!
//! A [`MessageChannel`] carries a bare string payload (the reservation name)
//! from the gateway to the backing service's consumer.
//!
//! # Delivery contract
//!
//! Channels deliver **at least once** and preserve **per-producer order**.
//! A message may therefore arrive more than once; consumers must treat
//! [`Message::id`] as an idempotency key and ignore ids they have already
//! processed. No other header is meaningful to application logic.

mod memory;
mod relay;

pub use memory::{in_memory, InMemoryChannel, Inbox};
pub use relay::{HttpRelayChannel, INBOUND_PATH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::{Timestamp, Uuid};

/// Envelope travelling over a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Idempotency key, time-ordered
    pub id: Uuid,
    /// Bare reservation name
    pub payload: String,
}

impl Message {
    /// Build a message with a fresh id
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v7(Timestamp::now(uuid::NoContext)),
            payload: payload.into(),
        }
    }
}

/// Channel failures surfaced to the sender.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel is closed")]
    Closed,

    #[error("relay transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("relay rejected message with status {0}")]
    Rejected(u16),
}

/// Outbound side of a channel.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Make exactly one attempt to enqueue `message`
    async fn send(&self, message: Message) -> Result<(), ChannelError>;
}
