use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{ChannelError, Message, MessageChannel};

/// Create an unbounded FIFO channel and its receiving end.
pub fn in_memory() -> (InMemoryChannel, Inbox) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (InMemoryChannel { sender }, Inbox { receiver })
}

/// Sending half of an in-process channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct InMemoryChannel {
    sender: mpsc::UnboundedSender<Message>,
}

#[async_trait]
impl MessageChannel for InMemoryChannel {
    async fn send(&self, message: Message) -> Result<(), ChannelError> {
        let id = message.id;
        self.sender.send(message).map_err(|_| ChannelError::Closed)?;
        tracing::debug!(message_id = %id, "message enqueued");
        Ok(())
    }
}

/// Receiving half of an in-process channel.
#[derive(Debug)]
pub struct Inbox {
    receiver: mpsc::UnboundedReceiver<Message>,
}

impl Inbox {
    /// Wait for the next message; `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    /// Take a message if one is already queued.
    pub fn try_recv(&mut self) -> Option<Message> {
        self.receiver.try_recv().ok()
    }
}
