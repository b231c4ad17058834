//! Stream event system for async event handling.
//!
//! Events are emitted by the executor while a stream runs and can be
//! received asynchronously by the caller.

use std::fmt;
use tokio::sync::broadcast;

/// Events emitted by the executor during a stream's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The stream task started pulling.
    Started,

    /// A batch was served by the source adapter.
    Batch {
        /// Number of elements in the batch.
        len: usize,
    },

    /// The stream completed normally.
    Eos,

    /// The stream terminated with an error.
    Error {
        /// The error message.
        message: String,
    },

    /// The stream was cancelled before a terminal signal.
    Cancelled,
}

impl fmt::Display for StreamEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamEvent::Started => write!(f, "Stream started"),
            StreamEvent::Batch { len } => write!(f, "Batch of {} elements", len),
            StreamEvent::Eos => write!(f, "EOS"),
            StreamEvent::Error { message } => write!(f, "Error: {}", message),
            StreamEvent::Cancelled => write!(f, "Stream cancelled"),
        }
    }
}

/// Sender for stream events.
#[derive(Clone)]
pub struct EventSender {
    sender: broadcast::Sender<StreamEvent>,
}

impl EventSender {
    /// Create a new event sender with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Send an event.
    ///
    /// Returns the number of receivers that received the event.
    /// Returns 0 if there are no receivers (which is fine).
    pub fn send(&self, event: StreamEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Send an EOS event.
    pub fn send_eos(&self) {
        self.send(StreamEvent::Eos);
    }

    /// Send an error event.
    pub fn send_error(&self, message: impl Into<String>) {
        self.send(StreamEvent::Error {
            message: message.into(),
        });
    }

    /// Create a receiver for events.
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for EventSender {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Receiver for stream events.
pub struct EventReceiver {
    receiver: broadcast::Receiver<StreamEvent>,
}

impl EventReceiver {
    /// Receive the next event.
    ///
    /// Returns `None` if the sender has been dropped.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::trace!("event receiver lagged, skipped {} events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&mut self) -> Option<StreamEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    /// Wait for the stream's terminal event.
    ///
    /// Returns `Ok(())` on EOS, `Err(message)` on error or cancellation.
    pub async fn wait_eos(&mut self) -> Result<(), String> {
        while let Some(event) = self.recv().await {
            match event {
                StreamEvent::Eos => return Ok(()),
                StreamEvent::Error { message } => return Err(message),
                StreamEvent::Cancelled => return Err("stream cancelled".to_string()),
                _ => continue,
            }
        }
        Err("Event channel closed unexpectedly".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_send_recv() {
        let sender = EventSender::new(16);
        let mut receiver = sender.subscribe();

        sender.send_eos();

        let event = receiver.recv().await.unwrap();
        assert_eq!(event, StreamEvent::Eos);
    }

    #[tokio::test]
    async fn test_wait_eos() {
        let sender = EventSender::new(16);
        let mut receiver = sender.subscribe();

        let sender_clone = sender.clone();
        tokio::spawn(async move {
            sender_clone.send(StreamEvent::Started);
            sender_clone.send(StreamEvent::Batch { len: 3 });
            sender_clone.send_eos();
        });

        assert!(receiver.wait_eos().await.is_ok());
    }

    #[tokio::test]
    async fn test_wait_eos_error() {
        let sender = EventSender::new(16);
        let mut receiver = sender.subscribe();

        sender.send_error("reset");

        assert_eq!(receiver.wait_eos().await, Err("reset".to_string()));
    }

    #[test]
    fn test_send_without_receivers() {
        let sender = EventSender::default();
        assert_eq!(sender.send(StreamEvent::Started), 0);
    }

    #[test]
    fn test_event_display() {
        assert_eq!(StreamEvent::Batch { len: 2 }.to_string(), "Batch of 2 elements");
        assert_eq!(StreamEvent::Eos.to_string(), "EOS");
    }
}
