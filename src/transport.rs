use crate::message::Message;
use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

/// Asynchronous destination for rendered [`Message`]s.
///
/// Implementations deliver a notification to a concrete endpoint (a Slack
/// webhook, a test double, etc). [`crate::sink::SlackSink`] calls `send`
/// from a detached task and never awaits it on the application thread.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver a single notification.
    ///
    /// **Returns**
    /// - `Ok(())` if the endpoint accepted the message.
    /// - `Err(..)` on network errors, serialization errors or a non-2xx
    ///   status. The caller discards the error; it is never propagated
    ///   back into the logging pipeline.
    async fn send(&self, message: &Message) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// A transport that simply drops all messages.
///
/// Useful for measuring the overhead of flattening and rendering without
/// any network I/O.
#[derive(Clone, Default)]
pub struct NoopTransport;

#[async_trait]
impl Transport for NoopTransport {
    async fn send(&self, _message: &Message) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}

/// Keeps every delivered message in memory.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    messages: Arc<Mutex<Vec<Message>>>,
    delivered: Arc<Notify>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the messages received so far.
    pub async fn messages(&self) -> Vec<Message> {
        self.messages.lock().await.clone()
    }

    /// Wait until at least `count` messages arrived or `timeout` elapsed,
    /// returning whatever was received.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<Message> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.delivered.notified();
            {
                let messages = self.messages.lock().await;
                if messages.len() >= count {
                    return messages.clone();
                }
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.messages().await;
            }
        }
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, message: &Message) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.messages.lock().await.push(message.clone());
        self.delivered.notify_waiters();
        Ok(())
    }
}
