//! Long-lived subscription stream of inbound messages.

use futures::stream::Stream;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::client::SignaldClient;
use crate::error::ClientError;
use crate::socket::{self, LineReader};
use crate::types::{Command, Message};

impl SignaldClient {
    /// Open the subscription connection and start streaming inbound
    /// messages.
    ///
    /// The connection is exclusive to the returned stream and stays open
    /// until it fails; resubscribing after a connection error is the
    /// caller's decision.
    pub async fn receive_messages(&self) -> Result<MessageStream, ClientError> {
        let mut conn = socket::connect(&self.config().address).await?;
        let command = Command::Subscribe {
            username: self.config().username.clone(),
        };
        let mut frame = serde_json::to_vec(&command)?;
        frame.push(b'\n');
        conn.write_all(&frame).await.map_err(ClientError::Connection)?;
        conn.flush().await.map_err(ClientError::Connection)?;
        info!("subscribed to inbound messages for {}", self.config().username);
        Ok(MessageStream {
            lines: LineReader::new(conn),
        })
    }
}

/// A stream of normalized inbound [`Message`]s.
///
/// Created by [`SignaldClient::receive_messages`].
pub struct MessageStream {
    lines: LineReader,
}

impl MessageStream {
    /// Wait for the next chat message.
    ///
    /// Irrelevant frames are skipped: events whose type is not `"message"`,
    /// typing indicators, and lines that are not valid JSON (the latter are
    /// logged). A message event that fails normalization surfaces as
    /// [`ClientError::Envelope`] and leaves the stream usable;
    /// [`ClientError::ConnectionReset`] and [`ClientError::Connection`] are
    /// terminal.
    pub async fn next_message(&mut self) -> Result<Message, ClientError> {
        loop {
            let line = self.lines.next_line().await?;
            match decode_frame(&line)? {
                Some(message) => {
                    debug!("received message from {}", message.source);
                    return Ok(message);
                }
                None => continue,
            }
        }
    }

    /// Adapt into a [`futures::Stream`].
    ///
    /// Envelope errors are yielded inline; a connection error is yielded
    /// once and then the stream ends.
    pub fn into_stream(self) -> impl Stream<Item = Result<Message, ClientError>> + Send {
        futures::stream::unfold(Some(self), |state| async move {
            let mut stream = state?;
            match stream.next_message().await {
                Ok(message) => Some((Ok(message), Some(stream))),
                Err(err) if err.is_connection() => Some((Err(err), None)),
                Err(err) => Some((Err(err), Some(stream))),
            }
        })
    }
}

/// Decode one subscription frame. `Ok(None)` means the frame is not a chat
/// message and was skipped.
fn decode_frame(line: &[u8]) -> Result<Option<Message>, ClientError> {
    let value: Value = match serde_json::from_slice(line) {
        Ok(value) => value,
        Err(err) => {
            warn!("skipping invalid JSON frame: {}", err);
            return Ok(None);
        }
    };

    if value.get("type").and_then(Value::as_str) != Some("message") {
        return Ok(None);
    }

    let data = value.get("data").cloned().unwrap_or(Value::Null);
    // Typing notifications arrive as message events with a `typing` key.
    if data.get("typing").is_some() {
        return Ok(None);
    }

    Message::from_event_data(data).map(Some)
}
