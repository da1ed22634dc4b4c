//! Command protocol client for the signald daemon.

use rand::Rng;
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::socket::{self, LineReader};
use crate::types::{Command, Response};

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ID_LEN: usize = 10;

/// Generate a correlation token from `rng`.
fn correlation_id<R: Rng>(rng: &mut R) -> String {
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

fn describe_error(data: &Value) -> String {
    data.get("message")
        .and_then(Value::as_str)
        .unwrap_or("unexpected error occurred")
        .to_string()
}

/// Client for the signald control socket.
///
/// Every command opens its own connection, closed again when the call
/// returns; there is no pooling. Cloning is cheap and clones share nothing
/// but configuration.
#[derive(Debug, Clone)]
pub struct SignaldClient {
    config: ClientConfig,
}

impl SignaldClient {
    /// Create a client for the account in `config`. No connection is opened
    /// until the first command.
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn username(&self) -> String {
        self.config.username.clone()
    }

    /// Send a raw command payload.
    ///
    /// A fresh correlation `id` is injected into `payload`, overwriting any
    /// present, and whatever the daemon already pushed onto the new
    /// connection is drained before the payload is written as one
    /// newline-terminated JSON object.
    ///
    /// With `block`, response lines are scanned until one carries the
    /// correlation id, both as a substring and as the parsed `id` field, or
    /// until [`ClientConfig::response_timeout`] expires; no match within the
    /// deadline is `Ok(None)`, not an error. A correlated `unexpected_error`
    /// envelope fails with [`ClientError::Protocol`].
    ///
    /// Without `block` the call returns right after the write; nothing is
    /// read back, so the daemon's verdict is never surfaced.
    pub async fn send_command(
        &self,
        mut payload: Map<String, Value>,
        block: bool,
    ) -> Result<Option<Response>, ClientError> {
        let mut conn = socket::connect(&self.config.address).await?;
        let id = correlation_id(&mut rand::thread_rng());
        payload.insert("id".to_string(), Value::String(id.clone()));

        socket::drain_stale(&mut conn, self.config.drain_window).await;

        let mut frame = serde_json::to_vec(&payload)?;
        frame.push(b'\n');
        debug!(
            "sending {} command (id={})",
            payload.get("type").and_then(|v| v.as_str()).unwrap_or("?"),
            id
        );
        conn.write_all(&frame).await.map_err(ClientError::Connection)?;
        conn.flush().await.map_err(ClientError::Connection)?;

        if !block {
            return Ok(None);
        }

        let mut lines = LineReader::new(conn);
        let scan = async {
            loop {
                let line = match lines.next_line().await {
                    Ok(line) => line,
                    // The daemon closing before a correlated line counts as
                    // "no response", the same as the deadline expiring.
                    Err(ClientError::ConnectionReset) => return Ok(None),
                    Err(err) => return Err(err),
                };
                if !contains(&line, id.as_bytes()) {
                    continue;
                }
                let Ok(response) = serde_json::from_slice::<Response>(&line) else {
                    continue;
                };
                if response.id != id {
                    continue;
                }
                if response.kind == "unexpected_error" {
                    return Err(ClientError::Protocol(describe_error(&response.data)));
                }
                return Ok(Some(response));
            }
        };
        match tokio::time::timeout(self.config.response_timeout, scan).await {
            Ok(result) => result,
            Err(_) => Ok(None),
        }
    }

    /// Register this client's number with the service.
    ///
    /// `voice` selects a voice call instead of an SMS for verification.
    pub async fn register(&self, voice: bool) -> Result<Option<Response>, ClientError> {
        let command = Command::Register {
            username: self.username(),
            voice,
        };
        self.send_command(command.payload()?, true).await
    }

    /// Verify the number with the code received after
    /// [`register`](Self::register).
    pub async fn verify(&self, code: impl Into<String>) -> Result<Option<Response>, ClientError> {
        let command = Command::Verify {
            username: self.username(),
            code: code.into(),
        };
        self.send_command(command.payload()?, true).await
    }

    /// List the groups this account is a member of.
    pub async fn get_group_list(&self) -> Result<Option<Response>, ClientError> {
        let command = Command::ListGroups {
            username: self.username(),
        };
        self.send_command(command.payload()?, true).await
    }

    /// Leave a group. Fire-and-forget.
    ///
    /// `group_id` is the base64 group identifier.
    pub async fn leave_group(&self, group_id: impl Into<String>) -> Result<(), ClientError> {
        let command = Command::LeaveGroup {
            username: self.username(),
            recipient_group_id: group_id.into(),
        };
        self.send_command(command.payload()?, false).await.map(drop)
    }

    /// Mark messages as read. Fire-and-forget.
    ///
    /// `timestamps` are the `timestamp` values of the messages being acked.
    pub async fn mark_read(
        &self,
        recipient: impl Into<String>,
        timestamps: &[u64],
    ) -> Result<(), ClientError> {
        let command = Command::MarkRead {
            username: self.username(),
            recipient_address: recipient.into(),
            timestamps: timestamps.to_vec(),
        };
        self.send_command(command.payload()?, false).await.map(drop)
    }

    /// Send a direct message and wait for the daemon's verdict.
    pub async fn send_message(
        &self,
        recipient: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<Option<Response>, ClientError> {
        let command = Command::Send {
            username: self.username(),
            recipient_address: Some(recipient.into()),
            recipient_group_id: None,
            message_body: text.into(),
        };
        self.send_command(command.payload()?, true).await
    }

    /// Send a message to a group. Fire-and-forget.
    pub async fn send_group_message(
        &self,
        group_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<(), ClientError> {
        let command = Command::Send {
            username: self.username(),
            recipient_address: None,
            recipient_group_id: Some(group_id.into()),
            message_body: text.into(),
        };
        self.send_command(command.payload()?, false).await.map(drop)
    }
}
