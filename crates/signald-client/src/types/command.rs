//! Outbound commands and their correlated responses.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A command envelope body, tagged by the wire `type`.
///
/// The correlation `id` is not part of the command; it is injected by
/// [`SignaldClient::send_command`](crate::SignaldClient::send_command) at
/// send time.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Register the account. Verification arrives by SMS, or by voice call
    /// when `voice` is set.
    Register { username: String, voice: bool },

    /// Verify the account with the code received after registration.
    Verify { username: String, code: String },

    /// List the groups the account is a member of.
    ListGroups { username: String },

    /// Leave a group.
    LeaveGroup {
        username: String,
        #[serde(rename = "recipientGroupId")]
        recipient_group_id: String,
    },

    /// Mark messages as read, identified by their send timestamps.
    MarkRead {
        username: String,
        #[serde(rename = "recipientAddress")]
        recipient_address: String,
        timestamps: Vec<u64>,
    },

    /// Send a text message to a recipient or a group.
    Send {
        username: String,
        #[serde(rename = "recipientAddress", skip_serializing_if = "Option::is_none")]
        recipient_address: Option<String>,
        #[serde(rename = "recipientGroupId", skip_serializing_if = "Option::is_none")]
        recipient_group_id: Option<String>,
        #[serde(rename = "messageBody")]
        message_body: String,
    },

    /// Open the inbound event subscription on the current connection.
    Subscribe { username: String },
}

impl Command {
    /// Serialize into the JSON object accepted by
    /// [`SignaldClient::send_command`](crate::SignaldClient::send_command).
    pub fn payload(&self) -> Result<Map<String, Value>, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => unreachable!("commands serialize to objects"),
        }
    }
}

/// A response envelope correlated to a command by `id`.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Wire `type` of the response; `"unexpected_error"` marks a failed
    /// command.
    #[serde(rename = "type")]
    pub kind: String,

    /// Correlation token echoed from the request.
    #[serde(default)]
    pub id: String,

    /// Type-specific payload.
    #[serde(default)]
    pub data: Value,
}
