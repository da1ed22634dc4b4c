//! Inbound message types from the signald subscription stream.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ClientError;

/// Group metadata attached to a message.
///
/// `group_id` is present when the message came through a group; any other
/// keys the daemon includes are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GroupInfo {
    /// True when no group metadata was present on the wire.
    pub fn is_empty(&self) -> bool {
        self.group_id.is_none() && self.extra.is_empty()
    }
}

/// An attachment carried by an inbound message.
///
/// All four fields are required on the wire; an event missing one fails
/// normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// MIME type.
    pub content_type: String,
    /// Attachment identifier assigned by the daemon.
    pub id: String,
    /// Size in bytes.
    pub size: u64,
    /// Where the daemon stored the attachment on disk.
    pub stored_filename: String,
}

/// A normalized inbound chat message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The account that received the message.
    #[serde(default)]
    pub username: String,

    /// Sender identifier (phone number).
    #[serde(default)]
    pub source: String,

    /// Message body; empty when the event carried none.
    #[serde(default)]
    pub text: String,

    /// Device the sender used.
    #[serde(default)]
    pub source_device: u32,

    /// Milliseconds since epoch, when the daemon provided one.
    #[serde(default)]
    pub timestamp: Option<u64>,

    /// ISO-8601 rendering of the timestamp, when provided.
    #[serde(default)]
    pub timestamp_iso: Option<String>,

    /// Group metadata; empty for direct messages.
    #[serde(default)]
    pub group_info: GroupInfo,

    /// Attachments in wire order.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// The `data` object of a `"message"` event as it appears on the wire.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventData {
    #[serde(default)]
    username: String,

    #[serde(default)]
    source: String,

    #[serde(default)]
    source_device: u32,

    #[serde(default, rename = "timestampISO")]
    timestamp_iso: Option<String>,

    #[serde(default)]
    data_message: Option<DataMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataMessage {
    #[serde(default)]
    body: Option<String>,

    #[serde(default)]
    timestamp: Option<u64>,

    #[serde(default)]
    group: GroupInfo,

    #[serde(default)]
    attachments: Vec<Attachment>,
}

impl Message {
    /// Normalize the `data` object of a `"message"` event.
    pub(crate) fn from_event_data(data: Value) -> Result<Self, ClientError> {
        let event: EventData = serde_json::from_value(data).map_err(ClientError::Envelope)?;
        let data_message = event.data_message.unwrap_or_default();
        Ok(Message {
            username: event.username,
            source: event.source,
            text: data_message.body.unwrap_or_default(),
            source_device: event.source_device,
            timestamp: data_message.timestamp,
            timestamp_iso: event.timestamp_iso,
            group_info: data_message.group,
            attachments: data_message.attachments,
        })
    }
}
