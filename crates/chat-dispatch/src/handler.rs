//! Chat handler trait and reply contract.

use regex::Captures;
use signald_client::Message;
use thiserror::Error;

/// A failure inside a chat handler.
///
/// The dispatcher logs the failure, skips the rest of the message's
/// processing, and moves on to the next inbound message; it never
/// propagates.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// What a handler wants sent back, and whether evaluation should stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Text routed back to the message's origin (group or sender).
    pub text: String,
    /// Stop evaluating later registrations for this message.
    pub stop: bool,
}

impl Reply {
    /// Reply and stop.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stop: true,
        }
    }

    /// Reply but keep evaluating later registrations against the same
    /// message.
    pub fn and_continue(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stop: false,
        }
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::text(text)
    }
}

/// A chat handler invoked when its pattern matches an inbound message.
///
/// Any closure with the right shape is a handler:
///
/// ```
/// use chat_dispatch::{HandlerError, Reply};
/// use regex::Captures;
/// use signald_client::Message;
///
/// let handler = |_message: &Message, _captures: &Captures<'_>| -> Result<Reply, HandlerError> {
///     Ok(Reply::text("pong"))
/// };
/// # let _ = &handler;
/// ```
pub trait ChatHandler: Send + Sync {
    /// Handle `message`, which matched with `captures`.
    fn handle(&self, message: &Message, captures: &Captures<'_>) -> Result<Reply, HandlerError>;
}

impl<F> ChatHandler for F
where
    F: Fn(&Message, &Captures<'_>) -> Result<Reply, HandlerError> + Send + Sync,
{
    fn handle(&self, message: &Message, captures: &Captures<'_>) -> Result<Reply, HandlerError> {
        self(message, captures)
    }
}
