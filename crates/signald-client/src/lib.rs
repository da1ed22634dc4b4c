//! signald daemon client library.
//!
//! This crate speaks the signald control protocol: newline-delimited JSON
//! objects over a local Unix domain socket (or a TCP endpoint). It
//! supports:
//!
//! - Registering and verifying a phone-number identity
//! - Sending messages to individuals and groups
//! - Receiving messages over a long-lived subscription connection
//!
//! # Example
//!
//! ```no_run
//! use signald_client::{ClientConfig, SignaldClient};
//!
//! # async fn example() -> Result<(), signald_client::ClientError> {
//! let client = SignaldClient::new(ClientConfig::new("+15551234567"));
//!
//! // Send a message
//! let _response = client.send_message("+15557654321", "Hello!").await?;
//!
//! // Subscribe to incoming messages
//! let mut messages = client.receive_messages().await?;
//! loop {
//!     let message = messages.next_message().await?;
//!     println!("From {}: {}", message.source, message.text);
//! }
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
mod socket;
pub mod stream;
pub mod types;

pub use client::SignaldClient;
pub use config::{ClientConfig, DaemonAddress, DEFAULT_SOCKET_PATH};
pub use error::ClientError;
pub use stream::MessageStream;
pub use types::{Attachment, Command, GroupInfo, Message, Response};

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
