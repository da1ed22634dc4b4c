//! Pattern-matched chat dispatch for signald bots.
//!
//! Register handlers against regular expressions, in priority order, and
//! let the dispatcher consume the subscription stream and route replies
//! back to the sender or group each message came from.
//!
//! # Example
//!
//! ```no_run
//! use chat_dispatch::{ChatDispatcher, HandlerError, Reply};
//! use regex::Captures;
//! use signald_client::{ClientConfig, Message, SignaldClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SignaldClient::new(ClientConfig::new("+15551234567"));
//! let mut dispatcher = ChatDispatcher::new(client);
//!
//! dispatcher.register_handler(
//!     "^ping$",
//!     |_message: &Message, _captures: &Captures<'_>| -> Result<Reply, HandlerError> {
//!         Ok(Reply::text("pong"))
//!     },
//! )?;
//!
//! dispatcher.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod dispatcher;
pub mod handler;

pub use dispatcher::{ChatDispatcher, DispatchError, HandlerId, IntoHandlerPattern, DEFAULT_ORDER};
pub use handler::{ChatHandler, HandlerError, Reply};

// Re-export the client types handlers interact with.
pub use signald_client::{ClientConfig, ClientError, DaemonAddress, Message, SignaldClient};

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
