//! Minimal ping/pong bot.
//!
//! Run with: cargo run --example ping_bot
//!
//! Configuration via .env file or environment variables:
//!   SIGNALD_USERNAME - the registered account (phone number), required
//!   SIGNALD_SOCKET   - daemon socket path (default /var/run/signald/signald.sock)

use std::env;

use chat_dispatch::{ChatDispatcher, HandlerError, Reply};
use regex::Captures;
use signald_client::{ClientConfig, DaemonAddress, Message, SignaldClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let username = env::var("SIGNALD_USERNAME")?;
    let config = match env::var("SIGNALD_SOCKET") {
        Ok(path) => ClientConfig::with_address(&username, DaemonAddress::unix(path)),
        Err(_) => ClientConfig::new(&username),
    };

    let mut dispatcher = ChatDispatcher::new(SignaldClient::new(config));
    dispatcher.register_handler(
        "^ping$",
        |_message: &Message, _captures: &Captures<'_>| -> Result<Reply, HandlerError> {
            Ok(Reply::text("pong"))
        },
    )?;

    println!("Dispatching chat messages for {username}. Press Ctrl+C to stop.");
    dispatcher
        .run_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
