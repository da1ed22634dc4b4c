//! Send a single message from the command line.
//!
//! Run with: cargo run --example send_message -- <recipient> <text..>
//!
//! Configuration via .env file or environment variables:
//!   SIGNALD_USERNAME - the registered account (phone number), required
//!   SIGNALD_SOCKET   - daemon socket path (default /var/run/signald/signald.sock)

use std::env;

use signald_client::{ClientConfig, DaemonAddress, SignaldClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    let mut args = env::args().skip(1);
    let recipient = args.next().ok_or("usage: send_message <recipient> <text..>")?;
    let text = args.collect::<Vec<_>>().join(" ");

    let username = env::var("SIGNALD_USERNAME")?;
    let config = match env::var("SIGNALD_SOCKET") {
        Ok(path) => ClientConfig::with_address(&username, DaemonAddress::unix(path)),
        Err(_) => ClientConfig::new(&username),
    };

    let client = SignaldClient::new(config);
    match client.send_message(&recipient, &text).await? {
        Some(response) => println!("Daemon acknowledged: {}", response.kind),
        None => println!("No confirmation within the response window."),
    }

    Ok(())
}
