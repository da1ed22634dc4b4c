//! Configuration types for signald-client.

use std::path::PathBuf;
use std::time::Duration;

/// Default filesystem path of the signald control socket.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/signald/signald.sock";

/// Where the daemon listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonAddress {
    /// Local Unix domain socket path.
    Unix(PathBuf),
    /// TCP endpoint, for daemons exposed over the network.
    Tcp { host: String, port: u16 },
}

impl DaemonAddress {
    /// Address of a Unix domain socket at `path`.
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        DaemonAddress::Unix(path.into())
    }

    /// Address of a TCP endpoint.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        DaemonAddress::Tcp {
            host: host.into(),
            port,
        }
    }
}

impl Default for DaemonAddress {
    fn default() -> Self {
        DaemonAddress::Unix(PathBuf::from(DEFAULT_SOCKET_PATH))
    }
}

/// Configuration for connecting to the signald daemon.
///
/// Immutable for the lifetime of a client instance.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// The registered account (phone number in E.164 format).
    pub username: String,
    /// The daemon socket address.
    pub address: DaemonAddress,
    /// How long a blocking command waits for its correlated response
    /// before giving up with no response.
    pub response_timeout: Duration,
    /// Receive window for the stale-buffer drain performed on each fresh
    /// command connection before the request is written.
    pub drain_window: Duration,
}

impl ClientConfig {
    /// Create a configuration for `username` against the default socket path.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            address: DaemonAddress::default(),
            response_timeout: Duration::from_secs(3),
            drain_window: Duration::from_millis(50),
        }
    }

    /// Create a configuration with an explicit daemon address.
    pub fn with_address(username: impl Into<String>, address: DaemonAddress) -> Self {
        Self {
            address,
            ..Self::new(username)
        }
    }
}
