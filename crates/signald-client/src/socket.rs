//! Socket transport for the signald control protocol.
//!
//! Frames are newline-delimited UTF-8 JSON objects in both directions.
//! Every command opens its own short-lived connection; the subscription
//! stream holds one long-lived connection.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, BufReader, ReadBuf};
use tokio::net::{TcpStream, UnixStream};

use crate::config::DaemonAddress;
use crate::error::ClientError;

/// A stream connection to the daemon, Unix or TCP.
#[derive(Debug)]
pub(crate) enum Connection {
    Unix(UnixStream),
    Tcp(TcpStream),
}

/// Open a new connection to `address`.
pub(crate) async fn connect(address: &DaemonAddress) -> Result<Connection, ClientError> {
    match address {
        DaemonAddress::Unix(path) => UnixStream::connect(path)
            .await
            .map(Connection::Unix)
            .map_err(ClientError::Connection),
        DaemonAddress::Tcp { host, port } => TcpStream::connect((host.as_str(), *port))
            .await
            .map(Connection::Tcp)
            .map_err(ClientError::Connection),
    }
}

/// Discard whatever the daemon may have pushed onto a fresh connection
/// before we write. A single receive attempt bounded by `window`; both the
/// drained bytes and a timeout are ignored, so this is safe when the
/// daemon stays quiet.
pub(crate) async fn drain_stale(conn: &mut Connection, window: Duration) {
    let mut scratch = [0u8; 1024];
    let _ = tokio::time::timeout(window, conn.read(&mut scratch)).await;
}

impl AsyncRead for Connection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Connection::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
            Connection::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            Connection::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
            Connection::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Connection::Unix(stream) => Pin::new(stream).poll_flush(cx),
            Connection::Tcp(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Connection::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
            Connection::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// Line-framing reader: one logical protocol frame per `\n`-delimited chunk.
pub(crate) struct LineReader {
    reader: BufReader<Connection>,
}

impl LineReader {
    pub(crate) fn new(conn: Connection) -> Self {
        Self {
            reader: BufReader::new(conn),
        }
    }

    /// Read the next frame, without its trailing delimiter.
    ///
    /// Fails with [`ClientError::ConnectionReset`] when the peer closes,
    /// including a close in the middle of an unterminated line.
    pub(crate) async fn next_line(&mut self) -> Result<Vec<u8>, ClientError> {
        let mut line = Vec::new();
        let read = self
            .reader
            .read_until(b'\n', &mut line)
            .await
            .map_err(ClientError::Connection)?;
        if read == 0 || line.pop() != Some(b'\n') {
            return Err(ClientError::ConnectionReset);
        }
        Ok(line)
    }
}
