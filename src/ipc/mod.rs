//! IPC via a Unix socket
//!
//! Client subcommands talk to the running daemon with length-prefixed JSON
//! over a Unix domain socket, one request and one response per connection.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use crate::constants::{ipc, paths};

mod messages;
pub use messages::{ControlRequest, ControlResponse};

/// Default socket path (XDG runtime dir with fallback to cache)
pub fn default_socket_path() -> Result<PathBuf> {
    let base = dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .context("Failed to determine runtime or cache directory (no XDG_RUNTIME_DIR or HOME)")?;
    Ok(base.join(paths::SOCKET_DIR).join(paths::SOCKET_FILE))
}

/// One connection to the daemon socket (either side)
pub struct ControlClient {
    stream: UnixStream,
}

impl ControlClient {
    /// Connect to the daemon at `path`
    pub fn connect_to(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path).context(format!(
            "Failed to connect to daemon at {} (is `screendim run` active?)",
            path.display()
        ))?;
        Self::from_stream(stream)
    }

    fn from_stream(stream: UnixStream) -> Result<Self> {
        stream
            .set_nonblocking(false)
            .context("Failed to make IPC stream blocking")?;
        stream
            .set_read_timeout(Some(ipc::CLIENT_TIMEOUT))
            .context("Failed to set IPC read timeout")?;
        stream
            .set_write_timeout(Some(ipc::CLIENT_TIMEOUT))
            .context("Failed to set IPC write timeout")?;
        Ok(Self { stream })
    }

    /// Send a request and wait for the response
    pub fn request(&mut self, req: &ControlRequest) -> Result<ControlResponse> {
        write_message(&mut self.stream, req)?;
        read_message(&mut self.stream)
    }

    /// Daemon side: read the client's request
    pub fn recv_request(&mut self) -> Result<ControlRequest> {
        read_message(&mut self.stream)
    }

    /// Daemon side: answer the client
    pub fn send_response(&mut self, resp: &ControlResponse) -> Result<()> {
        write_message(&mut self.stream, resp)
    }
}

/// Listening socket owned by the daemon
pub struct ControlServer {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl ControlServer {
    /// Bind at `socket_path`, replacing a stale socket left by a crashed daemon
    pub fn bind_to(socket_path: PathBuf) -> Result<Self> {
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create socket directory: {}", parent.display()))?;
        }

        if socket_path.exists() {
            if UnixStream::connect(&socket_path).is_ok() {
                return Err(anyhow!(
                    "Another daemon is already listening on {}",
                    socket_path.display()
                ));
            }
            std::fs::remove_file(&socket_path)
                .context(format!("Failed to remove stale socket: {}", socket_path.display()))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .context(format!("Failed to bind socket at {}", socket_path.display()))?;
        listener
            .set_nonblocking(true)
            .context("Failed to make IPC listener non-blocking")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o700))
                .context("Failed to set socket permissions")?;
        }

        Ok(Self {
            listener,
            socket_path,
        })
    }

    /// Accept one waiting connection, `None` when nobody is waiting
    pub fn try_accept(&self) -> Result<Option<ControlClient>> {
        match self.listener.accept() {
            Ok((stream, _addr)) => Ok(Some(ControlClient::from_stream(stream)?)),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e).context("Failed to accept IPC connection"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.socket_path
    }
}

impl AsFd for ControlServer {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.listener.as_fd()
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Write length-prefixed message to stream
fn write_message<T: Serialize, W: Write>(stream: &mut W, msg: &T) -> Result<()> {
    let json = serde_json::to_vec(msg).context("Failed to serialize message to JSON")?;
    if json.len() > ipc::MAX_MESSAGE_SIZE {
        return Err(anyhow!(
            "Message too large: {} bytes (max: {})",
            json.len(),
            ipc::MAX_MESSAGE_SIZE
        ));
    }

    // u32 little-endian length prefix
    let len = json.len() as u32;
    stream
        .write_all(&len.to_le_bytes())
        .context("Failed to write message length")?;
    stream
        .write_all(&json)
        .context("Failed to write message payload")?;
    stream.flush().context("Failed to flush stream")?;
    Ok(())
}

/// Read length-prefixed message from stream
fn read_message<T: for<'de> Deserialize<'de>, R: Read>(stream: &mut R) -> Result<T> {
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .context("Failed to read message length")?;
    let len = u32::from_le_bytes(len_buf) as usize;

    if len > ipc::MAX_MESSAGE_SIZE {
        return Err(anyhow!(
            "Message too large: {} bytes (max: {})",
            len,
            ipc::MAX_MESSAGE_SIZE
        ));
    }

    let mut json_buf = vec![0u8; len];
    stream
        .read_exact(&mut json_buf)
        .context("Failed to read message payload")?;
    serde_json::from_slice(&json_buf).context("Failed to deserialize message from JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    #[test]
    fn test_message_framing() {
        let mut buf = Vec::new();
        let req = ControlRequest::SetOpacity {
            name: "DP-1".into(),
            value: 0.4,
        };
        write_message(&mut buf, &req).unwrap();
        assert_eq!(&buf[..4], &((buf.len() - 4) as u32).to_le_bytes());

        let decoded: ControlRequest = read_message(&mut Cursor::new(buf)).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn test_oversized_message_rejected() {
        let mut buf = ((ipc::MAX_MESSAGE_SIZE + 1) as u32).to_le_bytes().to_vec();
        buf.extend_from_slice(b"{}");
        let result: Result<ControlRequest> = read_message(&mut Cursor::new(buf));
        assert!(result.unwrap_err().to_string().contains("too large"));
    }

    #[test]
    fn test_truncated_message_is_error() {
        let mut buf = 10u32.to_le_bytes().to_vec();
        buf.extend_from_slice(b"\"Pi");
        let result: Result<ControlRequest> = read_message(&mut Cursor::new(buf));
        assert!(result.is_err());
    }

    fn accept_within(server: &ControlServer, limit: Duration) -> ControlClient {
        let start = Instant::now();
        loop {
            if let Some(conn) = server.try_accept().unwrap() {
                return conn;
            }
            assert!(start.elapsed() < limit, "no client connected");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_request_response_over_socket() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run").join("control.sock");
        let server = ControlServer::bind_to(path.clone()).unwrap();
        assert!(server.try_accept().unwrap().is_none());

        let client = std::thread::spawn(move || {
            let mut client = ControlClient::connect_to(&path).unwrap();
            client.request(&ControlRequest::Ping).unwrap()
        });

        let mut conn = accept_within(&server, Duration::from_secs(5));
        assert_eq!(conn.recv_request().unwrap(), ControlRequest::Ping);
        conn.send_response(&ControlResponse::Pong).unwrap();

        assert_eq!(client.join().unwrap(), ControlResponse::Pong);
    }

    #[test]
    fn test_stale_socket_replaced_and_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("control.sock");

        // A socket file nobody listens on any more
        drop(UnixListener::bind(&path).unwrap());
        assert!(path.exists());

        let server = ControlServer::bind_to(path.clone()).unwrap();
        assert!(ControlServer::bind_to(path.clone()).is_err());
        drop(server);
        assert!(!path.exists());
    }
}
