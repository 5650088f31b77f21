//! Local-socket transport: one socket per bus scope.

use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;

use interprocess::local_socket::{prelude::*, GenericFilePath, ListenerOptions, Name};
use tracing::debug;

/// Send/receive timeout of the substrate. Calls are never given their own.
const CALL_TIMEOUT: Duration = Duration::from_secs(25);

fn socket_name(path: &Path) -> io::Result<Name<'_>> {
    path.to_fs_name::<GenericFilePath>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

/// Listen on `path` the way the daemon does, taking over any leftover
/// socket file. Used by stub daemons in integration tests; the client
/// itself never listens.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created, an existing
/// file cannot be removed, or the socket cannot be bound.
#[doc(hidden)]
pub fn bind_async(path: &Path) -> io::Result<interprocess::local_socket::tokio::Listener> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }
    ListenerOptions::new().name(socket_name(path)?).create_tokio()
}

/// Client end of one scope's bus socket.
pub struct Stream(interprocess::local_socket::Stream);

impl Stream {
    /// Connect to the bus socket at `path` with the substrate timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error naming `path` if nothing is listening there.
    pub fn connect(path: &Path) -> io::Result<Self> {
        let stream = interprocess::local_socket::Stream::connect(socket_name(path)?)
            .map_err(|e| io::Error::new(e.kind(), format!("{}: {e}", path.display())))?;
        let timeouts = stream
            .set_recv_timeout(Some(CALL_TIMEOUT))
            .and_then(|()| stream.set_send_timeout(Some(CALL_TIMEOUT)));
        if let Err(e) = timeouts {
            debug!(path = %path.display(), %e, "socket timeouts not applied");
        }
        Ok(Self(stream))
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}
