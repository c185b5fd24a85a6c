//! IPC (Inter-Process Communication) via Unix sockets
//!
//! Carries `changeConfig` events from the control panel to the tray process.
//! Uses length-prefixed JSON over Unix domain sockets. Delivery is
//! at-most-once: a failed send is logged and dropped.

use anyhow::{Context, Result, ensure};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::constants::{events, ipc::MAX_MESSAGE_SIZE, ipc::SOCKET_PATH, ipc::WRITE_TIMEOUT_MS};

mod messages;
pub use messages::{NamedEvent, TransportConfig};

/// `$XDG_RUNTIME_DIR/mouse-macros/tray.sock`, or under the cache dir without one
pub fn default_socket_path() -> Result<PathBuf> {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return Ok(PathBuf::from(runtime_dir).join(SOCKET_PATH));
    }

    // Fallback to cache dir
    let cache = dirs::cache_dir()
        .context("Failed to determine cache directory (no XDG_RUNTIME_DIR or HOME)")?;
    Ok(cache.join(SOCKET_PATH))
}

/// Destination for named tray events
pub trait TraySink {
    fn emit(&mut self, event: &str, payload: &TransportConfig) -> Result<()>;
}

/// Send `changeConfig` toward the tray; fire-and-forget
pub fn publish(sink: &mut dyn TraySink, config: &TransportConfig) {
    match sink.emit(events::CHANGE_CONFIG, config) {
        Ok(()) => debug!(
            active_variant = config.config.active_variant,
            active_script = config.active_script,
            "Published tray config"
        ),
        Err(e) => warn!(error = ?e, "Failed to publish tray config"),
    }
}

/// One end of a tray connection
///
/// The control panel holds the sending end, the tray process gets a
/// receiving end from `TrayServer::accept`.
pub struct TrayClient {
    stream: UnixStream,
}

impl TrayClient {
    pub fn connect_to(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path)
            .with_context(|| format!("Tray socket {} not reachable", path.display()))?;
        stream
            .set_write_timeout(Some(Duration::from_millis(WRITE_TIMEOUT_MS)))
            .context("Failed to set tray write timeout")?;
        Ok(Self { stream })
    }

    /// Block until the next frame arrives
    pub fn recv_event(&mut self) -> Result<NamedEvent<TransportConfig>> {
        read_frame(&mut self.stream)
    }
}

impl TraySink for TrayClient {
    fn emit(&mut self, event: &str, payload: &TransportConfig) -> Result<()> {
        write_frame(
            &mut self.stream,
            &NamedEvent {
                event: event.to_string(),
                payload,
            },
        )
    }
}

/// Listening socket of the tray process; the socket file is removed on drop
pub struct TrayServer {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl TrayServer {
    /// Bind at `socket_path`, replacing a stale socket left by a crashed tray
    pub fn bind_to(socket_path: PathBuf) -> Result<Self> {
        use std::os::unix::fs::PermissionsExt;

        if let Some(dir) = socket_path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create tray socket dir {}", dir.display()))?;
        }
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)
                .with_context(|| format!("Cannot remove stale tray socket {}", socket_path.display()))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("Cannot bind tray socket {}", socket_path.display()))?;
        std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o700))
            .context("Cannot restrict tray socket to owner")?;

        debug!(socket = %socket_path.display(), "Tray socket bound");
        Ok(Self {
            listener,
            socket_path,
        })
    }

    /// Wait for the control panel to connect
    pub fn accept(&self) -> Result<TrayClient> {
        let (stream, _) = self.listener.accept().context("Tray accept failed")?;
        Ok(TrayClient { stream })
    }

    pub fn path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for TrayServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Frame layout: u32 little-endian length, then that many bytes of JSON
fn write_frame<T: Serialize>(mut out: impl Write, frame: &T) -> Result<()> {
    let body = serde_json::to_vec(frame).context("Cannot encode tray frame")?;
    ensure!(
        body.len() <= MAX_MESSAGE_SIZE,
        "Tray frame of {} bytes exceeds {MAX_MESSAGE_SIZE}",
        body.len()
    );

    let mut buf = Vec::with_capacity(4 + body.len());
    buf.extend_from_slice(&(body.len() as u32).to_le_bytes());
    buf.extend_from_slice(&body);
    out.write_all(&buf).context("Tray frame write failed")?;
    out.flush().context("Tray frame flush failed")
}

fn read_frame<T: DeserializeOwned>(mut input: impl Read) -> Result<T> {
    let mut header = [0u8; 4];
    input.read_exact(&mut header).context("Tray frame header read failed")?;
    let len = u32::from_le_bytes(header) as usize;
    // Checked before allocating
    ensure!(len <= MAX_MESSAGE_SIZE, "Tray frame of {len} bytes exceeds {MAX_MESSAGE_SIZE}");

    let mut body = vec![0u8; len];
    input.read_exact(&mut body).context("Tray frame body read failed")?;
    serde_json::from_slice(&body).context("Cannot decode tray frame")
}
