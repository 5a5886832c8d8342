//! Connection management for the mpv socket
//!
//! mpv only creates its IPC socket while it is running, and recreates it on
//! every start. Rather than polling, `SocketConnector` watches the socket's
//! parent directory and only retries a connection when an entry with the
//! socket's file name is created there.
//!
//! ## Reconnection Logic
//!
//! - The directory watch is registered when the connector is built, before
//!   the first connection attempt, so a socket created in between is never
//!   missed
//! - Pending watch events are drained before each attempt; a failed attempt
//!   then blocks until a new creation event for the socket arrives
//! - After each wake-up the connector sleeps for the configured retry delay
//!   (mpv briefly refuses connections right after creating the socket)
//! - Retries are unbounded: `acquire()` only returns with a live stream

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::error::IpcError;

/// Result of a single connection attempt
#[derive(Debug)]
pub enum ConnectOutcome {
    /// The socket accepted the connection
    Connected(UnixStream),
    /// Nothing exists at the socket path
    Missing,
    /// The socket file exists but nobody is listening (stale socket)
    Refused,
    /// Any other failure, e.g. permissions
    Failed(io::Error),
}

/// Hands out live connections to the mpv socket
pub struct SocketConnector {
    socket_path: PathBuf,
    retry_delay: Duration,
    /// Kept alive for as long as the watch should deliver events
    _watcher: RecommendedWatcher,
    /// Coalesced "socket was created" signal; holds at most one wake-up
    created: mpsc::Receiver<()>,
    attempts: u64,
}

impl SocketConnector {
    /// Create a connector and start watching the socket's directory
    ///
    /// # Errors
    ///
    /// Returns `IpcError::InvalidSocketPath` if the path has no file name.
    /// Returns `IpcError::WatchFailed` if the parent directory cannot be
    /// watched (for example because it does not exist).
    pub fn new(socket_path: &Path, retry_delay: Duration) -> Result<Self, IpcError> {
        let socket_name = socket_path
            .file_name()
            .ok_or_else(|| IpcError::InvalidSocketPath {
                path: socket_path.to_path_buf(),
            })?
            .to_os_string();

        let watch_dir = match socket_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (created_tx, created) = mpsc::channel(1);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if matches!(event.kind, EventKind::Create(_)) => {
                let is_socket = event
                    .paths
                    .iter()
                    .any(|path| path.file_name() == Some(socket_name.as_os_str()));
                if is_socket {
                    // A full channel already holds a pending wake-up
                    let _ = created_tx.try_send(());
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Socket directory watch error: {}", e),
        })
        .map_err(|source| IpcError::WatchFailed {
            path: watch_dir.clone(),
            source,
        })?;

        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .map_err(|source| IpcError::WatchFailed {
                path: watch_dir.clone(),
                source,
            })?;

        debug!("Watching {} for the mpv socket", watch_dir.display());

        Ok(Self {
            socket_path: socket_path.to_path_buf(),
            retry_delay,
            _watcher: watcher,
            created,
            attempts: 0,
        })
    }

    /// Total number of connection attempts made so far
    #[cfg(test)]
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Attempt a single connection, classifying the failure
    pub async fn try_connect(&mut self) -> ConnectOutcome {
        self.attempts += 1;

        match UnixStream::connect(&self.socket_path).await {
            Ok(stream) => ConnectOutcome::Connected(stream),
            Err(e) => match e.kind() {
                io::ErrorKind::NotFound => ConnectOutcome::Missing,
                io::ErrorKind::ConnectionRefused => ConnectOutcome::Refused,
                _ => ConnectOutcome::Failed(e),
            },
        }
    }

    /// Block until a connection to mpv is established
    ///
    /// Never fails: every unsuccessful attempt waits for the socket to be
    /// created again and retries.
    pub async fn acquire(&mut self) -> UnixStream {
        loop {
            self.drain_events();

            match self.try_connect().await {
                ConnectOutcome::Connected(stream) => {
                    info!(
                        attempts = self.attempts,
                        "Connected to mpv at {}",
                        self.socket_path.display()
                    );
                    return stream;
                }
                ConnectOutcome::Missing => {
                    debug!(
                        "No mpv socket at {}, waiting for it to appear",
                        self.socket_path.display()
                    );
                }
                ConnectOutcome::Refused => {
                    debug!(
                        "mpv socket at {} refused the connection, waiting for it to be recreated",
                        self.socket_path.display()
                    );
                }
                ConnectOutcome::Failed(e) => {
                    warn!(
                        "Failed to connect to mpv socket at {}: {}",
                        self.socket_path.display(),
                        e
                    );
                }
            }

            self.wait_for_socket().await;
            sleep(self.retry_delay).await;
        }
    }

    /// Wait for the socket to be created
    async fn wait_for_socket(&mut self) {
        match self.created.recv().await {
            Some(()) => debug!("mpv socket created at {}", self.socket_path.display()),
            None => {
                // Watch thread is gone; degrade to a slow retry
                warn!("Socket directory watch stopped, retrying after delay");
                sleep(self.retry_delay).await;
            }
        }
    }

    fn drain_events(&mut self) {
        while self.created.try_recv().is_ok() {}
    }
}
