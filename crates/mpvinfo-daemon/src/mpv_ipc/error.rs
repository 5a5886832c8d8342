//! Error types for mpv IPC operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when communicating with mpv
#[derive(Debug, Error)]
pub enum IpcError {
    /// The socket path cannot be split into a directory and a file name
    #[error("Invalid mpv socket path: {}", .path.display())]
    InvalidSocketPath { path: PathBuf },

    /// The socket's parent directory cannot be watched for new entries
    #[error("Failed to watch {} for the mpv socket: {source}", .path.display())]
    WatchFailed {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// Failed to send an observe request to mpv
    #[error("Failed to send request to mpv: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Failed to serialize a request to JSON
    #[error("Failed to serialize request: {0}")]
    SerializeFailed(#[source] serde_json::Error),
}
