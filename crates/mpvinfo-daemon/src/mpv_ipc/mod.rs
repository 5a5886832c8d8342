//! mpv IPC client for status reporting
//!
//! This module talks to mpv over the socket given to `--input-ipc-server`.
//! It enables mpvinfo to:
//! - Connect to the socket, waiting for it to appear when mpv is not running
//! - Subscribe to property changes with `observe_property`
//! - Decode the stream of `property-change` events
//!
//! ## Architecture
//!
//! - `SocketConnector`: owns the socket directory watch and hands out live streams
//! - `ObserveCommand` / `EventDecoder`: the newline-delimited JSON codec
//! - `IpcError`: error types for IPC setup and subscription
//!
//! ## Protocol
//!
//! Every message is a single JSON object terminated by a newline. Clients
//! send `{"command": ["observe_property", <id>, <name>]}` and mpv answers with
//! a reply object followed by `{"event": "property-change", ...}` objects
//! whenever the property changes, starting with its current value.

mod connector;
mod error;
mod protocol;

pub use connector::SocketConnector;
pub use error::IpcError;
pub use protocol::{EventDecoder, EventRecord, ObserveCommand};
