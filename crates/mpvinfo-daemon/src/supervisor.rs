//! Outer reconnect loop and shutdown handling
//!
//! The supervisor owns the connector and the status output. It runs one
//! session per connection forever; only a termination signal ends it, at
//! which point the empty line is written one last time so the bar does not
//! keep showing a stale title.

use std::convert::Infallible;
use std::future::Future;
use std::io::{self, Write};
use std::time::Duration;

use mpvinfo_config::Config;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::sleep;
use tracing::info;

use crate::mpv_ipc::{IpcError, SocketConnector};
use crate::output::StatusWriter;
use crate::session::Session;

/// Runs sessions back to back for the lifetime of the process
pub struct Supervisor<W: Write> {
    config: Config,
    connector: SocketConnector,
    output: StatusWriter<W>,
}

impl<W: Write> Supervisor<W> {
    /// Create a supervisor, starting the socket directory watch
    ///
    /// # Errors
    ///
    /// Returns an error if the socket's directory cannot be watched.
    pub fn new(config: Config, output: StatusWriter<W>) -> Result<Self, IpcError> {
        let connector = SocketConnector::new(
            &config.socket_path,
            Duration::from_millis(config.reconnect_delay_ms),
        )?;

        Ok(Self {
            config,
            connector,
            output,
        })
    }

    #[cfg(test)]
    pub fn output(&self) -> &StatusWriter<W> {
        &self.output
    }

    /// Connect, run a session, blank the line, repeat
    ///
    /// Only returns on a failure to write the status line.
    pub async fn run(&mut self) -> io::Result<Infallible> {
        self.output.emit(&self.config.empty_output)?;

        loop {
            let stream = self.connector.acquire().await;

            let reason = Session::new(&self.config, stream)
                .run(&mut self.output)
                .await?;
            reason.log();

            self.output.emit(&self.config.empty_output)?;
            sleep(Duration::from_millis(self.config.reconnect_delay_ms)).await;
        }
    }

    /// Write the empty line one final time
    pub fn shutdown(&mut self) -> io::Result<()> {
        self.output.emit_final(&self.config.empty_output)
    }

    /// Run until `shutdown` resolves, then write the final empty line
    ///
    /// Every await point inside [`Supervisor::run`] (connecting, waiting for
    /// the socket, reading) is dropped as soon as the shutdown future
    /// completes. Status lines are written synchronously between awaits, so
    /// the final line never interleaves with a partial one.
    pub async fn run_until<F>(&mut self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = io::Result<()>>,
    {
        let outcome = tokio::select! {
            result = shutdown => result,
            result = self.run() => match result {
                Ok(never) => match never {},
                Err(e) => Err(e),
            },
        };
        outcome?;

        info!("Shutting down...");
        self.shutdown()
    }
}

/// Install SIGINT and SIGTERM handlers
///
/// The returned future resolves when either signal is received.
///
/// # Errors
///
/// Returns an error if a handler cannot be registered.
pub fn shutdown_signal() -> io::Result<impl Future<Output = io::Result<()>>> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
        }
        Ok(())
    })
}
