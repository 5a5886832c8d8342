//! One connection's lifetime
//!
//! A session subscribes to every configured property, then reads from the
//! socket until mpv goes away:
//!
//! ```text
//! Subscribing --> Reading --+--> Closed
//!                   ^   |   |
//!                   +---+   +-- EOF or read error
//! ```
//!
//! The session owns the stream. It is shut down explicitly when the session
//! closes and dropped (closing the socket) on every other exit path.

use std::io::{self, Write};

use mpvinfo_config::Config;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, trace, warn};

use crate::cache::PropertyCache;
use crate::mpv_ipc::{EventDecoder, IpcError, ObserveCommand};
use crate::output::StatusWriter;

/// Bytes requested from the socket per read
const READ_CHUNK: usize = 8192;

/// Why a session ended
#[derive(Debug)]
pub enum CloseReason {
    /// mpv closed the connection
    EndOfStream,
    /// Reading failed, typically a connection reset
    Reset(io::Error),
    /// The observe requests could not be sent
    SubscribeFailed(IpcError),
}

#[derive(Debug)]
enum SessionState {
    Subscribing,
    Reading,
    Closed(CloseReason),
}

/// Result of one read from the socket
#[derive(Debug)]
enum ReadOutcome {
    Data(usize),
    Closed,
    Reset(io::Error),
}

/// State for a single mpv connection
pub struct Session<'a, S> {
    config: &'a Config,
    stream: S,
    decoder: EventDecoder,
    cache: PropertyCache,
}

impl<'a, S> Session<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Start a session on a freshly connected stream with an empty cache
    pub fn new(config: &'a Config, stream: S) -> Self {
        Self {
            config,
            stream,
            decoder: EventDecoder::new(config.client_id, config.property_names()),
            cache: PropertyCache::new(config),
        }
    }

    /// Run until the connection closes
    ///
    /// # Errors
    ///
    /// Only fails when writing the status line fails; connection problems
    /// end the session with a [`CloseReason`].
    pub async fn run<W: Write>(mut self, output: &mut StatusWriter<W>) -> io::Result<CloseReason> {
        let mut state = SessionState::Subscribing;
        let mut buf = vec![0u8; READ_CHUNK];

        loop {
            state = match state {
                SessionState::Subscribing => match self.subscribe().await {
                    Ok(()) => SessionState::Reading,
                    Err(e) => SessionState::Closed(CloseReason::SubscribeFailed(e)),
                },
                SessionState::Reading => match self.read_chunk(&mut buf).await {
                    ReadOutcome::Data(n) => {
                        self.handle_chunk(&buf[..n], output)?;
                        SessionState::Reading
                    }
                    ReadOutcome::Closed => SessionState::Closed(CloseReason::EndOfStream),
                    ReadOutcome::Reset(e) => SessionState::Closed(CloseReason::Reset(e)),
                },
                SessionState::Closed(reason) => {
                    self.close().await;
                    return Ok(reason);
                }
            };
        }
    }

    /// Send one observe request per property, in configuration order
    ///
    /// mpv's replies are not awaited; they are skipped by the decoder.
    async fn subscribe(&mut self) -> Result<(), IpcError> {
        for spec in &self.config.properties {
            let request = ObserveCommand::new(&spec.name, self.config.client_id, spec.kind).encode()?;
            self.stream
                .write_all(&request)
                .await
                .map_err(IpcError::SendFailed)?;
        }
        self.stream.flush().await.map_err(IpcError::SendFailed)?;

        debug!("Observing {} mpv properties", self.config.properties.len());
        Ok(())
    }

    async fn read_chunk(&mut self, buf: &mut [u8]) -> ReadOutcome {
        loop {
            match self.stream.read(buf).await {
                Ok(0) => return ReadOutcome::Closed,
                Ok(n) => return ReadOutcome::Data(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return ReadOutcome::Reset(e),
            }
        }
    }

    fn handle_chunk<W: Write>(&mut self, chunk: &[u8], output: &mut StatusWriter<W>) -> io::Result<()> {
        let records = self.decoder.decode(chunk);
        if records.is_empty() {
            return Ok(());
        }
        for record in &records {
            trace!(
                event = %record.event,
                client_id = record.client_id,
                "{} = {:?}",
                record.name,
                record.data
            );
        }

        if self.cache.apply(self.config, &records) {
            let line = self.cache.compose(self.config);
            if output.emit(&line)? {
                debug!("Status line updated: {}", line);
            }
        }
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!("Error shutting down mpv connection: {}", e);
        }
    }
}

impl CloseReason {
    /// Log why the session ended
    pub fn log(&self) {
        match self {
            CloseReason::EndOfStream => info!("mpv closed the connection"),
            CloseReason::Reset(e) => info!("mpv connection lost: {}", e),
            CloseReason::SubscribeFailed(e) => warn!("Failed to subscribe to mpv properties: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpvinfo_config::{OutputTemplate, PropertySpec, ValueKind};
    use std::collections::BTreeMap;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::UnixStream;

    fn single_property_config(spec: PropertySpec) -> Config {
        Config {
            output_template: OutputTemplate::parse(&format!("{{{}}}", spec.name)),
            properties: vec![spec],
            ..Config::default()
        }
    }

    /// Write `input` from the mpv side, close it, and run a session to completion
    async fn run_with_input(config: &Config, input: &str) -> (String, Vec<String>, CloseReason) {
        let (local, peer) = UnixStream::pair().unwrap();
        let (peer_read, mut peer_write) = peer.into_split();

        peer_write.write_all(input.as_bytes()).await.unwrap();
        drop(peer_write);

        let mut output = StatusWriter::new(Vec::new());
        let reason = Session::new(config, local).run(&mut output).await.unwrap();

        let mut requests = Vec::new();
        let mut lines = BufReader::new(peer_read).lines();
        while let Some(line) = lines.next_line().await.unwrap() {
            requests.push(line);
        }

        let written = String::from_utf8(output.get_ref().clone()).unwrap();
        (written, requests, reason)
    }

    #[tokio::test]
    async fn test_title_event_is_written() {
        let config = single_property_config(PropertySpec::new("media-title"));
        let (written, requests, reason) = run_with_input(
            &config,
            "{\"event\":\"property-change\",\"id\":1,\"name\":\"media-title\",\"data\":\"Song A\"}\n",
        )
        .await;

        assert_eq!(written, "Song A\n");
        assert_eq!(
            requests,
            vec!["{\"command\":[\"observe_property_string\",1,\"media-title\"]}".to_string()]
        );
        assert!(matches!(reason, CloseReason::EndOfStream));
    }

    #[tokio::test]
    async fn test_volume_is_coerced_to_integer() {
        let config = single_property_config(PropertySpec {
            kind: ValueKind::Integer,
            template: "({v}%) ".to_string(),
            max_length: Some(5),
            ..PropertySpec::new("volume")
        });
        let (written, requests, _) = run_with_input(
            &config,
            "{\"event\":\"property-change\",\"id\":1,\"name\":\"volume\",\"data\":\"37.0\"}\n",
        )
        .await;

        assert_eq!(written, "(37%) \n");
        assert_eq!(
            requests,
            vec!["{\"command\":[\"observe_property\",1,\"volume\"]}".to_string()]
        );
    }

    #[tokio::test]
    async fn test_hidden_loop_mode_writes_nothing_new() {
        let config = Config {
            empty_output: "-".to_string(),
            ..single_property_config(PropertySpec {
                replace: BTreeMap::from([
                    ("no".to_string(), String::new()),
                    ("inf".to_string(), "(r)".to_string()),
                ]),
                ..PropertySpec::new("loop-file")
            })
        };
        let input = concat!(
            "{\"event\":\"property-change\",\"id\":1,\"name\":\"loop-file\",\"data\":\"inf\"}\n",
        );
        let (written, _, _) = run_with_input(&config, input).await;
        assert_eq!(written, "(r)\n");

        // "no" on a fresh cache leaves the entry empty, so nothing changes
        let input = "{\"event\":\"property-change\",\"id\":1,\"name\":\"loop-file\",\"data\":\"no\"}\n";
        let (written, _, _) = run_with_input(&config, input).await;
        assert_eq!(written, "");
    }

    #[tokio::test]
    async fn test_last_event_in_batch_wins() {
        let config = single_property_config(PropertySpec::new("media-title"));
        let input = concat!(
            "{\"event\":\"property-change\",\"id\":1,\"name\":\"media-title\",\"data\":\"Old\"}\n",
            "{\"event\":\"property-change\",\"id\":1,\"name\":\"media-title\",\"data\":\"New\"}\n",
        );
        let (written, _, _) = run_with_input(&config, input).await;
        assert_eq!(written, "New\n");
    }

    #[tokio::test]
    async fn test_malformed_line_does_not_drop_batch() {
        let config = single_property_config(PropertySpec::new("media-title"));
        let input = concat!(
            "{not json at all\n",
            "{\"event\":\"property-change\",\"id\":1,\"name\":\"media-title\",\"data\":\"Song A\"}\n",
        );
        let (written, _, _) = run_with_input(&config, input).await;
        assert_eq!(written, "Song A\n");
    }

    #[tokio::test]
    async fn test_foreign_client_id_is_ignored() {
        let config = single_property_config(PropertySpec::new("media-title"));
        let input =
            "{\"event\":\"property-change\",\"id\":9,\"name\":\"media-title\",\"data\":\"Other\"}\n";
        let (written, _, _) = run_with_input(&config, input).await;
        assert_eq!(written, "");
    }

    #[tokio::test]
    async fn test_subscriptions_follow_config_order() {
        let config = Config::default();
        let (_, requests, _) = run_with_input(&config, "").await;

        let names: Vec<String> = requests
            .iter()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                value["command"][2].as_str().unwrap().to_string()
            })
            .collect();
        let expected: Vec<String> = config.property_names().map(String::from).collect();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn test_zero_byte_read_closes_session() {
        let config = single_property_config(PropertySpec::new("media-title"));
        let (written, _, reason) = run_with_input(&config, "").await;
        assert_eq!(written, "");
        assert!(matches!(reason, CloseReason::EndOfStream));
    }
}
