//! mpv JSON IPC protocol types and codec.
//!
//! Reference: https://mpv.io/manual/master/#json-ipc

use std::collections::HashSet;

use mpvinfo_config::ValueKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::error::IpcError;

/// Observe a property, delivering its native JSON value
pub const OBSERVE_PROPERTY: &str = "observe_property";

/// Observe a property, delivering mpv's string rendering of it
pub const OBSERVE_PROPERTY_STRING: &str = "observe_property_string";

/// Event name mpv uses for observed property updates
pub const PROPERTY_CHANGE: &str = "property-change";

/// Upper bound on an unterminated line kept between reads
const MAX_PENDING_BYTES: usize = 1 << 20;

/// Subscription request sent to mpv
///
/// Serializes to `{"command": [verb, id, name]}`.
#[derive(Debug, Clone, Serialize)]
pub struct ObserveCommand<'a> {
    command: (&'static str, i64, &'a str),
}

impl<'a> ObserveCommand<'a> {
    /// Observe `name` with the verb matching its value kind
    pub fn new(name: &'a str, client_id: i64, kind: ValueKind) -> Self {
        let verb = match kind {
            ValueKind::String => OBSERVE_PROPERTY_STRING,
            ValueKind::Integer => OBSERVE_PROPERTY,
        };
        Self {
            command: (verb, client_id, name),
        }
    }

    /// Encode as a newline-terminated JSON line
    pub fn encode(&self) -> Result<Vec<u8>, IpcError> {
        let mut bytes = serde_json::to_vec(self).map_err(IpcError::SerializeFailed)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// Any object mpv sends; only property changes carry all of the fields
#[derive(Debug, Deserialize)]
struct RawMessage {
    event: Option<String>,
    id: Option<i64>,
    name: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// A decoded `property-change` notification
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub event: String,
    pub client_id: i64,
    pub name: String,
    /// `None` when mpv sent `null` or no data at all
    pub data: Option<Value>,
}

impl EventRecord {
    /// The value as text, the way it is fed to formatting
    ///
    /// Strings are used verbatim, flags render as `yes`/`no` like mpv's own
    /// string rendering, and `null` becomes the empty string.
    pub fn raw_value(&self) -> String {
        match &self.data {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Bool(true)) => "yes".to_string(),
            Some(Value::Bool(false)) => "no".to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => other.to_string(),
        }
    }
}

/// Turns bytes read from the socket into property-change records
///
/// One decoder belongs to one connection. Complete lines are decoded
/// independently; a trailing line without its newline is kept until the
/// next chunk completes it.
#[derive(Debug)]
pub struct EventDecoder {
    client_id: i64,
    properties: HashSet<String>,
    pending: Vec<u8>,
}

impl EventDecoder {
    pub fn new<I, S>(client_id: i64, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            client_id,
            properties: properties.into_iter().map(Into::into).collect(),
            pending: Vec::new(),
        }
    }

    /// Decode one chunk into a batch of records
    ///
    /// Lines that are not JSON, or JSON that is not a property change for
    /// our client id and one of our properties, are skipped. Invalid UTF-8
    /// is replaced rather than rejected. When a property changes several
    /// times in the batch only its last record is returned.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<EventRecord> {
        self.pending.extend_from_slice(chunk);

        let complete = match self.pending.iter().rposition(|&b| b == b'\n') {
            Some(index) => index + 1,
            None => {
                self.discard_oversized();
                return Vec::new();
            }
        };

        let lines: Vec<u8> = self.pending.drain(..complete).collect();
        self.discard_oversized();

        let text = String::from_utf8_lossy(&lines);
        let mut records: Vec<EventRecord> = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<RawMessage>(line) {
                Ok(message) => {
                    if let Some(record) = self.matching_record(message) {
                        records.retain(|existing| existing.name != record.name);
                        records.push(record);
                    }
                }
                Err(e) => {
                    warn!("Skipping undecodable mpv message: {} - {}", e, line);
                }
            }
        }

        debug!("Decoded {} property change(s)", records.len());
        records
    }

    fn matching_record(&self, message: RawMessage) -> Option<EventRecord> {
        let RawMessage {
            event,
            id,
            name,
            data,
        } = message;

        let event = event.filter(|event| event == PROPERTY_CHANGE)?;
        let client_id = id.filter(|id| *id == self.client_id)?;
        let name = name.filter(|name| self.properties.contains(name))?;

        Some(EventRecord {
            event,
            client_id,
            name,
            data,
        })
    }

    fn discard_oversized(&mut self) {
        if self.pending.len() > MAX_PENDING_BYTES {
            warn!(
                "Discarding {} bytes of unterminated mpv output",
                self.pending.len()
            );
            self.pending.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decoder() -> EventDecoder {
        EventDecoder::new(1, ["media-title", "volume", "loop-file"])
    }

    #[test]
    fn test_observe_command_verbs() {
        let string = ObserveCommand::new("media-title", 1, ValueKind::String)
            .encode()
            .unwrap();
        assert_eq!(
            string,
            b"{\"command\":[\"observe_property_string\",1,\"media-title\"]}\n"
        );

        let native = ObserveCommand::new("volume", 3, ValueKind::Integer)
            .encode()
            .unwrap();
        let line = std::str::from_utf8(&native).unwrap();
        assert!(line.ends_with('\n'));
        let value: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value, json!({ "command": ["observe_property", 3, "volume"] }));
    }

    #[test]
    fn test_decode_single_event() {
        let records = decoder().decode(
            b"{\"event\":\"property-change\",\"id\":1,\"name\":\"media-title\",\"data\":\"Song A\"}\n",
        );
        assert_eq!(
            records,
            vec![EventRecord {
                event: PROPERTY_CHANGE.to_string(),
                client_id: 1,
                name: "media-title".to_string(),
                data: Some(json!("Song A")),
            }]
        );
    }

    #[test]
    fn test_decode_keeps_last_record_per_property() {
        let batch = concat!(
            "{\"event\":\"property-change\",\"id\":1,\"name\":\"media-title\",\"data\":\"First\"}\n",
            "{\"event\":\"property-change\",\"id\":1,\"name\":\"volume\",\"data\":50.0}\n",
            "{\"event\":\"property-change\",\"id\":1,\"name\":\"media-title\",\"data\":\"Second\"}\n",
        );
        let records = decoder().decode(batch.as_bytes());

        assert_eq!(records.len(), 2);
        let title = records.iter().find(|r| r.name == "media-title").unwrap();
        assert_eq!(title.raw_value(), "Second");
        let volume = records.iter().find(|r| r.name == "volume").unwrap();
        assert_eq!(volume.raw_value(), "50.0");
    }

    #[test]
    fn test_decode_ignores_other_client_ids_and_messages() {
        let batch = concat!(
            "{\"event\":\"property-change\",\"id\":2,\"name\":\"media-title\",\"data\":\"Other\"}\n",
            "{\"event\":\"property-change\",\"id\":1,\"name\":\"chapter\",\"data\":3}\n",
            "{\"event\":\"end-file\",\"reason\":\"eof\"}\n",
            "{\"error\":\"success\",\"data\":null,\"request_id\":0}\n",
        );
        assert!(decoder().decode(batch.as_bytes()).is_empty());
    }

    #[test]
    fn test_decode_skips_malformed_line() {
        let batch = concat!(
            "this is not json\n",
            "{\"event\":\"property-change\",\"id\":1,\"name\":\"media-title\",\"data\":\"Song B\"}\n",
        );
        let records = decoder().decode(batch.as_bytes());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].raw_value(), "Song B");
    }

    #[test]
    fn test_decode_tolerates_invalid_utf8() {
        let mut batch = b"{\"event\":\"property-change\",\"id\":1,\"name\":\"media-title\",\"data\":\"A".to_vec();
        batch.extend_from_slice(&[0xff, 0xfe]);
        batch.extend_from_slice(b"B\"}\n");

        let records = decoder().decode(&batch);
        assert_eq!(records.len(), 1);
        let value = records[0].raw_value();
        assert!(value.starts_with('A'));
        assert!(value.ends_with('B'));
    }

    #[test]
    fn test_decode_completes_partial_line_across_reads() {
        let mut decoder = decoder();
        let line = b"{\"event\":\"property-change\",\"id\":1,\"name\":\"volume\",\"data\":20}\n";
        let (head, tail) = line.split_at(25);

        assert!(decoder.decode(head).is_empty());
        let records = decoder.decode(tail);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].raw_value(), "20");
    }

    #[test]
    fn test_null_and_missing_data_are_empty() {
        let batch = concat!(
            "{\"event\":\"property-change\",\"id\":1,\"name\":\"media-title\",\"data\":null}\n",
            "{\"event\":\"property-change\",\"id\":1,\"name\":\"volume\"}\n",
            "{\"event\":\"property-change\",\"id\":1,\"name\":\"loop-file\",\"data\":\"\"}\n",
        );
        let records = decoder().decode(batch.as_bytes());
        assert_eq!(records.len(), 3);
        assert!(records[0].data.is_none());
        assert!(records[1].data.is_none());
        assert_eq!(records[2].data, Some(json!("")));
        assert!(records.iter().all(|r| r.raw_value().is_empty()));
    }

    #[test]
    fn test_raw_value_renderings() {
        let record = |data: Value| EventRecord {
            event: PROPERTY_CHANGE.to_string(),
            client_id: 1,
            name: "x".to_string(),
            data: Some(data),
        };

        assert_eq!(record(json!(true)).raw_value(), "yes");
        assert_eq!(record(json!(false)).raw_value(), "no");
        assert_eq!(record(json!(37.5)).raw_value(), "37.5");
        assert_eq!(record(json!(["a", 1])).raw_value(), "[\"a\",1]");
    }

    #[test]
    fn test_oversized_unterminated_line_is_discarded() {
        let mut decoder = decoder();

        let garbage = vec![b'x'; MAX_PENDING_BYTES + 1];
        assert!(decoder.decode(&garbage).is_empty());
        assert!(decoder.pending.is_empty());

        let records = decoder.decode(
            b"{\"event\":\"property-change\",\"id\":1,\"name\":\"media-title\",\"data\":\"Song C\"}\n",
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].raw_value(), "Song C");
        assert!(decoder.pending.is_empty());
    }

    #[test]
    fn test_pending_line_under_limit_is_kept() {
        let mut decoder = decoder();
        assert!(decoder.decode(&vec![b' '; 1024]).is_empty());
        assert_eq!(decoder.pending.len(), 1024);
    }
}
