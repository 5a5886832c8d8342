//! Configuration data model

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::template::OutputTemplate;

/// Placeholder a property template substitutes its value into
pub const VALUE_PLACEHOLDER: &str = "{v}";

/// Default location of mpv's `--input-ipc-server` socket
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/mpvsocket";

/// Default client id used to tag observe requests
pub const DEFAULT_CLIENT_ID: i64 = 1;

/// Default delay before reconnecting after the socket appears or a session ends
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 100;

/// Default marker appended to truncated values
pub const DEFAULT_SHORTEN_MARKER: &str = "...";

/// Default maximum number of characters in a composed status line
pub const DEFAULT_MAX_LENGTH: usize = 100;

/// Default output template, one placeholder per default property
pub const DEFAULT_OUTPUT_TEMPLATE: &str = "{volume}{loop-file} {media-title}{metadata/by-key/album}";

/// Root configuration structure
///
/// Built once at startup from the defaults merged with the user file and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Path of mpv's IPC socket
    pub socket_path: PathBuf,
    /// Id correlating observe requests with property-change events
    pub client_id: i64,
    /// Line printed when nothing is displayable, and on shutdown
    pub empty_output: String,
    /// Named template the status line is composed from
    pub output_template: OutputTemplate,
    /// Maximum number of characters of a composed line before it is shortened
    pub max_length: Option<usize>,
    /// Suffix appended to a shortened line
    pub shorten_marker: String,
    /// Pause between a failed or finished connection and the next attempt
    pub reconnect_delay_ms: u64,
    /// Observed properties, in subscription order
    pub properties: Vec<PropertySpec>,
}

impl Config {
    /// Look up a property by its mpv name
    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.iter().find(|spec| spec.name == name)
    }

    /// Names of all observed properties, in subscription order
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|spec| spec.name.as_str())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            client_id: DEFAULT_CLIENT_ID,
            empty_output: String::new(),
            output_template: OutputTemplate::parse(DEFAULT_OUTPUT_TEMPLATE),
            max_length: Some(DEFAULT_MAX_LENGTH),
            shorten_marker: DEFAULT_SHORTEN_MARKER.to_string(),
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            properties: default_properties(),
        }
    }
}

fn default_properties() -> Vec<PropertySpec> {
    vec![
        PropertySpec {
            kind: ValueKind::Integer,
            template: "({v}%)".to_string(),
            replace: BTreeMap::from([("0".to_string(), String::new())]),
            ..PropertySpec::new("volume")
        },
        PropertySpec {
            template: " {v}".to_string(),
            replace: BTreeMap::from([
                ("no".to_string(), String::new()),
                ("inf".to_string(), "(r)".to_string()),
            ]),
            ..PropertySpec::new("loop-file")
        },
        PropertySpec {
            max_length: Some(100),
            required: true,
            ..PropertySpec::new("media-title")
        },
        PropertySpec {
            template: " | {v}".to_string(),
            max_length: Some(50),
            ..PropertySpec::new("metadata/by-key/album")
        },
    ]
}

/// How a property's raw value is coerced before formatting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueKind {
    /// Displayed as mpv renders it
    #[default]
    String,
    /// Parsed as a number and shown as a whole integer
    Integer,
}

/// Display settings for one observed mpv property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySpec {
    /// mpv property name (e.g. "media-title")
    pub name: String,
    pub kind: ValueKind,
    /// Text around the value, containing exactly one `{v}`
    pub template: String,
    /// Maximum number of characters of the value before it is shortened
    pub max_length: Option<usize>,
    /// Suffix appended to a shortened value
    pub shorten_marker: String,
    /// Raw value -> replacement; an empty replacement hides the property
    pub replace: BTreeMap<String, String>,
    /// While this property has no value the whole line is empty
    pub required: bool,
}

impl PropertySpec {
    /// A plain string property shown as-is
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ValueKind::String,
            template: VALUE_PLACEHOLDER.to_string(),
            max_length: None,
            shorten_marker: DEFAULT_SHORTEN_MARKER.to_string(),
            replace: BTreeMap::new(),
            required: false,
        }
    }
}
