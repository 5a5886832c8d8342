//! JSON configuration loader
//!
//! The file mirrors [`Config`] with every field optional. Fields present in
//! the file override the built-in default for that field; a `properties`
//! array replaces the default property list as a whole, and each entry in
//! it fills its own missing fields from [`PropertySpec::new`].

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::*;
use crate::template::OutputTemplate;

/// Directory under the platform config dir holding `config.json`
const CONFIG_DIR_NAME: &str = "mpvinfo";

const CONFIG_FILE_NAME: &str = "config.json";

/// On-disk shape of the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shorten_marker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<PropertyFile>>,
}

/// On-disk shape of one `properties` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PropertyFile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shorten_marker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

impl From<&Config> for ConfigFile {
    fn from(config: &Config) -> Self {
        Self {
            socket_path: Some(config.socket_path.display().to_string()),
            client_id: Some(config.client_id),
            empty_output: Some(config.empty_output.clone()),
            output_template: Some(config.output_template.as_str().to_string()),
            max_length: config.max_length,
            shorten_marker: Some(config.shorten_marker.clone()),
            reconnect_delay_ms: Some(config.reconnect_delay_ms),
            properties: Some(config.properties.iter().map(PropertyFile::from).collect()),
        }
    }
}

impl From<&PropertySpec> for PropertyFile {
    fn from(spec: &PropertySpec) -> Self {
        Self {
            name: spec.name.clone(),
            template: Some(spec.template.clone()),
            integer: Some(spec.kind == ValueKind::Integer),
            max_length: spec.max_length,
            shorten_marker: Some(spec.shorten_marker.clone()),
            replace: Some(spec.replace.clone()),
            required: Some(spec.required),
        }
    }
}

impl PropertyFile {
    fn into_spec(self) -> PropertySpec {
        let defaults = PropertySpec::new(self.name);
        PropertySpec {
            name: defaults.name,
            kind: match self.integer {
                Some(true) => ValueKind::Integer,
                _ => ValueKind::String,
            },
            template: self.template.unwrap_or(defaults.template),
            max_length: self.max_length.or(defaults.max_length),
            shorten_marker: self.shorten_marker.unwrap_or(defaults.shorten_marker),
            replace: self.replace.unwrap_or(defaults.replace),
            required: self.required.unwrap_or(defaults.required),
        }
    }
}

impl ConfigFile {
    /// Overlay this file on the built-in defaults and validate the result
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let defaults = Config::default();

        let config = Config {
            socket_path: self
                .socket_path
                .map(|path| PathBuf::from(shellexpand::tilde(&path).into_owned()))
                .unwrap_or(defaults.socket_path),
            client_id: self.client_id.unwrap_or(defaults.client_id),
            empty_output: self.empty_output.unwrap_or(defaults.empty_output),
            output_template: self
                .output_template
                .map(|template| OutputTemplate::parse(&template))
                .unwrap_or(defaults.output_template),
            max_length: self.max_length.or(defaults.max_length),
            shorten_marker: self.shorten_marker.unwrap_or(defaults.shorten_marker),
            reconnect_delay_ms: self.reconnect_delay_ms.unwrap_or(defaults.reconnect_delay_ms),
            properties: self
                .properties
                .map(|entries| entries.into_iter().map(PropertyFile::into_spec).collect())
                .unwrap_or(defaults.properties),
        };

        validate(&config)?;
        Ok(config)
    }
}

/// Convert a 1-indexed line and column to a byte offset into `source`
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;

    for (index, text) in source.split_inclusive('\n').enumerate() {
        if index + 1 == line {
            let col_offset = text
                .char_indices()
                .nth(column.saturating_sub(1))
                .map(|(i, _)| i)
                .unwrap_or(text.len());
            return offset + col_offset;
        }
        offset += text.len();
    }

    source.len()
}

/// The platform configuration file location, e.g. `~/.config/mpvinfo/config.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load the configuration used at startup
///
/// With an explicit path the file must exist. Without one, the platform
/// default location is tried and the built-in defaults are used when no
/// file is there.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        return parse_config(path);
    }

    match default_config_path() {
        Some(path) if path.exists() => parse_config(&path),
        Some(path) => {
            tracing::debug!(
                "No configuration at {}, using built-in defaults",
                path.display()
            );
            Ok(Config::default())
        }
        None => {
            tracing::debug!("No platform config directory, using built-in defaults");
            Ok(Config::default())
        }
    }
}

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let file: ConfigFile = serde_json::from_str(content).map_err(|e| {
        let offset = line_col_to_offset(content, e.line(), e.column());
        ConfigError::ParseError {
            src: content.to_string(),
            span: miette::SourceSpan::from((offset, 0)),
            source: e,
        }
    })?;

    file.into_config()
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for spec in &config.properties {
        if spec.name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "property name must not be empty".to_string(),
            });
        }

        if !seen.insert(spec.name.as_str()) {
            return Err(ConfigError::DuplicateProperty {
                name: spec.name.clone(),
            });
        }

        let found = spec.template.matches(VALUE_PLACEHOLDER).count();
        if found != 1 {
            return Err(ConfigError::TemplatePlaceholder {
                name: spec.name.clone(),
                found,
            });
        }
    }

    for name in config.output_template.placeholders() {
        if !seen.contains(name) {
            return Err(ConfigError::UnknownProperty {
                name: name.to_string(),
            });
        }
    }

    let referenced: HashSet<&str> = config.output_template.placeholders().collect();
    for name in config.property_names() {
        if !referenced.contains(name) {
            tracing::warn!(
                "Property '{}' is observed but not used in the output template",
                name
            );
        }
    }

    Ok(())
}
