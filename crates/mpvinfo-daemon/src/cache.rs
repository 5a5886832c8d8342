//! Formatted property cache and status line composition

use std::collections::HashMap;

use mpvinfo_config::{Config, Segment};
use tracing::warn;

use crate::format::{format_value, shorten};
use crate::mpv_ipc::EventRecord;

/// Last formatted value of every observed property
///
/// Holds exactly one entry per configured property, starting out empty.
/// A cache lives as long as one connection; a new connection starts from a
/// fresh cache because a newly started mpv may not report every property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyCache {
    entries: HashMap<String, String>,
}

impl PropertyCache {
    /// Create a cache with an empty entry for each configured property
    pub fn new(config: &Config) -> Self {
        Self {
            entries: config
                .property_names()
                .map(|name| (name.to_string(), String::new()))
                .collect(),
        }
    }

    /// Formatted value of a property, `None` for unknown properties
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Apply a batch of property changes
    ///
    /// Properties without a record in the batch keep their value. Empty or
    /// null data clears the entry without formatting. A value that fails to
    /// format is logged and leaves the previous entry in place.
    ///
    /// Returns `true` if any entry changed.
    pub fn apply(&mut self, config: &Config, records: &[EventRecord]) -> bool {
        let mut changed = false;

        for record in records {
            let Some(spec) = config.property(&record.name) else {
                continue;
            };
            let Some(entry) = self.entries.get_mut(&record.name) else {
                continue;
            };

            let raw = record.raw_value();
            let formatted = if raw.is_empty() {
                String::new()
            } else {
                match format_value(spec, &raw) {
                    Ok(formatted) => formatted.into_display(),
                    Err(e) => {
                        warn!("Keeping previous value: {}", e);
                        continue;
                    }
                }
            };

            if *entry != formatted {
                *entry = formatted;
                changed = true;
            }
        }

        changed
    }

    /// Compose the status line from the output template
    ///
    /// Yields `empty_output` when every entry is empty or a required
    /// property has no value. A composed line longer than the configured
    /// `max_length` is shortened; `empty_output` never is.
    pub fn compose(&self, config: &Config) -> String {
        let all_empty = self.entries.values().all(String::is_empty);
        let missing_required = config
            .properties
            .iter()
            .any(|spec| spec.required && self.get(&spec.name).map_or(true, str::is_empty));

        if all_empty || missing_required {
            return config.empty_output.clone();
        }

        let mut line = String::new();
        for segment in config.output_template.segments() {
            match segment {
                Segment::Literal(text) => line.push_str(text),
                Segment::Property(name) => line.push_str(self.get(name).unwrap_or_default()),
            }
        }
        shorten(&line, config.max_length, &config.shorten_marker)
    }
}
