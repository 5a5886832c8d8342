//! Configuration loading for mpvinfo
//!
//! This crate handles the JSON configuration file: locating it, merging it
//! over the built-in defaults and validating the result into an immutable
//! [`Config`].

mod error;
mod model;
mod parser;
mod template;

pub use error::ConfigError;
pub use model::*;
pub use parser::{default_config_path, load_config, parse_config, parse_config_str, ConfigFile};
pub use template::{OutputTemplate, Segment};
