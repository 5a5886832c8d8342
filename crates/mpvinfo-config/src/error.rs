use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to parse JSON configuration")]
    #[diagnostic(code(mpvinfo::config::parse_error))]
    ParseError {
        #[source_code]
        src: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(mpvinfo::config::invalid))]
    Invalid { message: String },

    #[error("Property '{name}' is configured more than once")]
    #[diagnostic(
        code(mpvinfo::config::duplicate_property),
        help("each property may only appear once in the `properties` list")
    )]
    DuplicateProperty { name: String },

    #[error("Template of property '{name}' must contain exactly one {{v}} placeholder, found {found}")]
    #[diagnostic(code(mpvinfo::config::template))]
    TemplatePlaceholder { name: String, found: usize },

    #[error("Output template refers to unknown property '{name}'")]
    #[diagnostic(
        code(mpvinfo::config::unknown_property),
        help("add the property to `properties` or remove it from `output_template`")
    )]
    UnknownProperty { name: String },

    #[error("Configuration file not found: {}", .path.display())]
    #[diagnostic(code(mpvinfo::config::not_found))]
    NotFound { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
