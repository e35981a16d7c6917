//! Definition error types.

use std::path::PathBuf;

/// Errors that can occur while loading, wiring or persisting definitions.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    /// A required field is missing from a configuration file.
    #[error("missing required field '{field}' in {path}")]
    MissingField { path: PathBuf, field: String },

    /// A field is present but holds an unusable value.
    #[error("invalid value for '{field}' in {path}: {detail}")]
    InvalidField {
        path: PathBuf,
        field: String,
        detail: String,
    },

    /// A configuration file could not be parsed.
    #[error("cannot parse config file {path}: {detail}")]
    ConfigParse { path: PathBuf, detail: String },

    /// An expected configuration directory is missing.
    #[error("configuration directory {path} missing")]
    MissingDirectory { path: PathBuf },

    /// An automatically resolved dependency found no provider.
    #[error(
        "unmatched dependency for {impl_name}: type {cipher} -> {required} \
         (vendor name: {vendor}, OE {execenv}, processor {processor})"
    )]
    UnmatchedDependency {
        impl_name: String,
        cipher: String,
        required: String,
        vendor: String,
        execenv: String,
        processor: String,
    },

    /// A registry cursor no longer refers to a registered definition.
    #[error("cursor does not refer to a registered definition")]
    StaleCursor,

    /// No definition matched the search criteria.
    #[error("no cipher implementation found for search criteria")]
    NoDefinition,

    /// A module ID entry was not found for the given name.
    #[error("no module ID entry for '{name}' in {path}")]
    ModuleIdNotFound { path: PathBuf, name: String },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for definition operations.
pub type Result<T> = std::result::Result<T, DefinitionError>;
