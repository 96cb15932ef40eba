//! Error types for schema loading, configuration and generation.

use thiserror::Error;

/// Schema structure and uniqueness errors. All are fatal to a generation run.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("Malformed schema {origin}: {reason}")]
    Malformed { origin: String, reason: String },
    #[error("Unknown type name: {0}")]
    UnknownType(String),
    #[error("Malformed field count: {0}")]
    MalformedCount(String),
    #[error("Source already specified: {0}")]
    DuplicateSource(String),
    #[error("Conflicting message name: {0}")]
    DuplicateMessage(String),
    #[error("Conflicting message id {id}: {first} and {second}")]
    DuplicateMessageId { id: u32, first: String, second: String },
    #[error("Conflicting enum entry name: {entry} (enum {enumeration})")]
    DuplicateEnumEntry { enumeration: String, entry: String },
    #[error("Duplicated index {index} in enum entry {entry}")]
    DuplicateParam { entry: String, index: u32 },
}

/// Invalid generator configuration, detected before any input is read.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("XML input files should be specified")]
    NoSources,
    #[error("Output directory should be specified")]
    NoOutputDir,
    #[error("Invalid language specified: {0}")]
    UnknownTarget(String),
}

#[derive(Debug, Error)]
pub enum GenError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Cannot read {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Formatting: {0}")]
    Fmt(#[from] std::fmt::Error),
    #[error("Cannot finalize {path}: {reason}")]
    Persist { path: String, reason: String },
}
