//! Error types for the tracker.
//!
//! Every fallible operation in the crate returns [`RpsError`]. Storage and
//! configuration failures carry their own enums so callers can tell a bad
//! request apart from a broken environment.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error returned by tracker operations.
#[derive(Error, Debug)]
pub enum RpsError {
    /// Malformed, missing or out-of-range input. The caller can fix it.
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// The entity does not exist, or exists but belongs to somebody else.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    /// The owner already has a course with this code.
    #[error("a course with code '{code}' already exists")]
    DuplicateCode { code: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl RpsError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        RpsError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, id: u64) -> Self {
        RpsError::NotFound { kind, id }
    }

    /// Process exit code used by the CLI.
    ///
    /// Request errors exit with 1, environment errors with 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            RpsError::Validation { .. } | RpsError::NotFound { .. } | RpsError::DuplicateCode { .. } => 1,
            RpsError::Storage(_) | RpsError::Config(_) => 2,
        }
    }
}

/// Failures of the persistence layer. Fatal to the request, never retried.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode store: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Configuration loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for '{key}': {message}")]
    InvalidValue { key: &'static str, message: String },
}

pub type Result<T, E = RpsError> = std::result::Result<T, E>;
