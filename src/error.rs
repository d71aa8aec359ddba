//! Error types for the ingestion pipeline.
//!
//! Each stage owns its own error enum. Per-record failures ([`RecordError`])
//! are collected by the bulk pass; everything else aborts the enclosing
//! operation.

use std::path::PathBuf;
use thiserror::Error;

use crate::sql::{SqlDiagnostics, SqlIssue};

/// Errors raised while turning raw bytes into a [`RawValue`](crate::RawValue).
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("unsupported file format '{extension}'")]
    UnsupportedFormat { extension: String },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid XML at byte {position}: {message}")]
    Xml { position: u64, message: String },

    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Parsed input could not be turned into a sequence of records.
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("invalid data shape: expected an array or an object, got {found}")]
    InvalidDataShape { found: &'static str },
}

/// No usable columns were left after sanitization.
#[derive(Debug, Error, PartialEq)]
pub enum SqlBuildError {
    #[error("no valid data provided for insertion into {table}")]
    EmptyPayload { table: String },
}

/// Failures talking to the relational store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to database: {message}")]
    Connection { message: String },

    #[error("failed to disconnect from database: {message}")]
    Disconnection { message: String },

    #[error("statement rejected by database: {message}")]
    Execution { message: String },

    #[error("no open database connection")]
    NotConnected,
}

impl StoreError {
    /// True when the connection itself is gone, as opposed to one statement
    /// being rejected.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, StoreError::Connection { .. } | StoreError::NotConnected)
    }
}

/// Errors from the file-based migration batch and script execution.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid SQL in {origin}: {}", join_issues(.issues))]
    SqlValidation {
        origin: String,
        issues: Vec<SqlIssue>,
        diagnostics: SqlDiagnostics,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn join_issues(issues: &[SqlIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A single record could not be inserted. Collected, not fatal, unless the
/// connection is lost.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("{entity} record is missing required field(s): {}", .fields.join(", "))]
    MissingRequiredFields {
        entity: &'static str,
        fields: Vec<&'static str>,
    },

    #[error(transparent)]
    Build(#[from] SqlBuildError),

    #[error(transparent)]
    Migration(#[from] MigrationError),
}

impl RecordError {
    /// Whether the bulk pass must stop instead of moving to the next record.
    pub fn is_fatal(&self) -> bool {
        match self {
            RecordError::Migration(MigrationError::Store(err)) => err.is_connection_failure(),
            _ => false,
        }
    }
}

/// Failures that abort a bulk entity-processing pass.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Connection(#[from] StoreError),

    #[error("processing aborted at record {index}: {source}")]
    Aborted {
        index: usize,
        #[source]
        source: RecordError,
    },
}

/// Errors writing or removing scratch artifacts.
#[derive(Debug, Error)]
pub enum ScratchError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors loading runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("missing database setting: set DATABASE_URL or {variable}")]
    MissingVariable { variable: &'static str },

    #[error("invalid value '{value}' for {variable}")]
    InvalidValue { variable: &'static str, value: String },
}

/// Errors surfaced by the upload entry point.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid file format '{extension}', accepted formats are: {}", .allowed.join(", "))]
    UnsupportedExtension {
        extension: String,
        allowed: &'static [&'static str],
    },

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Scratch(#[from] ScratchError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),
}
