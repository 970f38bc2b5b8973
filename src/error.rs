//! Error types for IFC Verifier.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading scene graphs or rule documents.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read the input file from disk.
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid JSON for the expected shape.
    #[error("invalid JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The JSON parsed but does not describe the expected document.
    #[error("invalid document: {message}")]
    InvalidDocument { message: String },
}

/// Errors raised by the evaluation entry points.
///
/// Messy element data is never an error; only a caller handing over no
/// population or no specifications at all is.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    /// The element population or the specification list is absent.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

/// Errors that can occur when exporting data.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to create the output file.
    #[error("failed to create file '{path}': {source}")]
    FileCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write data to the file.
    #[error("failed to write data: {message}")]
    WriteError { message: String },

    /// Failed to serialize data to JSON.
    #[error("JSON serialization failed: {source}")]
    JsonSerialize {
        #[from]
        source: serde_json::Error,
    },

    /// Failed to write CSV data.
    #[error("CSV write failed: {source}")]
    CsvWrite {
        #[from]
        source: csv::Error,
    },
}
