//! Error types for the quantpack pipeline.
//!
//! Every external-call boundary (git, cmake, pip, the Hub API, the
//! converter subprocess) maps its failures into one of these variants so
//! the CLI can render a single human-readable diagnostic.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the quantpack library.
#[derive(Debug, Error)]
pub enum QuantpackError {
    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        cause: Option<String>,
    },

    #[error("Hub API error: {message}")]
    HubApi {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Repository not found on the Hub: {repo_id}")]
    RepoNotFound { repo_id: String },

    #[error("Download failed for {url}: {message}")]
    DownloadFailed { url: String, message: String },

    #[error("Hash mismatch for {filename}: expected {expected}, got {actual}")]
    HashMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    // Toolchain provisioning errors
    #[error("Toolchain setup failed: {message}")]
    Toolchain { message: String },

    // Preflight validation errors
    #[error("Required tool not found on PATH: {0}")]
    ToolNotFound(String),

    #[error("Missing Python packages: {packages}. Install them with: {hint}")]
    MissingPackages { packages: String, hint: String },

    // Conversion errors
    #[error("No converter entry point found in {dir}; tried: {candidates}")]
    ConverterNotFound { dir: PathBuf, candidates: String },

    #[error("Conversion failed: {message}")]
    ConversionFailed { message: String },

    #[error("Converter reported success but produced no artifact at {0}")]
    ArtifactMissing(PathBuf),

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

/// Result type alias for quantpack operations.
pub type Result<T> = std::result::Result<T, QuantpackError>;

impl From<std::io::Error> for QuantpackError {
    fn from(err: std::io::Error) -> Self {
        QuantpackError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for QuantpackError {
    fn from(err: serde_json::Error) -> Self {
        QuantpackError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for QuantpackError {
    fn from(err: reqwest::Error) -> Self {
        QuantpackError::Network {
            message: err.to_string(),
            cause: err.url().map(|u| u.to_string()),
        }
    }
}

impl QuantpackError {
    /// Create an IO error with an operation description and path context.
    pub fn io(context: &str, path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        QuantpackError::Io {
            message: format!("{context}: {err}"),
            path: Some(path.into()),
            source: Some(err),
        }
    }
}
