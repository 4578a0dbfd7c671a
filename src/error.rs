//! Error types for imgscribe.

use thiserror::Error;

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("environment variable 'GEMINI_API_KEY' is not set")]
    MissingApiKey,
}

/// Errors related to image discovery.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("directory walk error: {0}")]
    WalkError(String),

    #[error("failed to create directory {path}: {source}")]
    CreateDirError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid exclude pattern '{0}'")]
    InvalidPattern(String),
}

/// Errors returned by the generative-AI service client.
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("model returned no text{}", .0.as_deref().map(|r| format!(" (reason: {r})")).unwrap_or_default())]
    EmptyResponse(Option<String>),
}

/// Errors raised while processing a single image.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read image: {0}")]
    ReadError(#[source] std::io::Error),

    #[error("{0}")]
    Gemini(#[from] GeminiError),

    #[error("failed to write output: {0}")]
    WriteError(#[source] std::io::Error),
}

/// A run that a shutdown signal stopped part-way.
#[derive(Debug, Error)]
#[error("interrupted after {processed} of {found} images")]
pub struct Interrupted {
    pub processed: u64,
    pub found: u64,
}
