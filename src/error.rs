use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when talking to the episode backend
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Request to {url} failed after {attempts} attempt(s): {source}")]
    Network {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("No record at {url}")]
    NotFound { url: String },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Unexpected response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while turning a raw backend record into a display episode
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("Episode '{id}' has a non-numeric duration '{value}'")]
    InvalidDuration { id: String, value: String },

    #[error("Episode '{id}' has an unparseable publish date '{value}': {reason}")]
    InvalidDate {
        id: String,
        value: String,
        reason: String,
    },
}

/// Broad failure classes the hosting layer reacts to differently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Render a terminal 404 page
    NotFound,
    /// Backend unreachable or misbehaving; retried already
    Network,
    /// Backend data could not be parsed; fail the build
    MalformedData,
}

/// Errors that can occur while enumerating or loading episode pages
#[derive(Error, Debug)]
pub enum PageError {
    #[error("Episode '{identity}' does not exist")]
    NotFound { identity: String },

    #[error("Backend error: {0}")]
    Backend(#[source] ApiError),

    #[error("Malformed episode data: {0}")]
    Malformed(#[from] NormalizeError),
}

impl PageError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PageError::NotFound { .. } => FailureKind::NotFound,
            PageError::Backend(ApiError::Decode { .. }) => FailureKind::MalformedData,
            PageError::Backend(_) => FailureKind::Network,
            PageError::Malformed(_) => FailureKind::MalformedData,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == FailureKind::NotFound
    }
}

/// Errors that can occur while reading or writing the build manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write manifest {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest JSON in {path}: {source}")]
    JsonParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize manifest: {0}")]
    JsonSerializeFailed(#[from] serde_json::Error),
}

/// Top-level errors for static site builds
#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Page error: {0}")]
    Page(#[from] PageError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write page {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove page {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
