//! Error types and handling for gbuf-http
//!
//! Every operation resolves to a single [`GbufError`]: the first failure wins,
//! nothing is aggregated and nothing is retried.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for gbuf-http operations
pub type Result<T> = std::result::Result<T, GbufError>;

/// Why a request was rejected before anything was sent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// URL is missing or blank
    #[error("url must be a non-empty string")]
    EmptyUrl,

    /// URL is present but not an absolute URL
    #[error("url '{url}' is not a valid absolute URL: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// HTTP method is missing or blank
    #[error("method must be a non-empty string")]
    EmptyMethod,

    /// HTTP method is not one the dispatcher knows how to handle
    #[error("unsupported method '{0}' (expected one of get, delete, head, options, post, put, patch)")]
    UnsupportedMethod(String),

    /// Schema file path is missing or blank
    #[error("schema path must be a non-empty string")]
    EmptySchemaPath,

    /// Message type name is missing or blank
    #[error("message name must be a non-empty string")]
    EmptyMessageName,

    /// A write method was dispatched without a payload
    #[error("{0} requires a payload")]
    MissingPayload(&'static str),

    /// A caller-supplied header could not be represented
    #[error("invalid header '{0}'")]
    InvalidHeader(String),
}

/// Error types for encode, decode, and dispatch operations
#[derive(Error, Debug)]
pub enum GbufError {
    // ═══════════════════════════════════════════════════════════════
    // Argument validation
    // ═══════════════════════════════════════════════════════════════
    /// One of the required parameters is missing or malformed
    #[error("Function params are invalid: {0}")]
    InvalidArguments(#[from] ValidationError),

    // ═══════════════════════════════════════════════════════════════
    // Schema resolution
    // ═══════════════════════════════════════════════════════════════
    /// Schema file could not be read or parsed
    #[error("Failed to load schema {path}: {reason}")]
    SchemaLoad { path: PathBuf, reason: String },

    /// Message type is not declared in the schema
    #[error("no such type: {message} in {path}")]
    MessageNotFound { message: String, path: PathBuf },

    /// Short message name matches more than one declared type
    #[error("message name '{message}' is ambiguous in {path}: {candidates:?}")]
    AmbiguousMessage {
        message: String,
        path: PathBuf,
        candidates: Vec<String>,
    },

    // ═══════════════════════════════════════════════════════════════
    // Encoding & decoding
    // ═══════════════════════════════════════════════════════════════
    /// Payload does not conform to the message type
    #[error("Payload verification failed for {message}: {reason}")]
    Verification { message: String, reason: String },

    /// Response bytes do not parse as the expected message type
    #[error("Failed to decode {message}: {reason}")]
    Decode { message: String, reason: String },

    // ═══════════════════════════════════════════════════════════════
    // Transport
    // ═══════════════════════════════════════════════════════════════
    /// HTTP client failed to send the request or receive the body
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    // ═══════════════════════════════════════════════════════════════
    // Configuration
    // ═══════════════════════════════════════════════════════════════
    /// Failed to read configuration file
    #[error("Failed to read config from {path}: {reason}")]
    ConfigRead { path: PathBuf, reason: String },

    /// Failed to write configuration file
    #[error("Failed to write config to {path}: {reason}")]
    ConfigWrite { path: PathBuf, reason: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ═══════════════════════════════════════════════════════════════
    // Other Errors
    // ═══════════════════════════════════════════════════════════════
    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GbufError {
    /// Get the exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArguments(_) => 2,
            Self::SchemaLoad { .. } | Self::MessageNotFound { .. } | Self::AmbiguousMessage { .. } => {
                3
            }
            Self::Transport(_) => 4,
            Self::Verification { .. } => 5,
            Self::Decode { .. } => 6,
            Self::ConfigRead { .. } | Self::ConfigWrite { .. } | Self::InvalidConfig(_) => 7,
            Self::Internal(_) => 1,
        }
    }

    /// Whether repeating the same call could succeed.
    ///
    /// Only transport failures qualify; schema, payload and decode errors are
    /// deterministic. Retrying is always up to the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            _ => false,
        }
    }

    pub(crate) fn schema_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SchemaLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
