//! Error types for sonic-io

use std::time::Duration;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// sonic-io error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer closed the connection (zero-length receive)
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// No complete data arrived within the configured window
    #[error("Read timed out after {0:?}")]
    Timeout(Duration),

    /// TCP login rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Buffered bytes exceeded the line limit without a terminator
    #[error("Line exceeds {0} bytes without terminator")]
    LineTooLong(usize),

    /// Line does not have the expected shape
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Payload token is not a number
    #[error("Invalid value {token:?} for field {key}")]
    InvalidValue {
        /// Protocol key the token belongs to
        key: String,
        /// Raw token as received
        token: String,
    },

    /// Unit or description missing for a publish name
    #[error("Missing {kind} metadata for {name}")]
    MissingMetadata {
        /// Which table lacked the entry ("units" or "description")
        kind: &'static str,
        /// Fully-qualified publish name
        name: String,
    },

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error leaves the transport unusable.
    ///
    /// Transport-level errors end the current session and trigger a
    /// reconnect. Everything else only spoils the record being read.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Serial(_)
                | Error::Io(_)
                | Error::ConnectionClosed
                | Error::Timeout(_)
                | Error::Authentication(_)
        )
    }
}
