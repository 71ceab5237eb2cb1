//! Error types for SPINE operations

use thiserror::Error;

use crate::model::FunctionType;

/// The main error type for SPINE operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A datagram could not be handed to the transport
    #[error("Transport error: {0}")]
    Transport(String),

    /// An explicitly requested heartbeat could not be delivered
    #[error("Heartbeat reply failed: {0}")]
    ReplyFailed(#[source] Box<Error>),

    /// No data of the given function has been received or stored yet
    #[error("Data not available: {0}")]
    DataNotAvailable(FunctionType),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// A specialized Result type for SPINE operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
