//! Error types for seriallog.
//!
//! This module defines all error types used throughout the seriallog crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use std::string::FromUtf8Error;

use thiserror::Error;

/// The main error type for seriallog operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Serial Port Errors ===
    /// The named serial port cannot be opened because it does not exist
    /// or is otherwise unavailable.
    #[error("could not open port {port}: {source}")]
    PortUnavailable {
        /// Name of the serial port.
        port: String,
        /// The underlying error.
        #[source]
        source: serialport::Error,
    },

    /// The operating environment refused access to the serial port.
    #[error("permission error accessing port {port}: {source}")]
    PortPermission {
        /// Name of the serial port.
        port: String,
        /// The underlying error.
        #[source]
        source: serialport::Error,
    },

    /// The serial port failed to open for any other reason.
    #[error("failed to open port {port}: {source}")]
    PortOpen {
        /// Name of the serial port.
        port: String,
        /// The underlying error.
        #[source]
        source: serialport::Error,
    },

    /// Enumerating the available serial ports failed.
    #[error("failed to enumerate serial ports: {0}")]
    PortList(#[source] serialport::Error),

    /// A read from the serial port failed.
    #[error("serial read failed: {0}")]
    PortRead(#[source] std::io::Error),

    /// The received bytes are not valid UTF-8 text.
    #[error("received bytes are not valid text: {0}")]
    Decode(#[from] FromUtf8Error),

    // === Output Errors ===
    /// The output file could not be created.
    #[error("failed to create output file {path}: {source}")]
    OutputCreate {
        /// Path to the output file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Writing a row to the output file failed.
    #[error("failed to write output row: {0}")]
    Csv(#[from] csv::Error),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for seriallog operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Classify a serial port open failure into its error category.
    ///
    /// "No such device" failures become [`Error::PortUnavailable`],
    /// permission refusals become [`Error::PortPermission`], and anything
    /// else becomes [`Error::PortOpen`].
    #[must_use]
    pub fn port_open(port: impl Into<String>, source: serialport::Error) -> Self {
        let port = port.into();
        match source.kind {
            serialport::ErrorKind::NoDevice => Self::PortUnavailable { port, source },
            serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                Self::PortUnavailable { port, source }
            }
            serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
                Self::PortPermission { port, source }
            }
            _ => Self::PortOpen { port, source },
        }
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Check if this error indicates the port does not exist or is in use.
    #[must_use]
    pub fn is_port_unavailable(&self) -> bool {
        matches!(self, Self::PortUnavailable { .. })
    }

    /// Check if this error is a permission issue.
    #[must_use]
    pub fn is_permission_error(&self) -> bool {
        matches!(self, Self::PortPermission { .. })
    }
}
