//! Error types for chaindbgd
//!
//! Only the glue (netlink socket, configuration, sinks) can fail. The
//! formatters degrade their output instead of returning errors.

use thiserror::Error;

/// Chain debugger errors
#[derive(Error, Debug)]
pub enum ChaindbgError {
    /// Netlink socket error
    #[error("Netlink error: {0}")]
    Netlink(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Output sink error
    #[error("Sink error: {0}")]
    Sink(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for chaindbgd operations
pub type Result<T> = std::result::Result<T, ChaindbgError>;
