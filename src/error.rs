//! Error types for the mining client
//!
//! This module provides the error handling system using `thiserror`, split
//! into miner-side and network-side sub-hierarchies.

use thiserror::Error;

/// Miner and device error subtypes
#[derive(Error, Debug)]
pub enum MinerError {
    /// A constructor was handed a value of the wrong shape
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong with the value
        message: String,
    },

    /// Device selection matched nothing
    #[error("No OpenCL devices available")]
    NoDevices,

    /// Kernel compilation failed; carries the compiler log
    #[error("Kernel build failed with arguments [{args}]:\n{log}")]
    BuildFailed {
        /// Compiler log as reported by the OpenCL runtime
        log: String,
        /// The compiler arguments that were used
        args: String,
    },

    /// The GPU disagreed with the host reference on a canned test input
    #[error("Kernel self-test failed for input {input:?}: expected {expected}, got {got}")]
    TestFailed {
        /// The canned test input
        input: String,
        /// Host reference result
        expected: String,
        /// Device result
        got: String,
    },

    /// Unrecovered OpenCL runtime error; fatal for the affected miner
    #[error("OpenCL device fault: {0}")]
    DeviceFault(#[from] ocl::Error),
}

/// Network error subtypes
#[derive(Error, Debug)]
pub enum NetworkError {
    /// The bootstrap handshake returned `ok: false`
    #[error("Bootstrap rejected by node: {reason}")]
    BootstrapRejected {
        /// Error string from the node, if any
        reason: String,
    },

    /// The WebSocket connection closed
    #[error("Connection dropped ({code}): {reason}")]
    Dropped {
        /// Close code, 0 when unknown
        code: u16,
        /// Close reason, empty when unknown
        reason: String,
    },

    /// The node sent a message we could not make sense of
    #[error("Invalid message from node: {message}")]
    InvalidMessage {
        /// Description of the malformed part
        message: String,
    },
}

/// Main error type for the mining client
#[derive(Error, Debug)]
pub enum Error {
    /// Miner and device errors
    #[error("Miner error: {0}")]
    Miner(#[from] MinerError),

    /// Network errors
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket transport errors
    #[error("WebSocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the mining client
pub type Result<T> = std::result::Result<T, Error>;

impl From<ocl::Error> for Error {
    fn from(error: ocl::Error) -> Self {
        Self::Miner(MinerError::DeviceFault(error))
    }
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::Miner(MinerError::InvalidArgument {
            message: message.into(),
        })
    }

    /// Create a no-devices error
    pub fn no_devices() -> Self {
        Self::Miner(MinerError::NoDevices)
    }

    /// Create a kernel build failure error
    pub fn build_failed(log: impl Into<String>, args: impl Into<String>) -> Self {
        Self::Miner(MinerError::BuildFailed {
            log: log.into(),
            args: args.into(),
        })
    }

    /// Create a kernel self-test failure error
    pub fn test_failed(
        input: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Self::Miner(MinerError::TestFailed {
            input: input.into(),
            expected: expected.into(),
            got: got.into(),
        })
    }

    /// Create a bootstrap rejection error
    pub fn bootstrap_rejected(reason: impl Into<String>) -> Self {
        Self::Network(NetworkError::BootstrapRejected {
            reason: reason.into(),
        })
    }

    /// Create a connection dropped error
    pub fn dropped(code: u16, reason: impl Into<String>) -> Self {
        Self::Network(NetworkError::Dropped {
            code,
            reason: reason.into(),
        })
    }

    /// Create an invalid message error
    pub fn invalid_message(message: impl Into<String>) -> Self {
        Self::Network(NetworkError::InvalidMessage {
            message: message.into(),
        })
    }

    /// Whether the runner may recover from this error by reconnecting
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Network(NetworkError::Dropped { .. }) | Error::Http(_) | Error::Ws(_)
        )
    }
}
