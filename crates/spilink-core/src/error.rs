//! Error types for spilink-core
//!
//! This module provides a no_std compatible error type shared by the
//! session and every backend at the trait boundary.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Configuration errors
    /// Settings ask for something this core does not support (chip-select
    /// polarity, SPI mode value, word size)
    UnsupportedConfiguration,

    // Open errors
    /// No bus matched the requested identifier
    DeviceNotFound,
    /// The platform failed to hand out a transport handle
    TransportOpenFailed,

    // Operation errors
    /// Empty buffer, or mismatched buffer lengths on a duplex transfer
    InvalidArgument,
    /// Operation attempted on a closed session
    SessionClosed,
    /// The transport reported a failure while moving data
    TransferFailed,
}

impl Error {
    /// Returns true if retrying the failed operation may succeed without
    /// changing the caller's input
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::TransportOpenFailed | Self::TransferFailed)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedConfiguration => write!(f, "unsupported SPI configuration"),
            Self::DeviceNotFound => write!(f, "SPI device not found"),
            Self::TransportOpenFailed => write!(f, "failed to open SPI transport"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::SessionClosed => write!(f, "SPI session is closed"),
            Self::TransferFailed => write!(f, "SPI transfer failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl embedded_io::Error for Error {
    fn kind(&self) -> embedded_io::ErrorKind {
        use embedded_io::ErrorKind;

        match self {
            Self::UnsupportedConfiguration => ErrorKind::Unsupported,
            Self::DeviceNotFound => ErrorKind::NotFound,
            Self::TransportOpenFailed => ErrorKind::Other,
            Self::InvalidArgument => ErrorKind::InvalidInput,
            Self::SessionClosed => ErrorKind::NotConnected,
            Self::TransferFailed => ErrorKind::Other,
        }
    }
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(Error::TransferFailed.is_transient());
        assert!(Error::TransportOpenFailed.is_transient());
        assert!(!Error::UnsupportedConfiguration.is_transient());
        assert!(!Error::DeviceNotFound.is_transient());
        assert!(!Error::InvalidArgument.is_transient());
        assert!(!Error::SessionClosed.is_transient());
    }
}
