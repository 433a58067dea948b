//! Device error types

use std::io;
use thiserror::Error;

/// Machine-checkable classification of a [`DeviceError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Wraps an OS error; inspect [`DeviceError::errno`] for the value
    Errno,
    /// A read did not complete within the configured timeout
    TimedOut,
    /// Any other transport-level failure
    Transport,
}

/// Errors that can occur while talking to a lighting device
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Communication timeout")]
    Timeout,

    #[error("Unknown key block {0}")]
    UnknownBlock(u8),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl DeviceError {
    /// The error a transport reports once the device node is gone
    pub fn removed() -> Self {
        DeviceError::Io(io::Error::from_raw_os_error(libc::ENODEV))
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            DeviceError::Io(_) => ErrorCode::Errno,
            DeviceError::Timeout => ErrorCode::TimedOut,
            DeviceError::UnknownBlock(_) | DeviceError::Transport(_) => ErrorCode::Transport,
        }
    }

    /// OS error number, for [`ErrorCode::Errno`] errors that carry one
    pub fn errno(&self) -> Option<i32> {
        match self {
            DeviceError::Io(e) => e.raw_os_error(),
            _ => None,
        }
    }

    /// True when the device was unplugged (`ENODEV`)
    pub fn is_device_removed(&self) -> bool {
        self.code() == ErrorCode::Errno && self.errno() == Some(libc::ENODEV)
    }
}
