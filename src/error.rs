//! Driver errors and status codes.

use core::fmt;

use crate::controller::CommandMode;

/// SDRAM driver error.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The driver is not attached (not initialized, or de-initialized).
    NotAttached,
    /// The controller rejected or timed out a command.
    Command(CommandMode),
    /// The controller refused the refresh timer value.
    RefreshRate,
    /// A diagnostic pass read back a different word than it wrote.
    Mismatch {
        /// Byte offset of the first mismatching word.
        offset: u32,
        expected: u32,
        actual: u32,
    },
    /// The device is busy; retry later.
    Busy,
    /// The device did not become ready within the busy timeout.
    Timeout,
    /// Empty buffer, zero size, out-of-range address or reserved encoding.
    InvalidParameter,
}

impl Error {
    /// Collapse into the uniform status code.
    pub const fn status(self) -> StatusCode {
        match self {
            Error::NotAttached | Error::Command(_) | Error::RefreshRate | Error::Mismatch { .. } => {
                StatusCode::Error
            }
            Error::Busy => StatusCode::Busy,
            Error::Timeout => StatusCode::Timeout,
            Error::InvalidParameter => StatusCode::InvalidParameter,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotAttached => f.write_str("driver not attached"),
            Error::Command(mode) => write!(f, "{} command failed", mode.as_str()),
            Error::RefreshRate => f.write_str("refresh rate programming failed"),
            Error::Mismatch {
                offset,
                expected,
                actual,
            } => write!(
                f,
                "mismatch at offset {:#010x}: expected {:#010x}, got {:#010x}",
                offset, expected, actual
            ),
            Error::Busy => f.write_str("busy"),
            Error::Timeout => f.write_str("timeout"),
            Error::InvalidParameter => f.write_str("invalid parameter"),
        }
    }
}

/// Uniform status code, numbered like the vendor driver's C API.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StatusCode {
    Ok = 0x00,
    Error = 0x01,
    Busy = 0x02,
    Timeout = 0x03,
    InvalidParameter = 0x04,
}

impl StatusCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Error => "ERROR",
            StatusCode::Busy => "BUSY",
            StatusCode::Timeout => "TIMEOUT",
            StatusCode::InvalidParameter => "INVALID_PARAM",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<T> From<Result<T, Error>> for StatusCode {
    fn from(result: Result<T, Error>) -> Self {
        match result {
            Ok(_) => StatusCode::Ok,
            Err(e) => e.status(),
        }
    }
}

impl From<Error> for StatusCode {
    fn from(e: Error) -> Self {
        e.status()
    }
}
