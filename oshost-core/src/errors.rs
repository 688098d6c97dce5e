//! Error types for `oshost_core`.
//!
//! Every fallible OS call is reduced to an [`ErrorCode`] (HRESULT-shaped),
//! and operations that hand a failure back to the caller wrap it in
//! [`PlatformError`].  `Display` and `Error` come from `thiserror`.

use std::fmt;

use thiserror::Error;

/// Win32 `ERROR_FILE_NOT_FOUND`.
pub const ERROR_FILE_NOT_FOUND: u32 = 2;
/// Win32 `ERROR_PATH_NOT_FOUND`.
pub const ERROR_PATH_NOT_FOUND: u32 = 3;
/// Win32 `ERROR_OLD_WIN_VERSION`, returned by `VerifyVersionInfoW` when the
/// running OS does not satisfy the comparison.
pub const ERROR_OLD_WIN_VERSION: u32 = 1150;
/// Win32 `ERROR_RESOURCE_TYPE_NOT_FOUND`, what the version APIs report for a
/// file without a version block.
pub const ERROR_RESOURCE_TYPE_NOT_FOUND: u32 = 1813;

const FACILITY_WIN32: u32 = 7;

/// An HRESULT-shaped platform error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    /// `S_OK`.
    pub const OK: ErrorCode = ErrorCode(0);

    /// Fold a Win32 error value into an HRESULT (`HRESULT_FROM_WIN32`).
    pub const fn from_win32(error: u32) -> Self {
        if error as i32 <= 0 {
            ErrorCode(error as i32)
        } else {
            ErrorCode(((error & 0x0000_FFFF) | (FACILITY_WIN32 << 16) | 0x8000_0000) as i32)
        }
    }

    /// The Win32 error value carried in a `FACILITY_WIN32` HRESULT, if any.
    pub const fn win32(self) -> Option<u32> {
        let raw = self.0 as u32;
        if raw & 0xFFFF_0000 == 0x8007_0000 {
            Some(raw & 0xFFFF)
        } else {
            None
        }
    }

    pub const fn is_failure(self) -> bool {
        self.0 < 0
    }

    /// True when the code means the path simply does not exist.
    pub fn is_not_found(self) -> bool {
        matches!(
            self.win32(),
            Some(ERROR_FILE_NOT_FOUND) | Some(ERROR_PATH_NOT_FOUND)
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0 as u32)
    }
}

#[cfg(windows)]
impl From<windows::core::Error> for ErrorCode {
    fn from(err: windows::core::Error) -> Self {
        ErrorCode(err.code().0)
    }
}

#[cfg(windows)]
impl From<windows::core::HRESULT> for ErrorCode {
    fn from(hr: windows::core::HRESULT) -> Self {
        ErrorCode(hr.0)
    }
}

/// A failed OS call, handed back to the caller instead of being logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("PlatformError: {operation} failed with {code}")]
pub struct PlatformError {
    /// Name of the OS call that failed.
    pub operation: &'static str,
    pub code: ErrorCode,
}

impl PlatformError {
    /// Operation name used when a `windows` error arrives without one.
    pub const UNNAMED_OPERATION: &'static str = "Windows API call";

    pub const fn new(operation: &'static str, code: ErrorCode) -> Self {
        Self { operation, code }
    }
}

#[cfg(windows)]
impl From<windows::core::Error> for PlatformError {
    fn from(err: windows::core::Error) -> Self {
        Self::new(Self::UNNAMED_OPERATION, err.into())
    }
}

/// Value or platform error: the result type of every fallible probe.
pub type OperationResult<T> = Result<T, PlatformError>;
