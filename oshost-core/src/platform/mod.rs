//! The OS boundary.
//!
//! Each concern of the facade talks to the operating system through one of
//! the small traits below.  [`Win32`] implements all of them on Windows;
//! tests drive the same orchestration code through an in-memory fake.
//!
//! The traits are deliberately thin: one method per OS call, no policy.
//! Ordering, ownership hand-off, failure classification and reporting live
//! in the modules that use them.

#[cfg(windows)]
mod win32;
#[cfg(windows)]
pub use win32::{last_error, Win32};

use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use crate::errors::{ErrorCode, OperationResult};

/// Maximum path length, in UTF-16 units, when long paths are enabled.
pub const LONG_PATH: usize = 32_767;

/// `FILE_ATTRIBUTE_DIRECTORY`.
pub const FILE_ATTRIBUTE_DIRECTORY: u32 = 0x10;

/// Raw attribute bits of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileAttributes(pub u32);

impl FileAttributes {
    pub const fn is_directory(self) -> bool {
        self.0 & FILE_ATTRIBUTE_DIRECTORY != 0
    }
}

/// Opaque handle to a movable global memory block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalMemory(pub isize);

/// Process mitigation policies applied by the hardener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MitigationPolicy {
    Aslr,
    DynamicCode,
    StrictHandleCheck,
    ExtensionPointDisable,
    Signature,
    ImageLoad,
}

/// Identity of the running process and the OS underneath it.
pub trait ProcessApi {
    /// Full Win32 path of the current process image.
    fn current_image_path(&self) -> Result<PathBuf, ErrorCode>;

    /// Raw `wProcessorArchitecture` of the native system.
    fn native_architecture(&self) -> u16;

    /// `Ok(())` if the OS is 10.0 with at least `build`, otherwise the
    /// verification error (`ERROR_OLD_WIN_VERSION` when simply too old).
    fn verify_min_build(&self, build: u32) -> Result<(), ErrorCode>;
}

/// Attribute and version-resource queries.
pub trait FileSystemApi {
    fn file_attributes(&self, path: &Path) -> Result<FileAttributes, ErrorCode>;

    /// The OS system directory (`System32`).
    fn system_directory(&self) -> Result<PathBuf, ErrorCode>;

    /// Read a string value out of a file's version resource.  The error
    /// names whichever version-info call failed.
    fn version_string(&self, path: &Path, sub_block: &str) -> OperationResult<String>;
}

/// The clipboard and the global memory it takes ownership of.
pub trait ClipboardApi {
    fn open_clipboard(&self) -> Result<(), ErrorCode>;
    fn close_clipboard(&self);
    fn empty_clipboard(&self) -> Result<(), ErrorCode>;

    /// Allocate movable memory for `units` UTF-16 code units.
    fn global_alloc(&self, units: usize) -> Result<GlobalMemory, ErrorCode>;
    fn global_lock(&self, memory: GlobalMemory) -> Result<NonNull<u16>, ErrorCode>;
    fn global_unlock(&self, memory: GlobalMemory);
    fn global_free(&self, memory: GlobalMemory);

    /// Hand `memory` to the clipboard as `CF_UNICODETEXT`.  Ownership moves
    /// to the OS only when this returns `Ok`.
    fn set_unicode_text(&self, memory: GlobalMemory) -> Result<(), ErrorCode>;
}

/// Shell launch and the user prompt used to recover from it.
pub trait ShellApi {
    /// Invoke the shell's `open` verb on `target`, tagged with `class`.
    fn shell_open(&self, target: &str, class: &str) -> Result<(), ErrorCode>;

    /// Blocking, ownerless Yes/No warning dialog.  True on Yes.
    fn confirm(&self, message: &str, caption: &str) -> bool;

    /// Human-readable description of an error code.
    fn describe(&self, code: ErrorCode) -> String;
}

/// Process mitigation policies and the volume lookups they depend on.
pub trait MitigationApi {
    /// Current flag word of `policy` for this process.
    fn query_policy(&self, policy: MitigationPolicy) -> Result<u32, ErrorCode>;
    fn install_policy(&self, policy: MitigationPolicy, flags: u32) -> Result<(), ErrorCode>;

    /// Mount point of the volume holding `path`.
    fn volume_path(&self, path: &Path) -> Result<PathBuf, ErrorCode>;
    fn is_remote_drive(&self, volume: &Path) -> bool;
}

/// Everything the facade needs from the OS, in one bound.
pub trait Platform:
    ProcessApi + FileSystemApi + ClipboardApi + ShellApi + MitigationApi + Clone + Send + Sync + 'static
{
}

impl<T> Platform for T where
    T: ProcessApi
        + FileSystemApi
        + ClipboardApi
        + ShellApi
        + MitigationApi
        + Clone
        + Send
        + Sync
        + 'static
{
}
