//! `oshost_core` -- Resilient facade over host-OS primitives.
//!
//! Process identity, filesystem and version probes, clipboard transfer,
//! shell launch with a clipboard fallback, and best-effort process
//! hardening.  No operation here crashes the host: failures are either
//! returned as [`errors::PlatformError`] or classified by
//! [`report::Severity`] and handed to the application's sink.
//!
//! It can be consumed by:
//! - `oshost-ffi` (C ABI DLL for the host application)
//! - `oshost-cli` (standalone CLI tool)
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`errors`] | `ErrorCode`, `PlatformError` via `thiserror` |
//! | [`report`] | Severity levels, `ErrorSink`, re-entrancy-safe `Reporter` |
//! | [`platform`] | OS traits and the `windows-rs` implementation |
//! | [`identity`] | Memoized executable path |
//! | [`probe`] | File/directory existence, file and OS versions, CPU architecture |
//! | [`clipboard`] | RAII-guarded clipboard transfer |
//! | [`shell`] | Shell launch with detached recovery prompt |
//! | [`harden`] | Process mitigation policy table |
//! | [`context`] | `Context` tying the above together |
//! | `host` | Process-wide `Context<Win32>` and free functions (Windows only) |

pub mod clipboard;
pub mod context;
pub mod errors;
pub mod harden;
pub mod identity;
pub mod platform;
pub mod probe;
pub mod report;
pub mod shell;

#[cfg(windows)]
pub mod host;

#[cfg(test)]
pub(crate) mod testing;
