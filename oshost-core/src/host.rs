//! Process-wide facade over the real OS.
//!
//! One [`Context<Win32>`] per process, created on first use.  The free
//! functions below are the interface the rest of the application calls.
//!
//! # Thread safety
//!
//! The context lives in a `OnceLock`; its mutable parts (sink slot,
//! executable-path memo, app name) sit behind `parking_lot` locks.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::context::{Context, SystemReport};
use crate::errors::OperationResult;
use crate::platform::Win32;
use crate::report::ErrorSink;

static HOST: OnceLock<Context<Win32>> = OnceLock::new();

pub fn host() -> &'static Context<Win32> {
    HOST.get_or_init(|| Context::new(Win32))
}

/// Plug in the application's logging sink.
pub fn install_sink(sink: Arc<dyn ErrorSink>) {
    host().install_sink(sink);
}

pub fn set_app_name(name: impl Into<String>) {
    host().set_app_name(name);
}

pub fn get_executable_path() -> PathBuf {
    host().executable_path()
}

pub fn get_os_build_version() -> OperationResult<String> {
    host().os_build_version()
}

pub fn get_file_version(path: impl AsRef<Path>) -> OperationResult<String> {
    host().file_version(path)
}

pub fn is_directory(path: impl AsRef<Path>) -> bool {
    host().is_directory(path)
}

pub fn file_exists(path: impl AsRef<Path>) -> bool {
    host().file_exists(path)
}

pub fn is_at_least_build(build: u32) -> bool {
    host().is_at_least_build(build)
}

pub fn copy_to_clipboard(text: &str) -> bool {
    host().copy_to_clipboard(text)
}

pub fn edit_file(file: &str) {
    host().edit_file(file);
}

pub fn open_link(link: &str) {
    host().open_link(link);
}

pub fn open_folder(folder: &str) {
    host().open_folder(folder);
}

pub fn harden_process() {
    host().harden_process();
}

/// One of `x64`, `x86`, `ARM64`, `ARM`, `Itanium`, `Unknown`, `Invalid`.
pub fn get_processor_architecture_name() -> &'static str {
    host().processor_architecture().name()
}

pub fn system_report() -> SystemReport {
    host().system_report()
}
