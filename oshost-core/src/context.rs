//! [`Context`]: the facade as the rest of the application sees it.
//!
//! A context owns a platform handle, the [`Reporter`] every failure goes
//! through, the memoized executable path and the one-shot hardening flag.
//! On Windows the process-wide instance lives in [`crate::host`]; tests
//! build their own over a fake platform.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::errors::OperationResult;
use crate::identity::ExecutablePathCache;
use crate::platform::Platform;
use crate::probe::{self, ProcessorArchitecture};
use crate::report::{ErrorSink, Reporter};
use crate::{clipboard, harden, shell};

/// Application name used in dialog captions until the host sets its own.
pub const DEFAULT_APP_NAME: &str = "oshost";

/// Owned, serializable summary of the process and the OS under it.
#[derive(Debug, Clone, Serialize)]
pub struct SystemReport {
    /// Display form of the executable path; not for passing back to the OS.
    pub executable_path: String,
    pub os_build: Option<String>,
    pub processor_architecture: &'static str,
}

pub struct Context<P: Platform> {
    platform: P,
    reporter: Reporter,
    app_name: RwLock<String>,
    executable_path: ExecutablePathCache,
    hardened: AtomicBool,
}

impl<P: Platform> Context<P> {
    pub fn new(platform: P) -> Self {
        Self::with_reporter(platform, Reporter::new())
    }

    pub fn with_reporter(platform: P, reporter: Reporter) -> Self {
        Self {
            platform,
            reporter,
            app_name: RwLock::new(DEFAULT_APP_NAME.to_owned()),
            executable_path: ExecutablePathCache::new(),
            hardened: AtomicBool::new(false),
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Route failures to the host's sink from now on.
    pub fn install_sink(&self, sink: Arc<dyn ErrorSink>) {
        self.reporter.install(sink);
    }

    pub fn set_app_name(&self, name: impl Into<String>) {
        *self.app_name.write() = name.into();
    }

    pub fn app_name(&self) -> String {
        self.app_name.read().clone()
    }

    fn error_caption(&self) -> String {
        format!("{} - Error", self.app_name.read())
    }

    // -- identity and probes ------------------------------------------------

    /// Path of the running executable; empty if it cannot be determined.
    pub fn executable_path(&self) -> PathBuf {
        self.executable_path.get(&self.platform, &self.reporter)
    }

    pub fn os_build_version(&self) -> OperationResult<String> {
        probe::os_build_version(&self.platform)
    }

    pub fn file_version(&self, path: impl AsRef<Path>) -> OperationResult<String> {
        probe::file_version(&self.platform, path.as_ref())
    }

    pub fn is_directory(&self, path: impl AsRef<Path>) -> bool {
        probe::is_directory(&self.platform, &self.reporter, path.as_ref())
    }

    pub fn file_exists(&self, path: impl AsRef<Path>) -> bool {
        probe::file_exists(&self.platform, &self.reporter, path.as_ref())
    }

    pub fn is_at_least_build(&self, build: u32) -> bool {
        probe::is_at_least_build(&self.platform, &self.reporter, build)
    }

    pub fn processor_architecture(&self) -> ProcessorArchitecture {
        probe::processor_architecture(&self.platform)
    }

    pub fn system_report(&self) -> SystemReport {
        SystemReport {
            executable_path: self.executable_path().to_string_lossy().into_owned(),
            os_build: self.os_build_version().ok(),
            processor_architecture: self.processor_architecture().name(),
        }
    }

    // -- clipboard and shell ------------------------------------------------

    pub fn copy_to_clipboard(&self, text: &str) -> bool {
        clipboard::copy_to_clipboard(&self.platform, &self.reporter, text)
    }

    pub fn edit_file(&self, file: &str) {
        shell::edit_file(&self.platform, &self.reporter, &self.error_caption(), file);
    }

    pub fn open_link(&self, link: &str) {
        shell::open_link(&self.platform, &self.reporter, &self.error_caption(), link);
    }

    pub fn open_folder(&self, folder: &str) {
        shell::open_folder(&self.platform, &self.reporter, &self.error_caption(), folder);
    }

    // -- hardening ----------------------------------------------------------

    /// Apply the mitigation table.  Only the first call does anything.
    pub fn harden_process(&self) {
        if self.hardened.swap(true, Ordering::AcqRel) {
            log::debug!("process already hardened");
            return;
        }
        harden::harden_process(&self.platform, &self.reporter, &|| self.executable_path());
    }
}
