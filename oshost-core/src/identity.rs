//! Memoized location of the running executable.
//!
//! The path is resolved on first use and kept for the lifetime of the
//! owning context.  First access is serialized by a `parking_lot::Mutex`,
//! so concurrent first calls resolve once and agree on the result.  A
//! failed resolution is reported at [`Severity::Fatal`] and is not
//! memoized: the next call queries the OS again.
//!
//! The path is kept as the OS returned it, so names that are not valid
//! Unicode survive unchanged.

use std::path::PathBuf;

use parking_lot::Mutex;

use crate::platform::ProcessApi;
use crate::report::{Reporter, Severity};

#[derive(Debug, Default)]
pub struct ExecutablePathCache {
    path: Mutex<Option<PathBuf>>,
}

impl ExecutablePathCache {
    pub const fn new() -> Self {
        Self {
            path: Mutex::new(None),
        }
    }

    /// The executable path, or an empty path if it cannot be determined.
    pub fn get(&self, process: &impl ProcessApi, reporter: &Reporter) -> PathBuf {
        let mut slot = self.path.lock();
        if let Some(path) = slot.as_ref() {
            return path.clone();
        }

        match process.current_image_path() {
            Ok(path) => {
                *slot = Some(path.clone());
                path
            }
            Err(code) => {
                // The sink may ask for the path again.
                drop(slot);
                reporter.report(
                    code,
                    Severity::Fatal,
                    "Failed to determine executable location!",
                );
                PathBuf::new()
            }
        }
    }

    /// The memoized path, without querying the OS.
    pub fn cached(&self) -> Option<PathBuf> {
        self.path.lock().clone()
    }
}
