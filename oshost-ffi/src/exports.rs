//! The exported facade functions.  Windows only: they drive the
//! process-wide context in `oshost_core::host`.

use std::ffi::OsString;
use std::os::windows::ffi::{OsStrExt, OsStringExt};
use std::path::PathBuf;
use std::sync::Arc;

use oshost_core::errors::ErrorCode;
use oshost_core::host;
use oshost_core::report::{ErrorSink, Severity};

use crate::{
    read_units, read_wide, set_last_error, to_wide, write_out, write_str_out, OSHOST_ERROR,
    OSHOST_OK, OSHOST_SEVERITY_DEBUG, OSHOST_SEVERITY_ERROR, OSHOST_SEVERITY_FATAL,
    OSHOST_SEVERITY_LOG,
};

/// Host logging callback: `(hresult, severity, message)`.  `message` is
/// only valid for the duration of the call.
pub type OshostLogCallback = extern "C" fn(code: i32, severity: i32, message: *const u16);

/// Read a null-terminated UTF-16 path argument, keeping it as the OS sees it.
unsafe fn read_path(ptr: *const u16, name: &str) -> Option<PathBuf> {
    let units = unsafe { read_units(ptr, name) }?;
    Some(PathBuf::from(OsString::from_wide(units)))
}

fn predicate(value: bool) -> i32 {
    i32::from(value)
}

fn severity_code(severity: Severity) -> i32 {
    match severity {
        Severity::Debug => OSHOST_SEVERITY_DEBUG,
        Severity::Log => OSHOST_SEVERITY_LOG,
        Severity::Error => OSHOST_SEVERITY_ERROR,
        Severity::Fatal => OSHOST_SEVERITY_FATAL,
    }
}

struct CallbackSink(OshostLogCallback);

impl ErrorSink for CallbackSink {
    fn handle(&self, code: ErrorCode, severity: Severity, message: &str) {
        let message = to_wide(message);
        (self.0)(code.0, severity_code(severity), message.as_ptr());
    }
}

/// Install the host's logging callback, or pass null to go back to the
/// built-in `log` output.
#[no_mangle]
pub extern "C" fn oshost_set_log_callback(callback: Option<OshostLogCallback>) -> i32 {
    match callback {
        Some(callback) => host::install_sink(Arc::new(CallbackSink(callback))),
        None => {
            host::host().reporter().uninstall();
        }
    }
    OSHOST_OK
}

/// Set the application name used in dialog captions.
///
/// # Safety
///
/// `name` must be a valid null-terminated UTF-16 string.
#[no_mangle]
pub unsafe extern "C" fn oshost_set_app_name(name: *const u16) -> i32 {
    match unsafe { read_wide(name, "name") } {
        Some(name) => {
            host::set_app_name(name);
            OSHOST_OK
        }
        None => OSHOST_ERROR,
    }
}

/// Full path of the running executable.
///
/// # Safety
///
/// `out` must be a valid pointer to a `*mut u16`.  Free the result with
/// `oshost_free_string()`.
#[no_mangle]
pub unsafe extern "C" fn oshost_executable_path(out: *mut *mut u16) -> i32 {
    let path = host::get_executable_path();
    if path.as_os_str().is_empty() {
        set_last_error("executable location unavailable");
        return OSHOST_ERROR;
    }
    let units: Vec<u16> = path.as_os_str().encode_wide().collect();
    unsafe { write_out(out, &units) }
}

/// OS build string, e.g. `10.0.22621.3527`.
///
/// # Safety
///
/// `out` must be a valid pointer to a `*mut u16`.
#[no_mangle]
pub unsafe extern "C" fn oshost_os_build_version(out: *mut *mut u16) -> i32 {
    match host::get_os_build_version() {
        Ok(version) => unsafe { write_str_out(out, &version) },
        Err(e) => {
            set_last_error(&e.to_string());
            OSHOST_ERROR
        }
    }
}

/// `FileVersion` string of a file's version resource.
///
/// # Safety
///
/// `path` must be a valid null-terminated UTF-16 string and `out` a valid
/// pointer to a `*mut u16`.
#[no_mangle]
pub unsafe extern "C" fn oshost_file_version(path: *const u16, out: *mut *mut u16) -> i32 {
    let Some(path) = (unsafe { read_path(path, "path") }) else {
        return OSHOST_ERROR;
    };
    match host::get_file_version(path) {
        Ok(version) => unsafe { write_str_out(out, &version) },
        Err(e) => {
            set_last_error(&e.to_string());
            OSHOST_ERROR
        }
    }
}

/// # Safety
///
/// `path` must be a valid null-terminated UTF-16 string.
#[no_mangle]
pub unsafe extern "C" fn oshost_is_directory(path: *const u16) -> i32 {
    match unsafe { read_path(path, "path") } {
        Some(path) => predicate(host::is_directory(path)),
        None => OSHOST_ERROR,
    }
}

/// # Safety
///
/// `path` must be a valid null-terminated UTF-16 string.
#[no_mangle]
pub unsafe extern "C" fn oshost_file_exists(path: *const u16) -> i32 {
    match unsafe { read_path(path, "path") } {
        Some(path) => predicate(host::file_exists(path)),
        None => OSHOST_ERROR,
    }
}

#[no_mangle]
pub extern "C" fn oshost_is_at_least_build(build: u32) -> i32 {
    predicate(host::is_at_least_build(build))
}

/// # Safety
///
/// `text` must be a valid null-terminated UTF-16 string.
#[no_mangle]
pub unsafe extern "C" fn oshost_copy_to_clipboard(text: *const u16) -> i32 {
    let Some(text) = (unsafe { read_wide(text, "text") }) else {
        return OSHOST_ERROR;
    };
    if host::copy_to_clipboard(&text) {
        OSHOST_OK
    } else {
        set_last_error("clipboard transfer failed");
        OSHOST_ERROR
    }
}

/// Open a text file in the user's editor.  Returns immediately; a failure
/// is offered to the user as a clipboard copy.
///
/// # Safety
///
/// `path` must be a valid null-terminated UTF-16 string.
#[no_mangle]
pub unsafe extern "C" fn oshost_edit_file(path: *const u16) -> i32 {
    match unsafe { read_wide(path, "path") } {
        Some(path) => {
            host::edit_file(&path);
            OSHOST_OK
        }
        None => OSHOST_ERROR,
    }
}

/// # Safety
///
/// `link` must be a valid null-terminated UTF-16 string.
#[no_mangle]
pub unsafe extern "C" fn oshost_open_link(link: *const u16) -> i32 {
    match unsafe { read_wide(link, "link") } {
        Some(link) => {
            host::open_link(&link);
            OSHOST_OK
        }
        None => OSHOST_ERROR,
    }
}

/// # Safety
///
/// `path` must be a valid null-terminated UTF-16 string.
#[no_mangle]
pub unsafe extern "C" fn oshost_open_folder(path: *const u16) -> i32 {
    match unsafe { read_wide(path, "path") } {
        Some(path) => {
            host::open_folder(&path);
            OSHOST_OK
        }
        None => OSHOST_ERROR,
    }
}

/// Apply the process mitigation policies.  Always succeeds; individual
/// policy failures go to the log callback.
#[no_mangle]
pub extern "C" fn oshost_harden_process() -> i32 {
    host::harden_process();
    OSHOST_OK
}

/// # Safety
///
/// `out` must be a valid pointer to a `*mut u16`.
#[no_mangle]
pub unsafe extern "C" fn oshost_processor_architecture(out: *mut *mut u16) -> i32 {
    unsafe { write_str_out(out, host::get_processor_architecture_name()) }
}
