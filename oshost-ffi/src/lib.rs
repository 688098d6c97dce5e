//! C ABI DLL for oshost -- lets the host application (UI, tray, whatever
//! language it is written in) call the facade and receive its failures.
//!
//! All exported functions follow the convention:
//! - Return `i32` status code: `OSHOST_OK=0`, `OSHOST_ERROR=-1`; the
//!   predicates return `1`/`0` and `OSHOST_ERROR` on bad arguments
//! - Strings are null-terminated UTF-16 in both directions; paths are
//!   passed through as-is, without a round trip through Unicode
//! - String outputs allocated by Rust, freed via `oshost_free_string()`
//! - Last error retrievable via `oshost_last_error()`

use std::cell::RefCell;
use std::ptr;

#[cfg(windows)]
mod exports;

pub const OSHOST_OK: i32 = 0;
pub const OSHOST_ERROR: i32 = -1;

pub const OSHOST_SEVERITY_DEBUG: i32 = 0;
pub const OSHOST_SEVERITY_LOG: i32 = 1;
pub const OSHOST_SEVERITY_ERROR: i32 = 2;
pub const OSHOST_SEVERITY_FATAL: i32 = 3;

thread_local! {
    static LAST_ERROR: RefCell<Option<Vec<u16>>> = const { RefCell::new(None) };
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = Some(to_wide(msg));
    });
}

/// The units of a null-terminated UTF-16 argument, without the terminator.
///
/// # Safety
///
/// `ptr` must be null or point to a null-terminated UTF-16 string that
/// outlives `'a`.
#[cfg_attr(not(windows), allow(dead_code))]
unsafe fn read_units<'a>(ptr: *const u16, name: &str) -> Option<&'a [u16]> {
    if ptr.is_null() {
        set_last_error(&format!("{name} is null"));
        return None;
    }
    let mut len = 0usize;
    while unsafe { *ptr.add(len) } != 0 {
        len += 1;
    }
    Some(unsafe { std::slice::from_raw_parts(ptr, len) })
}

/// Read a null-terminated UTF-16 text argument.
#[cfg_attr(not(windows), allow(dead_code))]
unsafe fn read_wide(ptr: *const u16, name: &str) -> Option<String> {
    let units = unsafe { read_units(ptr, name) }?;
    match String::from_utf16(units) {
        Ok(s) => Some(s),
        Err(e) => {
            set_last_error(&format!("{name} is not valid UTF-16: {e}"));
            None
        }
    }
}

#[cfg_attr(not(windows), allow(dead_code))]
/// Hand `units` to the caller through `out`, null-terminated.
///
/// `oshost_free_string` finds the allocation's end at the first null, so a
/// value with a null inside it is refused.
unsafe fn write_out(out: *mut *mut u16, units: &[u16]) -> i32 {
    if out.is_null() {
        set_last_error("out is null");
        return OSHOST_ERROR;
    }
    if let Some(pos) = units.iter().position(|&c| c == 0) {
        set_last_error(&format!("result has a null at position {pos}"));
        return OSHOST_ERROR;
    }
    let boxed: Box<[u16]> = units
        .iter()
        .copied()
        .chain(std::iter::once(0))
        .collect();
    unsafe { *out = Box::into_raw(boxed).cast::<u16>() };
    OSHOST_OK
}

#[cfg_attr(not(windows), allow(dead_code))]
unsafe fn write_str_out(out: *mut *mut u16, value: &str) -> i32 {
    let units: Vec<u16> = value.encode_utf16().collect();
    unsafe { write_out(out, &units) }
}

/// Retrieve the last error message (thread-local).
///
/// Returns a pointer valid until the next oshost_* call on this thread.
/// Returns null if no error has occurred.
#[no_mangle]
pub extern "C" fn oshost_last_error() -> *const u16 {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|s| s.as_ptr())
            .unwrap_or(ptr::null())
    })
}

/// Free a string previously allocated by an oshost_* function.
///
/// # Safety
///
/// `ptr` must be a pointer returned by an oshost_* function or null.
#[no_mangle]
pub unsafe extern "C" fn oshost_free_string(ptr: *mut u16) {
    if ptr.is_null() {
        return;
    }
    // `write_out` never hands out a value with a null inside, so the first
    // null is the last unit of the allocation.
    let mut len = 0usize;
    while unsafe { *ptr.add(len) } != 0 {
        len += 1;
    }
    let slice = ptr::slice_from_raw_parts_mut(ptr, len + 1);
    drop(unsafe { Box::from_raw(slice) });
}
