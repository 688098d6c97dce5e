//! Copy text to the system clipboard.
//!
//! The transfer is a fixed protocol: open, empty, allocate, lock and fill,
//! hand over.  Each acquired resource sits in an RAII guard:
//!
//! - [`ClipboardSession`] closes the clipboard on drop.
//! - [`OwnedMemory`] frees the global block on drop, unless it was handed
//!   to the clipboard successfully (the OS owns it from then on).
//! - [`MemoryLock`] unlocks the block on drop.
//!
//! so every early return releases exactly what it acquired.  Concurrent
//! callers are not serialized here; the OS clipboard's own open/close
//! exclusion applies.

use std::ptr::NonNull;

use crate::errors::ErrorCode;
use crate::platform::{ClipboardApi, GlobalMemory};
use crate::report::{Reporter, Severity};

#[must_use = "the clipboard is closed when the session is dropped"]
struct ClipboardSession<'a, C: ClipboardApi + ?Sized> {
    api: &'a C,
}

impl<'a, C: ClipboardApi + ?Sized> ClipboardSession<'a, C> {
    fn open(api: &'a C) -> Result<Self, ErrorCode> {
        api.open_clipboard()?;
        Ok(Self { api })
    }
}

impl<C: ClipboardApi + ?Sized> Drop for ClipboardSession<'_, C> {
    fn drop(&mut self) {
        self.api.close_clipboard();
    }
}

struct OwnedMemory<'a, C: ClipboardApi + ?Sized> {
    api: &'a C,
    memory: GlobalMemory,
    units: usize,
    transferred: bool,
}

impl<'a, C: ClipboardApi + ?Sized> OwnedMemory<'a, C> {
    fn alloc(api: &'a C, units: usize) -> Result<Self, ErrorCode> {
        let memory = api.global_alloc(units)?;
        Ok(Self {
            api,
            memory,
            units,
            transferred: false,
        })
    }

    /// Give the block to the clipboard.  On failure it is still ours and
    /// is freed when `self` drops.
    fn hand_to_clipboard(mut self) -> Result<(), ErrorCode> {
        self.api.set_unicode_text(self.memory)?;
        self.transferred = true;
        Ok(())
    }
}

impl<C: ClipboardApi + ?Sized> Drop for OwnedMemory<'_, C> {
    fn drop(&mut self) {
        if !self.transferred {
            self.api.global_free(self.memory);
        }
    }
}

struct MemoryLock<'m, 'a, C: ClipboardApi + ?Sized> {
    owner: &'m OwnedMemory<'a, C>,
    data: NonNull<u16>,
}

impl<'m, 'a, C: ClipboardApi + ?Sized> MemoryLock<'m, 'a, C> {
    fn acquire(owner: &'m OwnedMemory<'a, C>) -> Result<Self, ErrorCode> {
        let data = owner.api.global_lock(owner.memory)?;
        Ok(Self { owner, data })
    }

    fn as_mut_slice(&mut self) -> &mut [u16] {
        // The block holds `units` u16s and stays put while locked.
        unsafe { std::slice::from_raw_parts_mut(self.data.as_ptr(), self.owner.units) }
    }
}

impl<C: ClipboardApi + ?Sized> Drop for MemoryLock<'_, '_, C> {
    fn drop(&mut self) {
        self.owner.api.global_unlock(self.owner.memory);
    }
}

struct Failure {
    code: ErrorCode,
    message: &'static str,
}

fn fail(message: &'static str) -> impl FnOnce(ErrorCode) -> Failure {
    move |code| Failure { code, message }
}

fn transfer<C: ClipboardApi + ?Sized>(api: &C, text: &str) -> Result<(), Failure> {
    let _session = ClipboardSession::open(api).map_err(fail("Failed to open clipboard."))?;

    api.empty_clipboard()
        .map_err(fail("Failed to empty clipboard."))?;

    let units: Vec<u16> = text.encode_utf16().collect();
    let memory = OwnedMemory::alloc(api, units.len() + 1)
        .map_err(fail("Failed to allocate memory for the clipboard."))?;

    {
        let mut lock =
            MemoryLock::acquire(&memory).map_err(fail("Failed to lock memory for the clipboard."))?;
        let buf = lock.as_mut_slice();
        buf[..units.len()].copy_from_slice(&units);
        buf[units.len()] = 0;
    }

    memory
        .hand_to_clipboard()
        .map_err(fail("Failed to copy data to clipboard."))
}

/// Replace the clipboard contents with `text` as Unicode text.
///
/// Returns true only if every step succeeded.  Failures are reported at
/// [`Severity::Error`].
pub fn copy_to_clipboard<C: ClipboardApi + ?Sized>(api: &C, reporter: &Reporter, text: &str) -> bool {
    match transfer(api, text) {
        Ok(()) => true,
        Err(Failure { code, message }) => {
            reporter.report(code, Severity::Error, message);
            false
        }
    }
}
