//! Win32 implementation of the platform traits via `windows-rs`.
//!
//! Every method is a single OS call (or a tightly coupled pair, like the
//! version-info size/read dance).  Failures come back as [`ErrorCode`],
//! taken from the `windows::core::Error` or from `GetLastError`.

use std::ffi::{c_void, OsString};
use std::os::windows::ffi::OsStringExt;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};

use windows::core::{w, HRESULT, HSTRING, PCWSTR, PWSTR};
use windows::Win32::Foundation::{GetLastError, HANDLE, HGLOBAL, HWND};
use windows::Win32::Storage::FileSystem::{
    GetDriveTypeW, GetFileAttributesW, GetFileVersionInfoSizeW, GetFileVersionInfoW,
    GetVolumePathNameW, VerQueryValueW,
};
use windows::Win32::System::DataExchange::{
    CloseClipboard, EmptyClipboard, OpenClipboard, SetClipboardData,
};
use windows::Win32::System::Memory::{
    GlobalAlloc, GlobalFree, GlobalLock, GlobalUnlock, GMEM_MOVEABLE,
};
use windows::Win32::System::Ole::CF_UNICODETEXT;
use windows::Win32::System::SystemInformation::{
    GetNativeSystemInfo, GetSystemDirectoryW, VerSetConditionMask, VerifyVersionInfoW,
    OSVERSIONINFOEXW, SYSTEM_INFO, VER_BUILDNUMBER, VER_MAJORVERSION, VER_MINORVERSION,
};
use windows::Win32::System::Threading::{
    GetCurrentProcess, GetProcessMitigationPolicy, ProcessASLRPolicy,
    ProcessDynamicCodePolicy, ProcessExtensionPointDisablePolicy, ProcessImageLoadPolicy,
    ProcessSignaturePolicy, ProcessStrictHandleCheckPolicy, QueryFullProcessImageNameW,
    SetProcessMitigationPolicy, PROCESS_MITIGATION_POLICY, PROCESS_NAME_WIN32,
};
use windows::Win32::UI::Shell::{ShellExecuteExW, SEE_MASK_CLASSNAME, SHELLEXECUTEINFOW};
use windows::Win32::UI::WindowsAndMessaging::{
    MessageBoxW, IDYES, MB_ICONWARNING, MB_SETFOREGROUND, MB_YESNO, SW_SHOW,
};

use super::{
    ClipboardApi, FileAttributes, FileSystemApi, GlobalMemory, MitigationApi, MitigationPolicy,
    ProcessApi, ShellApi, LONG_PATH,
};
use crate::errors::{ErrorCode, OperationResult, PlatformError};

const INVALID_FILE_ATTRIBUTES: u32 = u32::MAX;
const DRIVE_REMOTE: u32 = 4;
const VER_GREATER_EQUAL: u8 = 3;

/// The calling thread's last Win32 error, as an HRESULT.
pub fn last_error() -> ErrorCode {
    ErrorCode::from_win32(unsafe { GetLastError() }.0)
}

/// `buf` up to (not including) its first null.
fn until_nul(buf: &[u16]) -> &[u16] {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    &buf[..len]
}

fn wide_to_path(buf: &[u16]) -> PathBuf {
    PathBuf::from(OsString::from_wide(buf))
}

fn policy_id(policy: MitigationPolicy) -> PROCESS_MITIGATION_POLICY {
    match policy {
        MitigationPolicy::Aslr => ProcessASLRPolicy,
        MitigationPolicy::DynamicCode => ProcessDynamicCodePolicy,
        MitigationPolicy::StrictHandleCheck => ProcessStrictHandleCheckPolicy,
        MitigationPolicy::ExtensionPointDisable => ProcessExtensionPointDisablePolicy,
        MitigationPolicy::Signature => ProcessSignaturePolicy,
        MitigationPolicy::ImageLoad => ProcessImageLoadPolicy,
    }
}

/// Zero-sized handle to the real operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32;

impl ProcessApi for Win32 {
    fn current_image_path(&self) -> Result<PathBuf, ErrorCode> {
        let mut buf = vec![0u16; LONG_PATH];
        let mut size = buf.len() as u32;
        unsafe {
            QueryFullProcessImageNameW(
                GetCurrentProcess(),
                PROCESS_NAME_WIN32,
                PWSTR(buf.as_mut_ptr()),
                &mut size,
            )
        }?;
        buf.truncate(size as usize);
        Ok(wide_to_path(&buf))
    }

    fn native_architecture(&self) -> u16 {
        let mut info = SYSTEM_INFO::default();
        unsafe {
            GetNativeSystemInfo(&mut info);
            info.Anonymous.Anonymous.wProcessorArchitecture.0
        }
    }

    fn verify_min_build(&self, build: u32) -> Result<(), ErrorCode> {
        let mut info = OSVERSIONINFOEXW {
            dwOSVersionInfoSize: std::mem::size_of::<OSVERSIONINFOEXW>() as u32,
            dwMajorVersion: 10,
            dwMinorVersion: 0,
            dwBuildNumber: build,
            ..Default::default()
        };

        let mask = unsafe {
            let mask = VerSetConditionMask(0, VER_MAJORVERSION, VER_GREATER_EQUAL);
            let mask = VerSetConditionMask(mask, VER_MINORVERSION, VER_GREATER_EQUAL);
            VerSetConditionMask(mask, VER_BUILDNUMBER, VER_GREATER_EQUAL)
        };

        unsafe {
            VerifyVersionInfoW(
                &mut info,
                VER_MAJORVERSION | VER_MINORVERSION | VER_BUILDNUMBER,
                mask,
            )
        }?;
        Ok(())
    }
}

impl FileSystemApi for Win32 {
    fn file_attributes(&self, path: &Path) -> Result<FileAttributes, ErrorCode> {
        let path = HSTRING::from(path.as_os_str());
        let attributes = unsafe { GetFileAttributesW(&path) };
        if attributes == INVALID_FILE_ATTRIBUTES {
            Err(last_error())
        } else {
            Ok(FileAttributes(attributes))
        }
    }

    fn system_directory(&self) -> Result<PathBuf, ErrorCode> {
        let mut buf = vec![0u16; LONG_PATH];
        let len = unsafe { GetSystemDirectoryW(Some(&mut buf)) } as usize;
        if len == 0 || len >= buf.len() {
            return Err(last_error());
        }
        Ok(wide_to_path(&buf[..len]))
    }

    fn version_string(&self, path: &Path, sub_block: &str) -> OperationResult<String> {
        let path = HSTRING::from(path.as_os_str());

        let mut handle = 0u32;
        let size = unsafe { GetFileVersionInfoSizeW(&path, Some(&mut handle)) };
        if size == 0 {
            return Err(PlatformError::new("GetFileVersionInfoSizeW", last_error()));
        }

        let mut data = vec![0u8; size as usize];
        unsafe { GetFileVersionInfoW(&path, handle, size, data.as_mut_ptr().cast()) }
            .map_err(|e| PlatformError::new("GetFileVersionInfoW", e.into()))?;

        let mut value: *mut c_void = ptr::null_mut();
        let mut len = 0u32;
        let found = unsafe {
            VerQueryValueW(
                data.as_ptr().cast(),
                &HSTRING::from(sub_block),
                &mut value,
                &mut len,
            )
        };
        if !found.as_bool() || value.is_null() {
            return Err(PlatformError::new("VerQueryValueW", last_error()));
        }

        // `len` may count padding nulls after the value.
        let text = unsafe { std::slice::from_raw_parts(value as *const u16, len as usize) };
        Ok(String::from_utf16_lossy(until_nul(text)))
    }
}

impl ClipboardApi for Win32 {
    fn open_clipboard(&self) -> Result<(), ErrorCode> {
        unsafe { OpenClipboard(HWND::default()) }?;
        Ok(())
    }

    fn close_clipboard(&self) {
        let _ = unsafe { CloseClipboard() };
    }

    fn empty_clipboard(&self) -> Result<(), ErrorCode> {
        unsafe { EmptyClipboard() }?;
        Ok(())
    }

    fn global_alloc(&self, units: usize) -> Result<GlobalMemory, ErrorCode> {
        let bytes = units * std::mem::size_of::<u16>();
        let memory = unsafe { GlobalAlloc(GMEM_MOVEABLE, bytes) }?;
        Ok(GlobalMemory(memory.0 as isize))
    }

    fn global_lock(&self, memory: GlobalMemory) -> Result<NonNull<u16>, ErrorCode> {
        let data = unsafe { GlobalLock(HGLOBAL(memory.0 as *mut c_void)) };
        NonNull::new(data.cast::<u16>()).ok_or_else(last_error)
    }

    fn global_unlock(&self, memory: GlobalMemory) {
        // Reports "failure" with NO_ERROR once the lock count reaches zero.
        let _ = unsafe { GlobalUnlock(HGLOBAL(memory.0 as *mut c_void)) };
    }

    fn global_free(&self, memory: GlobalMemory) {
        let _ = unsafe { GlobalFree(HGLOBAL(memory.0 as *mut c_void)) };
    }

    fn set_unicode_text(&self, memory: GlobalMemory) -> Result<(), ErrorCode> {
        unsafe {
            SetClipboardData(
                CF_UNICODETEXT.0 as u32,
                HANDLE(memory.0 as *mut c_void),
            )
        }?;
        Ok(())
    }
}

impl ShellApi for Win32 {
    fn shell_open(&self, target: &str, class: &str) -> Result<(), ErrorCode> {
        let target = HSTRING::from(target);
        let class = HSTRING::from(class);
        let mut info = SHELLEXECUTEINFOW {
            cbSize: std::mem::size_of::<SHELLEXECUTEINFOW>() as u32,
            fMask: SEE_MASK_CLASSNAME,
            lpVerb: w!("open"),
            lpFile: PCWSTR(target.as_ptr()),
            nShow: SW_SHOW.0,
            lpClass: PCWSTR(class.as_ptr()),
            ..Default::default()
        };
        unsafe { ShellExecuteExW(&mut info) }?;
        Ok(())
    }

    fn confirm(&self, message: &str, caption: &str) -> bool {
        let answer = unsafe {
            MessageBoxW(
                HWND::default(),
                &HSTRING::from(message),
                &HSTRING::from(caption),
                MB_ICONWARNING | MB_YESNO | MB_SETFOREGROUND,
            )
        };
        answer == IDYES
    }

    fn describe(&self, code: ErrorCode) -> String {
        let message = HRESULT(code.0).message().to_string();
        let message = message.trim_end();
        if message.is_empty() {
            format!("Unknown error {code}")
        } else {
            message.to_owned()
        }
    }
}

impl MitigationApi for Win32 {
    fn query_policy(&self, policy: MitigationPolicy) -> Result<u32, ErrorCode> {
        // Every policy handled here is a single DWORD of flag bits.
        let mut flags = 0u32;
        unsafe {
            GetProcessMitigationPolicy(
                GetCurrentProcess(),
                policy_id(policy),
                (&mut flags as *mut u32).cast(),
                std::mem::size_of::<u32>(),
            )
        }?;
        Ok(flags)
    }

    fn install_policy(&self, policy: MitigationPolicy, flags: u32) -> Result<(), ErrorCode> {
        unsafe {
            SetProcessMitigationPolicy(
                policy_id(policy),
                (&flags as *const u32).cast(),
                std::mem::size_of::<u32>(),
            )
        }?;
        Ok(())
    }

    fn volume_path(&self, path: &Path) -> Result<PathBuf, ErrorCode> {
        let mut buf = vec![0u16; LONG_PATH];
        unsafe { GetVolumePathNameW(&HSTRING::from(path.as_os_str()), &mut buf) }?;
        Ok(wide_to_path(until_nul(&buf)))
    }

    fn is_remote_drive(&self, volume: &Path) -> bool {
        unsafe { GetDriveTypeW(&HSTRING::from(volume.as_os_str())) == DRIVE_REMOTE }
    }
}
