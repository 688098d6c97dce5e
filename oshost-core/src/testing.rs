//! In-memory stand-ins for the OS and the host's logging sink.
//!
//! [`FakePlatform`] implements every platform trait over shared state and
//! records each call, so tests can assert ordering, ownership hand-off and
//! failure isolation.  Individual calls are made to fail with
//! [`FakePlatform::fail`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::errors::{
    ErrorCode, OperationResult, PlatformError, ERROR_FILE_NOT_FOUND, ERROR_RESOURCE_TYPE_NOT_FOUND,
};
use crate::platform::{
    ClipboardApi, FileAttributes, FileSystemApi, GlobalMemory, MitigationApi, MitigationPolicy,
    ProcessApi, ShellApi,
};
use crate::report::{ErrorSink, Severity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Entry {
    pub code: ErrorCode,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    entries: Mutex<Vec<Entry>>,
}

impl RecordingSink {
    pub fn entries(&self) -> Vec<Entry> {
        self.entries.lock().clone()
    }

    pub fn at_least(&self, severity: Severity) -> Vec<Entry> {
        self.entries()
            .into_iter()
            .filter(|e| e.severity >= severity)
            .collect()
    }
}

impl ErrorSink for RecordingSink {
    fn handle(&self, code: ErrorCode, severity: Severity, message: &str) {
        self.entries.lock().push(Entry {
            code,
            severity,
            message: message.to_owned(),
        });
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub(crate) fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

struct State {
    calls: Vec<String>,
    failures: HashMap<String, ErrorCode>,

    image_path: Result<PathBuf, ErrorCode>,
    image_path_queries: u32,
    architecture: u16,
    os_build: u32,

    entries: HashMap<PathBuf, FileAttributes>,
    attribute_errors: HashMap<PathBuf, ErrorCode>,
    system_directory: Result<PathBuf, ErrorCode>,
    versions: HashMap<(PathBuf, String), String>,

    blocks: HashMap<isize, Box<[u16]>>,
    next_block: isize,
    locked: Vec<isize>,
    clipboard_open: bool,
    clipboard: Option<Box<[u16]>>,

    opened: Vec<(String, String)>,
    prompts: Vec<(String, String)>,
    answer: bool,

    policies: HashMap<MitigationPolicy, u32>,
    installed: Vec<(MitigationPolicy, u32)>,
    volume: Result<PathBuf, ErrorCode>,
    remote: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            failures: HashMap::new(),
            image_path: Ok(PathBuf::from(r"C:\Program Files\App\app.exe")),
            image_path_queries: 0,
            architecture: 9,
            os_build: 22_631,
            entries: HashMap::new(),
            attribute_errors: HashMap::new(),
            system_directory: Ok(PathBuf::from(r"C:\Windows\System32")),
            versions: HashMap::new(),
            blocks: HashMap::new(),
            next_block: 0x1000,
            locked: Vec::new(),
            clipboard_open: false,
            clipboard: None,
            opened: Vec::new(),
            prompts: Vec::new(),
            answer: false,
            policies: HashMap::new(),
            installed: Vec::new(),
            volume: Ok(PathBuf::from(r"C:\")),
            remote: false,
        }
    }
}

#[derive(Clone, Default)]
pub(crate) struct FakePlatform {
    state: Arc<Mutex<State>>,
    gate: Arc<Mutex<Option<Receiver<()>>>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the named call fail with `code` until further notice.
    pub fn fail(&self, call: &str, code: ErrorCode) {
        self.state.lock().failures.insert(call.to_owned(), code);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    fn record(&self, call: impl Into<String>) -> Result<(), ErrorCode> {
        let call = call.into();
        let mut state = self.state.lock();
        let failure = state.failures.get(&call).copied();
        state.calls.push(call);
        failure.map_or(Ok(()), Err)
    }

    // -- process ----------------------------------------------------------

    pub fn set_image_path(&self, path: Result<PathBuf, ErrorCode>) {
        self.state.lock().image_path = path;
    }

    pub fn image_path_queries(&self) -> u32 {
        self.state.lock().image_path_queries
    }

    pub fn set_architecture(&self, raw: u16) {
        self.state.lock().architecture = raw;
    }

    pub fn set_os_build(&self, build: u32) {
        self.state.lock().os_build = build;
    }

    // -- filesystem -------------------------------------------------------

    pub fn add_file(&self, path: impl Into<PathBuf>) {
        self.state
            .lock()
            .entries
            .insert(path.into(), FileAttributes(0x20));
    }

    pub fn add_directory(&self, path: impl Into<PathBuf>) {
        self.state
            .lock()
            .entries
            .insert(path.into(), FileAttributes(0x10));
    }

    pub fn deny(&self, path: impl Into<PathBuf>, code: ErrorCode) {
        self.state.lock().attribute_errors.insert(path.into(), code);
    }

    pub fn set_system_directory(&self, dir: Result<PathBuf, ErrorCode>) {
        self.state.lock().system_directory = dir;
    }

    pub fn add_version(&self, path: impl Into<PathBuf>, sub_block: &str, value: &str) {
        self.state
            .lock()
            .versions
            .insert((path.into(), sub_block.to_owned()), value.to_owned());
    }

    // -- clipboard --------------------------------------------------------

    pub fn clipboard_units(&self) -> Option<Vec<u16>> {
        self.state.lock().clipboard.as_ref().map(|b| b.to_vec())
    }

    /// Clipboard contents up to the first null.
    pub fn clipboard_text(&self) -> Option<String> {
        self.clipboard_units().map(|units| {
            let end = units.iter().position(|&c| c == 0).unwrap_or(units.len());
            String::from_utf16_lossy(&units[..end])
        })
    }

    pub fn set_clipboard(&self, text: &str) {
        let units: Vec<u16> = text.encode_utf16().chain(Some(0)).collect();
        self.state.lock().clipboard = Some(units.into_boxed_slice());
    }

    pub fn live_blocks(&self) -> usize {
        self.state.lock().blocks.len()
    }

    pub fn locked_blocks(&self) -> usize {
        self.state.lock().locked.len()
    }

    pub fn clipboard_open(&self) -> bool {
        self.state.lock().clipboard_open
    }

    // -- shell ------------------------------------------------------------

    pub fn opened(&self) -> Vec<(String, String)> {
        self.state.lock().opened.clone()
    }

    pub fn prompts(&self) -> Vec<(String, String)> {
        self.state.lock().prompts.clone()
    }

    pub fn answer(&self, yes: bool) {
        self.state.lock().answer = yes;
    }

    /// Hold the next prompt open until the returned sender fires (or drops).
    pub fn hold_prompt(&self) -> Sender<()> {
        let (tx, rx) = mpsc::channel();
        *self.gate.lock() = Some(rx);
        tx
    }

    // -- mitigation -------------------------------------------------------

    pub fn set_policy(&self, policy: MitigationPolicy, flags: u32) {
        self.state.lock().policies.insert(policy, flags);
    }

    pub fn installed(&self) -> Vec<(MitigationPolicy, u32)> {
        self.state.lock().installed.clone()
    }

    pub fn set_volume(&self, volume: Result<PathBuf, ErrorCode>, remote: bool) {
        let mut state = self.state.lock();
        state.volume = volume;
        state.remote = remote;
    }
}

impl ProcessApi for FakePlatform {
    fn current_image_path(&self) -> Result<PathBuf, ErrorCode> {
        self.record("current_image_path")?;
        let mut state = self.state.lock();
        state.image_path_queries += 1;
        state.image_path.clone()
    }

    fn native_architecture(&self) -> u16 {
        self.state.lock().architecture
    }

    fn verify_min_build(&self, build: u32) -> Result<(), ErrorCode> {
        self.record("verify_min_build")?;
        if self.state.lock().os_build >= build {
            Ok(())
        } else {
            Err(ErrorCode::from_win32(crate::errors::ERROR_OLD_WIN_VERSION))
        }
    }
}

impl FileSystemApi for FakePlatform {
    fn file_attributes(&self, path: &Path) -> Result<FileAttributes, ErrorCode> {
        let state = self.state.lock();
        if let Some(code) = state.attribute_errors.get(path) {
            return Err(*code);
        }
        state
            .entries
            .get(path)
            .copied()
            .ok_or(ErrorCode::from_win32(ERROR_FILE_NOT_FOUND))
    }

    fn system_directory(&self) -> Result<PathBuf, ErrorCode> {
        self.record("system_directory")?;
        self.state.lock().system_directory.clone()
    }

    fn version_string(&self, path: &Path, sub_block: &str) -> OperationResult<String> {
        self.record(format!("version_string:{}", path.display()))
            .map_err(|code| PlatformError::new("GetFileVersionInfoW", code))?;
        let state = self.state.lock();
        let size_error = |error| {
            PlatformError::new("GetFileVersionInfoSizeW", ErrorCode::from_win32(error))
        };
        if !state.entries.contains_key(path) {
            return Err(size_error(ERROR_FILE_NOT_FOUND));
        }
        if !state.versions.keys().any(|(file, _)| file == path) {
            return Err(size_error(ERROR_RESOURCE_TYPE_NOT_FOUND));
        }
        state
            .versions
            .get(&(path.to_path_buf(), sub_block.to_owned()))
            .cloned()
            .ok_or(PlatformError::new(
                "VerQueryValueW",
                ErrorCode::from_win32(ERROR_RESOURCE_TYPE_NOT_FOUND),
            ))
    }
}

impl ClipboardApi for FakePlatform {
    fn open_clipboard(&self) -> Result<(), ErrorCode> {
        self.record("open_clipboard")?;
        self.state.lock().clipboard_open = true;
        Ok(())
    }

    fn close_clipboard(&self) {
        let _ = self.record("close_clipboard");
        self.state.lock().clipboard_open = false;
    }

    fn empty_clipboard(&self) -> Result<(), ErrorCode> {
        self.record("empty_clipboard")?;
        self.state.lock().clipboard = None;
        Ok(())
    }

    fn global_alloc(&self, units: usize) -> Result<GlobalMemory, ErrorCode> {
        self.record("global_alloc")?;
        let mut state = self.state.lock();
        let id = state.next_block;
        state.next_block += 1;
        // Garbage fill, so a missing terminator shows up.
        state
            .blocks
            .insert(id, vec![0xCCCC; units].into_boxed_slice());
        Ok(GlobalMemory(id))
    }

    fn global_lock(&self, memory: GlobalMemory) -> Result<NonNull<u16>, ErrorCode> {
        self.record("global_lock")?;
        let mut state = self.state.lock();
        let data = state
            .blocks
            .get_mut(&memory.0)
            .and_then(|block| NonNull::new(block.as_mut_ptr()))
            .ok_or(ErrorCode::from_win32(6))?;
        state.locked.push(memory.0);
        Ok(data)
    }

    fn global_unlock(&self, memory: GlobalMemory) {
        let _ = self.record("global_unlock");
        self.state.lock().locked.retain(|&id| id != memory.0);
    }

    fn global_free(&self, memory: GlobalMemory) {
        let mut state = self.state.lock();
        let call = if state.blocks.remove(&memory.0).is_some() {
            "global_free"
        } else {
            "global_free:unowned"
        };
        state.calls.push(call.to_owned());
    }

    fn set_unicode_text(&self, memory: GlobalMemory) -> Result<(), ErrorCode> {
        self.record("set_unicode_text")?;
        let mut state = self.state.lock();
        let block = state
            .blocks
            .remove(&memory.0)
            .ok_or(ErrorCode::from_win32(6))?;
        state.clipboard = Some(block);
        Ok(())
    }
}

impl ShellApi for FakePlatform {
    fn shell_open(&self, target: &str, class: &str) -> Result<(), ErrorCode> {
        self.record(format!("shell_open:{class}"))?;
        self.state
            .lock()
            .opened
            .push((target.to_owned(), class.to_owned()));
        Ok(())
    }

    fn confirm(&self, message: &str, caption: &str) -> bool {
        self.state
            .lock()
            .prompts
            .push((message.to_owned(), caption.to_owned()));
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        self.state.lock().answer
    }

    fn describe(&self, code: ErrorCode) -> String {
        format!("Fake error {code}.")
    }
}

impl MitigationApi for FakePlatform {
    fn query_policy(&self, policy: MitigationPolicy) -> Result<u32, ErrorCode> {
        self.record(format!("query_policy:{policy:?}"))?;
        Ok(self.state.lock().policies.get(&policy).copied().unwrap_or(0))
    }

    fn install_policy(&self, policy: MitigationPolicy, flags: u32) -> Result<(), ErrorCode> {
        self.record(format!("install_policy:{policy:?}"))?;
        let mut state = self.state.lock();
        state.policies.insert(policy, flags);
        state.installed.push((policy, flags));
        Ok(())
    }

    fn volume_path(&self, path: &Path) -> Result<PathBuf, ErrorCode> {
        self.record(format!("volume_path:{}", path.display()))?;
        self.state.lock().volume.clone()
    }

    fn is_remote_drive(&self, _volume: &Path) -> bool {
        self.state.lock().remote
    }
}
