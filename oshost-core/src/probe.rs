//! Filesystem, version and architecture probes.
//!
//! A missing path is an expected answer, not a failure: [`is_directory`]
//! and [`file_exists`] return `false` for it without reporting anything.
//! The version probes hand their error back to the caller rather than
//! reporting it themselves.

use std::path::Path;

use crate::errors::{OperationResult, PlatformError, ERROR_OLD_WIN_VERSION};
use crate::platform::{FileSystemApi, ProcessApi};
use crate::report::{Reporter, Severity};

/// Version-resource value read by [`file_version`]: `FileVersion` in the
/// US English / Unicode string table.
pub const FILE_VERSION_SUB_BLOCK: &str = r"\StringFileInfo\040904b0\FileVersion";

/// System library whose version is the OS build.
pub const BUILD_PROBE_LIBRARY: &str = "kernel32.dll";

/// True iff `path` exists and is a directory.
///
/// Other failures are reported at [`Severity::Debug`]: log initialization
/// calls this while checking its own output directory.
pub fn is_directory(fs: &impl FileSystemApi, reporter: &Reporter, path: &Path) -> bool {
    match fs.file_attributes(path) {
        Ok(attributes) => attributes.is_directory(),
        Err(code) if code.is_not_found() => false,
        Err(code) => {
            reporter.report(code, Severity::Debug, "Failed to check if directory exists.");
            false
        }
    }
}

/// True iff `path` exists and is not a directory.
pub fn file_exists(fs: &impl FileSystemApi, reporter: &Reporter, path: &Path) -> bool {
    match fs.file_attributes(path) {
        Ok(attributes) => !attributes.is_directory(),
        Err(code) if code.is_not_found() => false,
        Err(code) => {
            reporter.report(code, Severity::Log, "Failed to check if file exists.");
            false
        }
    }
}

/// The `FileVersion` string embedded in `path`'s version resource, cut at
/// its first null.
pub fn file_version(fs: &impl FileSystemApi, path: &Path) -> OperationResult<String> {
    let mut version = fs.version_string(path, FILE_VERSION_SUB_BLOCK)?;
    if let Some(end) = version.find('\0') {
        version.truncate(end);
    }
    Ok(version)
}

/// The OS build, read from the version of a core system library.
pub fn os_build_version(fs: &impl FileSystemApi) -> OperationResult<String> {
    let system = fs
        .system_directory()
        .map_err(|code| PlatformError::new("GetSystemDirectoryW", code))?;
    file_version(fs, &system.join(BUILD_PROBE_LIBRARY))
}

/// True iff the OS is Windows 10.0 with at least `build`.
pub fn is_at_least_build(process: &impl ProcessApi, reporter: &Reporter, build: u32) -> bool {
    match process.verify_min_build(build) {
        Ok(()) => true,
        Err(code) if code.win32() == Some(ERROR_OLD_WIN_VERSION) => false,
        Err(code) => {
            reporter.report(code, Severity::Log, "Error obtaining version info.");
            false
        }
    }
}

/// Native processor architecture of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorArchitecture {
    X64,
    X86,
    Arm64,
    Arm,
    Itanium,
    Unknown,
    Invalid,
}

impl ProcessorArchitecture {
    /// Map a raw `PROCESSOR_ARCHITECTURE_*` value.
    pub const fn from_raw(raw: u16) -> Self {
        match raw {
            9 => Self::X64,
            0 => Self::X86,
            12 => Self::Arm64,
            5 => Self::Arm,
            6 => Self::Itanium,
            0xFFFF => Self::Unknown,
            _ => Self::Invalid,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::X86 => "x86",
            Self::Arm64 => "ARM64",
            Self::Arm => "ARM",
            Self::Itanium => "Itanium",
            Self::Unknown => "Unknown",
            Self::Invalid => "Invalid",
        }
    }
}

pub fn processor_architecture(process: &impl ProcessApi) -> ProcessorArchitecture {
    ProcessorArchitecture::from_raw(process.native_architecture())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::errors::{ErrorCode, ERROR_PATH_NOT_FOUND, ERROR_RESOURCE_TYPE_NOT_FOUND};
    use crate::testing::{FakePlatform, RecordingSink};

    fn setup() -> (FakePlatform, Reporter, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (FakePlatform::new(), Reporter::with_sink(sink.clone()), sink)
    }

    #[test]
    fn test_missing_path_is_silently_false() {
        let (fake, reporter, sink) = setup();
        let missing = Path::new(r"C:\does\not\exist");

        assert!(!is_directory(&fake, &reporter, missing));
        assert!(!file_exists(&fake, &reporter, missing));
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn test_path_not_found_is_silently_false() {
        let (fake, reporter, sink) = setup();
        fake.deny(r"Z:\gone", ErrorCode::from_win32(ERROR_PATH_NOT_FOUND));

        assert!(!file_exists(&fake, &reporter, Path::new(r"Z:\gone")));
        assert!(!is_directory(&fake, &reporter, Path::new(r"Z:\gone")));
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn test_directory_vs_file() {
        let (fake, reporter, _sink) = setup();
        fake.add_directory(r"C:\Users");
        fake.add_file(r"C:\Users\notes.txt");

        assert!(is_directory(&fake, &reporter, Path::new(r"C:\Users")));
        assert!(!file_exists(&fake, &reporter, Path::new(r"C:\Users")));
        assert!(file_exists(&fake, &reporter, Path::new(r"C:\Users\notes.txt")));
        assert!(!is_directory(&fake, &reporter, Path::new(r"C:\Users\notes.txt")));
    }

    #[test]
    fn test_access_denied_severities() {
        let (fake, reporter, sink) = setup();
        let denied = ErrorCode::from_win32(5);
        fake.deny(r"C:\System Volume Information", denied);
        let path = Path::new(r"C:\System Volume Information");

        assert!(!is_directory(&fake, &reporter, path));
        assert!(!file_exists(&fake, &reporter, path));

        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].severity, Severity::Debug);
        assert_eq!(entries[1].severity, Severity::Log);
        assert!(entries.iter().all(|e| e.code == denied));
    }

    #[test]
    fn test_file_version_reads_us_english_block() {
        let fake = FakePlatform::new();
        fake.add_file(r"C:\app.exe");
        fake.add_version(r"C:\app.exe", FILE_VERSION_SUB_BLOCK, "2024.1.0.0");

        assert_eq!(file_version(&fake, Path::new(r"C:\app.exe")).unwrap(), "2024.1.0.0");
    }

    #[test]
    fn test_file_version_without_resource_is_platform_error() {
        let fake = FakePlatform::new();
        fake.add_file(r"C:\plain.txt");

        let err = file_version(&fake, Path::new(r"C:\plain.txt")).unwrap_err();
        assert_eq!(err.code, ErrorCode::from_win32(ERROR_RESOURCE_TYPE_NOT_FOUND));
        assert_eq!(err.operation, "GetFileVersionInfoSizeW");
    }

    #[test]
    fn test_file_version_names_the_failing_call() {
        let fake = FakePlatform::new();
        fake.add_file(r"C:\lib.dll");
        fake.add_version(r"C:\lib.dll", r"\StringFileInfo\040904e4\FileVersion", "1.0");

        let err = file_version(&fake, Path::new(r"C:\lib.dll")).unwrap_err();
        assert_eq!(err.operation, "VerQueryValueW");

        let err = file_version(&fake, Path::new(r"C:\missing.dll")).unwrap_err();
        assert_eq!(err.operation, "GetFileVersionInfoSizeW");
        assert!(err.code.is_not_found());
    }

    #[test]
    fn test_file_version_stops_at_padding_nulls() {
        let fake = FakePlatform::new();
        fake.add_file(r"C:\padded.dll");
        fake.add_version(r"C:\padded.dll", FILE_VERSION_SUB_BLOCK, "1.2.3.4\0\0");

        let version = file_version(&fake, Path::new(r"C:\padded.dll")).unwrap();
        assert_eq!(version, "1.2.3.4");
        assert!(!version.contains('\0'));
    }

    #[test]
    fn test_os_build_probes_system_library() {
        let fake = FakePlatform::new();
        let kernel32 = PathBuf::from(r"C:\Windows\System32").join(BUILD_PROBE_LIBRARY);
        fake.add_file(kernel32.clone());
        fake.add_version(kernel32.clone(), FILE_VERSION_SUB_BLOCK, "10.0.22621.3527");

        assert_eq!(os_build_version(&fake).unwrap(), "10.0.22621.3527");
        assert!(fake
            .calls()
            .contains(&format!("version_string:{}", kernel32.display())));
    }

    #[test]
    fn test_os_build_short_circuits_on_system_directory() {
        let fake = FakePlatform::new();
        fake.set_system_directory(Err(ErrorCode::from_win32(8)));

        let err = os_build_version(&fake).unwrap_err();
        assert_eq!(err.operation, "GetSystemDirectoryW");
        assert!(!fake.calls().iter().any(|c| c.starts_with("version_string")));
    }

    #[test]
    fn test_is_at_least_build() {
        let (fake, reporter, sink) = setup();
        fake.set_os_build(19_045);

        assert!(is_at_least_build(&fake, &reporter, 17_763));
        assert!(!is_at_least_build(&fake, &reporter, 22_000));
        assert!(sink.entries().is_empty());

        fake.fail("verify_min_build", ErrorCode::from_win32(87));
        assert!(!is_at_least_build(&fake, &reporter, 10_240));
        assert_eq!(sink.at_least(Severity::Log).len(), 1);
    }

    #[test]
    fn test_processor_architecture_names() {
        let cases = [
            (9, "x64"),
            (0, "x86"),
            (12, "ARM64"),
            (5, "ARM"),
            (6, "Itanium"),
            (0xFFFF, "Unknown"),
            (42, "Invalid"),
        ];
        for (raw, name) in cases {
            assert_eq!(ProcessorArchitecture::from_raw(raw).name(), name);
        }

        let fake = FakePlatform::new();
        fake.set_architecture(12);
        assert_eq!(processor_architecture(&fake), ProcessorArchitecture::Arm64);
    }
}
