//! Standalone CLI tool exercising the oshost facade.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "oshost", about = "Probe and drive the host OS through the oshost facade")]
struct Args {
    /// Also print debug-level reports to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit machine-readable JSON where a command has output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Executable path, OS build and processor architecture
    Info,
    /// Print the FileVersion of a file
    Version {
        /// File with a version resource
        file: String,
    },
    /// Check whether a path is a file or a directory
    Probe {
        /// Path to inspect
        path: String,
    },
    /// Check whether the OS is at least a given Windows 10 build
    MinBuild {
        /// Build number, e.g. 22000
        build: u32,
    },
    /// Copy text to the clipboard
    Copy {
        /// The text to copy
        text: String,
    },
    /// Open a text file in the default editor
    Edit {
        file: String,
        /// Seconds to stay alive so a recovery prompt can be answered
        #[arg(long, default_value_t = 0)]
        linger: u64,
    },
    /// Open an http(s) link in the default browser
    OpenLink {
        url: String,
        /// Seconds to stay alive so a recovery prompt can be answered
        #[arg(long, default_value_t = 0)]
        linger: u64,
    },
    /// Open a folder in the file manager
    OpenFolder {
        folder: String,
        /// Seconds to stay alive so a recovery prompt can be answered
        #[arg(long, default_value_t = 0)]
        linger: u64,
    },
    /// Apply the process mitigation policies to this process
    Harden,
}

#[cfg_attr(not(windows), allow(dead_code))]
#[derive(Serialize)]
struct ProbeResult<'a> {
    path: &'a str,
    is_file: bool,
    is_directory: bool,
}

#[cfg_attr(not(windows), allow(dead_code))]
fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("oshost: JSON serialization failed: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(windows)]
mod run {
    use std::sync::Arc;
    use std::time::Duration;

    use oshost_core::errors::ErrorCode;
    use oshost_core::host;
    use oshost_core::report::{ErrorSink, Severity};

    use super::*;

    /// Prints reports to stderr, hiding debug ones unless verbose.
    struct StderrSink {
        verbose: bool,
    }

    impl ErrorSink for StderrSink {
        fn handle(&self, code: ErrorCode, severity: Severity, message: &str) {
            if severity > Severity::Debug || self.verbose {
                eprintln!("oshost: [{severity}] {message} ({code})");
            }
        }
    }

    fn linger(secs: u64) {
        if secs > 0 {
            std::thread::sleep(Duration::from_secs(secs));
        }
    }

    pub fn run(args: Args) -> ExitCode {
        host::install_sink(Arc::new(StderrSink {
            verbose: args.verbose,
        }));

        match args.command {
            Command::Info => {
                let report = host::system_report();
                if args.json {
                    return print_json(&report);
                }
                println!("Executable:   {}", report.executable_path);
                println!(
                    "OS build:     {}",
                    report.os_build.as_deref().unwrap_or("unavailable")
                );
                println!("Architecture: {}", report.processor_architecture);
            }
            Command::Version { file } => match host::get_file_version(&file) {
                Ok(version) => println!("{version}"),
                Err(e) => {
                    eprintln!("oshost: {file}: {e}");
                    return ExitCode::FAILURE;
                }
            },
            Command::Probe { path } => {
                let result = ProbeResult {
                    path: &path,
                    is_file: host::file_exists(&path),
                    is_directory: host::is_directory(&path),
                };
                if args.json {
                    return print_json(&result);
                }
                let kind = match (result.is_file, result.is_directory) {
                    (true, _) => "file",
                    (_, true) => "directory",
                    _ => "missing",
                };
                println!("{path}: {kind}");
            }
            Command::MinBuild { build } => {
                let ok = host::is_at_least_build(build);
                println!("{}", if ok { "yes" } else { "no" });
                if !ok {
                    return ExitCode::FAILURE;
                }
            }
            Command::Copy { text } => {
                if !host::copy_to_clipboard(&text) {
                    return ExitCode::FAILURE;
                }
                println!("Copied {} chars", text.chars().count());
            }
            Command::Edit { file, linger: secs } => {
                host::edit_file(&file);
                linger(secs);
            }
            Command::OpenLink { url, linger: secs } => {
                host::open_link(&url);
                linger(secs);
            }
            Command::OpenFolder {
                folder,
                linger: secs,
            } => {
                host::open_folder(&folder);
                linger(secs);
            }
            Command::Harden => {
                host::harden_process();
                println!("Mitigation policies applied (failures, if any, reported above)");
            }
        }
        ExitCode::SUCCESS
    }
}

#[cfg(not(windows))]
mod run {
    use super::*;

    pub fn run(_args: Args) -> ExitCode {
        eprintln!("oshost: this tool only runs on Windows");
        ExitCode::FAILURE
    }
}

fn main() -> ExitCode {
    run::run(Args::parse())
}
