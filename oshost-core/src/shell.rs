//! Shell launch of files, links and folders, with a clipboard fallback.
//!
//! The `open` verb is attempted synchronously.  If the shell refuses, the
//! failure is reported and a detached thread asks the user whether to copy
//! the target to the clipboard instead.  The caller never waits for that
//! prompt: every launch function returns as soon as the shell call does.
//!
//! # Thread model
//!
//! One recovery thread per failed launch.  It owns everything it touches
//! (target string, cloned platform handle, cloned [`Reporter`]), is never
//! joined, and ends when the dialog closes.

use std::thread;

use crate::clipboard::copy_to_clipboard;
use crate::errors::ErrorCode;
use crate::platform::{ClipboardApi, ShellApi};
use crate::report::{Reporter, Severity};

/// What kind of target a launch was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaunchKind {
    File,
    Link,
    Folder,
}

impl LaunchKind {
    fn failure_prefix(self) -> &'static str {
        match self {
            LaunchKind::File => "Failed to open file",
            LaunchKind::Link => "Failed to open URL",
            LaunchKind::Folder => "Failed to open folder",
        }
    }

    fn copy_question(self) -> &'static str {
        match self {
            LaunchKind::File => "Copy the file location to the clipboard?",
            LaunchKind::Link => "Copy the URL to the clipboard?",
            LaunchKind::Folder => "Copy the path to the clipboard?",
        }
    }
}

/// Shell class for a link: `https` when the fifth character is `s`.
pub fn link_class(url: &str) -> &'static str {
    if url.encode_utf16().nth(4) == Some(u16::from(b's')) {
        "https"
    } else {
        "http"
    }
}

/// A failed launch waiting for the user to decide on the clipboard copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRecoveryPrompt {
    pub target: String,
    pub code: ErrorCode,
    pub kind: LaunchKind,
}

impl PendingRecoveryPrompt {
    /// Dialog text, given the decoded description of `code`.
    pub fn message(&self, description: &str) -> String {
        format!(
            "{} \"{}\".\n\n{}\n\n{}",
            self.kind.failure_prefix(),
            self.target,
            description,
            self.kind.copy_question()
        )
    }

    /// Show the prompt (blocking) and copy the target on Yes.
    pub fn resolve<P>(self, platform: &P, reporter: &Reporter, caption: &str)
    where
        P: ShellApi + ClipboardApi,
    {
        let message = self.message(&platform.describe(self.code));
        if platform.confirm(&message, caption) {
            copy_to_clipboard(platform, reporter, &self.target);
        }
    }
}

fn spawn_recovery<P>(platform: P, reporter: Reporter, caption: String, pending: PendingRecoveryPrompt)
where
    P: ShellApi + ClipboardApi + Send + 'static,
{
    let thread_reporter = reporter.clone();
    let spawned = thread::Builder::new()
        .name("oshost-recovery".into())
        .spawn(move || pending.resolve(&platform, &thread_reporter, &caption));

    // Dropping the handle detaches the thread.
    if let Err(err) = spawned {
        let code = err
            .raw_os_error()
            .map_or(ErrorCode(-1), |raw| ErrorCode::from_win32(raw as u32));
        reporter.report(code, Severity::Error, "Failed to start the recovery prompt.");
    }
}

/// Open `target` with the shell, falling back to the recovery prompt.
pub fn launch<P>(
    platform: &P,
    reporter: &Reporter,
    caption: &str,
    kind: LaunchKind,
    target: &str,
    class: &str,
) where
    P: ShellApi + ClipboardApi + Clone + Send + 'static,
{
    if let Err(code) = platform.shell_open(target, class) {
        reporter.report(
            code,
            Severity::Error,
            &format!("{} \"{target}\".", kind.failure_prefix()),
        );
        spawn_recovery(
            platform.clone(),
            reporter.clone(),
            caption.to_owned(),
            PendingRecoveryPrompt {
                target: target.to_owned(),
                code,
                kind,
            },
        );
    }
}

/// Open a text file in the user's editor.
pub fn edit_file<P>(platform: &P, reporter: &Reporter, caption: &str, file: &str)
where
    P: ShellApi + ClipboardApi + Clone + Send + 'static,
{
    launch(platform, reporter, caption, LaunchKind::File, file, "txtfile");
}

/// Open an `http://` or `https://` link in the default browser.
pub fn open_link<P>(platform: &P, reporter: &Reporter, caption: &str, link: &str)
where
    P: ShellApi + ClipboardApi + Clone + Send + 'static,
{
    launch(platform, reporter, caption, LaunchKind::Link, link, link_class(link));
}

/// Open a folder in the file manager.
pub fn open_folder<P>(platform: &P, reporter: &Reporter, caption: &str, folder: &str)
where
    P: ShellApi + ClipboardApi + Clone + Send + 'static,
{
    launch(platform, reporter, caption, LaunchKind::Folder, folder, "folder");
}
