//! Severity-levelled error reporting channel.
//!
//! Every facade operation classifies its own failures with a [`Severity`]
//! and hands them to a [`Reporter`].  The host application plugs its own
//! [`ErrorSink`] in with [`Reporter::install`]; until it does, the channel
//! is "not ready" and reports go straight to the `log` facade through
//! [`LogSink`].
//!
//! # Re-entrancy
//!
//! A sink is allowed to call back into the facade (a file logger checking
//! that its directory exists, for instance).  Reports raised on a thread
//! that is already inside a sink call are diverted to [`LogSink`] instead
//! of recursing into the installed sink.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::errors::ErrorCode;

/// How bad a failure is.  Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Recorded for diagnostics only.
    Debug,
    /// Recorded; nothing is shown to the user.
    Log,
    /// Something the user asked for did not happen.
    Error,
    /// The application cannot reasonably continue.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Debug => "debug",
            Severity::Log => "log",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// Destination for facade failures, supplied by the host application.
pub trait ErrorSink: Send + Sync {
    fn handle(&self, code: ErrorCode, severity: Severity, message: &str);
}

/// Sink that forwards to the `log` crate.  Never terminates the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn handle(&self, code: ErrorCode, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => log::debug!("{message} ({code})"),
            Severity::Log => log::info!("{message} ({code})"),
            Severity::Error => log::error!("{message} ({code})"),
            Severity::Fatal => log::error!("fatal: {message} ({code})"),
        }
    }
}

thread_local! {
    static IN_SINK: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as being inside a sink call until dropped.
struct SinkScope;

impl SinkScope {
    fn enter() -> Option<Self> {
        IN_SINK.with(|flag| {
            if flag.get() {
                None
            } else {
                flag.set(true);
                Some(SinkScope)
            }
        })
    }
}

impl Drop for SinkScope {
    fn drop(&mut self) {
        IN_SINK.with(|flag| flag.set(false));
    }
}

/// Cloneable handle to the installed [`ErrorSink`].
///
/// Clones share the same sink slot, so a reporter moved into a background
/// thread sees a sink installed later on the main thread.
#[derive(Clone, Default)]
pub struct Reporter {
    sink: Arc<RwLock<Option<Arc<dyn ErrorSink>>>>,
}

impl Reporter {
    /// A reporter with no sink installed yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A reporter that is ready from the start.
    pub fn with_sink(sink: Arc<dyn ErrorSink>) -> Self {
        let reporter = Self::new();
        reporter.install(sink);
        reporter
    }

    /// Install (or replace) the sink.  The channel is ready afterwards.
    pub fn install(&self, sink: Arc<dyn ErrorSink>) {
        *self.sink.write() = Some(sink);
    }

    /// Remove the installed sink, returning the channel to the not-ready
    /// state.
    pub fn uninstall(&self) -> Option<Arc<dyn ErrorSink>> {
        self.sink.write().take()
    }

    pub fn is_ready(&self) -> bool {
        self.sink.read().is_some()
    }

    pub fn report(&self, code: ErrorCode, severity: Severity, message: &str) {
        // Clone out of the lock so a sink may install/uninstall re-entrantly.
        let sink = self.sink.read().clone();
        match (sink, SinkScope::enter()) {
            (Some(sink), Some(_scope)) => sink.handle(code, severity, message),
            _ => LogSink.handle(code, severity, message),
        }
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("ready", &self.is_ready())
            .finish()
    }
}
