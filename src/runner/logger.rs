//! Diagnostic logging collaborator.
//!
//! Everything that degrades instead of failing (a filter that threw, a
//! callback that errored, a target that could not be patched) reports
//! through a [`DiagnosticLogger`]. Implementations must never fail.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::runner::ds::error::JErrorType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

pub trait DiagnosticLogger {
    fn log(&self, level: LogLevel, scope: &str, message: &str, error: Option<&JErrorType>);

    fn debug(&self, scope: &str, message: &str) {
        self.log(LogLevel::Debug, scope, message, None)
    }

    fn warn(&self, scope: &str, message: &str, error: Option<&JErrorType>) {
        self.log(LogLevel::Warn, scope, message, error)
    }

    fn err(&self, scope: &str, message: &str, error: Option<&JErrorType>) {
        self.log(LogLevel::Error, scope, message, error)
    }
}

pub type SharedLogger = Rc<dyn DiagnosticLogger>;

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl DiagnosticLogger for TracingLogger {
    fn log(&self, level: LogLevel, scope: &str, message: &str, error: Option<&JErrorType>) {
        match (level, error) {
            (LogLevel::Debug, _) => tracing::debug!(scope, "{}", message),
            (LogLevel::Warn, Some(e)) => tracing::warn!(scope, error = %e, "{}", message),
            (LogLevel::Warn, None) => tracing::warn!(scope, "{}", message),
            (LogLevel::Error, Some(e)) => tracing::error!(scope, error = %e, "{}", message),
            (LogLevel::Error, None) => tracing::error!(scope, "{}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub scope: String,
    pub message: String,
    pub error: Option<JErrorType>,
}

/// Keeps every diagnostic in memory. Hosts use it to surface plugin
/// failures in their own UI; tests use it to assert on them.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    entries: RefCell<Vec<LogEntry>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.borrow().clone()
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.level == level)
            .count()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl DiagnosticLogger for RecordingLogger {
    fn log(&self, level: LogLevel, scope: &str, message: &str, error: Option<&JErrorType>) {
        // `try_borrow_mut` keeps a reentrant log call from panicking.
        if let Ok(mut entries) = self.entries.try_borrow_mut() {
            entries.push(LogEntry {
                level,
                scope: scope.to_string(),
                message: message.to_string(),
                error: error.cloned(),
            });
        }
    }
}
