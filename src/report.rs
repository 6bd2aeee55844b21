//! Diagnostics
//!
//! The library never installs a logger. Anything worth telling the user
//! (header inconsistencies, append progress) goes through a [`Reporter`]
//! handed in by the caller.

use std::cell::RefCell;
use std::fmt;

/// Importance of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Something looks wrong but processing continues.
    Warning,
    /// Normal progress.
    Info,
    /// Verbose detail (table indices, addresses).
    Detail,
}

/// Receiver of diagnostics.
pub trait Reporter {
    /// Handles one message.
    fn report(&self, level: Level, message: fmt::Arguments<'_>);
}

/// Forwards to `tracing`: warnings as `warn`, info as `info`, detail as `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, level: Level, message: fmt::Arguments<'_>) {
        match level {
            Level::Warning => tracing::warn!("{}", message),
            Level::Info => tracing::info!("{}", message),
            Level::Detail => tracing::debug!("{}", message),
        }
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _level: Level, _message: fmt::Arguments<'_>) {}
}

/// Keeps every message, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    messages: RefCell<Vec<(Level, String)>>,
}

impl MemoryReporter {
    /// Empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received so far.
    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages.borrow().clone()
    }

    /// Messages of one level.
    pub fn at(&self, level: Level) -> Vec<String> {
        self.messages
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, level: Level, message: fmt::Arguments<'_>) {
        self.messages.borrow_mut().push((level, message.to_string()));
    }
}

impl<R: Reporter + ?Sized> Reporter for &R {
    fn report(&self, level: Level, message: fmt::Arguments<'_>) {
        (**self).report(level, message)
    }
}

impl<R: Reporter + ?Sized> Reporter for std::rc::Rc<R> {
    fn report(&self, level: Level, message: fmt::Arguments<'_>) {
        (**self).report(level, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_reporter_collects() {
        let reporter = MemoryReporter::new();
        reporter.report(Level::Warning, format_args!("checksum {}", "mismatch"));
        reporter.report(Level::Detail, format_args!("slot {}", 3));
        assert_eq!(reporter.messages().len(), 2);
        assert_eq!(reporter.at(Level::Warning), vec!["checksum mismatch".to_string()]);
        assert!(reporter.at(Level::Info).is_empty());
    }

    #[test]
    fn test_forwarding_through_reference() {
        let reporter = MemoryReporter::new();
        let by_ref: &dyn Reporter = &reporter;
        (&by_ref).report(Level::Info, format_args!("hello"));
        assert_eq!(reporter.at(Level::Info), vec!["hello".to_string()]);
    }
}
