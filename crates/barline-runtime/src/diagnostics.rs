#![forbid(unsafe_code)]

//! Where poll failures go.
//!
//! A failed tick never reaches the observable; it is reported once to the
//! event loop's [`DiagnosticSink`] together with a context string naming the
//! observable. The default sink logs through `tracing`.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::warn;

use crate::error::{FailureKind, PollError};

/// Receives failures from poll ticks.
pub trait DiagnosticSink {
    fn report(&self, context: &str, error: &PollError);
}

impl<F: Fn(&str, &PollError)> DiagnosticSink for F {
    fn report(&self, context: &str, error: &PollError) {
        self(context, error);
    }
}

/// Logs each failure as a `tracing` warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, context: &str, error: &PollError) {
        warn!(context, kind = %error.kind(), error = %error, "poll failed");
    }
}

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub context: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Keeps every failure in memory. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    entries: Rc<RefCell<Vec<Diagnostic>>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.borrow().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, context: &str, error: &PollError) {
        self.entries.borrow_mut().push(Diagnostic {
            context: context.to_owned(),
            kind: error.kind(),
            message: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProducerError;
    use std::cell::Cell;

    #[test]
    fn recording_sink_shares_log_between_clones() {
        let sink = RecordingSink::new();
        let handle = sink.clone();
        sink.report("cpu", &ProducerError::unavailable("no /proc").into());
        assert_eq!(handle.len(), 1);
        let entry = &handle.entries()[0];
        assert_eq!(entry.context, "cpu");
        assert_eq!(entry.kind, FailureKind::Producer);
        assert!(entry.message.contains("no /proc"));

        handle.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn closures_are_sinks() {
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let sink = move |_: &str, _: &PollError| h.set(h.get() + 1);
        sink.report(
            "x",
            &PollError::DerivationPanicked {
                message: "m".into(),
            },
        );
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn tracing_sink_does_not_panic_without_subscriber() {
        TracingSink.report("temp", &ProducerError::unavailable("gone").into());
    }
}
