#![forbid(unsafe_code)]

//! Runtime for barline: reactive observables and bindings, the timer event
//! loop that drives polling, and the diagnostics that poll failures flow to.

pub mod diagnostics;
pub mod error;
pub mod reactive;
pub mod timer;

pub use diagnostics::{Diagnostic, DiagnosticSink, RecordingSink, TracingSink};
pub use error::{FailureKind, PollError, ProducerError};
pub use reactive::{Binding, BindingScope, Observable, Source, Subscription, map_each};
pub use timer::{EventLoop, TimerHandle};
