#![forbid(unsafe_code)]

//! Periodic refresh of an [`Observable`] from a producer function.
//!
//! A poll task is a timer on an [`EventLoop`] whose tick calls the producer
//! and stores the result. Each tick is a failure boundary: a producer error or
//! panic, and a panic raised by a subscriber or derivation while the new value
//! propagates, are reported once to the loop's
//! [`DiagnosticSink`](crate::diagnostics::DiagnosticSink). The observable keeps
//! its previous value and the task keeps running.
//!
//! A derivation panic leaves downstream bindings on their old value. Until a
//! later tick propagates cleanly, a tick whose value equals the stored one
//! re-notifies subscribers instead of being suppressed, so they can catch up.
//!
//! Cancellation is checked twice per tick, before the producer runs and
//! before its value is stored, so `stop_polling` called from inside the
//! producer discards that tick's value.

use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Weak;

use barline_core::{Cx, Duration};
use tracing::{debug, trace};

use super::observable::{Observable, ObservableInner};
use crate::diagnostics::DiagnosticSink;
use crate::error::{PollError, ProducerError};
use crate::timer::{EventLoop, TimerHandle};

/// The timer backing an observable's polling. Dropping it cancels the timer.
pub(crate) struct PollTask {
    _handle: TimerHandle,
    interval: Duration,
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Refresh the value from `producer` every `interval`.
    ///
    /// Replaces any poll task already attached. The first tick runs one
    /// interval from now. Does nothing on a disposed observable.
    pub fn start_polling<P>(&self, event_loop: &EventLoop, interval: Duration, producer: P)
    where
        P: FnMut() -> Result<T, ProducerError> + 'static,
    {
        if self.is_disposed() {
            let label = self.label();
            debug!(label = label.as_deref(), "start_polling on disposed observable ignored");
            return;
        }
        let previous = self.inner.borrow_mut().poll.take();
        drop(previous);

        let weak = self.downgrade();
        let context = self.context();
        let sink = event_loop.sink();
        let mut producer = producer;
        let mut redeliver = false;
        let tick_context = context.clone();
        let handle = event_loop.schedule_every(interval, move |cx| {
            let tick = Tick {
                context: &tick_context,
                sink: sink.as_ref(),
                cx,
            };
            poll_tick(&weak, &tick, &mut producer, &mut redeliver);
        });
        self.inner.borrow_mut().poll = Some(PollTask {
            _handle: handle,
            interval,
        });
        debug!(context = %context, ?interval, "polling started");
    }

    /// Builder form of [`start_polling`](Self::start_polling).
    ///
    /// ```
    /// use barline_runtime::{EventLoop, reactive::Observable};
    /// use barline_runtime::diagnostics::RecordingSink;
    /// use barline_core::{Duration, LabClock};
    ///
    /// let clock = LabClock::new();
    /// let event_loop = EventLoop::lab(&clock, RecordingSink::new());
    /// let mut n = 0;
    /// let ticks = Observable::new(0).polling(&event_loop, Duration::from_secs(1), move || {
    ///     n += 1;
    ///     Ok(n)
    /// });
    /// event_loop.advance(Duration::from_secs(3));
    /// assert_eq!(ticks.get(), 3);
    /// ```
    #[must_use]
    pub fn polling<P>(self, event_loop: &EventLoop, interval: Duration, producer: P) -> Self
    where
        P: FnMut() -> Result<T, ProducerError> + 'static,
    {
        self.start_polling(event_loop, interval, producer);
        self
    }

    /// Cancel the poll task, if any. Idempotent, and safe to call from the
    /// producer itself.
    pub fn stop_polling(&self) {
        let task = self.inner.borrow_mut().poll.take();
        if let Some(task) = task {
            let label = self.label();
            debug!(label = label.as_deref(), "polling stopped");
            drop(task);
        }
    }

    /// Whether a poll task is attached.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.inner.borrow().poll.is_some()
    }

    /// Interval of the attached poll task.
    #[must_use]
    pub fn poll_interval(&self) -> Option<Duration> {
        self.inner.borrow().poll.as_ref().map(|task| task.interval)
    }
}

struct Tick<'a> {
    context: &'a str,
    sink: &'a dyn DiagnosticSink,
    cx: &'a Cx,
}

fn poll_tick<T, P>(
    weak: &Weak<RefCell<ObservableInner<T>>>,
    tick: &Tick<'_>,
    producer: &mut P,
    redeliver: &mut bool,
) where
    T: Clone + PartialEq + 'static,
    P: FnMut() -> Result<T, ProducerError>,
{
    let Tick { context, sink, cx } = *tick;
    if cx.is_cancelled() {
        return;
    }
    let Some(inner) = weak.upgrade() else {
        return;
    };
    let target = Observable { inner };
    trace!(context, "poll tick");

    let value = match panic::catch_unwind(AssertUnwindSafe(|| producer())) {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => {
            sink.report(context, &PollError::from(err));
            return;
        }
        Err(payload) => {
            sink.report(
                context,
                &PollError::ProducerPanicked {
                    message: panic_message(payload.as_ref()),
                },
            );
            return;
        }
    };

    if cx.is_cancelled() {
        trace!(context, "poll cancelled during producer, value discarded");
        return;
    }
    let unchanged = *redeliver && target.with(|current| *current == value);
    let stored = panic::catch_unwind(AssertUnwindSafe(|| {
        if unchanged {
            target.notify();
        } else {
            target.set(value);
        }
    }));
    match stored {
        Ok(()) => *redeliver = false,
        Err(payload) => {
            *redeliver = true;
            sink.report(
                context,
                &PollError::DerivationPanicked {
                    message: panic_message(payload.as_ref()),
                },
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
