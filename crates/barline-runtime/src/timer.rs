#![forbid(unsafe_code)]

//! Single-threaded fixed-rate timers.
//!
//! [`EventLoop`] owns a table of repeating timers and dispatches every due
//! callback serially on the calling thread. Each timer runs under its own
//! child [`Cx`] of the loop's root context; cancelling a [`TimerHandle`]
//! cancels that context and removes the entry, so a cancelled timer never
//! fires again, even if it was already collected as due in the current round.
//!
//! # Scheduling
//!
//! Timers are fixed-rate: the first tick is one interval after scheduling and
//! each tick is due on the next interval boundary. When the loop falls behind
//! (a slow callback, a suspended process), missed boundaries are coalesced
//! into a single tick and the next due time is the first boundary after now.
//!
//! # Lab time
//!
//! [`EventLoop::lab`] drives all timers from a [`LabClock`]. Tests step time
//! with [`EventLoop::advance`], which fires every boundary crossed in order.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use barline_core::{Cx, CxController, Duration, Instant, LabClock};
use tracing::{debug, trace, warn};

use crate::diagnostics::{DiagnosticSink, TracingSink};

const MIN_INTERVAL: Duration = Duration::from_millis(1);
const IDLE_WAIT: Duration = Duration::from_millis(250);

type TimerCallback = dyn FnMut(&Cx);

struct TimerEntry {
    due: Instant,
    interval: Duration,
    cx: Cx,
    callback: Rc<RefCell<TimerCallback>>,
}

struct LoopShared {
    root: Cx,
    root_ctrl: CxController,
    clock: Option<LabClock>,
    timers: RefCell<BTreeMap<u64, TimerEntry>>,
    next_id: Cell<u64>,
    stopped: Cell<bool>,
    sink: Rc<dyn DiagnosticSink>,
}

/// Timer table plus the diagnostic sink shared by every poll task on it.
///
/// Clones are handles to the same loop.
#[derive(Clone)]
pub struct EventLoop {
    inner: Rc<LoopShared>,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new(TracingSink)
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("timers", &self.timer_count())
            .field("lab", &self.inner.clock.is_some())
            .field("shut_down", &self.inner.root.is_cancelled())
            .finish()
    }
}

impl EventLoop {
    /// Loop on the real clock, reporting poll failures to `sink`.
    #[must_use]
    pub fn new(sink: impl DiagnosticSink + 'static) -> Self {
        let (root, root_ctrl) = Cx::background();
        Self::build(root, root_ctrl, None, Rc::new(sink))
    }

    /// Loop driven by `clock`.
    #[must_use]
    pub fn lab(clock: &LabClock, sink: impl DiagnosticSink + 'static) -> Self {
        let (root, root_ctrl) = Cx::lab(clock);
        Self::build(root, root_ctrl, Some(clock.clone()), Rc::new(sink))
    }

    fn build(
        root: Cx,
        root_ctrl: CxController,
        clock: Option<LabClock>,
        sink: Rc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            inner: Rc::new(LoopShared {
                root,
                root_ctrl,
                clock,
                timers: RefCell::new(BTreeMap::new()),
                next_id: Cell::new(1),
                stopped: Cell::new(false),
                sink,
            }),
        }
    }

    /// Run `callback` every `interval` until the returned handle is cancelled
    /// or dropped. A zero interval is raised to one millisecond.
    #[must_use = "dropping the handle cancels the timer"]
    pub fn schedule_every(
        &self,
        interval: Duration,
        callback: impl FnMut(&Cx) + 'static,
    ) -> TimerHandle {
        let interval = if interval < MIN_INTERVAL {
            warn!(?interval, "timer interval too small, clamped");
            MIN_INTERVAL
        } else {
            interval
        };
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        let (cx, ctrl) = self.inner.root.child_inherit();
        let due = self.now() + interval;
        self.inner.timers.borrow_mut().insert(
            id,
            TimerEntry {
                due,
                interval,
                cx: cx.clone(),
                callback: Rc::new(RefCell::new(callback)),
            },
        );
        trace!(timer = id, ?interval, "timer scheduled");
        TimerHandle {
            id,
            shared: Rc::downgrade(&self.inner),
            cx,
            ctrl,
        }
    }

    /// Fire every timer that is due now, earliest due first and then in
    /// scheduling order. Returns how many fired.
    ///
    /// A callback already running further up the stack is skipped rather
    /// than re-entered.
    pub fn run_due(&self) -> usize {
        if self.inner.root.is_cancelled() {
            return 0;
        }
        let now = self.now();
        let mut due: Vec<_> = {
            let mut timers = self.inner.timers.borrow_mut();
            timers
                .iter_mut()
                .filter(|(_, entry)| entry.due <= now)
                .map(|(id, entry)| {
                    let was_due = entry.due;
                    entry.due = next_boundary(entry.due, entry.interval, now);
                    (was_due, *id, entry.cx.clone(), Rc::clone(&entry.callback))
                })
                .collect()
        };
        due.sort_by_key(|(was_due, id, _, _)| (*was_due, *id));

        let mut fired = 0;
        for (_, id, cx, callback) in due {
            if cx.is_cancelled() || !self.inner.timers.borrow().contains_key(&id) {
                continue;
            }
            match callback.try_borrow_mut() {
                Ok(mut f) => {
                    (&mut *f)(&cx);
                    fired += 1;
                }
                Err(_) => debug!(timer = id, "timer already running, tick skipped"),
            }
        }
        fired
    }

    /// Dispatch timers for `duration`, sleeping between ticks. On a lab loop
    /// the sleeps advance the lab clock. Returns the number of ticks fired.
    pub fn run_for(&self, duration: Duration) -> usize {
        let (window, _ctrl) = self.inner.root.child(duration);
        self.drive(&window)
    }

    /// Dispatch timers until `cx` is cancelled or expires, or until
    /// [`stop`](Self::stop) or [`shutdown`](Self::shutdown) is called from a
    /// callback. Sleeps go through `cx`, so derive it from
    /// [`context`](Self::context) to stay on this loop's clock.
    pub fn run(&self, cx: &Cx) -> usize {
        self.drive(cx)
    }

    /// The loop's root context. Cancelling a child of it ends a
    /// [`run`](Self::run) without touching the timers.
    #[must_use]
    pub fn context(&self) -> Cx {
        self.inner.root.clone()
    }

    fn drive(&self, window: &Cx) -> usize {
        self.inner.stopped.set(false);
        let mut fired = 0;
        loop {
            fired += self.run_due();
            if self.inner.stopped.get() || window.is_done() {
                break;
            }
            let wait = self.next_due_in().unwrap_or(IDLE_WAIT);
            if !wait.is_zero() {
                window.sleep(wait);
            }
        }
        debug!(fired, "event loop run finished");
        fired
    }

    /// End the current [`run`](Self::run) or [`run_for`](Self::run_for)
    /// after the in-flight round.
    pub fn stop(&self) {
        self.inner.stopped.set(true);
    }

    /// Cancel the root context: every timer on this loop stops for good.
    pub fn shutdown(&self) {
        if self.inner.root.is_cancelled() {
            return;
        }
        self.inner.stopped.set(true);
        self.inner.root_ctrl.cancel();
        let timers = std::mem::take(&mut *self.inner.timers.borrow_mut());
        drop(timers);
    }

    /// Lab loops only: step the clock by `delta`, firing each crossed
    /// boundary at its own instant. Returns the number of ticks fired. On a
    /// real-clock loop this only runs what is already due.
    pub fn advance(&self, delta: Duration) -> usize {
        let Some(clock) = &self.inner.clock else {
            warn!("advance called on a real-clock event loop");
            return self.run_due();
        };
        let target = clock.now() + delta;
        let mut fired = 0;
        loop {
            let next = self.next_due_at().filter(|due| *due <= target);
            match next {
                Some(due) => {
                    let now = clock.now();
                    if due > now {
                        clock.advance(due - now);
                    }
                    fired += self.run_due();
                }
                None => {
                    let now = clock.now();
                    if target > now {
                        clock.advance(target - now);
                    }
                    break;
                }
            }
        }
        fired
    }

    /// Current time on this loop's clock.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.inner.root.now()
    }

    /// Time until the earliest live timer is due, zero if one is overdue.
    #[must_use]
    pub fn next_due_in(&self) -> Option<Duration> {
        let now = self.now();
        self.next_due_at()
            .map(|due| due.saturating_duration_since(now))
    }

    fn next_due_at(&self) -> Option<Instant> {
        self.inner
            .timers
            .borrow()
            .values()
            .filter(|entry| !entry.cx.is_cancelled())
            .map(|entry| entry.due)
            .min()
    }

    /// Number of scheduled timers.
    #[must_use]
    pub fn timer_count(&self) -> usize {
        self.inner.timers.borrow().len()
    }

    /// Whether this loop runs on a lab clock.
    #[must_use]
    pub fn is_lab(&self) -> bool {
        self.inner.clock.is_some()
    }

    /// The sink poll tasks on this loop report to.
    #[must_use]
    pub fn sink(&self) -> Rc<dyn DiagnosticSink> {
        Rc::clone(&self.inner.sink)
    }
}

/// First `due + k * interval` strictly after `now`.
fn next_boundary(due: Instant, interval: Duration, now: Instant) -> Instant {
    let behind = now.saturating_duration_since(due);
    let skipped = behind.as_nanos() / interval.as_nanos().max(1);
    if skipped > 0 {
        trace!(skipped, "missed timer ticks coalesced");
    }
    u32::try_from(skipped + 1)
        .ok()
        .and_then(|steps| interval.checked_mul(steps))
        .and_then(|offset| due.checked_add(offset))
        .unwrap_or(now + interval)
}

/// Owning handle for a scheduled timer. Dropping it cancels the timer.
#[must_use = "dropping the handle cancels the timer"]
pub struct TimerHandle {
    id: u64,
    shared: Weak<LoopShared>,
    cx: Cx,
    ctrl: CxController,
}

impl TimerHandle {
    /// Cancel the timer. Idempotent. A tick that is already running finishes,
    /// but no later tick starts.
    pub fn cancel(&self) {
        if !self.ctrl.is_cancelled() {
            self.ctrl.cancel();
            trace!(timer = self.id, "timer cancelled");
        }
        if let Some(shared) = self.shared.upgrade() {
            let removed = shared.timers.borrow_mut().remove(&self.id);
            drop(removed);
        }
    }

    /// Whether this timer, or the whole loop, was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cx.is_cancelled()
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
