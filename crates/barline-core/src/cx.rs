//! Capability context (`Cx`) for cooperative cancellation and deadlines.
//!
//! Every timer and poll task in barline runs under a `Cx`. The event loop owns
//! a root context; each scheduled timer receives a child, so cancelling the
//! loop cancels every timer, and cancelling one timer leaves its siblings
//! running. A bounded run (`run_for`) is a child with a deadline.
//!
//! With a [`LabClock`] time only moves when advanced by hand, which makes
//! poll schedules reproducible.
//!
//! # Example
//!
//! ```
//! use barline_core::cx::{Cx, LabClock};
//! use web_time::Duration;
//!
//! let clock = LabClock::new();
//! let (root, ctrl) = Cx::lab(&clock);
//! let (window, _window_ctrl) = root.child(Duration::from_millis(500));
//! let (timer, _timer_ctrl) = window.child_inherit();
//!
//! clock.advance(Duration::from_millis(200));
//! assert_eq!(timer.remaining(), Some(Duration::from_millis(300)));
//!
//! ctrl.cancel();
//! assert!(timer.is_cancelled());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use web_time::{Duration, Instant};

#[cfg(feature = "tracing")]
use crate::logging::{debug, trace};
#[cfg(not(feature = "tracing"))]
use crate::{debug, trace};

/// Slice used when sleeping on the real clock, so cancellation is noticed
/// without waiting out the whole duration.
const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// No deadline.
const UNBOUNDED: u64 = u64::MAX;

static CONTEXT_IDS: AtomicU64 = AtomicU64::new(1);

fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(UNBOUNDED)
}

/// A clock that moves only when told to.
///
/// Clones share the same time. Sleeping on a context driven by a lab clock
/// advances the clock instead of blocking the thread.
#[derive(Debug, Clone)]
pub struct LabClock {
    start: Instant,
    advanced_us: Arc<AtomicU64>,
}

impl LabClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            advanced_us: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.advanced_us.fetch_add(micros(delta), Ordering::Release);
    }

    #[must_use]
    pub fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    /// Total time advanced since creation.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.advanced_us.load(Ordering::Acquire))
    }
}

impl Default for LabClock {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
enum Clock {
    System,
    Lab(LabClock),
}

impl Clock {
    fn now(&self) -> Instant {
        match self {
            Self::System => Instant::now(),
            Self::Lab(lab) => lab.now(),
        }
    }
}

#[derive(Debug)]
struct Node {
    id: u64,
    cancelled: AtomicBool,
    /// Microseconds after `started` at which this node expires.
    budget_us: u64,
    started: Instant,
    clock: Clock,
    parent: Option<Arc<Node>>,
}

impl Node {
    fn ancestors(self: &Arc<Self>) -> impl Iterator<Item = &Arc<Node>> {
        std::iter::successors(Some(self), |node| node.parent.as_ref())
    }
}

/// Cancellation and deadline handle shared by a timer and its callbacks.
///
/// Clones observe the same state. Only the paired [`CxController`] cancels.
#[derive(Clone, Debug)]
pub struct Cx {
    node: Arc<Node>,
}

impl Cx {
    /// Root context on the system clock, without a deadline.
    #[must_use]
    pub fn background() -> (Self, CxController) {
        Self::spawn(UNBOUNDED, Clock::System, None)
    }

    /// Root context on `clock`, without a deadline.
    #[must_use]
    pub fn lab(clock: &LabClock) -> (Self, CxController) {
        Self::spawn(UNBOUNDED, Clock::Lab(clock.clone()), None)
    }

    /// Child that expires after `deadline`, or earlier if an ancestor does.
    /// Cancelling any ancestor cancels it.
    #[must_use]
    pub fn child(&self, deadline: Duration) -> (Self, CxController) {
        Self::spawn(
            micros(deadline),
            self.node.clock.clone(),
            Some(Arc::clone(&self.node)),
        )
    }

    /// Child with no deadline of its own.
    #[must_use]
    pub fn child_inherit(&self) -> (Self, CxController) {
        Self::spawn(
            UNBOUNDED,
            self.node.clock.clone(),
            Some(Arc::clone(&self.node)),
        )
    }

    fn spawn(budget_us: u64, clock: Clock, parent: Option<Arc<Node>>) -> (Self, CxController) {
        let node = Arc::new(Node {
            id: CONTEXT_IDS.fetch_add(1, Ordering::Relaxed),
            cancelled: AtomicBool::new(false),
            budget_us,
            started: clock.now(),
            clock,
            parent,
        });
        (
            Self {
                node: Arc::clone(&node),
            },
            CxController { node },
        )
    }

    /// Whether this context or any ancestor was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.node
            .ancestors()
            .any(|node| node.cancelled.load(Ordering::Acquire))
    }

    /// Whether the tightest deadline in the chain has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining() == Some(Duration::ZERO)
    }

    /// Cancelled or expired.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.is_cancelled() || self.is_expired()
    }

    /// Time left before the tightest deadline in the chain, saturating at
    /// zero. `None` when nothing in the chain has a deadline.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        let now = self.now();
        self.node
            .ancestors()
            .filter(|node| node.budget_us != UNBOUNDED)
            .map(|node| {
                let spent = micros(now.saturating_duration_since(node.started));
                node.budget_us.saturating_sub(spent)
            })
            .min()
            .map(Duration::from_micros)
    }

    #[must_use]
    pub fn now(&self) -> Instant {
        self.node.clock.now()
    }

    /// Wait for `duration`, cut short by the deadline or by cancellation.
    ///
    /// A lab context advances its clock and returns at once. Returns `true`
    /// only if the whole duration passed.
    pub fn sleep(&self, duration: Duration) -> bool {
        let allowed = self
            .remaining()
            .map_or(duration, |left| duration.min(left));
        if allowed.is_zero() || self.is_cancelled() {
            return false;
        }
        if let Clock::Lab(lab) = &self.node.clock {
            lab.advance(allowed);
            return allowed == duration;
        }

        let mut left = allowed;
        while !left.is_zero() {
            if self.is_cancelled() {
                return false;
            }
            let slice = left.min(SLEEP_SLICE);
            std::thread::sleep(slice);
            left -= slice;
        }
        allowed == duration && !self.is_cancelled()
    }
}

/// The cancelling half of a [`Cx`]. Dropping it leaves the context running.
#[derive(Debug)]
pub struct CxController {
    node: Arc<Node>,
}

impl CxController {
    /// Cancel the context and everything derived from it. Idempotent.
    pub fn cancel(&self) {
        if self.node.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.node.parent.is_some() {
            trace!(cx = self.node.id, "timer context cancelled");
        } else {
            debug!(cx = self.node.id, "root context cancelled");
        }
    }

    /// Whether this context itself was cancelled (ancestors are not checked).
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.node.cancelled.load(Ordering::Acquire)
    }
}
