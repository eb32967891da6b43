#![forbid(unsafe_code)]

//! Subscriber bookkeeping shared by [`Observable`](super::Observable) and
//! [`Binding`](super::Binding).
//!
//! The notifier keeps only `Weak` references to callbacks. The strong
//! reference lives inside the [`Subscription`] handed back to the caller, so
//! dropping that handle is all it takes to unsubscribe. Dead entries are
//! pruned lazily, on the next registration or notification.

use std::any::Any;
use std::rc::{Rc, Weak};

pub(crate) type Callback<T> = dyn Fn(&T);

/// RAII guard for a registered callback.
///
/// The callback stays registered for as long as this value is alive. Dropping
/// it (or calling [`unsubscribe`](Self::unsubscribe)) guarantees the callback
/// never runs again, including later in a notification cycle that is already
/// in progress.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    guard: Option<Box<dyn Any>>,
}

impl Subscription {
    pub(crate) fn new<T: 'static>(callback: Rc<Callback<T>>) -> Self {
        Self {
            guard: Some(Box::new(callback)),
        }
    }

    /// A subscription that was never attached to anything.
    ///
    /// Returned when subscribing to a disposed source.
    pub fn inert() -> Self {
        Self { guard: None }
    }

    /// Whether this handle still keeps a callback registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.guard.is_some()
    }

    /// Release the callback now. Equivalent to dropping the handle.
    pub fn unsubscribe(mut self) {
        self.guard = None;
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Ordered list of weakly-held subscriber callbacks.
pub(crate) struct SubscriberList<T> {
    entries: Vec<Weak<Callback<T>>>,
}

impl<T: 'static> SubscriberList<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register `callback` at the end of the list.
    pub(crate) fn add(&mut self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.prune();
        let strong: Rc<Callback<T>> = Rc::new(callback);
        self.entries.push(Rc::downgrade(&strong));
        Subscription::new(strong)
    }

    /// Weak handles in registration order, for a notification cycle.
    ///
    /// Callers must release any borrow of the owning cell before invoking
    /// the callbacks, since callbacks are free to read or mutate the source.
    pub(crate) fn snapshot(&mut self) -> Vec<Weak<Callback<T>>> {
        self.prune();
        self.entries.clone()
    }

    pub(crate) fn live_count(&self) -> usize {
        self.entries.iter().filter(|w| w.strong_count() > 0).count()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    fn prune(&mut self) {
        self.entries.retain(|w| w.strong_count() > 0);
    }
}

/// Invoke every still-live callback in `snapshot` with `value`.
///
/// Each entry is upgraded right before it runs, so a callback that drops a
/// later subscription prevents that later callback from firing. `current` is
/// checked before each callback; once it returns `false` a nested change has
/// already delivered a newer value to every subscriber and the cycle stops.
pub(crate) fn dispatch<T>(snapshot: &[Weak<Callback<T>>], value: &T, current: impl Fn() -> bool) {
    for weak in snapshot {
        if !current() {
            break;
        }
        if let Some(callback) = weak.upgrade() {
            callback(value);
        }
    }
}
