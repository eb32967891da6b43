#![forbid(unsafe_code)]

//! Shared, version-tracked values with change notification.
//!
//! # Design
//!
//! [`Observable<T>`] wraps its state in `Rc<RefCell<..>>`. Clones are handles
//! to the same value. Subscribers are held weakly (see
//! [`Subscription`]), and the list is snapshotted before a notification
//! cycle, with no borrow held, so callbacks may freely call `get`, `set`, or
//! `subscribe` on the same observable.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per mutation that changes the value.
//! 2. Subscribers are notified synchronously, in registration order, once per
//!    change.
//! 3. `set` with a value equal (`PartialEq`) to the current one is a no-op.
//!    [`replace`](Observable::replace) is the explicit escape hatch.
//! 4. At most one poll task is attached (see [`poll`](super::poll)).
//!
//! # Use after dispose
//!
//! A disposed observable keeps answering `get` with its last value.
//! `subscribe` returns an inert [`Subscription`], `set` is ignored, and
//! polling cannot be restarted.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::debug;

use super::poll::PollTask;
use super::source::Source;
use super::subscription::{SubscriberList, Subscription, dispatch};

pub(crate) struct ObservableInner<T> {
    pub(crate) value: T,
    pub(crate) version: u64,
    pub(crate) label: Option<String>,
    pub(crate) subscribers: SubscriberList<T>,
    pub(crate) poll: Option<PollTask>,
    pub(crate) disposed: bool,
}

/// A mutable, subscribable holder of a current value.
///
/// # Examples
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use barline_runtime::reactive::Observable;
///
/// let count = Observable::new(0);
/// let seen = Rc::new(Cell::new(0));
/// let s = Rc::clone(&seen);
/// let _sub = count.subscribe(move |v| s.set(*v));
///
/// count.set(5);
/// assert_eq!(seen.get(), 5);
/// assert_eq!(count.version(), 1);
///
/// count.set(5); // equal value: no notification, no version bump
/// assert_eq!(count.version(), 1);
/// ```
pub struct Observable<T> {
    pub(crate) inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug + 'static> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("label", &inner.label)
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscribers", &inner.subscribers.live_count())
            .field("polling", &inner.poll.is_some())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create an observable holding `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self::build(initial, None)
    }

    /// Create an observable with a label used as the context of poll
    /// diagnostics.
    #[must_use]
    pub fn named(label: impl Into<String>, initial: T) -> Self {
        Self::build(initial, Some(label.into()))
    }

    fn build(value: T, label: Option<String>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                label,
                subscribers: SubscriberList::new(),
                poll: None,
                disposed: false,
            })),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value.
    ///
    /// # Panics
    ///
    /// Panics if `f` mutates this same observable (re-entrant borrow).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Replace the value, notifying subscribers if it changed.
    pub fn set(&self, value: T) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.disposed {
                debug!(label = inner.label.as_deref(), "set on disposed observable ignored");
                return;
            }
            if inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
        }
        self.notify();
    }

    /// Mutate a copy of the value in place and commit it with [`set`](Self::set).
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut next = self.get();
        f(&mut next);
        self.set(next);
    }

    /// Replace the value and notify unconditionally.
    ///
    /// For values whose `PartialEq` is coarser than "nothing changed", e.g. a
    /// list of service handles compared by id whose properties moved.
    pub fn replace(&self, value: T) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.disposed {
                debug!(label = inner.label.as_deref(), "replace on disposed observable ignored");
                return;
            }
            inner.value = value;
            inner.version += 1;
        }
        self.notify();
    }

    /// Re-deliver the current value to every subscriber.
    ///
    /// If a callback changes the value again, the nested change notifies
    /// everyone with the newer value and this cycle stops, so no subscriber
    /// ends on a stale value.
    pub fn notify(&self) {
        let (snapshot, value, version) = {
            let mut inner = self.inner.borrow_mut();
            (inner.subscribers.snapshot(), inner.value.clone(), inner.version)
        };
        let inner = Rc::downgrade(&self.inner);
        dispatch(&snapshot, &value, move || {
            inner
                .upgrade()
                .is_some_and(|inner| {
                    let now = inner.borrow().version;
                    now == version
                })
        });
    }

    /// Register `callback`; it runs after every change until the returned
    /// [`Subscription`] is dropped.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        if inner.disposed {
            debug!(label = inner.label.as_deref(), "subscribe on disposed observable");
            return Subscription::inert();
        }
        inner.subscribers.add(callback)
    }

    /// Number of changes applied so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.live_count()
    }

    /// Diagnostic label, if one was given.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        self.inner.borrow().label.clone()
    }

    /// Stop polling, drop every subscriber, and freeze the value.
    pub fn dispose(&self) {
        let task = {
            let mut inner = self.inner.borrow_mut();
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            inner.subscribers.clear();
            inner.poll.take()
        };
        // Cancel outside the borrow: cancelling touches the event loop.
        drop(task);
        let label = self.label();
        debug!(label = label.as_deref(), "observable disposed");
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.borrow().disposed
    }

    /// Whether both handles point at the same value.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<ObservableInner<T>>> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn context(&self) -> String {
        match &self.inner.borrow().label {
            Some(label) => label.clone(),
            None => format!("observable@{:p}", Rc::as_ptr(&self.inner)),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Source for Observable<T> {
    type Value = T;

    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        Observable::with(self, f)
    }

    fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        Observable::subscribe(self, callback)
    }
}
