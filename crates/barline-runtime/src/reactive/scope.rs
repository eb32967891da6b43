#![forbid(unsafe_code)]

//! Lifecycle container for the reactive pieces owned by one widget.

use super::binding::Binding;
use super::observable::Observable;
use super::subscription::Subscription;
use crate::timer::TimerHandle;

/// Collects subscriptions, timers, bindings and polled observables for a logical
/// scope (a widget, a popup, a list row).
///
/// When the scope is cleared or dropped, everything it holds is released in
/// reverse registration order: subscriptions are dropped, bindings and
/// observables are disposed (which stops their poll tasks).
///
/// # Invariants
///
/// 1. After `clear()` or drop, no callback registered through this scope
///    fires again.
/// 2. `clear()` leaves the scope empty and reusable.
/// 3. `len()` counts every held item.
#[derive(Default)]
pub struct BindingScope {
    items: Vec<Held>,
}

enum Held {
    Subscription(Subscription),
    Timer(TimerHandle),
    Disposer(Box<dyn FnOnce()>),
}

impl BindingScope {
    /// Create an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `sub` alive until the scope is released.
    pub fn hold(&mut self, sub: Subscription) -> &mut Self {
        self.items.push(Held::Subscription(sub));
        self
    }

    /// Cancel `timer` when the scope is released.
    pub fn hold_timer(&mut self, timer: TimerHandle) -> &mut Self {
        self.items.push(Held::Timer(timer));
        self
    }

    /// Subscribe to `source` within this scope.
    pub fn subscribe<T: Clone + PartialEq + 'static>(
        &mut self,
        source: &Observable<T>,
        callback: impl Fn(&T) + 'static,
    ) -> &mut Self {
        let sub = source.subscribe(callback);
        self.hold(sub)
    }

    /// Dispose `binding` when the scope is released. Returns the binding for
    /// chaining into a widget tree.
    pub fn own<T: Clone + PartialEq + 'static>(&mut self, binding: Binding<T>) -> Binding<T> {
        let handle = binding.clone();
        self.items
            .push(Held::Disposer(Box::new(move || handle.dispose())));
        binding
    }

    /// Dispose `observable` (and stop its polling) when the scope is released.
    pub fn own_observable<T: Clone + PartialEq + 'static>(
        &mut self,
        observable: Observable<T>,
    ) -> Observable<T> {
        let handle = observable.clone();
        self.items
            .push(Held::Disposer(Box::new(move || handle.dispose())));
        observable
    }

    /// Move everything held by `other` into this scope.
    pub fn absorb(&mut self, mut other: BindingScope) {
        self.items.append(&mut other.items);
    }

    /// Number of held items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the scope holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Release everything now, newest first.
    pub fn clear(&mut self) {
        while let Some(item) = self.items.pop() {
            match item {
                Held::Subscription(sub) => drop(sub),
                Held::Timer(timer) => timer.cancel(),
                Held::Disposer(dispose) => dispose(),
            }
        }
    }
}

impl Drop for BindingScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingScope")
            .field("len", &self.items.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn drop_releases_subscriptions() {
        let obs = Observable::new(0);
        let seen = Rc::new(Cell::new(0));
        {
            let mut scope = BindingScope::new();
            let s = Rc::clone(&seen);
            scope.subscribe(&obs, move |v| s.set(*v));
            obs.set(1);
            assert_eq!(seen.get(), 1);
        }
        obs.set(99);
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn clear_disposes_owned_bindings() {
        let obs = Observable::new(2);
        let mut scope = BindingScope::new();
        let doubled = scope.own(Binding::from_source(&obs, |v| v * 2));
        assert_eq!(obs.subscriber_count(), 1);

        scope.clear();
        assert!(scope.is_empty());
        assert!(doubled.is_disposed());
        assert_eq!(obs.subscriber_count(), 0);
    }

    #[test]
    fn owned_observable_is_disposed() {
        let mut scope = BindingScope::new();
        let local = scope.own_observable(Observable::new(false));
        drop(scope);
        assert!(local.is_disposed());
    }

    #[test]
    fn release_order_is_reverse() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scope = BindingScope::new();
        for tag in ["first", "second", "third"] {
            let obs = Observable::new(0);
            let l = Rc::clone(&log);
            let b = Binding::from_source(&obs, |v| *v);
            let watched = b.clone();
            scope.own(b);
            scope.items.push(Held::Disposer(Box::new(move || {
                l.borrow_mut().push((tag, watched.is_disposed()));
            })));
        }
        scope.clear();
        let order: Vec<_> = log.borrow().iter().map(|(t, _)| *t).collect();
        assert_eq!(order, vec!["third", "second", "first"]);
        assert!(log.borrow().iter().all(|(_, disposed)| !disposed));
    }

    #[test]
    fn absorb_moves_items() {
        let obs = Observable::new(0);
        let mut outer = BindingScope::new();
        let mut inner = BindingScope::new();
        inner.subscribe(&obs, |_| {});
        inner.subscribe(&obs, |_| {});
        outer.absorb(inner);
        assert_eq!(outer.len(), 2);
        assert_eq!(obs.subscriber_count(), 2);
        drop(outer);
        assert_eq!(obs.subscriber_count(), 0);
    }

    #[test]
    fn reusable_after_clear() {
        let obs = Observable::new(0);
        let mut scope = BindingScope::new();
        let first = Rc::new(Cell::new(false));
        let f = Rc::clone(&first);
        scope.subscribe(&obs, move |_| f.set(true));
        scope.clear();

        let second = Rc::new(Cell::new(false));
        let s = Rc::clone(&second);
        scope.subscribe(&obs, move |_| s.set(true));
        obs.set(1);
        assert!(!first.get());
        assert!(second.get());
    }

    #[test]
    fn held_timer_is_cancelled_on_release() {
        let clock = barline_core::LabClock::new();
        let event_loop =
            crate::timer::EventLoop::lab(&clock, crate::diagnostics::RecordingSink::new());
        let ticks = Rc::new(Cell::new(0));
        let t = Rc::clone(&ticks);
        let mut scope = BindingScope::new();
        scope.hold_timer(
            event_loop.schedule_every(barline_core::Duration::from_secs(1), move |_| {
                t.set(t.get() + 1);
            }),
        );
        event_loop.advance(barline_core::Duration::from_secs(2));
        assert_eq!(ticks.get(), 2);

        scope.clear();
        assert_eq!(event_loop.timer_count(), 0);
        event_loop.advance(barline_core::Duration::from_secs(2));
        assert_eq!(ticks.get(), 2);
    }

    #[test]
    fn debug_format() {
        let mut scope = BindingScope::new();
        let obs = Observable::new(0);
        scope.subscribe(&obs, |_| {});
        assert!(format!("{scope:?}").contains("len: 1"));
    }
}
