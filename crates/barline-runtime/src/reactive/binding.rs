#![forbid(unsafe_code)]

//! Derived, read-only values that follow their sources.
//!
//! # Design
//!
//! A [`Binding<T>`] owns a derive function, a cached result, and one
//! [`Subscription`] per source. When any source notifies, the derive function
//! runs immediately against the current value of *every* source and the
//! result is cached. Reads never recompute. This is push, not pull: several
//! readers of one binding share a single computation per change.
//!
//! There is no batching. If two sources of the same binding change in one
//! call stack, the binding recomputes twice. Callers that need both changes
//! applied atomically should hold them in one observable.
//!
//! # Invariants
//!
//! 1. `get()` equals `derive(current sources)` whenever no notification is in
//!    flight.
//! 2. The derive function runs once at construction and once per source
//!    notification.
//! 3. Downstream subscribers are notified only when the derived value
//!    changes (`PartialEq`), matching [`Observable::set`].
//! 4. A binding keeps its sources alive; sources hold the binding weakly.
//!    Dropping every handle to a binding detaches it.
//!
//! # Failure Modes
//!
//! - **Derive panics**: the panic unwinds into whoever called the `set` that
//!   triggered the recomputation. The cached value keeps its previous
//!   contents, and a later `set` of the same source value is suppressed, so
//!   the binding stays behind until its source changes or re-notifies. Poll
//!   tasks catch the panic, report it, and re-notify on their next tick.
//! - **Use after dispose**: `get()` returns the last cached value and
//!   `subscribe()` returns an inert subscription.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::observable::Observable;
use super::source::Source;
use super::subscription::{SubscriberList, Subscription, dispatch};

struct BindingInner<T> {
    value: RefCell<T>,
    version: Cell<u64>,
    subscribers: RefCell<SubscriberList<T>>,
    sources: RefCell<Vec<Subscription>>,
    disposed: Cell<bool>,
}

/// A read-only value derived from one or more sources.
///
/// Cloning a `Binding` creates a new handle to the **same** cached value.
///
/// # Examples
///
/// ```
/// use barline_runtime::reactive::{Binding, Observable};
///
/// let width = Observable::new(10);
/// let height = Observable::new(20);
/// let area = Binding::from2(&width, &height, |w, h| w * h);
/// let label = area.map(|a| format!("{a} cells"));
///
/// width.set(5);
/// assert_eq!(area.get(), 100);
/// assert_eq!(label.get(), "100 cells");
/// ```
pub struct Binding<T> {
    inner: Rc<BindingInner<T>>,
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("value", &self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .field("sources", &self.inner.sources.borrow().len())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Binding<T> {
    fn build(compute: &Rc<dyn Fn() -> T>) -> Self {
        Self {
            inner: Rc::new(BindingInner {
                value: RefCell::new(compute()),
                version: Cell::new(0),
                subscribers: RefCell::new(SubscriberList::new()),
                sources: RefCell::new(Vec::new()),
                disposed: Cell::new(false),
            }),
        }
    }

    /// Subscribe to `source` so each of its notifications recomputes and
    /// publishes through `compute`.
    fn attach<Src: Source>(&self, source: &Src, compute: Rc<dyn Fn() -> T>) {
        let weak = Rc::downgrade(&self.inner);
        let sub = source.subscribe(move |_| {
            if let Some(inner) = weak.upgrade() {
                Binding { inner }.publish(compute());
            }
        });
        self.inner.sources.borrow_mut().push(sub);
    }

    fn publish(&self, next: T) {
        if self.inner.disposed.get() {
            return;
        }
        {
            let mut slot = self.inner.value.borrow_mut();
            if *slot == next {
                return;
            }
            *slot = next;
        }
        let version = self.inner.version.get() + 1;
        self.inner.version.set(version);
        let snapshot = self.inner.subscribers.borrow_mut().snapshot();
        let value = self.inner.value.borrow().clone();
        let inner = Rc::downgrade(&self.inner);
        dispatch(&snapshot, &value, move || {
            inner
                .upgrade()
                .is_some_and(|inner| inner.version.get() == version)
        });
    }

    /// A binding that never changes.
    #[must_use]
    pub fn constant(value: T) -> Self {
        let compute: Rc<dyn Fn() -> T> = Rc::new(move || value.clone());
        Self::build(&compute)
    }

    /// Derive from a single source.
    pub fn from_source<Src: Source>(
        source: &Src,
        derive: impl Fn(&Src::Value) -> T + 'static,
    ) -> Self {
        let src = source.clone();
        let compute: Rc<dyn Fn() -> T> = Rc::new(move || src.with(|v| derive(v)));
        let binding = Self::build(&compute);
        binding.attach(source, compute);
        binding
    }

    /// Derive from two sources. Recomputes once per notification of either.
    pub fn from2<A: Source, B: Source>(
        a: &A,
        b: &B,
        derive: impl Fn(&A::Value, &B::Value) -> T + 'static,
    ) -> Self {
        let a_clone = a.clone();
        let b_clone = b.clone();
        let compute: Rc<dyn Fn() -> T> =
            Rc::new(move || a_clone.with(|v1| b_clone.with(|v2| derive(v1, v2))));
        let binding = Self::build(&compute);
        binding.attach(a, Rc::clone(&compute));
        binding.attach(b, compute);
        binding
    }

    /// Derive from three sources.
    pub fn from3<A: Source, B: Source, C: Source>(
        a: &A,
        b: &B,
        c: &C,
        derive: impl Fn(&A::Value, &B::Value, &C::Value) -> T + 'static,
    ) -> Self {
        let a_clone = a.clone();
        let b_clone = b.clone();
        let c_clone = c.clone();
        let compute: Rc<dyn Fn() -> T> = Rc::new(move || {
            a_clone.with(|v1| b_clone.with(|v2| c_clone.with(|v3| derive(v1, v2, v3))))
        });
        let binding = Self::build(&compute);
        binding.attach(a, Rc::clone(&compute));
        binding.attach(b, Rc::clone(&compute));
        binding.attach(c, compute);
        binding
    }

    /// Current (cached) value. Never recomputes.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the cached value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Derive a further binding from this one.
    pub fn map<R: Clone + PartialEq + 'static>(&self, f: impl Fn(&T) -> R + 'static) -> Binding<R> {
        Binding::from_source(self, f)
    }

    /// Register a callback for changes of the derived value.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        if self.inner.disposed.get() {
            tracing::debug!("subscribe on disposed binding");
            return Subscription::inert();
        }
        self.inner.subscribers.borrow_mut().add(callback)
    }

    /// Number of times the derived value changed after construction.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Number of live downstream subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().live_count()
    }

    /// Detach from every source and every subscriber. The cached value stays
    /// readable.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        let sources = std::mem::take(&mut *self.inner.sources.borrow_mut());
        drop(sources);
        self.inner.subscribers.borrow_mut().clear();
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl<S: Clone + PartialEq + 'static> Binding<Vec<S>> {
    /// Combine a homogeneous list of sources into one binding of their values,
    /// in the order given.
    pub fn collect<Src: Source<Value = S>>(sources: &[Src]) -> Self {
        let owned: Vec<Src> = sources.to_vec();
        let compute: Rc<dyn Fn() -> Vec<S>> =
            Rc::new(move || owned.iter().map(|s| s.get()).collect());
        let binding = Self::build(&compute);
        for source in sources {
            binding.attach(source, Rc::clone(&compute));
        }
        binding
    }
}

impl<T: Clone + PartialEq + 'static> Source for Binding<T> {
    type Value = T;

    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        Binding::with(self, f)
    }

    fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        Binding::subscribe(self, callback)
    }
}

/// Create a direct binding to an observable (identity transform).
pub fn bind_observable<T: Clone + PartialEq + 'static>(source: &Observable<T>) -> Binding<T> {
    Binding::from_source(source, T::clone)
}

/// Create a mapped binding: `source` value transformed by `map`.
pub fn bind_mapped<S, T>(source: &Observable<S>, map: impl Fn(&S) -> T + 'static) -> Binding<T>
where
    S: Clone + PartialEq + 'static,
    T: Clone + PartialEq + 'static,
{
    Binding::from_source(source, map)
}

/// Create a binding from two observables combined by `map`.
pub fn bind_mapped2<S1, S2, T>(
    s1: &Observable<S1>,
    s2: &Observable<S2>,
    map: impl Fn(&S1, &S2) -> T + 'static,
) -> Binding<T>
where
    S1: Clone + PartialEq + 'static,
    S2: Clone + PartialEq + 'static,
    T: Clone + PartialEq + 'static,
{
    Binding::from2(s1, s2, map)
}

// ---------------------------------------------------------------------------
// Macros
// ---------------------------------------------------------------------------

/// Create a direct [`Binding`] to an observable.
///
/// ```
/// use barline_runtime::{bind, reactive::Observable};
///
/// let count = Observable::new(0);
/// let b = bind!(count);
/// assert_eq!(b.get(), 0);
/// ```
#[macro_export]
macro_rules! bind {
    ($obs:expr) => {
        $crate::reactive::binding::bind_observable(&$obs)
    };
}

/// Create a mapped [`Binding`]; the call-site spelling of `bind(x).as(f)`.
///
/// ```
/// use barline_runtime::{bind_map, reactive::Observable};
///
/// let volume = Observable::new(0.42);
/// let label = bind_map!(volume, |v: &f64| format!("{}%", (v * 100.0).round()));
/// assert_eq!(label.get(), "42%");
/// ```
#[macro_export]
macro_rules! bind_map {
    ($obs:expr, $f:expr) => {
        $crate::reactive::binding::bind_mapped(&$obs, $f)
    };
}

/// Create a mapped [`Binding`] from two observables.
///
/// ```
/// use barline_runtime::{bind_map2, reactive::Observable};
///
/// let width = Observable::new(10);
/// let height = Observable::new(20);
/// let area = bind_map2!(width, height, |w: &i32, h: &i32| w * h);
/// assert_eq!(area.get(), 200);
/// ```
#[macro_export]
macro_rules! bind_map2 {
    ($s1:expr, $s2:expr, $f:expr) => {
        $crate::reactive::binding::bind_mapped2(&$s1, &$s2, $f)
    };
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubled_scenario() {
        let obs = Observable::new(0);
        let doubled = obs_map(&obs, |x| x * 2);
        obs.set(5);
        assert_eq!(doubled.get(), 10);
        obs.set(5);
        assert_eq!(doubled.get(), 10);
        assert_eq!(doubled.version(), 1);
    }

    fn obs_map(obs: &Observable<i32>, f: impl Fn(&i32) -> i32 + 'static) -> Binding<i32> {
        Binding::from_source(obs, f)
    }

    #[test]
    fn initial_value_is_computed_eagerly() {
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let obs = Observable::new(1);
        let b = Binding::from_source(&obs, move |v| {
            c.set(c.get() + 1);
            v + 1
        });
        assert_eq!(calls.get(), 1);
        assert_eq!(b.get(), 2);
    }

    #[test]
    fn reads_never_recompute() {
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let obs = Observable::new(2);
        let b = Binding::from_source(&obs, move |v| {
            c.set(c.get() + 1);
            v * 3
        });
        for _ in 0..10 {
            assert_eq!(b.get(), 6);
        }
        assert_eq!(calls.get(), 1);

        obs.set(3);
        assert_eq!(calls.get(), 2);
        assert_eq!(b.get(), 9);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn multi_source_recomputes_per_notification() {
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let a = Observable::new(1);
        let b = Observable::new(2);
        let sum = Binding::from2(&a, &b, move |x, y| {
            c.set(c.get() + 1);
            x + y
        });
        assert_eq!(calls.get(), 1);

        a.set(10);
        b.set(20);
        assert_eq!(calls.get(), 3, "one recompute per source change, no batching");
        assert_eq!(sum.get(), 30);
    }

    #[test]
    fn three_sources() {
        let a = Observable::new(1);
        let b = Observable::new(2);
        let c = Observable::new(3);
        let sum = Binding::from3(&a, &b, &c, |x, y, z| x + y + z);
        assert_eq!(sum.get(), 6);
        c.set(100);
        assert_eq!(sum.get(), 103);
    }

    #[test]
    fn chain_of_bindings_stays_consistent() {
        let obs = Observable::new(1);
        let plus_one = Binding::from_source(&obs, |v| v + 1);
        let times_ten = plus_one.map(|v| v * 10);
        let text = times_ten.map(|v| format!("<{v}>"));
        obs.set(4);
        assert_eq!(plus_one.get(), 5);
        assert_eq!(times_ten.get(), 50);
        assert_eq!(text.get(), "<50>");
    }

    #[test]
    fn mixed_observable_and_binding_sources() {
        let focused = Observable::new(Some(2));
        let ids = Observable::new(vec![1, 2, 3]);
        let positive = Binding::from_source(&ids, |v: &Vec<i32>| v.len());
        let summary = Binding::from2(&focused, &positive, |f, n| format!("{f:?}/{n}"));
        assert_eq!(summary.get(), "Some(2)/3");
        ids.set(vec![1]);
        assert_eq!(summary.get(), "Some(2)/1");
    }

    #[test]
    fn downstream_notified_only_on_change() {
        let obs = Observable::new(3);
        let parity = Binding::from_source(&obs, |v| v % 2 == 0);
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let _sub = parity.subscribe(move |_| h.set(h.get() + 1));

        obs.set(5);
        assert_eq!(hits.get(), 0, "parity unchanged");
        obs.set(6);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn subscriber_sees_fresh_value() {
        let obs = Observable::new(1);
        let doubled = Binding::from_source(&obs, |v| v * 2);
        let seen = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        let d = doubled.clone();
        let _sub = doubled.subscribe(move |v| {
            assert_eq!(*v, d.get());
            s.set(*v);
        });
        obs.set(21);
        assert_eq!(seen.get(), 42);
    }

    #[test]
    fn nested_change_supersedes_outer_delivery() {
        let obs = Observable::new(0);
        let doubled = Binding::from_source(&obs, |v| v * 2);
        let o = obs.clone();
        let _clamp = doubled.subscribe(move |v| {
            if *v > 20 {
                o.set(10);
            }
        });
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _render = doubled.subscribe(move |v| s.borrow_mut().push(*v));

        obs.set(42);
        assert_eq!(doubled.get(), 20);
        assert_eq!(*seen.borrow(), vec![20]);
    }

    #[test]
    fn dispose_detaches_from_sources() {
        let obs = Observable::new(1);
        let b = Binding::from_source(&obs, |v| v * 2);
        assert_eq!(obs.subscriber_count(), 1);
        b.dispose();
        assert_eq!(obs.subscriber_count(), 0);
        obs.set(10);
        assert_eq!(b.get(), 2, "last-known value after dispose");
        assert!(!b.subscribe(|_| {}).is_active());
        assert!(b.is_disposed());
    }

    #[test]
    fn dropping_binding_unsubscribes() {
        let obs = Observable::new(1);
        {
            let _b = Binding::from_source(&obs, |v| v + 1);
            assert_eq!(obs.subscriber_count(), 1);
        }
        assert_eq!(obs.subscriber_count(), 0);
    }

    #[test]
    fn binding_keeps_source_alive() {
        let b;
        {
            let obs = Observable::new(7);
            b = Binding::from_source(&obs, |v| v * 2);
        }
        assert_eq!(b.get(), 14);
    }

    #[test]
    fn collect_follows_every_source() {
        let sources: Vec<_> = (0..3).map(Observable::new).collect();
        let all = Binding::collect(&sources);
        assert_eq!(all.get(), vec![0, 1, 2]);
        sources[1].set(9);
        assert_eq!(all.get(), vec![0, 9, 2]);
    }

    #[test]
    fn constant_never_changes() {
        let c = Binding::constant("fixed");
        assert_eq!(c.get(), "fixed");
        assert_eq!(c.version(), 0);
    }

    #[test]
    fn macros() {
        let a = Observable::new(3);
        let b = Observable::new(4);
        assert_eq!(bind!(a).get(), 3);
        assert_eq!(bind_map!(a, |v: &i32| v * 10).get(), 30);
        assert_eq!(bind_map2!(a, b, |x: &i32, y: &i32| x + y).get(), 7);
    }

    #[test]
    #[should_panic(expected = "derive exploded")]
    fn derive_panic_reaches_setter() {
        let obs = Observable::new(0);
        let _b = Binding::from_source(&obs, |v: &i32| {
            assert!(*v < 10, "derive exploded");
            *v
        });
        obs.set(11);
    }

    #[test]
    fn debug_format() {
        let obs = Observable::new(42);
        let b = Binding::from_source(&obs, |v| *v);
        let dbg = format!("{b:?}");
        assert!(dbg.contains("Binding"));
        assert!(dbg.contains("42"));
    }
}
