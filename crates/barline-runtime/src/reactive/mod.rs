#![forbid(unsafe_code)]

//! Reactive state for barline widgets.
//!
//! - [`Observable`]: a shared, version-tracked value with change
//!   notification, optionally refreshed by a poll task.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`Binding`]: an eagerly recomputed value derived from one or more
//!   sources ([`Source`] is implemented by both `Observable` and `Binding`).
//! - [`map_each`]: per-element mapping of a list-valued source, rebuilt on
//!   every change.
//! - [`BindingScope`]: releases a widget's subscriptions and bindings
//!   together.
//!
//! # Architecture
//!
//! Everything here is single-threaded: handles are `Rc<RefCell<..>>` and
//! therefore `!Send`. Subscribers are stored as `Weak` callbacks, snapshotted
//! before every notification cycle and upgraded at call time, so a
//! subscription dropped mid-cycle is never called again.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per mutation that changes the value.
//! 2. Subscribers are notified synchronously in registration order.
//! 3. Setting a value equal to the current value is a no-op.
//! 4. Dropping a [`Subscription`] means zero further calls of its callback.
//! 5. `Binding::get()` never recomputes and is never stale once notification
//!    has completed.

pub mod binding;
pub mod list;
pub mod observable;
pub mod poll;
pub mod scope;
pub mod source;
pub mod subscription;

pub use binding::{Binding, bind_mapped, bind_mapped2, bind_observable};
pub use list::map_each;
pub use observable::Observable;
pub use scope::BindingScope;
pub use source::Source;
pub use subscription::Subscription;
