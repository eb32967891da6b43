#![forbid(unsafe_code)]

//! The read side shared by [`Observable`](super::Observable) and
//! [`Binding`](super::Binding).

use super::subscription::Subscription;

/// Anything a [`Binding`](super::Binding) can derive from.
///
/// Implementors are cheap shared handles: cloning one yields another handle
/// to the same underlying value.
pub trait Source: Clone + 'static {
    /// Type of the held value.
    type Value: Clone + 'static;

    /// Borrow the current value.
    fn with<R>(&self, f: impl FnOnce(&Self::Value) -> R) -> R;

    /// Register a change callback.
    fn subscribe(&self, callback: impl Fn(&Self::Value) + 'static) -> Subscription;

    /// Clone of the current value.
    fn get(&self) -> Self::Value {
        self.with(|v| v.clone())
    }
}
