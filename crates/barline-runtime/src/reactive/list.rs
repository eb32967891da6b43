#![forbid(unsafe_code)]

//! Mapping a changing, ordered collection onto derived fragments.
//!
//! [`map_each`] rebuilds the whole output sequence every time the source
//! sequence changes. There is no per-element diffing and no identity
//! tracking: element `i` of the output is always `f(source[i])` for the
//! current source, and any state a fragment kept internally is gone after
//! the next change. Filtering and sorting belong upstream, in the derive
//! function that produced the source sequence.

use super::binding::Binding;
use super::source::Source;

/// Map every element of a list-valued source through `f`, in source order.
///
/// # Examples
///
/// ```
/// use barline_runtime::reactive::{Observable, map_each};
///
/// let items = Observable::new(vec![1, 2, 3]);
/// let doubled = map_each(&items, |x| x * 2);
/// assert_eq!(doubled.get(), vec![2, 4, 6]);
///
/// items.set(vec![3, 1]);
/// assert_eq!(doubled.get(), vec![6, 2]);
/// ```
pub fn map_each<Src, U, V>(source: &Src, f: impl Fn(&U) -> V + 'static) -> Binding<Vec<V>>
where
    Src: Source<Value = Vec<U>>,
    U: Clone + 'static,
    V: Clone + PartialEq + 'static,
{
    Binding::from_source(source, move |items: &Vec<U>| items.iter().map(&f).collect())
}

impl<U: Clone + PartialEq + 'static> Binding<Vec<U>> {
    /// Method form of [`map_each`].
    pub fn map_each<V: Clone + PartialEq + 'static>(
        &self,
        f: impl Fn(&U) -> V + 'static,
    ) -> Binding<Vec<V>> {
        map_each(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Observable;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn rebuilds_in_source_order() {
        let (a, b, c) = (1, 2, 3);
        let src = Observable::new(vec![a, b, c]);
        let out = map_each(&src, |x| x * 2);
        assert_eq!(out.get(), vec![2 * a, 2 * b, 2 * c]);

        src.set(vec![c, a]);
        assert_eq!(out.get(), vec![2 * c, 2 * a]);
    }

    #[test]
    fn maps_every_element_on_each_change() {
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let src = Observable::new(vec!["a", "b"]);
        let out = map_each(&src, move |s: &&str| {
            c.set(c.get() + 1);
            s.to_uppercase()
        });
        assert_eq!(calls.get(), 2);

        src.set(vec!["a", "b", "c"]);
        assert_eq!(calls.get(), 5, "no reuse of previously mapped elements");
        assert_eq!(out.get(), vec!["A", "B", "C"]);
    }

    #[test]
    fn duplicates_are_kept() {
        let src = Observable::new(vec![1, 1, 2]);
        let out = map_each(&src, |x| *x);
        assert_eq!(out.get(), vec![1, 1, 2]);
    }

    #[test]
    fn upstream_filter_then_map() {
        let ids = Observable::new(vec![3, -1, 1, 2]);
        let visible = Binding::from_source(&ids, |v: &Vec<i32>| {
            let mut kept: Vec<i32> = v.iter().copied().filter(|id| *id > 0).collect();
            kept.sort_unstable();
            kept
        });
        let labels = visible.map_each(|id| format!("ws{id}"));
        assert_eq!(labels.get(), vec!["ws1", "ws2", "ws3"]);

        ids.set(vec![-5, 7]);
        assert_eq!(labels.get(), vec!["ws7"]);
    }

    #[test]
    fn consumers_see_whole_replacement() {
        let src = Observable::new(vec![1, 2]);
        let out = map_each(&src, |x| x + 100);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = out.subscribe(move |v: &Vec<i32>| s.borrow_mut().push(v.clone()));

        src.set(vec![2]);
        src.set(vec![]);
        assert_eq!(*seen.borrow(), vec![vec![102], vec![]]);
    }
}
