//! Bar widgets.
//!
//! Every constructor returns a [`Widget`]: a root [`Binding`] of
//! [`Fragment`] plus the [`BindingScope`] owning everything the widget
//! created. Dropping the widget releases its subscriptions and stops its
//! poll tasks.

pub mod bar;
pub mod buttons;
pub mod clock;
pub mod compositor;
pub mod control_center;
pub mod media;
pub mod sensors;
pub mod system;
pub mod weather;

use std::rc::Rc;

use barline_core::Duration;
use barline_runtime::{Binding, BindingScope, EventLoop};

use crate::config::BarConfig;
use crate::fragment::Fragment;
use crate::wall::WallClock;

/// What widgets need besides state: where to schedule polls, what time it
/// is, and the config.
#[derive(Clone)]
pub struct WidgetEnv {
    pub event_loop: EventLoop,
    pub wall: Rc<dyn WallClock>,
    pub config: Rc<BarConfig>,
}

impl WidgetEnv {
    #[must_use]
    pub fn new(event_loop: EventLoop, wall: Rc<dyn WallClock>, config: Rc<BarConfig>) -> Self {
        Self {
            event_loop,
            wall,
            config,
        }
    }
}

pub struct Widget {
    pub root: Binding<Fragment>,
    pub scope: BindingScope,
}

impl Widget {
    /// Wrap `root`, making `scope` responsible for disposing it.
    #[must_use]
    pub fn new(root: Binding<Fragment>, mut scope: BindingScope) -> Self {
        let root = scope.own(root);
        Self { root, scope }
    }

    /// A widget whose fragment never changes.
    #[must_use]
    pub fn fixed(fragment: Fragment) -> Self {
        Self::new(Binding::constant(fragment), BindingScope::new())
    }

    #[must_use]
    pub fn fragment(&self) -> Fragment {
        self.root.get()
    }
}

impl std::fmt::Debug for Widget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Widget")
            .field("root", &self.root)
            .field("scope", &self.scope)
            .finish()
    }
}

/// First `max` characters of `text`.
#[must_use]
pub fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// `round(fraction * 100)%`.
#[must_use]
pub fn percent(fraction: f64) -> String {
    format!("{}%", (fraction * 100.0).round() as i64)
}

pub(crate) fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::wall::FixedClock;
    use barline_core::LabClock;
    use barline_runtime::RecordingSink;
    use chrono::{NaiveDate, NaiveDateTime};

    pub fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(h, m, 0))
            .unwrap()
    }

    pub struct Lab {
        pub clock: LabClock,
        pub sink: RecordingSink,
        pub wall: FixedClock,
        pub env: WidgetEnv,
    }

    pub fn lab_with(config: BarConfig) -> Lab {
        let clock = LabClock::new();
        let sink = RecordingSink::new();
        let wall = FixedClock::new(at(9, 5));
        let env = WidgetEnv::new(
            EventLoop::lab(&clock, sink.clone()),
            Rc::new(wall.clone()),
            Rc::new(config),
        );
        Lab {
            clock,
            sink,
            wall,
            env,
        }
    }

    pub fn lab() -> Lab {
        lab_with(BarConfig::default())
    }
}
