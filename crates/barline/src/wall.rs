//! Wall-clock time for clock and mood widgets.

use std::cell::Cell;
use std::rc::Rc;

use barline_core::LabClock;
use chrono::{Local, NaiveDateTime, TimeDelta, Timelike};

pub trait WallClock {
    fn now(&self) -> NaiveDateTime;

    fn hour(&self) -> u32 {
        self.now().hour()
    }
}

/// Local time from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A fixed start time moved forward by a [`LabClock`]. Lets a lab run show
/// believable, reproducible times.
#[derive(Debug, Clone)]
pub struct LabWallClock {
    start: NaiveDateTime,
    clock: LabClock,
}

impl LabWallClock {
    #[must_use]
    pub fn new(start: NaiveDateTime, clock: LabClock) -> Self {
        Self { start, clock }
    }
}

impl WallClock for LabWallClock {
    fn now(&self) -> NaiveDateTime {
        let elapsed = TimeDelta::from_std(self.clock.elapsed()).unwrap_or(TimeDelta::MAX);
        self.start
            .checked_add_signed(elapsed)
            .unwrap_or(NaiveDateTime::MAX)
    }
}

/// A settable clock for tests.
#[derive(Debug, Clone)]
pub struct FixedClock(Rc<Cell<NaiveDateTime>>);

impl FixedClock {
    #[must_use]
    pub fn new(at: NaiveDateTime) -> Self {
        Self(Rc::new(Cell::new(at)))
    }

    pub fn set(&self, at: NaiveDateTime) {
        self.0.set(at);
    }
}

impl WallClock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barline_core::Duration;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(h, m, 0))
            .unwrap()
    }

    #[test]
    fn lab_wall_clock_follows_lab_time() {
        let lab = LabClock::new();
        let wall = LabWallClock::new(at(9, 0), lab.clone());
        assert_eq!(wall.now(), at(9, 0));
        lab.advance(Duration::from_secs(90 * 60));
        assert_eq!(wall.now(), at(10, 30));
        assert_eq!(wall.hour(), 10);
    }

    #[test]
    fn fixed_clock_is_settable() {
        let clock = FixedClock::new(at(1, 0));
        let handle = clock.clone();
        handle.set(at(23, 59));
        assert_eq!(clock.hour(), 23);
    }
}
