//! Time, date and the hour-of-day mood emoji.

use std::rc::Rc;

use barline_runtime::{Binding, BindingScope, Observable};

use crate::fragment::Fragment;
use crate::wall::WallClock;

use super::{Widget, WidgetEnv, millis};

pub const TIME_FORMAT: &str = "%I:%M %p";
pub const DATE_FORMAT: &str = "%a %b %d";

fn formatted(wall: &dyn WallClock, format: &str) -> String {
    wall.now().format(format).to_string()
}

fn polled_text(env: &WidgetEnv, label: &str, interval: u64, format: &'static str) -> Observable<String> {
    let wall = Rc::clone(&env.wall);
    Observable::named(label, formatted(wall.as_ref(), format)).polling(
        &env.event_loop,
        millis(interval),
        move || Ok(formatted(wall.as_ref(), format)),
    )
}

#[must_use]
pub fn clock(env: &WidgetEnv) -> Widget {
    let mut scope = BindingScope::new();
    let interval = env.config.intervals.clock;
    let time = scope.own_observable(polled_text(env, "clock.time", interval, TIME_FORMAT));
    let date = scope.own_observable(polled_text(env, "clock.date", interval, DATE_FORMAT));
    let root = Binding::from2(&time, &date, |time: &String, date: &String| {
        Fragment::row(vec![
            Fragment::label(time.clone()).class("time"),
            Fragment::label(date.clone()).class("date"),
        ])
        .class("clock")
    });
    Widget::new(root, scope)
}

/// Emoji for the hour of day (0-23).
#[must_use]
pub fn mood_for_hour(hour: u32) -> &'static str {
    match hour {
        6..=11 => "😌",
        12..=13 => "😊",
        14..=17 => "😌",
        18..=21 => "😊",
        _ => "😴",
    }
}

#[must_use]
pub fn mood(env: &WidgetEnv) -> Widget {
    let mut scope = BindingScope::new();
    let wall = Rc::clone(&env.wall);
    let mood = scope.own_observable(
        Observable::named("mood", mood_for_hour(wall.hour()).to_string()).polling(
            &env.event_loop,
            millis(env.config.intervals.mood),
            move || Ok(mood_for_hour(wall.hour()).to_string()),
        ),
    );
    let root = Binding::from_source(&mood, |emoji: &String| {
        Fragment::label(emoji.clone()).class("mood-indicator")
    });
    Widget::new(root, scope)
}
