use std::cell::RefCell;
use std::rc::Rc;

use barline_core::Duration;
use barline_runtime::{Binding, BindingScope, Observable};
use tracing::debug;

use crate::action::{Action, LaunchTarget};
use crate::fragment::Fragment;
use crate::weather::{WeatherData, WeatherSource};

use super::{Widget, WidgetEnv, millis};

#[must_use]
pub fn weather_fragment(data: &WeatherData) -> Fragment {
    Fragment::button(
        Fragment::label(data.label()),
        Some(Action::Launch(LaunchTarget::WeatherDetails)),
    )
    .class("weather")
    .tooltip(data.condition.clone())
}

/// How often a running fetch is checked for completion.
const FETCH_CHECK: Duration = Duration::from_secs(2);

/// Weather button. Shows whatever the cache holds at startup, then refreshes
/// on the weather interval. With fetching enabled the cache is read again as
/// soon as each fetch exits.
#[must_use]
pub fn weather(env: &WidgetEnv) -> Widget {
    let mut scope = BindingScope::new();
    let source = Rc::new(RefCell::new(WeatherSource::new(&env.config.weather)));
    let initial = source.borrow_mut().poll().unwrap_or_else(|err| {
        debug!(%err, "no cached weather yet");
        WeatherData::default()
    });
    let polled = Rc::clone(&source);
    let data = scope.own_observable(Observable::named("weather", initial).polling(
        &env.event_loop,
        millis(env.config.intervals.weather),
        move || polled.borrow_mut().poll(),
    ));
    if env.config.weather.fetch {
        let target = data.clone();
        scope.hold_timer(env.event_loop.schedule_every(FETCH_CHECK, move |_| {
            if !source.borrow_mut().fetch_finished() {
                return;
            }
            let fresh = source.borrow().read();
            match fresh {
                Ok(fresh) => target.set(fresh),
                Err(err) => debug!(%err, "weather cache unreadable after fetch"),
            }
        }));
    }
    let root = Binding::from_source(&data, weather_fragment);
    Widget::new(root, scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BarConfig;
    use crate::widgets::testing::lab_with;
    use barline_core::Duration;

    fn report(temp: &str, desc: &str) -> String {
        format!(r#"{{"current_condition":[{{"temp_F":"{temp}","weatherDesc":[{{"value":"{desc}"}}]}}]}}"#)
    }

    #[test]
    fn fetched_report_shows_before_next_interval() {
        let dir = tempfile::tempdir().unwrap();
        let fresh = dir.path().join("fresh.json");
        std::fs::write(&fresh, report("91", "Sunny")).unwrap();
        let mut config = BarConfig::default();
        config.weather.cache = dir.path().join("weather.json");
        config.weather.city_file = dir.path().join("city");
        config.weather.fetch = true;
        config.weather.fetch_command = vec![
            "cp".into(),
            fresh.display().to_string(),
            "{cache}".into(),
        ];
        let lab = lab_with(config);
        let widget = weather(&lab.env);

        let mut checks = 0;
        while widget.fragment().render() != "☀ 91°F" && checks < 100 {
            std::thread::sleep(std::time::Duration::from_millis(50));
            lab.env.event_loop.advance(FETCH_CHECK);
            checks += 1;
        }
        assert_eq!(widget.fragment().render(), "☀ 91°F");
        assert!(lab.clock.elapsed() < Duration::from_millis(1_800_000));
    }

    #[test]
    fn fetch_check_timer_only_with_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BarConfig::default();
        config.weather.cache = dir.path().join("weather.json");
        config.weather.city_file = dir.path().join("city");
        let lab = lab_with(config.clone());
        let _quiet = weather(&lab.env);
        assert_eq!(lab.env.event_loop.timer_count(), 1);

        config.weather.fetch = true;
        config.weather.fetch_command = vec!["true".into()];
        let lab = lab_with(config);
        let widget = weather(&lab.env);
        assert_eq!(lab.env.event_loop.timer_count(), 2);
        drop(widget);
        assert_eq!(lab.env.event_loop.timer_count(), 0);
    }

    #[test]
    fn starts_with_placeholder_and_reports_missing_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BarConfig::default();
        config.weather.cache = dir.path().join("missing.json");
        config.weather.city_file = dir.path().join("city");
        let lab = lab_with(config);

        let widget = weather(&lab.env);
        assert_eq!(widget.fragment().render(), "🌡 --°F");
        assert_eq!(widget.fragment().tooltip_text(), Some("Loading..."));

        lab.env.event_loop.advance(Duration::from_millis(1_800_000));
        assert_eq!(lab.sink.len(), 1);
        assert_eq!(lab.sink.entries()[0].context, "weather");
        assert_eq!(widget.fragment().render(), "🌡 --°F");
    }

    #[test]
    fn picks_up_cache_changes_on_tick() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("weather.json");
        std::fs::write(&cache, report("64", "Sunny")).unwrap();
        let mut config = BarConfig::default();
        config.weather.cache = cache.clone();
        config.weather.city_file = dir.path().join("city");
        let lab = lab_with(config);

        let widget = weather(&lab.env);
        assert_eq!(widget.fragment().render(), "☀ 64°F");
        assert_eq!(
            widget.fragment().actions(),
            vec![&Action::Launch(LaunchTarget::WeatherDetails)]
        );

        std::fs::write(&cache, report("58", "Light Rain")).unwrap();
        lab.env.event_loop.advance(Duration::from_millis(1_800_000));
        assert_eq!(widget.fragment().render(), "🌧 58°F");
        assert!(lab.sink.is_empty());
    }
}
