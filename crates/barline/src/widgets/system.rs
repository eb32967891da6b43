//! Volume, network, battery, tray and idle inhibitor.

use barline_runtime::{Binding, BindingScope, map_each};

use crate::action::Action;
use crate::fragment::Fragment;
use crate::state::{AudioState, BatteryState, NetworkState, TrayItem, TrayState, UiState};

use super::{Widget, percent};

#[must_use]
pub fn volume(audio: &AudioState) -> Widget {
    let root = Binding::from2(
        &audio.volume_icon,
        &audio.volume,
        |icon: &String, volume: &f64| {
            Fragment::row(vec![
                Fragment::icon(icon.clone()),
                Fragment::label(percent(*volume)),
            ])
            .class("volume")
        },
    );
    Widget::new(root, BindingScope::new())
}

/// Wifi icon while wifi is enabled, wired icon while a cable is up.
#[must_use]
pub fn network(net: &NetworkState) -> Widget {
    let mut scope = BindingScope::new();
    let wifi = scope.own(Binding::from2(
        &net.wifi_icon,
        &net.wifi_enabled,
        |icon: &String, enabled: &bool| Fragment::icon(icon.clone()).visible(*enabled),
    ));
    let wired = scope.own(Binding::from2(
        &net.wired_icon,
        &net.wired_speed,
        |icon: &String, speed: &u32| Fragment::icon(icon.clone()).visible(*speed > 0),
    ));
    let root = Binding::from2(&wifi, &wired, |wifi: &Fragment, wired: &Fragment| {
        Fragment::row(vec![wifi.clone(), wired.clone()]).class("network")
    });
    Widget::new(root, scope)
}

/// Battery icon and percentage; nothing at all without a battery.
#[must_use]
pub fn battery(bat: &BatteryState) -> Widget {
    let root = Binding::from3(
        &bat.present,
        &bat.icon,
        &bat.fraction,
        |present: &bool, icon: &String, fraction: &f64| {
            if !*present {
                return Fragment::Empty;
            }
            Fragment::row(vec![
                Fragment::icon(icon.clone()),
                Fragment::label(percent(*fraction)),
            ])
            .class("battery")
        },
    );
    Widget::new(root, BindingScope::new())
}

fn tray_button(item: &TrayItem) -> Fragment {
    Fragment::button(
        Fragment::icon(item.icon.clone()),
        Some(Action::ActivateTrayItem(item.id.clone())),
    )
    .class("tray-item")
    .tooltip(item.tooltip.clone())
}

#[must_use]
pub fn tray(tray: &TrayState) -> Widget {
    let mut scope = BindingScope::new();
    let buttons = scope.own(map_each(&tray.items, tray_button));
    let root = buttons.map(|children| Fragment::row(children.clone()).class("system-tray"));
    Widget::new(root, scope)
}

#[must_use]
pub fn idle_inhibitor(ui: &UiState) -> Widget {
    let root = Binding::from_source(&ui.idle_inhibited, |inhibited: &bool| {
        let (icon, tooltip) = if *inhibited {
            ("weather-clear-symbolic", "Sleep: Disabled")
        } else {
            ("weather-clear-night-symbolic", "Sleep: Enabled")
        };
        Fragment::button(Fragment::icon(icon), Some(Action::ToggleIdleInhibit))
            .class("idle-inhibitor")
            .tooltip(tooltip)
    });
    Widget::new(root, BindingScope::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::BarState;

    #[test]
    fn volume_tracks_level_and_icon() {
        let state = BarState::new();
        let widget = volume(&state.audio);
        assert_eq!(widget.fragment().render(), "🔇 0%");
        state.audio.set_volume(0.424);
        assert_eq!(widget.fragment().render(), "🔉 42%");
        state.audio.set_volume(3.0);
        assert_eq!(widget.fragment().render(), "🔊 100%");
    }

    #[test]
    fn network_icons_follow_links() {
        let state = BarState::new();
        let widget = network(&state.network);
        assert_eq!(widget.fragment().render(), "");

        state.network.wired_speed.set(1000);
        assert_eq!(widget.fragment().render(), "🖧");

        state.dispatch(&Action::ToggleWifi);
        assert_eq!(widget.fragment().render(), "📶 🖧");

        state.network.wired_speed.set(0);
        state.dispatch(&Action::ToggleWifi);
        assert_eq!(widget.fragment().render(), "");
    }

    #[test]
    fn battery_absent_is_empty() {
        let state = BarState::new();
        let widget = battery(&state.battery);
        assert_eq!(widget.fragment(), Fragment::Empty);

        state.battery.present.set(true);
        state.battery.set_fraction(0.57);
        let fragment = widget.fragment();
        assert_eq!(fragment.render(), "🔋 57%");
        assert!(fragment.has_class("battery"));
    }

    #[test]
    fn tray_rebuilds_buttons_in_order() {
        let state = BarState::new();
        let widget = tray(&state.tray);
        let item = |id: &str| TrayItem {
            id: id.into(),
            icon: "network-wireless-signal-good-symbolic".into(),
            tooltip: id.to_uppercase(),
        };
        state.tray.items.set(vec![item("b"), item("a")]);
        assert_eq!(
            widget.fragment().actions(),
            vec![
                &Action::ActivateTrayItem("b".into()),
                &Action::ActivateTrayItem("a".into())
            ]
        );
        state.tray.items.set(vec![item("a")]);
        assert_eq!(widget.fragment().actions().len(), 1);
    }

    #[test]
    fn idle_tooltip_flips() {
        let state = BarState::new();
        let widget = idle_inhibitor(&state.ui);
        assert_eq!(widget.fragment().tooltip_text(), Some("Sleep: Enabled"));
        state.dispatch(&Action::ToggleIdleInhibit);
        assert_eq!(widget.fragment().tooltip_text(), Some("Sleep: Disabled"));
        assert_eq!(widget.fragment().render(), "☀");
    }
}
