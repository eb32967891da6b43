//! Quick settings popup, shown while the control-center flag is set.

use barline_runtime::{Binding, BindingScope};

use crate::action::{Action, LaunchTarget};
use crate::fragment::Fragment;
use crate::state::BarState;

use super::{Widget, percent};

fn titled(title: &str, sublabel: Fragment) -> Fragment {
    Fragment::row(vec![
        Fragment::label(title).class("control-label"),
        sublabel.class("control-sublabel"),
    ])
}

fn wifi_tile(icon: &str, ssid: Option<&str>) -> Fragment {
    Fragment::button(
        Fragment::row(vec![
            Fragment::icon(icon),
            titled("WiFi", Fragment::label(ssid.unwrap_or("Disconnected"))),
        ]),
        Some(Action::ToggleWifi),
    )
    .class("control-button")
}

fn bluetooth_tile() -> Fragment {
    Fragment::button(
        Fragment::row(vec![
            Fragment::icon("bluetooth-symbolic"),
            titled("Bluetooth", Fragment::label("Toggle")),
        ]),
        Some(Action::Launch(LaunchTarget::Bluetooth)),
    )
    .class("control-button")
}

fn slider(title: &str, icon: &str, level: f64) -> Fragment {
    Fragment::row(vec![
        Fragment::label(title).class("slider-label"),
        Fragment::icon(icon),
        Fragment::label(percent(level)),
    ])
    .class("slider-container")
}

#[must_use]
pub fn control_center(state: &BarState) -> Widget {
    let mut scope = BindingScope::new();
    let wifi = scope.own(Binding::from2(
        &state.network.wifi_icon,
        &state.network.ssid,
        |icon: &String, ssid: &Option<String>| wifi_tile(icon, ssid.as_deref()),
    ));
    let volume = scope.own(Binding::from2(
        &state.audio.volume_icon,
        &state.audio.volume,
        |icon: &String, volume: &f64| slider("Volume", icon, *volume),
    ));
    let brightness = Binding::constant(slider("Brightness", "display-brightness-symbolic", 0.5));
    let bluetooth = Binding::constant(bluetooth_tile());
    let tiles = scope.own(Binding::collect(&[wifi, bluetooth, volume, brightness]));
    let root = Binding::from2(
        &tiles,
        &state.ui.control_center_visible,
        |tiles: &Vec<Fragment>, visible: &bool| {
            let mut children = vec![Fragment::label("Quick Settings").class("control-center-header")];
            children.extend(tiles.iter().cloned());
            Fragment::row(children)
                .class("control-center-content")
                .visible(*visible)
        },
    );
    Widget::new(root, scope)
}
