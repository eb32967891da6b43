//! Static buttons that launch external commands or toggle the popup.

use crate::action::{Action, LaunchTarget};
use crate::fragment::Fragment;

use super::Widget;

fn icon_button(icon: &str, class: &str, tooltip: &str, action: Action) -> Widget {
    Widget::fixed(
        Fragment::button(Fragment::icon(icon), Some(action))
            .class(class)
            .tooltip(tooltip),
    )
}

#[must_use]
pub fn launcher() -> Widget {
    icon_button(
        "view-app-grid-symbolic",
        "app-launcher",
        "Applications",
        Action::Launch(LaunchTarget::AppLauncher),
    )
}

#[must_use]
pub fn wallpaper() -> Widget {
    icon_button(
        "preferences-desktop-wallpaper-symbolic",
        "wallpaper-button",
        "Change Wallpaper",
        Action::Launch(LaunchTarget::Wallpaper),
    )
}

#[must_use]
pub fn notifications() -> Widget {
    icon_button(
        "preferences-system-notifications-symbolic",
        "notifications-button",
        "Notifications",
        Action::Launch(LaunchTarget::Notifications),
    )
}

#[must_use]
pub fn power() -> Widget {
    icon_button(
        "system-shutdown-symbolic",
        "power-button",
        "Power Menu",
        Action::Launch(LaunchTarget::PowerMenu),
    )
}

#[must_use]
pub fn control_center_toggle() -> Widget {
    icon_button(
        "preferences-system-symbolic",
        "control-center-btn",
        "Control Center",
        Action::ToggleControlCenter,
    )
}
