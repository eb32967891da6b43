//! What a button does when clicked.
//!
//! Actions are data so fragments stay comparable. [`BarState::dispatch`]
//! applies the ones that only touch bar state; [`Action::Launch`] names an
//! external command looked up in the config.
//!
//! [`BarState::dispatch`]: crate::state::BarState::dispatch

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "action", content = "arg", rename_all = "snake_case")]
pub enum Action {
    FocusWorkspace(i32),
    ToggleMediaControls,
    MediaPrevious,
    MediaPlayPause,
    MediaNext,
    MediaToggleShuffle,
    ToggleIdleInhibit,
    ToggleControlCenter,
    ToggleWifi,
    ActivateTrayItem(String),
    Launch(LaunchTarget),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchTarget {
    AppLauncher,
    Notifications,
    PowerMenu,
    WeatherDetails,
    Wallpaper,
    Bluetooth,
}

impl LaunchTarget {
    /// The configured shell command for this target.
    #[must_use]
    pub fn command<'a>(&self, commands: &'a crate::config::Commands) -> &'a str {
        match self {
            Self::AppLauncher => &commands.launcher,
            Self::Notifications => &commands.notifications,
            Self::PowerMenu => &commands.power,
            Self::WeatherDetails => &commands.weather,
            Self::Wallpaper => &commands.wallpaper,
            Self::Bluetooth => &commands.bluetooth,
        }
    }
}
