//! Now-playing button with expandable transport controls.

use barline_runtime::{Binding, BindingScope};

use crate::action::Action;
use crate::fragment::Fragment;
use crate::state::{BarState, PlaybackStatus, Player, Track};

use super::{Widget, truncate};

const TRACK_MAX: usize = 40;

fn status_icon(status: PlaybackStatus) -> &'static str {
    match status {
        PlaybackStatus::Playing => "media-playback-pause-symbolic",
        PlaybackStatus::Paused | PlaybackStatus::Stopped => "media-playback-start-symbolic",
    }
}

fn control(tooltip: &str, icon: &str, action: Action) -> Fragment {
    Fragment::button(Fragment::icon(icon), Some(action))
        .class("media-control-btn")
        .tooltip(tooltip)
}

/// Fragment for the first player. No player renders an empty row.
#[must_use]
pub fn media_fragment(players: &[Player], expanded: bool) -> Fragment {
    let Some(player) = players.first() else {
        return Fragment::row(Vec::new()).class("media");
    };
    let display = player.current().map(Track::display).unwrap_or_default();
    let icon = status_icon(player.status);
    let main = Fragment::button(
        Fragment::row(vec![
            Fragment::icon(icon),
            Fragment::label(truncate(&display, TRACK_MAX)).class("media-title"),
        ]),
        Some(Action::ToggleMediaControls),
    )
    .class("media-button")
    .tooltip(display);
    let controls = Fragment::row(vec![
        control("Previous", "media-skip-backward-symbolic", Action::MediaPrevious),
        control("Play/Pause", icon, Action::MediaPlayPause),
        control("Next", "media-skip-forward-symbolic", Action::MediaNext),
        control("Shuffle", "media-playlist-shuffle-symbolic", Action::MediaToggleShuffle),
    ])
    .class("media-controls")
    .visible(expanded);
    Fragment::row(vec![main, controls]).class("media")
}

/// Media widget. The expanded flag lives in [`UiState`](crate::state::UiState),
/// outside the rebuilt fragment, so it survives player and track changes.
#[must_use]
pub fn media(state: &BarState) -> Widget {
    let root = Binding::from2(
        &state.media.players,
        &state.ui.media_expanded,
        |players: &Vec<Player>, expanded: &bool| media_fragment(players, *expanded),
    );
    Widget::new(root, BindingScope::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str, title: &str, artist: Option<&str>) -> Player {
        Player::new(name, vec![Track::new(title, artist), Track::new("B-side", None)])
    }

    #[test]
    fn no_player_renders_nothing() {
        let fragment = media_fragment(&[], true);
        assert_eq!(fragment.render(), "");
        assert!(fragment.actions().is_empty());
    }

    #[test]
    fn title_is_truncated_and_tooltip_is_full() {
        let long = "a".repeat(60);
        let fragment = media_fragment(&[player("spot", &long, Some("Band"))], false);
        let button = fragment.find_by_class("media-button");
        assert_eq!(button[0].tooltip_text(), Some(format!("{long} - Band").as_str()));
        let title = fragment.find_by_class("media-title");
        assert_eq!(title[0].render().chars().count(), TRACK_MAX);
    }

    #[test]
    fn controls_follow_expanded_flag() {
        let state = BarState::new();
        state.media.players.set(vec![player("spot", "Song", Some("Artist"))]);
        let widget = media(&state);
        assert!(widget.fragment().find_by_class("media-controls").is_empty());

        state.dispatch(&Action::ToggleMediaControls);
        let fragment = widget.fragment();
        assert_eq!(fragment.find_by_class("media-controls").len(), 1);
        assert_eq!(fragment.actions().len(), 5);

        state.dispatch(&Action::MediaPlayPause);
        assert!(state.ui.media_expanded.get(), "same player keeps controls open");
        assert!(widget.fragment().render().starts_with('⏸'));
    }

    #[test]
    fn controls_survive_player_changes() {
        let state = BarState::new();
        state.media.players.set(vec![player("spot", "Song", None)]);
        let widget = media(&state);
        state.dispatch(&Action::ToggleMediaControls);

        state.media.players.set(vec![player("mpv", "Clip", None)]);
        assert!(state.ui.media_expanded.get());
        let fragment = widget.fragment();
        assert!(fragment.render().starts_with("▶ Clip"));
        let buttons = fragment.find_by_class("media-control-btn");
        assert_eq!(buttons.len(), 4);

        state.media.players.set(Vec::new());
        assert_eq!(widget.fragment().render(), "");
        state.media.players.set(vec![player("spot", "Song", None)]);
        assert_eq!(widget.fragment().find_by_class("media-controls").len(), 1);
    }
}
