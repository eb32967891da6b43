//! Observable state the widgets derive from.
//!
//! Each container groups the observables of one system service. They are
//! created once by [`BarState::new`] and passed to widget constructors;
//! nothing here is global.

use barline_runtime::Observable;
use tracing::{debug, info};

use crate::action::Action;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub id: i32,
    pub name: String,
}

impl Workspace {
    #[must_use]
    pub fn new(id: i32) -> Self {
        Self {
            id,
            name: id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub title: String,
    pub class: String,
}

#[derive(Debug, Clone)]
pub struct CompositorState {
    pub workspaces: Observable<Vec<Workspace>>,
    pub focused_workspace: Observable<Option<i32>>,
    pub focused_client: Observable<Option<Client>>,
}

impl CompositorState {
    fn new() -> Self {
        Self {
            workspaces: Observable::named("compositor.workspaces", Vec::new()),
            focused_workspace: Observable::named("compositor.focused_workspace", None),
            focused_client: Observable::named("compositor.focused_client", None),
        }
    }

    /// Focus workspace `id` if it exists.
    pub fn focus(&self, id: i32) -> bool {
        let exists = self.workspaces.with(|list| list.iter().any(|ws| ws.id == id));
        if exists {
            self.focused_workspace.set(Some(id));
        }
        exists
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub artist: Option<String>,
}

impl Track {
    #[must_use]
    pub fn new(title: &str, artist: Option<&str>) -> Self {
        Self {
            title: title.to_string(),
            artist: artist.map(str::to_string),
        }
    }

    /// `title - artist`, or the bare title.
    #[must_use]
    pub fn display(&self) -> String {
        match &self.artist {
            Some(artist) if !artist.is_empty() => format!("{} - {artist}", self.title),
            _ => self.title.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub playlist: Vec<Track>,
    pub position: usize,
    pub status: PlaybackStatus,
    pub shuffle: bool,
}

impl Player {
    #[must_use]
    pub fn new(name: &str, playlist: Vec<Track>) -> Self {
        Self {
            name: name.to_string(),
            playlist,
            position: 0,
            status: PlaybackStatus::Stopped,
            shuffle: false,
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<&Track> {
        self.playlist.get(self.position)
    }

    fn step(&mut self, forward: bool) {
        let len = self.playlist.len();
        if len == 0 {
            return;
        }
        self.position = if forward {
            (self.position + 1) % len
        } else {
            (self.position + len - 1) % len
        };
    }

    fn play_pause(&mut self) {
        self.status = match self.status {
            PlaybackStatus::Playing => PlaybackStatus::Paused,
            PlaybackStatus::Paused | PlaybackStatus::Stopped => PlaybackStatus::Playing,
        };
    }
}

#[derive(Debug, Clone)]
pub struct MediaState {
    pub players: Observable<Vec<Player>>,
}

impl MediaState {
    fn new() -> Self {
        Self {
            players: Observable::named("media.players", Vec::new()),
        }
    }

    /// Apply `f` to the first player, if there is one.
    pub fn with_first_player(&self, f: impl FnOnce(&mut Player)) {
        self.players.update(|players| {
            if let Some(player) = players.first_mut() {
                f(player);
            }
        });
    }

    pub fn next(&self) {
        self.with_first_player(|p| p.step(true));
    }

    pub fn previous(&self) {
        self.with_first_player(|p| p.step(false));
    }

    pub fn play_pause(&self) {
        self.with_first_player(Player::play_pause);
    }

    pub fn toggle_shuffle(&self) {
        self.with_first_player(|p| p.shuffle = !p.shuffle);
    }
}

#[derive(Debug, Clone)]
pub struct AudioState {
    /// Speaker volume in `0.0..=1.0`.
    pub volume: Observable<f64>,
    pub volume_icon: Observable<String>,
}

impl AudioState {
    fn new() -> Self {
        Self {
            volume: Observable::named("audio.volume", 0.0),
            volume_icon: Observable::named("audio.volume_icon", volume_icon(0.0).to_string()),
        }
    }

    /// Set the volume, clamped to `0.0..=1.0`, and its matching icon.
    pub fn set_volume(&self, volume: f64) {
        let volume = volume.clamp(0.0, 1.0);
        self.volume.set(volume);
        self.volume_icon.set(volume_icon(volume).to_string());
    }
}

#[must_use]
pub fn volume_icon(volume: f64) -> &'static str {
    if volume <= 0.0 {
        "audio-volume-muted-symbolic"
    } else if volume < 0.34 {
        "audio-volume-low-symbolic"
    } else if volume < 0.67 {
        "audio-volume-medium-symbolic"
    } else {
        "audio-volume-high-symbolic"
    }
}

#[derive(Debug, Clone)]
pub struct NetworkState {
    pub wifi_enabled: Observable<bool>,
    pub wifi_icon: Observable<String>,
    pub ssid: Observable<Option<String>>,
    /// Wired link speed in Mb/s; zero when unplugged.
    pub wired_speed: Observable<u32>,
    pub wired_icon: Observable<String>,
}

impl NetworkState {
    fn new() -> Self {
        Self {
            wifi_enabled: Observable::named("network.wifi_enabled", false),
            wifi_icon: Observable::named(
                "network.wifi_icon",
                "network-wireless-offline-symbolic".to_string(),
            ),
            ssid: Observable::named("network.ssid", None),
            wired_speed: Observable::named("network.wired_speed", 0),
            wired_icon: Observable::named(
                "network.wired_icon",
                "network-wired-symbolic".to_string(),
            ),
        }
    }

    pub fn toggle_wifi(&self) {
        let enabled = !self.wifi_enabled.get();
        self.wifi_enabled.set(enabled);
        if !enabled {
            self.ssid.set(None);
            self.wifi_icon
                .set("network-wireless-offline-symbolic".to_string());
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatteryState {
    pub present: Observable<bool>,
    /// Charge in `0.0..=1.0`.
    pub fraction: Observable<f64>,
    pub icon: Observable<String>,
}

impl BatteryState {
    fn new() -> Self {
        Self {
            present: Observable::named("battery.present", false),
            fraction: Observable::named("battery.fraction", 0.0),
            icon: Observable::named("battery.icon", "battery-missing-symbolic".to_string()),
        }
    }

    pub fn set_fraction(&self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        self.fraction.set(fraction);
        let level = (fraction * 10.0).round() as u32 * 10;
        self.icon.set(format!("battery-level-{level}-symbolic"));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayItem {
    pub id: String,
    pub icon: String,
    pub tooltip: String,
}

#[derive(Debug, Clone)]
pub struct TrayState {
    pub items: Observable<Vec<TrayItem>>,
}

impl TrayState {
    fn new() -> Self {
        Self {
            items: Observable::named("tray.items", Vec::new()),
        }
    }
}

/// Bar-local toggles.
#[derive(Debug, Clone)]
pub struct UiState {
    pub control_center_visible: Observable<bool>,
    pub idle_inhibited: Observable<bool>,
    pub media_expanded: Observable<bool>,
}

impl UiState {
    fn new() -> Self {
        Self {
            control_center_visible: Observable::named("ui.control_center_visible", false),
            idle_inhibited: Observable::named("ui.idle_inhibited", false),
            media_expanded: Observable::named("ui.media_expanded", false),
        }
    }
}

fn toggle(flag: &Observable<bool>) {
    flag.update(|v| *v = !*v);
}

/// Every state container the bar reads.
#[derive(Debug, Clone)]
pub struct BarState {
    pub compositor: CompositorState,
    pub media: MediaState,
    pub audio: AudioState,
    pub network: NetworkState,
    pub battery: BatteryState,
    pub tray: TrayState,
    pub ui: UiState,
}

impl Default for BarState {
    fn default() -> Self {
        Self::new()
    }
}

impl BarState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            compositor: CompositorState::new(),
            media: MediaState::new(),
            audio: AudioState::new(),
            network: NetworkState::new(),
            battery: BatteryState::new(),
            tray: TrayState::new(),
            ui: UiState::new(),
        }
    }

    /// Apply a state-only action. Returns `false` for actions that need the
    /// outside world ([`Action::Launch`], [`Action::ActivateTrayItem`]) or
    /// that targeted something missing.
    pub fn dispatch(&self, action: &Action) -> bool {
        debug!(?action, "dispatch");
        match action {
            Action::FocusWorkspace(id) => return self.compositor.focus(*id),
            Action::ToggleMediaControls => toggle(&self.ui.media_expanded),
            Action::MediaPrevious => self.media.previous(),
            Action::MediaPlayPause => self.media.play_pause(),
            Action::MediaNext => self.media.next(),
            Action::MediaToggleShuffle => self.media.toggle_shuffle(),
            Action::ToggleIdleInhibit => {
                toggle(&self.ui.idle_inhibited);
                info!(inhibited = self.ui.idle_inhibited.get(), "idle inhibitor toggled");
            }
            Action::ToggleControlCenter => toggle(&self.ui.control_center_visible),
            Action::ToggleWifi => self.network.toggle_wifi(),
            Action::ActivateTrayItem(_) | Action::Launch(_) => return false,
        }
        true
    }
}
