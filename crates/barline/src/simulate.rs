//! Stand-in services for running the bar without a compositor, media
//! players or NetworkManager.
//!
//! [`Simulator::seed`] fills every state container with plausible values and
//! [`Simulator::start`] schedules timers that keep changing them. All changes
//! are deterministic, so a lab run always prints the same bar.

use std::cell::Cell;

use barline_core::Duration;
use barline_runtime::{EventLoop, TimerHandle};
use tracing::debug;

use crate::state::{BarState, Client, Player, PlaybackStatus, Track, TrayItem, Workspace};

const WORKSPACE_EVERY: Duration = Duration::from_secs(3);
const PLAY_PAUSE_EVERY: Duration = Duration::from_secs(5);
const NEXT_TRACK_EVERY: Duration = Duration::from_secs(17);
const VOLUME_EVERY: Duration = Duration::from_secs(2);
const WIRED_EVERY: Duration = Duration::from_secs(7);
const BATTERY_EVERY: Duration = Duration::from_secs(60);

const VOLUME_STEP: f64 = 0.05;
const VOLUME_LOW: f64 = 0.2;
const VOLUME_HIGH: f64 = 0.9;

const TITLES: &[(&str, &str)] = &[
    ("Terminal", "kitty"),
    ("barline/src/app.rs", "code"),
    ("Release notes", "firefox"),
    ("Music", "spotify"),
    ("Files", "nautilus"),
];

/// Owns the simulation timers; dropping it freezes the state where it is.
#[derive(Debug)]
pub struct Simulator {
    timers: Vec<TimerHandle>,
}

impl Simulator {
    /// Initial values for every container.
    pub fn seed(state: &BarState) {
        let mut workspaces: Vec<Workspace> = (1..=5).map(Workspace::new).collect();
        workspaces.push(Workspace {
            id: -98,
            name: "special:scratch".into(),
        });
        state.compositor.workspaces.set(workspaces);
        state.compositor.focused_workspace.set(Some(1));
        state.compositor.focused_client.set(Some(client(0)));

        let mut player = Player::new(
            "spotify",
            vec![
                Track::new("Weightless", Some("Marconi Union")),
                Track::new("Intro", Some("The xx")),
                Track::new("An Ending (Ascent)", Some("Brian Eno")),
            ],
        );
        player.status = PlaybackStatus::Playing;
        state.media.players.set(vec![player]);

        state.audio.set_volume(0.55);

        state.network.wifi_enabled.set(true);
        state.network.ssid.set(Some("barline-net".into()));
        state
            .network
            .wifi_icon
            .set("network-wireless-signal-good-symbolic".into());

        state.battery.present.set(true);
        state.battery.set_fraction(0.82);

        state.tray.items.set(vec![
            TrayItem {
                id: "nm-applet".into(),
                icon: "network-wireless-signal-good-symbolic".into(),
                tooltip: "Network".into(),
            },
            TrayItem {
                id: "blueman".into(),
                icon: "bluetooth-symbolic".into(),
                tooltip: "Bluetooth".into(),
            },
        ]);
        debug!("simulated state seeded");
    }

    /// Keep the state moving on `event_loop`.
    #[must_use]
    pub fn start(event_loop: &EventLoop, state: &BarState) -> Self {
        let mut timers = Vec::new();

        let compositor = state.compositor.clone();
        let turn = Cell::new(0_usize);
        timers.push(event_loop.schedule_every(WORKSPACE_EVERY, move |_| {
            let ids: Vec<i32> = compositor.workspaces.with(|list| {
                list.iter().map(|ws| ws.id).filter(|id| *id > 0).collect()
            });
            if ids.is_empty() {
                return;
            }
            let next = turn.get() + 1;
            turn.set(next);
            compositor.focus(ids[next % ids.len()]);
            compositor.focused_client.set(Some(client(next)));
        }));

        let media = state.media.clone();
        timers.push(event_loop.schedule_every(PLAY_PAUSE_EVERY, move |_| media.play_pause()));
        let media = state.media.clone();
        timers.push(event_loop.schedule_every(NEXT_TRACK_EVERY, move |_| media.next()));

        let audio = state.audio.clone();
        let rising = Cell::new(true);
        timers.push(event_loop.schedule_every(VOLUME_EVERY, move |_| {
            let volume = audio.volume.get();
            let next = if rising.get() {
                volume + VOLUME_STEP
            } else {
                volume - VOLUME_STEP
            };
            if next >= VOLUME_HIGH {
                rising.set(false);
            } else if next <= VOLUME_LOW {
                rising.set(true);
            }
            audio.set_volume(next.clamp(VOLUME_LOW, VOLUME_HIGH));
        }));

        let network = state.network.clone();
        timers.push(event_loop.schedule_every(WIRED_EVERY, move |_| {
            let speed = if network.wired_speed.get() > 0 { 0 } else { 1000 };
            network.wired_speed.set(speed);
        }));

        let battery = state.battery.clone();
        timers.push(event_loop.schedule_every(BATTERY_EVERY, move |_| {
            let fraction = battery.fraction.get() - 0.01;
            battery.set_fraction(if fraction < 0.05 { 1.0 } else { fraction });
        }));

        debug!(timers = timers.len(), "simulation started");
        Self { timers }
    }

    /// Number of running simulation timers.
    #[must_use]
    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }
}

fn client(turn: usize) -> Client {
    let (title, class) = TITLES[turn % TITLES.len()];
    Client {
        title: title.to_string(),
        class: class.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barline_core::LabClock;
    use barline_runtime::RecordingSink;

    fn running() -> (EventLoop, BarState, Simulator) {
        let clock = LabClock::new();
        let event_loop = EventLoop::lab(&clock, RecordingSink::new());
        let state = BarState::new();
        Simulator::seed(&state);
        let sim = Simulator::start(&event_loop, &state);
        (event_loop, state, sim)
    }

    #[test]
    fn seed_fills_every_container() {
        let state = BarState::new();
        Simulator::seed(&state);
        assert_eq!(state.compositor.workspaces.with(Vec::len), 6);
        assert_eq!(state.compositor.focused_workspace.get(), Some(1));
        assert_eq!(state.media.players.with(Vec::len), 1);
        assert!(state.battery.present.get());
        assert!(state.network.wifi_enabled.get());
        assert_eq!(state.tray.items.with(Vec::len), 2);
    }

    #[test]
    fn workspaces_cycle_over_normal_ids() {
        let (event_loop, state, _sim) = running();
        let mut seen = Vec::new();
        for _ in 0..5 {
            event_loop.advance(WORKSPACE_EVERY);
            seen.push(state.compositor.focused_workspace.get());
        }
        assert_eq!(seen, vec![Some(2), Some(3), Some(4), Some(5), Some(1)]);
    }

    #[test]
    fn volume_stays_in_band() {
        let (event_loop, state, _sim) = running();
        for _ in 0..100 {
            event_loop.advance(VOLUME_EVERY);
            let v = state.audio.volume.get();
            assert!((VOLUME_LOW..=VOLUME_HIGH).contains(&v), "{v}");
        }
    }

    #[test]
    fn same_schedule_same_state() {
        let (a_loop, a, _a_sim) = running();
        let (b_loop, b, _b_sim) = running();
        a_loop.advance(Duration::from_secs(120));
        b_loop.advance(Duration::from_secs(120));
        assert_eq!(a.media.players.get(), b.media.players.get());
        assert_eq!(a.audio.volume.get(), b.audio.volume.get());
        assert_eq!(a.battery.fraction.get(), b.battery.fraction.get());
    }

    #[test]
    fn dropping_simulator_freezes_state() {
        let (event_loop, state, sim) = running();
        assert_eq!(sim.timer_count(), 6);
        drop(sim);
        let before = state.audio.volume.version();
        event_loop.advance(Duration::from_secs(30));
        assert_eq!(state.audio.volume.version(), before);
        assert_eq!(event_loop.timer_count(), 0);
    }
}
