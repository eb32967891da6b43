//! Wires config, state, event loop and bar together.

use std::cell::RefCell;
use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::rc::Rc;

use barline_core::{Duration, LabClock};
use barline_runtime::{EventLoop, Subscription, TracingSink};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::action::Action;
use crate::config::BarConfig;
use crate::error::Result;
use crate::fragment::Fragment;
use crate::simulate::Simulator;
use crate::state::BarState;
use crate::wall::{LabWallClock, SystemClock, WallClock};
use crate::widgets::WidgetEnv;
use crate::widgets::bar::{Bar, render_bar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One text line per change; a visible popup adds a second line.
    #[default]
    Text,
    /// One JSON fragment tree per line.
    Json,
}

impl OutputFormat {
    pub fn format(self, bar: &Fragment) -> Result<String> {
        match self {
            Self::Text => Ok(render_bar(bar)),
            Self::Json => Ok(serde_json::to_string(bar)?),
        }
    }
}

/// Wall-clock start of a lab run: a fixed Saturday morning.
#[must_use]
pub fn lab_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 9)
        .and_then(|day| day.and_hms_opt(9, 0, 0))
        .unwrap_or_default()
}

pub struct App {
    config: Rc<BarConfig>,
    event_loop: EventLoop,
    state: BarState,
    bar: Bar,
    simulator: Option<Simulator>,
    outputs: Vec<Subscription>,
    launched: RefCell<Vec<Child>>,
}

impl App {
    /// App on the real clock and local time.
    #[must_use]
    pub fn new(config: BarConfig) -> Self {
        Self::build(config, EventLoop::new(TracingSink), Rc::new(SystemClock))
    }

    /// App driven by `clock`, starting at [`lab_start`]. Runs finish as fast
    /// as the widgets can update.
    #[must_use]
    pub fn lab(config: BarConfig, clock: &LabClock) -> Self {
        let wall = LabWallClock::new(lab_start(), clock.clone());
        Self::build(config, EventLoop::lab(clock, TracingSink), Rc::new(wall))
    }

    fn build(config: BarConfig, event_loop: EventLoop, wall: Rc<dyn WallClock>) -> Self {
        let config = Rc::new(config);
        let state = BarState::new();
        let simulator = config.simulation.enabled.then(|| {
            Simulator::seed(&state);
            Simulator::start(&event_loop, &state)
        });
        let env = WidgetEnv::new(event_loop.clone(), wall, Rc::clone(&config));
        let bar = Bar::build(&env, &state);
        info!(
            widgets = bar.widget_count(),
            timers = event_loop.timer_count(),
            lab = event_loop.is_lab(),
            simulated = simulator.is_some(),
            "bar ready"
        );
        Self {
            config,
            event_loop,
            state,
            bar,
            simulator,
            outputs: Vec::new(),
            launched: RefCell::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn state(&self) -> &BarState {
        &self.state
    }

    #[must_use]
    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    #[must_use]
    pub fn bar(&self) -> &Bar {
        &self.bar
    }

    #[must_use]
    pub fn is_simulated(&self) -> bool {
        self.simulator.is_some()
    }

    #[must_use]
    pub fn render(&self) -> String {
        self.bar.render()
    }

    /// Write the current bar to `out`, then again after every change. A
    /// failed write shuts the loop down.
    pub fn attach_output<W: Write + 'static>(
        &mut self,
        out: Rc<RefCell<W>>,
        format: OutputFormat,
    ) -> Result<()> {
        write_line(&mut *out.borrow_mut(), &format.format(&self.bar.fragment())?)?;
        let event_loop = self.event_loop.clone();
        let sub = self.bar.subscribe(move |fragment| {
            let written = format.format(fragment).and_then(|line| {
                write_line(&mut *out.borrow_mut(), &line).map_err(Into::into)
            });
            if let Err(err) = written {
                warn!(%err, "output failed, stopping");
                event_loop.shutdown();
            }
        });
        self.outputs.push(sub);
        Ok(())
    }

    /// Handle a click on a button carrying `action`. Returns whether anything
    /// happened.
    pub fn click(&self, action: &Action) -> bool {
        if self.state.dispatch(action) {
            return true;
        }
        match action {
            Action::Launch(target) => self.launch(target.command(&self.config.commands)),
            Action::ActivateTrayItem(id) => {
                info!(item = %id, "tray item activated");
                true
            }
            _ => false,
        }
    }

    fn launch(&self, command: &str) -> bool {
        self.reap();
        if command.trim().is_empty() {
            debug!("no command configured");
            return false;
        }
        let spawned = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(child) => {
                info!(command, pid = child.id(), "launched");
                self.launched.borrow_mut().push(child);
                true
            }
            Err(err) => {
                warn!(command, %err, "launch failed");
                false
            }
        }
    }

    fn reap(&self) {
        self.launched
            .borrow_mut()
            .retain_mut(|child| matches!(child.try_wait(), Ok(None)));
    }

    /// Run for `duration` of loop time. Returns the number of timer ticks.
    pub fn run_for(&self, duration: Duration) -> usize {
        self.event_loop.run_for(duration)
    }

    /// Run until [`shutdown`](Self::shutdown).
    pub fn run(&self) -> usize {
        self.event_loop.run(&self.event_loop.context())
    }

    pub fn shutdown(&self) {
        self.event_loop.shutdown();
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("bar", &self.bar)
            .field("simulated", &self.simulator.is_some())
            .field("outputs", &self.outputs.len())
            .finish_non_exhaustive()
    }
}

fn write_line(out: &mut dyn Write, line: &str) -> std::io::Result<()> {
    writeln!(out, "{line}")?;
    out.flush()
}
