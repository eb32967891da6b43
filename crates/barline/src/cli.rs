use std::cell::RefCell;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

use barline_core::{Duration, LabClock};
use clap::Parser;
use tracing::info;

use crate::action::{Action, LaunchTarget};
use crate::app::{App, OutputFormat};
use crate::config::BarConfig;
use crate::error::{BarError, Result};
use crate::logging::init_tracing;

const LAB_RUN: Duration = Duration::from_secs(60);

#[derive(Debug, Parser)]
#[command(
    name = "barline",
    about = "Reactive status bar that prints itself to stdout",
    version
)]
pub struct Cli {
    /// Config file. Defaults to $XDG_CONFIG_HOME/barline/config.toml.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Stop after this many seconds of loop time.
    #[arg(long = "run-for", value_name = "SECS", conflicts_with = "once")]
    pub run_for: Option<u64>,

    /// Print the bar once and exit.
    #[arg(long)]
    pub once: bool,

    /// Run on a lab clock starting at a fixed time. Runs finish immediately
    /// and default to 60 seconds of loop time.
    #[arg(long)]
    pub lab: bool,

    /// Print JSON fragment trees instead of text.
    #[arg(long)]
    pub json: bool,

    /// Leave state empty instead of running the service simulator.
    #[arg(long = "no-simulate")]
    pub no_simulate: bool,

    /// Apply a click before printing, e.g. `toggle-control-center` or
    /// `focus-workspace:3`. Repeatable.
    #[arg(long = "click", value_name = "ACTION")]
    pub clicks: Vec<String>,

    /// Print the effective config as TOML and exit.
    #[arg(long = "print-config")]
    pub print_config: bool,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    let stdout = Rc::new(RefCell::new(std::io::stdout()));
    run(cli, stdout)
}

pub fn run<W: Write + 'static>(cli: Cli, out: Rc<RefCell<W>>) -> Result<()> {
    let mut config = BarConfig::load(cli.config.as_deref())?;
    if cli.no_simulate {
        config.simulation.enabled = false;
    }
    if cli.print_config {
        write!(out.borrow_mut(), "{}", config.to_toml()?)?;
        return Ok(());
    }
    init_tracing(&config.log_filter)?;

    let actions = cli
        .clicks
        .iter()
        .map(|raw| parse_action(raw))
        .collect::<Result<Vec<_>>>()?;
    let run_for = match cli.run_for {
        Some(0) => return Err(BarError::exit(2, "--run-for must be at least 1 second")),
        Some(secs) => Some(Duration::from_secs(secs)),
        None if cli.lab => Some(LAB_RUN),
        None => None,
    };

    let clock = LabClock::new();
    let mut app = if cli.lab {
        App::lab(config, &clock)
    } else {
        App::new(config)
    };
    for action in &actions {
        if !app.click(action) {
            info!(?action, "click had no effect");
        }
    }

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    app.attach_output(out, format)?;
    if cli.once {
        return Ok(());
    }
    let ticks = match run_for {
        Some(duration) => app.run_for(duration),
        None => app.run(),
    };
    info!(ticks, "stopped");
    Ok(())
}

/// Parse a `--click` argument: a kebab-case action name with an optional
/// `:argument`.
pub fn parse_action(raw: &str) -> Result<Action> {
    let (name, arg) = match raw.split_once(':') {
        Some((name, arg)) => (name, Some(arg)),
        None => (raw, None),
    };
    let action = match (name, arg) {
        ("focus-workspace", Some(id)) => Action::FocusWorkspace(
            id.parse()
                .map_err(|_| BarError::exit(2, format!("bad workspace id in {raw:?}")))?,
        ),
        ("toggle-media-controls", None) => Action::ToggleMediaControls,
        ("media-previous", None) => Action::MediaPrevious,
        ("media-play-pause", None) => Action::MediaPlayPause,
        ("media-next", None) => Action::MediaNext,
        ("media-shuffle", None) => Action::MediaToggleShuffle,
        ("toggle-idle-inhibit", None) => Action::ToggleIdleInhibit,
        ("toggle-control-center", None) => Action::ToggleControlCenter,
        ("toggle-wifi", None) => Action::ToggleWifi,
        ("tray", Some(id)) if !id.is_empty() => Action::ActivateTrayItem(id.to_string()),
        ("launch", Some(target)) => Action::Launch(parse_target(target).ok_or_else(|| {
            BarError::exit(2, format!("unknown launch target in {raw:?}"))
        })?),
        _ => return Err(BarError::exit(2, format!("unknown action {raw:?}"))),
    };
    Ok(action)
}

fn parse_target(name: &str) -> Option<LaunchTarget> {
    Some(match name {
        "apps" => LaunchTarget::AppLauncher,
        "notifications" => LaunchTarget::Notifications,
        "power" => LaunchTarget::PowerMenu,
        "weather" => LaunchTarget::WeatherDetails,
        "wallpaper" => LaunchTarget::Wallpaper,
        "bluetooth" => LaunchTarget::Bluetooth,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let cli = Cli::parse_from([
            "barline",
            "--lab",
            "--run-for",
            "30",
            "--click",
            "toggle-wifi",
            "--click",
            "focus-workspace:2",
        ]);
        assert!(cli.lab);
        assert_eq!(cli.run_for, Some(30));
        assert_eq!(cli.clicks.len(), 2);
    }

    #[test]
    fn once_conflicts_with_run_for() {
        let parsed = Cli::try_parse_from(["barline", "--once", "--run-for", "3"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn action_names() {
        assert_eq!(
            parse_action("focus-workspace:3").unwrap(),
            Action::FocusWorkspace(3)
        );
        assert_eq!(
            parse_action("launch:power").unwrap(),
            Action::Launch(LaunchTarget::PowerMenu)
        );
        assert_eq!(
            parse_action("tray:nm-applet").unwrap(),
            Action::ActivateTrayItem("nm-applet".into())
        );
        assert_eq!(parse_action("focus-workspace:x").unwrap_err().exit_code(), 2);
        assert!(parse_action("toggle-wifi:now").is_err());
        assert!(parse_action("launch:rocket").is_err());
        assert!(parse_action("dance").is_err());
    }
}
