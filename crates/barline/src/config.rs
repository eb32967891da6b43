//! Bar configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) yields the stock
//! bar. Intervals are in milliseconds.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BarError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub intervals: Intervals,
    pub paths: SensorPaths,
    pub weather: WeatherConfig,
    pub gpu: GpuConfig,
    pub commands: Commands,
    pub simulation: Simulation,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            intervals: Intervals::default(),
            paths: SensorPaths::default(),
            weather: WeatherConfig::default(),
            gpu: GpuConfig::default(),
            commands: Commands::default(),
            simulation: Simulation::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Intervals {
    pub clock: u64,
    pub mood: u64,
    pub weather: u64,
    pub cpu: u64,
    pub ram: u64,
    pub temperature: u64,
    pub gpu: u64,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            clock: 1_000,
            mood: 60_000,
            weather: 1_800_000,
            cpu: 2_000,
            ram: 2_000,
            temperature: 5_000,
            gpu: 2_000,
        }
    }
}

impl Intervals {
    fn named(&self) -> [(&'static str, u64); 7] {
        [
            ("clock", self.clock),
            ("mood", self.mood),
            ("weather", self.weather),
            ("cpu", self.cpu),
            ("ram", self.ram),
            ("temperature", self.temperature),
            ("gpu", self.gpu),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorPaths {
    pub proc_stat: PathBuf,
    pub meminfo: PathBuf,
    pub thermal_zone: PathBuf,
}

impl Default for SensorPaths {
    fn default() -> Self {
        Self {
            proc_stat: PathBuf::from("/proc/stat"),
            meminfo: PathBuf::from("/proc/meminfo"),
            thermal_zone: PathBuf::from("/sys/class/thermal/thermal_zone0/temp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// `wttr.in` `format=j1` JSON written by the fetch command.
    pub cache: PathBuf,
    /// File holding the city name; `default_city` when missing or empty.
    pub city_file: PathBuf,
    pub default_city: String,
    /// Run `fetch_command` to refresh the cache on every poll.
    pub fetch: bool,
    /// Program and arguments writing a fresh report to the cache. `{city}`
    /// and `{cache}` are substituted in every argument.
    pub fetch_command: Vec<String>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        let home = home_dir();
        Self {
            cache: home.join(".cache/weather-cache.json"),
            city_file: home.join(".config/weather-config"),
            default_city: "Phoenix".to_string(),
            fetch: false,
            fetch_command: [
                "curl",
                "-s",
                "wttr.in/{city}?format=j1",
                "-o",
                "{cache}",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuConfig {
    /// Program and arguments printing a bare utilization percentage.
    pub command: Vec<String>,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "nvidia-smi".to_string(),
                "--query-gpu=utilization.gpu".to_string(),
                "--format=csv,noheader,nounits".to_string(),
            ],
        }
    }
}

/// Shell commands run by the bar's launcher buttons. Empty disables a button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Commands {
    pub launcher: String,
    pub notifications: String,
    pub power: String,
    pub weather: String,
    pub wallpaper: String,
    pub bluetooth: String,
}

impl Default for Commands {
    fn default() -> Self {
        let home = home_dir();
        let home = home.display();
        Self {
            launcher: format!("{home}/.config/rofi/bin/launcher/launcher.sh"),
            notifications: "swaync-client -t".to_string(),
            power: format!("{home}/.config/rofi/bin/powermenu/powermenu.sh"),
            weather: format!("{home}/.config/hypr/scripts/weather-widget.sh"),
            wallpaper: format!("{home}/.config/hypr/scripts/wallpaper.sh"),
            bluetooth: "bluetoothctl power toggle".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Simulation {
    /// Drive compositor, media, audio and network state from a built-in
    /// simulator instead of leaving it at its initial values.
    pub enabled: bool,
}

impl Default for Simulation {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl BarConfig {
    /// Load from `path`, or from the default location when `None`. A missing
    /// default file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (default_config_path(), false),
        };
        if !explicit && !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| BarError::ConfigRead {
            path: path.clone(),
            source,
        })?;
        let config = Self::parse(&content).map_err(|err| match err {
            ParseFailure::Toml(source) => BarError::ConfigParse {
                path: path.clone(),
                source,
            },
            ParseFailure::Invalid(err) => err,
        })?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Self::parse(content).map_err(|err| match err {
            ParseFailure::Toml(source) => BarError::ConfigParse {
                path: PathBuf::from("<inline>"),
                source,
            },
            ParseFailure::Invalid(err) => err,
        })
    }

    fn parse(content: &str) -> std::result::Result<Self, ParseFailure> {
        let mut config: Self = toml::from_str(content).map_err(ParseFailure::Toml)?;
        config.expand_home();
        config.validate().map_err(ParseFailure::Invalid)?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, ms) in self.intervals.named() {
            if ms == 0 {
                return Err(BarError::invalid(format!(
                    "intervals.{name} must be greater than zero"
                )));
            }
        }
        if self.weather.fetch && self.weather.fetch_command.is_empty() {
            return Err(BarError::invalid(
                "weather.fetch_command must not be empty when weather.fetch is set",
            ));
        }
        if self.log_filter.trim().is_empty() {
            return Err(BarError::invalid("log_filter must not be empty"));
        }
        Ok(())
    }

    fn expand_home(&mut self) {
        for path in [
            &mut self.paths.proc_stat,
            &mut self.paths.meminfo,
            &mut self.paths.thermal_zone,
            &mut self.weather.cache,
            &mut self.weather.city_file,
        ] {
            *path = expand_tilde(path);
        }
    }
}

enum ParseFailure {
    Toml(toml::de::Error),
    Invalid(BarError),
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME").map_or_else(|| PathBuf::from("/"), PathBuf::from)
}

fn default_config_path() -> PathBuf {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .unwrap_or_else(|| home_dir().join(".config"));
    base.join("barline/config.toml")
}

fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home_dir().join(rest),
        Err(_) => path.to_path_buf(),
    }
}
