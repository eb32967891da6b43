//! Current conditions from a cached `wttr.in` `format=j1` response.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use barline_runtime::ProducerError;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherData {
    pub temp: String,
    pub icon: String,
    pub condition: String,
}

impl Default for WeatherData {
    fn default() -> Self {
        Self {
            temp: "--".to_string(),
            icon: "🌡".to_string(),
            condition: "Loading...".to_string(),
        }
    }
}

impl WeatherData {
    /// Bar label: `"{icon} {temp}°F"`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}°F", self.icon, self.temp)
    }
}

#[derive(Deserialize)]
struct Report {
    current_condition: Vec<Condition>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Condition {
    #[serde(rename = "temp_F")]
    temp_f: String,
    weather_desc: Vec<Description>,
}

#[derive(Deserialize)]
struct Description {
    value: String,
}

/// Icon for a condition description. First matching rule wins.
#[must_use]
pub fn condition_icon(condition: &str) -> &'static str {
    if condition.contains("Clear") || condition.contains("Sunny") {
        "☀"
    } else if condition.contains("Partly cloudy") {
        "⛅"
    } else if condition.contains("Cloudy") {
        "☁"
    } else if condition.contains("Rain") {
        "🌧"
    } else {
        "🌡"
    }
}

pub fn parse_report(json: &str) -> Result<WeatherData, ProducerError> {
    let report: Report =
        serde_json::from_str(json).map_err(|err| ProducerError::Other(Box::new(err)))?;
    let current = report
        .current_condition
        .into_iter()
        .next()
        .ok_or_else(|| ProducerError::parse("current_condition", "[]"))?;
    let condition = current
        .weather_desc
        .into_iter()
        .next()
        .map(|d| d.value)
        .ok_or_else(|| ProducerError::parse("weatherDesc", "[]"))?;
    Ok(WeatherData {
        temp: current.temp_f,
        icon: condition_icon(&condition).to_string(),
        condition,
    })
}

/// Poll producer: optionally starts the fetch command refreshing the cache,
/// then parses whatever the cache holds now. The fetch runs in the
/// background; [`fetch_finished`](Self::fetch_finished) tells the widget when
/// to read the cache again.
#[derive(Debug)]
pub struct WeatherSource {
    cache: PathBuf,
    city_file: PathBuf,
    default_city: String,
    fetch: bool,
    fetch_command: Vec<String>,
    in_flight: Option<Child>,
}

impl WeatherSource {
    #[must_use]
    pub fn new(config: &crate::config::WeatherConfig) -> Self {
        Self {
            cache: config.cache.clone(),
            city_file: config.city_file.clone(),
            default_city: config.default_city.clone(),
            fetch: config.fetch,
            fetch_command: config.fetch_command.clone(),
            in_flight: None,
        }
    }

    /// City from the city file, or the default.
    #[must_use]
    pub fn city(&self) -> String {
        std::fs::read_to_string(&self.city_file)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.default_city.clone())
    }

    pub fn poll(&mut self) -> Result<WeatherData, ProducerError> {
        if self.fetch {
            self.start_fetch();
        }
        self.read()
    }

    /// Parse the cache as it is now.
    pub fn read(&self) -> Result<WeatherData, ProducerError> {
        read_cache(&self.cache)
    }

    /// Whether a fetch started by [`poll`](Self::poll) has exited since the
    /// last call. Never blocks.
    pub fn fetch_finished(&mut self) -> bool {
        let Some(child) = self.in_flight.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => false,
            Ok(Some(status)) => {
                debug!(%status, "weather fetch finished");
                self.in_flight = None;
                true
            }
            Err(err) => {
                warn!(%err, "lost track of weather fetch");
                self.in_flight = None;
                true
            }
        }
    }

    fn fetch_args(&self) -> Vec<String> {
        let city = self.city();
        let cache = self.cache.display().to_string();
        self.fetch_command
            .iter()
            .map(|arg| arg.replace("{city}", &city).replace("{cache}", &cache))
            .collect()
    }

    fn start_fetch(&mut self) {
        if let Some(child) = self.in_flight.as_mut() {
            if let Ok(None) = child.try_wait() {
                debug!("weather fetch still running");
                return;
            }
            self.in_flight = None;
        }
        let args = self.fetch_args();
        let Some((program, rest)) = args.split_first() else {
            debug!("no weather fetch command");
            return;
        };
        let spawned = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(child) => {
                debug!(program, pid = child.id(), "weather fetch started");
                self.in_flight = Some(child);
            }
            Err(err) => warn!(program, %err, "could not start weather fetch"),
        }
    }
}

pub fn read_cache(path: &Path) -> Result<WeatherData, ProducerError> {
    parse_report(&std::fs::read_to_string(path)?)
}
