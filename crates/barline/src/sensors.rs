//! System readings used as poll producers.
//!
//! Each reader parses a kernel text interface and returns a
//! [`ProducerError`] on anything unexpected; the poll boundary reports it and
//! the widget keeps its last good value.

use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, Stdio};

use barline_core::Duration;
use barline_runtime::ProducerError;
use tracing::warn;
use wait_timeout::ChildExt;

/// Aggregate CPU jiffies from the first line of `/proc/stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuSample {
    pub idle: u64,
    pub total: u64,
}

impl CpuSample {
    pub fn parse(stat: &str) -> Result<Self, ProducerError> {
        let line = stat
            .lines()
            .find(|line| line.starts_with("cpu "))
            .ok_or_else(|| ProducerError::parse("cpu line", truncate_input(stat)))?;
        let fields = line
            .split_whitespace()
            .skip(1)
            .take(8)
            .map(str::parse::<u64>)
            .collect::<Result<Vec<_>, _>>()?;
        if fields.len() < 4 {
            return Err(ProducerError::parse("cpu line", line));
        }
        // user nice system idle iowait irq softirq steal
        let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
        let total = fields.iter().sum();
        Ok(Self { idle, total })
    }

    pub fn read(path: &Path) -> Result<Self, ProducerError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Busy percentage between `self` (earlier) and `next`.
    #[must_use]
    pub fn usage_until(&self, next: &CpuSample) -> f64 {
        let total = next.total.saturating_sub(self.total);
        let idle = next.idle.saturating_sub(self.idle);
        if total == 0 {
            return 0.0;
        }
        (total.saturating_sub(idle)) as f64 / total as f64 * 100.0
    }
}

/// Stateful CPU usage producer: each call compares against the previous
/// sample. The first call measures since boot.
#[derive(Debug, Default)]
pub struct CpuMeter {
    previous: CpuSample,
}

impl CpuMeter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&mut self, stat: &str) -> Result<f64, ProducerError> {
        let next = CpuSample::parse(stat)?;
        let usage = self.previous.usage_until(&next);
        self.previous = next;
        Ok(usage)
    }
}

/// Used memory percentage: `(MemTotal - MemAvailable) / MemTotal * 100`.
pub fn memory_usage(meminfo: &str) -> Result<f64, ProducerError> {
    let field = |name: &'static str| -> Result<u64, ProducerError> {
        let line = meminfo
            .lines()
            .find(|line| line.starts_with(name))
            .ok_or_else(|| ProducerError::parse(name, truncate_input(meminfo)))?;
        let value = line
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| ProducerError::parse(name, line))?;
        Ok(value.parse::<u64>()?)
    };
    let total = field("MemTotal:")?;
    let available = field("MemAvailable:")?;
    if total == 0 {
        return Err(ProducerError::parse("MemTotal:", "0"));
    }
    Ok(total.saturating_sub(available) as f64 / total as f64 * 100.0)
}

/// Degrees Celsius from a millidegree thermal-zone reading, rounded.
pub fn temperature_celsius(raw: &str) -> Result<i64, ProducerError> {
    let millis: i64 = raw.trim().parse()?;
    Ok((millis as f64 / 1000.0).round() as i64)
}

/// GPU utilization percentage from a bare integer line, as printed by
/// `nvidia-smi --format=csv,noheader,nounits`. Multi-GPU output uses the first.
pub fn gpu_utilization(output: &str) -> Result<u32, ProducerError> {
    let first = output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| ProducerError::unavailable("empty GPU utilization output"))?;
    Ok(first.parse()?)
}

/// Run `command` and return its stdout. A command still running after
/// `limit` is killed and reported as unavailable.
pub fn run_command(command: &[String], limit: Duration) -> Result<String, ProducerError> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| ProducerError::unavailable("no command configured"))?;
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;
    let Some(status) = child.wait_timeout(limit)? else {
        warn!(program, ?limit, "command timed out, killing it");
        child.kill()?;
        let _ = child.wait();
        return Err(ProducerError::unavailable(format!(
            "{program} still running after {limit:?}"
        )));
    };
    if !status.success() {
        return Err(ProducerError::unavailable(format!(
            "{program} exited with {status}"
        )));
    }
    let mut stdout = String::new();
    if let Some(mut pipe) = child.stdout.take() {
        pipe.read_to_string(&mut stdout)?;
    }
    Ok(stdout)
}

/// Whether `err` means the sensor does not exist at all, as opposed to a
/// transient read failure.
#[must_use]
pub fn is_missing(err: &ProducerError) -> bool {
    matches!(err, ProducerError::Io(source) if source.kind() == io::ErrorKind::NotFound)
}

fn truncate_input(input: &str) -> String {
    input.chars().take(64).collect()
}
