//! CPU, memory, temperature and GPU readouts.
//!
//! Each readout polls its own producer. A failed read is reported and the
//! readout keeps its previous value. The GPU readout stops polling for good
//! once the GPU tool turns out not to exist.

use std::path::Path;

use barline_runtime::{Binding, BindingScope, Observable, ProducerError};
use tracing::info;

use crate::fragment::Fragment;
use crate::sensors::{
    CpuMeter, gpu_utilization, is_missing, memory_usage, run_command, temperature_celsius,
};

use super::{Widget, WidgetEnv, millis};

fn read(path: &Path) -> Result<String, ProducerError> {
    Ok(std::fs::read_to_string(path)?)
}

fn readout(class: &str, icon: &str, label: String, tooltip: String) -> Fragment {
    Fragment::row(vec![Fragment::icon(icon), Fragment::label(label)])
        .class(class)
        .tooltip(tooltip)
}

#[must_use]
pub fn cpu_fragment(usage: f64) -> Fragment {
    let n = usage.round() as i64;
    readout("cpu", "cpu-symbolic", format!("{n}%"), format!("CPU: {n}%"))
}

#[must_use]
pub fn ram_fragment(usage: f64) -> Fragment {
    let n = usage.round() as i64;
    readout(
        "ram",
        "drive-harddisk-symbolic",
        format!("{n}%"),
        format!("RAM: {n}%"),
    )
}

#[must_use]
pub fn temperature_fragment(celsius: i64) -> Fragment {
    readout(
        "temperature",
        "weather-clear-symbolic",
        format!("{celsius}°C"),
        format!("CPU Temp: {celsius}°C"),
    )
}

/// Hidden while the GPU is idle.
#[must_use]
pub fn gpu_fragment(utilization: u32) -> Fragment {
    readout(
        "gpu",
        "video-display-symbolic",
        format!("{utilization}%"),
        format!("GPU: {utilization}%"),
    )
    .visible(utilization > 0)
}

#[must_use]
pub fn cpu(env: &WidgetEnv) -> Widget {
    let mut scope = BindingScope::new();
    let path = env.config.paths.proc_stat.clone();
    let mut meter = CpuMeter::new();
    let usage = scope.own_observable(Observable::named("cpu", 0.0).polling(
        &env.event_loop,
        millis(env.config.intervals.cpu),
        move || meter.sample(&read(&path)?),
    ));
    let root = Binding::from_source(&usage, |u: &f64| cpu_fragment(*u));
    Widget::new(root, scope)
}

#[must_use]
pub fn ram(env: &WidgetEnv) -> Widget {
    let mut scope = BindingScope::new();
    let path = env.config.paths.meminfo.clone();
    let usage = scope.own_observable(Observable::named("ram", 0.0).polling(
        &env.event_loop,
        millis(env.config.intervals.ram),
        move || memory_usage(&read(&path)?),
    ));
    let root = Binding::from_source(&usage, |u: &f64| ram_fragment(*u));
    Widget::new(root, scope)
}

#[must_use]
pub fn temperature(env: &WidgetEnv) -> Widget {
    let mut scope = BindingScope::new();
    let path = env.config.paths.thermal_zone.clone();
    let celsius = scope.own_observable(Observable::named("temperature", 0).polling(
        &env.event_loop,
        millis(env.config.intervals.temperature),
        move || temperature_celsius(&read(&path)?),
    ));
    let root = Binding::from_source(&celsius, |c: &i64| temperature_fragment(*c));
    Widget::new(root, scope)
}

#[must_use]
pub fn gpu(env: &WidgetEnv) -> Widget {
    let mut scope = BindingScope::new();
    let command = env.config.gpu.command.clone();
    let interval = millis(env.config.intervals.gpu);
    let utilization = scope.own_observable(Observable::named("gpu", 0_u32));
    let this = utilization.clone();
    utilization.start_polling(
        &env.event_loop,
        interval,
        move || {
            let result = run_command(&command, interval).and_then(|out| gpu_utilization(&out));
            if matches!(&result, Err(err) if is_missing(err)) {
                info!("no GPU utilization tool, polling stopped");
                this.stop_polling();
            }
            result
        },
    );
    let root = Binding::from_source(&utilization, |u: &u32| gpu_fragment(*u));
    Widget::new(root, scope)
}
