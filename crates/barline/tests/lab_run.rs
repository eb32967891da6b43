//! End-to-end runs of the binary's entry point on a lab clock.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use barline::cli::Cli;
use clap::Parser;

fn write_config(dir: &Path, simulate: bool) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    let cache = dir.join("weather.json");
    std::fs::write(
        &cache,
        r#"{"current_condition":[{"temp_F":"81","weatherDesc":[{"value":"Sunny"}]}]}"#,
    )
    .unwrap();
    let config = format!(
        r#"
log_filter = "warn"

[weather]
cache = "{cache}"
city_file = "{city}"

[gpu]
command = ["barline-test-no-gpu"]

[simulation]
enabled = {simulate}
"#,
        cache = cache.display(),
        city = dir.join("city").display(),
    );
    std::fs::write(&path, config).unwrap();
    path
}

fn run(args: &[&str]) -> String {
    let cli = Cli::try_parse_from(args).unwrap();
    let out = Rc::new(RefCell::new(Vec::<u8>::new()));
    barline::run(cli, Rc::clone(&out)).unwrap();
    let bytes = out.borrow().clone();
    String::from_utf8(bytes).unwrap()
}

#[test]
fn once_prints_a_single_bar() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), true);
    let text = run(&["barline", "--config", config.to_str().unwrap(), "--lab", "--once"]);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1, "{text}");
    assert!(lines[0].contains("09:00 AM Sat Mar 09"));
    assert!(lines[0].contains("☀ 81°F"));
    assert!(lines[0].contains("Weightless - Marconi Union"));
}

#[test]
fn lab_run_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), true);
    let args = [
        "barline",
        "--config",
        config.to_str().unwrap(),
        "--lab",
        "--run-for",
        "30",
    ];
    let first = run(&args);
    let second = run(&args);
    assert!(first.lines().count() > 10, "{first}");
    let last = first.lines().last().unwrap();
    assert!(last.contains("09:00 AM"), "{last}");

    // Sensor readouts come from the host, so compare the left and center
    // sections only, one entry per distinct state.
    let timeline = |text: &str| -> Vec<String> {
        let mut states: Vec<String> = text
            .lines()
            .map(|line| line.split(" | ").take(2).collect::<Vec<_>>().join(" | "))
            .collect();
        states.dedup();
        states
    };
    assert_eq!(timeline(&first), timeline(&second));
    assert!(timeline(&first).len() > 5);
}

#[test]
fn clicks_apply_before_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), false);
    let text = run(&[
        "barline",
        "--config",
        config.to_str().unwrap(),
        "--lab",
        "--once",
        "--click",
        "toggle-control-center",
        "--click",
        "toggle-wifi",
    ]);
    let (bar, popup) = text.trim_end().split_once('\n').unwrap();
    assert!(!bar.is_empty());
    assert!(popup.starts_with("Quick Settings"));
    assert!(popup.contains("WiFi Disconnected"));
}

#[test]
fn json_mode_emits_fragment_trees() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), true);
    let text = run(&[
        "barline",
        "--config",
        config.to_str().unwrap(),
        "--lab",
        "--once",
        "--json",
    ]);
    let tree: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
    let sections = tree["children"].as_array().unwrap();
    assert_eq!(sections.len(), 4);
    assert_eq!(sections[3]["visible"], false);
}

#[test]
fn print_config_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), false);
    let text = run(&[
        "barline",
        "--config",
        config.to_str().unwrap(),
        "--print-config",
    ]);
    let parsed = barline::config::BarConfig::from_toml(&text).unwrap();
    assert!(!parsed.simulation.enabled);
    assert_eq!(parsed.gpu.command, vec!["barline-test-no-gpu".to_string()]);
}

#[test]
fn bad_config_exits_with_usage_code() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[intervals]\nclock = 0\n").unwrap();
    let cli = Cli::try_parse_from(["barline", "--config", path.to_str().unwrap(), "--once"])
        .unwrap();
    let out = Rc::new(RefCell::new(Vec::<u8>::new()));
    let err = barline::run(cli, out).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("intervals.clock"));
}
