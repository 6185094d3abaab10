//! Integration tests for the mapty binary.
//!
//! These tests verify end-to-end behavior including:
//! - Logging running and cycling workouts
//! - Listing, focusing and exporting
//! - Degraded startup without a position
//! - Input validation

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const HOME: &str = "48.8566,2.3522";

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// CLI with isolated config and data directories
fn cli(dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mapty"));
    cmd.env("XDG_CONFIG_HOME", dir.path().join("config"))
        .arg("--data-dir")
        .arg(dir.path().join("data"));
    cmd
}

fn log_run(dir: &TempDir, distance: &str, duration: &str, cadence: &str) -> assert_cmd::assert::Assert {
    cli(dir)
        .args(["--position", HOME, "log", "--at", "48.86,2.35", "--kind", "running"])
        .args(["--distance", distance, "--duration", duration, "--cadence", cadence])
        .assert()
}

fn log_ride(dir: &TempDir, distance: &str, duration: &str, elevation: &str) -> assert_cmd::assert::Assert {
    cli(dir)
        .args(["--position", HOME, "log", "--at", "48.87,2.30", "--kind", "cycling"])
        .args(["--distance", distance, "--duration", duration, "--elevation", elevation])
        .assert()
}

/// Workout ids in creation order, read from the storage index
fn stored_ids(data_dir: &Path) -> Vec<String> {
    let contents = fs::read_to_string(data_dir.join("workouts.json")).expect("Failed to read storage");
    let entries: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&contents).expect("storage is a JSON object");
    let index = entries["mapty:index"].as_str().expect("index is a string");
    serde_json::from_str(index).expect("index is a JSON array")
}

#[test]
fn test_cli_help() {
    let dir = setup_test_dir();
    cli(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Map-based running and cycling log"));
}

#[test]
fn test_log_running_workout() {
    let dir = setup_test_dir();

    log_run(&dir, "5", "30", "150")
        .success()
        .stdout(predicate::str::contains("Running on"))
        .stdout(predicate::str::contains("6.0 min/km"))
        .stdout(predicate::str::contains("150 spm"))
        .stdout(predicate::str::contains("Workout logged"));

    assert_eq!(stored_ids(&dir.path().join("data")).len(), 1);
}

#[test]
fn test_log_cycling_workout() {
    let dir = setup_test_dir();

    log_ride(&dir, "20", "60", "150")
        .success()
        .stdout(predicate::str::contains("Cycling on"))
        .stdout(predicate::str::contains("20.0 km/h"))
        .stdout(predicate::str::contains("150 m"));
}

#[test]
fn test_negative_elevation_allowed() {
    let dir = setup_test_dir();

    log_ride(&dir, "15", "40", "-120")
        .success()
        .stdout(predicate::str::contains("-120 m"));
}

#[test]
fn test_invalid_distance_rejected() {
    let dir = setup_test_dir();

    log_run(&dir, "abc", "30", "150")
        .failure()
        .stderr(predicate::str::contains("distance is not a finite number"));

    // Nothing was written
    assert!(!dir.path().join("data/workouts.json").exists());
}

#[test]
fn test_zero_cadence_rejected() {
    let dir = setup_test_dir();

    log_run(&dir, "5", "30", "0")
        .failure()
        .stderr(predicate::str::contains("cadence must be greater than zero"));
}

#[test]
fn test_log_requires_position() {
    let dir = setup_test_dir();

    cli(&dir)
        .args(["log", "--at", "48.86,2.35", "--distance", "5", "--duration", "30", "--cadence", "150"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Map unavailable"));
}

#[test]
fn test_list_newest_first() {
    let dir = setup_test_dir();
    log_run(&dir, "5", "30", "150").success();
    log_ride(&dir, "20", "60", "150").success();

    let output = cli(&dir)
        .args(["--position", HOME, "list"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8_lossy(&output);

    let ride = stdout.find("Cycling on").expect("cycling listed");
    let run = stdout.find("Running on").expect("running listed");
    assert!(ride < run, "newest workout should be listed first:\n{}", stdout);

    // One marker per workout
    assert_eq!(stdout.matches("📍").count(), 2);
}

#[test]
fn test_list_without_position_still_lists() {
    let dir = setup_test_dir();
    log_run(&dir, "5", "30", "150").success();

    cli(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Running on"))
        .stdout(predicate::str::contains("📍").not())
        .stderr(predicate::str::contains("Map unavailable"));
}

#[test]
fn test_list_empty() {
    let dir = setup_test_dir();

    cli(&dir)
        .args(["--position", HOME, "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No workouts logged yet"));
}

#[test]
fn test_show_recenters_map() {
    let dir = setup_test_dir();
    log_ride(&dir, "20", "60", "150").success();
    let id = stored_ids(&dir.path().join("data")).remove(0);

    cli(&dir)
        .args(["--position", HOME, "show", id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Map centred on 48.87000,2.30000 (zoom 13, 1.4s pan)"));
}

#[test]
fn test_show_unknown_id_fails() {
    let dir = setup_test_dir();
    log_run(&dir, "5", "30", "150").success();

    cli(&dir)
        .args(["--position", HOME, "show", "no-such-workout"])
        .assert()
        .failure();
}

#[test]
fn test_export_csv() {
    let dir = setup_test_dir();
    log_run(&dir, "5", "30", "150").success();
    log_ride(&dir, "20", "60", "150").success();

    let csv_path = dir.path().join("export/workouts.csv");
    cli(&dir)
        .arg("export")
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 workouts"));

    let csv_content = fs::read_to_string(&csv_path).expect("Failed to read CSV");
    let lines: Vec<_> = csv_content.lines().collect();
    assert!(lines[0].starts_with("id,kind,created_at"));
    assert!(lines[1].contains(",running,"));
    assert!(lines[2].contains(",cycling,"));
}

#[test]
fn test_restore_order_across_runs() {
    let dir = setup_test_dir();
    for distance in ["3", "7", "1", "9"] {
        log_run(&dir, distance, "30", "160").success();
    }

    let ids = stored_ids(&dir.path().join("data"));
    assert_eq!(ids.len(), 4);

    let csv_path = dir.path().join("order.csv");
    cli(&dir).arg("export").arg(&csv_path).assert().success();

    let exported: Vec<String> = fs::read_to_string(&csv_path)
        .unwrap()
        .lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap().to_string())
        .collect();
    assert_eq!(exported, ids);
}

#[test]
fn test_config_from_file() {
    let dir = setup_test_dir();
    let config_path = dir.path().join("custom.toml");
    fs::write(
        &config_path,
        "[map]\nzoom = 16\npan_duration_secs = 0.5\n\n[geolocation.home]\nlat = 48.8566\nlng = 2.3522\n",
    )
    .unwrap();

    cli(&dir)
        .arg("--config")
        .arg(&config_path)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("zoom = 16"));

    // Home position from config replaces --position
    cli(&dir)
        .arg("--config")
        .arg(&config_path)
        .args(["log", "--at", "48.86,2.35", "--distance", "5", "--duration", "30", "--cadence", "150"])
        .assert()
        .success();

    let id = stored_ids(&dir.path().join("data")).remove(0);
    cli(&dir)
        .arg("--config")
        .arg(&config_path)
        .args(["show", id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("(zoom 16, 0.5s pan)"));
}

#[test]
fn test_default_config_printed() {
    let dir = setup_test_dir();

    cli(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("zoom = 13"))
        .stdout(predicate::str::contains("attempts = 3"));
}

#[test]
fn test_verbose_map_startup_names_tile_attribution() {
    let dir = setup_test_dir();

    cli(&dir)
        .env_remove("RUST_LOG")
        .args(["-v", "--position", HOME, "list"])
        .assert()
        .success()
        .stderr(predicate::str::contains("OpenStreetMap contributors"));
}
