//! End-to-end runs of the `tagtrail` binary against a fake converter script.
//!
//! Every test gets its own HOME with a config pointing at a scripted
//! converter, a dummy cache artifact, and a history path under the TempDir.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const DAYTONA: &str = r#"[
  {"name": "Backpack", "location": {"latitude": 40.0, "longitude": -73.0}},
  {
    "name": "ERAUBCU LYRIQ",
    "location": {
      "latitude": 29.1872,
      "longitude": -81.0483,
      "horizontalAccuracy": 8.0,
      "timeStamp": 1715000000000
    },
    "address": {"locality": "Daytona Beach", "administrativeArea": "FL"}
  }
]"#;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    home: TempDir,
}

impl Fixture {
    /// Structured mode prints `structured.json`; text mode prints `dump.txt`.
    /// A missing file makes that mode exit 1.
    fn new() -> Self {
        let home = TempDir::new().expect("home");
        let root = home.path();

        let cache = root.join("cache").join("Items.data");
        fs::create_dir_all(cache.parent().expect("cache dir")).expect("mkdir cache");
        fs::write(&cache, b"bplist00").expect("write cache");

        let script = root.join("fake-plutil");
        let body = format!(
            "#!/bin/sh\n\
             if [ \"$1\" = \"-convert\" ]; then f='{json}'; else f='{dump}'; fi\n\
             [ -f \"$f\" ] || exit 1\n\
             cat \"$f\"\n",
            json = root.join("structured.json").display(),
            dump = root.join("dump.txt").display(),
        );
        fs::write(&script, body).expect("write script");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).expect("chmod");

        let config = format!(
            "tracked_name: LYRIQ\n\
             cache_candidates:\n  - {cache}\n\
             history_path: ~/history/location_history.json\n\
             converter: {script}\n",
            cache = cache.display(),
            script = script.display(),
        );
        fs::create_dir_all(root.join(".tagtrail")).expect("mkdir .tagtrail");
        fs::write(root.join(".tagtrail").join("config.yaml"), config).expect("write config");

        Self { home }
    }

    fn path(&self) -> &Path {
        self.home.path()
    }

    fn history_path(&self) -> PathBuf {
        self.path().join("history").join("location_history.json")
    }

    fn serve_json(&self, json: &str) {
        fs::write(self.path().join("structured.json"), json).expect("write json");
    }

    fn serve_dump(&self, dump: &str) {
        fs::write(self.path().join("dump.txt"), dump).expect("write dump");
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tagtrail"));
        cmd.env("HOME", self.path())
            .env("USERPROFILE", self.path())
            .env_remove("RUST_LOG");
        cmd
    }

    fn history_json(&self) -> serde_json::Value {
        let raw = fs::read_to_string(self.history_path()).expect("read history");
        serde_json::from_str(&raw).expect("parse history")
    }
}

// ---------------------------------------------------------------------------
// extract
// ---------------------------------------------------------------------------

#[test]
fn first_run_records_then_second_run_is_unchanged() {
    let fx = Fixture::new();
    fx.serve_json(DAYTONA);

    fx.cmd()
        .arg("extract")
        .assert()
        .success()
        .stdout(contains("Cache format: structured"))
        .stdout(contains("- Backpack: (40, -73)"))
        .stdout(contains("New location recorded"))
        .stdout(contains("Lat: 29.1872"))
        .stdout(contains("Accuracy: 8m"))
        .stdout(contains("Location: Daytona Beach, FL"))
        .stdout(contains("Total locations recorded: 1"));

    fx.cmd()
        .arg("extract")
        .assert()
        .success()
        .stdout(contains("Location unchanged"))
        .stdout(contains("New location recorded").not());

    let history = fx.history_json();
    assert_eq!(history["airtag_name"], "LYRIQ");
    assert_eq!(history["locations"].as_array().map(Vec::len), Some(1));
    assert_eq!(history["locations"][0]["timestamp"], 1715000000.0);
}

#[test]
fn moved_item_appends_entry() {
    let fx = Fixture::new();
    fx.serve_json(DAYTONA);
    fx.cmd().arg("extract").assert().success();

    fx.serve_json(r#"[{"name": "ERAUBCU LYRIQ", "location": {"latitude": 29.2, "longitude": -81.0}}]"#);
    fx.cmd()
        .arg("extract")
        .assert()
        .success()
        .stdout(contains("New location recorded"))
        .stdout(contains("Total locations recorded: 2"));
}

#[test]
fn text_dump_fallback_is_used_when_structured_fails() {
    let fx = Fixture::new();
    fx.serve_dump("\"name\" => \"ERAUBCU LYRIQ\"\n\"latitude\" => 29.5\n\"longitude\" => -81.5\n");

    fx.cmd()
        .arg("extract")
        .assert()
        .success()
        .stdout(contains("Cache format: text-dump"))
        .stdout(contains("New location recorded"))
        .stdout(contains("Lat: 29.5"));
}

#[test]
fn missing_cache_is_narrated_and_exits_zero() {
    let fx = Fixture::new();
    fs::remove_file(fx.path().join("cache").join("Items.data")).expect("remove cache");

    fx.cmd()
        .arg("extract")
        .assert()
        .success()
        .stdout(contains("location cache not found"))
        .stdout(contains("Items.data"));
    assert!(!fx.history_path().exists());
}

#[test]
fn unknown_item_is_narrated_and_exits_zero() {
    let fx = Fixture::new();
    fx.serve_json(r#"[{"name": "Keys", "location": {"latitude": 1.0, "longitude": 2.0}}]"#);

    fx.cmd()
        .arg("extract")
        .assert()
        .success()
        .stdout(contains("could not find an item named 'LYRIQ'"))
        .stdout(contains("New location recorded").not())
        .stdout(contains("Location unchanged").not());
}

#[test]
fn empty_cache_prints_preview() {
    let fx = Fixture::new();
    fx.serve_json(r#"{"$version": 100000, "$top": {}}"#);

    fx.cmd()
        .arg("extract")
        .assert()
        .success()
        .stdout(contains("No items found in cache. Raw output preview:"))
        .stdout(contains("$version"));
}

#[test]
fn corrupt_history_fails_extract() {
    let fx = Fixture::new();
    fx.serve_json(DAYTONA);
    fs::create_dir_all(fx.history_path().parent().expect("parent")).expect("mkdir");
    fs::write(fx.history_path(), "{ not json").expect("write corrupt history");

    fx.cmd()
        .arg("extract")
        .assert()
        .failure()
        .stderr(contains("failed to record location"));
}

#[test]
fn name_and_history_flags_override_config() {
    let fx = Fixture::new();
    fx.serve_json(DAYTONA);
    let other = fx.path().join("other.json");

    fx.cmd()
        .args(["extract", "--name", "backpack", "--history"])
        .arg(&other)
        .assert()
        .success()
        .stdout(contains("Looking for: backpack"))
        .stdout(contains("Lat: 40"));
    assert!(other.exists());
    assert!(!fx.history_path().exists());
}

#[test]
fn dump_cache_writes_converter_output() {
    let fx = Fixture::new();
    fx.serve_json(DAYTONA);
    let dump = fx.path().join("debug_cache.json");

    fx.cmd()
        .args(["extract", "--dump-cache"])
        .arg(&dump)
        .assert()
        .success()
        .stdout(contains("Full cache saved to:"));

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&dump).expect("read dump")).expect("json");
    assert_eq!(written[1]["name"], "ERAUBCU LYRIQ");
}

// ---------------------------------------------------------------------------
// items / history / init
// ---------------------------------------------------------------------------

#[test]
fn items_json_lists_every_entity() {
    let fx = Fixture::new();
    fx.serve_json(DAYTONA);

    fx.cmd()
        .args(["items", "--json"])
        .assert()
        .success()
        .stdout(contains("\"Backpack\""))
        .stdout(contains("\"ERAUBCU LYRIQ\""));
    assert!(!fx.history_path().exists(), "items never records");
}

#[test]
fn items_reports_unreadable_cache() {
    let fx = Fixture::new();

    fx.cmd()
        .arg("items")
        .assert()
        .success()
        .stdout(contains("could not read the location cache"))
        .stdout(contains("Try running:"))
        .stdout(contains("No items found").not());
}

#[test]
fn history_lists_recorded_entries() {
    let fx = Fixture::new();

    fx.cmd()
        .arg("history")
        .assert()
        .success()
        .stdout(contains("No locations recorded yet"));

    fx.serve_json(DAYTONA);
    fx.cmd().arg("extract").assert().success();

    fx.cmd()
        .arg("history")
        .assert()
        .success()
        .stdout(contains("Daytona Beach, FL"))
        .stdout(contains("1 of 1 locations"));

    fx.cmd()
        .args(["history", "--json", "--limit", "5"])
        .assert()
        .success()
        .stdout(contains("\"latitude\": 29.1872"));
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let fx = Fixture::new();

    fx.cmd()
        .args(["init", "--name", "Keys"])
        .assert()
        .failure()
        .stderr(contains("--force"));

    fx.cmd()
        .args(["init", "--name", "Keys", "--publish", "--force"])
        .assert()
        .success()
        .stdout(contains("Tracking 'Keys'"));

    let saved = fs::read_to_string(fx.path().join(".tagtrail").join("config.yaml"))
        .expect("read config");
    assert!(saved.contains("tracked_name: Keys"), "{saved}");
    assert!(saved.contains("enabled: true"), "{saved}");
}
