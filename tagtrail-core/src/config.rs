//! Tracker configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.tagtrail/
//!   config.yaml               (mode 0600, written by `tagtrail init`)
//!   location_history.json     (default history path)
//! ```
//!
//! Every field in `config.yaml` is optional; missing fields fall back to the
//! defaults from [`TrackerConfig::defaults_at`]. Paths may start with `~/`.
//!
//! Functions take an explicit `home` so tests can point them at a `TempDir`;
//! binaries resolve it once with [`home`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{config_io, ConfigError};
use crate::types::TrackedName;

pub const DEFAULT_TRACKED_NAME: &str = "ERAUBCU LYRIQ";
pub const DEFAULT_CONVERTER: &str = "plutil";
pub const CONFIG_FILE: &str = "config.yaml";
pub const HISTORY_FILE: &str = "location_history.json";

const FINDMY_CACHE_DIR: &str = "Library/Caches/com.apple.findmy.fmipcore";

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Fully resolved configuration handed to every component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub tracked_name: TrackedName,
    /// Cache artifacts in priority order; the first that exists wins.
    pub cache_candidates: Vec<PathBuf>,
    pub history_path: PathBuf,
    /// Program used to convert the cache (`plutil` on macOS).
    pub converter: PathBuf,
    pub poll: PollConfig,
    pub publish: PublishConfig,
}

/// Poll loop timing, all in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: u64,
    pub settle_secs: u64,
    pub extract_timeout_secs: u64,
    pub refresh_timeout_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            settle_secs: 5,
            extract_timeout_secs: 60,
            refresh_timeout_secs: 5,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extract_timeout_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}

/// Git publishing of the history file after a new location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub enabled: bool,
    pub add_timeout_secs: u64,
    pub commit_timeout_secs: u64,
    pub push_timeout_secs: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            add_timeout_secs: 30,
            commit_timeout_secs: 30,
            push_timeout_secs: 60,
        }
    }
}

/// On-disk shape: everything optional so a partial file is valid.
#[derive(Debug, Default, Deserialize)]
struct ConfigFileCompat {
    tracked_name: Option<String>,
    cache_candidates: Option<Vec<PathBuf>>,
    history_path: Option<PathBuf>,
    converter: Option<PathBuf>,
    poll: Option<PollConfig>,
    publish: Option<PublishConfig>,
}

impl TrackerConfig {
    /// Built-in defaults rooted at `home`.
    pub fn defaults_at(home: &Path) -> Self {
        let cache_dir = home.join(FINDMY_CACHE_DIR);
        Self {
            tracked_name: TrackedName::from(DEFAULT_TRACKED_NAME),
            cache_candidates: vec![cache_dir.join("Items.data"), cache_dir.join("Devices.data")],
            history_path: tagtrail_root(home).join(HISTORY_FILE),
            converter: PathBuf::from(DEFAULT_CONVERTER),
            poll: PollConfig::default(),
            publish: PublishConfig::default(),
        }
    }

    fn merge(home: &Path, file: ConfigFileCompat) -> Self {
        let defaults = Self::defaults_at(home);
        Self {
            tracked_name: file
                .tracked_name
                .map(TrackedName::from)
                .unwrap_or(defaults.tracked_name),
            cache_candidates: file
                .cache_candidates
                .map(|paths| paths.iter().map(|p| expand_home(p, home)).collect())
                .unwrap_or(defaults.cache_candidates),
            history_path: file
                .history_path
                .map(|p| expand_home(&p, home))
                .unwrap_or(defaults.history_path),
            converter: file.converter.unwrap_or(defaults.converter),
            poll: file.poll.unwrap_or(defaults.poll),
            publish: file.publish.unwrap_or(defaults.publish),
        }
    }

    /// Directory of the cache artifacts, used as a fallback refresh nudge.
    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_candidates.first().and_then(|p| p.parent())
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.tagtrail`
pub fn tagtrail_root(home: &Path) -> PathBuf {
    home.join(".tagtrail")
}

/// `<home>/.tagtrail/config.yaml` — pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    tagtrail_root(home).join(CONFIG_FILE)
}

/// Replace a leading `~` with `home`.
pub fn expand_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load the config for `home`, or defaults if no config file exists.
///
/// Returns `ConfigError::Parse` (with path) if the file is malformed.
pub fn load_at(home: &Path) -> Result<TrackerConfig, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(TrackerConfig::defaults_at(home));
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| config_io(&path, e))?;
    if contents.trim().is_empty() {
        return Ok(TrackerConfig::defaults_at(home));
    }
    let file: ConfigFileCompat =
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })?;
    Ok(TrackerConfig::merge(home, file))
}

/// Atomically write `config` to `<home>/.tagtrail/config.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &TrackerConfig) -> Result<PathBuf, ConfigError> {
    let root = tagtrail_root(home);
    if !root.exists() {
        std::fs::create_dir_all(&root).map_err(|e| config_io(&root, e))?;
    }
    let path = config_path_at(home);
    let tmp = path.with_extension("yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp, yaml).map_err(|e| config_io(&tmp, e))?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, &path).map_err(|e| config_io(&path, e))?;
    Ok(path)
}

/// The current user's home directory.
pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| config_io(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
