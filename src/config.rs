use crate::error::{PanelError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
pub fn load_dotenv() {
    load_dotenv_from(Path::new(".env"));
}

fn load_dotenv_from(env_path: &Path) {
    if !env_path.exists() {
        return;
    }

    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for (key, value) in parse_dotenv(&content) {
        // Only set if not already set (env vars take precedence)
        if std::env::var(&key).is_err() {
            // SAFETY: called before the async runtime starts any worker threads
            unsafe { std::env::set_var(key, value) };
        }
    }
}

/// Parse `KEY=value` lines, skipping blanks and comments and stripping one
/// pair of surrounding quotes.
fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for line in content.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Find the first '=' and split there
        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim();
            let mut value = line[eq_pos + 1..].trim();

            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }

            pairs.push((key.to_string(), value.to_string()));
        }
    }

    pairs
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    pub sync: SyncConfig,
    pub colors: ColorConfig,
}

/// Where value sources are read from and where commands are posted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    /// Directory under `base_url` holding one text file per source key
    pub value_dir: String,
    /// Path under `base_url` that accepts command posts
    pub command_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Time between refresh cycles
    pub interval_ms: u64,
    /// Age after which the last-update timestamp counts as stale
    pub stale_threshold_ms: i64,
    /// Read server-side button colours once at startup
    pub preseed_colors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorConfig {
    /// Text colour of staleness-tracked elements while data is fresh
    pub normal: String,
    /// Text colour of staleness-tracked elements while data is stale
    pub alert: String,
    /// Background of an unselected button
    pub button: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig {
                base_url: "http://localhost".to_string(),
                value_dir: "thermostat_files".to_string(),
                command_path: "python.php".to_string(),
            },
            sync: SyncConfig {
                interval_ms: 1000,
                stale_threshold_ms: 60_000,
                preseed_colors: true,
            },
            colors: ColorConfig {
                normal: "silver".to_string(),
                alert: "red".to_string(),
                button: "silver".to_string(),
            },
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("PANEL_BASE_URL") {
            config.backend.base_url = url;
        }
        if let Ok(dir) = std::env::var("PANEL_VALUE_DIR") {
            config.backend.value_dir = dir;
        }
        if let Ok(path) = std::env::var("PANEL_COMMAND_PATH") {
            config.backend.command_path = path;
        }

        // Sync configuration
        if let Ok(interval) = std::env::var("PANEL_INTERVAL_MS")
            && let Ok(ms) = interval.parse()
        {
            config.sync.interval_ms = ms;
        }
        if let Ok(threshold) = std::env::var("PANEL_STALE_THRESHOLD_MS")
            && let Ok(ms) = threshold.parse()
        {
            config.sync.stale_threshold_ms = ms;
        }
        if let Ok(preseed) = std::env::var("PANEL_PRESEED_COLORS")
            && let Ok(p) = preseed.parse()
        {
            config.sync.preseed_colors = p;
        }

        // Colours
        if let Ok(color) = std::env::var("PANEL_NORMAL_COLOR") {
            config.colors.normal = color;
        }
        if let Ok(color) = std::env::var("PANEL_ALERT_COLOR") {
            config.colors.alert = color;
        }
        if let Ok(color) = std::env::var("PANEL_BUTTON_COLOR") {
            config.colors.button = color;
        }

        config
    }

    /// Reject values the panel cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.sync.interval_ms == 0 {
            return Err(PanelError::InvalidConfig(
                "refresh interval must be at least 1 ms".to_string(),
            ));
        }
        if self.sync.stale_threshold_ms < 0 {
            return Err(PanelError::InvalidConfig(format!(
                "stale threshold must not be negative, got {} ms",
                self.sync.stale_threshold_ms
            )));
        }
        Ok(())
    }
}
