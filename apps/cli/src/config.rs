//! Config file + environment overrides.

use anyhow::Context;
use roadlore_application::ExplorerConfig;
use roadlore_gemini::GeminiConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Location knobs, in milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocationConfig {
    pub watch_timeout_ms: u64,
    pub watch_maximum_age_ms: u64,
    pub one_shot_timeout_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        let defaults = ExplorerConfig::default();
        Self {
            watch_timeout_ms: defaults.watch.timeout.as_millis() as u64,
            watch_maximum_age_ms: defaults.watch.maximum_age.as_millis() as u64,
            one_shot_timeout_ms: defaults.one_shot.timeout.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CliConfig {
    pub gemini: GeminiConfig,
    pub highlight_prefix: Option<String>,
    pub location: LocationConfig,
}

impl CliConfig {
    /// Default config file location, e.g. `~/.config/roadlore/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("roadlore").join("config.json"))
    }

    /// Load `path`, or the default file if it exists, then apply the
    /// environment. A missing API key is not an error here.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::read(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let key = API_KEY_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty());
        if let Some(key) = key {
            self.gemini.api_key = key;
        }
    }

    pub fn explorer_config(&self) -> ExplorerConfig {
        let mut config = ExplorerConfig::default();
        if let Some(prefix) = &self.highlight_prefix {
            config.highlight_prefix = prefix.clone();
        }
        config.watch.timeout = Duration::from_millis(self.location.watch_timeout_ms);
        config.watch.maximum_age = Duration::from_millis(self.location.watch_maximum_age_ms);
        config.one_shot.timeout = Duration::from_millis(self.location.one_shot_timeout_ms);
        config
    }
}
