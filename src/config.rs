//! Persistent settings: which metadata sources are active and how
//! strictly queries match.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::loader::SourceLocator;
use crate::query::fuzzy::DEFAULT_THRESHOLD;

pub const DEFAULT_SOURCE_URL: &str =
    "http://20.115.87.69/knb1_public/BST_Site_Metadata/metadata.json";
pub const DEFAULT_PINNED_COLLECTION: &str = "BiblicalStory";
pub const DEFAULT_CONFIG_FILE: &str = "synapse.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid settings file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("source locator is blank")]
    BlankSource,

    #[error("source already registered: {0}")]
    DuplicateSource(String),

    #[error("no such source: {0}")]
    UnknownSource(String),

    #[error("threshold must be within 0.0..=1.0, got {0}")]
    InvalidThreshold(f64),
}

/// A user-registered metadata source.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SourceDescriptor {
    pub url: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl SourceDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            enabled: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Prepend the built-in source to every load.
    pub enable_default_source: bool,
    pub default_source_url: String,
    /// Collection always listed first when present.
    pub pinned_collection: Option<String>,
    pub sources: Vec<SourceDescriptor>,
    pub threshold: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_default_source: true,
            default_source_url: DEFAULT_SOURCE_URL.to_string(),
            pinned_collection: Some(DEFAULT_PINNED_COLLECTION.to_string()),
            sources: Vec::new(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl Settings {
    /// Settings file plus environment overrides. Use [`Settings::read`]
    /// when the result will be saved back.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut settings = Self::read(path)?;
        settings.apply_overrides(
            env::var("SYNAPSE_THRESHOLD").ok().as_deref(),
            env::var("SYNAPSE_DISABLE_DEFAULT_SOURCE").ok().as_deref(),
        );
        Ok(settings)
    }

    /// The settings file alone. A missing file yields defaults.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let settings: Self = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?).map_err(io_err)?;
        debug!(path = %path.display(), sources = self.sources.len(), "settings saved");
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }

    /// Unparseable or out-of-range values are logged and ignored.
    fn apply_overrides(&mut self, threshold: Option<&str>, disable_default: Option<&str>) {
        if let Some(raw) = threshold.map(str::trim).filter(|s| !s.is_empty()) {
            match raw.parse::<f64>() {
                Ok(t) if (0.0..=1.0).contains(&t) => self.threshold = t,
                _ => warn!(value = raw, "ignoring invalid SYNAPSE_THRESHOLD"),
            }
        }
        if let Some(raw) = disable_default.map(str::trim) {
            match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => self.enable_default_source = false,
                "" | "0" | "false" | "no" => {}
                _ => warn!(value = raw, "ignoring invalid SYNAPSE_DISABLE_DEFAULT_SOURCE"),
            }
        }
    }

    pub fn add_source(&mut self, url: &str) -> Result<(), ConfigError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ConfigError::BlankSource);
        }
        if self.sources.iter().any(|s| s.url == url) {
            return Err(ConfigError::DuplicateSource(url.to_string()));
        }
        self.sources.push(SourceDescriptor::new(url));
        Ok(())
    }

    pub fn remove_source(&mut self, url: &str) -> Result<SourceDescriptor, ConfigError> {
        let url = url.trim();
        let pos = self
            .sources
            .iter()
            .position(|s| s.url == url)
            .ok_or_else(|| ConfigError::UnknownSource(url.to_string()))?;
        Ok(self.sources.remove(pos))
    }

    pub fn set_enabled(&mut self, url: &str, enabled: bool) -> Result<(), ConfigError> {
        let url = url.trim();
        let source = self
            .sources
            .iter_mut()
            .find(|s| s.url == url)
            .ok_or_else(|| ConfigError::UnknownSource(url.to_string()))?;
        source.enabled = enabled;
        Ok(())
    }

    /// Registered sources that are switched on, in registration order.
    /// The built-in default source is not included.
    pub fn enabled_locators(&self) -> Vec<SourceLocator> {
        self.sources
            .iter()
            .filter(|s| s.enabled)
            .map(|s| SourceLocator::parse(&s.url))
            .collect()
    }
}
