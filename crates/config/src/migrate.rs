// Run configuration
// Loaded from migrate.toml (default: ~/.config/contact-migrate/migrate.toml)

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_PAGE_SIZE: u32 = 200;
pub const MAX_PAGE_SIZE: u32 = 1000;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrateConfig {
    pub name: String,
    #[serde(default)]
    pub source: Option<EndpointConfig>,
    #[serde(default)]
    pub destination: Option<EndpointConfig>,
    #[serde(default)]
    pub import: ImportConfig,
}

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    /// REST directory reached over HTTPS with a bearer token.
    Http,
    /// JSON file of contacts standing in for a directory.
    Snapshot,
}

impl std::fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Snapshot => write!(f, "snapshot"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    pub kind: EndpointKind,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the bearer token.
    #[serde(default)]
    pub token_env: Option<String>,
    /// Recorded as `source_system` in exported files.
    #[serde(default)]
    pub system_id: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl EndpointConfig {
    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        match self.kind {
            EndpointKind::Http => {
                let url = self.base_url.as_deref().unwrap_or("").trim();
                if url.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "[{section}] kind = \"http\" requires base_url"
                    )));
                }
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::Invalid(format!(
                        "[{section}] base_url must start with http:// or https://, got '{url}'"
                    )));
                }
            }
            EndpointKind::Snapshot => {
                if self.path.is_none() {
                    return Err(ConfigError::Invalid(format!(
                        "[{section}] kind = \"snapshot\" requires path"
                    )));
                }
            }
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "[{section}] page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        Ok(())
    }

    /// Name used for provenance and credential lookup.
    pub fn system_label(&self) -> String {
        if let Some(id) = self.system_id.as_deref().filter(|s| !s.trim().is_empty()) {
            return id.to_string();
        }
        match self.kind {
            EndpointKind::Http => self.base_url.clone().unwrap_or_default(),
            EndpointKind::Snapshot => self
                .path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Import defaults
// ---------------------------------------------------------------------------

/// Defaults for `cmig import`. Command-line flags can only turn these on.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    pub dry_run: bool,
    pub fail_on_errors: bool,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl MigrateConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: MigrateConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate `path`. Relative snapshot paths resolve against
    /// the config file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&input)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        tracing::debug!(config = %path.display(), name = config.name.as_str(), "config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("name must not be empty".into()));
        }
        if self.source.is_none() && self.destination.is_none() {
            return Err(ConfigError::Invalid(
                "at least one of [source] or [destination] is required".into(),
            ));
        }
        if let Some(source) = &self.source {
            source.validate("source")?;
        }
        if let Some(destination) = &self.destination {
            destination.validate("destination")?;
        }
        Ok(())
    }

    pub fn source(&self) -> Result<&EndpointConfig, ConfigError> {
        self.source
            .as_ref()
            .ok_or(ConfigError::MissingSection("source"))
    }

    pub fn destination(&self) -> Result<&EndpointConfig, ConfigError> {
        self.destination
            .as_ref()
            .ok_or(ConfigError::MissingSection("destination"))
    }

    fn resolve_paths(&mut self, base: &Path) {
        for endpoint in [self.source.as_mut(), self.destination.as_mut()]
            .into_iter()
            .flatten()
        {
            if let Some(path) = endpoint.path.as_mut() {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }
    }
}

/// `~/.config/contact-migrate/migrate.toml`, used when `--config` is omitted.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("contact-migrate")
        .join("migrate.toml")
}
