use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::provider::ProviderId;

/// Used when neither the config file nor the environment names a backend.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000/v1";

/// Environment variable that overrides `backend_url` from the file.
pub const BACKEND_URL_ENV: &str = "CADDIE_BACKEND_URL";

/// Configuration for a single weather provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Base URL of the caddie backend, including the API version prefix.
    pub backend_url: Option<String>,

    /// Optional default weather provider id, e.g. "openmeteo" or "openweather".
    pub default_provider: Option<String>,

    /// Example TOML:
    /// [providers.openweather]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl Config {
    /// Default weather provider. Open-Meteo needs no key, so it is the
    /// fallback when nothing has been configured.
    pub fn default_provider_id(&self) -> Result<ProviderId> {
        match self.default_provider.as_deref() {
            Some(s) => ProviderId::try_from(s),
            None => Ok(ProviderId::OpenMeteo),
        }
    }

    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id.as_str().to_string());
    }

    /// Backend URL with the environment override applied and any trailing
    /// slash removed.
    pub fn backend_url(&self) -> String {
        let env = std::env::var(BACKEND_URL_ENV).ok().filter(|v| !v.trim().is_empty());
        Self::resolve_backend_url(env.as_deref(), self.backend_url.as_deref())
    }

    fn resolve_backend_url(env: Option<&str>, file: Option<&str>) -> String {
        env.or(file).unwrap_or(DEFAULT_BACKEND_URL).trim().trim_end_matches('/').to_string()
    }

    pub fn set_backend_url(&mut self, url: &str) {
        self.backend_url = Some(url.trim().trim_end_matches('/').to_string());
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        write_toml(path, self)?;
        log::debug!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Directory holding `config.toml` and `session.toml`.
    pub fn config_dir() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "caddie", "caddie-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().to_path_buf())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Set/replace a provider API key and, if none is set yet, make it the default.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.insert(provider_id.as_str().to_string(), ProviderConfig { api_key });

        if self.default_provider.is_none() {
            self.default_provider = Some(provider_id.to_string());
        }
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers.get(provider_id.as_str()).map(|cfg| cfg.api_key.as_str())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        !provider_id.requires_api_key() || self.provider_api_key(provider_id).is_some()
    }
}

/// Serialize `value` as TOML at `path`, creating parent directories.
pub(crate) fn write_toml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    let toml = toml::to_string_pretty(value).context("Failed to serialize to TOML")?;

    fs::write(path, toml).with_context(|| format!("Failed to write file: {}", path.display()))?;

    Ok(())
}
