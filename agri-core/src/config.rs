use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf, time::Duration};

use crate::{geo::Location, provider::ProviderId};

/// Environment variable that replaces `backend.base_url`.
pub const BACKEND_URL_ENV: &str = "AGRI_BACKEND_URL";

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_BACKEND_URL.to_string() }
    }
}

/// Credentials for a third-party weather provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
    /// Overrides the provider's public endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    pub timeout_secs: u64,
    /// Fixed position used in place of a platform geolocation service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<Location>,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self { timeout_secs: 5, home: None }
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Weather provider id, "backend" or "openweather". Unset means backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,

    pub backend: BackendConfig,

    /// Example TOML:
    /// [providers.openweather]
    /// api_key = "..."
    pub providers: HashMap<String, ProviderConfig>,

    pub geolocation: GeolocationConfig,
}

impl Config {
    /// Weather provider to use when none is named explicitly.
    pub fn default_provider_id(&self) -> Result<ProviderId> {
        match &self.default_provider {
            Some(s) => ProviderId::try_from(s.as_str()),
            None => Ok(ProviderId::Backend),
        }
    }

    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id.as_str().to_string());
    }

    /// Backend root, honoring `AGRI_BACKEND_URL`.
    pub fn backend_url(&self) -> String {
        self.backend_url_with(std::env::var(BACKEND_URL_ENV).ok())
    }

    fn backend_url_with(&self, env_override: Option<String>) -> String {
        env_override
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.backend.base_url.clone())
    }

    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_secs(self.geolocation.timeout_secs)
    }

    /// Load config from disk, or return the defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set or replace a provider API key. The first keyed provider becomes
    /// the default unless one was chosen already.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        let base_url = self.providers.get(provider_id.as_str()).and_then(|p| p.base_url.clone());
        self.providers
            .insert(provider_id.as_str().to_string(), ProviderConfig { api_key, base_url });

        if self.default_provider.is_none() {
            self.default_provider = Some(provider_id.to_string());
        }
    }

    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers.get(provider_id.as_str()).map(|cfg| cfg.api_key.as_str())
    }

    pub fn provider_base_url(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers.get(provider_id.as_str()).and_then(|cfg| cfg.base_url.as_deref())
    }

    /// Backend needs nothing; the others need a key.
    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        !provider_id.requires_api_key() || self.provider_api_key(provider_id).is_some()
    }
}

pub(crate) fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "agri-assistant", "agri-cli")
        .ok_or_else(|| anyhow!("Could not determine platform directories"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_backend() {
        let cfg = Config::default();

        assert_eq!(cfg.default_provider_id().unwrap(), ProviderId::Backend);
        assert_eq!(cfg.backend.base_url, "http://localhost:8000");
        assert_eq!(cfg.geolocation_timeout(), Duration::from_secs(5));
        assert!(cfg.is_provider_configured(ProviderId::Backend));
        assert!(!cfg.is_provider_configured(ProviderId::OpenWeather));
    }

    #[test]
    fn set_api_key_and_default_for_provider() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OPEN_KEY".into());

        let default = cfg.default_provider_id().expect("default provider must exist");
        assert_eq!(default, ProviderId::OpenWeather);
        assert_eq!(cfg.provider_api_key(ProviderId::OpenWeather), Some("OPEN_KEY"));
        assert!(cfg.is_provider_configured(ProviderId::OpenWeather));
    }

    #[test]
    fn upsert_does_not_override_existing_default() {
        let mut cfg = Config::default();
        cfg.set_default_provider(ProviderId::Backend);

        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OPEN_KEY".into());

        assert_eq!(cfg.default_provider_id().unwrap(), ProviderId::Backend);
    }

    #[test]
    fn upsert_keeps_base_url_override() {
        let mut cfg = Config::default();
        cfg.providers.insert(
            "openweather".into(),
            ProviderConfig { api_key: "OLD".into(), base_url: Some("http://proxy.local".into()) },
        );

        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "NEW".into());

        assert_eq!(cfg.provider_api_key(ProviderId::OpenWeather), Some("NEW"));
        assert_eq!(cfg.provider_base_url(ProviderId::OpenWeather), Some("http://proxy.local"));
    }

    #[test]
    fn unknown_default_provider_is_an_error() {
        let cfg = Config { default_provider: Some("weatherbit".into()), ..Config::default() };
        let err = cfg.default_provider_id().unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn env_override_replaces_backend_url() {
        let cfg = Config::default();

        assert_eq!(cfg.backend_url_with(Some("https://agri.example".into())), "https://agri.example");
        assert_eq!(cfg.backend_url_with(Some("  ".into())), "http://localhost:8000");
        assert_eq!(cfg.backend_url_with(None), "http://localhost:8000");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            default_provider = "openweather"

            [providers.openweather]
            api_key = "abc"

            [geolocation]
            home = { latitude = 18.52, longitude = 73.85 }
            "#,
        )
        .unwrap();

        assert_eq!(cfg.backend, BackendConfig::default());
        assert_eq!(cfg.geolocation.timeout_secs, 5);
        assert_eq!(cfg.geolocation.home, Some(Location::new(18.52, 73.85)));
        assert_eq!(cfg.provider_base_url(ProviderId::OpenWeather), None);

        let written = toml::to_string_pretty(&cfg).unwrap();
        let reread: Config = toml::from_str(&written).unwrap();
        assert_eq!(reread, cfg);
    }
}
