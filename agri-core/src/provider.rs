use crate::{
    Config, Location, WeatherSnapshot,
    cancel::CancelToken,
    error::ClientResult,
    http::Transport,
    provider::{backend::BackendWeatherProvider, openweather::OpenWeatherProvider},
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

pub mod backend;
pub mod openweather;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    /// Weather proxied through the dashboard backend.
    Backend,
    OpenWeather,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Backend => "backend",
            ProviderId::OpenWeather => "openweather",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::Backend, ProviderId::OpenWeather]
    }

    /// Whether the provider needs its own API key.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, ProviderId::OpenWeather)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "backend" => Ok(ProviderId::Backend),
            "openweather" => Ok(ProviderId::OpenWeather),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: backend, openweather."
            )),
        }
    }
}

/// Current conditions by coordinates.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current_weather(&self, location: Location, cancel: &CancelToken) -> ClientResult<WeatherSnapshot>;
}

/// Construct a provider from config and explicit ProviderId.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
    transport: Arc<dyn Transport>,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let boxed: Box<dyn WeatherProvider> = match id {
        ProviderId::Backend => Box::new(BackendWeatherProvider::new(transport)),
        ProviderId::OpenWeather => {
            let api_key = config.provider_api_key(id).ok_or_else(|| {
                anyhow::anyhow!(
                    "No API key configured for provider '{id}'.\n\
                     Hint: run `agri configure` and enter your API key, or use the backend provider."
                )
            })?;

            let provider = OpenWeatherProvider::new(api_key.to_owned());
            match config.provider_base_url(id) {
                Some(url) => Box::new(provider.with_base_url(url)),
                None => Box::new(provider),
            }
        }
    };

    Ok(boxed)
}

/// Construct the default provider from config, using `default_provider` field.
pub fn default_provider_from_config(
    config: &Config,
    transport: Arc<dyn Transport>,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let id = config.default_provider_id()?;
    provider_from_config(id, config, transport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, testing::StubTransport};

    fn transport() -> Arc<dyn Transport> {
        Arc::new(StubTransport::new())
    }

    #[test]
    fn provider_id_as_str_roundtrip() {
        for id in ProviderId::all() {
            let s = id.as_str();
            let parsed = ProviderId::try_from(s).expect("roundtrip should succeed");
            assert_eq!(*id, parsed);
        }
    }

    #[test]
    fn unknown_provider_error() {
        let err = ProviderId::try_from("doesnotexist").unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn openweather_requires_api_key() {
        let cfg = Config::default();
        let err = provider_from_config(ProviderId::OpenWeather, &cfg, transport()).unwrap_err();
        assert!(err.to_string().contains("No API key configured for provider"));
    }

    #[test]
    fn backend_provider_needs_no_key() {
        let cfg = Config::default();
        assert!(!ProviderId::Backend.requires_api_key());
        assert!(provider_from_config(ProviderId::Backend, &cfg, transport()).is_ok());
    }

    #[test]
    fn default_provider_falls_back_to_backend() {
        let cfg = Config::default();
        assert!(default_provider_from_config(&cfg, transport()).is_ok());
    }

    #[test]
    fn default_provider_from_config_works_when_set_and_configured() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "KEY".to_string());

        let provider = default_provider_from_config(&cfg, transport());
        assert!(provider.is_ok());
    }
}
