use std::{sync::Arc, time::Duration};

use crate::{
    cancel::CancelToken,
    error::ClientResult,
    fallback,
    geo::{DEFAULT_GEOLOCATION_TIMEOUT, LocationSource, resolve_location},
    model::{Sourced, UserLocation, WeatherReport},
    provider::WeatherProvider,
};

use super::or_fallback;

/// Current weather at the user's position.
#[derive(Debug)]
pub struct WeatherService {
    provider: Box<dyn WeatherProvider>,
    location: Option<Arc<dyn LocationSource>>,
    geolocation_timeout: Duration,
}

impl WeatherService {
    pub fn new(provider: Box<dyn WeatherProvider>) -> Self {
        Self { provider, location: None, geolocation_timeout: DEFAULT_GEOLOCATION_TIMEOUT }
    }

    pub fn with_location_source(mut self, source: Arc<dyn LocationSource>) -> Self {
        self.location = Some(source);
        self
    }

    pub fn with_geolocation_timeout(mut self, timeout: Duration) -> Self {
        self.geolocation_timeout = timeout;
        self
    }

    /// Weather report, or the mock report if the provider fails.
    pub async fn current(&self, cancel: &CancelToken) -> Sourced<WeatherReport> {
        or_fallback("weather", self.try_current(cancel).await, fallback::weather_report)
    }

    /// Weather report without fallback substitution.
    pub async fn try_current(&self, cancel: &CancelToken) -> ClientResult<WeatherReport> {
        let location = resolve_location(self.location.as_deref(), self.geolocation_timeout).await;
        let current = self.provider.current_weather(location, cancel).await?;

        Ok(WeatherReport {
            current,
            user_location: UserLocation {
                lat: location.latitude,
                lon: location.longitude,
                region: "Unknown".to_string(),
            },
        })
    }
}
