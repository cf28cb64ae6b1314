use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    cancel::CancelToken,
    error::ClientResult,
    geo::Location,
    http::{Transport, decode},
    model::WeatherSnapshot,
};

use super::WeatherProvider;

/// Weather proxied through the dashboard backend; no third-party secret on
/// the client.
#[derive(Debug, Clone)]
pub struct BackendWeatherProvider {
    transport: Arc<dyn Transport>,
}

impl BackendWeatherProvider {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

fn default_visibility() -> f64 {
    10.0
}

#[derive(Debug, Deserialize)]
struct BackendCurrent {
    temperature: f64,
    #[serde(default)]
    condition: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    humidity: u8,
    /// km/h
    #[serde(default)]
    wind_speed: f64,
    /// km
    #[serde(default = "default_visibility")]
    visibility: f64,
    #[serde(default)]
    rainfall: f64,
    #[serde(default)]
    location: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BackendWeather {
    Wrapped { current: BackendCurrent },
    Flat(BackendCurrent),
}

impl From<BackendCurrent> for WeatherSnapshot {
    fn from(c: BackendCurrent) -> Self {
        WeatherSnapshot {
            temperature: c.temperature.round() as i32,
            condition: c.condition,
            description: c.description,
            humidity: c.humidity,
            wind_speed: c.wind_speed.round() as i32,
            visibility: c.visibility.round() as i32,
            rainfall: c.rainfall,
            location: c.location,
        }
    }
}

#[async_trait]
impl WeatherProvider for BackendWeatherProvider {
    async fn current_weather(&self, location: Location, cancel: &CancelToken) -> ClientResult<WeatherSnapshot> {
        let query = [("lat", location.latitude.to_string()), ("lon", location.longitude.to_string())];
        let raw: Value = self.transport.get("/api/weather/current", &query, cancel).await?;

        let current = match decode::<BackendWeather>(raw, "weather")? {
            BackendWeather::Wrapped { current } => current,
            BackendWeather::Flat(current) => current,
        };

        Ok(current.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubTransport;
    use serde_json::json;

    #[tokio::test]
    async fn reads_wrapped_envelope() {
        let stub = StubTransport::new().with_ok(
            "/api/weather/current",
            json!({"success": true, "data": {"current": {
                "temperature": 24.6, "condition": "Clouds", "description": "broken clouds",
                "humidity": 81, "wind_speed": 9.4, "location": "Nashik, IN"
            }}}),
        );
        let provider = BackendWeatherProvider::new(Arc::new(stub));

        let snap = provider.current_weather(Location::DEFAULT, &CancelToken::new()).await.unwrap();
        assert_eq!(snap.temperature, 25);
        assert_eq!(snap.wind_speed, 9);
        assert_eq!(snap.visibility, 10);
        assert_eq!(snap.location, "Nashik, IN");
    }

    #[tokio::test]
    async fn reads_flat_payload() {
        let stub = StubTransport::new()
            .with_ok("/api/weather/current", json!({"temperature": 30, "humidity": 20}));
        let provider = BackendWeatherProvider::new(Arc::new(stub));

        let snap = provider.current_weather(Location::DEFAULT, &CancelToken::new()).await.unwrap();
        assert_eq!(snap.temperature, 30);
        assert_eq!(snap.rainfall, 0.0);
    }
}
