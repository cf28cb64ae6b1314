use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    cancel::CancelToken,
    error::{ClientError, ClientResult},
    geo::Location,
    http::truncate_body,
    model::WeatherSnapshot,
};

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// Direct third-party lookup. The key travels with the client, so prefer
/// the backend provider outside development.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), http: Client::new() }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_current(&self, location: Location) -> ClientResult<WeatherSnapshot> {
        let url = format!("{}/data/2.5/weather", self.base_url.trim_end_matches('/'));

        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", location.latitude.to_string()),
                ("lon", location.longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .map_err(|e| ClientError::Network(format!("OpenWeather request failed: {e}")))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| ClientError::Network(format!("Failed to read OpenWeather body: {e}")))?;

        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                message: format!("Weather API request failed: {}", truncate_body(&body)),
            });
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body)
            .map_err(|e| ClientError::MalformedResponse(format!("OpenWeather JSON: {e}")))?;

        parsed.into_snapshot()
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwRain {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    visibility: Option<f64>,
    rain: Option<OwRain>,
    sys: OwSys,
}

impl OwCurrentResponse {
    fn into_snapshot(self) -> ClientResult<WeatherSnapshot> {
        let weather = self
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::malformed("OpenWeather response contained no conditions"))?;

        Ok(WeatherSnapshot {
            temperature: self.main.temp.round() as i32,
            condition: weather.main,
            description: weather.description,
            humidity: self.main.humidity,
            // m/s -> km/h
            wind_speed: (self.wind.speed * 3.6).round() as i32,
            visibility: self.visibility.map(|m| (m / 1000.0).round() as i32).unwrap_or(10),
            rainfall: self.rain.and_then(|r| r.one_hour).unwrap_or(0.0),
            location: format!("{}, {}", self.name, self.sys.country),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current_weather(&self, location: Location, cancel: &CancelToken) -> ClientResult<WeatherSnapshot> {
        cancel.run(self.fetch_current(location)).await
    }
}
