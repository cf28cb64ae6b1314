use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    cancel::CancelToken,
    error::{ClientError, ClientResult},
    geo::{Location, ProfileLocation},
    http::Transport,
    session::Session,
    storage::KeyValueStore,
};

use super::report;

const RECOMMENDATION_PATH: &str = "/api/irrigation/recommendation";

/// Field inputs for an irrigation recommendation.
///
/// A `None` location is filled from the stored profile, else
/// [`Location::DEFAULT`].
#[derive(Debug, Clone, PartialEq)]
pub struct IrrigationParams {
    pub crop_type: String,
    /// Percent.
    pub soil_moisture: f64,
    /// Hectares.
    pub field_size: f64,
    pub soil_type: String,
    pub location: Option<Location>,
}

impl Default for IrrigationParams {
    fn default() -> Self {
        Self {
            crop_type: "wheat".to_string(),
            soil_moisture: 30.0,
            field_size: 1.0,
            soil_type: "loamy".to_string(),
            location: None,
        }
    }
}

impl IrrigationParams {
    fn query(&self, location: Location) -> Vec<(&'static str, String)> {
        vec![
            ("crop_type", self.crop_type.clone()),
            ("soil_moisture", self.soil_moisture.to_string()),
            ("field_size", format!("{:.1}", self.field_size)),
            ("soil_type", self.soil_type.clone()),
            ("latitude", location.latitude.to_string()),
            ("longitude", location.longitude.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrrigationWeather {
    pub temperature: f64,
    pub humidity: f64,
    pub weather_condition: String,
}

impl Default for IrrigationWeather {
    fn default() -> Self {
        Self { temperature: 28.0, humidity: 75.0, weather_condition: "Partly Cloudy".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrrigationRecommendation {
    pub should_irrigate: bool,
    pub irrigation_amount_mm: f64,
    pub irrigation_time: String,
    pub next_check_interval_days: u32,
    pub reason: String,
    pub soil_moisture_status: String,
    /// Conditions the backend based its answer on, when it reported them.
    pub weather_data: Option<IrrigationWeather>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAdvice {
    #[serde(default)]
    should_irrigate: bool,
    irrigation_amount_mm: Option<f64>,
    irrigation_time: Option<String>,
    next_check_interval_days: Option<u32>,
    reason: Option<String>,
    soil_moisture_status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawWeather {
    temperature: Option<f64>,
    humidity: Option<f64>,
    weather_condition: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    recommendation: RawAdvice,
    weather_data: Option<RawWeather>,
}

impl RawResponse {
    fn normalize(self) -> IrrigationRecommendation {
        let advice = self.recommendation;
        let fallback = IrrigationWeather::default();

        IrrigationRecommendation {
            should_irrigate: advice.should_irrigate,
            irrigation_amount_mm: advice.irrigation_amount_mm.unwrap_or(25.0),
            irrigation_time: advice.irrigation_time.unwrap_or_else(|| "6:00 AM".to_string()),
            next_check_interval_days: advice.next_check_interval_days.unwrap_or(2),
            reason: advice
                .reason
                .unwrap_or_else(|| "Based on current soil moisture and weather conditions".to_string()),
            soil_moisture_status: advice.soil_moisture_status.unwrap_or_else(|| "Optimal".to_string()),
            weather_data: self.weather_data.map(|w| IrrigationWeather {
                temperature: w.temperature.map(f64::round).unwrap_or(fallback.temperature),
                humidity: w.humidity.unwrap_or(fallback.humidity),
                weather_condition: w.weather_condition.unwrap_or(fallback.weather_condition),
            }),
        }
    }
}

/// Irrigation advice. Only available to signed-in users.
#[derive(Debug, Clone)]
pub struct IrrigationService {
    transport: Arc<dyn Transport>,
    session: Arc<Session>,
    store: Option<Arc<dyn KeyValueStore>>,
}

impl IrrigationService {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<Session>) -> Self {
        Self { transport, session, store: None }
    }

    /// Read the stored profile for coordinates.
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    fn location_for(&self, params: &IrrigationParams) -> Location {
        if let Some(location) = params.location {
            return location;
        }

        let Some(store) = &self.store else {
            return Location::DEFAULT;
        };

        match ProfileLocation::new(store.clone()).lookup() {
            Ok(found) => found.unwrap_or(Location::DEFAULT),
            Err(err) => {
                tracing::warn!(error = %err, "could not read profile coordinates");
                Location::DEFAULT
            }
        }
    }

    pub async fn recommendation(
        &self,
        params: &IrrigationParams,
        cancel: &CancelToken,
    ) -> ClientResult<IrrigationRecommendation> {
        if self.session.token().is_none() {
            return report("irrigation recommendation", Err(ClientError::AuthenticationRequired));
        }

        let query = params.query(self.location_for(params));
        let res = self
            .transport
            .get(RECOMMENDATION_PATH, &query, cancel)
            .await
            .and_then(parse_recommendation);
        report("irrigation recommendation", res)
    }
}

/// The endpoint must say `success: true` explicitly.
fn parse_recommendation(raw: Value) -> ClientResult<IrrigationRecommendation> {
    if raw.get("success").and_then(Value::as_bool) != Some(true) {
        let message = raw
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Failed to get recommendation");
        return Err(ClientError::malformed(message));
    }

    let parsed: RawResponse = serde_json::from_value(raw)?;
    Ok(parsed.normalize())
}
