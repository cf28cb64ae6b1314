use std::sync::Arc;

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    cancel::CancelToken,
    error::{ClientError, ClientResult},
    fallback,
    http::{Transport, decode},
    model::{Sourced, YieldPrediction},
};

use super::{or_fallback, report};

const YIELD_PATH: &str = "/api/dashboard/yield-prediction";
const LATEST_AREA: f64 = 4.0;

/// Inputs for a yield prediction. Unset fields take fixed sample values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct YieldRequest {
    pub state: Option<String>,
    pub district: Option<String>,
    pub crop: Option<String>,
    pub year: Option<String>,
    pub season: Option<String>,
    /// Hectares.
    pub area: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct YieldPayload {
    state: String,
    district: String,
    crop: String,
    year: String,
    season: String,
    area: f64,
}

impl YieldRequest {
    fn resolve(&self, default_area: f64) -> YieldPayload {
        YieldPayload {
            state: self.state.clone().unwrap_or_else(|| "Maharashtra".to_string()),
            district: self.district.clone().unwrap_or_else(|| "Mumbai".to_string()),
            crop: self.crop.clone().unwrap_or_else(|| "Rice".to_string()),
            year: self.year.clone().unwrap_or_else(|| Utc::now().year().to_string()),
            season: self.season.clone().unwrap_or_else(|| "Kharif".to_string()),
            area: self.area.unwrap_or(default_area),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawYield {
    predicted_yield_tons_per_hectare: Option<f64>,
    #[serde(default)]
    total_production_tons: f64,
    #[serde(default)]
    confidence: f64,
    yield_category: Option<String>,
    crop: Option<String>,
    state: Option<String>,
    season: Option<String>,
    #[serde(default)]
    recommendations: Vec<String>,
}

impl RawYield {
    /// `context` supplies crop/state/season when the backend omits them.
    fn normalize(self, context: Option<&YieldPayload>) -> ClientResult<YieldPrediction> {
        let predicted_yield = self
            .predicted_yield_tons_per_hectare
            .ok_or_else(|| ClientError::malformed("yield response has no predicted yield"))?;

        let fill = |field: Option<String>, from_context: Option<&String>| {
            field.or_else(|| from_context.cloned()).unwrap_or_else(|| "N/A".to_string())
        };

        Ok(YieldPrediction {
            predicted_yield,
            total_production: self.total_production_tons,
            confidence: self.confidence,
            category: self.yield_category.unwrap_or_else(|| "N/A".to_string()),
            crop: fill(self.crop, context.map(|c| &c.crop)),
            state: fill(self.state, context.map(|c| &c.state)),
            season: fill(self.season, context.map(|c| &c.season)),
            recommendations: self.recommendations,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CropYieldService {
    transport: Arc<dyn Transport>,
}

impl CropYieldService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn request(&self, payload: &YieldPayload, cancel: &CancelToken) -> ClientResult<YieldPrediction> {
        let body = serde_json::to_value(payload)?;
        let raw: Value = self.transport.post(YIELD_PATH, &body, cancel).await?;
        decode::<RawYield>(raw, "yield prediction")?.normalize(Some(payload))
    }

    /// Predict yield for user-supplied inputs. Failures propagate.
    pub async fn predict(&self, request: &YieldRequest, cancel: &CancelToken) -> ClientResult<YieldPrediction> {
        let payload = request.resolve(1.0);
        let res = self.request(&payload, cancel).await.map(|mut prediction| {
            // the caller's inputs are authoritative for the echo fields
            prediction.crop = payload.crop.clone();
            prediction.state = payload.state.clone();
            prediction.season = payload.season.clone();
            prediction
        });
        report("predict yield", res)
    }

    /// Prediction for the sample farm, or the mock prediction.
    pub async fn latest(&self, cancel: &CancelToken) -> Sourced<YieldPrediction> {
        or_fallback("latest yield prediction", self.try_latest(cancel).await, fallback::yield_prediction)
    }

    pub async fn try_latest(&self, cancel: &CancelToken) -> ClientResult<YieldPrediction> {
        let payload = YieldRequest::default().resolve(LATEST_AREA);
        self.request(&payload, cancel).await
    }
}
