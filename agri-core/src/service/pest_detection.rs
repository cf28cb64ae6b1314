//! Crop disease and pest detection.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::{
    cancel::CancelToken,
    error::ClientResult,
    fallback,
    http::{Transport, decode},
    model::Sourced,
};

use super::{NameList, report};

const DEFAULT_SEVERITY: &str = "medium";

/// An image to classify, plus what we know about where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRequest {
    /// Image reference or base64-encoded image data.
    pub image: String,
    #[serde(rename = "cropType")]
    pub crop_type: String,
    pub location: Option<String>,
}

impl DetectionRequest {
    /// Build a request from raw image bytes.
    pub fn from_image_bytes(bytes: &[u8], crop_type: impl Into<String>, location: Option<String>) -> Self {
        Self { image: STANDARD.encode(bytes), crop_type: crop_type.into(), location }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseDetection {
    #[serde(alias = "disease", alias = "predicted_class")]
    pub prediction: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "treatment")]
    pub recommendations: Vec<String>,
}

/// Higher-level verdict derived from one detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PestVerdict {
    pub pest_detected: bool,
    pub pest_type: String,
    pub confidence: f64,
    pub severity: String,
    pub crop_type: String,
}

impl PestVerdict {
    pub fn from_detection(detection: &DiseaseDetection, crop_type: &str) -> Self {
        Self {
            pest_detected: detection.prediction != "healthy",
            pest_type: detection.prediction.clone(),
            confidence: detection.confidence,
            severity: detection.severity.clone().unwrap_or_else(|| DEFAULT_SEVERITY.to_string()),
            crop_type: crop_type.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentPlan {
    pub pest_type: String,
    pub severity: String,
    pub recommendations: Vec<String>,
    pub preventive_measures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRisk {
    pub risk_level: String,
    pub conditions: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityReport {
    pub id: u32,
    pub location: String,
    pub pest_type: String,
    pub severity: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PestGalleryEntry {
    pub id: u32,
    pub name: String,
    pub image: String,
    pub description: String,
    pub symptoms: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GalleryFilter {
    /// Case-insensitive substring of the pest name.
    pub name: Option<String>,
    /// Case-insensitive substring of any symptom.
    pub symptom: Option<String>,
}

impl GalleryFilter {
    fn matches(&self, entry: &PestGalleryEntry) -> bool {
        let contains = |haystack: &str, needle: &str| haystack.to_lowercase().contains(&needle.to_lowercase());

        self.name.as_deref().is_none_or(|n| contains(&entry.name, n))
            && self.symptom.as_deref().is_none_or(|s| entry.symptoms.iter().any(|sym| contains(sym, s)))
    }
}

/// Environmental readings for a pest-risk forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalData {
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
    pub crop_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth_stage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PestRisk {
    #[serde(alias = "riskLevel")]
    pub risk_level: String,
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub likely_pests: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(default, alias = "model_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BatchResults {
    Wrapped { results: Vec<DiseaseDetection> },
    Plain(Vec<DiseaseDetection>),
}

#[derive(Debug, Clone)]
pub struct PestDetectionService {
    transport: Arc<dyn Transport>,
}

impl PestDetectionService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn post_detection(&self, path: &str, body: Value, cancel: &CancelToken) -> ClientResult<DiseaseDetection> {
        let raw = self.transport.post(path, &body, cancel).await?;
        decode(raw, "disease detection")
    }

    pub async fn detect_disease(&self, request: &DetectionRequest, cancel: &CancelToken) -> ClientResult<DiseaseDetection> {
        let body = json!({
            "image": request.image,
            "cropType": request.crop_type,
            "location": request.location,
        });
        report("detect disease", self.post_detection("/api/pest-detection/detect-disease", body, cancel).await)
    }

    pub async fn detect_disease_base64(
        &self,
        request: &DetectionRequest,
        cancel: &CancelToken,
    ) -> ClientResult<DiseaseDetection> {
        let body = json!({
            "base64_image": request.image,
            "cropType": request.crop_type,
            "location": request.location,
        });
        let res = self.post_detection("/api/pest-detection/detect-disease-base64", body, cancel).await;
        report("detect disease (base64)", res)
    }

    /// Detect and reduce the result to a pest verdict.
    pub async fn analyze_pest_image(&self, request: &DetectionRequest, cancel: &CancelToken) -> ClientResult<PestVerdict> {
        let detection = self.detect_disease(request, cancel).await?;
        Ok(PestVerdict::from_detection(&detection, &request.crop_type))
    }

    pub async fn batch_detect(
        &self,
        requests: &[DetectionRequest],
        cancel: &CancelToken,
    ) -> ClientResult<Vec<DiseaseDetection>> {
        let res: ClientResult<Vec<DiseaseDetection>> = async {
            let body = json!({ "images": requests });
            let raw = self.transport.post("/api/pest-detection/batch-detect", &body, cancel).await?;
            Ok(match decode::<BatchResults>(raw, "batch detection")? {
                BatchResults::Wrapped { results } | BatchResults::Plain(results) => results,
            })
        }
        .await;

        report("batch detect", res)
    }

    pub async fn predict_pest_risk(&self, data: &EnvironmentalData, cancel: &CancelToken) -> ClientResult<PestRisk> {
        let res: ClientResult<PestRisk> = async {
            let body = serde_json::to_value(data)?;
            let raw = self.transport.post("/api/pest-detection/predict", &body, cancel).await?;
            decode(raw, "pest risk")
        }
        .await;

        report("predict pest risk", res)
    }

    pub async fn supported_diseases(&self, cancel: &CancelToken) -> ClientResult<Vec<String>> {
        let res = self.transport.get("/api/pest-detection/supported-diseases", &[], cancel).await;
        let res = res.and_then(|raw| decode::<NameList>(raw, "supported diseases")).map(NameList::into_names);
        report("supported diseases", res)
    }

    pub async fn model_info(&self, cancel: &CancelToken) -> ClientResult<ModelInfo> {
        let res = self.transport.get("/api/pest-detection/model-info", &[], cancel).await;
        report("model info", res.and_then(|raw| decode(raw, "model info")))
    }

    /// Treatment advice for a verdict. Generated locally.
    pub fn treatment_recommendations(&self, verdict: &PestVerdict) -> TreatmentPlan {
        fallback::treatment_plan(&verdict.pest_type, &verdict.severity)
    }

    /// Weather-driven pest risk. There is no live source yet, so this is
    /// always the supplier's payload.
    pub fn weather_risk(&self) -> Sourced<WeatherRisk> {
        Sourced::fallback(fallback::weather_risk())
    }

    pub fn community_reports(&self) -> Sourced<Vec<CommunityReport>> {
        Sourced::fallback(fallback::community_reports())
    }

    pub fn pest_gallery(&self, filter: &GalleryFilter) -> Sourced<Vec<PestGalleryEntry>> {
        let entries = fallback::pest_gallery().into_iter().filter(|e| filter.matches(e)).collect();
        Sourced::fallback(entries)
    }
}
