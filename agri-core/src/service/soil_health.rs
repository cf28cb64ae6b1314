use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    cancel::CancelToken,
    error::{ClientError, ClientResult},
    fallback,
    http::{Transport, decode},
    model::{Priority, RawRecommendation, SoilAnalysis, SoilMetrics, Sourced},
    storage::{KEY_SOIL_METRICS, KeyValueStore, get_json, set_json},
};

use super::{or_fallback, report};

const DEFAULT_ORGANIC_MATTER: f64 = 3.0;

/// Readings submitted for analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilAnalysisRequest {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub ph: f64,
    pub organic_matter: Option<f64>,
    pub moisture: f64,
    pub temperature: f64,
}

impl From<&SoilMetrics> for SoilAnalysisRequest {
    fn from(m: &SoilMetrics) -> Self {
        Self {
            nitrogen: m.nitrogen,
            phosphorus: m.phosphorus,
            potassium: m.potassium,
            ph: m.ph,
            organic_matter: Some(m.organic_matter),
            moisture: m.moisture,
            temperature: m.temperature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilizerRequest {
    pub crop_type: String,
    pub soil_type: String,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub moisture: f64,
}

impl FertilizerRequest {
    pub fn from_metrics(crop_type: impl Into<String>, m: &SoilMetrics) -> Self {
        Self {
            crop_type: crop_type.into(),
            soil_type: m.soil_type.clone(),
            nitrogen: m.nitrogen,
            phosphorus: m.phosphorus,
            potassium: m.potassium,
            temperature: m.temperature,
            humidity: m.humidity,
            moisture: m.moisture,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilizerRecommendation {
    #[serde(alias = "recommended_fertilizer")]
    pub fertilizer: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub application_rate: Option<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    health_status: Option<String>,
    #[serde(default)]
    overall_score: f64,
    #[serde(default)]
    deficiencies: Vec<String>,
    #[serde(default)]
    recommendations: Vec<RawRecommendation>,
    #[serde(default)]
    improvements: Vec<String>,
}

impl From<RawAnalysis> for SoilAnalysis {
    fn from(raw: RawAnalysis) -> Self {
        let health_status = raw.health_status.unwrap_or_else(|| "Unknown".to_string());
        let priority = Priority::from_health_status(&health_status);

        SoilAnalysis {
            recommendations: raw.recommendations.into_iter().map(|r| r.normalize(priority)).collect(),
            health_status,
            overall_score: raw.overall_score,
            deficiencies: raw.deficiencies,
            improvements: raw.improvements,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoilMetricKind {
    Nitrogen,
    Phosphorus,
    Potassium,
    Ph,
    OrganicMatter,
    Moisture,
    Temperature,
    Humidity,
}

impl SoilMetricKind {
    pub const ALL: [SoilMetricKind; 8] = [
        SoilMetricKind::Nitrogen,
        SoilMetricKind::Phosphorus,
        SoilMetricKind::Potassium,
        SoilMetricKind::Ph,
        SoilMetricKind::Temperature,
        SoilMetricKind::Moisture,
        SoilMetricKind::OrganicMatter,
        SoilMetricKind::Humidity,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SoilMetricKind::Nitrogen => "Nitrogen (N)",
            SoilMetricKind::Phosphorus => "Phosphorus (P)",
            SoilMetricKind::Potassium => "Potassium (K)",
            SoilMetricKind::Ph => "pH Level",
            SoilMetricKind::OrganicMatter => "Organic Matter",
            SoilMetricKind::Moisture => "Moisture",
            SoilMetricKind::Temperature => "Temperature",
            SoilMetricKind::Humidity => "Humidity",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            SoilMetricKind::Nitrogen | SoilMetricKind::Phosphorus | SoilMetricKind::Potassium => "kg/ha",
            SoilMetricKind::Ph => "",
            SoilMetricKind::Temperature => "°C",
            SoilMetricKind::OrganicMatter | SoilMetricKind::Moisture | SoilMetricKind::Humidity => "%",
        }
    }

    pub fn value_in(&self, m: &SoilMetrics) -> f64 {
        match self {
            SoilMetricKind::Nitrogen => m.nitrogen,
            SoilMetricKind::Phosphorus => m.phosphorus,
            SoilMetricKind::Potassium => m.potassium,
            SoilMetricKind::Ph => m.ph,
            SoilMetricKind::OrganicMatter => m.organic_matter,
            SoilMetricKind::Moisture => m.moisture,
            SoilMetricKind::Temperature => m.temperature,
            SoilMetricKind::Humidity => m.humidity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricStatus {
    Good,
    Warning,
    Critical,
}

/// Threshold check for a single reading.
pub fn classify_metric(kind: SoilMetricKind, value: f64) -> MetricStatus {
    use MetricStatus::*;

    match kind {
        SoilMetricKind::Nitrogen if value < 30.0 => Critical,
        SoilMetricKind::Nitrogen if value < 50.0 => Warning,
        SoilMetricKind::Phosphorus if value < 15.0 => Critical,
        SoilMetricKind::Phosphorus if value < 25.0 => Warning,
        SoilMetricKind::Temperature if !(10.0..=35.0).contains(&value) => Critical,
        SoilMetricKind::Temperature if !(15.0..=30.0).contains(&value) => Warning,
        SoilMetricKind::Humidity if !(20.0..=80.0).contains(&value) => Critical,
        SoilMetricKind::Humidity if !(30.0..=70.0).contains(&value) => Warning,
        SoilMetricKind::Ph if !(6.0..=7.5).contains(&value) => Warning,
        SoilMetricKind::Moisture if value < 20.0 => Critical,
        SoilMetricKind::Moisture if value < 40.0 => Warning,
        _ => Good,
    }
}

/// Status of every reading in `metrics`, in display order.
pub fn assess(metrics: &SoilMetrics) -> Vec<(SoilMetricKind, f64, MetricStatus)> {
    SoilMetricKind::ALL
        .iter()
        .map(|kind| {
            let value = kind.value_in(metrics);
            (*kind, value, classify_metric(*kind, value))
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct SoilHealthService {
    transport: Arc<dyn Transport>,
    store: Option<Arc<dyn KeyValueStore>>,
}

impl SoilHealthService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport, store: None }
    }

    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Current readings, or the default metrics tagged as such.
    pub async fn current(&self, cancel: &CancelToken) -> Sourced<SoilMetrics> {
        let res = self.transport.get("/api/soil-health/current", &[], cancel).await;
        let res = res.and_then(|raw| decode::<SoilMetrics>(raw, "current soil data"));
        or_fallback("current soil data", res, fallback::soil_metrics)
    }

    /// Analyze user-submitted readings. Failures propagate.
    pub async fn analyze(&self, request: &SoilAnalysisRequest, cancel: &CancelToken) -> ClientResult<SoilAnalysis> {
        let mut request = request.clone();
        request.organic_matter.get_or_insert(DEFAULT_ORGANIC_MATTER);

        let res: ClientResult<SoilAnalysis> = async {
            let body = serde_json::to_value(&request)?;
            let raw: Value = self.transport.post("/api/soil-health/analyze", &body, cancel).await?;
            decode::<RawAnalysis>(raw, "soil analysis").map(SoilAnalysis::from)
        }
        .await;

        report("analyze soil health", res)
    }

    pub async fn fertilizer_recommendation(
        &self,
        request: &FertilizerRequest,
        cancel: &CancelToken,
    ) -> ClientResult<FertilizerRecommendation> {
        let res: ClientResult<FertilizerRecommendation> = async {
            let body = serde_json::to_value(request)?;
            let raw = self.transport.post("/api/soil-health/fertilizer-recommendation", &body, cancel).await?;
            decode::<FertilizerRecommendation>(raw, "fertilizer recommendation")
        }
        .await;

        report("fertilizer recommendation", res)
    }

    fn store(&self) -> ClientResult<&dyn KeyValueStore> {
        self.store
            .as_deref()
            .ok_or_else(|| ClientError::Storage("no local store configured".into()))
    }

    /// Locally saved readings, if the user has edited any.
    pub fn saved_metrics(&self) -> ClientResult<Option<SoilMetrics>> {
        get_json(self.store()?, KEY_SOIL_METRICS)
    }

    pub fn save_metrics(&self, metrics: &SoilMetrics) -> ClientResult<()> {
        set_json(self.store()?, KEY_SOIL_METRICS, metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{DataSource, RecommendationCategory},
        storage::MemoryStore,
        testing::{StubTransport, keys_of},
    };
    use serde_json::json;

    #[test]
    fn thresholds() {
        use MetricStatus::*;
        use SoilMetricKind::*;

        assert_eq!(classify_metric(Nitrogen, 29.0), Critical);
        assert_eq!(classify_metric(Nitrogen, 45.0), Warning);
        assert_eq!(classify_metric(Nitrogen, 50.0), Good);
        assert_eq!(classify_metric(Phosphorus, 20.0), Warning);
        assert_eq!(classify_metric(Temperature, 36.0), Critical);
        assert_eq!(classify_metric(Temperature, 32.0), Warning);
        assert_eq!(classify_metric(Temperature, 25.0), Good);
        assert_eq!(classify_metric(Humidity, 85.0), Critical);
        assert_eq!(classify_metric(Humidity, 25.0), Warning);
        assert_eq!(classify_metric(Ph, 5.5), Warning);
        assert_eq!(classify_metric(Ph, 6.8), Good);
        assert_eq!(classify_metric(Moisture, 15.0), Critical);
        assert_eq!(classify_metric(Moisture, 32.0), Warning);
        assert_eq!(classify_metric(Potassium, 1.0), Good);
    }

    #[test]
    fn assess_covers_every_metric() {
        let statuses = assess(&SoilMetrics::default());
        assert_eq!(statuses.len(), 8);
        assert!(statuses.contains(&(SoilMetricKind::Nitrogen, 45.0, MetricStatus::Warning)));
    }

    #[tokio::test]
    async fn current_tags_source() {
        let stub = StubTransport::new()
            .with_ok("/api/soil-health/current", json!({"nitrogen": 60, "moisture": 41}));
        let live = SoilHealthService::new(Arc::new(stub)).current(&CancelToken::new()).await;
        assert_eq!(live.source, DataSource::Api);
        assert_eq!(live.value.nitrogen, 60.0);
        assert_eq!(live.value.phosphorus, 28.0);

        let down = SoilHealthService::new(Arc::new(StubTransport::failing(502))).current(&CancelToken::new()).await;
        assert_eq!(down.source, DataSource::Default);
        assert_eq!(down.value, SoilMetrics::default());
        assert_eq!(keys_of(&live.value), keys_of(&down.value));
    }

    #[tokio::test]
    async fn analyze_fills_organic_matter_and_normalizes() {
        let stub = Arc::new(StubTransport::new().with_ok(
            "/api/soil-health/analyze",
            json!({"health_status": "Poor", "overall_score": 41.5,
                   "deficiencies": ["Nitrogen"],
                   "recommendations": ["Apply urea", {"title": "Lime", "category": "ph_management"}]}),
        ));
        let svc = SoilHealthService::new(stub.clone());
        let request = SoilAnalysisRequest { organic_matter: None, ..SoilAnalysisRequest::from(&SoilMetrics::default()) };

        let analysis = svc.analyze(&request, &CancelToken::new()).await.unwrap();
        assert_eq!(analysis.health_status, "Poor");
        assert_eq!(analysis.recommendations[0].priority, Priority::High);
        assert_eq!(analysis.recommendations[1].category, RecommendationCategory::PhManagement);
        assert!(analysis.improvements.is_empty());

        let body = stub.calls()[0].body.clone().unwrap();
        assert_eq!(body["organic_matter"], json!(3.0));
    }

    #[tokio::test]
    async fn analyze_on_http_500_rejects() {
        let svc = SoilHealthService::new(Arc::new(StubTransport::failing(500)));
        let request = SoilAnalysisRequest::from(&SoilMetrics::default());

        let err = svc.analyze(&request, &CancelToken::new()).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn fertilizer_accepts_alias_and_propagates() {
        let stub = StubTransport::new().with_ok(
            "/api/soil-health/fertilizer-recommendation",
            json!({"success": true, "data": {"recommended_fertilizer": "DAP", "confidence": 0.91}}),
        );
        let request = FertilizerRequest::from_metrics("Rice", &SoilMetrics::default());

        let rec = SoilHealthService::new(Arc::new(stub))
            .fertilizer_recommendation(&request, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(rec.fertilizer, "DAP");

        let failing = SoilHealthService::new(Arc::new(StubTransport::offline()));
        assert!(failing.fertilizer_recommendation(&request, &CancelToken::new()).await.is_err());
    }

    #[test]
    fn metrics_roundtrip_through_store() {
        let svc = SoilHealthService::new(Arc::new(StubTransport::new())).with_store(Arc::new(MemoryStore::new()));
        assert_eq!(svc.saved_metrics().unwrap(), None);

        let metrics = SoilMetrics { moisture: 12.0, soil_type: "clay".into(), ..SoilMetrics::default() };
        svc.save_metrics(&metrics).unwrap();
        assert_eq!(svc.saved_metrics().unwrap(), Some(metrics));
    }

    #[test]
    fn metrics_without_store_is_an_error() {
        let svc = SoilHealthService::new(Arc::new(StubTransport::new()));
        assert!(matches!(svc.saved_metrics(), Err(ClientError::Storage(_))));
    }
}
