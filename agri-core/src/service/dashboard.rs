use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::{
    cancel::CancelToken,
    error::ClientResult,
    http::{Transport, decode, unwrap_envelope},
    model::{Priority, RawRecommendation, SoilMetrics, SoilSnapshot},
};

use super::report;

#[derive(Debug, Clone)]
pub struct DashboardService {
    transport: Arc<dyn Transport>,
}

#[derive(Debug, Deserialize)]
struct RawSoil {
    #[serde(flatten)]
    metrics: SoilMetrics,
    #[serde(default)]
    health_status: Option<String>,
    #[serde(default)]
    recommendations: Vec<RawRecommendation>,
}

impl From<RawSoil> for SoilSnapshot {
    fn from(raw: RawSoil) -> Self {
        let priority = Priority::from_health_status(raw.health_status.as_deref().unwrap_or_default());
        SoilSnapshot {
            metrics: raw.metrics,
            health_status: raw.health_status,
            recommendations: raw.recommendations.into_iter().map(|r| r.normalize(priority)).collect(),
        }
    }
}

impl DashboardService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Overview payload; its shape is owned by the backend.
    pub async fn overview(&self, cancel: &CancelToken) -> ClientResult<Value> {
        let res = self.transport.get("/api/dashboard/overview", &[], cancel).await;
        report("dashboard overview", res.and_then(unwrap_envelope))
    }

    pub async fn stats(&self, cancel: &CancelToken) -> ClientResult<Value> {
        let res = self.transport.get("/api/dashboard/stats", &[], cancel).await;
        report("dashboard stats", res.and_then(unwrap_envelope))
    }

    /// Soil section; missing readings take the default soil metrics.
    /// Failures are returned unlogged, the aggregator reports them.
    pub async fn soil(&self, cancel: &CancelToken) -> ClientResult<SoilSnapshot> {
        let raw = self.transport.get("/api/dashboard/soil", &[], cancel).await?;
        decode::<RawSoil>(raw, "dashboard soil").map(SoilSnapshot::from)
    }
}
