//! Domain façades over the dashboard backend.
//!
//! Read operations with a fallback return [`Sourced`](crate::Sourced) values
//! and never fail. Every other operation propagates a [`ClientError`] after
//! logging it.

use serde::Deserialize;

use crate::{
    error::{ClientError, ClientResult},
    model::Sourced,
};

pub mod crop_yield;
pub mod dashboard;
pub mod irrigation;
pub mod pest_detection;
pub mod profitable_crops;
pub mod soil_health;
pub mod weather;

pub use crop_yield::{CropYieldService, YieldRequest};
pub use dashboard::DashboardService;
pub use irrigation::{IrrigationParams, IrrigationRecommendation, IrrigationService};
pub use pest_detection::{DetectionRequest, DiseaseDetection, PestDetectionService, PestVerdict};
pub use profitable_crops::{CropPredictionRequest, ProfitableCropsService, ProfitableCropsSummary};
pub use soil_health::{FertilizerRequest, MetricStatus, SoilAnalysisRequest, SoilHealthService, SoilMetricKind};
pub use weather::WeatherService;

/// Log a failed operation and hand the result back unchanged.
pub(crate) fn report<T>(operation: &'static str, result: ClientResult<T>) -> ClientResult<T> {
    if let Err(err) = &result {
        match err {
            ClientError::Cancelled => tracing::debug!(operation, "cancelled"),
            _ => tracing::error!(operation, error = %err, "operation failed"),
        }
    }
    result
}

/// Substitute fallback data for a failed read.
pub(crate) fn or_fallback<T>(
    operation: &'static str,
    result: ClientResult<T>,
    fallback: impl FnOnce() -> T,
) -> Sourced<T> {
    match result {
        Ok(value) => Sourced::api(value),
        Err(ClientError::Cancelled) => {
            tracing::debug!(operation, "cancelled, substituting fallback data");
            Sourced::fallback(fallback())
        }
        Err(err) => {
            tracing::warn!(operation, error = %err, "unavailable, substituting fallback data");
            Sourced::fallback(fallback())
        }
    }
}

/// A list of names as the backend may send it: bare strings, objects with a
/// `name`, or either of those wrapped under a key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum NameList {
    Plain(Vec<NameEntry>),
    Wrapped(std::collections::HashMap<String, Vec<NameEntry>>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum NameEntry {
    Name(String),
    Named { name: String },
}

impl NameList {
    pub(crate) fn into_names(self) -> Vec<String> {
        let entries = match self {
            NameList::Plain(entries) => entries,
            // single-key wrapper such as {"crops": [...]}
            NameList::Wrapped(map) => map.into_values().next().unwrap_or_default(),
        };

        entries
            .into_iter()
            .map(|e| match e {
                NameEntry::Name(name) | NameEntry::Named { name } => name,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn name_list_shapes() {
        let plain: NameList = serde_json::from_value(json!(["Rice", "Wheat"])).unwrap();
        assert_eq!(plain.into_names(), ["Rice", "Wheat"]);

        let named: NameList = serde_json::from_value(json!([{"name": "Blight", "id": 3}])).unwrap();
        assert_eq!(named.into_names(), ["Blight"]);

        let wrapped: NameList = serde_json::from_value(json!({"crops": ["Maize"]})).unwrap();
        assert_eq!(wrapped.into_names(), ["Maize"]);
    }

    #[test]
    fn or_fallback_tags_source() {
        let ok = or_fallback("op", Ok(1), || 0);
        assert!(!ok.is_fallback());
        assert_eq!(ok.value, 1);

        let failed = or_fallback("op", Err(ClientError::Network("down".into())), || 0);
        assert!(failed.is_fallback());
        assert_eq!(failed.value, 0);
    }
}
