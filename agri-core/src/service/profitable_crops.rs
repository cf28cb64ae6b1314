use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    cancel::CancelToken,
    error::ClientResult,
    http::{Transport, decode, unwrap_envelope},
};

use super::{NameList, report};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CropPredictionRequest {
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    pub season: String,
    /// Hectares.
    pub area: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_availability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropOption {
    pub crop_name: String,
    #[serde(default)]
    pub roi_percentage: f64,
    #[serde(default)]
    pub net_profit: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropPrediction {
    #[serde(default)]
    pub profitable_crops: Vec<CropOption>,
    #[serde(default)]
    pub model_used: Option<String>,
}

/// Best option first, with the full list alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitableCropsSummary {
    pub top_crop: Option<String>,
    pub expected_roi: f64,
    /// `None` when there is nothing to recommend.
    pub net_profit: Option<f64>,
    pub options: Vec<CropOption>,
    pub model_used: String,
}

impl From<CropPrediction> for ProfitableCropsSummary {
    fn from(prediction: CropPrediction) -> Self {
        match prediction.profitable_crops.first() {
            Some(top) => ProfitableCropsSummary {
                top_crop: Some(top.crop_name.clone()),
                expected_roi: top.roi_percentage,
                net_profit: top.net_profit,
                model_used: prediction.model_used.unwrap_or_else(|| "Unknown".to_string()),
                options: prediction.profitable_crops,
            },
            None => ProfitableCropsSummary {
                top_crop: None,
                expected_roi: 0.0,
                net_profit: None,
                options: Vec::new(),
                model_used: "Rule-based".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProfitableCropsService {
    transport: Arc<dyn Transport>,
}

impl ProfitableCropsService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn available_crops(&self, cancel: &CancelToken) -> ClientResult<Vec<String>> {
        let res = self.transport.get("/api/profitable-crops/available-crops", &[], cancel).await;
        let res = res.and_then(|raw| decode::<NameList>(raw, "available crops")).map(NameList::into_names);
        report("available crops", res)
    }

    /// Market trends; the payload shape is owned by the backend.
    pub async fn market_trends(&self, cancel: &CancelToken) -> ClientResult<Value> {
        let res = self.transport.get("/api/profitable-crops/market-trends", &[], cancel).await;
        report("market trends", res.and_then(unwrap_envelope))
    }

    pub async fn predict_multiple(
        &self,
        request: &CropPredictionRequest,
        cancel: &CancelToken,
    ) -> ClientResult<CropPrediction> {
        let res: ClientResult<CropPrediction> = async {
            let body = serde_json::to_value(request)?;
            let raw = self.transport.post("/api/profitable-crops/predict-multiple", &body, cancel).await?;
            decode(raw, "profitable crops")
        }
        .await;

        report("predict profitable crops", res)
    }

    /// Prediction reduced to its top option.
    pub async fn predict_profitable_crops(
        &self,
        request: &CropPredictionRequest,
        cancel: &CancelToken,
    ) -> ClientResult<ProfitableCropsSummary> {
        self.predict_multiple(request, cancel).await.map(ProfitableCropsSummary::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubTransport;
    use serde_json::json;

    fn request() -> CropPredictionRequest {
        CropPredictionRequest {
            state: "Karnataka".into(),
            season: "Kharif".into(),
            area: 2.0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn summary_takes_first_option() {
        let stub = StubTransport::new().with_ok(
            "/api/profitable-crops/predict-multiple",
            json!({"profitable_crops": [
                {"crop_name": "Turmeric", "roi_percentage": 142.0, "net_profit": 310000.0, "market_price": 9000},
                {"crop_name": "Maize", "roi_percentage": 60.0}
            ], "model_used": "XGBoost"}),
        );
        let summary = ProfitableCropsService::new(Arc::new(stub))
            .predict_profitable_crops(&request(), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(summary.top_crop.as_deref(), Some("Turmeric"));
        assert_eq!(summary.expected_roi, 142.0);
        assert_eq!(summary.net_profit, Some(310000.0));
        assert_eq!(summary.options.len(), 2);
        assert_eq!(summary.options[0].extra["market_price"], json!(9000));
        assert_eq!(summary.model_used, "XGBoost");
    }

    #[tokio::test]
    async fn empty_prediction_uses_rule_based_defaults() {
        let stub = StubTransport::new()
            .with_ok("/api/profitable-crops/predict-multiple", json!({"profitable_crops": [], "model_used": "ML"}));
        let summary = ProfitableCropsService::new(Arc::new(stub))
            .predict_profitable_crops(&request(), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(summary.top_crop, None);
        assert_eq!(summary.expected_roi, 0.0);
        assert_eq!(summary.net_profit, None);
        assert_eq!(summary.model_used, "Rule-based");
    }

    #[tokio::test]
    async fn prediction_failure_propagates() {
        let svc = ProfitableCropsService::new(Arc::new(StubTransport::failing(500)));
        assert!(svc.predict_profitable_crops(&request(), &CancelToken::new()).await.is_err());
        assert!(svc.available_crops(&CancelToken::new()).await.is_err());
    }

    #[tokio::test]
    async fn reads_unwrap_payloads() {
        let stub = StubTransport::new()
            .with_ok("/api/profitable-crops/available-crops", json!({"success": true, "data": {"crops": ["Rice", "Cotton"]}}))
            .with_ok("/api/profitable-crops/market-trends", json!({"success": true, "data": [{"crop": "Rice"}]}));
        let svc = ProfitableCropsService::new(Arc::new(stub));

        assert_eq!(svc.available_crops(&CancelToken::new()).await.unwrap(), ["Rice", "Cotton"]);
        assert_eq!(svc.market_trends(&CancelToken::new()).await.unwrap(), json!([{"crop": "Rice"}]));
    }

    #[test]
    fn optional_fields_are_omitted() {
        let body = serde_json::to_value(request()).unwrap();
        assert!(body.get("budget").is_none());
        assert_eq!(body["state"], json!("Karnataka"));
    }
}
