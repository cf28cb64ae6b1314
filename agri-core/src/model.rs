//! Normalized records shared between façades, the aggregator and callers.

use serde::{Deserialize, Serialize};

/// Where a value came from: the backend, or the fallback supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    #[serde(rename = "API")]
    Api,
    #[serde(rename = "Default")]
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sourced<T> {
    pub value: T,
    pub source: DataSource,
}

impl<T> Sourced<T> {
    pub fn api(value: T) -> Self {
        Self { value, source: DataSource::Api }
    }

    pub fn fallback(value: T) -> Self {
        Self { value, source: DataSource::Default }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == DataSource::Default
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Degrees Celsius, rounded.
    pub temperature: i32,
    pub condition: String,
    pub description: String,
    /// Percent.
    pub humidity: u8,
    /// km/h, rounded.
    pub wind_speed: i32,
    /// km, rounded.
    pub visibility: i32,
    /// mm over the last hour.
    pub rainfall: f64,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub lat: f64,
    pub lon: f64,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub current: WeatherSnapshot,
    pub user_location: UserLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldPrediction {
    /// Tons per hectare.
    pub predicted_yield: f64,
    /// Tons.
    pub total_production: f64,
    pub confidence: f64,
    pub category: String,
    pub crop: String,
    pub state: String,
    pub season: String,
    pub recommendations: Vec<String>,
}

/// User-editable soil readings, also cached locally under `userSoilMetrics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoilMetrics {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub ph: f64,
    pub organic_matter: f64,
    pub moisture: f64,
    pub temperature: f64,
    #[serde(rename = "soilType", alias = "soil_type")]
    pub soil_type: String,
    pub humidity: f64,
}

impl Default for SoilMetrics {
    fn default() -> Self {
        Self {
            nitrogen: 45.0,
            phosphorus: 28.0,
            potassium: 35.0,
            ph: 6.8,
            organic_matter: 3.2,
            moisture: 32.0,
            temperature: 25.0,
            soil_type: "loam".to_string(),
            humidity: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    PhManagement,
    NutrientManagement,
    WaterManagement,
    #[serde(other)]
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    PhAdjustment,
    Fertilizer,
    Irrigation,
    #[serde(other)]
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Low,
    #[serde(other)]
    Medium,
}

impl Priority {
    /// Priority implied by an overall soil health verdict.
    pub fn from_health_status(status: &str) -> Self {
        match status {
            "Poor" => Priority::High,
            "Fair" => Priority::Medium,
            _ => Priority::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilRecommendation {
    pub title: String,
    pub description: String,
    pub category: RecommendationCategory,
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub priority: Priority,
}

impl SoilRecommendation {
    pub fn mentions_irrigation(&self) -> bool {
        self.title.to_lowercase().contains("irrigation")
    }
}

/// Recommendation as the backend sends it: either free text or a
/// structured record. Free text has no title.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawRecommendation {
    Text(String),
    Structured {
        #[serde(default)]
        title: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        category: Option<RecommendationCategory>,
        #[serde(default, rename = "type")]
        kind: Option<RecommendationKind>,
        #[serde(default)]
        priority: Option<Priority>,
    },
}

impl RawRecommendation {
    /// Free text is never classified; it lands in `General`.
    pub(crate) fn normalize(self, default_priority: Priority) -> SoilRecommendation {
        match self {
            RawRecommendation::Text(text) => SoilRecommendation {
                title: String::new(),
                description: text,
                category: RecommendationCategory::General,
                kind: RecommendationKind::General,
                priority: default_priority,
            },
            RawRecommendation::Structured { title, description, category, kind, priority } => {
                SoilRecommendation {
                    description: description.unwrap_or_else(|| title.clone()),
                    title,
                    category: category.unwrap_or(RecommendationCategory::General),
                    kind: kind.unwrap_or(RecommendationKind::General),
                    priority: priority.unwrap_or(default_priority),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilAnalysis {
    pub health_status: String,
    pub overall_score: f64,
    pub deficiencies: Vec<String>,
    pub recommendations: Vec<SoilRecommendation>,
    pub improvements: Vec<String>,
}

/// Soil section of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilSnapshot {
    #[serde(flatten)]
    pub metrics: SoilMetrics,
    pub health_status: Option<String>,
    pub recommendations: Vec<SoilRecommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrrigationSummary {
    pub soil_moisture: f64,
    pub recommendations: Vec<SoilRecommendation>,
}

impl IrrigationSummary {
    /// Irrigation view derived from the soil section.
    pub fn from_soil(soil: &SoilSnapshot) -> Self {
        Self {
            soil_moisture: soil.metrics.moisture,
            recommendations: soil
                .recommendations
                .iter()
                .filter(|r| r.mentions_irrigation())
                .cloned()
                .collect(),
        }
    }
}

/// Dashboard view model. A `None` slot means that section could not be
/// fetched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardComposite {
    pub weather: Option<WeatherReport>,
    #[serde(rename = "yield")]
    pub yield_prediction: Option<YieldPrediction>,
    pub irrigation: Option<IrrigationSummary>,
    pub soil: Option<SoilSnapshot>,
}

impl DashboardComposite {
    pub fn unavailable() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_recommendations_are_not_classified() {
        let raw: RawRecommendation = serde_json::from_value(json!("Apply lime to raise pH")).unwrap();
        let rec = raw.normalize(Priority::from_health_status("Poor"));

        assert_eq!(rec.category, RecommendationCategory::General);
        assert_eq!(rec.kind, RecommendationKind::General);
        assert_eq!(rec.priority, Priority::High);
        assert_eq!(rec.title, "");
        assert_eq!(rec.description, "Apply lime to raise pH");
    }

    #[test]
    fn structured_recommendations_keep_backend_fields() {
        let raw: RawRecommendation = serde_json::from_value(json!({
            "title": "Irrigation schedule",
            "category": "water_management",
            "type": "irrigation",
            "priority": "low"
        }))
        .unwrap();
        let rec = raw.normalize(Priority::High);

        assert_eq!(rec.category, RecommendationCategory::WaterManagement);
        assert_eq!(rec.kind, RecommendationKind::Irrigation);
        assert_eq!(rec.priority, Priority::Low);
        assert_eq!(rec.description, "Irrigation schedule");
    }

    #[test]
    fn unknown_enum_values_degrade() {
        let raw: RawRecommendation = serde_json::from_value(json!({
            "title": "x", "category": "soil_magic", "type": "dance", "priority": "urgent"
        }))
        .unwrap();
        let rec = raw.normalize(Priority::Low);

        assert_eq!(rec.category, RecommendationCategory::General);
        assert_eq!(rec.kind, RecommendationKind::General);
        assert_eq!(rec.priority, Priority::Medium);
    }

    #[test]
    fn priority_from_health_status() {
        assert_eq!(Priority::from_health_status("Poor"), Priority::High);
        assert_eq!(Priority::from_health_status("Fair"), Priority::Medium);
        assert_eq!(Priority::from_health_status("Good"), Priority::Low);
    }

    #[test]
    fn irrigation_summary_filters_titles_case_insensitively() {
        let rec = |title: &str| {
            let raw: RawRecommendation = serde_json::from_value(json!({"title": title})).unwrap();
            raw.normalize(Priority::Low)
        };
        let soil = SoilSnapshot {
            metrics: SoilMetrics { moisture: 18.0, ..SoilMetrics::default() },
            health_status: None,
            recommendations: vec![rec("Increase IRRIGATION frequency"), rec("Add compost"), rec("Drip irrigation")],
        };

        let summary = IrrigationSummary::from_soil(&soil);
        assert_eq!(summary.soil_moisture, 18.0);
        let titles: Vec<_> = summary.recommendations.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["Increase IRRIGATION frequency", "Drip irrigation"]);
    }

    #[test]
    fn irrigation_summary_skips_free_text() {
        let text: RawRecommendation = serde_json::from_value(json!("Switch to drip irrigation")).unwrap();
        let soil = SoilSnapshot {
            metrics: SoilMetrics::default(),
            health_status: None,
            recommendations: vec![text.normalize(Priority::Medium)],
        };

        assert!(IrrigationSummary::from_soil(&soil).recommendations.is_empty());
    }

    #[test]
    fn composite_serializes_yield_key() {
        let v = serde_json::to_value(DashboardComposite::unavailable()).unwrap();
        assert_eq!(v, json!({"weather": null, "yield": null, "irrigation": null, "soil": null}));
    }

    #[test]
    fn source_tags_serialize_as_labels() {
        assert_eq!(serde_json::to_value(DataSource::Api).unwrap(), json!("API"));
        assert_eq!(serde_json::to_value(DataSource::Default).unwrap(), json!("Default"));
    }
}
