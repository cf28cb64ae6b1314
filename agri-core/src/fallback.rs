//! Deterministic stand-in payloads for reads whose real source is
//! unavailable. Each one has exactly the shape of a successful response.

use crate::{
    geo::Location,
    model::{SoilMetrics, UserLocation, WeatherReport, WeatherSnapshot, YieldPrediction},
    service::pest_detection::{CommunityReport, PestGalleryEntry, TreatmentPlan, WeatherRisk},
};

pub fn weather_report() -> WeatherReport {
    WeatherReport {
        current: WeatherSnapshot {
            temperature: 25,
            condition: "Clear".to_string(),
            description: "clear sky (mock data)".to_string(),
            humidity: 65,
            wind_speed: 12,
            visibility: 10,
            rainfall: 0.0,
            location: "Mock Location".to_string(),
        },
        user_location: UserLocation {
            lat: Location::DEFAULT.latitude,
            lon: Location::DEFAULT.longitude,
            region: "Unknown".to_string(),
        },
    }
}

pub fn yield_prediction() -> YieldPrediction {
    YieldPrediction {
        predicted_yield: 4.2,
        total_production: 168.0,
        confidence: 87.0,
        category: "High".to_string(),
        crop: "Rice".to_string(),
        state: "Maharashtra".to_string(),
        season: "Kharif".to_string(),
        recommendations: vec![
            "Maintain optimal irrigation schedule".to_string(),
            "Monitor for pest activity".to_string(),
            "Apply balanced NPK fertilizer".to_string(),
        ],
    }
}

pub fn soil_metrics() -> SoilMetrics {
    SoilMetrics::default()
}

pub fn weather_risk() -> WeatherRisk {
    WeatherRisk {
        risk_level: "medium".to_string(),
        conditions: vec!["High humidity".to_string(), "Moderate temperature".to_string()],
        recommendations: vec![
            "Monitor crops regularly".to_string(),
            "Apply preventive measures".to_string(),
        ],
    }
}

pub fn community_reports() -> Vec<CommunityReport> {
    vec![CommunityReport {
        id: 1,
        location: "Farm A".to_string(),
        pest_type: "Aphids".to_string(),
        severity: "high".to_string(),
        date: "2024-01-01T00:00:00Z".to_string(),
    }]
}

pub fn pest_gallery() -> Vec<PestGalleryEntry> {
    vec![
        PestGalleryEntry {
            id: 1,
            name: "Aphids".to_string(),
            image: "/images/aphids.jpg".to_string(),
            description: "Small sap-sucking insects".to_string(),
            symptoms: vec!["Yellowing leaves".to_string(), "Stunted growth".to_string()],
        },
        PestGalleryEntry {
            id: 2,
            name: "Leaf Spot".to_string(),
            image: "/images/leaf-spot.jpg".to_string(),
            description: "Fungal disease causing spots on leaves".to_string(),
            symptoms: vec!["Brown spots on leaves".to_string(), "Leaf yellowing".to_string()],
        },
    ]
}

pub fn treatment_plan(pest_type: &str, severity: &str) -> TreatmentPlan {
    TreatmentPlan {
        pest_type: pest_type.to_string(),
        severity: severity.to_string(),
        recommendations: vec![
            "Apply appropriate pesticide".to_string(),
            "Monitor crop regularly".to_string(),
            "Remove affected plant parts".to_string(),
        ],
        preventive_measures: vec![
            "Crop rotation".to_string(),
            "Proper irrigation".to_string(),
            "Regular field monitoring".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payloads_are_deterministic() {
        let a = serde_json::to_string(&(weather_report(), yield_prediction(), community_reports())).unwrap();
        let b = serde_json::to_string(&(weather_report(), yield_prediction(), community_reports())).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn mock_weather_sits_at_default_location() {
        let report = weather_report();
        assert_eq!(report.user_location.lat, 28.6139);
        assert_eq!(report.user_location.lon, 77.2090);
    }

    #[test]
    fn mock_yield_has_three_recommendations() {
        assert_eq!(yield_prediction().recommendations.len(), 3);
    }
}
