//! Human-readable rendering of core results.

use agri_core::{
    DataSource, Sourced, UserProfile, WeatherReport,
    model::{DashboardComposite, IrrigationSummary, SoilAnalysis, SoilMetrics, SoilRecommendation, SoilSnapshot, YieldPrediction},
    service::{
        IrrigationRecommendation, PestVerdict, ProfitableCropsSummary,
        pest_detection::{CommunityReport, DiseaseDetection, ModelInfo, PestGalleryEntry, PestRisk, TreatmentPlan, WeatherRisk},
        soil_health::{FertilizerRecommendation, MetricStatus, assess},
    },
};
use chrono::DateTime;
use serde::Serialize;

/// Print `value` as pretty JSON, or through `human`.
pub fn render<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T)) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

fn source_note(source: DataSource) -> &'static str {
    match source {
        DataSource::Api => "",
        DataSource::Default => " (sample data)",
    }
}

pub fn weather(report: &Sourced<WeatherReport>) {
    let w = &report.value.current;
    println!("Weather in {}{}", w.location, source_note(report.source));
    println!("  {}°C, {} ({})", w.temperature, w.condition, w.description);
    println!("  Humidity {}%  Wind {} km/h  Visibility {} km  Rain {:.1} mm", w.humidity, w.wind_speed, w.visibility, w.rainfall);
    let at = &report.value.user_location;
    println!("  Position {:.4}, {:.4}", at.lat, at.lon);
}

pub fn yield_prediction(prediction: &YieldPrediction, source: Option<DataSource>) {
    println!(
        "Yield forecast: {} / {} / {}{}",
        prediction.crop,
        prediction.state,
        prediction.season,
        source.map(source_note).unwrap_or_default()
    );
    println!("  {:.2} t/ha, {:.1} t total", prediction.predicted_yield, prediction.total_production);
    println!("  Category {}  Confidence {:.0}%", prediction.category, prediction.confidence);
    bullets(&prediction.recommendations);
}

fn status_mark(status: MetricStatus) -> &'static str {
    match status {
        MetricStatus::Good => "ok",
        MetricStatus::Warning => "warn",
        MetricStatus::Critical => "CRIT",
    }
}

pub fn soil_metrics(metrics: &SoilMetrics, source: Option<DataSource>) {
    println!("Soil readings ({}){}", metrics.soil_type, source.map(source_note).unwrap_or_default());
    for (kind, value, status) in assess(metrics) {
        println!("  {:<16} {:>7.1} {:<6} [{}]", kind.label(), value, kind.unit(), status_mark(status));
    }
}

fn recommendations(recs: &[SoilRecommendation]) {
    for r in recs {
        let priority = serde_json::to_value(r.priority).ok();
        let priority = priority.as_ref().and_then(|p| p.as_str()).unwrap_or("-");
        if r.title.is_empty() {
            println!("  - [{priority}] {}", r.description);
            continue;
        }
        println!("  - [{priority}] {}", r.title);
        if r.description != r.title {
            println!("      {}", r.description);
        }
    }
}

pub fn soil_analysis(analysis: &SoilAnalysis) {
    println!("Soil health: {} (score {:.0})", analysis.health_status, analysis.overall_score);
    if !analysis.deficiencies.is_empty() {
        println!("  Deficiencies: {}", analysis.deficiencies.join(", "));
    }
    recommendations(&analysis.recommendations);
    if !analysis.improvements.is_empty() {
        println!("  Expected improvements:");
        bullets(&analysis.improvements);
    }
}

pub fn fertilizer(rec: &FertilizerRecommendation) {
    println!("Recommended fertilizer: {} ({:.0}% confidence)", rec.fertilizer, rec.confidence);
    if let Some(rate) = &rec.application_rate {
        println!("  Application rate: {rate}");
    }
    bullets(&rec.recommendations);
}

fn soil_section(soil: &SoilSnapshot) {
    let status = soil.health_status.as_deref().unwrap_or("n/a");
    println!("Soil: moisture {:.1}%  pH {:.1}  health {status}", soil.metrics.moisture, soil.metrics.ph);
    recommendations(&soil.recommendations);
}

fn irrigation_section(irrigation: &IrrigationSummary) {
    println!("Irrigation: soil moisture {:.1}%", irrigation.soil_moisture);
    if irrigation.recommendations.is_empty() {
        println!("  No irrigation actions suggested");
    }
    recommendations(&irrigation.recommendations);
}

pub fn dashboard(composite: &DashboardComposite) {
    match &composite.weather {
        Some(report) => weather(&Sourced::api(report.clone())),
        None => println!("Weather: unavailable"),
    }
    println!();
    match &composite.yield_prediction {
        Some(prediction) => yield_prediction(prediction, None),
        None => println!("Yield forecast: unavailable"),
    }
    println!();
    match &composite.soil {
        Some(soil) => soil_section(soil),
        None => println!("Soil: unavailable"),
    }
    println!();
    match &composite.irrigation {
        Some(irrigation) => irrigation_section(irrigation),
        None => println!("Irrigation: unavailable"),
    }
}

pub fn irrigation(rec: &IrrigationRecommendation) {
    if rec.should_irrigate {
        println!("Irrigation recommended");
        println!("  {:.0} mm at {}", rec.irrigation_amount_mm, rec.irrigation_time);
    } else {
        println!("No irrigation needed");
    }
    println!("  Soil moisture: {}", rec.soil_moisture_status);
    println!("  Next check in {} days", rec.next_check_interval_days);
    println!("  {}", rec.reason);
    if let Some(w) = &rec.weather_data {
        println!("  Weather: {:.0}°C, {:.0}% humidity, {}", w.temperature, w.humidity, w.weather_condition);
    }
}

pub fn verdict(verdict: &PestVerdict, plan: &TreatmentPlan) {
    if verdict.pest_detected {
        println!(
            "{} detected on {} ({:.0}% confidence, {} severity)",
            verdict.pest_type, verdict.crop_type, verdict.confidence, verdict.severity
        );
    } else {
        println!("No pest detected on {} ({:.0}% confidence)", verdict.crop_type, verdict.confidence);
    }
    treatment(plan);
}

pub fn detection(detection: &DiseaseDetection) {
    println!("{} ({:.0}% confidence)", detection.prediction, detection.confidence);
    if let Some(description) = &detection.description {
        println!("  {description}");
    }
    bullets(&detection.recommendations);
}

pub fn treatment(plan: &TreatmentPlan) {
    println!("Treatment for {} ({}):", plan.pest_type, plan.severity);
    bullets(&plan.recommendations);
    println!("Prevention:");
    bullets(&plan.preventive_measures);
}

pub fn weather_risk(risk: &Sourced<WeatherRisk>) {
    println!("Pest risk from weather: {}{}", risk.value.risk_level, source_note(risk.source));
    bullets(&risk.value.conditions);
    println!("Recommended:");
    bullets(&risk.value.recommendations);
}

pub fn pest_risk(risk: &PestRisk) {
    match risk.risk_score {
        Some(score) => println!("Pest risk: {} ({score:.2})", risk.risk_level),
        None => println!("Pest risk: {}", risk.risk_level),
    }
    if !risk.likely_pests.is_empty() {
        println!("  Likely: {}", risk.likely_pests.join(", "));
    }
    bullets(&risk.recommendations);
}

pub fn community_reports(reports: &Sourced<Vec<CommunityReport>>) {
    println!("Community pest reports{}", source_note(reports.source));
    for r in &reports.value {
        let date = DateTime::parse_from_rfc3339(&r.date)
            .map(|d| d.format("%d %b %Y").to_string())
            .unwrap_or_else(|_| r.date.clone());
        println!("  #{} {} at {}: {} severity, {date}", r.id, r.pest_type, r.location, r.severity);
    }
}

pub fn gallery(entries: &Sourced<Vec<PestGalleryEntry>>) {
    if entries.value.is_empty() {
        println!("No matching pests");
    }
    for e in &entries.value {
        println!("{}: {}", e.name, e.description);
        println!("  Symptoms: {}", e.symptoms.join(", "));
    }
}

pub fn model_info(info: &ModelInfo) {
    println!("Model: {}", info.name.as_deref().unwrap_or("unknown"));
    if let Some(version) = &info.version {
        println!("  Version {version}");
    }
    if let Some(accuracy) = info.accuracy {
        println!("  Accuracy {accuracy}");
    }
    for (key, value) in &info.extra {
        println!("  {key}: {value}");
    }
}

pub fn names(title: &str, names: &[String]) {
    println!("{title} ({})", names.len());
    bullets(names);
}

pub fn profitable_crops(summary: &ProfitableCropsSummary) {
    match &summary.top_crop {
        Some(top) => println!("Most profitable: {top} (ROI {:.1}%)", summary.expected_roi),
        None => println!("No profitable crop found"),
    }
    if let Some(profit) = summary.net_profit {
        println!("  Net profit {profit:.0}");
    }
    for option in summary.options.iter().skip(1) {
        println!("  - {} (ROI {:.1}%)", option.crop_name, option.roi_percentage);
    }
    println!("  Model: {}", summary.model_used);
}

pub fn user(user: &UserProfile, authenticated: bool) {
    println!("{} <{}>", user.name, user.email);
    println!("  Phone {}", user.phone);
    println!("  {}", if authenticated { "Signed in" } else { "Not signed in" });
}

fn bullets(lines: &[String]) {
    for line in lines {
        println!("  - {line}");
    }
}
