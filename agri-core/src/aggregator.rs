//! Dashboard composite: weather, yield and soil fetched concurrently, with
//! irrigation derived from the soil section.
//!
//! Sections fail independently. A failed fetch leaves its slot `None`; it
//! never takes the other sections down with it and is never replaced by
//! mock data here.

use crate::{
    cancel::CancelToken,
    error::ClientResult,
    model::{DashboardComposite, IrrigationSummary},
    service::{CropYieldService, DashboardService, WeatherService},
};

#[derive(Debug)]
pub struct DashboardAggregator {
    weather: WeatherService,
    yields: CropYieldService,
    dashboard: DashboardService,
}

impl DashboardAggregator {
    pub fn new(weather: WeatherService, yields: CropYieldService, dashboard: DashboardService) -> Self {
        Self { weather, yields, dashboard }
    }

    pub async fn composite(&self, cancel: &CancelToken) -> DashboardComposite {
        if cancel.is_cancelled() {
            tracing::debug!("dashboard fetch cancelled before start");
            return DashboardComposite::unavailable();
        }

        let (weather, yield_prediction, soil) = tokio::join!(
            self.weather.try_current(cancel),
            self.yields.try_latest(cancel),
            self.dashboard.soil(cancel),
        );

        let weather = settle("weather", weather);
        let yield_prediction = settle("yield", yield_prediction);
        let soil = settle("soil", soil);

        DashboardComposite {
            weather,
            yield_prediction,
            irrigation: soil.as_ref().map(IrrigationSummary::from_soil),
            soil,
        }
    }
}

fn settle<T>(section: &'static str, result: ClientResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(section, error = %err, "dashboard section unavailable");
            None
        }
    }
}
