use std::{path::PathBuf, sync::Arc};

use agri_core::{
    ApiClient, CancelToken, Config, DashboardAggregator, FileStore, KeyValueStore, ProviderId, Session,
    Transport,
    geo::{FixedLocation, Location, LocationSource, ProfileLocation},
    model::SoilMetrics,
    provider::default_provider_from_config,
    service::{
        CropPredictionRequest, CropYieldService, DashboardService, DetectionRequest, FertilizerRequest,
        IrrigationParams, IrrigationService, PestDetectionService, PestVerdict, ProfitableCropsService,
        SoilAnalysisRequest, SoilHealthService, WeatherService, YieldRequest,
        pest_detection::{EnvironmentalData, GalleryFilter},
    },
};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use inquire::{Confirm, CustomType, Password, Select, Text};

use crate::output::{self, render};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "agri", version, about = "Farming assistant dashboard")]
pub struct Cli {
    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively set the backend URL, weather provider and home position.
    Configure,

    /// Store a session token issued by the backend.
    Login { token: String },

    /// Forget the stored session.
    Logout,

    /// Show the signed-in user.
    Whoami,

    /// Weather, yield, soil and irrigation at a glance.
    Dashboard,

    /// Current weather at your position.
    Weather,

    #[command(subcommand)]
    Yield(YieldCommand),

    #[command(subcommand)]
    Soil(SoilCommand),

    #[command(subcommand)]
    Pest(PestCommand),

    #[command(subcommand)]
    Crops(CropsCommand),

    /// Irrigation advice for a field. Requires `agri login`.
    Irrigation(IrrigationArgs),
}

#[derive(Debug, Subcommand)]
pub enum YieldCommand {
    /// Forecast for the sample farm.
    Latest,
    /// Forecast for your own inputs.
    Predict(YieldArgs),
}

#[derive(Debug, Args)]
pub struct YieldArgs {
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    district: Option<String>,
    #[arg(long)]
    crop: Option<String>,
    #[arg(long)]
    year: Option<String>,
    #[arg(long)]
    season: Option<String>,
    /// Hectares.
    #[arg(long)]
    area: Option<f64>,
}

#[derive(Debug, Subcommand)]
pub enum SoilCommand {
    /// Latest readings from the backend.
    Current,
    /// Analyze your saved readings.
    Analyze,
    /// Fertilizer suggestion for your saved readings.
    Fertilizer {
        #[arg(long, default_value = "wheat")]
        crop: String,
    },
    #[command(subcommand)]
    Metrics(MetricsCommand),
}

#[derive(Debug, Subcommand)]
pub enum MetricsCommand {
    Show,
    /// Update saved readings; unspecified values are kept.
    Set(MetricsArgs),
}

#[derive(Debug, Args)]
pub struct MetricsArgs {
    #[arg(long)]
    nitrogen: Option<f64>,
    #[arg(long)]
    phosphorus: Option<f64>,
    #[arg(long)]
    potassium: Option<f64>,
    #[arg(long)]
    ph: Option<f64>,
    #[arg(long)]
    organic_matter: Option<f64>,
    #[arg(long)]
    moisture: Option<f64>,
    #[arg(long)]
    temperature: Option<f64>,
    #[arg(long)]
    humidity: Option<f64>,
    #[arg(long)]
    soil_type: Option<String>,
}

impl MetricsArgs {
    fn apply(self, m: &mut SoilMetrics) {
        let set = |slot: &mut f64, value: Option<f64>| {
            if let Some(v) = value {
                *slot = v;
            }
        };
        set(&mut m.nitrogen, self.nitrogen);
        set(&mut m.phosphorus, self.phosphorus);
        set(&mut m.potassium, self.potassium);
        set(&mut m.ph, self.ph);
        set(&mut m.organic_matter, self.organic_matter);
        set(&mut m.moisture, self.moisture);
        set(&mut m.temperature, self.temperature);
        set(&mut m.humidity, self.humidity);
        if let Some(soil_type) = self.soil_type {
            m.soil_type = soil_type;
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum PestCommand {
    /// Classify a leaf or pest photo.
    Analyze {
        image: PathBuf,
        #[arg(long, default_value = "tomato")]
        crop: String,
        #[arg(long)]
        location: Option<String>,
    },
    /// Raw disease classification for a photo.
    Detect {
        image: PathBuf,
        #[arg(long, default_value = "tomato")]
        crop: String,
        #[arg(long)]
        location: Option<String>,
        /// Use the base64 upload endpoint.
        #[arg(long)]
        base64: bool,
    },
    /// Diseases the detection model knows.
    Diseases,
    /// Detection model details.
    Model,
    /// Common pests, optionally filtered.
    Gallery {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        symptom: Option<String>,
    },
    /// Recent sightings reported by nearby farms.
    Reports,
    /// Pest risk implied by current weather.
    Risk,
    /// Treatment plan for a known pest.
    Treatment {
        pest: String,
        #[arg(long, default_value = "medium")]
        severity: String,
    },
    /// Forecast pest risk from environmental readings.
    PredictRisk {
        #[arg(long)]
        temperature: f64,
        #[arg(long)]
        humidity: f64,
        #[arg(long, default_value_t = 0.0)]
        rainfall: f64,
        #[arg(long)]
        crop: String,
        #[arg(long)]
        growth_stage: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum CropsCommand {
    Available,
    /// Market price trends.
    Trends,
    /// Most profitable crops for a field.
    Predict {
        #[arg(long)]
        state: String,
        #[arg(long)]
        season: String,
        /// Hectares.
        #[arg(long)]
        area: f64,
        #[arg(long)]
        district: Option<String>,
        #[arg(long)]
        soil_type: Option<String>,
        #[arg(long)]
        water: Option<String>,
        #[arg(long)]
        budget: Option<f64>,
    },
}

#[derive(Debug, Args)]
pub struct IrrigationArgs {
    #[arg(long)]
    crop: Option<String>,
    /// Percent.
    #[arg(long)]
    moisture: Option<f64>,
    /// Hectares.
    #[arg(long)]
    field_size: Option<f64>,
    #[arg(long)]
    soil_type: Option<String>,
}

impl From<IrrigationArgs> for IrrigationParams {
    fn from(args: IrrigationArgs) -> Self {
        let defaults = IrrigationParams::default();
        IrrigationParams {
            crop_type: args.crop.unwrap_or(defaults.crop_type),
            soil_moisture: args.moisture.unwrap_or(defaults.soil_moisture),
            field_size: args.field_size.unwrap_or(defaults.field_size),
            soil_type: args.soil_type.unwrap_or(defaults.soil_type),
            location: None,
        }
    }
}

/// Everything a command needs, built once per invocation.
struct App {
    config: Config,
    store: Arc<dyn KeyValueStore>,
    session: Arc<Session>,
    transport: Arc<dyn Transport>,
    cancel: CancelToken,
    json: bool,
}

impl App {
    fn open(json: bool, cancel: CancelToken) -> anyhow::Result<Self> {
        let config = Config::load()?;
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open_default()?);
        let session = Arc::new(Session::restore(store.as_ref()));
        let transport: Arc<dyn Transport> = Arc::new(ApiClient::new(config.backend_url(), session.clone()));

        tracing::debug!(backend = %config.backend_url(), authenticated = session.is_authenticated(), "client ready");

        Ok(Self { config, store, session, transport, cancel, json })
    }

    fn location_source(&self) -> Arc<dyn LocationSource> {
        match self.config.geolocation.home {
            Some(home) => Arc::new(FixedLocation(home)),
            None => Arc::new(ProfileLocation::new(self.store.clone())),
        }
    }

    fn weather(&self) -> anyhow::Result<WeatherService> {
        let provider = default_provider_from_config(&self.config, self.transport.clone())?;
        Ok(WeatherService::new(provider)
            .with_location_source(self.location_source())
            .with_geolocation_timeout(self.config.geolocation_timeout()))
    }

    fn soil(&self) -> SoilHealthService {
        SoilHealthService::new(self.transport.clone()).with_store(self.store.clone())
    }

    fn pests(&self) -> PestDetectionService {
        PestDetectionService::new(self.transport.clone())
    }

    fn crops(&self) -> ProfitableCropsService {
        ProfitableCropsService::new(self.transport.clone())
    }

    /// Saved readings, or the defaults if none were saved.
    fn saved_metrics(&self) -> anyhow::Result<SoilMetrics> {
        Ok(self.soil().saved_metrics()?.unwrap_or_default())
    }
}

impl Cli {
    pub async fn run(self, cancel: CancelToken) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            command => App::open(self.json, cancel)?.dispatch(command).await,
        }
    }
}

impl App {
    async fn dispatch(&self, command: Command) -> anyhow::Result<()> {
        let json = self.json;
        let cancel = &self.cancel;

        match command {
            Command::Configure => configure()?,

            Command::Login { token } => {
                let user = self.session.login(&token, self.store.as_ref()).context("Failed to sign in")?;
                match user {
                    Some(user) => println!("Signed in as {} <{}>", user.name, user.email),
                    None => println!("Signed in (token carries no user details)"),
                }
            }

            Command::Logout => {
                self.session.logout(self.store.as_ref()).context("Failed to sign out")?;
                println!("Signed out");
            }

            Command::Whoami => {
                let user = self.session.current_user();
                render(json, &user, |u| output::user(u, self.session.is_authenticated()))?;
            }

            Command::Dashboard => {
                let aggregator = DashboardAggregator::new(
                    self.weather()?,
                    CropYieldService::new(self.transport.clone()),
                    DashboardService::new(self.transport.clone()),
                );
                let composite = aggregator.composite(cancel).await;
                render(json, &composite, output::dashboard)?;
            }

            Command::Weather => {
                let report = self.weather()?.current(cancel).await;
                render(json, &report, output::weather)?;
            }

            Command::Yield(cmd) => run_yield(self, cmd).await?,
            Command::Soil(cmd) => run_soil(self, cmd).await?,
            Command::Pest(cmd) => run_pest(self, cmd).await?,
            Command::Crops(cmd) => run_crops(self, cmd).await?,

            Command::Irrigation(args) => {
                let svc = IrrigationService::new(self.transport.clone(), self.session.clone())
                    .with_store(self.store.clone());
                let rec = svc
                    .recommendation(&args.into(), cancel)
                    .await
                    .context("Failed to get irrigation recommendation")?;
                render(json, &rec, output::irrigation)?;
            }
        }

        Ok(())
    }
}

async fn run_yield(app: &App, cmd: YieldCommand) -> anyhow::Result<()> {
    let svc = CropYieldService::new(app.transport.clone());

    match cmd {
        YieldCommand::Latest => {
            let latest = svc.latest(&app.cancel).await;
            render(app.json, &latest, |l| output::yield_prediction(&l.value, Some(l.source)))
        }
        YieldCommand::Predict(args) => {
            let request = YieldRequest {
                state: args.state,
                district: args.district,
                crop: args.crop,
                year: args.year,
                season: args.season,
                area: args.area,
            };
            let prediction = svc.predict(&request, &app.cancel).await.context("Failed to predict yield")?;
            render(app.json, &prediction, |p| output::yield_prediction(p, None))
        }
    }
}

async fn run_soil(app: &App, cmd: SoilCommand) -> anyhow::Result<()> {
    let svc = app.soil();

    match cmd {
        SoilCommand::Current => {
            let current = svc.current(&app.cancel).await;
            render(app.json, &current, |c| output::soil_metrics(&c.value, Some(c.source)))
        }
        SoilCommand::Analyze => {
            let request = SoilAnalysisRequest::from(&app.saved_metrics()?);
            let analysis = svc.analyze(&request, &app.cancel).await.context("Failed to analyze soil")?;
            render(app.json, &analysis, output::soil_analysis)
        }
        SoilCommand::Fertilizer { crop } => {
            let request = FertilizerRequest::from_metrics(crop, &app.saved_metrics()?);
            let rec = svc
                .fertilizer_recommendation(&request, &app.cancel)
                .await
                .context("Failed to get fertilizer recommendation")?;
            render(app.json, &rec, output::fertilizer)
        }
        SoilCommand::Metrics(MetricsCommand::Show) => {
            let metrics = app.saved_metrics()?;
            render(app.json, &metrics, |m| output::soil_metrics(m, None))
        }
        SoilCommand::Metrics(MetricsCommand::Set(args)) => {
            let mut metrics = app.saved_metrics()?;
            args.apply(&mut metrics);
            svc.save_metrics(&metrics).context("Failed to save soil readings")?;
            render(app.json, &metrics, |m| output::soil_metrics(m, None))
        }
    }
}

async fn run_pest(app: &App, cmd: PestCommand) -> anyhow::Result<()> {
    let svc = app.pests();

    match cmd {
        PestCommand::Analyze { image, crop, location } => {
            let bytes = std::fs::read(&image).with_context(|| format!("Failed to read {}", image.display()))?;
            let request = DetectionRequest::from_image_bytes(&bytes, crop, location);
            let verdict = svc.analyze_pest_image(&request, &app.cancel).await.context("Failed to analyze image")?;
            let plan = svc.treatment_recommendations(&verdict);
            render(app.json, &(&verdict, &plan), |(v, p)| output::verdict(v, p))
        }
        PestCommand::Detect { image, crop, location, base64 } => {
            let bytes = std::fs::read(&image).with_context(|| format!("Failed to read {}", image.display()))?;
            let request = DetectionRequest::from_image_bytes(&bytes, crop, location);
            let detection = if base64 {
                svc.detect_disease_base64(&request, &app.cancel).await
            } else {
                svc.detect_disease(&request, &app.cancel).await
            };
            let detection = detection.context("Failed to detect disease")?;
            render(app.json, &detection, output::detection)
        }
        PestCommand::Diseases => {
            let names = svc.supported_diseases(&app.cancel).await.context("Failed to load supported diseases")?;
            render(app.json, &names, |n| output::names("Supported diseases", n))
        }
        PestCommand::Model => {
            let info = svc.model_info(&app.cancel).await.context("Failed to load model details")?;
            render(app.json, &info, output::model_info)
        }
        PestCommand::Gallery { name, symptom } => {
            let entries = svc.pest_gallery(&GalleryFilter { name, symptom });
            render(app.json, &entries, output::gallery)
        }
        PestCommand::Reports => render(app.json, &svc.community_reports(), output::community_reports),
        PestCommand::Risk => render(app.json, &svc.weather_risk(), output::weather_risk),
        PestCommand::Treatment { pest, severity } => {
            let verdict = PestVerdict {
                pest_detected: true,
                pest_type: pest,
                confidence: 100.0,
                severity,
                crop_type: String::new(),
            };
            render(app.json, &svc.treatment_recommendations(&verdict), output::treatment)
        }
        PestCommand::PredictRisk { temperature, humidity, rainfall, crop, growth_stage } => {
            let data = EnvironmentalData { temperature, humidity, rainfall, crop_type: crop, growth_stage };
            let risk = svc.predict_pest_risk(&data, &app.cancel).await.context("Failed to predict pest risk")?;
            render(app.json, &risk, output::pest_risk)
        }
    }
}

async fn run_crops(app: &App, cmd: CropsCommand) -> anyhow::Result<()> {
    let svc = app.crops();

    match cmd {
        CropsCommand::Available => {
            let crops = svc.available_crops(&app.cancel).await.context("Failed to load available crops")?;
            render(app.json, &crops, |c| output::names("Available crops", c))
        }
        CropsCommand::Trends => {
            let trends = svc.market_trends(&app.cancel).await.context("Failed to load market trends")?;
            println!("{}", serde_json::to_string_pretty(&trends)?);
            Ok(())
        }
        CropsCommand::Predict { state, season, area, district, soil_type, water, budget } => {
            let request = CropPredictionRequest {
                state,
                district,
                season,
                area,
                soil_type,
                water_availability: water,
                budget,
            };
            let summary = svc
                .predict_profitable_crops(&request, &app.cancel)
                .await
                .context("Failed to predict profitable crops")?;
            render(app.json, &summary, output::profitable_crops)
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    config.backend.base_url = Text::new("Backend URL:").with_default(&config.backend.base_url).prompt()?;

    let current = config.default_provider_id()?;
    let start = ProviderId::all().iter().position(|id| *id == current).unwrap_or(0);
    let provider = Select::new("Weather provider:", ProviderId::all().to_vec())
        .with_starting_cursor(start)
        .prompt()?;

    if provider.requires_api_key() {
        let key = Password::new(&format!("API key for {provider}:")).without_confirmation().prompt()?;
        config.upsert_provider_api_key(provider, key);
    }
    config.set_default_provider(provider);

    if Confirm::new("Use a fixed home position for weather?").with_default(config.geolocation.home.is_some()).prompt()? {
        let home = config.geolocation.home.unwrap_or(Location::DEFAULT);
        let latitude = CustomType::<f64>::new("Latitude:").with_default(home.latitude).prompt()?;
        let longitude = CustomType::<f64>::new("Longitude:").with_default(home.longitude).prompt()?;
        config.geolocation.home = Some(Location::new(latitude, longitude));
    } else {
        config.geolocation.home = None;
    }

    config.save()?;
    println!("Saved {}", Config::config_file_path()?.display());

    Ok(())
}
