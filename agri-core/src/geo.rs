use std::{fmt::Debug, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{ClientError, ClientResult},
    storage::{KEY_USER_PROFILE, KeyValueStore, get_json},
};

pub const DEFAULT_GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// New Delhi; used whenever no position can be obtained.
    pub const DEFAULT: Location = Location { latitude: 28.6139, longitude: 77.2090 };

    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Something that can tell us where the user is.
#[async_trait]
pub trait LocationSource: Send + Sync + Debug {
    async fn current_position(&self) -> ClientResult<Location>;
}

/// Resolve the user's position, racing the source against `timeout`.
///
/// Never fails: a missing source, an error, or a timeout all yield
/// [`Location::DEFAULT`].
pub async fn resolve_location(source: Option<&dyn LocationSource>, timeout: Duration) -> Location {
    let Some(source) = source else {
        tracing::debug!("geolocation unavailable, using default location");
        return Location::DEFAULT;
    };

    match tokio::time::timeout(timeout, source.current_position()).await {
        Ok(Ok(location)) => location,
        Ok(Err(err)) => {
            tracing::debug!(error = %err, "geolocation failed, using default location");
            Location::DEFAULT
        }
        Err(_) => {
            tracing::debug!(?timeout, "geolocation timed out, using default location");
            Location::DEFAULT
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Location);

#[async_trait]
impl LocationSource for FixedLocation {
    async fn current_position(&self) -> ClientResult<Location> {
        Ok(self.0)
    }
}

/// Position stored in the user's profile (`lat`/`lon`).
#[derive(Debug, Clone)]
pub struct ProfileLocation {
    store: Arc<dyn KeyValueStore>,
}

impl ProfileLocation {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn lookup(&self) -> ClientResult<Option<Location>> {
        let profile: Option<Value> = get_json(self.store.as_ref(), KEY_USER_PROFILE)?;
        Ok(profile.and_then(|p| {
            let lat = p.get("lat").and_then(Value::as_f64)?;
            let lon = p.get("lon").and_then(Value::as_f64)?;
            Some(Location::new(lat, lon))
        }))
    }
}

#[async_trait]
impl LocationSource for ProfileLocation {
    async fn current_position(&self) -> ClientResult<Location> {
        self.lookup()?
            .ok_or_else(|| ClientError::Storage("user profile has no coordinates".into()))
    }
}
