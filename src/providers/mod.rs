//! # Condition Providers
//!
//! The scoring core never performs I/O itself. Everything it needs for a
//! date comes through a [`ConditionsProvider`], injected into the scheduler.
//! Tests inject in-memory providers; the binary injects [`LiveProvider`].
//!
//! ## Live Sources
//! - **Tide and currents**: NOAA CO-OPS data getter ([`noaa`])
//! - **Wind**: OpenWeatherMap 5 day / 3 hour forecast ([`weather`])
//! - **Ferries**: published timetable from configuration ([`ferry`])
//!
//! All HTTP goes through one `reqwest::Client` owned by the provider, built
//! with the configured timeout. There is no process-wide client and no
//! response caching.

pub mod ferry;
pub mod noaa;
pub mod weather;

use crate::config::Config;
use crate::payload::{CurrentRecord, FerryRecord, TideRecord, WindRecord};
use crate::ProviderKind;
use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate};
use thiserror::Error;

/// Errors that can occur while fetching raw records from a provider.
///
/// Every variant is recoverable at the scheduler: the affected date is
/// reported as data unavailable and the remaining dates carry on.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request failed (network, server, or protocol error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider did not answer within the configured bound
    #[error("{provider} fetch timed out after {secs}s")]
    Timeout { provider: ProviderKind, secs: u64 },

    /// The provider answered with an error message of its own
    #[error("{provider} provider error: {message}")]
    Api {
        provider: ProviderKind,
        message: String,
    },

    /// Response body did not have the expected shape
    #[error("{provider} response could not be parsed: {message}")]
    Parse {
        provider: ProviderKind,
        message: String,
    },

    #[error("no API key configured for the {0} provider")]
    MissingApiKey(ProviderKind),
}

impl FetchError {
    pub(crate) fn parse(provider: ProviderKind, message: impl Into<String>) -> Self {
        FetchError::Parse {
            provider,
            message: message.into(),
        }
    }
}

/// Source of raw condition records for one local date.
///
/// `offset` is the UTC offset of the sampling grid for that date; records may
/// carry any offset, the normalizer converts them.
#[async_trait]
pub trait ConditionsProvider: Send + Sync {
    async fn fetch_tide(
        &self,
        date: NaiveDate,
        offset: FixedOffset,
    ) -> Result<Vec<TideRecord>, FetchError>;

    async fn fetch_currents(
        &self,
        date: NaiveDate,
        offset: FixedOffset,
    ) -> Result<Vec<CurrentRecord>, FetchError>;

    /// Wind from the weather forecast for the launch site.
    async fn fetch_wind(
        &self,
        date: NaiveDate,
        offset: FixedOffset,
    ) -> Result<Vec<WindRecord>, FetchError>;

    async fn fetch_ferries(
        &self,
        date: NaiveDate,
        offset: FixedOffset,
    ) -> Result<Vec<FerryRecord>, FetchError>;
}

/// Provider backed by the real upstream services.
pub struct LiveProvider {
    noaa: noaa::NoaaClient,
    weather: weather::OpenWeatherClient,
    ferries: ferry::TimetableFerrySchedule,
}

impl LiveProvider {
    /// Build all clients from configuration, sharing one HTTP client.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.schedule.fetch_timeout())
            .user_agent(concat!("kayak-launch-planner/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(LiveProvider {
            noaa: noaa::NoaaClient::new(client.clone(), &config.station),
            weather: weather::OpenWeatherClient::new(
                client,
                &config.station,
                config.weather.resolved_api_key(),
            ),
            ferries: ferry::TimetableFerrySchedule::new(config.ferry.clone()),
        })
    }
}

#[async_trait]
impl ConditionsProvider for LiveProvider {
    async fn fetch_tide(
        &self,
        date: NaiveDate,
        offset: FixedOffset,
    ) -> Result<Vec<TideRecord>, FetchError> {
        self.noaa.tide_predictions(date, offset).await
    }

    async fn fetch_currents(
        &self,
        date: NaiveDate,
        offset: FixedOffset,
    ) -> Result<Vec<CurrentRecord>, FetchError> {
        self.noaa.current_predictions(date, offset).await
    }

    async fn fetch_wind(
        &self,
        date: NaiveDate,
        offset: FixedOffset,
    ) -> Result<Vec<WindRecord>, FetchError> {
        self.weather.wind_forecast(date, offset).await
    }

    async fn fetch_ferries(
        &self,
        date: NaiveDate,
        offset: FixedOffset,
    ) -> Result<Vec<FerryRecord>, FetchError> {
        self.ferries.sailings(date, offset)
    }
}
