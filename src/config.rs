//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! `launch-config.toml` file. It covers the launch site and its NOAA stations,
//! the safety thresholds the rule evaluator applies, scheduling limits, the
//! weather API key and the ferry timetable.
//!
//! Every section falls back to defaults field by field, so a config file only
//! needs the values that differ from the Point White launch defaults.

use crate::units::BearingRange;
use crate::{Factor, LaunchError};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "launch-config.toml";

/// Application configuration loaded from launch-config.toml
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Launch site and NOAA station configuration
    pub station: StationConfig,
    /// Safety rule thresholds
    pub thresholds: ThresholdConfig,
    /// Sampling grid and fetch limits
    pub schedule: ScheduleConfig,
    /// Weather forecast API configuration
    pub weather: WeatherConfig,
    /// Ferry timetable near the launch site
    pub ferry: FerryConfig,
}

/// Launch site location and the NOAA stations that describe it
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StationConfig {
    /// Human-readable launch site name
    pub name: String,
    /// NOAA tide prediction station ID (e.g., "9447130" for Seattle)
    pub tide_station_id: String,
    /// NOAA current prediction station ID (e.g., "PCT1641_17" for Rich Passage)
    pub current_station_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Fixed UTC offset for the sampling grid. When absent the system local
    /// offset in effect at noon of each evaluated date is used.
    pub utc_offset_minutes: Option<i32>,
}

impl Default for StationConfig {
    fn default() -> Self {
        StationConfig {
            name: "Point White Drive NE, Bainbridge Island".to_string(),
            tide_station_id: "9447130".to_string(),
            current_station_id: "PCT1641_17".to_string(),
            latitude: 47.5980,
            longitude: -122.5307,
            utc_offset_minutes: None,
        }
    }
}

/// Relative importance of each factor in the composite score
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FactorWeights {
    pub tide: f64,
    pub current: f64,
    pub wind: f64,
    pub ferry: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        FactorWeights {
            tide: 0.25,
            current: 0.25,
            wind: 0.25,
            ferry: 0.25,
        }
    }
}

impl FactorWeights {
    pub fn weight(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Tide => self.tide,
            Factor::Current => self.current,
            Factor::Wind => self.wind,
            Factor::Ferry => self.ferry,
        }
    }

    pub fn total(&self) -> f64 {
        Factor::ALL.iter().map(|f| self.weight(*f)).sum()
    }
}

/// Thresholds applied by the safety rule evaluator.
///
/// Hard limits decide pass/fail. Comfort bands sit inside the hard limits
/// and only shape the score of passing readings.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Below this height (ft, MLLW) the launch beach is obstructed
    pub tide_min: f64,
    /// Above this height (ft, MLLW) the access path is submerged
    pub tide_max: f64,
    pub tide_comfort_min: f64,
    pub tide_comfort_max: f64,
    /// Feet past a tide limit at which severity saturates
    pub tide_severity_span_ft: f64,

    pub current_max_knots: f64,
    pub current_comfort_max_knots: f64,
    pub current_severity_span_knots: f64,

    /// Sustained wind limit from any direction
    pub wind_max_knots: f64,
    pub wind_comfort_max_knots: f64,
    /// Bearings (wind from) with long fetch across open water
    pub wind_exposed_bearings: Vec<BearingRange>,
    /// Lower limit applied when the wind comes from an exposed bearing
    pub wind_exposed_secondary_max: f64,
    pub wind_severity_span_knots: f64,

    /// Minutes either side of a ferry event that fail the ferry factor
    pub ferry_buffer_minutes: u32,
    /// Only events at this terminal count; `None` counts every terminal
    pub ferry_terminal: Option<String>,

    /// Runs of suitable timestamps shorter than this are discarded
    pub min_window_duration_minutes: u32,
    pub factor_weights: FactorWeights,

    pub rating_optimal_min: f64,
    pub rating_acceptable_min: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        ThresholdConfig {
            tide_min: 2.0,
            tide_max: 10.0,
            tide_comfort_min: 4.0,
            tide_comfort_max: 8.0,
            tide_severity_span_ft: 4.0,
            current_max_knots: 2.0,
            current_comfort_max_knots: 1.5,
            current_severity_span_knots: 2.0,
            wind_max_knots: 13.0,
            wind_comfort_max_knots: 7.0,
            // Southerly fetch down Rich Passage and across the Sound
            wind_exposed_bearings: vec![BearingRange::new(135.0, 225.0)],
            wind_exposed_secondary_max: 8.0,
            wind_severity_span_knots: 10.0,
            ferry_buffer_minutes: 10,
            ferry_terminal: None,
            min_window_duration_minutes: 30,
            factor_weights: FactorWeights::default(),
            rating_optimal_min: 0.8,
            rating_acceptable_min: 0.6,
        }
    }
}

impl ThresholdConfig {
    pub fn min_window_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.min_window_duration_minutes))
    }

    /// Check internal consistency of the thresholds.
    pub fn validate(&self) -> Result<(), LaunchError> {
        let all_finite = [
            self.tide_min,
            self.tide_max,
            self.tide_comfort_min,
            self.tide_comfort_max,
            self.tide_severity_span_ft,
            self.current_max_knots,
            self.current_comfort_max_knots,
            self.current_severity_span_knots,
            self.wind_max_knots,
            self.wind_comfort_max_knots,
            self.wind_exposed_secondary_max,
            self.wind_severity_span_knots,
            self.rating_optimal_min,
            self.rating_acceptable_min,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !all_finite {
            return Err(invalid("thresholds must be finite numbers"));
        }
        if self.tide_min > self.tide_max {
            return Err(invalid("tide_min must not exceed tide_max"));
        }
        if !(self.tide_min <= self.tide_comfort_min
            && self.tide_comfort_min <= self.tide_comfort_max
            && self.tide_comfort_max <= self.tide_max)
        {
            return Err(invalid("tide comfort band must lie within tide_min..tide_max"));
        }
        if self.current_comfort_max_knots > self.current_max_knots {
            return Err(invalid("current comfort limit exceeds current_max_knots"));
        }
        if self.wind_comfort_max_knots > self.wind_max_knots {
            return Err(invalid("wind comfort limit exceeds wind_max_knots"));
        }
        if self.wind_exposed_secondary_max > self.wind_max_knots {
            return Err(invalid("wind_exposed_secondary_max exceeds wind_max_knots"));
        }
        if self.current_max_knots < 0.0 || self.wind_max_knots < 0.0 {
            return Err(invalid("speed limits must not be negative"));
        }
        if self.tide_severity_span_ft <= 0.0
            || self.current_severity_span_knots <= 0.0
            || self.wind_severity_span_knots <= 0.0
        {
            return Err(invalid("severity spans must be positive"));
        }
        let weights = &self.factor_weights;
        if Factor::ALL.iter().any(|f| weights.weight(*f) < 0.0) || weights.total() <= 0.0 {
            return Err(invalid("factor weights must be non-negative with a positive total"));
        }
        if self.rating_acceptable_min > self.rating_optimal_min {
            return Err(invalid("rating_acceptable_min exceeds rating_optimal_min"));
        }
        Ok(())
    }
}

/// Sampling and fetch limits for the scheduler
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Sampling grid interval in minutes
    pub interval_minutes: u32,
    /// Upper bound on each provider call
    pub fetch_timeout_secs: u64,
    /// Dates fetched and evaluated at the same time
    pub max_concurrent_days: usize,
    /// Number of days in the weekly overview
    pub week_length: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            interval_minutes: 10,
            fetch_timeout_secs: 5,
            max_concurrent_days: 7,
            week_length: 7,
        }
    }
}

impl ScheduleConfig {
    pub fn fetch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// OpenWeatherMap forecast settings
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// API key; the OPENWEATHER_API_KEY environment variable takes precedence
    pub api_key: Option<String>,
}

impl WeatherConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var("OPENWEATHER_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone())
    }
}

/// One direction of a ferry route with its daily departures
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct FerryRoute {
    /// e.g. "Seattle to Bainbridge"
    pub direction: String,
    pub departure_terminal: String,
    pub arrival_terminal: String,
    /// Local departure times as "HH:MM"
    pub departures: Vec<String>,
}

/// Published timetable of the ferries passing the launch corridor
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FerryConfig {
    /// Typical crossing time, used to derive arrival events
    pub crossing_minutes: u32,
    pub routes: Vec<FerryRoute>,
}

impl Default for FerryConfig {
    fn default() -> Self {
        let times = |list: &[&str]| list.iter().map(|t| t.to_string()).collect();
        FerryConfig {
            crossing_minutes: 35,
            routes: vec![
                FerryRoute {
                    direction: "Seattle to Bainbridge".to_string(),
                    departure_terminal: "Seattle".to_string(),
                    arrival_terminal: "Bainbridge".to_string(),
                    departures: times(&[
                        "05:20", "06:10", "07:05", "07:55", "08:45", "09:35", "10:25", "11:15",
                        "12:05", "12:55", "13:45", "14:35", "15:30", "16:15", "17:05", "17:55",
                        "18:45", "19:35", "20:30", "21:15", "22:05", "23:00",
                    ]),
                },
                FerryRoute {
                    direction: "Bainbridge to Seattle".to_string(),
                    departure_terminal: "Bainbridge".to_string(),
                    arrival_terminal: "Seattle".to_string(),
                    departures: times(&[
                        "04:45", "05:40", "06:30", "07:15", "08:10", "09:00", "09:50", "10:40",
                        "11:30", "12:20", "13:10", "14:00", "14:50", "15:40", "16:30", "17:20",
                        "18:10", "19:00", "19:45", "20:40", "21:25", "22:15",
                    ]),
                },
            ],
        }
    }
}

impl FerryRoute {
    /// Parse the departure list, failing on the first malformed entry.
    pub fn departure_times(&self) -> Result<Vec<NaiveTime>, LaunchError> {
        self.departures
            .iter()
            .map(|t| {
                NaiveTime::parse_from_str(t.trim(), "%H:%M").map_err(|e| {
                    invalid(format!(
                        "ferry departure '{t}' on route '{}': {e}",
                        self.direction
                    ))
                })
            })
            .collect()
    }
}

impl Config {
    /// Load configuration from launch-config.toml file
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml(&contents) {
                Ok(config) => {
                    info!(site = %config.station.name, path = %path.display(), "loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "invalid config file, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "no config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml(contents: &str) -> Result<Self, LaunchError> {
        let config: Config =
            toml::from_str(contents).map_err(|e| invalid(format!("parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save current configuration as pretty TOML
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        info!(path = %path.as_ref().display(), "configuration saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<(), LaunchError> {
        self.thresholds.validate()?;
        let schedule = &self.schedule;
        if schedule.interval_minutes == 0 || schedule.interval_minutes > 24 * 60 {
            return Err(invalid("interval_minutes must be within 1..=1440"));
        }
        if schedule.max_concurrent_days == 0 {
            return Err(invalid("max_concurrent_days must be at least 1"));
        }
        if schedule.fetch_timeout_secs == 0 {
            return Err(invalid("fetch_timeout_secs must be at least 1"));
        }
        if schedule.week_length == 0 {
            return Err(invalid("week_length must be at least 1"));
        }
        if let Some(minutes) = self.station.utc_offset_minutes {
            if minutes.abs() >= 24 * 60 {
                return Err(invalid("utc_offset_minutes must be within a day"));
            }
        }
        for route in &self.ferry.routes {
            route.departure_times()?;
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> LaunchError {
    LaunchError::InvalidConfig(message.into())
}
