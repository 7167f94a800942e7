//! # NOAA Tide and Current Predictions
//!
//! Fetches predictions from NOAA's CO-OPS data getter API.
//!
//! ## Data Source
//!
//! ### NOAA Tides and Currents
//! - **URL**: https://api.tidesandcurrents.noaa.gov/api/prod/datagetter
//! - **Tide station**: 9447130 (Seattle, WA) - configurable in `[station]`
//! - **Current station**: PCT1641_17 (Rich Passage) - configurable in `[station]`
//! - **Format**: JSON, hourly predictions, GMT timestamps
//!
//! ### Request Window
//! The requested range is the local day padded by two hours on each side, so
//! the grid points near midnight have a bracketing prediction to interpolate
//! from. Timestamps are requested in GMT and converted to the grid offset,
//! which sidesteps the ambiguity of local times around DST changes.
//!
//! ### Currents
//! `Velocity_Major` is signed along the major axis of the channel: positive
//! is flood, negative is ebb. The direction of travel comes from the mean
//! flood or ebb bearing of the station.

use super::FetchError;
use crate::config::StationConfig;
use crate::payload::{CurrentRecord, TideRecord};
use crate::{ProviderKind, TimePoint};
use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::debug;

pub const NOAA_API_URL: &str = "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter";

/// Hours of padding either side of the local day
const RANGE_PADDING_HOURS: i64 = 2;

pub struct NoaaClient {
    client: reqwest::Client,
    tide_station: String,
    current_station: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct TideResponse {
    predictions: Option<Vec<TidePrediction>>,
    error: Option<ApiError>,
}

/// NOAA sends both fields as strings, e.g. `{"t": "2025-07-24 13:00", "v": "3.215"}`
#[derive(Debug, Deserialize)]
struct TidePrediction {
    t: String,
    v: String,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current_predictions: Option<CurrentPredictions>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct CurrentPredictions {
    cp: Vec<CurrentPrediction>,
}

#[derive(Debug, Deserialize)]
struct CurrentPrediction {
    #[serde(rename = "Time")]
    time: String,
    #[serde(rename = "Velocity_Major")]
    velocity_major: f64,
    #[serde(rename = "meanFloodDir")]
    mean_flood_dir: Option<f64>,
    #[serde(rename = "meanEbbDir")]
    mean_ebb_dir: Option<f64>,
}

impl NoaaClient {
    pub fn new(client: reqwest::Client, station: &StationConfig) -> Self {
        NoaaClient {
            client,
            tide_station: station.tide_station_id.clone(),
            current_station: station.current_station_id.clone(),
        }
    }

    /// Hourly tide height predictions (ft above MLLW) around `date`.
    pub async fn tide_predictions(
        &self,
        date: NaiveDate,
        offset: FixedOffset,
    ) -> Result<Vec<TideRecord>, FetchError> {
        let (begin, end) = request_range(date, offset);
        let body = self
            .client
            .get(NOAA_API_URL)
            .query(&[
                ("begin_date", begin.as_str()),
                ("end_date", end.as_str()),
                ("station", self.tide_station.as_str()),
                ("product", "predictions"),
                ("datum", "MLLW"),
                ("time_zone", "gmt"),
                ("interval", "h"),
                ("units", "english"),
                ("format", "json"),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let records = parse_tide_response(&body, offset)?;
        debug!(station = %self.tide_station, %date, points = records.len(), "fetched tide predictions");
        Ok(records)
    }

    /// Hourly current predictions (knots, flood positive) around `date`.
    pub async fn current_predictions(
        &self,
        date: NaiveDate,
        offset: FixedOffset,
    ) -> Result<Vec<CurrentRecord>, FetchError> {
        let (begin, end) = request_range(date, offset);
        let body = self
            .client
            .get(NOAA_API_URL)
            .query(&[
                ("begin_date", begin.as_str()),
                ("end_date", end.as_str()),
                ("station", self.current_station.as_str()),
                ("product", "currents_predictions"),
                ("time_zone", "gmt"),
                ("interval", "h"),
                ("units", "english"),
                ("format", "json"),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let records = parse_current_response(&body, offset)?;
        debug!(station = %self.current_station, %date, points = records.len(), "fetched current predictions");
        Ok(records)
    }
}

/// `begin_date`/`end_date` values in GMT covering the padded local day.
fn request_range(date: NaiveDate, offset: FixedOffset) -> (String, String) {
    let local_midnight = date.and_time(NaiveTime::MIN);
    // Local wall time minus the offset gives UTC
    let utc_midnight = local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()));
    let begin = utc_midnight - Duration::hours(RANGE_PADDING_HOURS);
    let end = utc_midnight + Duration::days(1) + Duration::hours(RANGE_PADDING_HOURS);
    (
        begin.format("%Y%m%d %H:%M").to_string(),
        end.format("%Y%m%d %H:%M").to_string(),
    )
}

/// Parse a NOAA GMT timestamp like "2025-07-24 13:00" into the grid offset.
fn parse_gmt(raw: &str, offset: FixedOffset, provider: ProviderKind) -> Result<TimePoint, FetchError> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M")
        .map_err(|e| FetchError::parse(provider, format!("bad timestamp '{raw}': {e}")))?;
    Ok(Utc.from_utc_datetime(&naive).with_timezone(&offset))
}

pub(crate) fn parse_tide_response(
    body: &str,
    offset: FixedOffset,
) -> Result<Vec<TideRecord>, FetchError> {
    let response: TideResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::parse(ProviderKind::Tide, e.to_string()))?;

    if let Some(error) = response.error {
        return Err(FetchError::Api {
            provider: ProviderKind::Tide,
            message: error.message,
        });
    }
    let predictions = response
        .predictions
        .ok_or_else(|| FetchError::parse(ProviderKind::Tide, "no predictions in response"))?;

    predictions
        .iter()
        .map(|p| {
            let height_ft: f64 = p.v.trim().parse().map_err(|_| {
                FetchError::parse(ProviderKind::Tide, format!("bad height '{}'", p.v))
            })?;
            Ok(TideRecord {
                timestamp: parse_gmt(&p.t, offset, ProviderKind::Tide)?,
                height_ft,
            })
        })
        .collect()
}

pub(crate) fn parse_current_response(
    body: &str,
    offset: FixedOffset,
) -> Result<Vec<CurrentRecord>, FetchError> {
    let response: CurrentResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::parse(ProviderKind::Current, e.to_string()))?;

    if let Some(error) = response.error {
        return Err(FetchError::Api {
            provider: ProviderKind::Current,
            message: error.message,
        });
    }
    let predictions = response.current_predictions.ok_or_else(|| {
        FetchError::parse(ProviderKind::Current, "no current predictions in response")
    })?;

    predictions
        .cp
        .iter()
        .map(|p| {
            let bearing = if p.velocity_major >= 0.0 {
                p.mean_flood_dir
            } else {
                p.mean_ebb_dir
            };
            Ok(CurrentRecord {
                timestamp: parse_gmt(&p.time, offset, ProviderKind::Current)?,
                speed_knots: p.velocity_major,
                direction_deg: bearing.unwrap_or(0.0),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pacific() -> FixedOffset {
        FixedOffset::west_opt(7 * 3600).unwrap()
    }

    #[test]
    fn test_request_range_is_padded_gmt() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 24).unwrap();
        let (begin, end) = request_range(date, pacific());
        // Local midnight PDT is 07:00 GMT
        assert_eq!(begin, "20250724 05:00");
        assert_eq!(end, "20250725 09:00");
    }

    #[test]
    fn test_parse_tide_response() {
        let body = r#"{"predictions": [
            {"t": "2025-07-24 07:00", "v": "3.215"},
            {"t": "2025-07-24 08:00", "v": "-0.4"}
        ]}"#;
        let records = parse_tide_response(body, pacific()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].timestamp.to_rfc3339(), "2025-07-24T00:00:00-07:00");
        assert_eq!(records[0].height_ft, 3.215);
        assert_eq!(records[1].height_ft, -0.4);
    }

    #[test]
    fn test_parse_tide_api_error() {
        let body = r#"{"error": {"message": "No Predictions data was found."}}"#;
        let err = parse_tide_response(body, pacific()).unwrap_err();
        assert!(matches!(err, FetchError::Api { provider: ProviderKind::Tide, .. }));
    }

    #[test]
    fn test_parse_tide_bad_height() {
        let body = r#"{"predictions": [{"t": "2025-07-24 07:00", "v": "n/a"}]}"#;
        assert!(matches!(
            parse_tide_response(body, pacific()),
            Err(FetchError::Parse { .. })
        ));
    }

    #[test]
    fn test_parse_current_response_picks_flood_or_ebb_bearing() {
        let body = r#"{"current_predictions": {"cp": [
            {"Time": "2025-07-24 07:00", "Velocity_Major": 1.25, "meanFloodDir": 60, "meanEbbDir": 240, "Bin": "1"},
            {"Time": "2025-07-24 08:00", "Velocity_Major": -0.8, "meanFloodDir": 60, "meanEbbDir": 240, "Bin": "1"}
        ]}}"#;
        let records = parse_current_response(body, pacific()).unwrap();
        assert_eq!(records[0].direction_deg, 60.0);
        assert_eq!(records[1].direction_deg, 240.0);
        assert_eq!(records[1].speed_knots, -0.8);
    }

    #[test]
    fn test_parse_current_missing_block() {
        assert!(parse_current_response("{}", pacific()).is_err());
    }
}
