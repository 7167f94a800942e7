//! OpenWeatherMap wind forecast.
//!
//! Uses the free 5 day / 3 hour forecast endpoint in imperial units and
//! converts wind speed from mph to knots. Forecast steps are three hours
//! apart; the normalizer interpolates between them.
//!
//! Without an API key this provider fails. It never substitutes simulated
//! weather, because invented wind would make an unknown day look safe.

use super::FetchError;
use crate::config::StationConfig;
use crate::payload::WindRecord;
use crate::units::mph_to_knots;
use crate::ProviderKind;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use serde::Deserialize;
use tracing::debug;

pub const OPENWEATHER_API_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";

/// Forecast steps kept either side of the local day, so midnight has neighbours
const EDGE_MARGIN_HOURS: i64 = 3;

pub struct OpenWeatherClient {
    client: reqwest::Client,
    latitude: f64,
    longitude: f64,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Option<Vec<ForecastEntry>>,
    message: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    /// Unix seconds, UTC
    dt: i64,
    wind: ForecastWind,
}

#[derive(Debug, Deserialize)]
struct ForecastWind {
    /// mph with `units=imperial`
    speed: f64,
    deg: f64,
}

impl OpenWeatherClient {
    pub fn new(client: reqwest::Client, station: &StationConfig, api_key: Option<String>) -> Self {
        OpenWeatherClient {
            client,
            latitude: station.latitude,
            longitude: station.longitude,
            api_key,
        }
    }

    /// Wind forecast steps covering the local day of `date`.
    pub async fn wind_forecast(
        &self,
        date: NaiveDate,
        offset: FixedOffset,
    ) -> Result<Vec<WindRecord>, FetchError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(FetchError::MissingApiKey(ProviderKind::Wind))?;

        let body = self
            .client
            .get(OPENWEATHER_API_URL)
            .query(&[
                ("lat", self.latitude.to_string()),
                ("lon", self.longitude.to_string()),
                ("appid", api_key.to_string()),
                ("units", "imperial".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let records = parse_forecast(&body, date, offset)?;
        debug!(%date, points = records.len(), "fetched wind forecast");
        Ok(records)
    }
}

pub(crate) fn parse_forecast(
    body: &str,
    date: NaiveDate,
    offset: FixedOffset,
) -> Result<Vec<WindRecord>, FetchError> {
    let response: ForecastResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::parse(ProviderKind::Wind, e.to_string()))?;

    let Some(list) = response.list else {
        let message = response
            .message
            .map(|m| m.to_string())
            .unwrap_or_else(|| "no forecast list in response".to_string());
        return Err(FetchError::Api {
            provider: ProviderKind::Wind,
            message,
        });
    };

    let day_start = offset
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .single()
        .ok_or_else(|| FetchError::parse(ProviderKind::Wind, format!("no local midnight on {date}")))?;
    let from = day_start - Duration::hours(EDGE_MARGIN_HOURS);
    let to = day_start + Duration::days(1) + Duration::hours(EDGE_MARGIN_HOURS);

    let mut records = Vec::new();
    for entry in list {
        let timestamp = DateTime::from_timestamp(entry.dt, 0)
            .ok_or_else(|| FetchError::parse(ProviderKind::Wind, format!("bad dt {}", entry.dt)))?
            .with_timezone(&offset);
        if timestamp < from || timestamp > to {
            continue;
        }
        records.push(WindRecord {
            timestamp,
            speed_knots: mph_to_knots(entry.wind.speed),
            direction_deg: entry.wind.deg,
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pacific() -> FixedOffset {
        FixedOffset::west_opt(7 * 3600).unwrap()
    }

    #[test]
    fn test_parse_forecast_filters_to_day_and_converts_units() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 24).unwrap();
        let local_midnight = pacific()
            .with_ymd_and_hms(2025, 7, 24, 0, 0, 0)
            .single()
            .unwrap()
            .timestamp();
        let body = format!(
            r#"{{"list": [
                {{"dt": {}, "wind": {{"speed": 11.5078, "deg": 200}}}},
                {{"dt": {}, "wind": {{"speed": 5.0, "deg": 10}}}},
                {{"dt": {}, "wind": {{"speed": 5.0, "deg": 10}}}}
            ]}}"#,
            local_midnight,
            local_midnight + 12 * 3600,
            local_midnight + 3 * 86_400
        );
        let records = parse_forecast(&body, date, pacific()).unwrap();
        assert_eq!(records.len(), 2);
        assert!((records[0].speed_knots - 10.0).abs() < 1e-9);
        assert_eq!(records[0].direction_deg, 200.0);
        assert_eq!(records[1].timestamp.to_rfc3339(), "2025-07-24T12:00:00-07:00");
    }

    #[test]
    fn test_parse_forecast_error_message() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 24).unwrap();
        let body = r#"{"cod": 401, "message": "Invalid API key"}"#;
        let err = parse_forecast(body, date, pacific()).unwrap_err();
        assert!(err.to_string().contains("Invalid API key"));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_network() {
        let client = OpenWeatherClient::new(reqwest::Client::new(), &StationConfig::default(), None);
        let date = NaiveDate::from_ymd_opt(2025, 7, 24).unwrap();
        let err = client.wind_forecast(date, pacific()).await.unwrap_err();
        assert!(matches!(err, FetchError::MissingApiKey(ProviderKind::Wind)));
    }
}
