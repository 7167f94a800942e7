//! # Daily and Weekly Scheduler
//!
//! Runs the fetch → normalize → evaluate → aggregate pipeline once per
//! requested date and collects the results into a [`WeekPlan`].
//!
//! ## Concurrency
//! Dates are fetched concurrently on a `JoinSet`, at most
//! `schedule.max_concurrent_days` at a time. Inside one date the four
//! provider calls run together with `tokio::join!`, each bounded by
//! `schedule.fetch_timeout_secs`. Scoring is synchronous and pure and runs
//! once the fetches have settled.
//!
//! ## Partial Failure
//! A date whose providers fail, time out or return unusable data becomes
//! [`DayPlan::DataUnavailable`] listing every outage. The other dates are
//! unaffected. Only invariant violations ([`LaunchError::MisalignedSeries`])
//! abort the whole plan.

use crate::aggregate::{aggregate, rank_windows};
use crate::config::Config;
use crate::evaluate::{evaluate, AlignedConditions, ScoreSeries};
use crate::normalize::{normalize_current, normalize_ferry, normalize_tide, normalize_wind};
use crate::payload::{CurrentRecord, FerryRecord, TideRecord, WindRecord};
use crate::providers::{ConditionsProvider, FetchError};
use crate::{LaunchError, LaunchWindow, ProviderKind, TimeGrid};
use chrono::{Duration, FixedOffset, Local, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// A provider that could not contribute to a date, and why.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Outage {
    pub provider: ProviderKind,
    pub reason: String,
}

/// A fully scored date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedDay {
    pub date: NaiveDate,
    pub composite_scores: ScoreSeries,
    /// Launch windows in start order
    pub windows: Vec<LaunchWindow>,
    /// Indices into `windows`, best first
    pub ranking: Vec<usize>,
    /// Index into `windows` of the top-ranked window
    pub best_window: Option<usize>,
}

/// A date that could not be scored because input data was missing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnavailableDay {
    pub date: NaiveDate,
    pub outages: Vec<Outage>,
}

/// Outcome for one date.
///
/// "No safe window" and "no data" are different answers: the first is an
/// [`EvaluatedDay`] with no windows, the second is `DataUnavailable`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DayPlan {
    Evaluated(EvaluatedDay),
    DataUnavailable(UnavailableDay),
}

impl DayPlan {
    pub fn date(&self) -> NaiveDate {
        match self {
            DayPlan::Evaluated(day) => day.date,
            DayPlan::DataUnavailable(day) => day.date,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, DayPlan::Evaluated(_))
    }

    /// Windows in start order; empty when data was unavailable.
    pub fn windows(&self) -> &[LaunchWindow] {
        match self {
            DayPlan::Evaluated(day) => &day.windows,
            DayPlan::DataUnavailable(_) => &[],
        }
    }

    pub fn best_window(&self) -> Option<&LaunchWindow> {
        match self {
            DayPlan::Evaluated(day) => day.best_window.and_then(|i| day.windows.get(i)),
            DayPlan::DataUnavailable(_) => None,
        }
    }

    /// All windows, best first.
    pub fn ranked_windows(&self) -> Vec<&LaunchWindow> {
        match self {
            DayPlan::Evaluated(day) => day
                .ranking
                .iter()
                .filter_map(|&i| day.windows.get(i))
                .collect(),
            DayPlan::DataUnavailable(_) => Vec::new(),
        }
    }

    /// The `n` best windows, best first.
    pub fn top_windows(&self, n: usize) -> Vec<&LaunchWindow> {
        let mut ranked = self.ranked_windows();
        ranked.truncate(n);
        ranked
    }
}

/// One [`DayPlan`] per requested date, in request order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekPlan {
    pub days: Vec<DayPlan>,
}

impl WeekPlan {
    pub fn day(&self, date: NaiveDate) -> Option<&DayPlan> {
        self.days.iter().find(|d| d.date() == date)
    }

    /// Date with the single highest-ranked window of the range.
    ///
    /// Ties go to the earlier date.
    pub fn best_day(&self) -> Option<(&DayPlan, &LaunchWindow)> {
        self.days
            .iter()
            .filter_map(|day| day.best_window().map(|w| (day, w)))
            .min_by(|a, b| b.1.avg_score.total_cmp(&a.1.avg_score))
    }
}

/// Raw provider results for one date, before normalization.
#[derive(Debug)]
pub struct DayFetch {
    pub tide: Result<Vec<TideRecord>, FetchError>,
    pub current: Result<Vec<CurrentRecord>, FetchError>,
    pub wind: Result<Vec<WindRecord>, FetchError>,
    pub ferry: Result<Vec<FerryRecord>, FetchError>,
}

/// How many dates a request covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    Daily,
    Weekly,
}

/// Dates to plan for a view starting at `start`.
pub fn date_range(start: NaiveDate, mode: ViewMode, week_length: u32) -> Vec<NaiveDate> {
    let count = match mode {
        ViewMode::Daily => 1,
        ViewMode::Weekly => week_length.max(1) as usize,
    };
    start.iter_days().take(count).collect()
}

/// UTC offset of the sampling grid for `date`.
///
/// A configured offset wins. Otherwise the system local offset in effect at
/// noon of that date is used, so each date of a range spanning a DST change
/// gets its own offset. Falls back to UTC if the local zone has no noon.
pub fn resolve_offset(
    date: NaiveDate,
    utc_offset_minutes: Option<i32>,
) -> Result<FixedOffset, LaunchError> {
    if let Some(minutes) = utc_offset_minutes {
        return FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
            LaunchError::InvalidConfig(format!("utc_offset_minutes {minutes} is out of range"))
        });
    }
    let noon = date.and_time(NaiveTime::MIN) + Duration::hours(12);
    Ok(Local
        .from_local_datetime(&noon)
        .earliest()
        .map(|dt| dt.offset().fix())
        .unwrap_or_else(|| Utc.fix()))
}

/// Score one date from its raw provider results.
///
/// With `utc_offset_minutes` configured, the same fetch and config always
/// give the same plan. Without it the grid offset comes from the host's
/// local zone (see [`resolve_offset`]), so the plan depends on where it runs.
///
/// # Errors
/// Configuration problems ([`LaunchError::InvalidConfig`],
/// [`LaunchError::InvalidGrid`]) and misaligned series. Missing or unusable
/// data is not an error; it yields [`DayPlan::DataUnavailable`].
pub fn plan_day(date: NaiveDate, fetch: DayFetch, config: &Config) -> Result<DayPlan, LaunchError> {
    let offset = resolve_offset(date, config.station.utc_offset_minutes)?;
    let grid = TimeGrid::for_date(date, config.schedule.interval_minutes, offset)?;

    let mut outages = Vec::new();
    let tide = settle(ProviderKind::Tide, fetch.tide, &grid, normalize_tide, &mut outages);
    let current = settle(ProviderKind::Current, fetch.current, &grid, normalize_current, &mut outages);
    let wind = settle(ProviderKind::Wind, fetch.wind, &grid, normalize_wind, &mut outages);
    let ferry = settle(ProviderKind::Ferry, fetch.ferry, &grid, normalize_ferry, &mut outages);

    if !outages.is_empty() {
        for outage in &outages {
            warn!(%date, provider = %outage.provider, reason = %outage.reason, "provider outage");
        }
        return Ok(DayPlan::DataUnavailable(UnavailableDay { date, outages }));
    }

    let conditions = AlignedConditions {
        grid,
        tide,
        current,
        wind,
        ferry,
    };
    let composite_scores = evaluate(&conditions, &config.thresholds)?;
    let windows = aggregate(&composite_scores, config.thresholds.min_window_duration());
    let ranking = rank_windows(&windows);
    let best_window = ranking.first().copied();

    info!(
        %date,
        suitable = composite_scores.suitable_count(),
        windows = windows.len(),
        "day evaluated"
    );

    Ok(DayPlan::Evaluated(EvaluatedDay {
        date,
        composite_scores,
        windows,
        ranking,
        best_window,
    }))
}

/// Normalize one provider's records, recording an outage on any failure.
fn settle<R, T>(
    provider: ProviderKind,
    fetched: Result<Vec<R>, FetchError>,
    grid: &TimeGrid,
    normalize: impl FnOnce(&[R], &TimeGrid) -> Result<T, LaunchError>,
    outages: &mut Vec<Outage>,
) -> Option<T> {
    let result = fetched
        .map_err(|e| e.to_string())
        .and_then(|records| normalize(&records, grid).map_err(|e| e.to_string()));
    match result {
        Ok(series) => Some(series),
        Err(reason) => {
            outages.push(Outage { provider, reason });
            None
        }
    }
}

/// Fetch all four payloads for one date concurrently, each bounded by `limit`.
pub async fn fetch_day<P>(
    provider: &P,
    date: NaiveDate,
    offset: FixedOffset,
    limit: std::time::Duration,
) -> DayFetch
where
    P: ConditionsProvider + ?Sized,
{
    let (tide, current, wind, ferry) = tokio::join!(
        bounded(ProviderKind::Tide, limit, provider.fetch_tide(date, offset)),
        bounded(ProviderKind::Current, limit, provider.fetch_currents(date, offset)),
        bounded(ProviderKind::Wind, limit, provider.fetch_wind(date, offset)),
        bounded(ProviderKind::Ferry, limit, provider.fetch_ferries(date, offset)),
    );
    DayFetch {
        tide,
        current,
        wind,
        ferry,
    }
}

async fn bounded<T>(
    provider: ProviderKind,
    limit: std::time::Duration,
    fetch: impl Future<Output = Result<T, FetchError>>,
) -> Result<T, FetchError> {
    match tokio::time::timeout(limit, fetch).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            provider,
            secs: limit.as_secs(),
        }),
    }
}

/// Plan every date in `dates`, keeping their order.
///
/// # Errors
/// Invalid configuration, or an invariant violation while scoring a date.
pub async fn plan<P>(
    dates: &[NaiveDate],
    provider: Arc<P>,
    config: &Config,
) -> Result<WeekPlan, LaunchError>
where
    P: ConditionsProvider + ?Sized + 'static,
{
    config.validate()?;
    let limit = config.schedule.fetch_timeout();
    let semaphore = Arc::new(Semaphore::new(config.schedule.max_concurrent_days));

    let mut tasks = JoinSet::new();
    for (index, &date) in dates.iter().enumerate() {
        let offset = resolve_offset(date, config.station.utc_offset_minutes)?;
        let provider = Arc::clone(&provider);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            // The semaphore is never closed, so acquiring cannot fail
            let _permit = semaphore.acquire_owned().await;
            debug!(%date, %offset, "fetching conditions");
            (index, fetch_day(provider.as_ref(), date, offset, limit).await)
        });
    }

    let mut fetched: Vec<Option<DayFetch>> = dates.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, fetch)) => fetched[index] = Some(fetch),
            Err(e) => error!(error = %e, "date fetch task did not complete"),
        }
    }

    let mut days = Vec::with_capacity(dates.len());
    for (&date, fetch) in dates.iter().zip(fetched) {
        let day = match fetch {
            Some(fetch) => plan_day(date, fetch, config)?,
            None => DayPlan::DataUnavailable(UnavailableDay {
                date,
                outages: ProviderKind::ALL
                    .into_iter()
                    .map(|provider| Outage {
                        provider,
                        reason: "fetch task aborted".to_string(),
                    })
                    .collect(),
            }),
        };
        days.push(day);
    }

    info!(
        dates = days.len(),
        available = days.iter().filter(|d| d.is_available()).count(),
        "plan complete"
    );
    Ok(WeekPlan { days })
}
