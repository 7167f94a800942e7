//! # Text and JSON Reports
//!
//! Terminal rendering of [`DayPlan`]s and [`WeekPlan`]s. The text form is
//! meant for a quick look before heading to the beach; JSON carries the full
//! plan for anything downstream.
//!
//! ## Day Layout
//! ```text
//! Point White Drive NE, Bainbridge Island
//! Thursday, July 24 2025
//!   Best window 07:10-10:40 (3h 40m) optimal, avg 0.86, peak 0.93
//!     tide 5.2 ft rising | flooding current 0.4 kn | wind 5 kn from NW (6 mph)
//!   Also 13:00-14:30 (1h 40m) acceptable, avg 0.71
//!
//!   xxxxxxx####++...xxxx####
//!   |     |     |     |
//!   00    06    12    18
//! ```
//! The strip has one column per hour: `#` optimal, `+` acceptable,
//! `.` marginal, `x` not recommended, `?` no data.
//!
//! A day with data but no safe run reads "No safe launch window". A day
//! whose providers failed reads "Data unavailable" with the failing
//! providers, so the two are never confused.

use crate::evaluate::ScoreSeries;
use crate::schedule::{DayPlan, EvaluatedDay, WeekPlan};
use crate::units::knots_to_mph;
use crate::{CompositeScore, Factor, LaunchWindow, Rating};
use std::fmt;

/// Readings within this many feet count as a steady tide
const TIDE_STEADY_FT: f64 = 0.05;

/// Time labels every this many hours under the strip
const LABEL_EVERY_HOURS: usize = 6;

/// Text report of a single date.
pub struct DayReport<'a> {
    pub site: &'a str,
    pub plan: &'a DayPlan,
    /// How many windows to list after the best one
    pub alternatives: usize,
}

/// Text report of a date range: one line per date, then the best date.
pub struct WeekReport<'a> {
    pub site: &'a str,
    pub week: &'a WeekPlan,
}

impl fmt::Display for DayReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.site)?;
        writeln!(f, "{}", self.plan.date().format("%A, %B %-d %Y"))?;

        let day = match self.plan {
            DayPlan::DataUnavailable(day) => {
                writeln!(f, "  Data unavailable, no recommendation possible")?;
                for outage in &day.outages {
                    writeln!(f, "    {}: {}", outage.provider, outage.reason)?;
                }
                return Ok(());
            }
            DayPlan::Evaluated(day) => day,
        };

        let ranked = self.plan.top_windows(self.alternatives + 1);
        match ranked.split_first() {
            None => writeln!(f, "  No safe launch window today")?,
            Some((best, others)) => {
                writeln!(
                    f,
                    "  Best window {} {}, avg {:.2}, peak {:.2}",
                    span(best),
                    window_rating(day, best),
                    best.avg_score,
                    best.peak_score
                )?;
                if let Some(conditions) = conditions_at(day, best) {
                    writeln!(f, "    {conditions}")?;
                }
                for window in others {
                    writeln!(
                        f,
                        "  Also {} {}, avg {:.2}",
                        span(window),
                        window_rating(day, window),
                        window.avg_score
                    )?;
                }
            }
        }

        writeln!(f)?;
        let strip = hourly_strip(&day.composite_scores);
        writeln!(f, "  {strip}")?;
        writeln!(f, "  {}", hour_markers(strip.chars().count()))?;
        writeln!(f, "  {}", hour_labels(strip.chars().count()))
    }
}

impl fmt::Display for WeekReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.site)?;
        for plan in &self.week.days {
            let label = plan.date().format("%a %b %e");
            match plan {
                DayPlan::DataUnavailable(day) => {
                    let providers: Vec<String> =
                        day.outages.iter().map(|o| o.provider.to_string()).collect();
                    writeln!(f, "  {label}  data unavailable ({})", providers.join(", "))?;
                }
                DayPlan::Evaluated(day) => {
                    let strip = hourly_strip(&day.composite_scores);
                    match plan.best_window() {
                        Some(best) => writeln!(
                            f,
                            "  {label}  {strip}  best {} {}",
                            span(best),
                            window_rating(day, best)
                        )?,
                        None => writeln!(f, "  {label}  {strip}  no safe launch window")?,
                    }
                }
            }
        }
        if let Some((plan, window)) = self.week.best_day() {
            writeln!(
                f,
                "Best day: {} {} (avg {:.2})",
                plan.date().format("%A"),
                span(window),
                window.avg_score
            )?;
        }
        Ok(())
    }
}

/// Pretty JSON of a whole plan.
pub fn to_json(week: &WeekPlan) -> serde_json::Result<String> {
    serde_json::to_string_pretty(week)
}

/// "07:10-10:40 (3h 40m)"
fn span(window: &LaunchWindow) -> String {
    let hours = window.duration_minutes / 60;
    let minutes = window.duration_minutes % 60;
    let length = match (hours, minutes) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m:02}m"),
    };
    format!(
        "{}-{} ({length})",
        window.start.format("%H:%M"),
        window.end.format("%H:%M")
    )
}

/// Lowest rating among the window's member timestamps.
fn window_rating(day: &EvaluatedDay, window: &LaunchWindow) -> Rating {
    day.composite_scores
        .scores
        .iter()
        .filter(|s| s.timestamp >= window.start && s.timestamp <= window.end)
        .map(|s| s.rating)
        .min()
        .unwrap_or(Rating::Unsafe)
}

/// Condition summary at the start of a window.
fn conditions_at(day: &EvaluatedDay, window: &LaunchWindow) -> Option<String> {
    let scores = &day.composite_scores;
    let index = scores.grid.index_of(window.start)?;
    let score = scores.scores.get(index)?;

    let mut parts = Vec::new();
    if let Some(tide) = score.assessment(Factor::Tide).and_then(|a| a.reading) {
        match tide_trend(scores, index) {
            Some(trend) => parts.push(format!("tide {tide:.1} ft {trend}")),
            None => parts.push(format!("tide {tide:.1} ft")),
        }
    }
    if let Some(current) = score.assessment(Factor::Current) {
        parts.push(current.reason.clone());
    }
    if let Some(wind) = score.assessment(Factor::Wind) {
        match wind.reading {
            Some(knots) => parts.push(format!("{} ({:.0} mph)", wind.reason, knots_to_mph(knots))),
            None => parts.push(wind.reason.clone()),
        }
    }
    Some(parts.join(" | "))
}

/// "rising", "falling" or "steady", judged against the next grid point
/// (or the previous one at the end of the day).
pub fn tide_trend(scores: &ScoreSeries, index: usize) -> Option<&'static str> {
    let height = |i: usize| {
        scores
            .scores
            .get(i)
            .and_then(|s| s.assessment(Factor::Tide))
            .and_then(|a| a.reading)
    };
    let here = height(index)?;
    let delta = match height(index + 1) {
        Some(next) => next - here,
        None => here - height(index.checked_sub(1)?)?,
    };
    Some(if delta > TIDE_STEADY_FT {
        "rising"
    } else if delta < -TIDE_STEADY_FT {
        "falling"
    } else {
        "steady"
    })
}

/// One character per hour, taken from the first grid point of the hour.
fn hourly_strip(scores: &ScoreSeries) -> String {
    let per_hour = (60 / scores.grid.interval_minutes().clamp(1, 60)) as usize;
    scores
        .scores
        .iter()
        .step_by(per_hour.max(1))
        .map(strip_char)
        .collect()
}

fn strip_char(score: &CompositeScore) -> char {
    if score.contributing.iter().any(|a| a.is_unknown()) {
        return '?';
    }
    match score.rating {
        Rating::Optimal => '#',
        Rating::Acceptable => '+',
        Rating::Marginal => '.',
        Rating::Unsafe => 'x',
    }
}

fn hour_markers(width: usize) -> String {
    (0..width)
        .map(|i| if i % LABEL_EVERY_HOURS == 0 { '|' } else { ' ' })
        .collect::<String>()
        .trim_end()
        .to_string()
}

fn hour_labels(width: usize) -> String {
    (0..width)
        .step_by(LABEL_EVERY_HOURS)
        .map(|hour| format!("{:<width$}", format!("{hour:02}"), width = LABEL_EVERY_HOURS))
        .collect::<String>()
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdConfig;
    use crate::evaluate::composite;
    use crate::schedule::{Outage, UnavailableDay};
    use crate::{FactorAssessment, ProviderKind, TimeGrid};
    use chrono::{FixedOffset, NaiveDate};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 24).unwrap()
    }

    fn grid() -> TimeGrid {
        let offset = FixedOffset::west_opt(7 * 3600).unwrap();
        TimeGrid::for_date(date(), 10, offset).unwrap()
    }

    /// A day whose tide rises linearly and where `suitable(i)` gates each point.
    fn evaluated(suitable: impl Fn(usize) -> bool) -> EvaluatedDay {
        let grid = grid();
        let thresholds = ThresholdConfig::default();
        let scores = grid
            .timestamps()
            .enumerate()
            .map(|(i, ts)| {
                let assessments = Factor::ALL
                    .iter()
                    .map(|&factor| FactorAssessment {
                        factor,
                        timestamp: ts,
                        passes: suitable(i),
                        severity: if suitable(i) { 0.0 } else { 0.8 },
                        reason: format!("{factor} ok"),
                        reading: Some(if factor == Factor::Tide {
                            3.0 + i as f64 * 0.1
                        } else {
                            4.0
                        }),
                    })
                    .collect();
                composite(ts, assessments, &thresholds)
            })
            .collect();
        let composite_scores = ScoreSeries { grid, scores };
        let windows = crate::aggregate::aggregate(&composite_scores, chrono::Duration::minutes(30));
        let ranking = crate::aggregate::rank_windows(&windows);
        EvaluatedDay {
            date: date(),
            best_window: ranking.first().copied(),
            composite_scores,
            windows,
            ranking,
        }
    }

    #[test]
    fn test_no_window_and_no_data_read_differently() {
        let empty = DayPlan::Evaluated(evaluated(|_| false));
        let missing = DayPlan::DataUnavailable(UnavailableDay {
            date: date(),
            outages: vec![Outage {
                provider: ProviderKind::Wind,
                reason: "no API key configured for the wind provider".to_string(),
            }],
        });
        let empty_text = DayReport {
            site: "Test Beach",
            plan: &empty,
            alternatives: 2,
        }
        .to_string();
        let missing_text = DayReport {
            site: "Test Beach",
            plan: &missing,
            alternatives: 2,
        }
        .to_string();
        assert!(empty_text.contains("No safe launch window today"));
        assert!(!empty_text.contains("Data unavailable"));
        assert!(missing_text.contains("Data unavailable"));
        assert!(missing_text.contains("wind: no API key"));
    }

    #[test]
    fn test_best_window_line() {
        // 07:00 to 09:50 suitable
        let plan = DayPlan::Evaluated(evaluated(|i| (42..60).contains(&i)));
        let text = DayReport {
            site: "Test Beach",
            plan: &plan,
            alternatives: 2,
        }
        .to_string();
        assert!(text.contains("Thursday, July 24 2025"));
        assert!(text.contains("Best window 07:00-09:50 (3h)"), "{text}");
        assert!(text.contains("optimal"));
        assert!(text.contains("rising"));
        assert!(text.contains("mph"));
    }

    #[test]
    fn test_hourly_strip_has_one_column_per_hour() {
        let day = evaluated(|i| (42..60).contains(&i));
        let strip = hourly_strip(&day.composite_scores);
        assert_eq!(strip.chars().count(), 24);
        assert_eq!(&strip[6..11], "x###x");
    }

    #[test]
    fn test_tide_trend() {
        let day = evaluated(|_| true);
        let scores = &day.composite_scores;
        assert_eq!(tide_trend(scores, 10), Some("rising"));
        // Last point compares with the previous one
        assert_eq!(tide_trend(scores, scores.scores.len() - 1), Some("rising"));
        assert_eq!(tide_trend(scores, 10_000), None);
    }

    #[test]
    fn test_week_report_and_json() {
        let week = WeekPlan {
            days: vec![
                DayPlan::Evaluated(evaluated(|i| (42..60).contains(&i))),
                DayPlan::DataUnavailable(UnavailableDay {
                    date: date().succ_opt().unwrap(),
                    outages: vec![Outage {
                        provider: ProviderKind::Tide,
                        reason: "timed out".to_string(),
                    }],
                }),
            ],
        };
        let text = WeekReport {
            site: "Test Beach",
            week: &week,
        }
        .to_string();
        assert!(text.contains("data unavailable (tide)"));
        assert!(text.contains("Best day: Thursday 07:00-09:50"));

        let json = to_json(&week).unwrap();
        assert!(json.contains("\"status\": \"data_unavailable\""));
        let back: WeekPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(back.days.len(), 2);
    }
}
