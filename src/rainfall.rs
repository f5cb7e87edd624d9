//! Rolling-window rainfall aggregation.
//!
//! Each day in a window has its own published table, addressed by a URL that
//! embeds the date as `YYYYMMDD`. Tables are fetched through a bounded pool,
//! decoded from the regional encoding and scanned for the station's row. The
//! window never includes the reference date itself.
//!
//! Summation is deterministic: contributions are ordered by day before adding
//! and the total is rounded to one decimal exactly once, at the end.

use chrono::{Days, NaiveDate};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::config::{DayFailurePolicy, DATE_PLACEHOLDER};
use crate::error::{FetchError, MalformedRow, PipelineError};
use crate::models::AggregateWindow;

/// Column holding the station code.
const STATION_COLUMN: usize = 0;

/// Column holding the daily precipitation total.
const PRECIPITATION_COLUMN: usize = 9;

// ---

/// What one day's table contributed to a window.
#[derive(Debug, Clone, PartialEq)]
pub enum DayOutcome {
    /// The station's precipitation, in millimetres.
    Rain(f64),
    /// The table has no row for the station.
    StationAbsent,
    /// The station row exists but its value is unusable.
    Malformed(MalformedRow),
    /// The table could not be fetched and the skip policy is active.
    Skipped,
}

impl DayOutcome {
    pub fn contribution(&self) -> f64 {
        match self {
            DayOutcome::Rain(mm) => *mm,
            _ => 0.0,
        }
    }
}

/// A day's outcome, tagged with its distance from the reference date.
#[derive(Debug, Clone, PartialEq)]
pub struct DayContribution {
    // ---
    /// 1 for the day before the reference date, 2 for the day before that...
    pub offset: u32,
    pub date: NaiveDate,
    pub outcome: DayOutcome,
}

pub struct RainfallAggregator {
    http: reqwest::Client,
    url_template: String,
    encoding: &'static encoding_rs::Encoding,
    policy: DayFailurePolicy,
    concurrency: usize,
}

impl RainfallAggregator {
    /// Build an aggregator. Fails when `encoding_label` is not a known
    /// `encoding_rs` label.
    pub fn new(
        http: reqwest::Client,
        url_template: impl Into<String>,
        encoding_label: &str,
        policy: DayFailurePolicy,
        concurrency: usize,
    ) -> Result<Self, FetchError> {
        // ---
        let encoding = encoding_rs::Encoding::for_label(encoding_label.as_bytes())
            .ok_or_else(|| FetchError::Encoding(encoding_label.to_string()))?;

        Ok(RainfallAggregator {
            http,
            url_template: url_template.into(),
            encoding,
            policy,
            concurrency: concurrency.max(1),
        })
    }

    /// Sum `station_code`'s precipitation over the `days` complete days
    /// before `reference_date`.
    pub async fn sum_rainfall(
        &self,
        days: u32,
        station_code: &str,
        reference_date: NaiveDate,
    ) -> Result<AggregateWindow, PipelineError> {
        // ---
        let contributions = self.collect_days(days, station_code, reference_date).await?;
        Ok(window_total(days, &contributions))
    }

    /// Fetch and read every day in `1..=days`, ordered by offset.
    pub async fn collect_days(
        &self,
        days: u32,
        station_code: &str,
        reference_date: NaiveDate,
    ) -> Result<Vec<DayContribution>, PipelineError> {
        // ---
        let dates: Vec<(u32, NaiveDate)> = (1..=days)
            .filter_map(|offset| {
                reference_date
                    .checked_sub_days(Days::new(u64::from(offset)))
                    .map(|date| (offset, date))
            })
            .collect();

        let mut pending = stream::iter(dates)
            .map(|(offset, date)| async move {
                let url = self.day_url(date);
                let result = self.fetch_table(&url).await;
                (offset, date, url, result)
            })
            .buffer_unordered(self.concurrency);

        let mut contributions = Vec::with_capacity(days as usize);

        while let Some((offset, date, url, result)) = pending.next().await {
            let outcome = match result {
                Ok(table) => read_station(&table, station_code),
                Err(source) => match self.policy {
                    DayFailurePolicy::FailFast => {
                        return Err(PipelineError::DataUnavailable { date, url, source });
                    }
                    DayFailurePolicy::Skip => {
                        warn!("Skipping rainfall for {}: {}", date, source);
                        DayOutcome::Skipped
                    }
                },
            };

            if let DayOutcome::Malformed(ref e) = outcome {
                debug!("Station {} on {}: {}, counting as 0", station_code, date, e);
            }
            contributions.push(DayContribution {
                offset,
                date,
                outcome,
            });
        }

        contributions.sort_by_key(|c| c.offset);

        info!(
            "Collected rainfall for {} days before {} (station {})",
            contributions.len(),
            reference_date,
            station_code
        );
        Ok(contributions)
    }

    /// URL of the table published for `date`.
    pub fn day_url(&self, date: NaiveDate) -> String {
        self.url_template
            .replace(DATE_PLACEHOLDER, &date.format("%Y%m%d").to_string())
    }

    async fn fetch_table(&self, url: &str) -> Result<String, FetchError> {
        // ---
        debug!("Fetching rainfall table from: {}", url);

        let bytes = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let (text, _, had_errors) = self.encoding.decode(&bytes);
        if had_errors {
            debug!("Table at {} had undecodable bytes, replaced", url);
        }
        Ok(text.into_owned())
    }
}

/// Total of the contributions whose offset falls within `days`.
pub fn window_total(days: u32, contributions: &[DayContribution]) -> AggregateWindow {
    // ---
    let in_window = || contributions.iter().filter(move |c| c.offset <= days);

    AggregateWindow {
        days,
        total: sum_rounded(in_window().map(|c| c.outcome.contribution())),
        skipped_days: in_window()
            .filter(|c| matches!(c.outcome, DayOutcome::Skipped))
            .count() as u32,
    }
}

/// Add every value, then round once to one decimal.
pub fn sum_rounded<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    round_tenths(values.into_iter().sum())
}

/// Round to one decimal from the exact binary value, ties to even.
pub fn round_tenths(value: f64) -> f64 {
    format!("{value:.1}").parse().unwrap_or(value)
}

/// Scan a decoded table for the first row whose station column equals
/// `station_code` and read its precipitation.
pub fn read_station(table: &str, station_code: &str) -> DayOutcome {
    // ---
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(table.as_bytes());

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                debug!("Unreadable table row: {}", e);
                continue;
            }
        };

        if record.get(STATION_COLUMN).map(str::trim) != Some(station_code) {
            continue;
        }

        return match parse_precipitation(&record) {
            Ok(mm) => DayOutcome::Rain(mm),
            Err(e) => DayOutcome::Malformed(e),
        };
    }

    DayOutcome::StationAbsent
}

fn parse_precipitation(record: &csv::StringRecord) -> Result<f64, MalformedRow> {
    // ---
    let field = record
        .get(PRECIPITATION_COLUMN)
        .ok_or(MalformedRow::MissingColumn(record.len()))?
        .trim();

    let mm: f64 = field
        .parse()
        .map_err(|_| MalformedRow::NotANumber(field.to_string()))?;

    if !mm.is_finite() || mm < 0.0 {
        return Err(MalformedRow::OutOfRange(mm));
    }
    Ok(mm)
}
