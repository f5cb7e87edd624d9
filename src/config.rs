//! Configuration loader for the `drywatch` risk pipeline.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Every component receives what it needs from the
//! [`Config`] value at construction; nothing below this module reads the
//! environment.
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use chrono::{FixedOffset, NaiveDate, Offset, Utc};

/// Parse an optional environment variable into `$ty` with a default value.
macro_rules! parse_env {
    ($lookup:expr, $var_name:expr, $ty:ty, $default:expr) => {
        $lookup($var_name)
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional string environment variable with a default value.
macro_rules! string_env {
    ($lookup:expr, $var_name:expr, $default:expr) => {
        $lookup($var_name).unwrap_or_else(|| $default.to_string())
    };
}

pub const DEFAULT_FEED_URL: &str = "https://www.data.jma.go.jp/developer/xml/feed/extra.xml";
pub const DEFAULT_RAINFALL_URL_TEMPLATE: &str =
    "https://www.data.jma.go.jp/obd/stats/data/mdrr/pre_rct/alltable/pre{ymd}.csv";

/// Placeholder replaced by the `YYYYMMDD` date in the rainfall URL template.
pub const DATE_PLACEHOLDER: &str = "{ymd}";

/// What to do when one day's rainfall table cannot be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayFailurePolicy {
    /// Abort the whole run with `DataUnavailable`.
    FailFast,
    /// Log the day, count it as skipped and keep aggregating.
    Skip,
}

impl FromStr for DayFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fail-fast" | "failfast" | "abort" => Ok(DayFailurePolicy::FailFast),
            "skip" => Ok(DayFailurePolicy::Skip),
            other => Err(format!("expected 'fail-fast' or 'skip', got '{other}'")),
        }
    }
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Atom feed carrying the regional alert reports.
    pub feed_url: String,

    /// Per-day rainfall table URL; `{ymd}` is replaced with `YYYYMMDD`.
    pub rainfall_url_template: String,

    /// `encoding_rs` label of the rainfall tables.
    pub rainfall_encoding: String,

    /// Station whose row is read from each daily table.
    pub station_code: String,

    /// Feed entries are kept only when their title mentions this region.
    pub region_name: String,

    /// Alert items count only when their area name contains this.
    pub municipality_name: String,

    /// Exact alert kind name that raises the `dry` flag.
    pub dry_label: String,

    /// Exact alert kind name that raises the `wind` flag.
    pub wind_label: String,

    pub short_window_days: u32,
    pub long_window_days: u32,

    /// Inclusive upper bound on the short-window total for an advisory.
    pub short_threshold_mm: f64,

    /// Inclusive upper bound on the long-window total for an advisory.
    pub long_threshold_mm: f64,

    pub http_timeout: Duration,

    /// Maximum number of daily tables fetched at once.
    pub fetch_concurrency: usize,

    pub day_failure_policy: DayFailurePolicy,

    /// Offset used to decide which calendar day "today" is.
    pub utc_offset: FixedOffset,

    /// Pinned reference date; when unset the clock decides.
    pub reference_date: Option<NaiveDate>,

    pub snapshot_path: PathBuf,
    pub history_path: PathBuf,

    pub serve_addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        // ---
        Config {
            feed_url: DEFAULT_FEED_URL.to_string(),
            rainfall_url_template: DEFAULT_RAINFALL_URL_TEMPLATE.to_string(),
            rainfall_encoding: "shift_jis".to_string(),
            station_code: "40191".to_string(),
            region_name: "福岡県".to_string(),
            municipality_name: "北九州市".to_string(),
            dry_label: "乾燥注意報".to_string(),
            wind_label: "強風注意報".to_string(),
            short_window_days: 3,
            long_window_days: 30,
            short_threshold_mm: 1.0,
            long_threshold_mm: 30.0,
            http_timeout: Duration::from_secs(15),
            fetch_concurrency: 4,
            day_failure_policy: DayFailurePolicy::FailFast,
            utc_offset: FixedOffset::east_opt(9 * 3600).unwrap_or_else(|| Utc.fix()),
            reference_date: None,
            snapshot_path: PathBuf::from("data.json"),
            history_path: PathBuf::from("history.csv"),
            serve_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

/// Load configuration from environment variables with defaults.
///
/// Every variable is optional; see [`Config::default`] for the fallbacks.
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    load_from(|name| env::var(name).ok())
}

/// Load configuration through an arbitrary variable lookup.
pub fn load_from<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let defaults = Config::default();

    let timeout_secs = parse_env!(lookup, "HTTP_TIMEOUT_SECS", u64, 15);
    let offset_hours = parse_env!(lookup, "UTC_OFFSET_HOURS", i32, 9);
    let reference_date = lookup("REFERENCE_DATE")
        .map(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d"))
        .transpose()
        .map_err(|e| anyhow!("Invalid REFERENCE_DATE: {}", e))?;

    if !(-23..=23).contains(&offset_hours) {
        bail!("Invalid UTC_OFFSET_HOURS: {offset_hours} is outside -23..=23");
    }
    let utc_offset = FixedOffset::east_opt(offset_hours * 3600)
        .ok_or_else(|| anyhow!("Invalid UTC_OFFSET_HOURS: {}", offset_hours))?;

    let cfg = Config {
        feed_url: string_env!(lookup, "ALERT_FEED_URL", defaults.feed_url),
        rainfall_url_template: string_env!(
            lookup,
            "RAINFALL_URL_TEMPLATE",
            defaults.rainfall_url_template
        ),
        rainfall_encoding: string_env!(lookup, "RAINFALL_ENCODING", defaults.rainfall_encoding),
        station_code: string_env!(lookup, "STATION_CODE", defaults.station_code),
        region_name: string_env!(lookup, "ALERT_REGION", defaults.region_name),
        municipality_name: string_env!(lookup, "ALERT_MUNICIPALITY", defaults.municipality_name),
        dry_label: string_env!(lookup, "DRY_ALERT_LABEL", defaults.dry_label),
        wind_label: string_env!(lookup, "WIND_ALERT_LABEL", defaults.wind_label),
        short_window_days: parse_env!(lookup, "SHORT_WINDOW_DAYS", u32, 3),
        long_window_days: parse_env!(lookup, "LONG_WINDOW_DAYS", u32, 30),
        short_threshold_mm: parse_env!(lookup, "SHORT_RAIN_THRESHOLD_MM", f64, 1.0),
        long_threshold_mm: parse_env!(lookup, "LONG_RAIN_THRESHOLD_MM", f64, 30.0),
        http_timeout: Duration::from_secs(timeout_secs),
        fetch_concurrency: parse_env!(lookup, "FETCH_CONCURRENCY", usize, 4),
        day_failure_policy: parse_env!(
            lookup,
            "DAY_FAILURE_POLICY",
            DayFailurePolicy,
            DayFailurePolicy::FailFast
        ),
        utc_offset,
        reference_date,
        snapshot_path: lookup("SNAPSHOT_PATH").map(PathBuf::from).unwrap_or(defaults.snapshot_path),
        history_path: lookup("HISTORY_PATH").map(PathBuf::from).unwrap_or(defaults.history_path),
        serve_addr: parse_env!(lookup, "SERVE_ADDR", SocketAddr, defaults.serve_addr),
    };

    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    /// Reject values that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        // ---
        if self.short_window_days == 0 || self.long_window_days == 0 {
            bail!("Window sizes must be at least one day");
        }
        if self.fetch_concurrency == 0 {
            bail!("FETCH_CONCURRENCY must be at least 1");
        }
        if self.http_timeout.is_zero() {
            bail!("HTTP_TIMEOUT_SECS must be at least 1");
        }
        if !self.rainfall_url_template.contains(DATE_PLACEHOLDER) {
            bail!(
                "RAINFALL_URL_TEMPLATE must contain the {} placeholder",
                DATE_PLACEHOLDER
            );
        }
        if encoding_rs::Encoding::for_label(self.rainfall_encoding.as_bytes()).is_none() {
            bail!("Unknown RAINFALL_ENCODING '{}'", self.rainfall_encoding);
        }
        if !self.short_threshold_mm.is_finite() || !self.long_threshold_mm.is_finite() {
            bail!("Rain thresholds must be finite numbers");
        }
        Ok(())
    }

    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  ALERT_FEED_URL        : {}", self.feed_url);
        tracing::info!("  RAINFALL_URL_TEMPLATE : {}", self.rainfall_url_template);
        tracing::info!("  RAINFALL_ENCODING     : {}", self.rainfall_encoding);
        tracing::info!("  STATION_CODE          : {}", self.station_code);
        tracing::info!("  ALERT_REGION          : {}", self.region_name);
        tracing::info!("  ALERT_MUNICIPALITY    : {}", self.municipality_name);
        tracing::info!(
            "  WINDOWS               : {}d <= {} mm, {}d <= {} mm",
            self.short_window_days,
            self.short_threshold_mm,
            self.long_window_days,
            self.long_threshold_mm
        );
        tracing::info!("  HTTP_TIMEOUT_SECS     : {}", self.http_timeout.as_secs());
        tracing::info!("  FETCH_CONCURRENCY     : {}", self.fetch_concurrency);
        tracing::info!("  DAY_FAILURE_POLICY    : {:?}", self.day_failure_policy);
        tracing::info!("  UTC_OFFSET            : {}", self.utc_offset);
        if let Some(date) = self.reference_date {
            tracing::info!("  REFERENCE_DATE        : {}", date);
        }
        tracing::info!("  SNAPSHOT_PATH         : {}", self.snapshot_path.display());
        tracing::info!("  HISTORY_PATH          : {}", self.history_path.display());
    }
}
