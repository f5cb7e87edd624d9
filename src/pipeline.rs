//! One end-to-end run: fetch, aggregate, classify, persist.
//!
//! Fatal errors raised before persistence leave both outputs untouched. The
//! snapshot is written before the history row, so a history failure can leave
//! a fresh snapshot behind; the error names which resource failed.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::clock::Clock;
use crate::config::Config;
use crate::error::PipelineError;
use crate::feed::AlertFeedClient;
use crate::judge::{RiskJudge, Thresholds};
use crate::models::{AggregateWindow, RiskAssessment};
use crate::rainfall::{window_total, RainfallAggregator};
use crate::store::{HistoryStore, SnapshotWriter};

// ---

pub struct Runner<C: Clock> {
    config: Config,
    feed: AlertFeedClient,
    rainfall: RainfallAggregator,
    judge: RiskJudge,
    snapshot: SnapshotWriter,
    history: HistoryStore,
    clock: C,
}

impl<C: Clock> Runner<C> {
    /// Wire every component from `config`, sharing one HTTP client whose
    /// per-request timeout is `config.http_timeout`.
    pub fn from_config(config: Config, clock: C) -> Result<Self> {
        // ---
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let feed = AlertFeedClient::new(
            http.clone(),
            config.feed_url.clone(),
            config.dry_label.clone(),
            config.wind_label.clone(),
        );
        let rainfall = RainfallAggregator::new(
            http,
            config.rainfall_url_template.clone(),
            &config.rainfall_encoding,
            config.day_failure_policy,
            config.fetch_concurrency,
        )?;
        let judge = RiskJudge::new(Thresholds {
            short_max_mm: config.short_threshold_mm,
            long_max_mm: config.long_threshold_mm,
        });

        Ok(Runner {
            feed,
            rainfall,
            judge,
            snapshot: SnapshotWriter::new(config.snapshot_path.clone()),
            history: HistoryStore::new(config.history_path.clone()),
            clock,
            config,
        })
    }

    /// Reference date of the next run: the pinned date if configured,
    /// otherwise the clock's.
    pub fn reference_date(&self) -> NaiveDate {
        self.config
            .reference_date
            .unwrap_or_else(|| self.clock.today())
    }

    /// Produce today's assessment without writing anything.
    #[instrument(skip(self))]
    pub async fn assess(&self, reference_date: NaiveDate) -> Result<RiskAssessment, PipelineError> {
        // ---
        let cfg = &self.config;
        let span = cfg.short_window_days.max(cfg.long_window_days);

        // One fetch for the longest window; the shorter one reads the same days.
        let (days, flags) = tokio::try_join!(
            self.rainfall
                .collect_days(span, &cfg.station_code, reference_date),
            self.feed
                .fetch_flags(&cfg.region_name, &cfg.municipality_name),
        )?;

        let short = window_total(cfg.short_window_days, &days);
        let long = window_total(cfg.long_window_days, &days);
        log_window(&short);
        log_window(&long);

        let level = self.judge.judge(short.total, long.total, flags.dry, flags.wind);

        Ok(RiskAssessment {
            level,
            rain3: short.total,
            rain30: long.total,
            flags,
            updated: reference_date,
        })
    }

    /// Run once for the reference date: assess, then overwrite the snapshot
    /// and append one history row.
    pub async fn run(&self) -> Result<RiskAssessment, PipelineError> {
        // ---
        self.run_for(self.reference_date()).await
    }

    pub async fn run_for(&self, reference_date: NaiveDate) -> Result<RiskAssessment, PipelineError> {
        // ---
        info!("Starting run for {}", reference_date);

        let assessment = self.assess(reference_date).await?;

        self.snapshot.write(&assessment)?;
        self.history.append(&assessment.to_history_record())?;

        info!(
            "Run complete: level={} ({}) rain{}={} rain{}={} dry={} wind={}",
            assessment.level.value(),
            assessment.level.label(),
            self.config.short_window_days,
            assessment.rain3,
            self.config.long_window_days,
            assessment.rain30,
            assessment.flags.dry,
            assessment.flags.wind
        );
        Ok(assessment)
    }
}

fn log_window(window: &AggregateWindow) {
    if window.skipped_days > 0 {
        tracing::warn!(
            "{}-day total {} mm excludes {} unavailable day(s)",
            window.days,
            window.total,
            window.skipped_days
        );
    } else {
        tracing::debug!("{}-day total {} mm", window.days, window.total);
    }
}
