//! Data models shared by the risk pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---

/// One entry of the alert feed, reduced to what the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertFeedEntry {
    // ---
    pub title: String,
    /// Embedded report document, still unparsed.
    pub content: Option<String>,
}

/// An (area, kind) pair found in a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertItem {
    // ---
    pub area: String,
    pub kind: String,
}

/// Alert kinds the pipeline cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Dry,
    Wind,
}

/// Flags accumulated over every matching alert item of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertFlags {
    // ---
    pub dry: bool,
    pub wind: bool,
}

impl AlertFlags {
    /// Raise the flag for `kind`. Flags never go back to false.
    pub fn raise(&mut self, kind: AlertKind) {
        // ---
        match kind {
            AlertKind::Dry => self.dry = true,
            AlertKind::Wind => self.wind = true,
        }
    }
}

/// Rainfall summed over a window of complete days before the reference date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateWindow {
    // ---
    pub days: u32,
    /// Total in millimetres, rounded once to one decimal.
    pub total: f64,
    /// Days dropped under the skip policy because their table was unavailable.
    pub skipped_days: u32,
}

/// Discrete risk tiers, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    None,
    Advisory,
    Warning,
}

impl RiskLevel {
    /// Numeric level written to the snapshot and the history log.
    pub fn value(self) -> u8 {
        // ---
        match self {
            RiskLevel::None => 0,
            RiskLevel::Advisory => 1,
            RiskLevel::Warning => 2,
        }
    }

    pub fn label(self) -> &'static str {
        // ---
        match self {
            RiskLevel::None => "no match",
            RiskLevel::Advisory => "advisory-level match",
            RiskLevel::Warning => "warning-level match",
        }
    }
}

/// Outcome of one run. Built once and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    // ---
    pub level: RiskLevel,
    pub rain3: f64,
    pub rain30: f64,
    pub flags: AlertFlags,
    pub updated: NaiveDate,
}

impl RiskAssessment {
    pub fn to_snapshot(&self) -> Snapshot {
        // ---
        Snapshot {
            updated: self.updated,
            level: self.level.value(),
            result: self.level.label().to_string(),
            rain3: self.rain3,
            rain30: self.rain30,
            dry: self.flags.dry,
            wind: self.flags.wind,
        }
    }

    pub fn to_history_record(&self) -> HistoryRecord {
        // ---
        HistoryRecord {
            date: self.updated,
            level: self.level.value(),
            rain3: self.rain3,
            rain30: self.rain30,
            dry: self.flags.dry,
            wind: self.flags.wind,
        }
    }
}

/// The "current state" document read by external consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    // ---
    pub updated: NaiveDate,
    pub level: u8,
    pub result: String,
    pub rain3: f64,
    pub rain30: f64,
    pub dry: bool,
    pub wind: bool,
}

/// One row of the append-only history log.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    // ---
    pub date: NaiveDate,
    pub level: u8,
    pub rain3: f64,
    pub rain30: f64,
    pub dry: bool,
    pub wind: bool,
}

impl HistoryRecord {
    /// CSV fields in header order; booleans as `0`/`1`, rain with one decimal.
    pub fn to_fields(&self) -> [String; 6] {
        // ---
        [
            self.date.format("%Y-%m-%d").to_string(),
            self.level.to_string(),
            format!("{:.1}", self.rain3),
            format!("{:.1}", self.rain30),
            u8::from(self.dry).to_string(),
            u8::from(self.wind).to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn assessment(level: RiskLevel) -> RiskAssessment {
        // ---
        RiskAssessment {
            level,
            rain3: 0.5,
            rain30: 12.0,
            flags: AlertFlags {
                dry: true,
                wind: false,
            },
            updated: NaiveDate::from_ymd_opt(2025, 3, 26).unwrap(),
        }
    }

    #[test]
    fn test_levels_map_to_values_and_labels() {
        // ---
        assert_eq!(RiskLevel::None.value(), 0);
        assert_eq!(RiskLevel::Advisory.value(), 1);
        assert_eq!(RiskLevel::Warning.value(), 2);
        assert_eq!(RiskLevel::Warning.label(), "warning-level match");
        assert!(RiskLevel::Warning > RiskLevel::Advisory);
    }

    #[test]
    fn test_flags_only_ever_rise() {
        // ---
        let mut flags = AlertFlags::default();
        flags.raise(AlertKind::Wind);
        flags.raise(AlertKind::Wind);
        assert_eq!(
            flags,
            AlertFlags {
                dry: false,
                wind: true
            }
        );

        flags.raise(AlertKind::Dry);
        assert!(flags.dry && flags.wind);
    }

    #[test]
    fn test_snapshot_serializes_expected_shape() {
        // ---
        let json = serde_json::to_value(assessment(RiskLevel::Advisory).to_snapshot()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "updated": "2025-03-26",
                "level": 1,
                "result": "advisory-level match",
                "rain3": 0.5,
                "rain30": 12.0,
                "dry": true,
                "wind": false
            })
        );
    }

    #[test]
    fn test_history_fields_use_numeric_flags() {
        // ---
        let fields = assessment(RiskLevel::Advisory).to_history_record().to_fields();
        assert_eq!(fields, ["2025-03-26", "1", "0.5", "12.0", "1", "0"]);
    }
}
