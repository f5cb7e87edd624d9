//! Threshold logic turning rainfall totals and alert flags into a risk level.
//!
//! Pure and total: no I/O, same inputs always give the same level.

use crate::models::RiskLevel;

// ---

/// Inclusive rainfall bounds for the advisory condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    // ---
    pub short_max_mm: f64,
    pub long_max_mm: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            short_max_mm: 1.0,
            long_max_mm: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RiskJudge {
    thresholds: Thresholds,
}

impl RiskJudge {
    pub fn new(thresholds: Thresholds) -> Self {
        RiskJudge { thresholds }
    }

    /// Classify one day.
    ///
    /// Advisory when the short window stayed within its bound and either the
    /// long window did too or a drying alert is active. Wind only escalates
    /// an advisory to a warning; on its own it never raises the level.
    pub fn judge(&self, rain_short: f64, rain_long: f64, dry: bool, wind: bool) -> RiskLevel {
        // ---
        let t = &self.thresholds;
        let mut level = RiskLevel::None;

        if rain_short <= t.short_max_mm && (rain_long <= t.long_max_mm || dry) {
            level = RiskLevel::Advisory;
        }
        if level == RiskLevel::Advisory && wind {
            level = RiskLevel::Warning;
        }
        level
    }
}

/// [`RiskJudge::judge`] with the default 1 mm / 30 mm bounds, returning the
/// numeric level and its label.
pub fn judge(rain3: f64, rain30: f64, dry: bool, wind: bool) -> (u8, &'static str) {
    let level = RiskJudge::default().judge(rain3, rain30, dry, wind);
    (level.value(), level.label())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_reference_cases() {
        // ---
        assert_eq!(judge(0.0, 0.0, false, false), (0, "no match"));
        assert_eq!(judge(1.0, 30.0, true, false), (1, "advisory-level match"));
        assert_eq!(judge(1.0, 30.0, true, true), (2, "warning-level match"));
        assert_eq!(judge(2.0, 0.0, true, true), (0, "no match"));
        assert_eq!(judge(1.0, 31.0, false, true), (0, "no match"));
    }

    #[test]
    fn test_dry_alert_substitutes_for_long_window() {
        // ---
        assert_eq!(judge(0.0, 120.0, false, false).0, 0);
        assert_eq!(judge(0.0, 120.0, true, false).0, 1);
        assert_eq!(judge(0.0, 120.0, true, true).0, 2);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        // ---
        assert_eq!(judge(1.0, 30.0, false, false).0, 1);
        assert_eq!(judge(1.1, 30.0, false, false).0, 0);
        assert_eq!(judge(1.0, 30.1, false, false).0, 0);
    }

    #[test]
    fn test_wind_never_escalates_alone() {
        // ---
        for rain3 in [1.5, 10.0, 100.0] {
            assert_eq!(judge(rain3, 0.0, true, true).0, 0);
        }
    }

    #[test]
    fn test_custom_thresholds() {
        // ---
        let strict = RiskJudge::new(Thresholds {
            short_max_mm: 0.0,
            long_max_mm: 10.0,
        });

        assert_eq!(strict.judge(0.5, 5.0, false, false), RiskLevel::None);
        assert_eq!(strict.judge(0.0, 10.0, false, true), RiskLevel::Warning);
        assert_eq!(strict.judge(0.0, 10.5, false, true), RiskLevel::None);
    }
}
