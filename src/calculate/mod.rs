//! Scoring primitives.
//!
//! Pure numeric policies shared by every report:
//! - Recency decay with a 30-day half-life
//! - Placement points with stage multipliers
//! - The four-way trend branch between two time windows
//! - Percentile tiers and boundary rounding

use chrono::NaiveDate;

use crate::models::{PlacementRecord, RankTier, Stage};

/// Results lose half their weight every 30 days.
pub const HALF_LIFE_DAYS: f64 = 30.0;

/// Upper bound (inclusive, in days ago) of the recent trend window.
pub const RECENT_WINDOW_DAYS: i64 = 30;

/// Upper bound (inclusive, in days ago) of the older trend window.
pub const OLDER_WINDOW_DAYS: i64 = 60;

/// Whole days between an event and the reference, never negative.
pub fn days_ago(event_date: NaiveDate, reference: NaiveDate) -> i64 {
    (reference - event_date).num_days().max(0)
}

/// Exponential decay weight in `(0, 1]`; exactly 1.0 on the reference day.
pub fn recency_weight(event_date: NaiveDate, reference: NaiveDate) -> f64 {
    let days = days_ago(event_date, reference) as f64;
    0.5_f64.powf(days / HALF_LIFE_DAYS)
}

/// Base points for a finishing place.
pub fn placement_points(place: u8) -> f64 {
    match place {
        1 => 3.0,
        2 => 2.0,
        3 => 1.0,
        _ => 0.0,
    }
}

/// Point multiplier for the stage a combo was used in.
pub fn stage_multiplier(stage: Option<Stage>) -> f64 {
    match stage {
        Some(Stage::FirstStage) => 0.5,
        Some(Stage::FinalsOnly) => 1.0,
        Some(Stage::BothStages) => 1.15,
        None => 1.0,
    }
}

/// Points of a record before recency decay.
pub fn base_score(record: &PlacementRecord) -> f64 {
    placement_points(record.place) * stage_multiplier(record.stage)
}

/// Full weighted contribution of one record.
pub fn weighted_score(record: &PlacementRecord, reference: NaiveDate) -> f64 {
    base_score(record) * recency_weight(record.tournament_date, reference)
}

/// Relative change in per-use score between a recent and an older window.
///
/// - both windows populated: `(recent_avg - older_avg) / older_avg`
/// - only recent: `0.5` (emerging)
/// - only older: `-min(0.5, older_uses * 0.1)`
/// - neither: `0.0`
///
/// The branches are intentionally discontinuous at the population boundary.
pub fn compute_trend(recent_score: f64, recent_uses: u32, older_score: f64, older_uses: u32) -> f64 {
    match (recent_uses > 0, older_uses > 0) {
        (true, true) => {
            let recent_avg = recent_score / recent_uses as f64;
            let older_avg = older_score / older_uses as f64;
            if older_avg == 0.0 {
                // Older window held only 4th-place-or-worse rows
                0.0
            } else {
                (recent_avg - older_avg) / older_avg
            }
        }
        (true, false) => 0.5,
        (false, true) => -(0.5_f64.min(older_uses as f64 * 0.1)),
        (false, false) => 0.0,
    }
}

/// Tier for position `index` in a list of `total` entries.
pub fn tier_for_index(index: usize, total: usize) -> RankTier {
    if total == 0 {
        return RankTier::F;
    }
    let percentile = index as f64 / total as f64 * 100.0;
    RankTier::from_percentile(percentile)
}

/// `numerator / denominator`, or 0.0 for an empty denominator.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Wins over uses as a fraction.
pub fn win_rate(wins: u32, uses: u32) -> f64 {
    ratio(wins as f64, uses as f64)
}

/// Share of a total as a percentage.
pub fn percent(part: u32, total: u32) -> f64 {
    ratio(part as f64, total as f64) * 100.0
}

/// Round to 2 decimal places for report output.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Least-squares slope of evenly spaced values (per step).
pub fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n_f;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    ratio(num, den)
}

/// Clamp a sub-score into `[0, 100]`.
pub fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    #[test]
    fn test_recency_weight_reference_day() {
        assert_eq!(recency_weight(reference(), reference()), 1.0);
    }

    #[test]
    fn test_recency_weight_half_life() {
        let d = reference() - Duration::days(30);
        assert_eq!(recency_weight(d, reference()), 0.5);
    }

    #[test]
    fn test_recency_weight_monotonic() {
        let mut previous = f64::INFINITY;
        for days in 0..400 {
            let w = recency_weight(reference() - Duration::days(days), reference());
            assert!(w < previous, "weight not decreasing at {} days", days);
            assert!(w > 0.0 && w <= 1.0);
            previous = w;
        }
    }

    #[test]
    fn test_recency_weight_future_clamped() {
        let future = reference() + Duration::days(5);
        assert_eq!(days_ago(future, reference()), 0);
        assert_eq!(recency_weight(future, reference()), 1.0);
    }

    #[test]
    fn test_placement_points() {
        assert_eq!(placement_points(1), 3.0);
        assert_eq!(placement_points(2), 2.0);
        assert_eq!(placement_points(3), 1.0);
        assert_eq!(placement_points(4), 0.0);
        assert_eq!(placement_points(0), 0.0);
    }

    #[test]
    fn test_stage_multiplier() {
        assert_eq!(stage_multiplier(Some(Stage::FirstStage)), 0.5);
        assert_eq!(stage_multiplier(Some(Stage::FinalsOnly)), 1.0);
        assert_eq!(stage_multiplier(Some(Stage::BothStages)), 1.15);
        assert_eq!(stage_multiplier(None), 1.0);
    }

    #[test]
    fn test_weighted_score_combines_factors() {
        let record = PlacementRecord::new(
            "t",
            reference() - Duration::days(30),
            1,
            "p",
            "Wizard Rod",
            "9-60",
            "Ball",
        )
        .with_stage(Stage::BothStages);
        let score = weighted_score(&record, reference());
        assert!((score - 3.0 * 1.15 * 0.5).abs() < 1e-12);
    }

    // Windows: recent = days_ago <= 30, older = 30 < days_ago <= 60.
    #[test]
    fn test_trend_both_windows() {
        // recent avg 3.0, older avg 2.0
        let trend = compute_trend(6.0, 2, 4.0, 2);
        assert_eq!(trend, 0.5);

        let trend = compute_trend(2.0, 2, 4.0, 2);
        assert_eq!(trend, -0.5);
    }

    #[test]
    fn test_trend_recent_only() {
        assert_eq!(compute_trend(9.0, 3, 0.0, 0), 0.5);
        assert_eq!(compute_trend(0.1, 1, 0.0, 0), 0.5);
    }

    #[test]
    fn test_trend_older_only() {
        assert!((compute_trend(0.0, 0, 5.0, 3) - (-0.3)).abs() < 1e-12);
        assert_eq!(compute_trend(0.0, 0, 5.0, 9), -0.5);
    }

    #[test]
    fn test_trend_neither() {
        assert_eq!(compute_trend(0.0, 0, 0.0, 0), 0.0);
    }

    #[test]
    fn test_trend_zero_older_average() {
        assert_eq!(compute_trend(3.0, 1, 0.0, 2), 0.0);
    }

    #[test]
    fn test_tier_for_index() {
        // 100 entries: percentile == index
        assert_eq!(tier_for_index(0, 100), RankTier::SS);
        assert_eq!(tier_for_index(2, 100), RankTier::SS);
        assert_eq!(tier_for_index(3, 100), RankTier::S);
        assert_eq!(tier_for_index(29, 100), RankTier::A);
        assert_eq!(tier_for_index(97, 100), RankTier::F);

        // Small list: first entry is always SS
        assert_eq!(tier_for_index(0, 1), RankTier::SS);
        assert_eq!(tier_for_index(1, 2), RankTier::C);
        assert_eq!(tier_for_index(0, 0), RankTier::F);
    }

    #[test]
    fn test_ratio_guards_zero() {
        assert_eq!(ratio(5.0, 0.0), 0.0);
        assert_eq!(win_rate(0, 0), 0.0);
        assert_eq!(percent(1, 0), 0.0);
        assert!((win_rate(1, 4) - 0.25).abs() < 1e-12);
        assert!((percent(1, 4) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(4.98412), 4.98);
        assert_eq!(round2(1.005001), 1.01);
        assert_eq!(round2(-0.333), -0.33);
    }

    #[test]
    fn test_linear_slope() {
        assert_eq!(linear_slope(&[]), 0.0);
        assert_eq!(linear_slope(&[4.0]), 0.0);
        assert!((linear_slope(&[0.0, 1.0, 2.0, 3.0]) - 1.0).abs() < 1e-12);
        assert!((linear_slope(&[6.0, 4.0, 2.0]) + 2.0).abs() < 1e-12);
        assert_eq!(linear_slope(&[2.0, 2.0, 2.0]), 0.0);
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(-4.0), 0.0);
        assert_eq!(clamp_score(140.0), 100.0);
        assert_eq!(clamp_score(55.5), 55.5);
    }
}
