//! Per-entity accumulation of placement rows.
//!
//! Rows are folded into a [`WorkingAggregate`] per key and turned into a
//! [`FinalizedAggregate`] by one finalization step that drops entities
//! below the usage floor and derives the averages and trend.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::calculate::{
    base_score, compute_trend, days_ago, ratio, recency_weight, win_rate, OLDER_WINDOW_DAYS,
    RECENT_WINDOW_DAYS,
};
use crate::models::{PlacementRecord, TrendDirection};

/// Running totals for one entity. Never leaves this module.
#[derive(Debug, Clone, Default)]
struct WorkingAggregate {
    raw_score: f64,
    uses: u32,
    first: u32,
    second: u32,
    third: u32,
    place_sum: u64,
    recent_score: f64,
    recent_uses: u32,
    older_score: f64,
    older_uses: u32,
    first_seen: Option<NaiveDate>,
    last_seen: Option<NaiveDate>,
    tournaments: HashSet<String>,
}

impl WorkingAggregate {
    fn add(&mut self, record: &PlacementRecord, reference: NaiveDate) {
        let contribution =
            base_score(record) * recency_weight(record.tournament_date, reference);

        self.raw_score += contribution;
        self.uses += 1;
        self.place_sum += record.place as u64;
        match record.place {
            1 => self.first += 1,
            2 => self.second += 1,
            3 => self.third += 1,
            _ => {}
        }

        let age = days_ago(record.tournament_date, reference);
        if age <= RECENT_WINDOW_DAYS {
            self.recent_score += contribution;
            self.recent_uses += 1;
        } else if age <= OLDER_WINDOW_DAYS {
            self.older_score += contribution;
            self.older_uses += 1;
        }

        let date = record.tournament_date;
        self.first_seen = Some(self.first_seen.map_or(date, |d| d.min(date)));
        self.last_seen = Some(self.last_seen.map_or(date, |d| d.max(date)));
        self.tournaments.insert(record.tournament_id.clone());
    }

    fn finalize<K: Display>(self, key: K) -> Option<FinalizedAggregate<K>> {
        let first_seen = self.first_seen?;
        let last_seen = self.last_seen?;
        let trend = compute_trend(
            self.recent_score,
            self.recent_uses,
            self.older_score,
            self.older_uses,
        );

        Some(FinalizedAggregate {
            name: key.to_string(),
            key,
            raw_score: self.raw_score,
            avg_score: ratio(self.raw_score, self.uses as f64),
            uses: self.uses,
            first: self.first,
            second: self.second,
            third: self.third,
            win_rate: win_rate(self.first, self.uses),
            avg_place: ratio(self.place_sum as f64, self.uses as f64),
            trend,
            trend_direction: TrendDirection::classify(trend, self.older_uses),
            recent_uses: self.recent_uses,
            older_uses: self.older_uses,
            tournaments: self.tournaments.len() as u32,
            first_seen,
            last_seen,
        })
    }
}

/// Immutable statistics of one entity over the scanned rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalizedAggregate<K> {
    pub key: K,

    /// Display name of the key
    pub name: String,

    /// Sum of weighted contributions
    pub raw_score: f64,

    pub avg_score: f64,

    pub uses: u32,

    pub first: u32,

    pub second: u32,

    pub third: u32,

    /// Wins over uses, as a fraction
    pub win_rate: f64,

    /// Mean finishing place
    pub avg_place: f64,

    pub trend: f64,

    pub trend_direction: TrendDirection,

    /// Uses with `days_ago <= 30`
    pub recent_uses: u32,

    /// Uses with `30 < days_ago <= 60`
    pub older_uses: u32,

    /// Distinct tournaments the entity placed in
    pub tournaments: u32,

    pub first_seen: NaiveDate,

    pub last_seen: NaiveDate,
}

/// Aggregate rows by key, keeping entities with at least `min_uses` uses.
///
/// Rows for which `key_fn` returns `None` are skipped for this pass. The
/// result is ordered by key; ranking is the caller's concern.
pub fn aggregate<'a, K, F, I>(
    rows: I,
    key_fn: F,
    min_uses: u32,
    reference: NaiveDate,
) -> Vec<FinalizedAggregate<K>>
where
    K: Ord + Display,
    F: Fn(&PlacementRecord) -> Option<K>,
    I: IntoIterator<Item = &'a PlacementRecord>,
{
    let mut working: BTreeMap<K, WorkingAggregate> = BTreeMap::new();
    let mut scanned = 0usize;
    for row in rows {
        scanned += 1;
        if let Some(key) = key_fn(row) {
            working.entry(key).or_default().add(row, reference);
        }
    }

    let entities = working.len();
    let finalized: Vec<_> = working
        .into_iter()
        .filter(|(_, agg)| agg.uses >= min_uses)
        .filter_map(|(key, agg)| agg.finalize(key))
        .collect();

    debug!(
        "Aggregated {} rows into {} entities ({} kept, min_uses={})",
        scanned,
        entities,
        finalized.len(),
        min_uses
    );

    finalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Stage;
    use crate::normalize::blade_key;
    use chrono::Duration;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    fn row(tid: &str, days_back: i64, place: u8, blade: &str) -> PlacementRecord {
        PlacementRecord::new(
            tid,
            reference() - Duration::days(days_back),
            place,
            format!("player-{}-{}", tid, place),
            blade,
            "9-60",
            "Ball",
        )
    }

    fn by_blade(rows: &[PlacementRecord], min_uses: u32) -> Vec<FinalizedAggregate<String>> {
        aggregate(rows, |r| Some(blade_key(r)), min_uses, reference())
    }

    #[test]
    fn test_end_to_end_phoenix_wing() {
        let rows = vec![
            row("t1", 0, 1, "Phoenix Wing"),
            row("t2", 10, 2, "Phoenix Wing"),
            row("t3", 40, 3, "Phoenix Wing"),
        ];

        let result = by_blade(&rows, 1);
        assert_eq!(result.len(), 1);
        let pw = &result[0];

        let expected = 3.0 + 2.0 * 0.5_f64.powf(10.0 / 30.0) + 0.5_f64.powf(40.0 / 30.0);
        assert!((pw.raw_score - expected).abs() < 1e-9);
        assert!((pw.raw_score - 4.984).abs() < 1e-3);
        assert_eq!(pw.uses, 3);
        assert_eq!((pw.first, pw.second, pw.third), (1, 1, 1));
        assert_eq!(pw.tournaments, 3);
        assert_eq!(pw.first_seen, reference() - Duration::days(40));
        assert_eq!(pw.last_seen, reference());
    }

    #[test]
    fn test_aggregation_commutative() {
        let rows = vec![
            row("t1", 0, 1, "Wizard Rod"),
            row("t1", 0, 2, "Shark Scale"),
            row("t2", 30, 1, "Shark Scale"),
            row("t2", 30, 3, "Wizard Rod"),
            row("t3", 60, 2, "Wizard Rod"),
            row("t3", 60, 1, "Hover Wyvern"),
            row("t4", 90, 3, "Shark Scale"),
        ];

        let forward = by_blade(&rows, 1);

        let mut reversed_rows = rows.clone();
        reversed_rows.reverse();
        let reversed = by_blade(&reversed_rows, 1);

        let mut rotated_rows = rows.clone();
        rotated_rows.rotate_left(3);
        let rotated = by_blade(&rotated_rows, 1);

        for other in [&reversed, &rotated] {
            assert_eq!(forward.len(), other.len());
            for (a, b) in forward.iter().zip(other.iter()) {
                assert_eq!(a.key, b.key);
                assert!((a.raw_score - b.raw_score).abs() < 1e-9);
                assert_eq!(a.uses, b.uses);
                assert_eq!((a.first, a.second, a.third), (b.first, b.second, b.third));
                assert_eq!(a.first_seen, b.first_seen);
                assert_eq!(a.last_seen, b.last_seen);
            }
        }
    }

    #[test]
    fn test_min_uses_filter() {
        let rows = vec![
            row("t1", 0, 1, "Dran Buster"),
            row("t2", 0, 1, "Dran Buster"),
            row("t1", 0, 3, "Wizard Rod"),
            row("t2", 0, 3, "Wizard Rod"),
            row("t3", 0, 3, "Wizard Rod"),
        ];

        let result = by_blade(&rows, 3);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "Wizard Rod");
    }

    // Windows: recent = days_ago <= 30, older = 30 < days_ago <= 60.
    #[test]
    fn test_trend_windows() {
        // Day 30 is recent, day 31 and 60 older, day 61 outside both
        let rows = vec![
            row("t1", 30, 1, "Wizard Rod"),
            row("t2", 31, 1, "Wizard Rod"),
            row("t3", 60, 1, "Wizard Rod"),
            row("t4", 61, 1, "Wizard Rod"),
        ];
        let agg = &by_blade(&rows, 1)[0];
        assert_eq!(agg.recent_uses, 1);
        assert_eq!(agg.older_uses, 2);
        assert_eq!(agg.trend_direction, TrendDirection::Rising);
    }

    #[test]
    fn test_trend_recent_only_is_new() {
        let rows = vec![row("t1", 3, 1, "Wizard Rod"), row("t2", 10, 2, "Wizard Rod")];
        let agg = &by_blade(&rows, 1)[0];
        assert_eq!(agg.trend, 0.5);
        assert_eq!(agg.trend_direction, TrendDirection::New);
    }

    #[test]
    fn test_trend_older_only() {
        let rows = vec![
            row("t1", 40, 1, "Wizard Rod"),
            row("t2", 45, 2, "Wizard Rod"),
            row("t3", 50, 3, "Wizard Rod"),
        ];
        let agg = &by_blade(&rows, 1)[0];
        assert!((agg.trend - (-0.3)).abs() < 1e-12);
        assert_eq!(agg.trend_direction, TrendDirection::Falling);
    }

    #[test]
    fn test_trend_neither_window() {
        let rows = vec![row("t1", 100, 1, "Wizard Rod")];
        let agg = &by_blade(&rows, 1)[0];
        assert_eq!(agg.trend, 0.0);
        assert_eq!(agg.trend_direction, TrendDirection::Stable);
    }

    #[test]
    fn test_stage_multiplier_applied() {
        let rows = vec![
            row("t1", 0, 1, "Wizard Rod").with_stage(Stage::FirstStage),
            row("t2", 0, 1, "Wizard Rod").with_stage(Stage::BothStages),
        ];
        let agg = &by_blade(&rows, 1)[0];
        assert!((agg.raw_score - (1.5 + 3.45)).abs() < 1e-9);
    }

    #[test]
    fn test_key_fn_none_skips_row() {
        let rows = vec![
            row("t1", 0, 1, "Wizard Rod").with_assist("Jaggy"),
            row("t2", 0, 1, "Wizard Rod"),
        ];
        let result = aggregate(&rows, |r| r.assist.clone(), 1, reference());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].uses, 1);
    }

    #[test]
    fn test_avg_place_and_win_rate() {
        let rows = vec![
            row("t1", 0, 1, "Wizard Rod"),
            row("t2", 0, 2, "Wizard Rod"),
            row("t3", 0, 3, "Wizard Rod"),
            row("t4", 0, 2, "Wizard Rod"),
        ];
        let agg = &by_blade(&rows, 1)[0];
        assert_eq!(agg.avg_place, 2.0);
        assert_eq!(agg.win_rate, 0.25);
        assert!((agg.avg_score - 1.5).abs() < 1e-12);
    }
}
