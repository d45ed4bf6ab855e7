//! Ranked and tiered entity lists.

use std::cmp::Ordering;
use std::fmt::Display;

use chrono::NaiveDate;
use serde::Serialize;

use crate::calculate::{round2, tier_for_index};
use crate::models::{PartKind, PlacementRecord, RankTier, TrendDirection};
use crate::normalize::{blade_key, normalize_blade, part_key, ComboKey};

use super::aggregate::{aggregate, FinalizedAggregate};

/// One row of a ranked list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry<K> {
    /// 1-based position
    pub rank: usize,

    pub name: String,

    pub key: K,

    pub tier: RankTier,

    /// Position in the list as 0-100 (0 = top)
    pub percentile: f64,

    /// Weighted score
    pub score: f64,

    pub avg_score: f64,

    pub uses: u32,

    pub first: u32,

    pub second: u32,

    pub third: u32,

    /// Percentage of uses that won the tournament
    pub win_rate: f64,

    pub avg_place: f64,

    pub trend: f64,

    pub trend_direction: TrendDirection,

    pub first_seen: NaiveDate,

    pub last_seen: NaiveDate,
}

/// Descending raw score, then more uses, then name.
pub(crate) fn by_score<K>(a: &FinalizedAggregate<K>, b: &FinalizedAggregate<K>) -> Ordering {
    b.raw_score
        .total_cmp(&a.raw_score)
        .then_with(|| b.uses.cmp(&a.uses))
        .then_with(|| a.name.cmp(&b.name))
}

/// Sort, truncate to `limit` and assign ranks and tiers.
///
/// Tiers are computed over the truncated list, so the same entity can
/// land in a different tier under another `limit` or filter.
pub fn rank<K>(mut aggregates: Vec<FinalizedAggregate<K>>, limit: usize) -> Vec<RankedEntry<K>> {
    aggregates.sort_by(by_score);
    aggregates.truncate(limit);

    let total = aggregates.len();
    aggregates
        .into_iter()
        .enumerate()
        .map(|(i, agg)| RankedEntry {
            rank: i + 1,
            tier: tier_for_index(i, total),
            percentile: round2(i as f64 / total as f64 * 100.0),
            score: round2(agg.raw_score),
            avg_score: round2(agg.avg_score),
            uses: agg.uses,
            first: agg.first,
            second: agg.second,
            third: agg.third,
            win_rate: round2(agg.win_rate * 100.0),
            avg_place: round2(agg.avg_place),
            trend: round2(agg.trend),
            trend_direction: agg.trend_direction,
            first_seen: agg.first_seen,
            last_seen: agg.last_seen,
            name: agg.name,
            key: agg.key,
        })
        .collect()
}

/// Aggregate and rank in one step.
pub fn rank_by<K, F>(
    rows: &[PlacementRecord],
    key_fn: F,
    limit: usize,
    min_uses: u32,
    reference: NaiveDate,
) -> Vec<RankedEntry<K>>
where
    K: Ord + Display,
    F: Fn(&PlacementRecord) -> Option<K>,
{
    rank(aggregate(rows, key_fn, min_uses, reference), limit)
}

pub fn ranked_blades(
    rows: &[PlacementRecord],
    limit: usize,
    min_uses: u32,
    reference: NaiveDate,
) -> Vec<RankedEntry<String>> {
    rank_by(rows, |r| Some(blade_key(r)), limit, min_uses, reference)
}

pub fn ranked_combos(
    rows: &[PlacementRecord],
    limit: usize,
    min_uses: u32,
    reference: NaiveDate,
) -> Vec<RankedEntry<ComboKey>> {
    rank_by(rows, |r| Some(ComboKey::from_record(r)), limit, min_uses, reference)
}

/// Rank one kind of sub-part. Rows without that part are ignored.
pub fn ranked_parts(
    rows: &[PlacementRecord],
    kind: PartKind,
    limit: usize,
    min_uses: u32,
    reference: NaiveDate,
) -> Vec<RankedEntry<String>> {
    rank_by(rows, |r| part_key(r, kind), limit, min_uses, reference)
}

/// Rank the ratchet/bit/assist setups one blade has been played with.
pub fn best_combos_for_blade(
    rows: &[PlacementRecord],
    blade: &str,
    limit: usize,
    reference: NaiveDate,
) -> Vec<RankedEntry<ComboKey>> {
    let wanted = normalize_blade(blade);
    rank_by(
        rows,
        |r| {
            let key = ComboKey::from_record(r);
            (key.blade == wanted).then_some(key)
        },
        limit,
        1,
        reference,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    fn row(tid: &str, days_back: i64, place: u8, blade: &str, ratchet: &str, bit: &str) -> PlacementRecord {
        PlacementRecord::new(
            tid,
            reference() - Duration::days(days_back),
            place,
            format!("p-{}-{}", tid, place),
            blade,
            ratchet,
            bit,
        )
    }

    /// `n` blades where blade i has `n - i` wins, so scores are strictly ordered.
    fn ladder(n: usize) -> Vec<PlacementRecord> {
        let mut rows = Vec::new();
        for i in 0..n {
            for w in 0..(n - i) {
                rows.push(row(&format!("t{}", w), 0, 1, &format!("Blade {:02}", i), "9-60", "Ball"));
            }
        }
        rows
    }

    #[test]
    fn test_tiers_monotonic() {
        let ranked = ranked_blades(&ladder(40), 40, 1, reference());
        assert_eq!(ranked.len(), 40);

        for pair in ranked.windows(2) {
            assert!(pair[0].score >= pair[1].score);
            assert!(pair[0].tier <= pair[1].tier, "{:?} above {:?}", pair[0].tier, pair[1].tier);
        }
        assert_eq!(ranked[0].tier, RankTier::SS);
        assert_eq!(ranked[39].tier, RankTier::F);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[39].rank, 40);
    }

    #[test]
    fn test_tiers_relative_to_limit() {
        let rows = ladder(40);
        let full = ranked_blades(&rows, 40, 1, reference());
        let short = ranked_blades(&rows, 2, 1, reference());

        assert_eq!(full[1].tier, RankTier::SS);
        assert_eq!(short[1].name, full[1].name);
        assert_eq!(short[1].tier, RankTier::C);
    }

    #[test]
    fn test_min_uses_excludes_top_scorer() {
        let mut rows = vec![
            // One huge recent win
            row("big", 0, 1, "Solo Blade", "9-60", "Ball"),
        ];
        for t in 0..3 {
            rows.push(row(&format!("t{}", t), 50, 3, "Steady Blade", "9-60", "Ball"));
        }

        let ranked = ranked_blades(&rows, 20, 3, reference());
        let names: Vec<_> = ranked.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Steady Blade"]);

        let ranked = ranked_blades(&rows, 20, 1, reference());
        assert_eq!(ranked[0].name, "Solo Blade");
    }

    #[test]
    fn test_tie_break_by_uses_then_name() {
        let rows = vec![
            row("t1", 0, 1, "Beta", "9-60", "Ball"),
            row("t1", 0, 1, "Alpha", "9-60", "Ball"),
            row("t2", 0, 4, "Gamma", "9-60", "Ball"),
            row("t3", 0, 1, "Gamma", "9-60", "Ball"),
        ];
        let ranked = ranked_blades(&rows, 10, 1, reference());
        let names: Vec<_> = ranked.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Gamma", "Alpha", "Beta"]);
    }

    #[test]
    fn test_ranked_combos_normalizes() {
        let rows = vec![
            row("t1", 0, 1, "Wand Wizard", "9-60", "B"),
            row("t2", 0, 2, "Wizard Rod", "9-60", "Ball"),
        ];
        let ranked = ranked_combos(&rows, 20, 2, reference());
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].name, "Wizard Rod 9-60 Ball");
        assert_eq!(ranked[0].uses, 2);
        assert_eq!(ranked[0].win_rate, 50.0);
    }

    #[test]
    fn test_ranked_parts() {
        let rows = vec![
            row("t1", 0, 1, "Wizard Rod", "M9-60", "Ball"),
            row("t2", 0, 1, "Shark Scale", "9-60", "LF"),
            row("t3", 0, 2, "Dran Buster", "1-60", "Low Flat"),
        ];

        let ratchets = ranked_parts(&rows, PartKind::Ratchet, 15, 1, reference());
        assert_eq!(ratchets[0].name, "9-60");
        assert_eq!(ratchets[0].uses, 2);

        let bits = ranked_parts(&rows, PartKind::Bit, 15, 2, reference());
        assert_eq!(bits.len(), 1);
        assert_eq!(bits[0].name, "Low Flat");

        let assists = ranked_parts(&rows, PartKind::Assist, 15, 1, reference());
        assert!(assists.is_empty());
    }

    #[test]
    fn test_best_combos_for_blade() {
        let rows = vec![
            row("t1", 0, 1, "Wizard Rod", "9-60", "Ball"),
            row("t2", 0, 1, "Wizard Rod", "9-60", "Ball"),
            row("t3", 0, 2, "Wand Wizard", "5-70", "Hexa"),
            row("t4", 0, 1, "Shark Scale", "9-60", "Ball"),
        ];
        let combos = best_combos_for_blade(&rows, "Wand Wizard", 10, reference());
        let names: Vec<_> = combos.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Wizard Rod 9-60 Ball", "Wizard Rod 5-70 Hexa"]);
    }

    #[test]
    fn test_empty_rows() {
        assert!(ranked_blades(&[], 20, 3, reference()).is_empty());
        assert!(rank::<String>(Vec::new(), 5).is_empty());
    }
}
