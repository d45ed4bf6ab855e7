//! Head-to-head comparison of two blades or two combos.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::calculate::round2;
use crate::models::PlacementRecord;
use crate::normalize::{blade_key, normalize_blade, ComboKey};

use super::aggregate::aggregate;

/// Totals of one side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideStats {
    pub name: String,
    pub score: f64,
    pub uses: u32,
    pub first: u32,
    pub second: u32,
    pub third: u32,
    /// Percentage of uses that won
    pub win_rate: f64,
    pub tournaments: u32,
}

impl SideStats {
    fn empty(name: String) -> Self {
        Self {
            name,
            score: 0.0,
            uses: 0,
            first: 0,
            second: 0,
            third: 0,
            win_rate: 0.0,
            tournaments: 0,
        }
    }
}

/// Outcome over tournaments both sides placed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct HeadToHead {
    pub common_tournaments: u32,
    pub a_placed_higher: u32,
    pub b_placed_higher: u32,
    pub ties: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub a: SideStats,
    pub b: SideStats,
    pub head_to_head: HeadToHead,
}

fn side_stats(rows: &[&PlacementRecord], name: &str, reference: NaiveDate) -> SideStats {
    match aggregate(rows.iter().copied(), |_| Some(name.to_string()), 1, reference).pop() {
        Some(agg) => SideStats {
            name: agg.name,
            score: round2(agg.raw_score),
            uses: agg.uses,
            first: agg.first,
            second: agg.second,
            third: agg.third,
            win_rate: round2(agg.win_rate * 100.0),
            tournaments: agg.tournaments,
        },
        None => SideStats::empty(name.to_string()),
    }
}

/// Best (lowest) place per tournament.
fn best_places<'a>(rows: &[&'a PlacementRecord]) -> HashMap<&'a str, u8> {
    let mut best: HashMap<&'a str, u8> = HashMap::new();
    for &row in rows {
        best.entry(row.tournament_id.as_str())
            .and_modify(|p| *p = (*p).min(row.place))
            .or_insert(row.place);
    }
    best
}

fn head_to_head(a_rows: &[&PlacementRecord], b_rows: &[&PlacementRecord]) -> HeadToHead {
    let a_best = best_places(a_rows);
    let b_best = best_places(b_rows);

    let mut result = HeadToHead::default();
    for (tid, a_place) in &a_best {
        let Some(b_place) = b_best.get(tid) else {
            continue;
        };
        result.common_tournaments += 1;
        match a_place.cmp(b_place) {
            std::cmp::Ordering::Less => result.a_placed_higher += 1,
            std::cmp::Ordering::Greater => result.b_placed_higher += 1,
            std::cmp::Ordering::Equal => result.ties += 1,
        }
    }
    result
}

fn compare_by<A, B>(
    rows: &[PlacementRecord],
    a_name: &str,
    b_name: &str,
    is_a: A,
    is_b: B,
    reference: NaiveDate,
) -> Comparison
where
    A: Fn(&PlacementRecord) -> bool,
    B: Fn(&PlacementRecord) -> bool,
{
    let a_rows: Vec<&PlacementRecord> = rows.iter().filter(|r| is_a(r)).collect();
    let b_rows: Vec<&PlacementRecord> = rows.iter().filter(|r| is_b(r)).collect();

    Comparison {
        a: side_stats(&a_rows, a_name, reference),
        b: side_stats(&b_rows, b_name, reference),
        head_to_head: head_to_head(&a_rows, &b_rows),
    }
}

/// Compare two blades by name (aliases resolved).
pub fn compare_blades(rows: &[PlacementRecord], a: &str, b: &str, reference: NaiveDate) -> Comparison {
    let a = normalize_blade(a);
    let b = normalize_blade(b);
    compare_by(
        rows,
        &a,
        &b,
        |r| blade_key(r) == a,
        |r| blade_key(r) == b,
        reference,
    )
}

/// Compare two exact combos.
pub fn compare_combos(
    rows: &[PlacementRecord],
    a: &ComboKey,
    b: &ComboKey,
    reference: NaiveDate,
) -> Comparison {
    compare_by(
        rows,
        &a.display(),
        &b.display(),
        |r| ComboKey::from_record(r) == *a,
        |r| ComboKey::from_record(r) == *b,
        reference,
    )
}

/// Parse `"blade|ratchet|bit"` or `"blade|ratchet|bit|assist"` into a key.
pub fn parse_combo(query: &str) -> Option<ComboKey> {
    let parts: Vec<&str> = query.split('|').map(str::trim).collect();
    match parts.as_slice() {
        [blade, ratchet, bit] if !blade.is_empty() => {
            Some(ComboKey::new(blade, None, None, ratchet, bit))
        }
        [blade, ratchet, bit, assist] if !blade.is_empty() => {
            Some(ComboKey::new(blade, None, Some(assist), ratchet, bit))
        }
        _ => None,
    }
}
