//! Meta overview reports: dataset summary, snapshot, spotlight,
//! distribution and share over time.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::calculate::{days_ago, percent, round2};
use crate::models::{PlacementRecord, Region};
use crate::normalize::{blade_key, ComboKey};

use super::aggregate::aggregate;
use super::rankings::by_score;

/// Length of each spotlight comparison window.
pub const SPOTLIGHT_WINDOW_DAYS: i64 = 30;

/// Risers and fallers listed per spotlight.
const SPOTLIGHT_MOVERS: usize = 3;

/// Minimum uses across both spotlight windows to count as a mover.
const MOVER_MIN_USES: u32 = 2;

pub const OTHERS_LABEL: &str = "Others";

/// Counts over the whole scoped dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseSummary {
    pub tournaments: u32,
    /// Distinct (tournament, place, player) finishes
    pub placements: u32,
    pub unique_players: u32,
    pub unique_blades: u32,
    pub unique_combos: u32,
    pub earliest_tournament: Option<NaiveDate>,
    pub latest_tournament: Option<NaiveDate>,
    pub regions: Vec<Region>,
}

pub fn database_summary(rows: &[PlacementRecord]) -> DatabaseSummary {
    let tournaments: HashSet<&str> = rows.iter().map(|r| r.tournament_id.as_str()).collect();
    let placements: HashSet<(&str, u8, &str)> = rows
        .iter()
        .map(|r| (r.tournament_id.as_str(), r.place, r.player_name.as_str()))
        .collect();
    let players: HashSet<&str> = rows.iter().map(|r| r.player_name.as_str()).collect();
    let blades: HashSet<String> = rows.iter().map(blade_key).collect();
    let combos: HashSet<ComboKey> = rows.iter().map(ComboKey::from_record).collect();
    let regions: BTreeSet<Region> = rows.iter().filter_map(|r| r.region).collect();

    DatabaseSummary {
        tournaments: tournaments.len() as u32,
        placements: placements.len() as u32,
        unique_players: players.len() as u32,
        unique_blades: blades.len() as u32,
        unique_combos: combos.len() as u32,
        earliest_tournament: rows.iter().map(|r| r.tournament_date).min(),
        latest_tournament: rows.iter().map(|r| r.tournament_date).max(),
        regions: regions.into_iter().collect(),
    }
}

/// Most recent tournament date in the rows.
pub fn latest_date(rows: &[PlacementRecord]) -> Option<NaiveDate> {
    rows.iter().map(|r| r.tournament_date).max()
}

/// Use and win counts of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageCount {
    pub name: String,
    pub uses: u32,
    pub wins: u32,
}

/// Count uses and wins per key, most used first (ties: wins, then name).
pub fn usage_counts<'a, I, F>(rows: I, key_fn: F) -> Vec<UsageCount>
where
    I: IntoIterator<Item = &'a PlacementRecord>,
    F: Fn(&PlacementRecord) -> String,
{
    let mut counts: HashMap<String, (u32, u32)> = HashMap::new();
    for row in rows {
        let entry = counts.entry(key_fn(row)).or_default();
        entry.0 += 1;
        if row.is_winner() {
            entry.1 += 1;
        }
    }

    let mut result: Vec<UsageCount> = counts
        .into_iter()
        .map(|(name, (uses, wins))| UsageCount { name, uses, wins })
        .collect();
    result.sort_by(|a, b| {
        b.uses
            .cmp(&a.uses)
            .then_with(|| b.wins.cmp(&a.wins))
            .then_with(|| a.name.cmp(&b.name))
    });
    result
}

fn combo_name(row: &PlacementRecord) -> String {
    ComboKey::from_record(row).display()
}

/// Most played blades and combos over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaSnapshot {
    pub period_days: i64,
    pub tournaments: u32,
    pub total_uses: u32,
    pub top_blades: Vec<UsageCount>,
    pub top_combos: Vec<UsageCount>,
}

/// Rows with `days_ago <= days` relative to `reference`; top 10 of each.
pub fn meta_snapshot(rows: &[PlacementRecord], days: i64, reference: NaiveDate) -> MetaSnapshot {
    let window: Vec<&PlacementRecord> = rows
        .iter()
        .filter(|r| r.tournament_date <= reference && days_ago(r.tournament_date, reference) <= days)
        .collect();
    let tournaments: HashSet<&str> = window.iter().map(|r| r.tournament_id.as_str()).collect();

    let mut top_blades = usage_counts(window.iter().copied(), blade_key);
    top_blades.truncate(10);
    let mut top_combos = usage_counts(window.iter().copied(), combo_name);
    top_combos.truncate(10);

    MetaSnapshot {
        period_days: days,
        tournaments: tournaments.len() as u32,
        total_uses: window.len() as u32,
        top_blades,
        top_combos,
    }
}

/// Best blade of the latest window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Champion {
    pub blade: String,
    pub score: f64,
    pub uses: u32,
    pub wins: u32,
    /// Percentage of uses that won
    pub win_rate: f64,
    pub best_combo: Option<String>,
}

/// Change in use share between two consecutive windows, in percentage points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareShift {
    pub blade: String,
    pub current_share: f64,
    pub previous_share: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaSpotlight {
    /// Latest tournament date; windows are measured back from it
    pub anchor_date: Option<NaiveDate>,
    pub window_days: i64,
    pub tournaments: u32,
    pub champion: Option<Champion>,
    pub risers: Vec<ShareShift>,
    pub fallers: Vec<ShareShift>,
}

impl MetaSpotlight {
    fn empty() -> Self {
        Self {
            anchor_date: None,
            window_days: SPOTLIGHT_WINDOW_DAYS,
            tournaments: 0,
            champion: None,
            risers: Vec::new(),
            fallers: Vec::new(),
        }
    }
}

/// Champion, risers and fallers anchored at the most recent tournament.
///
/// The current window holds rows less than 30 days before the anchor, the
/// previous window the 30 days before that.
pub fn meta_spotlight(rows: &[PlacementRecord]) -> MetaSpotlight {
    let Some(anchor) = latest_date(rows) else {
        return MetaSpotlight::empty();
    };

    let age = |r: &PlacementRecord| days_ago(r.tournament_date, anchor);
    let current: Vec<&PlacementRecord> =
        rows.iter().filter(|r| age(r) < SPOTLIGHT_WINDOW_DAYS).collect();
    let previous: Vec<&PlacementRecord> = rows
        .iter()
        .filter(|r| {
            let a = age(r);
            (SPOTLIGHT_WINDOW_DAYS..2 * SPOTLIGHT_WINDOW_DAYS).contains(&a)
        })
        .collect();
    let tournaments: HashSet<&str> = current.iter().map(|r| r.tournament_id.as_str()).collect();

    MetaSpotlight {
        anchor_date: Some(anchor),
        window_days: SPOTLIGHT_WINDOW_DAYS,
        tournaments: tournaments.len() as u32,
        champion: champion(&current, anchor),
        risers: share_shifts(&current, &previous, true),
        fallers: share_shifts(&current, &previous, false),
    }
}

fn champion(window: &[&PlacementRecord], anchor: NaiveDate) -> Option<Champion> {
    let mut blades = aggregate(window.iter().copied(), |r| Some(blade_key(r)), 1, anchor);
    blades.sort_by(by_score);
    let top = blades.into_iter().next()?;

    let mut combos = aggregate(
        window.iter().copied(),
        |r| {
            let key = ComboKey::from_record(r);
            (key.blade == top.name).then_some(key)
        },
        1,
        anchor,
    );
    combos.sort_by(by_score);

    Some(Champion {
        score: round2(top.raw_score),
        uses: top.uses,
        wins: top.first,
        win_rate: round2(top.win_rate * 100.0),
        best_combo: combos.into_iter().next().map(|c| c.name),
        blade: top.name,
    })
}

fn share_shifts(
    current: &[&PlacementRecord],
    previous: &[&PlacementRecord],
    rising: bool,
) -> Vec<ShareShift> {
    let mut current_uses: HashMap<String, u32> = HashMap::new();
    for row in current {
        *current_uses.entry(blade_key(row)).or_default() += 1;
    }
    let mut previous_uses: HashMap<String, u32> = HashMap::new();
    for row in previous {
        *previous_uses.entry(blade_key(row)).or_default() += 1;
    }

    let current_total = current.len() as u32;
    let previous_total = previous.len() as u32;
    let blades: BTreeSet<&String> = current_uses.keys().chain(previous_uses.keys()).collect();

    let mut shifts: Vec<ShareShift> = blades
        .into_iter()
        .filter_map(|blade| {
            let cur = current_uses.get(blade).copied().unwrap_or(0);
            let prev = previous_uses.get(blade).copied().unwrap_or(0);
            if cur + prev < MOVER_MIN_USES {
                return None;
            }
            let current_share = percent(cur, current_total);
            let previous_share = percent(prev, previous_total);
            let delta = current_share - previous_share;
            let keep = if rising { delta > 0.0 } else { delta < 0.0 };
            keep.then(|| ShareShift {
                blade: blade.clone(),
                current_share,
                previous_share,
                delta,
            })
        })
        .collect();

    if rising {
        shifts.sort_by(|a, b| b.delta.total_cmp(&a.delta).then_with(|| a.blade.cmp(&b.blade)));
    } else {
        shifts.sort_by(|a, b| a.delta.total_cmp(&b.delta).then_with(|| a.blade.cmp(&b.blade)));
    }
    shifts.truncate(SPOTLIGHT_MOVERS);

    for shift in &mut shifts {
        shift.current_share = round2(shift.current_share);
        shift.previous_share = round2(shift.previous_share);
        shift.delta = round2(shift.delta);
    }
    shifts
}

/// One slice of a share chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareSlice {
    pub name: String,
    pub uses: u32,
    /// Percentage of all uses
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaDistribution {
    /// Trailing window, or `None` for all time
    pub period_days: Option<i64>,
    pub total_uses: u32,
    pub slices: Vec<ShareSlice>,
}

/// Blade use shares: the `top` most used blades plus an "Others" slice.
pub fn meta_distribution(
    rows: &[PlacementRecord],
    days: Option<i64>,
    top: usize,
    reference: NaiveDate,
) -> MetaDistribution {
    let window: Vec<&PlacementRecord> = rows
        .iter()
        .filter(|r| match days {
            Some(d) => r.tournament_date <= reference && days_ago(r.tournament_date, reference) <= d,
            None => true,
        })
        .collect();
    let total = window.len() as u32;

    let counts = usage_counts(window.iter().copied(), blade_key);
    let others: u32 = counts.iter().skip(top).map(|c| c.uses).sum();

    let mut slices: Vec<ShareSlice> = counts
        .into_iter()
        .take(top)
        .map(|c| ShareSlice {
            share: round2(percent(c.uses, total)),
            name: c.name,
            uses: c.uses,
        })
        .collect();
    if others > 0 {
        slices.push(ShareSlice {
            name: OTHERS_LABEL.to_string(),
            uses: others,
            share: round2(percent(others, total)),
        });
    }

    MetaDistribution {
        period_days: days,
        total_uses: total,
        slices,
    }
}

/// Monthly share series of one blade (or the "Others" bucket).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareSeries {
    pub name: String,
    /// One percentage per entry of [`ShareOverTime::months`]
    pub shares: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareOverTime {
    /// `YYYY-MM`, oldest first, with no gaps
    pub months: Vec<String>,
    pub series: Vec<ShareSeries>,
}

/// Consecutive `(year, month)` pairs covering `[earliest, latest]`.
pub(crate) fn month_range(earliest: NaiveDate, latest: NaiveDate) -> Vec<(i32, u32)> {
    let mut months = Vec::new();
    let (mut year, mut month) = (earliest.year(), earliest.month());
    let end = (latest.year(), latest.month());
    while (year, month) <= end {
        months.push((year, month));
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    months
}

pub(crate) fn month_label((year, month): (i32, u32)) -> String {
    format!("{:04}-{:02}", year, month)
}

/// Monthly use share of the `top` most used blades, plus "Others".
pub fn meta_share_over_time(rows: &[PlacementRecord], top: usize) -> ShareOverTime {
    let (Some(earliest), Some(latest)) = (
        rows.iter().map(|r| r.tournament_date).min(),
        rows.iter().map(|r| r.tournament_date).max(),
    ) else {
        return ShareOverTime {
            months: Vec::new(),
            series: Vec::new(),
        };
    };

    let months = month_range(earliest, latest);
    let index: HashMap<(i32, u32), usize> =
        months.iter().enumerate().map(|(i, m)| (*m, i)).collect();

    let leaders: Vec<String> = usage_counts(rows, blade_key)
        .into_iter()
        .take(top)
        .map(|c| c.name)
        .collect();

    let mut totals = vec![0u32; months.len()];
    let mut per_blade: Vec<Vec<u32>> = vec![vec![0u32; months.len()]; leaders.len()];
    let mut others = vec![0u32; months.len()];

    for row in rows {
        let Some(&m) = index.get(&(row.tournament_date.year(), row.tournament_date.month())) else {
            continue;
        };
        totals[m] += 1;
        let key = blade_key(row);
        match leaders.iter().position(|b| *b == key) {
            Some(i) => per_blade[i][m] += 1,
            None => others[m] += 1,
        }
    }

    let to_shares = |counts: &[u32]| -> Vec<f64> {
        counts
            .iter()
            .zip(totals.iter())
            .map(|(c, t)| round2(percent(*c, *t)))
            .collect()
    };

    let mut series: Vec<ShareSeries> = leaders
        .iter()
        .zip(per_blade.iter())
        .map(|(name, counts)| ShareSeries {
            name: name.clone(),
            shares: to_shares(counts),
        })
        .collect();
    if others.iter().any(|c| *c > 0) {
        series.push(ShareSeries {
            name: OTHERS_LABEL.to_string(),
            shares: to_shares(&others),
        });
    }

    ShareOverTime {
        months: months.into_iter().map(month_label).collect(),
        series,
    }
}
