//! Meta evolution: how blade usage moved across eras and months.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::calculate::{percent, round2};
use crate::models::{EraSplit, MetaEra, PlacementRecord, Trajectory};
use crate::normalize::{blade_key, ComboKey};

use super::meta::{month_label, month_range, usage_counts, UsageCount};

/// Eras the dataset span is divided into.
pub const EVOLUTION_ERAS: usize = 4;

/// Blades listed per era.
const ERA_TOP_BLADES: usize = 5;

/// Positions a blade must move between its first and last ranked era to
/// count as rising or declining.
const TRAJECTORY_STEP: i64 = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BladeShare {
    pub name: String,
    pub uses: u32,
    pub wins: u32,
    /// Percentage of the era's uses
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EraSummary {
    pub era: MetaEra,
    pub tournaments: u32,
    pub total_uses: u32,
    pub top_blades: Vec<BladeShare>,
    pub dominant_blade: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary {
    /// `YYYY-MM`
    pub month: String,
    pub tournaments: u32,
    pub uses: u32,
    pub top_blade: Option<String>,
    pub top_combo: Option<String>,
    /// Blades seen for the first time this month
    pub new_blades: Vec<String>,
}

/// Rank of one blade in each era.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankJourney {
    pub blade: String,
    pub total_uses: u32,
    /// 1-based rank by uses per era, `None` when absent
    pub ranks: Vec<Option<usize>>,
    /// Label of the era with the best rank (later era on ties)
    pub peak_era: Option<String>,
    pub trajectory: Trajectory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaEvolution {
    pub eras: Vec<EraSummary>,
    pub timeline: Vec<MonthSummary>,
    pub journeys: Vec<RankJourney>,
}

/// Evolution report over the `top` most used blades.
pub fn meta_evolution(rows: &[PlacementRecord], top: usize) -> MetaEvolution {
    let (Some(earliest), Some(latest)) = (
        rows.iter().map(|r| r.tournament_date).min(),
        rows.iter().map(|r| r.tournament_date).max(),
    ) else {
        return MetaEvolution {
            eras: Vec::new(),
            timeline: Vec::new(),
            journeys: Vec::new(),
        };
    };

    let split = EraSplit::equal(earliest, latest, EVOLUTION_ERAS);
    let mut by_era: Vec<Vec<&PlacementRecord>> = vec![Vec::new(); split.len()];
    for row in rows {
        by_era[split.index_for(row.tournament_date)].push(row);
    }

    let era_counts: Vec<Vec<UsageCount>> = by_era
        .iter()
        .map(|era_rows| usage_counts(era_rows.iter().copied(), blade_key))
        .collect();

    let eras = split
        .eras()
        .iter()
        .zip(by_era.iter().zip(era_counts.iter()))
        .map(|(era, (era_rows, counts))| era_summary(era, era_rows, counts))
        .collect();

    let leaders: Vec<UsageCount> = usage_counts(rows, blade_key).into_iter().take(top).collect();
    let journeys = leaders
        .into_iter()
        .map(|leader| rank_journey(leader, &era_counts, split.eras()))
        .collect();

    MetaEvolution {
        eras,
        timeline: timeline(rows, earliest, latest),
        journeys,
    }
}

fn era_summary(era: &MetaEra, rows: &[&PlacementRecord], counts: &[UsageCount]) -> EraSummary {
    let total = rows.len() as u32;
    let tournaments: HashSet<&str> = rows.iter().map(|r| r.tournament_id.as_str()).collect();

    EraSummary {
        era: era.clone(),
        tournaments: tournaments.len() as u32,
        total_uses: total,
        top_blades: counts
            .iter()
            .take(ERA_TOP_BLADES)
            .map(|c| BladeShare {
                name: c.name.clone(),
                uses: c.uses,
                wins: c.wins,
                share: round2(percent(c.uses, total)),
            })
            .collect(),
        dominant_blade: counts.first().map(|c| c.name.clone()),
    }
}

fn rank_journey(leader: UsageCount, era_counts: &[Vec<UsageCount>], eras: &[MetaEra]) -> RankJourney {
    let ranks: Vec<Option<usize>> = era_counts
        .iter()
        .map(|counts| counts.iter().position(|c| c.name == leader.name).map(|i| i + 1))
        .collect();

    let mut peak: Option<(usize, usize)> = None;
    for (i, rank) in ranks.iter().enumerate() {
        if let Some(rank) = *rank {
            if peak.map_or(true, |(_, best)| rank <= best) {
                peak = Some((i, rank));
            }
        }
    }

    RankJourney {
        peak_era: peak.and_then(|(i, _)| eras.get(i)).map(|e| e.label.clone()),
        trajectory: trajectory(&ranks),
        total_uses: leader.uses,
        blade: leader.name,
        ranks,
    }
}

/// Classify a rank history (oldest era first).
pub fn trajectory(ranks: &[Option<usize>]) -> Trajectory {
    let Some((last, earlier)) = ranks.split_last() else {
        return Trajectory::Steady;
    };
    let first_ranked = earlier.iter().flatten().next();

    match (first_ranked, last) {
        (None, Some(_)) => Trajectory::Newcomer,
        (Some(_), None) => Trajectory::Faded,
        (Some(&first), Some(last)) => {
            let moved = first as i64 - *last as i64;
            if moved >= TRAJECTORY_STEP {
                Trajectory::Rising
            } else if moved <= -TRAJECTORY_STEP {
                Trajectory::Declining
            } else {
                Trajectory::Steady
            }
        }
        (None, None) => Trajectory::Steady,
    }
}

fn timeline(rows: &[PlacementRecord], earliest: NaiveDate, latest: NaiveDate) -> Vec<MonthSummary> {
    let mut by_month: BTreeMap<(i32, u32), Vec<&PlacementRecord>> = BTreeMap::new();
    for row in rows {
        by_month
            .entry((row.tournament_date.year(), row.tournament_date.month()))
            .or_default()
            .push(row);
    }

    // First month each blade appears in
    let mut debut: HashMap<String, (i32, u32)> = HashMap::new();
    for row in rows {
        let month = (row.tournament_date.year(), row.tournament_date.month());
        debut
            .entry(blade_key(row))
            .and_modify(|m| *m = (*m).min(month))
            .or_insert(month);
    }

    month_range(earliest, latest)
        .into_iter()
        .map(|month| {
            let month_rows = by_month.remove(&month).unwrap_or_default();
            let tournaments: HashSet<&str> =
                month_rows.iter().map(|r| r.tournament_id.as_str()).collect();

            let mut new_blades: Vec<String> = debut
                .iter()
                .filter(|(_, m)| **m == month)
                .map(|(b, _)| b.clone())
                .collect();
            new_blades.sort();

            MonthSummary {
                month: month_label(month),
                tournaments: tournaments.len() as u32,
                uses: month_rows.len() as u32,
                top_blade: usage_counts(month_rows.iter().copied(), blade_key)
                    .into_iter()
                    .next()
                    .map(|c| c.name),
                top_combo: usage_counts(month_rows.iter().copied(), |r| {
                    ComboKey::from_record(r).display()
                })
                .into_iter()
                .next()
                .map(|c| c.name),
                new_blades,
            }
        })
        .collect()
}
