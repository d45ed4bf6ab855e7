//! Hidden-gem detection.
//!
//! The scoped rows are split into three equal-duration eras (early, mid,
//! current) between the earliest and latest tournament, and into rolling
//! 60 and 90 day windows measured back from the latest tournament. Each
//! category applies its own predicate over per-combo profiles, sorts by
//! its own relevance metric and keeps the first eight.
//!
//! Every category scans all combos independently, so one combo can be
//! listed under more than one category.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::calculate::{days_ago, round2, win_rate};
use crate::models::{
    DataQuality, EraPhase, EraSplit, GemCategory, MetaEra, PlacementRecord, TrendDirection,
};
use crate::normalize::{blade_key, ComboKey};

use super::aggregate::{aggregate, FinalizedAggregate};
use super::rankings::by_score;

/// Entries kept per category.
pub const GEMS_PER_CATEGORY: usize = 8;

/// Blades treated as the current meta.
const META_BLADE_COUNT: usize = 10;

const SHORT_WINDOW_DAYS: i64 = 60;
const LONG_WINDOW_DAYS: i64 = 90;

/// A combo flagged as worth a second look.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancedGem {
    pub category: GemCategory,

    /// Combo display name
    pub combo: String,

    pub blade: String,
    pub ratchet: String,
    pub bit: String,
    pub assist: Option<String>,

    pub uses: u32,
    pub wins: u32,

    /// Percentage of uses that won
    pub win_rate: f64,

    /// Weighted score at the analysis reference date
    pub score: f64,

    pub reason: String,
    pub insight: String,

    /// Era label with the most uses of this combo
    pub peak_era: String,

    pub trend: f64,
    pub trend_direction: TrendDirection,

    pub data_quality: DataQuality,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HiddenGemsReport {
    pub eras: Vec<MetaEra>,

    /// Current-era meta blades, best first
    pub meta_blades: Vec<String>,

    pub underused: Vec<EnhancedGem>,
    pub forgotten: Vec<EnhancedGem>,
    pub rising: Vec<EnhancedGem>,
    pub counter_meta: Vec<EnhancedGem>,
}

impl HiddenGemsReport {
    fn empty() -> Self {
        Self {
            eras: Vec::new(),
            meta_blades: Vec::new(),
            underused: Vec::new(),
            forgotten: Vec::new(),
            rising: Vec::new(),
            counter_meta: Vec::new(),
        }
    }

    /// Total gems across all categories.
    pub fn len(&self) -> usize {
        self.underused.len() + self.forgotten.len() + self.rising.len() + self.counter_meta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Use and win counters for one window.
#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    uses: u32,
    wins: u32,
}

impl Tally {
    fn add(&mut self, record: &PlacementRecord) {
        self.uses += 1;
        if record.is_winner() {
            self.wins += 1;
        }
    }

    fn win_rate(&self) -> f64 {
        win_rate(self.wins, self.uses)
    }
}

#[derive(Debug, Clone, Default)]
struct ComboProfile {
    total: Tally,
    eras: [Tally; 3],
    last_short: Tally,
    last_long: Tally,
    last_seen: Option<NaiveDate>,
}

impl ComboProfile {
    fn early_mid(&self) -> Tally {
        Tally {
            uses: self.eras[0].uses + self.eras[1].uses,
            wins: self.eras[0].wins + self.eras[1].wins,
        }
    }

    fn current(&self) -> Tally {
        self.eras[EraPhase::Current.index()]
    }

    /// Era with the most uses; ties go to the later era.
    fn peak_era(&self) -> usize {
        let mut peak = 0;
        for (i, era) in self.eras.iter().enumerate() {
            if era.uses >= self.eras[peak].uses {
                peak = i;
            }
        }
        peak
    }
}

#[derive(Debug, Clone, Default)]
struct BladeProfile {
    total: Tally,
    last_short: Tally,
}

/// Everything the category predicates look at.
struct GemContext<'a> {
    split: EraSplit,
    combos: BTreeMap<ComboKey, ComboProfile>,
    blades: HashMap<String, BladeProfile>,
    meta_blades: HashSet<String>,
    scores: HashMap<&'a ComboKey, &'a FinalizedAggregate<ComboKey>>,
    trends: HashMap<&'a ComboKey, &'a FinalizedAggregate<ComboKey>>,
}

struct Candidate<'c> {
    key: &'c ComboKey,
    profile: &'c ComboProfile,
}

pub fn hidden_gems(rows: &[PlacementRecord], reference: NaiveDate) -> HiddenGemsReport {
    let (Some(earliest), Some(latest)) = (
        rows.iter().map(|r| r.tournament_date).min(),
        rows.iter().map(|r| r.tournament_date).max(),
    ) else {
        return HiddenGemsReport::empty();
    };

    let split = EraSplit::equal(earliest, latest, 3);
    let current_era = EraPhase::Current.index();

    let mut combos: BTreeMap<ComboKey, ComboProfile> = BTreeMap::new();
    let mut blades: HashMap<String, BladeProfile> = HashMap::new();
    for row in rows {
        let era = split.index_for(row.tournament_date);
        let age = days_ago(row.tournament_date, latest);

        let profile = combos.entry(ComboKey::from_record(row)).or_default();
        profile.total.add(row);
        profile.eras[era].add(row);
        if age <= SHORT_WINDOW_DAYS {
            profile.last_short.add(row);
        }
        if age <= LONG_WINDOW_DAYS {
            profile.last_long.add(row);
        }
        profile.last_seen = Some(
            profile
                .last_seen
                .map_or(row.tournament_date, |d| d.max(row.tournament_date)),
        );

        let blade = blades.entry(blade_key(row)).or_default();
        blade.total.add(row);
        if age <= SHORT_WINDOW_DAYS {
            blade.last_short.add(row);
        }
    }

    let mut meta_ranked = aggregate(
        rows.iter()
            .filter(|r| split.index_for(r.tournament_date) == current_era),
        |r| Some(blade_key(r)),
        1,
        reference,
    );
    meta_ranked.sort_by(by_score);
    meta_ranked.truncate(META_BLADE_COUNT);
    let meta_blade_list: Vec<String> = meta_ranked.into_iter().map(|a| a.name).collect();

    let scored = aggregate(rows, |r| Some(ComboKey::from_record(r)), 1, reference);
    let trended = aggregate(rows, |r| Some(ComboKey::from_record(r)), 1, latest);

    let ctx = GemContext {
        meta_blades: meta_blade_list.iter().cloned().collect(),
        scores: scored.iter().map(|a| (&a.key, a)).collect(),
        trends: trended.iter().map(|a| (&a.key, a)).collect(),
        split,
        combos,
        blades,
    };

    let underused = ctx.underused();
    let forgotten = ctx.forgotten();
    let rising = ctx.rising();
    let counter_meta = ctx.counter_meta();

    debug!(
        "Hidden gems: {} underused, {} forgotten, {} rising, {} counter-meta",
        underused.len(),
        forgotten.len(),
        rising.len(),
        counter_meta.len()
    );

    HiddenGemsReport {
        eras: ctx.split.eras().to_vec(),
        meta_blades: meta_blade_list,
        underused,
        forgotten,
        rising,
        counter_meta,
    }
}

impl<'a> GemContext<'a> {
    fn candidates(&self) -> Vec<Candidate<'_>> {
        self.combos
            .iter()
            .map(|(key, profile)| Candidate { key, profile })
            .collect()
    }

    fn is_meta(&self, key: &ComboKey) -> bool {
        self.meta_blades.contains(&key.blade)
    }

    fn blade_win_rate(&self, key: &ComboKey) -> f64 {
        self.blades
            .get(&key.blade)
            .map_or(0.0, |b| b.total.win_rate())
    }

    fn finish(
        &self,
        mut picked: Vec<Candidate<'_>>,
        order: impl Fn(&Candidate<'_>, &Candidate<'_>) -> Ordering,
        build: impl Fn(&Candidate<'_>) -> (String, String, DataQuality),
        category: GemCategory,
    ) -> Vec<EnhancedGem> {
        picked.sort_by(|a, b| order(a, b).then_with(|| a.key.cmp(b.key)));
        picked.truncate(GEMS_PER_CATEGORY);

        picked
            .iter()
            .map(|c| {
                let (reason, insight, data_quality) = build(c);
                self.gem(c, category, reason, insight, data_quality)
            })
            .collect()
    }

    fn gem(
        &self,
        c: &Candidate<'_>,
        category: GemCategory,
        reason: String,
        insight: String,
        data_quality: DataQuality,
    ) -> EnhancedGem {
        let score = self.scores.get(c.key).map_or(0.0, |a| a.raw_score);
        let (trend, trend_direction) = self
            .trends
            .get(c.key)
            .map_or((0.0, TrendDirection::Stable), |a| (a.trend, a.trend_direction));
        let peak = c.profile.peak_era();

        EnhancedGem {
            category,
            combo: c.key.display(),
            blade: c.key.blade.clone(),
            ratchet: c.key.ratchet.clone(),
            bit: c.key.bit.clone(),
            assist: c.key.assist.clone(),
            uses: c.profile.total.uses,
            wins: c.profile.total.wins,
            win_rate: round2(c.profile.total.win_rate() * 100.0),
            score: round2(score),
            reason,
            insight,
            peak_era: self
                .split
                .eras()
                .get(peak)
                .map(|e| e.label.clone())
                .unwrap_or_default(),
            trend: round2(trend),
            trend_direction,
            data_quality,
        }
    }

    /// Winning blades the current meta ignores, one combo per blade.
    fn underused(&self) -> Vec<EnhancedGem> {
        let mut best_per_blade: HashMap<&str, Candidate<'_>> = HashMap::new();
        for c in self.candidates() {
            let key = c.key;
            let Some(blade) = self.blades.get(&key.blade) else {
                continue;
            };
            let eligible = blade.total.uses >= 5
                && blade.total.win_rate() >= 0.20
                && !self.is_meta(key)
                && blade.last_short.uses <= 5;
            if !eligible {
                continue;
            }

            let better = match best_per_blade.get(key.blade.as_str()) {
                Some(current) => {
                    (c.profile.total.wins, c.profile.total.uses)
                        > (current.profile.total.wins, current.profile.total.uses)
                }
                None => true,
            };
            if better {
                best_per_blade.insert(key.blade.as_str(), c);
            }
        }

        self.finish(
            best_per_blade.into_values().collect(),
            |a, b| {
                self.blade_win_rate(b.key)
                    .total_cmp(&self.blade_win_rate(a.key))
            },
            |c| {
                let blade = self
                    .blades
                    .get(&c.key.blade)
                    .cloned()
                    .unwrap_or_default();
                (
                    format!(
                        "{} wins {:.0}% of {} appearances but has only {} in the last {} days",
                        c.key.blade,
                        blade.total.win_rate() * 100.0,
                        blade.total.uses,
                        blade.last_short.uses,
                        SHORT_WINDOW_DAYS
                    ),
                    format!(
                        "Best showing: {} with {} wins from {} uses",
                        c.key.display(),
                        c.profile.total.wins,
                        c.profile.total.uses
                    ),
                    DataQuality::from_sample(blade.total.uses, 15, 8),
                )
            },
            GemCategory::Underused,
        )
    }

    /// Past winners that dropped out of play.
    fn forgotten(&self) -> Vec<EnhancedGem> {
        let picked: Vec<_> = self
            .candidates()
            .into_iter()
            .filter(|c| {
                let past = c.profile.early_mid();
                past.wins >= 1
                    && past.uses >= 2
                    && c.profile.current().uses <= 3
                    && c.profile.last_short.uses <= 2
            })
            .collect();

        self.finish(
            picked,
            |a, b| {
                let (pa, pb) = (a.profile.early_mid(), b.profile.early_mid());
                pb.wins.cmp(&pa.wins).then_with(|| pb.uses.cmp(&pa.uses))
            },
            |c| {
                let past = c.profile.early_mid();
                let peak = self
                    .split
                    .eras()
                    .get(c.profile.peak_era())
                    .map(|e| e.label.to_lowercase())
                    .unwrap_or_default();
                (
                    format!(
                        "{} wins from {} uses in the early and mid eras, {} uses since",
                        past.wins,
                        past.uses,
                        c.profile.current().uses
                    ),
                    format!("Peaked in the {} era and has not been revisited", peak),
                    DataQuality::from_sample(past.uses, 8, 4),
                )
            },
            GemCategory::Forgotten,
        )
    }

    /// New combos already converting.
    fn rising(&self) -> Vec<EnhancedGem> {
        let picked: Vec<_> = self
            .candidates()
            .into_iter()
            .filter(|c| {
                let p = c.profile;
                let current_share = win_rate(p.current().uses, p.total.uses);
                current_share >= 0.60
                    && p.last_short.uses >= 2
                    && (p.last_short.win_rate() >= 0.20 || p.last_short.wins >= 1)
                    && p.total.uses <= 15
            })
            .collect();

        self.finish(
            picked,
            |a, b| {
                b.profile
                    .last_seen
                    .cmp(&a.profile.last_seen)
                    .then_with(|| b.profile.last_short.wins.cmp(&a.profile.last_short.wins))
            },
            |c| {
                let p = c.profile;
                (
                    format!(
                        "{:.0}% of its {} uses came in the current era",
                        win_rate(p.current().uses, p.total.uses) * 100.0,
                        p.total.uses
                    ),
                    format!(
                        "{} wins from {} uses in the last {} days",
                        p.last_short.wins, p.last_short.uses, SHORT_WINDOW_DAYS
                    ),
                    DataQuality::from_sample(p.last_short.uses, 6, 3),
                )
            },
            GemCategory::Rising,
        )
    }

    /// Off-meta blades winning in the current era.
    ///
    /// Any non-meta blade that converts counts; matchup data against the
    /// meta blades is not consulted.
    fn counter_meta(&self) -> Vec<EnhancedGem> {
        let picked: Vec<_> = self
            .candidates()
            .into_iter()
            .filter(|c| {
                let current = c.profile.current();
                !self.is_meta(c.key)
                    && current.uses >= 2
                    && (current.win_rate() >= 0.25 || current.wins >= 1)
                    && c.profile.last_long.uses >= 2
            })
            .collect();

        self.finish(
            picked,
            |a, b| {
                let (ca, cb) = (a.profile.current(), b.profile.current());
                cb.win_rate()
                    .total_cmp(&ca.win_rate())
                    .then_with(|| cb.uses.cmp(&ca.uses))
            },
            |c| {
                let current = c.profile.current();
                (
                    format!(
                        "{} sits outside the top {} yet wins {:.0}% in the current era",
                        c.key.blade,
                        META_BLADE_COUNT,
                        current.win_rate() * 100.0
                    ),
                    format!(
                        "{} uses in the last {} days",
                        c.profile.last_long.uses, LONG_WINDOW_DAYS
                    ),
                    DataQuality::from_sample(current.uses, 6, 3),
                )
            },
            GemCategory::CounterMeta,
        )
    }
}
