//! Deck rating for a three-combo deck.
//!
//! Each combo with tournament history gets six sub-scores in `[0, 100]`:
//!
//! | score | formula |
//! |---|---|
//! | meta | `raw / top_raw * 100` |
//! | consistency | `(3 - avg_place) / 2 * 80 + min(20, uses * 2)` |
//! | upside | `win_rate * 80 + min(20, wins * 4)` |
//! | synergy | `50 + (win_rate - mean part win rate) * 100` |
//! | surprise | `max(0, 1 - uses / (2 * mean_uses)) * 60 + win_rate * 40` |
//! | trend | `50 + weekly_slope * 25` |
//!
//! Combos without history fall back to a theoretical score blended from
//! their parts' win rates and capped at 50. A deck where no combo has
//! history is scored on strength alone.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calculate::{clamp_score, linear_slope, ratio, round2};
use crate::models::{DeckTier, PartKind, PlacementRecord};
use crate::normalize::{blade_key, part_key, ComboKey};

use super::aggregate::{aggregate, FinalizedAggregate};
use super::rankings::ranked_blades;
use super::sparkline::{weekly_values, DEFAULT_WEEKS};
use super::AnalysisError;

/// Combos in a deck.
pub const DECK_SIZE: usize = 3;

const META_BLADE_COUNT: usize = 10;
const THEORETICAL_CAP: f64 = 50.0;

/// One combo as submitted for rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboSpec {
    pub blade: String,
    pub ratchet: String,
    pub bit: String,
    #[serde(default)]
    pub lock_chip: Option<String>,
    #[serde(default)]
    pub assist: Option<String>,
}

impl ComboSpec {
    pub fn new(blade: impl Into<String>, ratchet: impl Into<String>, bit: impl Into<String>) -> Self {
        Self {
            blade: blade.into(),
            ratchet: ratchet.into(),
            bit: bit.into(),
            lock_chip: None,
            assist: None,
        }
    }

    pub fn key(&self) -> ComboKey {
        ComboKey::new(
            &self.blade,
            self.lock_chip.as_deref(),
            self.assist.as_deref(),
            &self.ratchet,
            &self.bit,
        )
    }
}

/// Sub-scores of one combo, or their means over a deck.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct SubScores {
    pub meta: f64,
    pub consistency: f64,
    pub upside: f64,
    pub synergy: f64,
    pub surprise: f64,
    pub trend: f64,
}

impl SubScores {
    /// Weighted overall score.
    pub fn overall(&self) -> f64 {
        0.30 * self.meta
            + 0.20 * self.consistency
            + 0.20 * self.upside
            + 0.15 * self.synergy
            + 0.05 * self.surprise
            + 0.10 * self.trend
    }

    fn mean(all: &[SubScores]) -> Option<SubScores> {
        if all.is_empty() {
            return None;
        }
        let n = all.len() as f64;
        let sum = all.iter().fold(SubScores::default(), |acc, s| SubScores {
            meta: acc.meta + s.meta,
            consistency: acc.consistency + s.consistency,
            upside: acc.upside + s.upside,
            synergy: acc.synergy + s.synergy,
            surprise: acc.surprise + s.surprise,
            trend: acc.trend + s.trend,
        });
        Some(SubScores {
            meta: sum.meta / n,
            consistency: sum.consistency / n,
            upside: sum.upside / n,
            synergy: sum.synergy / n,
            surprise: sum.surprise / n,
            trend: sum.trend / n,
        })
    }

    fn rounded(self) -> Self {
        Self {
            meta: round2(self.meta),
            consistency: round2(self.consistency),
            upside: round2(self.upside),
            synergy: round2(self.synergy),
            surprise: round2(self.surprise),
            trend: round2(self.trend),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComboRating {
    pub combo: String,
    pub blade: String,
    pub ratchet: String,
    pub bit: String,
    pub assist: Option<String>,
    pub has_data: bool,
    pub uses: u32,
    pub wins: u32,
    /// Percentage of uses that won
    pub win_rate: f64,
    /// Part-blend estimate, only for combos without history
    pub theoretical_score: Option<f64>,
    pub scores: Option<SubScores>,
    pub overall: f64,
    pub tier: DeckTier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeckRating {
    pub combos: Vec<ComboRating>,
    pub average_score: f64,
    pub peak_score: f64,
    /// `0.7 * average + 0.3 * peak`
    pub strength: f64,
    /// Mean sub-scores of the combos with history
    pub sub_scores: Option<SubScores>,
    pub diversity: f64,
    pub meta_coverage: f64,
    pub overall_score: f64,
    pub tier: DeckTier,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Dataset-wide inputs shared by the three combo ratings.
struct DeckContext {
    combos: HashMap<ComboKey, FinalizedAggregate<ComboKey>>,
    blade_wr: HashMap<String, f64>,
    ratchet_wr: HashMap<String, f64>,
    bit_wr: HashMap<String, f64>,
    top_raw: f64,
    mean_uses: f64,
    meta_blades: Vec<String>,
}

impl DeckContext {
    fn build(rows: &[PlacementRecord], reference: NaiveDate) -> Self {
        let win_rates = |aggs: Vec<FinalizedAggregate<String>>| -> HashMap<String, f64> {
            aggs.into_iter().map(|a| (a.key, a.win_rate)).collect()
        };

        let combos = aggregate(rows, |r| Some(ComboKey::from_record(r)), 1, reference);
        let top_raw = combos.iter().map(|c| c.raw_score).fold(0.0, f64::max);
        let total_uses: u32 = combos.iter().map(|c| c.uses).sum();
        let mean_uses = ratio(total_uses as f64, combos.len() as f64);

        Self {
            blade_wr: win_rates(aggregate(rows, |r| Some(blade_key(r)), 1, reference)),
            ratchet_wr: win_rates(aggregate(rows, |r| part_key(r, PartKind::Ratchet), 1, reference)),
            bit_wr: win_rates(aggregate(rows, |r| part_key(r, PartKind::Bit), 1, reference)),
            meta_blades: ranked_blades(rows, META_BLADE_COUNT, 1, reference)
                .into_iter()
                .map(|e| e.name)
                .collect(),
            combos: combos.into_iter().map(|c| (c.key.clone(), c)).collect(),
            top_raw,
            mean_uses,
        }
    }

    fn part_win_rates(&self, key: &ComboKey) -> (f64, f64, f64) {
        (
            self.blade_wr.get(&key.blade).copied().unwrap_or(0.0),
            self.ratchet_wr.get(&key.ratchet).copied().unwrap_or(0.0),
            self.bit_wr.get(&key.bit).copied().unwrap_or(0.0),
        )
    }
}

/// Estimate for a combo that has never placed.
pub fn theoretical_score(blade_wr: f64, ratchet_wr: f64, bit_wr: f64) -> f64 {
    (50.0 * blade_wr + 30.0 * ratchet_wr + 30.0 * bit_wr).min(THEORETICAL_CAP)
}

fn sub_scores(
    agg: &FinalizedAggregate<ComboKey>,
    part_wrs: (f64, f64, f64),
    weekly: &[f64],
    ctx: &DeckContext,
) -> SubScores {
    let wr = agg.win_rate;
    let expected = (part_wrs.0 + part_wrs.1 + part_wrs.2) / 3.0;
    let rarity = (1.0 - ratio(agg.uses as f64, 2.0 * ctx.mean_uses)).max(0.0);

    SubScores {
        meta: clamp_score(ratio(agg.raw_score, ctx.top_raw) * 100.0),
        consistency: clamp_score(
            (3.0 - agg.avg_place) / 2.0 * 80.0 + (agg.uses as f64 * 2.0).min(20.0),
        ),
        upside: clamp_score(wr * 80.0 + (agg.first as f64 * 4.0).min(20.0)),
        synergy: clamp_score(50.0 + (wr - expected) * 100.0),
        surprise: clamp_score(rarity * 60.0 + wr * 40.0),
        trend: clamp_score(50.0 + linear_slope(weekly) * 25.0),
    }
}

fn rate_combo(
    spec: &ComboSpec,
    rows: &[PlacementRecord],
    ctx: &DeckContext,
    reference: NaiveDate,
) -> (ComboRating, Option<SubScores>) {
    let key = spec.key();
    let part_wrs = ctx.part_win_rates(&key);

    let (has_data, uses, wins, win_rate, theoretical, scores, overall, tier) =
        match ctx.combos.get(&key) {
            Some(agg) => {
                let weekly = weekly_values(
                    rows.iter().filter(|r| ComboKey::from_record(r) == key),
                    DEFAULT_WEEKS,
                    reference,
                );
                let scores = sub_scores(agg, part_wrs, &weekly, ctx);
                let overall = scores.overall();
                (
                    true,
                    agg.uses,
                    agg.first,
                    agg.win_rate,
                    None,
                    Some(scores),
                    overall,
                    DeckTier::from_score(overall),
                )
            }
            None => {
                let estimate = theoretical_score(part_wrs.0, part_wrs.1, part_wrs.2);
                (false, 0, 0, 0.0, Some(estimate), None, estimate, DeckTier::Unrated)
            }
        };

    let rating = ComboRating {
        combo: key.display(),
        blade: key.blade.clone(),
        ratchet: key.ratchet.clone(),
        bit: key.bit.clone(),
        assist: key.assist.clone(),
        has_data,
        uses,
        wins,
        win_rate: round2(win_rate * 100.0),
        theoretical_score: theoretical.map(round2),
        scores: scores.map(SubScores::rounded),
        overall,
        tier,
    };
    (rating, scores)
}

/// Share of distinct blades, ratchets and bits, 0 when every combo
/// repeats the same parts and 100 when none are shared.
pub fn diversity(keys: &[ComboKey]) -> f64 {
    let blades: HashSet<&str> = keys.iter().map(|k| k.blade.as_str()).collect();
    let ratchets: HashSet<&str> = keys.iter().map(|k| k.ratchet.as_str()).collect();
    let bits: HashSet<&str> = keys.iter().map(|k| k.bit.as_str()).collect();
    let unique = (blades.len() + ratchets.len() + bits.len()) as f64;
    clamp_score((unique - 3.0) / 6.0 * 100.0)
}

/// Rate a three-combo deck against the rows.
pub fn rate_deck(
    specs: &[ComboSpec],
    rows: &[PlacementRecord],
    reference: NaiveDate,
) -> Result<DeckRating, AnalysisError> {
    if specs.len() != DECK_SIZE {
        return Err(AnalysisError::InvalidDeck(specs.len()));
    }

    let ctx = DeckContext::build(rows, reference);
    let rated: Vec<(ComboRating, Option<SubScores>)> = specs
        .iter()
        .map(|spec| rate_combo(spec, rows, &ctx, reference))
        .collect();

    let overalls: Vec<f64> = rated.iter().map(|(r, _)| r.overall).collect();
    let average = overalls.iter().sum::<f64>() / overalls.len() as f64;
    let peak = overalls.iter().copied().fold(0.0, f64::max);
    let strength = 0.7 * average + 0.3 * peak;

    let with_data: Vec<SubScores> = rated.iter().filter_map(|(_, s)| *s).collect();
    let sub_means = SubScores::mean(&with_data);

    let keys: Vec<ComboKey> = specs.iter().map(ComboSpec::key).collect();
    let diversity = diversity(&keys);
    let covered = keys
        .iter()
        .filter(|k| ctx.meta_blades.contains(&k.blade))
        .count();
    let meta_coverage = covered as f64 / DECK_SIZE as f64 * 100.0;

    let (overall, tier) = if with_data.is_empty() {
        (strength, DeckTier::Unrated)
    } else {
        let overall = 0.70 * strength + 0.15 * diversity + 0.15 * meta_coverage;
        (overall, DeckTier::from_score(overall))
    };

    let combos: Vec<ComboRating> = rated
        .into_iter()
        .map(|(mut r, _)| {
            r.overall = round2(r.overall);
            r
        })
        .collect();

    let notes = Notes::collect(&combos, sub_means.as_ref(), diversity, meta_coverage, &ctx.meta_blades);

    Ok(DeckRating {
        average_score: round2(average),
        peak_score: round2(peak),
        strength: round2(strength),
        sub_scores: sub_means.map(SubScores::rounded),
        diversity: round2(diversity),
        meta_coverage: round2(meta_coverage),
        overall_score: round2(overall),
        tier,
        strengths: notes.strengths,
        weaknesses: notes.weaknesses,
        suggestions: notes.suggestions,
        combos,
    })
}

#[derive(Default)]
struct Notes {
    strengths: Vec<String>,
    weaknesses: Vec<String>,
    suggestions: Vec<String>,
}

impl Notes {
    fn collect(
        combos: &[ComboRating],
        means: Option<&SubScores>,
        diversity: f64,
        coverage: f64,
        meta_blades: &[String],
    ) -> Self {
        let mut notes = Notes::default();

        if let Some(m) = means {
            if m.meta >= 70.0 {
                notes.strengths.push("Built on combos the current meta rewards".to_string());
            } else if m.meta <= 30.0 {
                notes.weaknesses.push("Little presence in the current meta".to_string());
            }
            if m.consistency >= 70.0 {
                notes.strengths.push("Places reliably in top cut".to_string());
            } else if m.consistency < 40.0 {
                notes.weaknesses.push("Placements are inconsistent".to_string());
            }
            if m.upside >= 70.0 {
                notes.strengths.push("High tournament-winning upside".to_string());
            }
            if m.synergy >= 65.0 {
                notes.strengths.push("Parts perform better together than apart".to_string());
            } else if m.synergy < 40.0 {
                notes.weaknesses.push("Combos underperform their parts".to_string());
            }
            if m.trend < 40.0 {
                notes.weaknesses.push("Recent results are trending down".to_string());
            }
        }

        if diversity < 50.0 {
            notes.weaknesses.push("Parts overlap heavily across combos".to_string());
            notes
                .suggestions
                .push("Swap a duplicated blade, ratchet or bit to cover more matchups".to_string());
        }

        if coverage >= 100.0 {
            notes.strengths.push("Every combo runs a top-10 blade".to_string());
        } else if coverage <= 0.0 {
            notes.weaknesses.push("No top-10 meta blade in the deck".to_string());
            if let Some(blade) = meta_blades.first() {
                notes
                    .suggestions
                    .push(format!("Consider adding a meta blade such as {}", blade));
            }
        }

        let unproven: Vec<&ComboRating> = combos.iter().filter(|c| !c.has_data).collect();
        if !unproven.is_empty() {
            notes.weaknesses.push(format!(
                "{} of {} combos have no tournament history",
                unproven.len(),
                combos.len()
            ));
            for combo in &unproven {
                notes
                    .suggestions
                    .push(format!("Test {} in events before relying on it", combo.combo));
            }
        }

        if let Some(weakest) = combos
            .iter()
            .filter(|c| c.has_data)
            .min_by(|a, b| a.overall.total_cmp(&b.overall))
        {
            if weakest.overall < 40.0 {
                notes.suggestions.push(format!(
                    "Consider replacing {} (score {:.1})",
                    weakest.combo, weakest.overall
                ));
            }
        }

        notes
    }
}
