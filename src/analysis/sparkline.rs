//! Weekly bucketed score series.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::calculate::{base_score, linear_slope, round2};
use crate::models::PlacementRecord;
use crate::normalize::{blade_key, normalize_blade, ComboKey};

pub const DEFAULT_WEEKS: usize = 8;

/// Longest series drawn; larger requests are clamped to it.
pub const MAX_WEEKS: usize = 520;

/// What a sparkline is drawn for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SparklineTarget {
    Blade(String),
    Combo(ComboKey),
}

impl SparklineTarget {
    /// Target for a blade name; the alias table is applied.
    pub fn blade(name: &str) -> Self {
        SparklineTarget::Blade(normalize_blade(name))
    }

    pub fn label(&self) -> String {
        match self {
            SparklineTarget::Blade(name) => name.clone(),
            SparklineTarget::Combo(key) => key.display(),
        }
    }

    pub fn matches(&self, record: &PlacementRecord) -> bool {
        match self {
            SparklineTarget::Blade(name) => blade_key(record) == *name,
            SparklineTarget::Combo(key) => ComboKey::from_record(record) == *key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SparklinePoint {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sparkline {
    pub entity: String,
    pub weeks: usize,
    pub points: Vec<SparklinePoint>,
    pub total: f64,
    /// Least-squares change per week
    pub slope: f64,
}

/// Raw weekly values, oldest first.
///
/// Bucket `weeks - 1` covers the 7 days ending at `reference`. Each row adds
/// `points * stage_multiplier` with no recency decay. Rows after the
/// reference or older than the series are ignored. `weeks` is clamped to
/// [`MAX_WEEKS`].
pub fn weekly_values<'a, I>(rows: I, weeks: usize, reference: NaiveDate) -> Vec<f64>
where
    I: IntoIterator<Item = &'a PlacementRecord>,
{
    let weeks = weeks.min(MAX_WEEKS);
    let mut values = vec![0.0; weeks];
    for row in rows {
        let age = (reference - row.tournament_date).num_days();
        if age < 0 {
            continue;
        }
        let back = (age / 7) as usize;
        if back < weeks {
            values[weeks - 1 - back] += base_score(row);
        }
    }
    values
}

pub fn sparkline(
    rows: &[PlacementRecord],
    target: &SparklineTarget,
    weeks: usize,
    reference: NaiveDate,
) -> Sparkline {
    let weeks = weeks.min(MAX_WEEKS);
    let values = weekly_values(rows.iter().filter(|r| target.matches(r)), weeks, reference);
    let slope = linear_slope(&values);

    // Weeks before the earliest representable date are dropped
    let points = values
        .iter()
        .enumerate()
        .filter_map(|(i, value)| {
            let back = (weeks - 1 - i) as u64;
            let week_end = reference.checked_sub_days(Days::new(back * 7))?;
            Some(SparklinePoint {
                week_start: week_end.checked_sub_days(Days::new(6))?,
                week_end,
                value: round2(*value),
            })
        })
        .collect();

    Sparkline {
        entity: target.label(),
        weeks,
        points,
        total: round2(values.iter().sum()),
        slope: round2(slope),
    }
}
