//! Meta eras - equal-duration partitions of the dataset's date span.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Position of an era in the three-way split used for gem detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EraPhase {
    Early,
    Mid,
    Current,
}

impl EraPhase {
    pub fn index(&self) -> usize {
        match self {
            EraPhase::Early => 0,
            EraPhase::Mid => 1,
            EraPhase::Current => 2,
        }
    }
}

impl std::fmt::Display for EraPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EraPhase::Early => write!(f, "early"),
            EraPhase::Mid => write!(f, "mid"),
            EraPhase::Current => write!(f, "current"),
        }
    }
}

/// One era of a split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaEra {
    /// Zero-based position, oldest first
    pub index: usize,

    /// Human-readable name
    pub label: String,

    pub start_date: NaiveDate,

    pub end_date: NaiveDate,

    /// Whether this is the most recent era
    pub is_current: bool,
}

/// Splits `[earliest, latest]` into `count` eras of equal duration.
///
/// A date `d` days after `earliest` belongs to era
/// `floor(d / span * count)`, clamped to the last era. A zero-day span
/// puts every date in the last (current) era.
#[derive(Debug, Clone)]
pub struct EraSplit {
    earliest: NaiveDate,
    span_days: i64,
    eras: Vec<MetaEra>,
}

impl EraSplit {
    /// Build a split; `count` is raised to at least 1.
    pub fn equal(earliest: NaiveDate, latest: NaiveDate, count: usize) -> Self {
        let count = count.max(1);
        let latest = latest.max(earliest);
        let span_days = (latest - earliest).num_days();
        let n = count as i64;

        let mut eras = Vec::with_capacity(count);
        for i in 0..n {
            let (start_offset, end_offset) = if span_days == 0 {
                (0, 0)
            } else {
                let start = ceil_div(i * span_days, n);
                let end = if i == n - 1 {
                    span_days
                } else {
                    ceil_div((i + 1) * span_days, n) - 1
                };
                (start, end.max(start))
            };

            eras.push(MetaEra {
                index: i as usize,
                label: era_label(i as usize, count),
                start_date: earliest + Duration::days(start_offset),
                end_date: earliest + Duration::days(end_offset),
                is_current: i == n - 1,
            });
        }

        Self {
            earliest,
            span_days,
            eras,
        }
    }

    /// Era index for a date. Dates outside the span clamp to the ends.
    pub fn index_for(&self, date: NaiveDate) -> usize {
        let count = self.eras.len();
        if self.span_days == 0 {
            return count - 1;
        }
        let offset = (date - self.earliest).num_days().clamp(0, self.span_days);
        let idx = (offset * count as i64 / self.span_days) as usize;
        idx.min(count - 1)
    }

    /// Get all eras, oldest first.
    pub fn eras(&self) -> &[MetaEra] {
        &self.eras
    }

    pub fn len(&self) -> usize {
        self.eras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eras.is_empty()
    }
}

fn ceil_div(a: i64, b: i64) -> i64 {
    (a + b - 1) / b
}

fn era_label(index: usize, count: usize) -> String {
    if count == 3 {
        match index {
            0 => "Early".to_string(),
            1 => "Mid".to_string(),
            _ => "Current".to_string(),
        }
    } else {
        format!("Era {}", index + 1)
    }
}
