//! Classification enums shared by the analytics reports.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Percentile tier inside one ranked list.
///
/// A tier only means something relative to the list it was assigned in:
/// ranking the same entities with another `limit` or region filter moves
/// the cut points. The buckets are deliberately bell-shaped (few SS, many
/// C/D).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RankTier {
    SS,
    S,
    A,
    B,
    C,
    D,
    F,
}

impl RankTier {
    /// Tier for a 0-100 percentile position (0 = top of the list).
    pub fn from_percentile(percentile: f64) -> Self {
        if percentile < 3.0 {
            RankTier::SS
        } else if percentile < 13.0 {
            RankTier::S
        } else if percentile < 30.0 {
            RankTier::A
        } else if percentile < 50.0 {
            RankTier::B
        } else if percentile < 70.0 {
            RankTier::C
        } else if percentile < 97.0 {
            RankTier::D
        } else {
            RankTier::F
        }
    }
}

impl std::fmt::Display for RankTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RankTier::SS => write!(f, "SS"),
            RankTier::S => write!(f, "S"),
            RankTier::A => write!(f, "A"),
            RankTier::B => write!(f, "B"),
            RankTier::C => write!(f, "C"),
            RankTier::D => write!(f, "D"),
            RankTier::F => write!(f, "F"),
        }
    }
}

/// Absolute grade of a combo or deck rating score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeckTier {
    S,
    A,
    B,
    C,
    D,
    F,
    /// No tournament history to grade against
    #[serde(rename = "?")]
    Unrated,
}

impl DeckTier {
    /// Tier from a 0-100 rating score.
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            DeckTier::S
        } else if score >= 70.0 {
            DeckTier::A
        } else if score >= 55.0 {
            DeckTier::B
        } else if score >= 40.0 {
            DeckTier::C
        } else if score >= 25.0 {
            DeckTier::D
        } else {
            DeckTier::F
        }
    }
}

impl std::fmt::Display for DeckTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeckTier::S => write!(f, "S"),
            DeckTier::A => write!(f, "A"),
            DeckTier::B => write!(f, "B"),
            DeckTier::C => write!(f, "C"),
            DeckTier::D => write!(f, "D"),
            DeckTier::F => write!(f, "F"),
            DeckTier::Unrated => write!(f, "?"),
        }
    }
}

/// Direction of a trend value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    /// Only seen in the recent window
    New,
    Rising,
    Stable,
    Falling,
}

impl TrendDirection {
    /// Classify a trend value together with the older window's population.
    pub fn classify(trend: f64, older_uses: u32) -> Self {
        if older_uses == 0 && trend > 0.0 {
            TrendDirection::New
        } else if trend > 0.10 {
            TrendDirection::Rising
        } else if trend < -0.10 {
            TrendDirection::Falling
        } else {
            TrendDirection::Stable
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendDirection::New => write!(f, "new"),
            TrendDirection::Rising => write!(f, "rising"),
            TrendDirection::Stable => write!(f, "stable"),
            TrendDirection::Falling => write!(f, "falling"),
        }
    }
}

/// Sub-part kinds that can be ranked on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartKind {
    Ratchet,
    Bit,
    Assist,
    LockChip,
}

impl PartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartKind::Ratchet => "ratchet",
            PartKind::Bit => "bit",
            PartKind::Assist => "assist",
            PartKind::LockChip => "lock_chip",
        }
    }
}

impl std::fmt::Display for PartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "ratchet" | "ratchets" => Ok(PartKind::Ratchet),
            "bit" | "bits" => Ok(PartKind::Bit),
            "assist" | "assists" => Ok(PartKind::Assist),
            "lock_chip" | "lock_chips" | "lockchip" => Ok(PartKind::LockChip),
            other => Err(format!("unknown part kind: {}", other)),
        }
    }
}

/// Hidden-gem category; one classification pass puts a combo in at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GemCategory {
    /// Strong blade that the current meta ignores
    Underused,
    /// Past winner that dropped out of play
    Forgotten,
    /// New combo already converting
    Rising,
    /// Off-meta blade winning in the current era
    CounterMeta,
}

impl std::fmt::Display for GemCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GemCategory::Underused => write!(f, "underused"),
            GemCategory::Forgotten => write!(f, "forgotten"),
            GemCategory::Rising => write!(f, "rising"),
            GemCategory::CounterMeta => write!(f, "counter_meta"),
        }
    }
}

/// Shape of a blade's era-by-era rank history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trajectory {
    /// Only ranked in the latest era
    Newcomer,
    /// Ranked earlier, absent from the latest era
    Faded,
    Rising,
    Declining,
    Steady,
}

impl std::fmt::Display for Trajectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trajectory::Newcomer => write!(f, "newcomer"),
            Trajectory::Faded => write!(f, "faded"),
            Trajectory::Rising => write!(f, "rising"),
            Trajectory::Declining => write!(f, "declining"),
            Trajectory::Steady => write!(f, "steady"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_tier_cut_points() {
        assert_eq!(RankTier::from_percentile(0.0), RankTier::SS);
        assert_eq!(RankTier::from_percentile(2.99), RankTier::SS);
        assert_eq!(RankTier::from_percentile(3.0), RankTier::S);
        assert_eq!(RankTier::from_percentile(12.9), RankTier::S);
        assert_eq!(RankTier::from_percentile(13.0), RankTier::A);
        assert_eq!(RankTier::from_percentile(30.0), RankTier::B);
        assert_eq!(RankTier::from_percentile(50.0), RankTier::C);
        assert_eq!(RankTier::from_percentile(70.0), RankTier::D);
        assert_eq!(RankTier::from_percentile(96.9), RankTier::D);
        assert_eq!(RankTier::from_percentile(97.0), RankTier::F);
    }

    #[test]
    fn test_rank_tier_ordering() {
        assert!(RankTier::SS < RankTier::S);
        assert!(RankTier::D < RankTier::F);
    }

    #[test]
    fn test_deck_tier_cut_points() {
        assert_eq!(DeckTier::from_score(100.0), DeckTier::S);
        assert_eq!(DeckTier::from_score(85.0), DeckTier::S);
        assert_eq!(DeckTier::from_score(84.99), DeckTier::A);
        assert_eq!(DeckTier::from_score(70.0), DeckTier::A);
        assert_eq!(DeckTier::from_score(55.0), DeckTier::B);
        assert_eq!(DeckTier::from_score(40.0), DeckTier::C);
        assert_eq!(DeckTier::from_score(25.0), DeckTier::D);
        assert_eq!(DeckTier::from_score(24.99), DeckTier::F);
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(format!("{}", RankTier::SS), "SS");
        assert_eq!(format!("{}", DeckTier::Unrated), "?");
        assert_eq!(serde_json::to_string(&DeckTier::Unrated).unwrap(), "\"?\"");
    }

    #[test]
    fn test_trend_direction_classify() {
        assert_eq!(TrendDirection::classify(0.5, 0), TrendDirection::New);
        assert_eq!(TrendDirection::classify(0.25, 4), TrendDirection::Rising);
        assert_eq!(TrendDirection::classify(0.05, 4), TrendDirection::Stable);
        assert_eq!(TrendDirection::classify(-0.3, 3), TrendDirection::Falling);
        assert_eq!(TrendDirection::classify(0.0, 0), TrendDirection::Stable);
    }

    #[test]
    fn test_part_kind_parse() {
        assert_eq!("Ratchets".parse::<PartKind>().unwrap(), PartKind::Ratchet);
        assert_eq!("lock-chip".parse::<PartKind>().unwrap(), PartKind::LockChip);
        assert!("blade".parse::<PartKind>().is_err());
    }
}
