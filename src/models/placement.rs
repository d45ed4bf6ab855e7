//! Flattened placement rows.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Bracket stage a combo was used in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Swiss / group stage only
    #[serde(rename = "first")]
    FirstStage,
    /// Top cut only
    #[serde(rename = "final", alias = "finals")]
    FinalsOnly,
    /// Used through both stages
    #[serde(rename = "both")]
    BothStages,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::FirstStage => write!(f, "first"),
            Stage::FinalsOnly => write!(f, "final"),
            Stage::BothStages => write!(f, "both"),
        }
    }
}

/// Competitive region a tournament was held in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Na,
    Eu,
    Japan,
    Asia,
    Oceania,
    Sa,
}

impl Region {
    pub fn code(&self) -> &'static str {
        match self {
            Region::Na => "NA",
            Region::Eu => "EU",
            Region::Japan => "JAPAN",
            Region::Asia => "ASIA",
            Region::Oceania => "OCEANIA",
            Region::Sa => "SA",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NA" => Ok(Region::Na),
            "EU" => Ok(Region::Eu),
            "JAPAN" | "JP" => Ok(Region::Japan),
            "ASIA" => Ok(Region::Asia),
            "OCEANIA" => Ok(Region::Oceania),
            "SA" => Ok(Region::Sa),
            other => Err(format!("unknown region: {}", other)),
        }
    }
}

/// One combo slot of one tournament placement.
///
/// A placement lists up to three combos; the storage view flattens them
/// into one record per slot, so a 1st-place finish produces up to three
/// records sharing `tournament_id`, `place` and `player_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRecord {
    pub tournament_id: String,

    pub tournament_date: NaiveDate,

    #[serde(default)]
    pub region: Option<Region>,

    /// Finishing place (1, 2 or 3)
    pub place: u8,

    pub player_name: String,

    /// Raw blade name; for CX blades this is the main blade only
    pub blade: String,

    pub ratchet: String,

    pub bit: String,

    #[serde(default)]
    pub assist: Option<String>,

    #[serde(default)]
    pub lock_chip: Option<String>,

    #[serde(default)]
    pub stage: Option<Stage>,
}

impl PlacementRecord {
    /// Create a record with no region, assist, lock chip or stage.
    pub fn new(
        tournament_id: impl Into<String>,
        tournament_date: NaiveDate,
        place: u8,
        player_name: impl Into<String>,
        blade: impl Into<String>,
        ratchet: impl Into<String>,
        bit: impl Into<String>,
    ) -> Self {
        Self {
            tournament_id: tournament_id.into(),
            tournament_date,
            region: None,
            place,
            player_name: player_name.into(),
            blade: blade.into(),
            ratchet: ratchet.into(),
            bit: bit.into(),
            assist: None,
            lock_chip: None,
            stage: None,
        }
    }

    /// Builder method to set region.
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    /// Builder method to set assist blade.
    pub fn with_assist(mut self, assist: impl Into<String>) -> Self {
        self.assist = Some(assist.into());
        self
    }

    /// Builder method to set lock chip.
    pub fn with_lock_chip(mut self, lock_chip: impl Into<String>) -> Self {
        self.lock_chip = Some(lock_chip.into());
        self
    }

    /// Builder method to set stage.
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Check if this is a tournament win.
    pub fn is_winner(&self) -> bool {
        self.place == 1
    }
}
