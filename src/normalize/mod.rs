//! Part-name normalization.
//!
//! Scraped part names arrive with typos, regional names, abbreviations
//! and inconsistent casing. Every aggregation key is built from the
//! normalized form so that two rows naming the same part always land in
//! the same entity. Normalization never fails: anything not in a table
//! passes through trimmed.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{PartKind, PlacementRecord};

/// Canonical display name for a blade (main blade for CX).
pub fn normalize_blade(name: &str) -> String {
    let trimmed = name.trim();
    match blade_alias(trimmed) {
        Some(canonical) => canonical.to_string(),
        None => trimmed.to_string(),
    }
}

fn blade_alias(name: &str) -> Option<&'static str> {
    let canonical = match name {
        "Aero Pegaus" | "Aero Pegesus" | "Aerp Pegasus" | "[ ] Aero Pegasus" => "Aero Pegasus",
        "Coablt Dragoon" | "Cobal Dragoon" | "Cobalt Dragon" | "Colbat Dragoon"
        | "Side: Cobalt Dragoon" | "[ ] Cobalt Dragoon" => "Cobalt Dragoon",
        "Hovern Wyvern" | "Hover" => "Hover Wyvern",
        "Roar Tyrnano" | "Roar Tryanno" | "Tyrano Roar" => "Roar Tyranno",
        "Tyranno Beat," | "Tyrano Beat" | "Tyranno" => "Tyranno Beat",
        "Samauri Saber" | "Samurai" => "Samurai Saber",
        "Samurai Caliber" | "Ace Pokébey: Samurai Calibur" => "Samurai Calibur",
        "Wizardr Rod" | "Wizarz Rod" | "Wizard Rod," | "Side Board) Wizard Rod"
        | "[ ] Wizard Rod" | "Wand Wizard" => "Wizard Rod",
        "Sliver Wolf" | "Sterling Wolf" | "Side: Silver Wolf" => "Silver Wolf",
        "Shake Scale" => "Shark Scale",
        "Wave Wave" | "Tide Whale" => "Whale Wave",
        "Rock Golem" | "[ ] Golem Rock" | "Ace Pokébey: Rock Golem" => "Golem Rock",
        "Phoenix2ing" | "phoenix" | "Phoenix" | "[ ] Phoenix Wing" => "Phoenix Wing",
        "[ ] Hells Scythe" => "Hells Scythe",
        "Wizard Arrow." => "Wizard Arrow",
        "uster" => "Dran Buster",
        "Silver Samurai" => "Steel Samurai",
        "Fox Blast" => "Fox Brush",
        "Keel Shark" => "Shark Edge",
        "|| KnightLance" | "|| Knight Lance" => "Knight Lance",
        "|| KnightShield" | "|| Knight Shield" => "Knight Shield",
        "Ace Pokébey: Impact Drake" => "Impact Drake",
        "ドランソード" => "Dran Sword",
        "ヘルズサイズ" => "Hells Scythe",
        "ウィザードアロー" => "Wizard Arrow",
        "ナイトシールド" => "Knight Shield",
        "ナイトランス" => "Knight Lance",
        "ドランバスター" => "Dran Buster",
        "ヘルズハンマー" => "Hells Hammer",
        "ウィザードロッド" => "Wizard Rod",
        "シルバーウルフ" => "Silver Wolf",
        "サムライセイバー" => "Samurai Saber",
        "ペガサスブラスト" => "Pegasus Blast",
        "エアロペガサス" => "Aero Pegasus",
        "コバルトドラグーン" => "Cobalt Dragoon",
        "メテオドラグーン" => "Meteor Dragoon",
        "ゴーレムロック" => "Golem Rock",
        "インパクトドレイク" => "Impact Drake",
        "シャークスケイル" => "Shark Scale",
        "ホバーワイバーン" => "Hover Wyvern",
        _ => return None,
    };
    Some(canonical)
}

/// Split a full CX blade name into `(lock_chip, main_blade)`.
pub fn cx_components(name: &str) -> Option<(&'static str, &'static str)> {
    let parts = match name.trim() {
        "Dran Brave" => ("Dran", "Brave"),
        "Emperor Brave" => ("Emperor", "Brave"),
        "Wizard Arc" => ("Wizard", "Arc"),
        "Perseus Dark" => ("Perseus", "Dark"),
        "Hells Reaper" => ("Hells", "Reaper"),
        "Fox Brush" => ("Fox", "Brush"),
        "Pegasus Blast" => ("Pegasus", "Blast"),
        "Cerberus Blast" => ("Cerberus", "Blast"),
        "Hells Blast" => ("Hells", "Blast"),
        "Sol Eclipse" => ("Sol", "Eclipse"),
        "Wolf Hunt" => ("Wolf", "Hunt"),
        "Emperor Might" => ("Emperor", "Might"),
        "Phoenix Flare" => ("Phoenix", "Flare"),
        "Valkyrie Volt" => ("Valkyrie", "Volt"),
        _ => return None,
    };
    Some(parts)
}

/// Display name of a blade, composing the lock chip for modular blades.
///
/// With a lock chip the name is `"{lock_chip} {main_blade}"`. Without one
/// the bare main blade is used even for CX main blades that always need a
/// chip in play; that is incomplete data, not an error.
pub fn blade_display(main_blade: &str, lock_chip: Option<&str>) -> String {
    let main = normalize_blade(main_blade);
    match lock_chip.map(str::trim).filter(|c| !c.is_empty()) {
        Some(chip) if !main.starts_with(&format!("{} ", chip)) => format!("{} {}", chip, main),
        _ => main,
    }
}

fn ratchet_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z]*(\d+-\d+)$").unwrap())
}

/// Canonical ratchet code: `"M3-60"` becomes `"3-60"`.
pub fn normalize_ratchet(code: &str) -> String {
    let trimmed = code.trim();
    let stripped = ratchet_pattern()
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    // 50 is not a produced height; those entries are misread 60s
    match stripped.split_once('-') {
        Some((prongs, "50")) if prongs.chars().all(|c| c.is_ascii_digit()) => {
            format!("{}-60", prongs)
        }
        _ => stripped.to_string(),
    }
}

const CANONICAL_BITS: &[&str] = &[
    "Accel",
    "Ball",
    "Bound",
    "Brake",
    "Cyclone",
    "Disc Ball",
    "Dot",
    "Elevate",
    "Flat",
    "GearBall",
    "GearFlat",
    "GearNeedle",
    "GearPoint",
    "Glide",
    "Hexa",
    "High Accel",
    "High Needle",
    "High Sword",
    "High Taper",
    "Kick",
    "Level",
    "Low Flat",
    "Low Needle",
    "Low Rush",
    "Metal Needle",
    "Needle",
    "Orb",
    "Point",
    "Quake",
    "Rush",
    "Spike",
    "Spiral Needle",
    "Taper",
    "Unite",
    "Vanguard",
];

fn bit_abbreviation(name: &str) -> Option<&'static str> {
    let full = match name {
        "B" => "Ball",
        "F" | "FB" => "Flat",
        "N" => "Needle",
        "P" => "Point",
        "T" => "Taper",
        "S" => "Spike",
        "O" => "Orb",
        "D" => "Dot",
        "A" => "Accel",
        "R" => "Rush",
        "H" | "Hex" => "Hexa",
        "C" => "Cyclone",
        "U" | "Un" => "Unite",
        "L" | "Lv" => "Level",
        "E" | "El" => "Elevate",
        "G" | "Gl" => "Glide",
        "Q" => "Quake",
        "K" => "Kick",
        "V" => "Vanguard",
        "HN" => "High Needle",
        "LF" => "Low Flat",
        "LR" => "Low Rush",
        "LN" => "Low Needle",
        "GF" => "GearFlat",
        "GB" => "GearBall",
        "GN" => "GearNeedle",
        "GP" => "GearPoint",
        "MN" => "Metal Needle",
        "HT" => "High Taper",
        "HA" => "High Accel",
        "DB" => "Disc Ball",
        "HS" => "High Sword",
        "SN" => "Spiral Needle",
        "Br" => "Brake",
        "Bd" => "Bound",
        _ => return None,
    };
    Some(full)
}

/// Canonical full bit name.
///
/// Abbreviations are matched case-sensitively (`"L"` is Level, `"Lv"` too);
/// full names are matched ignoring case and spaces, so `"lowflat"`,
/// `"Low flat"` and `"Gear Flat"` all resolve.
pub fn normalize_bit(name: &str) -> String {
    let trimmed = name.trim();
    if let Some(full) = bit_abbreviation(trimmed) {
        return full.to_string();
    }

    let folded = fold(trimmed);
    CANONICAL_BITS
        .iter()
        .find(|canonical| fold(canonical) == folded)
        .map(|canonical| canonical.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

fn fold(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Canonical assist blade name.
pub fn normalize_assist(name: &str) -> String {
    let trimmed = name.trim();
    let full = match trimmed {
        "W" => "Wheel",
        "H" => "Heavy",
        "S" => "Slash",
        "J" => "Jaggy",
        "Z" => "Zap",
        "RA" => "Rush Assault",
        "LO" => "Low",
        "BS" => "Bumper Slash",
        "UF" => "Upper Flat",
        "GR" => "Gear Rush",
        "WB" => "Wheel Bumper",
        _ => return normalize_blade(trimmed),
    };
    full.to_string()
}

fn normalize_lock_chip(name: &str) -> String {
    name.trim().to_string()
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Identity of a combo after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComboKey {
    /// Blade display name (lock chip already composed)
    pub blade: String,
    pub ratchet: String,
    pub bit: String,
    pub assist: Option<String>,
}

impl ComboKey {
    /// Build a key from raw part names.
    pub fn new(
        blade: &str,
        lock_chip: Option<&str>,
        assist: Option<&str>,
        ratchet: &str,
        bit: &str,
    ) -> Self {
        Self {
            blade: blade_display(blade, lock_chip),
            ratchet: normalize_ratchet(ratchet),
            bit: normalize_bit(bit),
            assist: present(assist).map(normalize_assist),
        }
    }

    /// Key of the combo used in a record.
    pub fn from_record(record: &PlacementRecord) -> Self {
        Self::new(
            &record.blade,
            record.lock_chip.as_deref(),
            record.assist.as_deref(),
            &record.ratchet,
            &record.bit,
        )
    }

    /// Human-readable name, e.g. `"Wizard Rod 9-60 Ball"`.
    pub fn display(&self) -> String {
        match &self.assist {
            Some(assist) => format!("{} {} {} {}", self.blade, assist, self.ratchet, self.bit),
            None => format!("{} {} {}", self.blade, self.ratchet, self.bit),
        }
    }
}

impl std::fmt::Display for ComboKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Blade aggregation key of a record.
pub fn blade_key(record: &PlacementRecord) -> String {
    blade_display(&record.blade, record.lock_chip.as_deref())
}

/// Part aggregation key of a record, or `None` when the record lacks it.
///
/// A lock chip missing from the record is recovered from a full CX blade
/// name such as `"Pegasus Blast"`.
pub fn part_key(record: &PlacementRecord, kind: PartKind) -> Option<String> {
    match kind {
        PartKind::Ratchet => present(Some(&record.ratchet)).map(normalize_ratchet),
        PartKind::Bit => present(Some(&record.bit)).map(normalize_bit),
        PartKind::Assist => present(record.assist.as_deref()).map(normalize_assist),
        PartKind::LockChip => match present(record.lock_chip.as_deref()) {
            Some(chip) => Some(normalize_lock_chip(chip)),
            None => cx_components(&normalize_blade(&record.blade)).map(|(chip, _)| chip.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(blade: &str, ratchet: &str, bit: &str) -> PlacementRecord {
        PlacementRecord::new(
            "t-1",
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            1,
            "Alice",
            blade,
            ratchet,
            bit,
        )
    }

    #[test]
    fn test_normalize_blade_aliases() {
        assert_eq!(normalize_blade("Wand Wizard"), "Wizard Rod");
        assert_eq!(normalize_blade("Tide Whale"), "Whale Wave");
        assert_eq!(normalize_blade("Phoenix"), "Phoenix Wing");
        assert_eq!(normalize_blade("  Cobalt Dragon "), "Cobalt Dragoon");
        assert_eq!(normalize_blade("ドランバスター"), "Dran Buster");
    }

    #[test]
    fn test_normalize_blade_passthrough() {
        assert_eq!(normalize_blade("Shark Scale"), "Shark Scale");
        assert_eq!(normalize_blade("Totally New Blade"), "Totally New Blade");
        assert_eq!(normalize_blade(""), "");
    }

    #[test]
    fn test_normalize_blade_idempotent() {
        for raw in ["Wand Wizard", "Phoenix2ing", "Sliver Wolf", "Wizard Rod", "Hover"] {
            let once = normalize_blade(raw);
            assert_eq!(normalize_blade(&once), once);
            assert_eq!(normalize_blade(&normalize_blade(&once)), once);
        }
    }

    #[test]
    fn test_blade_display_lock_chip() {
        assert_eq!(blade_display("Blast", Some("Pegasus")), "Pegasus Blast");
        assert_eq!(blade_display("Blast", None), "Blast");
        assert_eq!(blade_display("Blast", Some("  ")), "Blast");
        // Already composed upstream
        assert_eq!(blade_display("Pegasus Blast", Some("Pegasus")), "Pegasus Blast");
    }

    #[test]
    fn test_cx_composite_matches_full_name() {
        let split = record("Blast", "9-60", "Ball").with_lock_chip("Pegasus");
        let full = record("Pegasus Blast", "9-60", "Ball");
        assert_eq!(blade_key(&split), blade_key(&full));
        assert_eq!(ComboKey::from_record(&split), ComboKey::from_record(&full));
    }

    #[test]
    fn test_normalize_ratchet() {
        assert_eq!(normalize_ratchet("9-60"), "9-60");
        assert_eq!(normalize_ratchet("M3-85"), "3-85");
        assert_eq!(normalize_ratchet("ab1-60"), "1-60");
        assert_eq!(normalize_ratchet("5-50"), "5-60");
        assert_eq!(normalize_ratchet("Turbo"), "Turbo");
        assert_eq!(normalize_ratchet("3-60x"), "3-60x");
    }

    #[test]
    fn test_normalize_bit() {
        assert_eq!(normalize_bit("B"), "Ball");
        assert_eq!(normalize_bit("HN"), "High Needle");
        assert_eq!(normalize_bit("Lv"), "Level");
        assert_eq!(normalize_bit("LowFlat"), "Low Flat");
        assert_eq!(normalize_bit("low flat"), "Low Flat");
        assert_eq!(normalize_bit("Gear Flat"), "GearFlat");
        assert_eq!(normalize_bit("Hex"), "Hexa");
        assert_eq!(normalize_bit("Mystery Bit"), "Mystery Bit");
    }

    #[test]
    fn test_normalize_bit_idempotent() {
        for canonical in CANONICAL_BITS {
            assert_eq!(normalize_bit(canonical), *canonical);
        }
    }

    #[test]
    fn test_normalize_assist() {
        assert_eq!(normalize_assist("J"), "Jaggy");
        assert_eq!(normalize_assist("Wheel"), "Wheel");
        assert_eq!(normalize_assist("BS"), "Bumper Slash");
    }

    #[test]
    fn test_combo_key_display() {
        let key = ComboKey::new("Wand Wizard", None, None, "9-60", "B");
        assert_eq!(key.display(), "Wizard Rod 9-60 Ball");

        let cx = ComboKey::new("Blast", Some("Pegasus"), Some("J"), "1-60", "LF");
        assert_eq!(cx.display(), "Pegasus Blast Jaggy 1-60 Low Flat");
    }

    #[test]
    fn test_part_key() {
        let r = record("Pegasus Blast", "M9-60", "HN");
        assert_eq!(part_key(&r, PartKind::Ratchet).as_deref(), Some("9-60"));
        assert_eq!(part_key(&r, PartKind::Bit).as_deref(), Some("High Needle"));
        assert_eq!(part_key(&r, PartKind::Assist), None);
        assert_eq!(part_key(&r, PartKind::LockChip).as_deref(), Some("Pegasus"));

        let plain = record("Wizard Rod", "5-70", "Hexa");
        assert_eq!(part_key(&plain, PartKind::LockChip), None);
    }
}
