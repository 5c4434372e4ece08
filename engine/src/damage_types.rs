use serde::{Deserialize, Serialize};
use std::fmt;

/// Damage and healing categories used to tag rolls and aggregate totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Bludgeoning,
    Piercing,
    Slashing,
    Fire,
    Cold,
    Lightning,
    Acid,
    Poison,
    Psychic,
    Radiant,
    Necrotic,
    Thunder,
    Force,
    Healing,
}

impl DamageType {
    pub fn label(&self) -> &'static str {
        use DamageType::*;
        match self {
            Bludgeoning => "bludgeoning",
            Piercing => "piercing",
            Slashing => "slashing",
            Fire => "fire",
            Cold => "cold",
            Lightning => "lightning",
            Acid => "acid",
            Poison => "poison",
            Psychic => "psychic",
            Radiant => "radiant",
            Necrotic => "necrotic",
            Thunder => "thunder",
            Force => "force",
            Healing => "healing",
        }
    }

    /// Match a flavor-text tag against the known types, case-insensitively.
    pub fn from_label(s: &str) -> Option<DamageType> {
        use DamageType::*;
        match s.trim().to_lowercase().as_str() {
            "bludgeoning" => Some(Bludgeoning),
            "piercing" => Some(Piercing),
            "slashing" => Some(Slashing),
            "fire" => Some(Fire),
            "cold" => Some(Cold),
            "lightning" => Some(Lightning),
            "acid" => Some(Acid),
            "poison" => Some(Poison),
            "psychic" => Some(Psychic),
            "radiant" => Some(Radiant),
            "necrotic" => Some(Necrotic),
            "thunder" => Some(Thunder),
            "force" => Some(Force),
            "healing" => Some(Healing),
            _ => None,
        }
    }
}

impl std::str::FromStr for DamageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DamageType::from_label(s).ok_or_else(|| format!("unknown damage type '{s}'"))
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
