use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A limited-use charge pool. `value` is derived: `max - spent`, clamped to
/// `[min, max]`; `spent` stays within `[0, max - min]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Uses {
    pub max: i32,
    #[serde(default)]
    pub min: i32,
    #[serde(default)]
    pub spent: i32,
}

impl Uses {
    pub fn new(max: i32) -> Self {
        Self {
            max,
            min: 0,
            spent: 0,
        }
    }

    /// Remaining value.
    pub fn value(&self) -> i32 {
        (self.max - self.spent).clamp(self.min, self.max)
    }

    /// Largest `spent` that keeps `value` at or above `min`.
    pub fn spent_ceiling(&self) -> i32 {
        self.max - self.min
    }
}

/// One denomination of hit dice, or one spell-slot ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Pool {
    pub max: i32,
    #[serde(default)]
    pub spent: i32,
}

impl Pool {
    pub fn new(max: i32) -> Self {
        Self { max, spent: 0 }
    }

    pub fn available(&self) -> i32 {
        self.max - self.spent
    }
}

/// Read-only view of every pool an activation may draw from, captured when
/// resolution begins. The resolver works on its own copy so that later
/// targets in a pass observe earlier targets' effects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PoolSnapshot {
    /// The activating entity's own charge pool.
    #[serde(default)]
    pub activity: Uses,
    /// Item id → that item's charge pool.
    #[serde(default)]
    pub items: IndexMap<String, Uses>,
    /// Hit-die denomination (faces) → pool. BTreeMap keeps denominations
    /// sorted for smallest/largest spillover.
    #[serde(default)]
    pub hit_dice: BTreeMap<i32, Pool>,
    /// Spell-slot ring number → pool.
    #[serde(default)]
    pub spell_slots: BTreeMap<i32, Pool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_value_is_clamped() {
        let uses = Uses {
            max: 5,
            min: 1,
            spent: 3,
        };
        assert_eq!(uses.value(), 2);
        assert_eq!(uses.spent_ceiling(), 4);

        let over = Uses {
            max: 5,
            min: 1,
            spent: 6,
        };
        assert_eq!(over.value(), 1);
    }

    #[test]
    fn pool_available() {
        let pool = Pool { max: 3, spent: 1 };
        assert_eq!(pool.available(), 2);
    }
}
