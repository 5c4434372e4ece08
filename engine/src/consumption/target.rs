use serde::{Deserialize, Serialize};

/// Built-in consumption kinds. The registry is string-keyed so hosts can add
/// their own without touching the resolver.
pub mod kind {
    pub const ACTIVITY_USES: &str = "activity_uses";
    pub const ITEM_USES: &str = "item_uses";
    pub const HIT_DICE: &str = "hit_dice";
    pub const SPELL_SLOTS: &str = "spell_slots";
}

/// One cost an activation must pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConsumptionTarget {
    /// Strategy key; one of [`kind`]'s constants or a host extension.
    pub kind: String,
    /// Pool sub-identifier: an item id, a hit-die denomination (`"d8"`,
    /// `"smallest"`, `"largest"`), or a spell-slot ring number. Empty for
    /// kinds with a single implicit pool.
    #[serde(default)]
    pub target: String,
    /// Base cost formula, evaluated on every consumption; may be random.
    pub value: String,
    /// Additional cost per step of activation scaling.
    #[serde(default)]
    pub scale: Option<String>,
}

impl ConsumptionTarget {
    pub fn new(kind: &str, target: &str, value: &str) -> Self {
        Self {
            kind: kind.to_string(),
            target: target.to_string(),
            value: value.to_string(),
            scale: None,
        }
    }

    pub fn with_scale(mut self, scale: &str) -> Self {
        self.scale = Some(scale.to_string());
        self
    }

    /// Default scaling policy: `(value) + (scale) * steps` when scaling
    /// applies, otherwise the base formula. Pool-type strategies may
    /// override this (spell slots shift the ring instead).
    pub fn scaled_formula(&self, steps: i32) -> String {
        match &self.scale {
            Some(scale) if steps > 0 => {
                format!("({}) + ({}) * {}", self.value, scale, steps)
            }
            _ => self.value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_interpolates_steps() {
        let target = ConsumptionTarget::new(kind::HIT_DICE, "smallest", "1").with_scale("1");
        assert_eq!(target.scaled_formula(0), "1");
        assert_eq!(target.scaled_formula(2), "(1) + (1) * 2");
    }

    #[test]
    fn no_scale_formula_means_no_scaling() {
        let target = ConsumptionTarget::new(kind::ACTIVITY_USES, "", "1d4");
        assert_eq!(target.scaled_formula(3), "1d4");
    }
}
