use serde::{Deserialize, Serialize};

use crate::dice::Dice;
use crate::error::FormulaError;
use crate::formula::{canonicalize, evaluate_terms, parse, EvaluatedTerms, RollData, Term};

/// How many challenge dice are rolled and which is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollMode {
    Normal,
    Advantage,
    Disadvantage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChallengeOptions {
    #[serde(default)]
    pub advantage: bool,
    #[serde(default)]
    pub disadvantage: bool,
    /// Kept-die threshold for a critical success; defaults to the max face.
    #[serde(default)]
    pub critical_success: Option<i32>,
    /// Kept-die threshold for a critical failure; defaults to 1.
    #[serde(default)]
    pub critical_failure: Option<i32>,
    /// Floor applied to the kept die after keep/drop resolution.
    #[serde(default)]
    pub minimum: Option<i32>,
    /// Number to meet or beat. Without one, neither success nor failure is
    /// ever signalled.
    #[serde(default)]
    pub target: Option<i32>,
}

impl ChallengeOptions {
    /// Advantage and disadvantage are mutually exclusive; both at once
    /// resolve to Normal.
    pub fn mode(&self) -> RollMode {
        match (self.advantage, self.disadvantage) {
            (true, false) => RollMode::Advantage,
            (false, true) => RollMode::Disadvantage,
            _ => RollMode::Normal,
        }
    }
}

/// A d20-style test: one challenge die plus modifier terms.
#[derive(Debug, Clone)]
pub struct ChallengeRoll {
    faces: i32,
    bonus: Option<Vec<Term>>,
    options: ChallengeOptions,
    /// Challenge dice in roll order; empty before evaluation.
    raw: Vec<i32>,
    bonus_eval: Option<EvaluatedTerms>,
    kept: Option<i32>,
    total: Option<i32>,
}

pub const CHALLENGE_DIE_FACES: i32 = 20;

impl ChallengeRoll {
    /// `bonus` is an optional modifier formula added to the kept die
    /// (e.g. `"@prof + 2"`); empty means the bare die.
    pub fn new(
        bonus: &str,
        data: &RollData,
        options: ChallengeOptions,
    ) -> Result<Self, FormulaError> {
        let bonus = if bonus.trim().is_empty() {
            None
        } else {
            Some(canonicalize(&parse(bonus, data)?))
        };
        Ok(Self {
            faces: CHALLENGE_DIE_FACES,
            bonus,
            options,
            raw: Vec::new(),
            bonus_eval: None,
            kept: None,
            total: None,
        })
    }

    pub fn with_faces(mut self, faces: i32) -> Self {
        self.faces = faces.max(2);
        self
    }

    pub fn options(&self) -> &ChallengeOptions {
        &self.options
    }

    pub fn mode(&self) -> RollMode {
        self.options.mode()
    }

    fn dice_to_roll(&self) -> usize {
        match self.options.mode() {
            RollMode::Normal => 1,
            RollMode::Advantage | RollMode::Disadvantage => 2,
        }
    }

    /// Roll the challenge die (or dice) and the bonus terms.
    pub fn evaluate(&mut self, dice: &mut Dice) -> Result<i32, FormulaError> {
        if let Some(total) = self.total {
            return Ok(total);
        }
        for _ in 0..self.dice_to_roll() {
            self.raw.push(dice.roll(self.faces));
        }
        if let Some(terms) = &self.bonus {
            self.bonus_eval = Some(evaluate_terms(terms, dice)?);
        }
        self.apply_keep();
        Ok(self.total.unwrap_or_default())
    }

    /// Change options after the fact. Never rolls new dice: keep/drop is
    /// re-resolved over the already-rolled results and the total adjusted.
    pub fn reconfigure(&mut self, options: ChallengeOptions) {
        self.options = options;
        if !self.raw.is_empty() {
            self.apply_keep();
        }
    }

    fn apply_keep(&mut self) {
        let kept_raw = match self.options.mode() {
            RollMode::Normal => self.raw.first().copied(),
            RollMode::Advantage => self.raw.iter().max().copied(),
            RollMode::Disadvantage => self.raw.iter().min().copied(),
        };
        let Some(kept_raw) = kept_raw else { return };
        let kept = match self.options.minimum {
            Some(min) => kept_raw.max(min),
            None => kept_raw,
        };
        let bonus = self.bonus_eval.as_ref().map(|e| e.total).unwrap_or(0);
        self.kept = Some(kept);
        self.total = Some(kept + bonus);
    }

    /// Raw challenge dice in roll order.
    pub fn raw_rolls(&self) -> &[i32] {
        &self.raw
    }

    /// The kept die after keep/drop and the minimum floor.
    pub fn kept(&self) -> Option<i32> {
        self.kept
    }

    pub fn total(&self) -> Option<i32> {
        self.total
    }

    /// Judged against the kept die, not the raw pair.
    pub fn is_critical_success(&self) -> bool {
        let threshold = self.options.critical_success.unwrap_or(self.faces);
        self.kept.map(|k| k >= threshold).unwrap_or(false)
    }

    pub fn is_critical_failure(&self) -> bool {
        let threshold = self.options.critical_failure.unwrap_or(1);
        self.kept.map(|k| k <= threshold).unwrap_or(false)
    }

    /// False when no target is set; a missing target never signals failure.
    pub fn is_success(&self) -> bool {
        match (self.total, self.options.target) {
            (Some(total), Some(target)) => total >= target,
            _ => false,
        }
    }

    pub fn is_failure(&self) -> bool {
        match (self.total, self.options.target) {
            (Some(total), Some(target)) => total < target,
            _ => false,
        }
    }
}
