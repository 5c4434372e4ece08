use serde::{Deserialize, Serialize};

use crate::damage_types::DamageType;
use crate::dice::Dice;
use crate::error::FormulaError;
use crate::formula::{
    canonicalize, evaluate_terms, parse, render_terms, EvaluatedTerms, GroupTerm, NumberTerm,
    Operator, Quantity, RollData, Term,
};

fn default_multiplier() -> i32 {
    2
}

/// Critical-hit doubling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DamageRollOptions {
    #[serde(default)]
    pub is_critical: bool,
    /// Overall critical multiplier.
    #[serde(default = "default_multiplier")]
    pub multiplier: i32,
    /// Extra dice added to the first die term on a critical.
    #[serde(default)]
    pub bonus_dice: i32,
    /// Instead of rolling the extra critical dice, add their maximum as a
    /// flat bonus.
    #[serde(default)]
    pub maximize_damage: bool,
    /// Multiply each die term's rolled result instead of rolling more dice.
    #[serde(default)]
    pub multiply_dice: bool,
    /// Multiply flat numeric terms on a critical.
    #[serde(default)]
    pub multiply_numeric: bool,
    /// Extra formula appended only on a critical.
    #[serde(default)]
    pub critical_bonus: Option<String>,
}

impl Default for DamageRollOptions {
    fn default() -> Self {
        Self {
            is_critical: false,
            multiplier: default_multiplier(),
            bonus_dice: 0,
            maximize_damage: false,
            multiply_dice: false,
            multiply_numeric: false,
            critical_bonus: None,
        }
    }
}

/// A damage roll with critical-hit doubling over its term tree.
///
/// The normalized term list is built once and never mutated; every
/// (re)configuration derives a fresh configured list from it, so toggling
/// `is_critical` back and forth reproduces identical terms.
#[derive(Debug, Clone)]
pub struct DamageRoll {
    damage_type: DamageType,
    magical: bool,
    normalized: Vec<Term>,
    critical_bonus_terms: Option<Vec<Term>>,
    options: DamageRollOptions,
    configured: Vec<Term>,
    evaluated: Option<EvaluatedTerms>,
}

impl DamageRoll {
    pub fn new(
        formula: &str,
        data: &RollData,
        damage_type: DamageType,
        magical: bool,
        options: DamageRollOptions,
    ) -> Result<Self, FormulaError> {
        let normalized = canonicalize(&parse(formula, data)?);
        let critical_bonus_terms = match &options.critical_bonus {
            Some(extra) if !extra.trim().is_empty() => Some(canonicalize(&parse(extra, data)?)),
            _ => None,
        };
        let mut roll = Self {
            damage_type,
            magical,
            normalized,
            critical_bonus_terms,
            options,
            configured: Vec::new(),
            evaluated: None,
        };
        roll.configure();
        Ok(roll)
    }

    pub fn damage_type(&self) -> DamageType {
        self.damage_type
    }

    pub fn magical(&self) -> bool {
        self.magical
    }

    pub fn options(&self) -> &DamageRollOptions {
        &self.options
    }

    pub fn is_critical(&self) -> bool {
        self.options.is_critical
    }

    /// Toggle critical state and rebuild the configured terms. Any previous
    /// evaluation is discarded since the term list changed.
    pub fn set_critical(&mut self, on: bool) {
        if self.options.is_critical != on {
            self.options.is_critical = on;
            self.configure();
            self.evaluated = None;
        }
    }

    pub fn set_options(&mut self, options: DamageRollOptions) {
        self.options = options;
        self.configure();
        self.evaluated = None;
    }

    /// Canonical (pre-critical) term list.
    pub fn normalized_terms(&self) -> &[Term] {
        &self.normalized
    }

    /// Term list with critical configuration applied.
    pub fn configured_terms(&self) -> &[Term] {
        &self.configured
    }

    pub fn formula(&self) -> String {
        render_terms(&self.configured)
    }

    pub fn evaluate(&mut self, dice: &mut Dice) -> Result<i32, FormulaError> {
        if let Some(e) = &self.evaluated {
            return Ok(e.total);
        }
        let evaluated = evaluate_terms(&self.configured, dice)?;
        let total = evaluated.total;
        self.evaluated = Some(evaluated);
        Ok(total)
    }

    pub fn total(&self) -> Option<i32> {
        self.evaluated.as_ref().map(|e| e.total)
    }

    pub fn evaluated(&self) -> Option<&EvaluatedTerms> {
        self.evaluated.as_ref()
    }

    /// Derive `configured` from `normalized` according to the options.
    fn configure(&mut self) {
        if !self.options.is_critical {
            self.configured = self.normalized.clone();
            return;
        }

        let multiplier = self.options.multiplier.max(1);
        let mut out;

        if self.options.multiply_dice && self.options.multiply_numeric && multiplier > 1 {
            // Wrap the whole expression and multiply once.
            out = vec![
                Term::Group(GroupTerm {
                    terms: self.normalized.clone(),
                }),
                Term::Operator(Operator::Mul),
                Term::number(multiplier),
            ];
        } else {
            out = Vec::with_capacity(self.normalized.len() + 4);
            let mut first_die = true;
            let mut maximized_bonus = 0;

            for term in &self.normalized {
                match term {
                    Term::Die(die) => {
                        let bonus_dice = if first_die { self.options.bonus_dice } else { 0 };
                        first_die = false;

                        let (Some(base_count), Some(faces)) =
                            (die.count.fixed(), die.faces.fixed())
                        else {
                            // Unresolvable count/faces: leave the term alone.
                            out.push(term.clone());
                            continue;
                        };

                        if self.options.maximize_damage {
                            // The maximized set replaces one multiple of the
                            // dice, so the remaining multiplier drops by one.
                            maximized_bonus += (base_count + bonus_dice) * faces;
                            let effective = (multiplier - 1).max(1);
                            let mut die = die.clone();
                            die.count = Quantity::Fixed(base_count * effective);
                            out.push(Term::Die(die));
                        } else if self.options.multiply_dice {
                            out.push(term.clone());
                            out.push(Term::Operator(Operator::Mul));
                            out.push(Term::number(multiplier));
                        } else {
                            let mut die = die.clone();
                            die.count = Quantity::Fixed(
                                base_count + (multiplier - 1) * base_count + bonus_dice,
                            );
                            out.push(Term::Die(die));
                        }
                    }
                    Term::Number(n) if self.options.multiply_numeric => {
                        out.push(Term::Number(NumberTerm {
                            value: n.value * multiplier,
                            flavor: n.flavor.clone(),
                        }));
                    }
                    other => out.push(other.clone()),
                }
            }

            if maximized_bonus > 0 {
                out.push(Term::Operator(Operator::Add));
                out.push(Term::Number(NumberTerm {
                    value: maximized_bonus,
                    flavor: Some("maximized".to_string()),
                }));
            }
        }

        if let Some(extra) = &self.critical_bonus_terms {
            if !matches!(extra.first(), Some(Term::Operator(_))) {
                out.push(Term::Operator(Operator::Add));
            }
            out.extend(extra.iter().cloned());
        }

        self.configured = out;
    }
}
