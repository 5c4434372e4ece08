//! Dice-expression parsing and evaluation.
//!
//! A formula is parsed into a flat list of [`Term`]s, canonicalized, and
//! evaluated against a [`Dice`] roller. The [`FormulaEvaluator`] trait is
//! the seam hosts can replace with their own expression engine.

mod eval;
mod parser;
mod term;

pub use eval::{deterministic_total, evaluate_terms, evaluated_total, EvaluatedTerms};
pub use parser::parse;
pub use term::{
    render_terms, DieResult, DieTerm, GroupTerm, Keep, KeepMode, NumberTerm, Operator, Quantity,
    Term,
};

use indexmap::IndexMap;

use crate::dice::Dice;
use crate::error::FormulaError;

/// Flat data context substituted into `@dotted.path` references.
pub type RollData = IndexMap<String, i32>;

/// Rewrite a term list into canonical form without changing its value:
/// implicit `dN` counts become explicit `1dN`, and pending count/face groups
/// that evaluate deterministically are folded into literals. Idempotent.
pub fn canonicalize(terms: &[Term]) -> Vec<Term> {
    terms
        .iter()
        .map(|term| match term {
            Term::Die(d) => {
                let mut d = d.clone();
                d.implicit_count = false;
                d.count = fold_quantity(d.count);
                d.faces = fold_quantity(d.faces);
                Term::Die(d)
            }
            Term::Group(g) => Term::Group(GroupTerm {
                terms: canonicalize(&g.terms),
            }),
            other => other.clone(),
        })
        .collect()
}

fn fold_quantity(q: Quantity) -> Quantity {
    match q {
        Quantity::Fixed(n) => Quantity::Fixed(n),
        Quantity::Pending(g) => {
            let inner = canonicalize(&g.terms);
            match deterministic_total(&inner) {
                Some(n) => Quantity::Fixed(n),
                None => Quantity::Pending(Box::new(GroupTerm { terms: inner })),
            }
        }
    }
}

/// Black-box formula evaluation: a formula string plus a data context in,
/// an evaluated result out. Callers must branch on `deterministic` rather
/// than assume it.
pub trait FormulaEvaluator {
    fn evaluate(
        &mut self,
        formula: &str,
        data: &RollData,
    ) -> Result<EvaluatedTerms, FormulaError>;
}

/// Default evaluator: this crate's parser over a [`Dice`] roller.
pub struct DiceEvaluator {
    dice: Dice,
}

impl DiceEvaluator {
    pub fn new(dice: Dice) -> Self {
        Self { dice }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(Dice::from_seed(seed))
    }

    pub fn scripted(faces: Vec<i32>) -> Self {
        Self::new(Dice::from_scripted(faces))
    }

    pub fn dice_mut(&mut self) -> &mut Dice {
        &mut self.dice
    }
}

impl FormulaEvaluator for DiceEvaluator {
    fn evaluate(
        &mut self,
        formula: &str,
        data: &RollData,
    ) -> Result<EvaluatedTerms, FormulaError> {
        let terms = canonicalize(&parse(formula, data)?);
        evaluate_terms(&terms, &mut self.dice)
    }
}
