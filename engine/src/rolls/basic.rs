use crate::dice::Dice;
use crate::error::FormulaError;
use crate::formula::{
    canonicalize, evaluate_terms, parse, render_terms, EvaluatedTerms, RollData, Term,
};

/// A plain formula roll: parse → canonical term list → evaluated result.
///
/// Stages only move forward; the canonical list is built exactly once at
/// construction and never mutated, so repeated normalization cannot drift.
#[derive(Debug, Clone)]
pub struct BasicRoll {
    terms: Vec<Term>,
    evaluated: Option<EvaluatedTerms>,
}

impl BasicRoll {
    pub fn new(formula: &str, data: &RollData) -> Result<Self, FormulaError> {
        let terms = canonicalize(&parse(formula, data)?);
        Ok(Self {
            terms,
            evaluated: None,
        })
    }

    /// Canonical formula string (evaluated term list once evaluated).
    pub fn formula(&self) -> String {
        match &self.evaluated {
            Some(e) => e.formula(),
            None => render_terms(&self.terms),
        }
    }

    pub fn terms(&self) -> &[Term] {
        match &self.evaluated {
            Some(e) => &e.terms,
            None => &self.terms,
        }
    }

    /// Roll the dice. Evaluating an already-evaluated roll returns the
    /// stored total without touching the roller.
    pub fn evaluate(&mut self, dice: &mut Dice) -> Result<i32, FormulaError> {
        if let Some(e) = &self.evaluated {
            return Ok(e.total);
        }
        let evaluated = evaluate_terms(&self.terms, dice)?;
        let total = evaluated.total;
        self.evaluated = Some(evaluated);
        Ok(total)
    }

    pub fn total(&self) -> Option<i32> {
        self.evaluated.as_ref().map(|e| e.total)
    }

    pub fn is_deterministic(&self) -> Option<bool> {
        self.evaluated.as_ref().map(|e| e.deterministic)
    }

    pub fn result(&self) -> Option<&EvaluatedTerms> {
        self.evaluated.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_once_and_sticks() {
        let mut roll = BasicRoll::new("2d6 + 1", &RollData::new()).unwrap();
        assert_eq!(roll.total(), None);
        let mut dice = Dice::from_scripted(vec![2, 3]);
        assert_eq!(roll.evaluate(&mut dice).unwrap(), 6);
        // Second evaluation returns the stored total without rolling.
        let mut empty = Dice::from_scripted(vec![]);
        assert_eq!(roll.evaluate(&mut empty).unwrap(), 6);
        assert_eq!(roll.total(), Some(6));
    }

    #[test]
    fn formula_is_canonical() {
        let roll = BasicRoll::new("d8+2", &RollData::new()).unwrap();
        assert_eq!(roll.formula(), "1d8 + 2");
    }
}
