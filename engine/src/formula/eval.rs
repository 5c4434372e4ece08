use serde::{Deserialize, Serialize};

use super::term::{DieResult, DieTerm, GroupTerm, KeepMode, Operator, Quantity, Term};
use super::{render_terms, RollData};
use crate::dice::Dice;
use crate::error::FormulaError;

/// Outcome of evaluating a term list: the same terms with die results filled
/// in, the computed total, and whether any randomness was involved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedTerms {
    pub terms: Vec<Term>,
    pub total: i32,
    pub deterministic: bool,
}

impl EvaluatedTerms {
    pub fn formula(&self) -> String {
        render_terms(&self.terms)
    }
}

/// Evaluate a term list, rolling dice as needed.
///
/// `*` and `/` bind tighter than `+` and `-`; `/` is floor division. Die
/// counts or faces still pending on a non-deterministic group are rejected.
pub fn evaluate_terms(terms: &[Term], dice: &mut Dice) -> Result<EvaluatedTerms, FormulaError> {
    let mut rolled_any = false;
    let mut out = Vec::with_capacity(terms.len());
    for term in terms {
        match term {
            Term::Die(d) => {
                let evaluated = roll_die(d, dice)?;
                rolled_any |= !evaluated.results.is_empty();
                out.push(Term::Die(evaluated));
            }
            Term::Group(g) => {
                let inner = evaluate_terms(&g.terms, dice)?;
                rolled_any |= !inner.deterministic;
                out.push(Term::Group(GroupTerm { terms: inner.terms }));
            }
            other => out.push(other.clone()),
        }
    }
    let total = fold_terms(&out, &mut evaluated_operand)?;
    Ok(EvaluatedTerms {
        terms: out,
        total,
        deterministic: !rolled_any,
    })
}

/// Total of a term list that contains no dice; `None` if it does.
pub fn deterministic_total(terms: &[Term]) -> Option<i32> {
    fold_terms(terms, &mut |term| match term {
        Term::Number(n) => Ok(n.value),
        Term::Group(g) => {
            deterministic_total(&g.terms).ok_or(FormulaError::UnresolvedDice(render_terms(terms)))
        }
        Term::Die(_) => Err(FormulaError::UnresolvedDice(render_terms(terms))),
        Term::Operator(_) => unreachable!("operators are consumed by fold_terms"),
    })
    .ok()
}

/// Recompute the total of an already-evaluated term list from its stored die
/// results. The list was validated when first evaluated.
pub fn evaluated_total(terms: &[Term]) -> i32 {
    fold_terms(terms, &mut evaluated_operand).unwrap_or(0)
}

fn evaluated_operand(term: &Term) -> Result<i32, FormulaError> {
    match term {
        Term::Die(d) => Ok(d.value()),
        Term::Number(n) => Ok(n.value),
        Term::Group(g) => fold_terms(&g.terms, &mut evaluated_operand),
        Term::Operator(_) => unreachable!("operators are consumed by fold_terms"),
    }
}

fn roll_die(term: &DieTerm, dice: &mut Dice) -> Result<DieTerm, FormulaError> {
    let count = resolve_quantity(&term.count)?.max(0);
    let faces = resolve_quantity(&term.faces)?;
    if faces < 1 {
        return Err(FormulaError::InvalidDie(format!("d{}", faces)));
    }

    let mut results = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let first = dice.roll(faces);
        let (value, rerolled) = match term.reroll_max {
            Some(max) if first <= max => (dice.roll(faces), true),
            _ => (first, false),
        };
        results.push(DieResult {
            value,
            kept: true,
            rerolled,
        });
    }

    if let Some(keep) = term.keep {
        let k = keep.count.clamp(0, count) as usize;
        let mut order: Vec<usize> = (0..results.len()).collect();
        match keep.mode {
            KeepMode::Highest => order.sort_by_key(|&i| std::cmp::Reverse(results[i].value)),
            KeepMode::Lowest => order.sort_by_key(|&i| results[i].value),
        }
        for &i in &order[k.min(order.len())..] {
            results[i].kept = false;
        }
    }

    let mut evaluated = term.clone();
    evaluated.count = Quantity::Fixed(count);
    evaluated.faces = Quantity::Fixed(faces);
    evaluated.results = results;
    Ok(evaluated)
}

fn resolve_quantity(q: &Quantity) -> Result<i32, FormulaError> {
    match q {
        Quantity::Fixed(n) => Ok(*n),
        Quantity::Pending(g) => deterministic_total(&g.terms)
            .ok_or_else(|| FormulaError::UnresolvedDice(render_terms(&g.terms))),
    }
}

/// Reduce a flat term list to a total, honoring operator precedence and a
/// leading unary sign.
fn fold_terms(
    terms: &[Term],
    operand: &mut dyn FnMut(&Term) -> Result<i32, FormulaError>,
) -> Result<i32, FormulaError> {
    let mut values: Vec<i32> = Vec::new();
    let mut ops: Vec<Operator> = Vec::new();
    let mut expect_operand = true;
    let mut sign = 1;

    for term in terms {
        match term {
            Term::Operator(op) => {
                if expect_operand {
                    match op {
                        Operator::Add => {}
                        Operator::Sub => sign = -sign,
                        _ => return Err(FormulaError::Expected("operand", 0)),
                    }
                } else {
                    ops.push(*op);
                    expect_operand = true;
                }
            }
            t => {
                if !expect_operand {
                    // Adjacent operands join additively (aggregated chunks).
                    ops.push(Operator::Add);
                }
                values.push(sign * operand(t)?);
                sign = 1;
                expect_operand = false;
            }
        }
    }

    if values.is_empty() {
        return Err(FormulaError::Empty);
    }

    // Multiplicative pass, then additive fold.
    let mut reduced = vec![values[0]];
    let mut add_ops = Vec::new();
    for (op, v) in ops.iter().zip(values[1..].iter()) {
        match op {
            Operator::Mul => {
                let last = reduced.last_mut().expect("non-empty");
                *last *= v;
            }
            Operator::Div => {
                if *v == 0 {
                    return Err(FormulaError::DivisionByZero);
                }
                let last = reduced.last_mut().expect("non-empty");
                *last = last.div_euclid(*v);
            }
            Operator::Add | Operator::Sub => {
                add_ops.push(*op);
                reduced.push(*v);
            }
        }
    }

    let mut total = reduced[0];
    for (op, v) in add_ops.iter().zip(reduced[1..].iter()) {
        match op {
            Operator::Add => total += v,
            Operator::Sub => total -= v,
            _ => unreachable!(),
        }
    }
    Ok(total)
}
