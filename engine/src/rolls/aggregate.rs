use indexmap::IndexMap;
use serde::Serialize;

use crate::damage_types::DamageType;
use crate::formula::{evaluated_total, render_terms, Operator, Term};
use crate::rolls::damage::DamageRoll;

/// One merged per-type roll produced by [`aggregate`].
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedDamage {
    pub damage_type: DamageType,
    /// Present only when aggregation was keyed on the magical flag.
    pub magical: Option<bool>,
    pub terms: Vec<Term>,
    pub total: i32,
}

impl AggregatedDamage {
    pub fn formula(&self) -> String {
        render_terms(&self.terms)
    }
}

/// Regroup evaluated damage rolls into one roll per damage type (and, when
/// `by_magical` is set, per magical flag).
///
/// Each input roll's terms are split into chunks at `+`/`-` boundaries
/// (`*`/`/` keep a chunk together). A chunk's type comes from a term flavor
/// naming a known damage type, else the roll's declared type; its sign
/// toggles on each `-` crossed. Unevaluated rolls are skipped. The sum of
/// output totals equals the sum of input totals.
pub fn aggregate(rolls: &[DamageRoll], by_magical: bool) -> Vec<AggregatedDamage> {
    let mut groups: IndexMap<(DamageType, Option<bool>), AggregatedDamage> = IndexMap::new();

    for roll in rolls {
        let Some(evaluated) = roll.evaluated() else {
            tracing::warn!("skipping unevaluated damage roll in aggregation");
            continue;
        };
        let magical = by_magical.then_some(roll.magical());

        let mut chunk: Vec<Term> = Vec::new();
        let mut negative = false;
        for term in &evaluated.terms {
            match term {
                Term::Operator(op) if !op.is_multiplicative() => {
                    if !chunk.is_empty() {
                        emit_chunk(&mut groups, &chunk, negative, roll.damage_type(), magical);
                        chunk.clear();
                        negative = false;
                    }
                    if matches!(op, Operator::Sub) {
                        negative = !negative;
                    }
                }
                other => chunk.push(other.clone()),
            }
        }
        if !chunk.is_empty() {
            emit_chunk(&mut groups, &chunk, negative, roll.damage_type(), magical);
        }
    }

    groups.into_values().collect()
}

fn emit_chunk(
    groups: &mut IndexMap<(DamageType, Option<bool>), AggregatedDamage>,
    chunk: &[Term],
    negative: bool,
    declared: DamageType,
    magical: Option<bool>,
) {
    let damage_type = chunk
        .iter()
        .filter_map(|t| t.flavor().and_then(DamageType::from_label))
        .next()
        .unwrap_or(declared);

    let value = evaluated_total(chunk);
    let signed = if negative { -value } else { value };

    let entry = groups
        .entry((damage_type, magical))
        .or_insert_with(|| AggregatedDamage {
            damage_type,
            magical,
            terms: Vec::new(),
            total: 0,
        });
    entry.terms.push(Term::Operator(if negative {
        Operator::Sub
    } else {
        Operator::Add
    }));
    entry.terms.extend(chunk.iter().cloned());
    entry.total += signed;
}
