use std::collections::BTreeMap;

use engine::{
    kind, BatchSink, ConsumptionError, ConsumptionResolver, ConsumptionStrategy,
    ConsumptionTarget, DiceEvaluator, Pool, PoolSnapshot, ResolveError, RollData, ShortfallCause,
    UpdateBatch, Uses,
};
use proptest::prelude::*;

fn no_data() -> RollData {
    RollData::new()
}

fn resolve(
    targets: &[ConsumptionTarget],
    steps: i32,
    snapshot: &PoolSnapshot,
) -> Result<engine::UpdateBatch, ResolveError> {
    let resolver = ConsumptionResolver::new();
    let mut evaluator = DiceEvaluator::seeded(0);
    resolver.resolve(targets, steps, snapshot, &mut evaluator, &no_data())
}

fn consumption_err(err: ResolveError) -> ConsumptionError {
    match err {
        ResolveError::Consumption(e) => e,
        other => panic!("expected a consumption error, got {other:?}"),
    }
}

#[test]
fn activity_spend_lands_in_the_batch() {
    let snapshot = PoolSnapshot {
        activity: Uses::new(3),
        ..Default::default()
    };
    let targets = [ConsumptionTarget::new(kind::ACTIVITY_USES, "", "1")];
    let batch = resolve(&targets, 0, &snapshot).unwrap();
    assert_eq!(batch.activity["uses.spent"], 1);
    assert!(batch.actor.is_empty());
    assert!(batch.rolls.is_empty());
}

#[test]
fn later_targets_see_earlier_spending() {
    let snapshot = PoolSnapshot {
        activity: Uses::new(1),
        ..Default::default()
    };
    let targets = [
        ConsumptionTarget::new(kind::ACTIVITY_USES, "", "1"),
        ConsumptionTarget::new(kind::ACTIVITY_USES, "", "1"),
    ];
    let err = consumption_err(resolve(&targets, 0, &snapshot).unwrap_err());
    assert_eq!(err.cause, ShortfallCause::NoneAvailable);
}

#[test]
fn item_spend_targets_the_item_by_id() {
    let mut snapshot = PoolSnapshot::default();
    snapshot.items.insert("wand".into(), Uses::new(7));
    let targets = [ConsumptionTarget::new(kind::ITEM_USES, "wand", "2")];
    let batch = resolve(&targets, 0, &snapshot).unwrap();
    assert_eq!(batch.items.len(), 1);
    assert_eq!(batch.items[0].id, "wand");
    assert_eq!(batch.items[0].fields["uses.spent"], 2);
}

#[test]
fn unknown_item_is_a_missing_pool() {
    let snapshot = PoolSnapshot::default();
    let targets = [ConsumptionTarget::new(kind::ITEM_USES, "wand", "1")];
    let err = consumption_err(resolve(&targets, 0, &snapshot).unwrap_err());
    assert_eq!(err.cause, ShortfallCause::MissingPool);
}

fn hit_dice_snapshot(pools: &[(i32, i32, i32)]) -> PoolSnapshot {
    let hit_dice: BTreeMap<i32, Pool> = pools
        .iter()
        .map(|&(faces, max, spent)| (faces, Pool { max, spent }))
        .collect();
    PoolSnapshot {
        hit_dice,
        ..Default::default()
    }
}

#[test]
fn smallest_spillover_walks_up_denominations() {
    let snapshot = hit_dice_snapshot(&[(6, 1, 0), (8, 2, 0)]);
    let targets = [ConsumptionTarget::new(kind::HIT_DICE, "smallest", "2")];
    let batch = resolve(&targets, 0, &snapshot).unwrap();
    assert_eq!(batch.actor["hit_dice.d6.spent"], 1);
    assert_eq!(batch.actor["hit_dice.d8.spent"], 1);
}

#[test]
fn largest_spillover_walks_down() {
    let snapshot = hit_dice_snapshot(&[(6, 1, 0), (8, 2, 0)]);
    let targets = [ConsumptionTarget::new(kind::HIT_DICE, "largest", "2")];
    let batch = resolve(&targets, 0, &snapshot).unwrap();
    assert_eq!(batch.actor["hit_dice.d8.spent"], 2);
    assert!(!batch.actor.contains_key("hit_dice.d6.spent"));
}

#[test]
fn insufficient_spillover_touches_nothing() {
    let snapshot = hit_dice_snapshot(&[(6, 1, 0), (8, 2, 0)]);
    let targets = [ConsumptionTarget::new(kind::HIT_DICE, "smallest", "4")];
    let err = consumption_err(resolve(&targets, 0, &snapshot).unwrap_err());
    assert_eq!(err.cause, ShortfallCause::NotEnough);
    assert_eq!(err.available, 3);
    // The input snapshot is never mutated.
    assert_eq!(snapshot.hit_dice[&6].spent, 0);
    assert_eq!(snapshot.hit_dice[&8].spent, 0);
}

#[test]
fn a_single_denomination_can_be_named() {
    let snapshot = hit_dice_snapshot(&[(8, 2, 0)]);
    let targets = [ConsumptionTarget::new(kind::HIT_DICE, "d8", "1")];
    let batch = resolve(&targets, 0, &snapshot).unwrap();
    assert_eq!(batch.actor["hit_dice.d8.spent"], 1);
}

#[test]
fn spillover_refund_restores_in_order() {
    let snapshot = hit_dice_snapshot(&[(6, 1, 1), (8, 2, 1)]);
    let targets = [ConsumptionTarget::new(kind::HIT_DICE, "smallest", "-2")];
    let batch = resolve(&targets, 0, &snapshot).unwrap();
    assert_eq!(batch.actor["hit_dice.d6.spent"], 0);
    assert_eq!(batch.actor["hit_dice.d8.spent"], 0);
}

fn spell_snapshot(ring: i32, max: i32, spent: i32) -> PoolSnapshot {
    let mut spell_slots = BTreeMap::new();
    spell_slots.insert(ring, Pool { max, spent });
    PoolSnapshot {
        spell_slots,
        ..Default::default()
    }
}

#[test]
fn steps_shift_the_spell_slot_ring() {
    let snapshot = spell_snapshot(3, 2, 0);
    let targets = [ConsumptionTarget::new(kind::SPELL_SLOTS, "2", "1")];
    let batch = resolve(&targets, 1, &snapshot).unwrap();
    assert_eq!(batch.actor["spells.slot3.spent"], 1);
}

#[test]
fn spent_out_ring_reports_none_available() {
    let snapshot = spell_snapshot(2, 2, 2);
    let targets = [ConsumptionTarget::new(kind::SPELL_SLOTS, "2", "1")];
    let err = consumption_err(resolve(&targets, 0, &snapshot).unwrap_err());
    assert_eq!(err.cause, ShortfallCause::NoneAvailable);
}

#[test]
fn overdrawn_ring_reports_not_enough_and_stays_put() {
    let snapshot = spell_snapshot(2, 2, 1);
    let targets = [ConsumptionTarget::new(kind::SPELL_SLOTS, "2", "2")];
    let err = consumption_err(resolve(&targets, 0, &snapshot).unwrap_err());
    assert_eq!(err.cause, ShortfallCause::NotEnough);
    assert_eq!(err.available, 1);
    assert_eq!(snapshot.spell_slots[&2].spent, 1);
}

#[test]
fn missing_ring_reports_missing_pool() {
    let snapshot = spell_snapshot(1, 2, 0);
    let targets = [ConsumptionTarget::new(kind::SPELL_SLOTS, "5", "1")];
    let err = consumption_err(resolve(&targets, 0, &snapshot).unwrap_err());
    assert_eq!(err.cause, ShortfallCause::MissingPool);
}

#[test]
fn scale_formula_grows_the_cost_per_step() {
    let snapshot = PoolSnapshot {
        activity: Uses::new(6),
        ..Default::default()
    };
    let targets = [ConsumptionTarget::new(kind::ACTIVITY_USES, "", "1").with_scale("2")];
    let batch = resolve(&targets, 2, &snapshot).unwrap();
    assert_eq!(batch.activity["uses.spent"], 5);
}

#[test]
fn unregistered_kinds_are_skipped() {
    let snapshot = PoolSnapshot::default();
    let targets = [ConsumptionTarget::new("homebrew_sanity", "", "1")];
    let batch = resolve(&targets, 0, &snapshot).unwrap();
    assert!(batch.is_empty());
}

#[test]
fn random_costs_record_their_roll() {
    let snapshot = PoolSnapshot {
        activity: Uses::new(10),
        ..Default::default()
    };
    let targets = [ConsumptionTarget::new(kind::ACTIVITY_USES, "", "1d4")];
    let resolver = ConsumptionResolver::new();
    let mut evaluator = DiceEvaluator::scripted(vec![3]);
    let batch = resolver
        .resolve(&targets, 0, &snapshot, &mut evaluator, &no_data())
        .unwrap();
    assert_eq!(batch.rolls.len(), 1);
    assert_eq!(batch.rolls[0].total, 3);
    assert_eq!(batch.activity["uses.spent"], 3);
}

#[test]
fn failure_discards_the_whole_batch() {
    let mut snapshot = PoolSnapshot {
        activity: Uses::new(3),
        ..Default::default()
    };
    snapshot.items.insert("wand".into(), Uses::new(0));
    let targets = [
        ConsumptionTarget::new(kind::ACTIVITY_USES, "", "1"),
        ConsumptionTarget::new(kind::ITEM_USES, "wand", "1"),
    ];
    // The activity spend succeeded first, but the pass returns no batch.
    assert!(resolve(&targets, 0, &snapshot).is_err());
}

struct TithingStrategy;

impl ConsumptionStrategy for TithingStrategy {
    fn apply(
        &self,
        ctx: &mut engine::ResolutionContext,
        _target: &ConsumptionTarget,
        cost: i32,
    ) -> Result<(), ConsumptionError> {
        ctx.batch.set_actor("gold.spent", cost);
        Ok(())
    }
}

#[test]
fn host_strategies_extend_the_registry() {
    let mut resolver = ConsumptionResolver::new();
    resolver.register("gold", Box::new(TithingStrategy));
    let targets = [ConsumptionTarget::new("gold", "", "25")];
    let mut evaluator = DiceEvaluator::seeded(0);
    let batch = resolver
        .resolve(&targets, 0, &PoolSnapshot::default(), &mut evaluator, &no_data())
        .unwrap();
    assert_eq!(batch.actor["gold.spent"], 25);
}

#[derive(Default)]
struct MemorySink {
    committed: Vec<UpdateBatch>,
    unavailable: bool,
}

impl BatchSink for MemorySink {
    fn commit(&mut self, batch: &UpdateBatch) -> anyhow::Result<()> {
        if self.unavailable {
            anyhow::bail!("sink unavailable");
        }
        self.committed.push(batch.clone());
        Ok(())
    }
}

#[test]
fn a_resolved_batch_commits_through_the_sink() {
    let snapshot = PoolSnapshot {
        activity: Uses::new(3),
        ..Default::default()
    };
    let targets = [ConsumptionTarget::new(kind::ACTIVITY_USES, "", "1")];
    let batch = resolve(&targets, 0, &snapshot).unwrap();

    let mut sink = MemorySink::default();
    sink.commit(&batch).unwrap();
    assert_eq!(sink.committed.len(), 1);
    assert_eq!(sink.committed[0].activity["uses.spent"], 1);
}

#[test]
fn sink_failure_surfaces_to_the_caller() {
    let mut sink = MemorySink {
        unavailable: true,
        ..Default::default()
    };
    let err = sink.commit(&UpdateBatch::new()).unwrap_err();
    assert!(err.to_string().contains("sink unavailable"));
}

proptest! {
    #[test]
    fn activity_spent_never_leaves_bounds(max in 0..20i32, cost in -20..20i32) {
        let snapshot = PoolSnapshot {
            activity: Uses::new(max),
            ..Default::default()
        };
        let targets = [ConsumptionTarget::new(kind::ACTIVITY_USES, "", &cost.to_string())];
        match resolve(&targets, 0, &snapshot) {
            Ok(batch) => {
                if let Some(value) = batch.activity.get("uses.spent") {
                    let spent = value.as_i64().unwrap() as i32;
                    prop_assert!((0..=max).contains(&spent));
                }
            }
            Err(_) => prop_assert!(cost > 0),
        }
    }
}
