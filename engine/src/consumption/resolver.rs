use indexmap::IndexMap;
use tracing::debug;

use super::batch::UpdateBatch;
use super::pools::{Pool, PoolSnapshot, Uses};
use super::target::{kind, ConsumptionTarget};
use crate::error::{ConsumptionError, ResolveError};
use crate::formula::{FormulaEvaluator, RollData};

/// Working state of one resolution pass: a mutable copy of the pool
/// snapshot plus the batch under construction. Strategies mutate the copy
/// so later targets in the same pass see earlier targets' effects.
pub struct ResolutionContext {
    pub pools: PoolSnapshot,
    pub batch: UpdateBatch,
    pub steps: i32,
}

/// Pool-type–specific consumption behavior. One implementation per kind,
/// registered with the resolver by string key.
pub trait ConsumptionStrategy {
    /// Cost formula for this pool type at the given scaling. The default
    /// interpolates the scale formula per step; spell slots override this
    /// and shift the ring instead.
    fn cost_formula(&self, target: &ConsumptionTarget, steps: i32) -> String {
        target.scaled_formula(steps)
    }

    /// Pay an evaluated cost out of the working pools, recording the
    /// proposed updates. Must leave the context untouched on error.
    fn apply(
        &self,
        ctx: &mut ResolutionContext,
        target: &ConsumptionTarget,
        cost: i32,
    ) -> Result<(), ConsumptionError>;
}

/// Dispatches consumption targets to per-kind strategies and assembles the
/// all-or-nothing update batch.
pub struct ConsumptionResolver {
    strategies: IndexMap<String, Box<dyn ConsumptionStrategy>>,
}

impl Default for ConsumptionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsumptionResolver {
    /// Resolver with the four built-in strategies registered.
    pub fn new() -> Self {
        let mut resolver = Self {
            strategies: IndexMap::new(),
        };
        resolver.register(kind::ACTIVITY_USES, Box::new(ActivityUsesStrategy));
        resolver.register(kind::ITEM_USES, Box::new(ItemUsesStrategy));
        resolver.register(kind::HIT_DICE, Box::new(HitDiceStrategy));
        resolver.register(kind::SPELL_SLOTS, Box::new(SpellSlotsStrategy));
        resolver
    }

    pub fn register(&mut self, kind: &str, strategy: Box<dyn ConsumptionStrategy>) {
        self.strategies.insert(kind.to_string(), strategy);
    }

    /// Resolve all targets in input order against a copy of the snapshot.
    ///
    /// The first failure aborts the pass; nothing is written anywhere and
    /// the partially-built batch is discarded. Targets with no registered
    /// strategy are a no-op pass-through. Non-deterministic evaluated costs
    /// record their roll in the batch.
    pub fn resolve(
        &self,
        targets: &[ConsumptionTarget],
        steps: i32,
        snapshot: &PoolSnapshot,
        evaluator: &mut dyn FormulaEvaluator,
        data: &RollData,
    ) -> Result<UpdateBatch, ResolveError> {
        let mut ctx = ResolutionContext {
            pools: snapshot.clone(),
            batch: UpdateBatch::new(),
            steps,
        };
        for target in targets {
            let Some(strategy) = self.strategies.get(&target.kind) else {
                debug!(kind = %target.kind, "no strategy registered; skipping target");
                continue;
            };
            let formula = strategy.cost_formula(target, steps);
            let evaluated = evaluator.evaluate(&formula, data)?;
            let cost = evaluated.total;
            if !evaluated.deterministic {
                ctx.batch.push_roll(evaluated);
            }
            debug!(kind = %target.kind, target = %target.target, cost, "consuming");
            strategy.apply(&mut ctx, target, cost)?;
        }
        Ok(ctx.batch)
    }
}

/// Clamp-and-spend for a [`Uses`] pool. Returns the new `spent` to write,
/// or `None` when the operation is a no-op (zero cost, or a refund already
/// at the floor).
fn consume_uses(
    pool_name: &str,
    uses: &mut Uses,
    cost: i32,
) -> Result<Option<i32>, ConsumptionError> {
    if cost > 0 && uses.value() <= 0 {
        return Err(ConsumptionError::none_available(pool_name, cost));
    }
    let proposed = uses.spent + cost;
    if proposed > uses.spent_ceiling() {
        return Err(ConsumptionError::not_enough(pool_name, cost, uses.value()));
    }
    let new_spent = proposed.max(0);
    if new_spent == uses.spent {
        return Ok(None);
    }
    uses.spent = new_spent;
    Ok(Some(new_spent))
}

/// Same clamp rules for a min-less [`Pool`] (hit dice, spell slots).
fn consume_pool(
    pool_name: &str,
    pool: &mut Pool,
    cost: i32,
) -> Result<Option<i32>, ConsumptionError> {
    if cost > 0 {
        if pool.available() <= 0 {
            return Err(ConsumptionError::none_available(pool_name, cost));
        }
        if cost > pool.available() {
            return Err(ConsumptionError::not_enough(pool_name, cost, pool.available()));
        }
    }
    let new_spent = (pool.spent + cost).max(0);
    if new_spent == pool.spent {
        return Ok(None);
    }
    pool.spent = new_spent;
    Ok(Some(new_spent))
}

struct ActivityUsesStrategy;

impl ConsumptionStrategy for ActivityUsesStrategy {
    fn apply(
        &self,
        ctx: &mut ResolutionContext,
        _target: &ConsumptionTarget,
        cost: i32,
    ) -> Result<(), ConsumptionError> {
        if let Some(spent) = consume_uses("activity uses", &mut ctx.pools.activity, cost)? {
            ctx.batch.set_activity("uses.spent", spent);
        }
        Ok(())
    }
}

struct ItemUsesStrategy;

impl ConsumptionStrategy for ItemUsesStrategy {
    fn apply(
        &self,
        ctx: &mut ResolutionContext,
        target: &ConsumptionTarget,
        cost: i32,
    ) -> Result<(), ConsumptionError> {
        let id = target.target.as_str();
        let label = format!("item '{}' uses", id);
        let Some(uses) = ctx.pools.items.get_mut(id) else {
            return Err(ConsumptionError::missing_pool(label, cost));
        };
        if let Some(spent) = consume_uses(&label, uses, cost)? {
            ctx.batch.set_item(id, "uses.spent", spent);
        }
        Ok(())
    }
}

struct HitDiceStrategy;

impl ConsumptionStrategy for HitDiceStrategy {
    fn apply(
        &self,
        ctx: &mut ResolutionContext,
        target: &ConsumptionTarget,
        cost: i32,
    ) -> Result<(), ConsumptionError> {
        match target.target.trim() {
            "smallest" => spillover(ctx, cost, false),
            "largest" => spillover(ctx, cost, true),
            denomination => {
                let faces: i32 = denomination
                    .trim_start_matches(['d', 'D'])
                    .parse()
                    .map_err(|_| {
                        ConsumptionError::missing_pool(
                            format!("hit dice '{}'", denomination),
                            cost,
                        )
                    })?;
                let label = format!("d{} hit dice", faces);
                let Some(pool) = ctx.pools.hit_dice.get_mut(&faces) else {
                    return Err(ConsumptionError::missing_pool(label, cost));
                };
                if let Some(spent) = consume_pool(&label, pool, cost)? {
                    ctx.batch
                        .set_actor(&format!("hit_dice.d{}.spent", faces), spent);
                }
                Ok(())
            }
        }
    }
}

/// Greedy multi-denomination consumption: walk denominations smallest- or
/// largest-first, drawing from each until the cost is covered. Sufficiency
/// is checked against the aggregate before any pool is touched, so no
/// denomination's `spent` ever moves on failure.
fn spillover(ctx: &mut ResolutionContext, cost: i32, largest: bool) -> Result<(), ConsumptionError> {
    let label = if largest {
        "largest hit dice"
    } else {
        "smallest hit dice"
    };
    let ResolutionContext { pools, batch, .. } = ctx;
    let mut entries: Vec<(i32, &mut Pool)> = pools
        .hit_dice
        .iter_mut()
        .map(|(faces, pool)| (*faces, pool))
        .collect();
    if largest {
        entries.reverse();
    }

    if cost > 0 {
        let total_available: i32 = entries.iter().map(|(_, pool)| pool.available()).sum();
        if total_available <= 0 {
            return Err(ConsumptionError::none_available(label, cost));
        }
        if cost > total_available {
            return Err(ConsumptionError::not_enough(label, cost, total_available));
        }
        let mut remaining = cost;
        for (faces, pool) in entries {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(pool.available());
            if take <= 0 {
                continue;
            }
            pool.spent += take;
            remaining -= take;
            batch.set_actor(&format!("hit_dice.d{}.spent", faces), pool.spent);
        }
    } else if cost < 0 {
        // Refund in the same order; anything beyond total spent is a no-op.
        let mut remaining = -cost;
        for (faces, pool) in entries {
            if remaining == 0 {
                break;
            }
            let give = remaining.min(pool.spent);
            if give <= 0 {
                continue;
            }
            pool.spent -= give;
            remaining -= give;
            batch.set_actor(&format!("hit_dice.d{}.spent", faces), pool.spent);
        }
    }
    Ok(())
}

struct SpellSlotsStrategy;

impl ConsumptionStrategy for SpellSlotsStrategy {
    /// Scaling a spell consumes a higher ring, not a bigger cost.
    fn cost_formula(&self, target: &ConsumptionTarget, _steps: i32) -> String {
        target.value.clone()
    }

    fn apply(
        &self,
        ctx: &mut ResolutionContext,
        target: &ConsumptionTarget,
        cost: i32,
    ) -> Result<(), ConsumptionError> {
        let base_ring: i32 = target.target.trim().parse().map_err(|_| {
            ConsumptionError::missing_pool(format!("spell slot ring '{}'", target.target), cost)
        })?;
        let ring = base_ring + ctx.steps;
        let label = format!("ring {} spell slots", ring);
        let Some(pool) = ctx.pools.spell_slots.get_mut(&ring) else {
            return Err(ConsumptionError::missing_pool(label, cost));
        };
        if let Some(spent) = consume_pool(&label, pool, cost)? {
            ctx.batch
                .set_actor(&format!("spells.slot{}.spent", ring), spent);
        }
        Ok(())
    }
}
