//! Rules-resolution core for activating game actions: resource-consumption
//! resolution with all-or-nothing update batching, and dice-roll
//! computation (challenge rolls with advantage/disadvantage, damage rolls
//! with critical doubling, per-type damage aggregation).

pub mod activation;
pub mod consumption;
pub mod damage_types;
pub mod dice;
pub mod error;
pub mod formula;
pub mod rolls;

pub use activation::{
    load_activation, run_activation, run_activation_with, ActivationConfig, ActivationResult,
    ChallengeOutcome, ChallengeSpec, DamageOutcome, DamageSpec,
};
pub use consumption::{
    kind, BatchSink, ConsumptionResolver, ConsumptionStrategy, ConsumptionTarget, ItemUpdate,
    Pool, PoolSnapshot, ResolutionContext, UpdateBatch, Uses,
};
pub use damage_types::DamageType;
pub use dice::Dice;
pub use error::{ConsumptionError, FormulaError, ResolveError, ShortfallCause};
pub use formula::{DiceEvaluator, EvaluatedTerms, FormulaEvaluator, RollData, Term};
pub use rolls::{
    aggregate, AggregatedDamage, BasicRoll, ChallengeOptions, ChallengeRoll, DamageRoll,
    DamageRollOptions, RollMode, CHALLENGE_DIE_FACES,
};
