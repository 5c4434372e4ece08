//! Roll construction and evaluation, layered by composition: plain formula
//! rolls, d20-style challenge rolls, and damage rolls with critical
//! doubling, plus per-type damage aggregation.

pub mod aggregate;
pub mod basic;
pub mod challenge;
pub mod damage;

pub use aggregate::{aggregate, AggregatedDamage};
pub use basic::BasicRoll;
pub use challenge::{ChallengeOptions, ChallengeRoll, RollMode, CHALLENGE_DIE_FACES};
pub use damage::{DamageRoll, DamageRollOptions};
