use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::consumption::{ConsumptionResolver, ConsumptionTarget, PoolSnapshot, UpdateBatch};
use crate::damage_types::DamageType;
use crate::formula::{DiceEvaluator, RollData};
use crate::rolls::{
    aggregate, ChallengeOptions, ChallengeRoll, DamageRoll, DamageRollOptions,
};

/// One activation request: costs to pay and rolls to make, plus the pool
/// state to resolve against. Loadable from JSON or YAML.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ActivationConfig {
    #[serde(default)]
    pub seed: u64,
    /// Steps above baseline (e.g. up-casting a spell).
    #[serde(default)]
    pub steps: i32,
    #[serde(default)]
    pub data: RollData,
    #[serde(default)]
    pub consumption: Vec<ConsumptionTarget>,
    #[serde(default)]
    pub pools: PoolSnapshot,
    #[serde(default)]
    pub challenge: Option<ChallengeSpec>,
    #[serde(default)]
    pub damage: Vec<DamageSpec>,
    /// Merge damage rolls per type before display.
    #[serde(default)]
    pub aggregate: bool,
    #[serde(default)]
    pub aggregate_by_magical: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChallengeSpec {
    /// Modifier formula added to the challenge die; may be empty.
    #[serde(default)]
    pub bonus: String,
    #[serde(flatten)]
    pub options: ChallengeOptions,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DamageSpec {
    pub formula: String,
    pub damage_type: DamageType,
    #[serde(default)]
    pub magical: bool,
    #[serde(default)]
    pub options: DamageRollOptions,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ChallengeOutcome {
    pub raw: Vec<i32>,
    pub kept: i32,
    pub total: i32,
    pub critical_success: bool,
    pub critical_failure: bool,
    pub success: bool,
    pub failure: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DamageOutcome {
    pub formula: String,
    pub total: i32,
    pub damage_type: DamageType,
    pub magical: bool,
    pub critical: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AggregatedOutcome {
    pub damage_type: DamageType,
    pub magical: Option<bool>,
    pub formula: String,
    pub total: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ActivationResult {
    pub batch: UpdateBatch,
    pub challenge: Option<ChallengeOutcome>,
    pub damage: Vec<DamageOutcome>,
    pub aggregated: Option<Vec<AggregatedOutcome>>,
    pub log: Vec<String>,
}

pub fn load_activation(path: impl AsRef<Path>) -> Result<ActivationConfig> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read activation config: {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    if is_yaml {
        serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse activation YAML: {}", path.display()))
    } else {
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse activation JSON: {}", path.display()))
    }
}

/// Resolve consumption and make every configured roll.
///
/// Consumption failure aborts before any roll is made and nothing is
/// written anywhere; the returned batch is the host's to commit as one unit.
pub fn run_activation(cfg: &ActivationConfig) -> Result<ActivationResult> {
    run_activation_with(cfg, |_| {})
}

/// Like [`run_activation`], with a configuration hook between building the
/// challenge roll and evaluating it (the dialog injection point: situational
/// advantage, bonuses, targets).
pub fn run_activation_with(
    cfg: &ActivationConfig,
    configure: impl FnOnce(&mut ChallengeOptions),
) -> Result<ActivationResult> {
    let mut log = Vec::new();
    let mut evaluator = DiceEvaluator::seeded(cfg.seed);

    let resolver = ConsumptionResolver::new();
    let batch = resolver.resolve(
        &cfg.consumption,
        cfg.steps,
        &cfg.pools,
        &mut evaluator,
        &cfg.data,
    )?;
    log_batch(&mut log, &batch);

    let challenge = match &cfg.challenge {
        Some(spec) => {
            let mut options = spec.options.clone();
            configure(&mut options);
            let mut roll = ChallengeRoll::new(&spec.bonus, &cfg.data, options)
                .context("bad challenge bonus formula")?;
            let total = roll.evaluate(evaluator.dice_mut())?;
            let kept = roll.kept().unwrap_or(0);
            let outcome = ChallengeOutcome {
                raw: roll.raw_rolls().to_vec(),
                kept,
                total,
                critical_success: roll.is_critical_success(),
                critical_failure: roll.is_critical_failure(),
                success: roll.is_success(),
                failure: roll.is_failure(),
            };
            log.push(format!(
                "[CHECK] d20s={:?} kept={} total={} → {}",
                outcome.raw,
                kept,
                total,
                if outcome.critical_success {
                    "CRIT"
                } else if outcome.success {
                    "SUCCESS"
                } else if outcome.failure {
                    "FAIL"
                } else {
                    "ROLLED"
                }
            ));
            Some(outcome)
        }
        None => None,
    };

    let critical_hit = challenge
        .as_ref()
        .map(|c| c.critical_success)
        .unwrap_or(false);

    let mut rolls = Vec::with_capacity(cfg.damage.len());
    let mut damage = Vec::with_capacity(cfg.damage.len());
    for spec in &cfg.damage {
        let mut options = spec.options.clone();
        options.is_critical = options.is_critical || critical_hit;
        let critical = options.is_critical;
        let mut roll = DamageRoll::new(
            &spec.formula,
            &cfg.data,
            spec.damage_type,
            spec.magical,
            options,
        )
        .with_context(|| format!("bad damage formula '{}'", spec.formula))?;
        let total = roll.evaluate(evaluator.dice_mut())?;
        log.push(format!(
            "[DMG] {}rolled {} = {} [{}]",
            if critical { "crit: " } else { "" },
            roll.formula(),
            total,
            spec.damage_type
        ));
        damage.push(DamageOutcome {
            formula: roll.formula(),
            total,
            damage_type: spec.damage_type,
            magical: spec.magical,
            critical,
        });
        rolls.push(roll);
    }

    let aggregated = cfg.aggregate.then(|| {
        aggregate(&rolls, cfg.aggregate_by_magical)
            .into_iter()
            .map(|merged| {
                log.push(format!(
                    "[DMG][{}] merged {} = {}",
                    merged.damage_type,
                    merged.formula(),
                    merged.total
                ));
                AggregatedOutcome {
                    damage_type: merged.damage_type,
                    magical: merged.magical,
                    formula: merged.formula(),
                    total: merged.total,
                }
            })
            .collect()
    });

    Ok(ActivationResult {
        batch,
        challenge,
        damage,
        aggregated,
        log,
    })
}

fn log_batch(log: &mut Vec<String>, batch: &UpdateBatch) {
    for (path, value) in &batch.activity {
        log.push(format!("[CONSUME][activity] {} = {}", path, value));
    }
    for item in &batch.items {
        for (path, value) in &item.fields {
            log.push(format!("[CONSUME][{}] {} = {}", item.id, path, value));
        }
    }
    for (path, value) in &batch.actor {
        log.push(format!("[CONSUME][actor] {} = {}", path, value));
    }
    for roll in &batch.rolls {
        log.push(format!("[COST] rolled {} = {}", roll.formula(), roll.total));
    }
}
