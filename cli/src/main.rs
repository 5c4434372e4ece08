use clap::{Parser, Subcommand, ValueEnum};
use engine::{
    load_activation, run_activation, BasicRoll, ChallengeOptions, ChallengeRoll, DamageRoll,
    DamageRollOptions, DamageType, Dice, RollData,
};
use std::path::PathBuf;

#[derive(Copy, Clone, ValueEnum)]
enum Adv {
    Normal,
    Advantage,
    Disadvantage,
}

#[derive(Subcommand)]
enum Cmd {
    /// Evaluate a dice formula (e.g. "2d6kh1 + @mod")
    Roll {
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Formula to evaluate
        formula: String,
        /// Roll data reference, key=value (repeatable)
        #[arg(long = "data", value_parser = parse_data)]
        data: Vec<(String, i32)>,
    },
    /// Roll a d20 challenge with a bonus formula against a DC
    Check {
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Advantage mode
        #[arg(long, value_enum, default_value_t = Adv::Normal)]
        adv: Adv,
        /// Difficulty Class to meet or beat
        #[arg(long)]
        dc: Option<i32>,
        /// Bonus formula added to the kept die
        #[arg(long, default_value = "")]
        bonus: String,
        /// Floor applied to the kept die
        #[arg(long)]
        minimum: Option<i32>,
        /// Roll data reference, key=value (repeatable)
        #[arg(long = "data", value_parser = parse_data)]
        data: Vec<(String, i32)>,
    },
    /// Roll a damage formula, optionally as a critical hit
    Damage {
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Damage formula (flavors resolve per-part types)
        formula: String,
        /// Declared damage type
        #[arg(long = "type", default_value = "bludgeoning")]
        damage_type: DamageType,
        /// Treat as a critical hit
        #[arg(long, default_value_t = false)]
        crit: bool,
        /// Critical multiplier
        #[arg(long, default_value_t = 2)]
        multiplier: i32,
        /// Extra dice added to the first die on a crit
        #[arg(long, default_value_t = 0)]
        bonus_dice: i32,
        /// Roll data reference, key=value (repeatable)
        #[arg(long = "data", value_parser = parse_data)]
        data: Vec<(String, i32)>,
    },
    /// Run an activation config file (JSON or YAML) end to end
    Activate {
        /// Path to the activation config
        file: PathBuf,
        /// Emit the full result as JSON instead of the log
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Parser)]
#[command(name = "rules-cli")]
#[command(about = "Rules engine CLI harness")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

fn parse_data(s: &str) -> Result<(String, i32), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    let value: i32 = value
        .parse()
        .map_err(|_| format!("'{value}' is not an integer"))?;
    Ok((key.to_string(), value))
}

fn to_roll_data(pairs: Vec<(String, i32)>) -> RollData {
    pairs.into_iter().collect()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Roll {
            seed,
            formula,
            data,
        } => {
            let data = to_roll_data(data);
            let mut roll = BasicRoll::new(&formula, &data)?;
            let total = roll.evaluate(&mut Dice::from_seed(seed))?;
            println!("{} = {}", roll.formula(), total);
        }
        Cmd::Check {
            seed,
            adv,
            dc,
            bonus,
            minimum,
            data,
        } => {
            let data = to_roll_data(data);
            let options = ChallengeOptions {
                advantage: matches!(adv, Adv::Advantage),
                disadvantage: matches!(adv, Adv::Disadvantage),
                minimum,
                target: dc,
                ..ChallengeOptions::default()
            };
            let mut roll = ChallengeRoll::new(&bonus, &data, options)?;
            let total = roll.evaluate(&mut Dice::from_seed(seed))?;
            let verdict = if roll.is_critical_success() {
                "CRIT"
            } else if roll.is_success() {
                "SUCCESS"
            } else if roll.is_failure() {
                "FAIL"
            } else {
                "ROLLED"
            };
            println!(
                "d20s={:?} kept={} total={} => {}",
                roll.raw_rolls(),
                roll.kept().unwrap_or(0),
                total,
                verdict
            );
        }
        Cmd::Damage {
            seed,
            formula,
            damage_type,
            crit,
            multiplier,
            bonus_dice,
            data,
        } => {
            let data = to_roll_data(data);
            let options = DamageRollOptions {
                is_critical: crit,
                multiplier,
                bonus_dice,
                ..DamageRollOptions::default()
            };
            let mut roll = DamageRoll::new(&formula, &data, damage_type, false, options)?;
            let total = roll.evaluate(&mut Dice::from_seed(seed))?;
            println!("{} = {} [{}]", roll.formula(), total, damage_type);
        }
        Cmd::Activate { file, json } => {
            let cfg = load_activation(&file)?;
            let result = run_activation(&cfg)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                for line in &result.log {
                    println!("{line}");
                }
            }
        }
    }
    Ok(())
}
