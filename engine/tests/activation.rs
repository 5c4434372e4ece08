use engine::{load_activation, run_activation, run_activation_with, ActivationConfig};

fn config(json: &str) -> ActivationConfig {
    serde_json::from_str(json).unwrap()
}

#[test]
fn consumption_fills_the_batch_before_any_roll() {
    let cfg = config(
        r#"{
            "seed": 11,
            "pools": { "activity": { "max": 3 } },
            "consumption": [
                { "kind": "activity_uses", "value": "1" }
            ],
            "damage": [
                { "formula": "1d6", "damage_type": "fire" }
            ]
        }"#,
    );
    let result = run_activation(&cfg).unwrap();
    assert_eq!(result.batch.activity["uses.spent"], 1);
    assert_eq!(result.damage.len(), 1);
    assert!((1..=6).contains(&result.damage[0].total));
    assert!(result.log.iter().any(|l| l.starts_with("[CONSUME]")));
    assert!(result.log.iter().any(|l| l.starts_with("[DMG]")));
}

#[test]
fn consumption_failure_aborts_the_activation() {
    let cfg = config(
        r#"{
            "pools": { "activity": { "max": 1, "spent": 1 } },
            "consumption": [
                { "kind": "activity_uses", "value": "1" }
            ],
            "damage": [
                { "formula": "1d6", "damage_type": "fire" }
            ]
        }"#,
    );
    assert!(run_activation(&cfg).is_err());
}

#[test]
fn challenge_critical_promotes_damage_to_critical() {
    // A threshold of 1 makes any kept die a critical success.
    let cfg = config(
        r#"{
            "seed": 5,
            "challenge": { "critical_success": 1 },
            "damage": [
                { "formula": "2d6", "damage_type": "slashing" }
            ]
        }"#,
    );
    let result = run_activation(&cfg).unwrap();
    let challenge = result.challenge.unwrap();
    assert!(challenge.critical_success);
    assert!(result.damage[0].critical);
    assert!(result.damage[0].formula.starts_with("4d6"));
}

#[test]
fn challenge_bonus_and_target_decide_the_outcome() {
    let cfg = config(
        r#"{
            "seed": 5,
            "data": { "prof": 2 },
            "challenge": { "bonus": "@prof + 1", "target": 2 }
        }"#,
    );
    let result = run_activation(&cfg).unwrap();
    let challenge = result.challenge.unwrap();
    assert_eq!(challenge.total, challenge.kept + 3);
    // Kept is at least 1, so the total always meets a target of 2.
    assert!(challenge.success);
    assert!(!challenge.failure);
}

#[test]
fn the_configure_hook_can_grant_advantage() {
    let cfg = config(
        r#"{
            "seed": 9,
            "challenge": {}
        }"#,
    );
    let result = run_activation_with(&cfg, |options| {
        options.advantage = true;
    })
    .unwrap();
    let challenge = result.challenge.unwrap();
    assert_eq!(challenge.raw.len(), 2);
    assert_eq!(challenge.kept, *challenge.raw.iter().max().unwrap());
}

#[test]
fn aggregation_is_opt_in() {
    let cfg = config(
        r#"{
            "seed": 3,
            "aggregate": true,
            "damage": [
                { "formula": "1d6", "damage_type": "fire" },
                { "formula": "1d4", "damage_type": "fire" }
            ]
        }"#,
    );
    let result = run_activation(&cfg).unwrap();
    let aggregated = result.aggregated.unwrap();
    assert_eq!(aggregated.len(), 1);
    let input_total: i32 = result.damage.iter().map(|d| d.total).sum();
    assert_eq!(aggregated[0].total, input_total);
}

#[test]
fn same_seed_same_outcome() {
    let cfg = config(
        r#"{
            "seed": 21,
            "challenge": {},
            "damage": [
                { "formula": "2d8 + 1", "damage_type": "cold" }
            ]
        }"#,
    );
    let first = run_activation(&cfg).unwrap();
    let second = run_activation(&cfg).unwrap();
    assert_eq!(first.challenge.unwrap().total, second.challenge.unwrap().total);
    assert_eq!(first.damage[0].total, second.damage[0].total);
}

#[test]
fn configs_load_from_json_and_yaml() {
    let dir = std::env::temp_dir();

    let json_path = dir.join("activation_test.json");
    std::fs::write(&json_path, r#"{ "seed": 4, "steps": 1 }"#).unwrap();
    let cfg = load_activation(&json_path).unwrap();
    assert_eq!(cfg.seed, 4);
    assert_eq!(cfg.steps, 1);

    let yaml_path = dir.join("activation_test.yaml");
    std::fs::write(
        &yaml_path,
        "seed: 4\ndamage:\n  - formula: 1d6\n    damage_type: fire\n",
    )
    .unwrap();
    let cfg = load_activation(&yaml_path).unwrap();
    assert_eq!(cfg.seed, 4);
    assert_eq!(cfg.damage.len(), 1);
}

#[test]
fn missing_config_file_is_an_error() {
    assert!(load_activation("/does/not/exist.json").is_err());
}
