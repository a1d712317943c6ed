mod common;

use mealforge::config::PlannerConfig;
use mealforge::error::MealForgeError;
use mealforge::ga::{GaConfig, MealSlot};
use rstest::rstest;
use serde_json::json;

#[test]
fn test_genetic_block_parses_with_defaults() {
    let cfg = common::config();
    let ga = &cfg.genetic;
    assert_eq!(ga.population_size, 8);
    assert_eq!(ga.min_genome_size, 2);
    assert_eq!(ga.max_genome_size, 3);
    assert_eq!(ga.weight("protein"), 2.0);
    assert_eq!(ga.weight("sugar"), 1.0);
    // Unset fields keep their defaults.
    assert_eq!(ga.crossover_rate, 0.7);
    assert_eq!(ga.selection_pressure, 1.5);
    assert_eq!(ga.max_breeding_retries, 10);
    assert!(ga.validate().is_ok());
}

#[test]
fn test_missing_genetic_block_uses_defaults() {
    let cfg: PlannerConfig = serde_json::from_value(json!({})).unwrap();
    assert_eq!(cfg.genetic, GaConfig::default());
    // No meal slots configured.
    assert!(cfg.genetic.validate().is_err());
}

#[rstest]
#[case(json!({"population_size": 1}), "population_size must be >= 2")]
#[case(json!({"epochs_per_run": 0}), "epochs_per_run must be >= 1")]
#[case(json!({"crossover_rate": 1.5}), "crossover_rate must be 0.0-1.0")]
#[case(json!({"crossover_rate": 0.2}), "operator rates should sum to ~1.0")]
#[case(json!({"min_genome_size": 1}), "min_genome_size must be >= 2")]
#[case(json!({"min_genome_size": 5, "max_genome_size": 4}), "max_genome_size (4) must be >= min_genome_size (5)")]
#[case(json!({"immigrant_tenure_epochs": 0}), "immigrant_tenure_epochs must be >= 1")]
#[case(json!({"selection_pressure": 0.5}), "selection_pressure must be >= 1.0")]
#[case(json!({"scoring_weights": {"umami": 1.0}}), "unknown nutrient 'umami'")]
#[case(json!({"meal_slots": [{"meal_type": "lunch"}]}), "meal_slots[0]: missing 'template_name'")]
fn test_validation_messages(#[case] overrides: serde_json::Value, #[case] expected: &str) {
    let mut raw = common::config_value();
    for (k, v) in overrides.as_object().unwrap() {
        raw["genetic"][k] = v.clone();
    }
    let cfg: PlannerConfig = serde_json::from_value(raw).unwrap();
    let err = cfg.genetic.validate().unwrap_err();
    assert!(matches!(err, MealForgeError::Config(_)));
    let msg = err.to_string();
    assert!(msg.contains("GA config validation failed:"), "{}", msg);
    assert!(msg.contains(expected), "expected '{}' in: {}", expected, msg);
}

#[test]
fn test_rates_within_tolerance_pass() {
    let ga = GaConfig {
        crossover_rate: 0.7,
        mutation_rate: 0.2,
        random_rate: 0.14,
        meal_slots: vec![MealSlot {
            meal_type: "lunch".into(),
            template_name: "basic".into(),
        }],
        ..GaConfig::default()
    };
    assert!(ga.validate().is_ok());
}

#[test]
fn test_slot_pool_is_sorted_union() {
    let foods = common::foods();
    let cfg = common::config();
    let pools = common::pools(&cfg, &foods);
    let slot = &cfg.genetic.meal_slots[0];
    let pool = cfg.genetic.resolve_slot_pool(slot, &cfg, &pools).unwrap();
    assert_eq!(pool, vec!["P.1", "P.2", "P.3", "V.1", "V.2", "V.3", "V.4"]);

    let missing = MealSlot {
        meal_type: "lunch".into(),
        template_name: "nope".into(),
    };
    assert!(cfg.genetic.resolve_slot_pool(&missing, &cfg, &pools).is_err());
}

#[test]
fn test_immigrant_sizing() {
    let ga = common::config().genetic;
    // floor(8 * 0.25) per epoch, two epochs of tenure
    assert_eq!(ga.immigrants_per_epoch(), 2);
    assert_eq!(ga.max_immigrant_pool(), 4);
}
