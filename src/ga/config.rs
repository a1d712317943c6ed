use crate::config::PlannerConfig;
use crate::error::{aggregate, MealForgeError, MfResult};
use crate::food::Nutrient;
use crate::pools::ResolvedPools;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::warn;

/// Allowed drift of the three operator rates from 1.0.
pub const RATE_SUM_TOLERANCE: f64 = 0.05;

/// One genome per meal slot; each slot names a generation template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MealSlot {
    pub meal_type: String,
    pub template_name: String,
}

/// The `genetic` block of the planner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaConfig {
    // Population
    pub population_size: usize,
    pub epochs_per_run: usize,
    pub new_members_per_epoch: usize,

    // Operator rates, should sum to ~1.0
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub random_rate: f64,

    pub min_genome_size: usize,
    pub max_genome_size: usize,

    pub immigrant_pool_ratio: f64,
    pub immigrant_tenure_epochs: usize,

    pub meal_slots: Vec<MealSlot>,

    pub selection_pressure: f64,
    /// nutrient key -> weight, 1.0 when absent
    pub scoring_weights: BTreeMap<String, f64>,

    pub max_breeding_retries: usize,
    pub history_capacity: usize,
    pub convergence_patience: usize,
    pub convergence_turnover_threshold: f64,
    pub under_use_penalty_weight: f64,
    /// Subtracted once per hard rejection reason.
    pub rejection_penalty: f64,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            epochs_per_run: 50,
            new_members_per_epoch: 30,
            crossover_rate: 0.7,
            mutation_rate: 0.2,
            random_rate: 0.1,
            min_genome_size: 3,
            max_genome_size: 8,
            immigrant_pool_ratio: 0.10,
            immigrant_tenure_epochs: 5,
            meal_slots: Vec::new(),
            selection_pressure: 1.5,
            scoring_weights: BTreeMap::new(),
            max_breeding_retries: 10,
            history_capacity: 1000,
            convergence_patience: 5,
            convergence_turnover_threshold: 0.0,
            under_use_penalty_weight: 1.0,
            rejection_penalty: 10.0,
        }
    }
}

fn check_rate(problems: &mut Vec<String>, name: &str, rate: f64) {
    if !(0.0..=1.0).contains(&rate) {
        problems.push(format!("{} must be 0.0-1.0, got {}", name, rate));
    }
}

impl GaConfig {
    pub fn operator_rate_sum(&self) -> f64 {
        self.crossover_rate + self.mutation_rate + self.random_rate
    }

    /// Random immigrants generated each epoch.
    pub fn immigrants_per_epoch(&self) -> usize {
        ((self.population_size as f64 * self.immigrant_pool_ratio).floor() as usize).max(1)
    }

    /// Upper bound on the immigrant tier size.
    pub fn max_immigrant_pool(&self) -> usize {
        self.immigrants_per_epoch() * self.immigrant_tenure_epochs
    }

    pub fn weight(&self, nutrient_key: &str) -> f64 {
        self.scoring_weights.get(nutrient_key).copied().unwrap_or(1.0)
    }

    /// Checks every parameter and reports all problems at once.
    pub fn validate(&self) -> MfResult<()> {
        let mut problems = Vec::new();

        if self.population_size < 2 {
            problems.push(format!(
                "population_size must be >= 2, got {}",
                self.population_size
            ));
        }
        if self.epochs_per_run < 1 {
            problems.push(format!(
                "epochs_per_run must be >= 1, got {}",
                self.epochs_per_run
            ));
        }
        if self.new_members_per_epoch < 1 {
            problems.push(format!(
                "new_members_per_epoch must be >= 1, got {}",
                self.new_members_per_epoch
            ));
        }

        check_rate(&mut problems, "crossover_rate", self.crossover_rate);
        check_rate(&mut problems, "mutation_rate", self.mutation_rate);
        check_rate(&mut problems, "random_rate", self.random_rate);
        let sum = self.operator_rate_sum();
        if (sum - 1.0).abs() > RATE_SUM_TOLERANCE {
            problems.push(format!(
                "operator rates should sum to ~1.0 (crossover={} + mutation={} + random={} = {:.2})",
                self.crossover_rate, self.mutation_rate, self.random_rate, sum
            ));
        }

        if self.min_genome_size < 2 {
            problems.push(format!(
                "min_genome_size must be >= 2 (crossover needs at least 2 genes), got {}",
                self.min_genome_size
            ));
        }
        if self.max_genome_size < self.min_genome_size {
            problems.push(format!(
                "max_genome_size ({}) must be >= min_genome_size ({})",
                self.max_genome_size, self.min_genome_size
            ));
        }

        if !(self.immigrant_pool_ratio >= 0.0) {
            problems.push(format!(
                "immigrant_pool_ratio must be >= 0.0, got {}",
                self.immigrant_pool_ratio
            ));
        }
        if self.immigrant_tenure_epochs < 1 {
            problems.push(format!(
                "immigrant_tenure_epochs must be >= 1, got {}",
                self.immigrant_tenure_epochs
            ));
        }

        if self.meal_slots.is_empty() {
            problems.push("meal_slots must contain at least one meal slot".to_string());
        }
        for (i, slot) in self.meal_slots.iter().enumerate() {
            if slot.meal_type.trim().is_empty() {
                problems.push(format!("meal_slots[{}]: missing 'meal_type'", i));
            }
            if slot.template_name.trim().is_empty() {
                problems.push(format!(
                    "meal_slots[{}]: missing 'template_name' for '{}'",
                    i, slot.meal_type
                ));
            }
        }

        if !(self.selection_pressure >= 1.0) {
            problems.push(format!(
                "selection_pressure must be >= 1.0, got {}",
                self.selection_pressure
            ));
        }

        for (key, weight) in &self.scoring_weights {
            if Nutrient::from_key(key).is_none() {
                problems.push(format!("scoring_weights: unknown nutrient '{}'", key));
            }
            if !weight.is_finite() {
                problems.push(format!(
                    "scoring_weights['{}'] must be a finite number, got {}",
                    key, weight
                ));
            }
        }

        if self.history_capacity < 1 {
            problems.push("history_capacity must be >= 1".to_string());
        }
        if !(self.under_use_penalty_weight >= 0.0) {
            problems.push(format!(
                "under_use_penalty_weight must be >= 0.0, got {}",
                self.under_use_penalty_weight
            ));
        }
        if !(self.rejection_penalty >= 0.0) {
            problems.push(format!(
                "rejection_penalty must be >= 0.0, got {}",
                self.rejection_penalty
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(MealForgeError::Config(aggregate(
                "GA config validation failed:",
                &problems,
            )))
        }
    }

    /// Sorted union of every pool the slot's template draws from.
    pub fn resolve_slot_pool(
        &self,
        slot: &MealSlot,
        config: &PlannerConfig,
        pools: &ResolvedPools,
    ) -> MfResult<Vec<String>> {
        let template =
            config.generation_template(&slot.meal_type, Some(slot.template_name.as_str()))?;
        let mut codes = Vec::new();
        for component in &template.slots {
            match pools.get(&component.pool_ref) {
                Some(p) => codes.extend(p.iter().cloned()),
                None => warn!(
                    "Slot '{}' of {}/{} references unresolved pool '{}'",
                    component.name, slot.meal_type, slot.template_name, component.pool_ref
                ),
            }
        }
        Ok(codes.into_iter().sorted().dedup().collect())
    }

    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Population: {} members, {} epochs, {} new per epoch",
            self.population_size, self.epochs_per_run, self.new_members_per_epoch
        );
        let _ = writeln!(
            out,
            "Operators: crossover {:.0}%, mutation {:.0}%, random {:.0}%",
            self.crossover_rate * 100.0,
            self.mutation_rate * 100.0,
            self.random_rate * 100.0
        );
        let _ = writeln!(
            out,
            "Genome size: {}-{}",
            self.min_genome_size, self.max_genome_size
        );
        let _ = writeln!(
            out,
            "Immigrants: {} per epoch, tenure {} epochs (max pool {})",
            self.immigrants_per_epoch(),
            self.immigrant_tenure_epochs,
            self.max_immigrant_pool()
        );
        let _ = writeln!(out, "Selection pressure: {}", self.selection_pressure);
        let slots = self
            .meal_slots
            .iter()
            .map(|s| format!("{}/{}", s.meal_type, s.template_name))
            .join(", ");
        let _ = writeln!(out, "Meal slots: {}", slots);
        if !self.scoring_weights.is_empty() {
            let weights = self
                .scoring_weights
                .iter()
                .map(|(k, w)| format!("{}={}", k, w))
                .join(", ");
            let _ = writeln!(out, "Scoring weights: {}", weights);
        }
        out
    }
}
