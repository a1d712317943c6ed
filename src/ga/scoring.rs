use super::config::GaConfig;
use crate::candidate::Candidate;
use crate::config::{PlannerConfig, TargetRange};
use crate::error::{MealForgeError, MfResult};
use crate::food::{sum_nutrients, FoodResolver, Nutrient, NutrientVector};
use crate::template::GenerationTemplate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};
use tracing::{debug, warn};

/// Scores within this distance of a degenerate target count as a hit.
const DEGENERATE_EPSILON: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScoreShape {
    /// Two-sided range, best at the midpoint.
    Midpoint,
    /// Max only, best at zero.
    Headroom,
    /// Min only, flat at or above min.
    MinOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NutrientTarget {
    pub key: String,
    pub nutrient: Nutrient,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub midpoint: Option<f64>,
    pub weight: f64,
    pub shape: ScoreShape,
}

impl NutrientTarget {
    /// `None` when the range carries neither bound.
    pub fn from_range(key: &str, nutrient: Nutrient, range: &TargetRange, weight: f64) -> Option<Self> {
        let shape = match (range.min, range.max) {
            (Some(_), Some(_)) => ScoreShape::Midpoint,
            (None, Some(_)) => ScoreShape::Headroom,
            (Some(_), None) => ScoreShape::MinOnly,
            (None, None) => return None,
        };
        Some(Self {
            key: key.to_string(),
            nutrient,
            min: range.min,
            max: range.max,
            midpoint: range.midpoint,
            weight,
            shape,
        })
    }

    pub fn center(&self) -> f64 {
        if let Some(mid) = self.midpoint {
            return mid;
        }
        match (self.min, self.max) {
            (Some(lo), Some(hi)) => (lo + hi) / 2.0,
            (None, Some(hi)) => hi / 2.0,
            (Some(lo), None) => lo,
            (None, None) => 0.0,
        }
    }

    /// Unweighted score. Unbounded below.
    pub fn raw_score(&self, value: f64) -> f64 {
        match self.shape {
            ScoreShape::Midpoint => {
                let (lo, hi) = (self.min.unwrap_or(0.0), self.max.unwrap_or(0.0));
                let half = (hi - lo) / 2.0;
                let mid = self.center();
                if half <= 0.0 {
                    return if (value - mid).abs() < DEGENERATE_EPSILON {
                        1.0
                    } else {
                        0.0
                    };
                }
                1.0 - (value - mid).abs() / half
            }
            ScoreShape::Headroom => match self.max {
                Some(max) if max > 0.0 => 1.0 - value / max,
                _ => 0.0,
            },
            ScoreShape::MinOnly => match self.min {
                Some(min) if min > 0.0 => {
                    if value >= min {
                        1.0
                    } else {
                        1.0 - (min - value) / min
                    }
                }
                Some(min) => {
                    if value >= min {
                        1.0
                    } else {
                        0.0
                    }
                }
                None => 0.0,
            },
        }
    }
}

impl fmt::Display for NutrientTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.nutrient.unit();
        match self.shape {
            ScoreShape::Headroom => write!(
                f,
                "{}: headroom, max={}{}, weight={}",
                self.key,
                self.max.unwrap_or(0.0),
                unit,
                self.weight
            ),
            _ => write!(
                f,
                "{}: {}, range={}-{}{}, mid={:.1}, weight={}",
                self.key,
                self.shape,
                self.min.map_or("?".to_string(), |v| v.to_string()),
                self.max.map_or("?".to_string(), |v| v.to_string()),
                unit,
                self.center(),
                self.weight
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientScore {
    pub value: f64,
    pub raw: f64,
    pub weight: f64,
    pub weighted: f64,
    pub shape: ScoreShape,
}

/// Weighted nutrient scores plus named deductions. Higher is better.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitnessResult {
    pub aggregate: f64,
    pub nutrient_scores: BTreeMap<String, NutrientScore>,
    pub penalties: BTreeMap<String, f64>,
}

impl FitnessResult {
    pub fn penalty_total(&self) -> f64 {
        self.penalties.values().sum()
    }

    fn add_penalty(&mut self, name: &str, amount: f64) {
        if amount > 0.0 {
            *self.penalties.entry(name.to_string()).or_insert(0.0) += amount;
            self.aggregate -= amount;
        }
    }

    /// Folds in the result of meal slot `slot_index`. Its keys become
    /// `<slot_index>:<meal_type>.<key>`, so slots sharing a meal type stay
    /// apart.
    pub fn absorb(&mut self, slot_index: usize, meal_type: &str, other: FitnessResult) {
        let prefix = format!("{}:{}", slot_index, meal_type);
        self.aggregate += other.aggregate;
        for (k, v) in other.nutrient_scores {
            self.nutrient_scores.insert(format!("{}.{}", prefix, k), v);
        }
        for (k, v) in other.penalties {
            *self.penalties.entry(format!("{}.{}", prefix, k)).or_insert(0.0) += v;
        }
    }
}

/// Scores one meal slot against the target ranges its template points at.
#[derive(Debug, Clone)]
pub struct FitnessScorer {
    targets: Vec<NutrientTarget>,
    under_use_weight: f64,
    rejection_penalty: f64,
}

impl FitnessScorer {
    pub fn new(targets: Vec<NutrientTarget>, ga: &GaConfig) -> Self {
        Self {
            targets,
            under_use_weight: ga.under_use_penalty_weight,
            rejection_penalty: ga.rejection_penalty,
        }
    }

    pub fn from_template(
        config: &PlannerConfig,
        template: &GenerationTemplate,
        ga: &GaConfig,
    ) -> MfResult<Self> {
        let targets_ref = template.targets_ref.as_deref().ok_or_else(|| {
            MealForgeError::Config(format!(
                "template '{}/{}' has no targets_ref to score against",
                template.meal_type, template.name
            ))
        })?;
        let meal_template = config.resolve_targets(targets_ref)?;
        let mut targets = Vec::new();
        for (key, range) in &meal_template.targets {
            let Some(nutrient) = Nutrient::from_key(key) else {
                warn!("Unknown nutrient '{}' in {}, not scored", key, targets_ref);
                continue;
            };
            match NutrientTarget::from_range(key, nutrient, range, ga.weight(key)) {
                Some(t) => targets.push(t),
                None => debug!("Target '{}' in {} has no bounds", key, targets_ref),
            }
        }
        if targets.is_empty() {
            return Err(MealForgeError::Config(format!(
                "no scorable nutrient targets at '{}'",
                targets_ref
            )));
        }
        Ok(Self::new(targets, ga))
    }

    pub fn targets(&self) -> &[NutrientTarget] {
        &self.targets
    }

    pub fn score_totals(&self, totals: &NutrientVector) -> FitnessResult {
        let mut result = FitnessResult::default();
        for target in &self.targets {
            let value = totals.get(target.nutrient);
            let raw = target.raw_score(value);
            let weighted = raw * target.weight;
            result.aggregate += weighted;
            result.nutrient_scores.insert(
                target.key.clone(),
                NutrientScore {
                    value,
                    raw,
                    weight: target.weight,
                    weighted,
                    shape: target.shape,
                },
            );
        }
        result
    }

    /// Nutrient scores of the candidate's totals, less its filter annotations:
    /// soft violations by relative magnitude, leftover under-use by waste
    /// fraction, and a flat amount per rejection reason.
    pub fn score_candidate<F: FoodResolver + ?Sized>(
        &self,
        candidate: &Candidate,
        foods: &F,
    ) -> FitnessResult {
        let totals = sum_nutrients(candidate.item_pairs(), foods);
        let mut result = self.score_totals(&totals);

        let soft: f64 = candidate
            .soft_nutrient_violations
            .iter()
            .map(|v| v.relative())
            .sum();
        result.add_penalty("soft_violation", soft);

        let waste: f64 = candidate
            .leftover_under_use
            .iter()
            .map(|u| u.waste_fraction())
            .sum();
        result.add_penalty("leftover_under_use", waste * self.under_use_weight);

        let rejected = candidate.rejection_reasons().len() as f64;
        result.add_penalty("rejection", rejected * self.rejection_penalty);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn target(min: Option<f64>, max: Option<f64>) -> NutrientTarget {
        NutrientTarget::from_range(
            "protein",
            Nutrient::Protein,
            &TargetRange {
                min,
                max,
                midpoint: None,
            },
            1.0,
        )
        .unwrap()
    }

    #[test]
    fn test_shape_follows_bounds() {
        assert_eq!(target(Some(1.0), Some(2.0)).shape, ScoreShape::Midpoint);
        assert_eq!(target(None, Some(2.0)).shape, ScoreShape::Headroom);
        assert_eq!(target(Some(1.0), None).shape, ScoreShape::MinOnly);
    }

    #[test]
    fn test_headroom() {
        let t = target(None, Some(20.0));
        assert!(close(t.raw_score(0.0), 1.0));
        assert!(close(t.raw_score(20.0), 0.0));
        assert!(t.raw_score(30.0) < 0.0);
    }

    #[test]
    fn test_min_only() {
        let t = target(Some(20.0), None);
        assert!(close(t.raw_score(25.0), 1.0));
        assert!(close(t.raw_score(10.0), 0.5));
    }

    #[test]
    fn test_degenerate_range() {
        let t = target(Some(10.0), Some(10.0));
        assert!(close(t.raw_score(10.0), 1.0));
        assert!(close(t.raw_score(10.5), 0.0));
    }
}
