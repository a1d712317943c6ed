use super::FilterStage;
use crate::candidate::{Candidate, SoftViolation, ViolationDirection};
use crate::config::{Enforcement, EnforcementPolicy, PlannerConfig, TargetRange};
use crate::error::{MealForgeError, MfResult};
use crate::food::{sum_nutrients, FoodResolver, Nutrient, NutrientVector};
use crate::template::GenerationTemplate;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Target bounds joined with their enforcement policy.
#[derive(Debug, Clone, PartialEq)]
pub struct NutrientConstraint {
    pub key: String,
    pub nutrient: Nutrient,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_enforcement: Option<Enforcement>,
    pub max_enforcement: Option<Enforcement>,
    pub tolerance: f64,
}

impl NutrientConstraint {
    fn soft_min(&self) -> Option<f64> {
        match (self.min, self.min_enforcement) {
            (Some(min), Some(Enforcement::Soft)) => Some(min),
            _ => None,
        }
    }

    fn soft_max(&self) -> Option<f64> {
        match (self.max, self.max_enforcement) {
            (Some(max), Some(Enforcement::Soft)) => Some(max),
            _ => None,
        }
    }

    /// Rejecting violations for `value`, formatted `key<bound(kind)`.
    pub fn violations(&self, value: f64) -> Vec<String> {
        let mut out = Vec::new();
        if let (Some(min), Some(Enforcement::Hard)) = (self.min, self.min_enforcement) {
            if value < min {
                out.push(format!("{}<{:.1}(hard)", self.key, min));
            }
        }
        if let (Some(max), Some(Enforcement::Hard)) = (self.max, self.max_enforcement) {
            if value > max {
                out.push(format!("{}>{:.1}(hard)", self.key, max));
            }
        }
        if let Some(min) = self.soft_min() {
            let limit = min / self.tolerance;
            if value < limit {
                out.push(format!("{}<{:.1}(soft_limit)", self.key, limit));
            }
        }
        if let Some(max) = self.soft_max() {
            let limit = max * self.tolerance;
            if value > limit {
                out.push(format!("{}>{:.1}(soft_limit)", self.key, limit));
            }
        }
        out
    }

    /// Soft excursions that stay inside the tolerance band.
    pub fn soft_violations(&self, value: f64) -> Vec<SoftViolation> {
        let mut out = Vec::new();
        if let Some(min) = self.soft_min() {
            if value < min && value >= min / self.tolerance {
                out.push(SoftViolation {
                    nutrient: self.key.clone(),
                    target: min,
                    value,
                    direction: ViolationDirection::BelowMin,
                    magnitude: min - value,
                });
            }
        }
        if let Some(max) = self.soft_max() {
            if value > max && value <= max * self.tolerance {
                out.push(SoftViolation {
                    nutrient: self.key.clone(),
                    target: max,
                    value,
                    direction: ViolationDirection::AboveMax,
                    magnitude: value - max,
                });
            }
        }
        out
    }
}

/// Checks candidate nutrient totals against the template's target ranges.
pub struct NutrientConstraintFilter<'a> {
    constraints: Vec<NutrientConstraint>,
    foods: &'a dyn FoodResolver,
}

impl<'a> NutrientConstraintFilter<'a> {
    pub fn new(constraints: Vec<NutrientConstraint>, foods: &'a dyn FoodResolver) -> Self {
        Self { constraints, foods }
    }

    /// Joins `meal_filters.<meal>.nutrient_constraints.<template>` with the
    /// ranges behind the template's `targets_ref`. `Ok(None)` when the
    /// template has no constraints configured.
    pub fn from_config(
        config: &PlannerConfig,
        template: &GenerationTemplate,
        foods: &'a dyn FoodResolver,
    ) -> MfResult<Option<Self>> {
        let policies = match config
            .filters_for(&template.meal_type)
            .and_then(|f| f.nutrient_constraints.get(&template.name))
        {
            Some(p) if !p.is_empty() => p,
            _ => return Ok(None),
        };
        let targets_ref = template.targets_ref.as_deref().ok_or_else(|| {
            MealForgeError::Config(format!(
                "template '{}/{}' has nutrient constraints but no targets_ref",
                template.meal_type, template.name
            ))
        })?;
        let targets = &config.resolve_targets(targets_ref)?.targets;
        let constraints = resolve_constraints(policies, targets);
        Ok(Some(Self::new(constraints, foods)))
    }

    pub fn constraints(&self) -> &[NutrientConstraint] {
        &self.constraints
    }

    pub fn totals(&self, candidate: &Candidate) -> NutrientVector {
        sum_nutrients(candidate.item_pairs(), self.foods)
    }
}

fn resolve_constraints(
    policies: &BTreeMap<String, EnforcementPolicy>,
    targets: &BTreeMap<String, TargetRange>,
) -> Vec<NutrientConstraint> {
    let mut out = Vec::new();
    for (key, policy) in policies {
        let Some(nutrient) = Nutrient::from_key(key) else {
            warn!("Unknown nutrient '{}' in nutrient constraints, skipping", key);
            continue;
        };
        let Some(range) = targets.get(key) else {
            debug!("No target range for '{}', constraint skipped", key);
            continue;
        };
        let tolerance = if policy.tolerance > 0.0 {
            policy.tolerance
        } else {
            warn!("Non-positive tolerance for '{}', using 1.0", key);
            1.0
        };
        out.push(NutrientConstraint {
            key: key.clone(),
            nutrient,
            min: range.min,
            max: range.max,
            min_enforcement: policy.min_enforcement,
            max_enforcement: policy.max_enforcement,
            tolerance,
        });
    }
    out
}

impl FilterStage for NutrientConstraintFilter<'_> {
    fn name(&self) -> &'static str {
        "nutrient_constraint"
    }

    fn evaluate(&self, candidate: &mut Candidate) -> usize {
        let totals = self.totals(candidate);
        let violations: Vec<String> = self
            .constraints
            .iter()
            .flat_map(|c| c.violations(totals.get(c.nutrient)))
            .collect();

        if violations.is_empty() {
            let soft: Vec<SoftViolation> = self
                .constraints
                .iter()
                .flat_map(|c| c.soft_violations(totals.get(c.nutrient)))
                .collect();
            candidate.soft_nutrient_violations.extend(soft);
            return 0;
        }

        let n = violations.len();
        for v in violations {
            candidate.reject(format!("nutrient:{}", v));
        }
        n
    }
}
