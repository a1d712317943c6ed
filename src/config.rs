use crate::error::{MealForgeError, MfResult};
use crate::ga::config::GaConfig;
use crate::template::GenerationTemplate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use strum_macros::{Display, EnumString};
use tracing::info;

/// The resolved planner configuration. Pools and generation templates stay
/// as raw JSON until they are resolved and validated, so data-quality
/// problems surface as warnings or template errors rather than as a parse
/// failure of the whole document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub component_pools: Map<String, Value>,
    pub meal_generation: Map<String, Value>,
    pub meal_templates: BTreeMap<String, BTreeMap<String, MealTemplate>>,
    pub meal_filters: BTreeMap<String, MealFilterConfig>,
    pub genetic: GaConfig,
    pub recommendation: RecommendationSettings,
}

impl PlannerConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> MfResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let cfg: PlannerConfig = serde_json::from_str(&content)?;
        info!(
            "Loaded config {} ({} pools, {} meal types)",
            path.display(),
            cfg.component_pools.len(),
            cfg.meal_generation.len()
        );
        Ok(cfg)
    }

    fn templates_for(&self, meal_type: &str) -> MfResult<(String, &Map<String, Value>)> {
        let key = if self.meal_generation.contains_key(meal_type) {
            meal_type.to_string()
        } else {
            meal_type.to_lowercase()
        };
        let value = self.meal_generation.get(&key).ok_or_else(|| {
            MealForgeError::NotFound(format!(
                "no generation templates for meal type '{}' (available: {})",
                meal_type,
                self.meal_generation
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })?;
        let templates = value.as_object().ok_or_else(|| {
            MealForgeError::Template(format!("templates for '{}' must be an object", key))
        })?;
        Ok((key, templates))
    }

    /// Looks up and validates a generation template. With no name, the first
    /// template declared for the meal type is used.
    pub fn generation_template(
        &self,
        meal_type: &str,
        template_name: Option<&str>,
    ) -> MfResult<GenerationTemplate> {
        let (meal_key, templates) = self.templates_for(meal_type)?;
        let (name, raw) = match template_name {
            Some(name) => {
                let raw = templates.get(name).ok_or_else(|| {
                    MealForgeError::NotFound(format!(
                        "template '{}' not found for '{}' (available: {})",
                        name,
                        meal_key,
                        templates.keys().cloned().collect::<Vec<_>>().join(", ")
                    ))
                })?;
                (name.to_string(), raw)
            }
            None => {
                let (name, raw) = templates.iter().next().ok_or_else(|| {
                    MealForgeError::NotFound(format!("no templates available for '{}'", meal_key))
                })?;
                info!("Using default template '{}' for '{}'", name, meal_key);
                (name.clone(), raw)
            }
        };
        GenerationTemplate::from_value(&meal_key, &name, raw)
    }

    /// Resolves `meal_templates.<meal_type>.<name>`.
    pub fn resolve_targets(&self, targets_ref: &str) -> MfResult<&MealTemplate> {
        let parts: Vec<&str> = targets_ref.split('.').collect();
        if parts.len() < 3 || parts[0] != "meal_templates" {
            return Err(MealForgeError::Config(format!(
                "invalid targets_ref '{}', expected 'meal_templates.<meal_type>.<template_name>'",
                targets_ref
            )));
        }
        self.meal_templates
            .get(parts[1])
            .and_then(|m| m.get(parts[2]))
            .ok_or_else(|| {
                MealForgeError::NotFound(format!("meal template at '{}'", targets_ref))
            })
    }

    pub fn filters_for(&self, meal_type: &str) -> Option<&MealFilterConfig> {
        self.meal_filters
            .get(meal_type)
            .or_else(|| self.meal_filters.get(&meal_type.to_lowercase()))
    }
}

/// Nutrient target ranges for one meal template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MealTemplate {
    pub description: Option<String>,
    pub targets: BTreeMap<String, TargetRange>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub midpoint: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Enforcement {
    Hard,
    Soft,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcementPolicy {
    pub min_enforcement: Option<Enforcement>,
    pub max_enforcement: Option<Enforcement>,
    pub tolerance: f64,
}

impl Default for EnforcementPolicy {
    fn default() -> Self {
        Self {
            min_enforcement: None,
            max_enforcement: None,
            tolerance: 1.0,
        }
    }
}

/// A set of codes given as one code, a list, or `pool:<name>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CodeSpec {
    One(String),
    Many(Vec<String>),
}

impl Default for CodeSpec {
    fn default() -> Self {
        CodeSpec::Many(Vec::new())
    }
}

fn default_true() -> bool {
    true
}

fn default_policy() -> String {
    "max_one_group".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutualExclusionRule {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_policy")]
    pub policy: String,
    #[serde(default)]
    pub groups: Vec<CodeSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(default)]
    pub from: CodeSpec,
    #[serde(default = "default_min_required")]
    pub min: usize,
    #[serde(default)]
    pub max: Option<usize>,
}

fn default_min_required() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalRule {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub if_present: CodeSpec,
    pub then_require: Requirement,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LeftoverSettings {
    pub allow_under_use: bool,
}

/// Per-meal-type filter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MealFilterConfig {
    /// template name -> nutrient key -> enforcement
    pub nutrient_constraints: BTreeMap<String, BTreeMap<String, EnforcementPolicy>>,
    pub mutual_exclusions: Vec<MutualExclusionRule>,
    pub conditional_requirements: Vec<ConditionalRule>,
    pub leftover_match: LeftoverSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationSettings {
    pub collect_all_rejection_reasons: bool,
}
