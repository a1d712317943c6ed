use crate::codes::fmt_mult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GenerationMethod {
    Exhaustive,
    Genetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealItem {
    pub code: String,
    pub mult: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub template_name: String,
    pub targets_ref: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ViolationDirection {
    BelowMin,
    AboveMax,
}

/// A soft nutrient excursion that stayed inside its tolerance band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftViolation {
    pub nutrient: String,
    pub target: f64,
    pub value: f64,
    pub direction: ViolationDirection,
    /// Absolute distance past the target.
    pub magnitude: f64,
}

impl SoftViolation {
    /// Excursion as a fraction of the target.
    pub fn relative(&self) -> f64 {
        if self.target.abs() > f64::EPSILON {
            self.magnitude / self.target.abs()
        } else {
            self.magnitude
        }
    }
}

/// A leftover used below its stored multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderUse {
    pub code: String,
    pub used: f64,
    pub available: f64,
}

impl UnderUse {
    pub fn waste_fraction(&self) -> f64 {
        if self.available > 0.0 {
            ((self.available - self.used) / self.available).max(0.0)
        } else {
            0.0
        }
    }

    pub fn warning(&self) -> String {
        format!(
            "{}: uses {}x of {}x ({:.1}% waste)",
            self.code,
            fmt_mult(self.used),
            fmt_mult(self.available),
            self.waste_fraction() * 100.0
        )
    }
}

/// A generated meal travelling through the filter pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub meal_type: String,
    pub items: Vec<MealItem>,
    pub generation_method: GenerationMethod,
    pub template_info: TemplateInfo,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub component_summary: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    rejection_reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub soft_nutrient_violations: Vec<SoftViolation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub leftover_under_use: Vec<UnderUse>,
}

impl Candidate {
    pub fn new(
        meal_type: &str,
        items: Vec<MealItem>,
        generation_method: GenerationMethod,
        template_info: TemplateInfo,
    ) -> Self {
        Self {
            meal_type: meal_type.to_string(),
            items,
            generation_method,
            template_info,
            component_summary: BTreeMap::new(),
            rejection_reasons: Vec::new(),
            soft_nutrient_violations: Vec::new(),
            leftover_under_use: Vec::new(),
        }
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|i| i.code.as_str())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.items.iter().any(|i| i.code == code)
    }

    /// Items as `(code, multiplier)` pairs, the shape nutrient totals take.
    pub fn item_pairs(&self) -> impl Iterator<Item = (&str, f64)> {
        self.items.iter().map(|i| (i.code.as_str(), i.mult))
    }

    /// Appends a reason. Reasons are never removed.
    pub fn reject(&mut self, reason: impl Into<String>) {
        self.rejection_reasons.push(reason.into());
    }

    pub fn rejection_reasons(&self) -> &[String] {
        &self.rejection_reasons
    }

    pub fn is_clean(&self) -> bool {
        self.rejection_reasons.is_empty()
    }

    /// `CODE x1.5, CODE2` style one-liner.
    pub fn describe(&self) -> String {
        self.items
            .iter()
            .map(|i| {
                if (i.mult - 1.0).abs() < f64::EPSILON {
                    i.code.clone()
                } else {
                    format!("{} x{}", i.code, fmt_mult(i.mult))
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_under_use_warning_text() {
        let u = UnderUse {
            code: "B.1".into(),
            used: 0.5,
            available: 1.0,
        };
        assert_eq!(u.warning(), "B.1: uses 0.5x of 1x (50.0% waste)");
    }

    #[test]
    fn test_reasons_only_grow() {
        let mut c = Candidate::new(
            "lunch",
            vec![MealItem { code: "A.1".into(), mult: 1.5 }],
            GenerationMethod::Exhaustive,
            TemplateInfo { template_name: "t".into(), targets_ref: None },
        );
        assert!(c.is_clean());
        c.reject("x");
        c.reject("y");
        assert_eq!(c.rejection_reasons(), &["x".to_string(), "y".to_string()]);
        assert_eq!(c.describe(), "A.1 x1.5");
    }
}
