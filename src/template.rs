use crate::error::{aggregate, MealForgeError, MfResult};
use serde_json::{Map, Value};

/// One component slot of a generation template.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSlot {
    pub name: String,
    pub pool_ref: String,
    pub min: usize,
    pub max: usize,
    pub required: bool,
    /// Multiplier given to every item drawn from this slot.
    pub multiplier: f64,
}

impl ComponentSlot {
    /// Smallest selection size enumerated for this slot.
    pub fn effective_min(&self) -> usize {
        if self.required {
            self.min.max(1)
        } else {
            self.min
        }
    }
}

/// A validated structural recipe for one meal type.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationTemplate {
    pub meal_type: String,
    pub name: String,
    pub description: Option<String>,
    pub targets_ref: Option<String>,
    pub slots: Vec<ComponentSlot>,
    pub max_total_components: Option<usize>,
    pub base_code_uniqueness: bool,
}

fn as_count(v: &Value) -> Option<usize> {
    v.as_u64().map(|n| n as usize)
}

impl GenerationTemplate {
    /// Validates a raw template. All problems are collected into a single
    /// `Template` error.
    pub fn from_value(meal_type: &str, name: &str, raw: &Value) -> MfResult<Self> {
        let mut problems = Vec::new();
        let obj = raw.as_object().ok_or_else(|| {
            MealForgeError::Template(format!("template '{}/{}' must be an object", meal_type, name))
        })?;

        let multipliers = match obj.get("default_multipliers") {
            None => Map::new(),
            Some(Value::Object(m)) => m.clone(),
            Some(_) => {
                problems.push("'default_multipliers' must be an object".to_string());
                Map::new()
            }
        };
        for (key, value) in &multipliers {
            if !value.as_f64().is_some_and(|m| m > 0.0) {
                problems.push(format!(
                    "default multiplier for '{}' must be a positive number, got {}",
                    key, value
                ));
            }
        }

        let mut slots = Vec::new();
        match obj.get("components") {
            None => problems.push("missing 'components' section".to_string()),
            Some(Value::Object(components)) => {
                if components.is_empty() {
                    problems.push("'components' cannot be empty".to_string());
                }
                for (slot_name, spec) in components {
                    if slot_name.starts_with('_') {
                        continue;
                    }
                    match Self::parse_slot(slot_name, spec, &multipliers) {
                        Ok(slot) => slots.push(slot),
                        Err(mut errs) => problems.append(&mut errs),
                    }
                }
            }
            Some(_) => problems.push("'components' must be an object".to_string()),
        }

        let mut max_total_components = None;
        let mut base_code_uniqueness = false;
        match obj.get("constraints") {
            None => {}
            Some(Value::Object(c)) => {
                if let Some(v) = c.get("max_total_components") {
                    match as_count(v) {
                        Some(n) if n > 0 => max_total_components = Some(n),
                        _ => problems.push("'max_total_components' must be a positive integer".to_string()),
                    }
                }
                if let Some(v) = c.get("base_code_uniqueness") {
                    match v.as_bool() {
                        Some(b) => base_code_uniqueness = b,
                        None => problems.push("'base_code_uniqueness' must be boolean".to_string()),
                    }
                }
            }
            Some(_) => problems.push("'constraints' must be an object".to_string()),
        }

        let targets_ref = match obj.get("targets_ref") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                problems.push("'targets_ref' must be a string".to_string());
                None
            }
        };

        if !problems.is_empty() {
            return Err(MealForgeError::Template(aggregate(
                &format!("template '{}/{}' is invalid:", meal_type, name),
                &problems,
            )));
        }

        Ok(Self {
            meal_type: meal_type.to_string(),
            name: name.to_string(),
            description: obj
                .get("description")
                .and_then(|d| d.as_str())
                .map(str::to_string),
            targets_ref,
            slots,
            max_total_components,
            base_code_uniqueness,
        })
    }

    fn parse_slot(
        slot_name: &str,
        spec: &Value,
        multipliers: &Map<String, Value>,
    ) -> Result<ComponentSlot, Vec<String>> {
        let mut errs = Vec::new();
        let spec = match spec.as_object() {
            Some(s) => s,
            None => return Err(vec![format!("component '{}' must be an object", slot_name)]),
        };

        let pool_ref = match spec.get("pool_ref").and_then(|p| p.as_str()) {
            Some(p) => p.to_string(),
            None => {
                errs.push(format!("component '{}' missing 'pool_ref'", slot_name));
                String::new()
            }
        };

        let (mut min, mut max) = (0, 0);
        match spec.get("count").and_then(|c| c.as_object()) {
            None => errs.push(format!(
                "component '{}' missing 'count' with 'min' and 'max'",
                slot_name
            )),
            Some(count) => {
                match count.get("min").and_then(as_count) {
                    Some(n) => min = n,
                    None => errs.push(format!(
                        "component '{}' 'count.min' must be a non-negative integer",
                        slot_name
                    )),
                }
                match count.get("max").and_then(as_count) {
                    Some(n) => max = n,
                    None => errs.push(format!(
                        "component '{}' 'count.max' must be a non-negative integer",
                        slot_name
                    )),
                }
                if errs.is_empty() && max < min {
                    errs.push(format!(
                        "component '{}' 'count.max' ({}) must be >= 'count.min' ({})",
                        slot_name, max, min
                    ));
                }
            }
        }

        let required = match spec.get("required") {
            None => false,
            Some(v) => v.as_bool().unwrap_or_else(|| {
                errs.push(format!("component '{}' 'required' must be boolean", slot_name));
                false
            }),
        };
        if required && errs.is_empty() && max == 0 {
            errs.push(format!(
                "component '{}' is required but 'count.max' is 0",
                slot_name
            ));
        }

        let multiplier = multipliers
            .get(slot_name)
            .or_else(|| multipliers.get(&pool_ref))
            .and_then(|m| m.as_f64())
            .unwrap_or(1.0);

        if !errs.is_empty() {
            return Err(errs);
        }
        Ok(ComponentSlot {
            name: slot_name.to_string(),
            pool_ref,
            min,
            max,
            required,
            multiplier,
        })
    }

    /// True when some combination could be rejected at yield time.
    pub fn has_yield_constraints(&self) -> bool {
        self.max_total_components.is_some() || self.base_code_uniqueness
    }
}
