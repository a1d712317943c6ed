//! Session-side inputs owned by the caller's workspace: per-meal locks,
//! inventory, and availability preferences.

use crate::codes::normalize;
use crate::error::MfResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Workspace {
    /// meal type -> locks
    pub locks: BTreeMap<String, Locks>,
    pub inventory: Inventory,
    pub preferences: AvailabilityPrefs,
}

impl Workspace {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> MfResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn locks_for(&self, meal_type: &str) -> Option<&Locks> {
        self.locks
            .get(meal_type)
            .or_else(|| self.locks.get(&meal_type.to_lowercase()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Locks {
    /// code or prefix pattern -> multiplier
    pub include: BTreeMap<String, f64>,
    pub exclude: Vec<String>,
}

impl Locks {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

fn default_mult() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    #[serde(default = "default_mult")]
    pub multiplier: f64,
    #[serde(default)]
    pub reserved: bool,
    #[serde(default)]
    pub status: Option<String>,
}

impl InventoryItem {
    pub fn new(multiplier: f64) -> Self {
        Self {
            multiplier,
            reserved: false,
            status: None,
        }
    }

    pub fn is_depleted(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("depleted"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inventory {
    pub leftovers: BTreeMap<String, InventoryItem>,
    pub batch: BTreeMap<String, InventoryItem>,
    pub rotating: BTreeMap<String, InventoryItem>,
}

impl Inventory {
    /// Normalized codes of leftover and batch items flagged reserved.
    pub fn reserved_codes(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .leftovers
            .iter()
            .chain(self.batch.iter())
            .filter(|(_, item)| item.reserved)
            .map(|(code, _)| normalize(code))
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Normalized codes of rotating items marked depleted.
    pub fn depleted_codes(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .rotating
            .iter()
            .filter(|(_, item)| item.is_depleted())
            .map(|(code, _)| normalize(code))
            .collect();
        out.sort();
        out
    }

    /// Leftover multipliers keyed by normalized code.
    pub fn leftover_multipliers(&self) -> BTreeMap<String, f64> {
        self.leftovers
            .iter()
            .map(|(code, item)| (normalize(code), item.multiplier))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeList {
    pub patterns: Vec<String>,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilityPrefs {
    pub exclude_from_recommendations: ExcludeList,
}

impl AvailabilityPrefs {
    pub fn is_empty(&self) -> bool {
        let ex = &self.exclude_from_recommendations;
        ex.patterns.is_empty() && ex.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inventory_views() {
        let ws: Workspace = serde_json::from_value(json!({
            "inventory": {
                "leftovers": { "b.1": { "multiplier": 1.5, "reserved": true } },
                "batch": { "SO.3": { "multiplier": 2.0 } },
                "rotating": {
                    "GR.H1": { "status": "depleted" },
                    "GR.H2": { "status": "active" }
                }
            }
        }))
        .unwrap();
        assert_eq!(ws.inventory.reserved_codes(), vec!["B.1"]);
        assert_eq!(ws.inventory.depleted_codes(), vec!["GR.H1"]);
        assert_eq!(ws.inventory.leftover_multipliers()["B.1"], 1.5);
        assert_eq!(ws.inventory.rotating["GR.H2"].multiplier, 1.0);
    }
}
