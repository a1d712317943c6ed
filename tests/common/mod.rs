#![allow(dead_code)]

use mealforge::candidate::{Candidate, GenerationMethod, MealItem, TemplateInfo};
use mealforge::config::PlannerConfig;
use mealforge::food::FoodTable;
use mealforge::pools::{resolve_pools, ResolvedPools};
use serde_json::{json, Value};

pub const FOODS_CSV: &str = "\
code,option,cal,prot_g,carbs_g,fat_g,fiber_g,sugar_g,GI,GL
P.1,Chicken breast,200,30,0,5,0,0,,0
P.2,Tofu,150,15,3,8,1,1,15,1
P.3,Black beans,220,14,35,1,12,2,30,8
V.1,Broccoli,30,3,6,0,3,1.5,10,1
V.2,Carrot,40,1,9,0,3,4.5,35,3
V.3,Kale,35,3,7,0,3,0,5,1
V.4,Red pepper,25,1,6,0,2,3,15,2
B.1,Brown rice,200,4,45,2,3,0,50,20
SO.1,Lentil soup,180,12,30,3,8,3,30,9
SO.1D,Lentil soup (large),270,18,45,4,12,4,30,13
SUG,Sugar,4,0,1,0,0,1,65,1
";

pub fn foods() -> FoodTable {
    FoodTable::from_reader(FOODS_CSV.as_bytes()).unwrap()
}

/// Planner config with one lunch template: 1 protein (pool of 3) and 0-2
/// vegetables (pool of 4, from a prefix pattern).
pub fn config_value() -> Value {
    json!({
        "component_pools": {
            "proteins": ["P.1", "P.2", "P.3"],
            "vegetables": ["V."],
            "sides": ["@vegetables", "B.1"],
            "soups": ["SO.1", "SO.1D"]
        },
        "meal_generation": {
            "lunch": {
                "basic": {
                    "description": "protein plus vegetables",
                    "targets_ref": "meal_templates.lunch.basic",
                    "components": {
                        "protein": {"pool_ref": "proteins", "count": {"min": 1, "max": 1}, "required": true},
                        "veg": {"pool_ref": "vegetables", "count": {"min": 0, "max": 2}}
                    },
                    "constraints": {"max_total_components": 3}
                },
                "soup": {
                    "targets_ref": "meal_templates.lunch.basic",
                    "components": {
                        "soup": {"pool_ref": "soups", "count": {"min": 1, "max": 2}, "required": true},
                        "protein": {"pool_ref": "proteins", "count": {"min": 0, "max": 1}}
                    },
                    "constraints": {"base_code_uniqueness": true}
                }
            }
        },
        "meal_templates": {
            "lunch": {
                "basic": {
                    "targets": {
                        "protein": {"min": 20, "max": 40},
                        "calories": {"min": 200, "max": 400},
                        "sugar": {"max": 10}
                    }
                }
            }
        },
        "meal_filters": {
            "lunch": {
                "nutrient_constraints": {
                    "basic": {
                        "sugar": {"max_enforcement": "hard"}
                    }
                },
                "mutual_exclusions": [
                    {"name": "one_legume", "groups": ["P.3", ["SO.1", "SO.1D"]]}
                ]
            }
        },
        "genetic": {
            "population_size": 8,
            "epochs_per_run": 4,
            "new_members_per_epoch": 4,
            "min_genome_size": 2,
            "max_genome_size": 3,
            "immigrant_pool_ratio": 0.25,
            "immigrant_tenure_epochs": 2,
            "meal_slots": [{"meal_type": "lunch", "template_name": "basic"}],
            "scoring_weights": {"protein": 2.0}
        }
    })
}

pub fn config() -> PlannerConfig {
    serde_json::from_value(config_value()).unwrap()
}

pub fn pools(config: &PlannerConfig, foods: &FoodTable) -> ResolvedPools {
    resolve_pools(&config.component_pools, foods).pools
}

/// An exhaustive lunch candidate from `(code, mult)` pairs.
pub fn candidate(items: &[(&str, f64)]) -> Candidate {
    Candidate::new(
        "lunch",
        items
            .iter()
            .map(|(code, mult)| MealItem {
                code: code.to_string(),
                mult: *mult,
            })
            .collect(),
        GenerationMethod::Exhaustive,
        TemplateInfo {
            template_name: "basic".to_string(),
            targets_ref: Some("meal_templates.lunch.basic".to_string()),
        },
    )
}
