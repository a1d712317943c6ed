use criterion::{criterion_group, criterion_main, Criterion};
use mealforge::config::PlannerConfig;
use mealforge::filters::PipelineParams;
use mealforge::food::{FoodEntry, FoodTable, Nutrient, NutrientVector};
use mealforge::ga::{EpochSummary, GeneticEngine, Member};
use mealforge::generator::CandidateGenerator;
use mealforge::pools::resolve_pools;
use serde_json::json;
use std::hint::black_box;

fn setup_foods() -> FoodTable {
    let mut entries = Vec::new();
    let groups = [("P", 12, 25.0, 0.5), ("V", 20, 2.0, 3.0), ("G", 8, 5.0, 1.0)];
    for (prefix, count, protein, sugar) in groups {
        for i in 1..=count {
            let nutrients = NutrientVector::default()
                .with(Nutrient::Calories, 40.0 + i as f64 * 10.0)
                .with(Nutrient::Protein, protein + i as f64 * 0.5)
                .with(Nutrient::Sugar, sugar * (i % 4) as f64);
            let code = format!("{}.{}", prefix, i);
            entries.push(FoodEntry::new(&code, &code, nutrients));
        }
    }
    FoodTable::from_entries(entries)
}

fn setup_config() -> PlannerConfig {
    serde_json::from_value(json!({
        "component_pools": {
            "proteins": ["P."],
            "vegetables": ["V."],
            "grains": ["G."]
        },
        "meal_generation": {
            "dinner": {
                "plate": {
                    "targets_ref": "meal_templates.dinner.plate",
                    "components": {
                        "protein": {"pool_ref": "proteins", "count": {"min": 1, "max": 1}, "required": true},
                        "veg": {"pool_ref": "vegetables", "count": {"min": 1, "max": 3}},
                        "grain": {"pool_ref": "grains", "count": {"min": 0, "max": 1}}
                    },
                    "constraints": {"max_total_components": 4}
                }
            }
        },
        "meal_templates": {
            "dinner": {
                "plate": {
                    "targets": {
                        "protein": {"min": 30, "max": 50},
                        "calories": {"min": 300, "max": 600},
                        "sugar": {"max": 12}
                    }
                }
            }
        },
        "meal_filters": {
            "dinner": {
                "nutrient_constraints": {"plate": {"sugar": {"max_enforcement": "soft", "tolerance": 1.2}}},
                "mutual_exclusions": [{"name": "one_big", "groups": [["P.11", "P.12"], ["G.7", "G.8"]]}]
            }
        },
        "genetic": {
            "population_size": 60,
            "epochs_per_run": 5,
            "new_members_per_epoch": 20,
            "meal_slots": [{"meal_type": "dinner", "template_name": "plate"}]
        }
    }))
    .expect("bench config")
}

fn criterion_benchmark(c: &mut Criterion) {
    let foods = setup_foods();
    let config = setup_config();
    let pools = resolve_pools(&config.component_pools, &foods).pools;
    let generator = CandidateGenerator::new(&config, &pools);
    let template = config
        .generation_template("dinner", Some("plate"))
        .expect("template");

    c.bench_function("generate_batch (500 @ cursor 10k)", |b| {
        b.iter(|| {
            generator
                .generate_batch("dinner", black_box(500), black_box(10_000), Some("plate"))
                .expect("batch")
        })
    });

    let pipeline = PipelineParams::builder()
        .config(&config)
        .pools(&pools)
        .foods(&foods)
        .template(&template)
        .build()
        .build_pipeline()
        .expect("pipeline");
    let (batch, _) = generator
        .generate_batch("dinner", 500, 0, Some("plate"))
        .expect("batch");

    c.bench_function("filter_pipeline (500 candidates)", |b| {
        b.iter(|| pipeline.run(black_box(batch.clone())))
    });

    c.bench_function("ga_run (60 members, 5 epochs)", |b| {
        b.iter(|| {
            let mut engine = GeneticEngine::new(&config, &pools, &foods, None).expect("engine");
            let mut rng = fastrand::Rng::with_seed(black_box(42));
            engine.run(&mut rng, |_: &EpochSummary, _: Option<&Member>| true)
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
