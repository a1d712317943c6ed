mod common;

use mealforge::filters::{FilterMode, PipelineParams};
use mealforge::ga::{Breeder, GaConfig, Genome, MealSlot};
use mealforge::generator::selection::{binomial, unrank_combination};
use mealforge::generator::CandidateGenerator;
use proptest::prelude::*;

// --- STRATEGIES ---

prop_compose! {
    fn arb_code()(prefix in "[A-Z]{1,2}", n in 1u8..20, lower in any::<bool>()) -> String {
        let code = format!("{}.{}", prefix, n);
        if lower { code.to_lowercase() } else { code }
    }
}

prop_compose! {
    fn arb_combination()(n in 1usize..15)(
        n in Just(n),
        k in 0..=n,
        seed in any::<u64>()
    ) -> (usize, usize, u128) {
        let total = binomial(n, k);
        let rank = (seed as u128) % total;
        (n, k, rank)
    }
}

prop_compose! {
    fn arb_parents()(
        a in proptest::sample::subsequence((1..=12).collect::<Vec<u32>>(), 2..=6),
        b in proptest::sample::subsequence((1..=12).collect::<Vec<u32>>(), 2..=6)
    ) -> (Genome, Genome) {
        let code = |i: &u32| format!("F.{}", i);
        (
            Genome::new("lunch", a.iter().map(code)),
            Genome::new("lunch", b.iter().map(code)),
        )
    }
}

fn breeding_config() -> (GaConfig, Vec<Vec<String>>) {
    let config = GaConfig {
        min_genome_size: 2,
        max_genome_size: 5,
        meal_slots: vec![MealSlot {
            meal_type: "lunch".into(),
            template_name: "basic".into(),
        }],
        ..GaConfig::default()
    };
    let pool = (1..=12).map(|i| format!("F.{}", i)).collect();
    (config, vec![pool])
}

proptest! {
    #[test]
    fn genome_codes_are_normalized_sorted_unique(codes in proptest::collection::vec(arb_code(), 0..12)) {
        let g = Genome::new("lunch", &codes);
        let c = g.codes();
        prop_assert!(c.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(c.iter().all(|x| x.chars().all(|ch| !ch.is_lowercase())));
        for raw in &codes {
            prop_assert!(g.contains(&raw.to_uppercase()));
        }
    }

    #[test]
    fn unranked_combinations_are_increasing((n, k, rank) in arb_combination()) {
        let combo = unrank_combination(n, k, rank);
        prop_assert_eq!(combo.len(), k);
        prop_assert!(combo.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(combo.iter().all(|&i| i < n));
    }

    #[test]
    fn crossover_children_stay_in_bounds(
        (a, b) in arb_parents(),
        two_point in any::<bool>(),
        seed in any::<u64>()
    ) {
        let (config, pools) = breeding_config();
        let breeder = Breeder::new(&config, &pools);
        let mut rng = fastrand::Rng::with_seed(seed);
        let child = breeder.crossover(&mut rng, 0, &a, &b, two_point);
        prop_assert!(child.is_valid(2, 5), "{}", child);
        prop_assert!(child.codes().iter().all(|c| pools[0].contains(c)));
    }

    #[test]
    fn mutation_keeps_size_and_pool((a, _) in arb_parents(), seed in any::<u64>()) {
        let (config, pools) = breeding_config();
        let breeder = Breeder::new(&config, &pools);
        let mut rng = fastrand::Rng::with_seed(seed);
        let child = breeder.mutate(&mut rng, 0, &a);
        prop_assert_eq!(child.size(), a.size());
        prop_assert_ne!(&child, &a);
        prop_assert!(child.codes().iter().all(|c| pools[0].contains(c)));
    }

    #[test]
    fn batches_resume_where_they_stopped(sizes in proptest::collection::vec(1usize..9, 1..8)) {
        let foods = common::foods();
        let cfg = common::config();
        let pools = common::pools(&cfg, &foods);
        let gen = CandidateGenerator::new(&cfg, &pools);

        let total: usize = sizes.iter().sum();
        let (single, _) = gen.generate_batch("lunch", total, 0, Some("soup")).unwrap();

        let mut cursor = 0;
        let mut resumed = Vec::new();
        for size in sizes {
            let (batch, next) = gen.generate_batch("lunch", size, cursor, Some("soup")).unwrap();
            prop_assert_eq!(next, cursor + batch.len() as u64);
            cursor = next;
            resumed.extend(batch);
        }
        prop_assert_eq!(resumed, single);
    }

    #[test]
    fn stage_counts_add_up(cursor in 0u64..33, collect_all in any::<bool>()) {
        let foods = common::foods();
        let cfg = common::config();
        let pools = common::pools(&cfg, &foods);
        let gen = CandidateGenerator::new(&cfg, &pools);
        let template = cfg.generation_template("lunch", Some("basic")).unwrap();
        let mode = if collect_all { FilterMode::CollectAll } else { FilterMode::FailFast };
        let pipeline = PipelineParams::builder()
            .config(&cfg)
            .pools(&pools)
            .foods(&foods)
            .template(&template)
            .mode(Some(mode))
            .build()
            .build_pipeline()
            .unwrap();

        let (batch, _) = gen.generate_batch("lunch", 10, cursor, Some("basic")).unwrap();
        let n = batch.len();
        let report = pipeline.run(batch);
        prop_assert_eq!(report.passed.len() + report.rejected.len(), n);
        for s in &report.stats {
            prop_assert_eq!(s.passed + s.rejected, s.input);
            prop_assert!(s.flagged >= s.rejected);
        }
        if collect_all {
            prop_assert!(report.rejected.is_empty());
        }
    }
}
