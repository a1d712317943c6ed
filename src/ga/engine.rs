use super::breeding::{Breeder, BreedingOperator};
use super::config::GaConfig;
use super::genome::{Member, Tier};
use super::population::{DiversityMetrics, Population};
use super::scoring::{FitnessResult, FitnessScorer};
use crate::config::PlannerConfig;
use crate::error::{aggregate, MealForgeError, MfResult};
use crate::filters::{FilterMode, FilterPipeline, PipelineParams};
use crate::food::FoodResolver;
use crate::pools::ResolvedPools;
use crate::template::GenerationTemplate;
use crate::workspace::Workspace;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Random draws allowed per seat when seeding the population.
const INIT_ATTEMPT_FACTOR: usize = 10;

/// What one epoch did to the population.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EpochSummary {
    pub epoch: usize,
    pub bred: usize,
    pub immigrants: usize,
    pub accepted: usize,
    pub culled: usize,
    pub graduated: usize,
    pub fallbacks: usize,
    pub crossovers: usize,
    pub mutations: usize,
    pub diversity: DiversityMetrics,
}

impl fmt::Display for EpochSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Epoch {:>3}: +{} bred, +{} immigrants, {} graduated, {} culled | {}",
            self.epoch, self.bred, self.immigrants, self.graduated, self.culled, self.diversity
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GaRunResult {
    /// Both tiers, best first.
    pub members: Vec<Member>,
    pub epochs: Vec<EpochSummary>,
    pub converged: bool,
    pub aborted: bool,
}

impl GaRunResult {
    pub fn best(&self) -> Option<&Member> {
        self.members.first()
    }
}

/// Receives a summary after each epoch. Returning false stops the run.
pub trait ProgressCallback {
    fn on_progress(&self, summary: &EpochSummary, best: Option<&Member>) -> bool;
}

impl<F> ProgressCallback for F
where
    F: Fn(&EpochSummary, Option<&Member>) -> bool,
{
    fn on_progress(&self, summary: &EpochSummary, best: Option<&Member>) -> bool {
        self(summary, best)
    }
}

/// Filter pipeline and scorer for one configured meal slot.
struct SlotContext<'a> {
    template: GenerationTemplate,
    pipeline: FilterPipeline<'a>,
    scorer: FitnessScorer,
}

pub struct GeneticEngine<'a> {
    config: GaConfig,
    foods: &'a dyn FoodResolver,
    slots: Vec<SlotContext<'a>>,
    slot_pools: Vec<Vec<String>>,
    population: Population,
    epoch: usize,
}

impl<'a> GeneticEngine<'a> {
    /// Validates the `genetic` block and resolves every meal slot before
    /// anything runs. Slots whose pools are too small for `min_genome_size`
    /// are reported together.
    pub fn new(
        planner: &'a PlannerConfig,
        pools: &'a ResolvedPools,
        foods: &'a dyn FoodResolver,
        workspace: Option<&'a Workspace>,
    ) -> MfResult<Self> {
        let config = planner.genetic.clone();
        config.validate()?;

        let mut slots = Vec::with_capacity(config.meal_slots.len());
        let mut slot_pools = Vec::with_capacity(config.meal_slots.len());
        let mut problems = Vec::new();
        for (i, slot) in config.meal_slots.iter().enumerate() {
            let template =
                planner.generation_template(&slot.meal_type, Some(slot.template_name.as_str()))?;
            let pool = config.resolve_slot_pool(slot, planner, pools)?;
            if pool.len() < config.min_genome_size {
                problems.push(format!(
                    "meal_slots[{}] ({}/{}): pool has {} codes, min_genome_size is {}",
                    i,
                    slot.meal_type,
                    slot.template_name,
                    pool.len(),
                    config.min_genome_size
                ));
            }
            let pipeline = PipelineParams::builder()
                .config(planner)
                .pools(pools)
                .foods(foods)
                .template(&template)
                .workspace(workspace)
                .mode(Some(FilterMode::CollectAll))
                .build()
                .build_pipeline()?;
            let scorer = FitnessScorer::from_template(planner, &template, &config)?;
            debug!(
                "Slot {} ({}/{}): {} codes, stages {:?}",
                i,
                slot.meal_type,
                slot.template_name,
                pool.len(),
                pipeline.stage_names()
            );
            slots.push(SlotContext {
                template,
                pipeline,
                scorer,
            });
            slot_pools.push(pool);
        }
        if !problems.is_empty() {
            return Err(MealForgeError::Config(aggregate(
                "GA slot pools are too small:",
                &problems,
            )));
        }

        let population = Population::new(&config);
        Ok(Self {
            config,
            foods,
            slots,
            slot_pools,
            population,
            epoch: 0,
        })
    }

    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn slot_pools(&self) -> &[Vec<String>] {
        &self.slot_pools
    }

    /// Runs each slot through its collect-all pipeline and scores what the
    /// stages left on the candidate. Slots are summed.
    pub fn evaluate(&self, member: &Member) -> FitnessResult {
        evaluate_member(&self.slots, self.foods, member)
    }

    /// Seeds the general tier with random members. Returns how many were
    /// accepted, which can fall short when the pools are small.
    pub fn initialize_population(&mut self, rng: &mut fastrand::Rng) -> usize {
        let target = self.config.population_size;
        let breeder = Breeder::new(&self.config, &self.slot_pools);
        let mut added = 0;
        let mut attempts = 0;
        while self.population.general().len() < target && attempts < target * INIT_ATTEMPT_FACTOR {
            attempts += 1;
            let member = breeder.random_member(rng, Tier::General, 0);
            if self.population.add_member(member) {
                added += 1;
            }
        }
        if added < target {
            warn!(
                "Seeded {} of {} members after {} attempts",
                added, target, attempts
            );
        }
        score_pending(&self.slots, self.foods, &mut self.population);
        self.population.rerank();
        self.population.snapshot_elite();
        info!("Initialized population with {} members", added);
        added
    }

    /// One generation: graduate immigrants, add new immigrants, breed,
    /// score the newcomers, cull, then measure diversity.
    pub fn run_epoch(&mut self, rng: &mut fastrand::Rng) -> EpochSummary {
        self.epoch += 1;
        let epoch = self.epoch;
        self.population.begin_epoch();
        let mut summary = EpochSummary {
            epoch,
            ..EpochSummary::default()
        };

        let graduated = self.population.graduate_immigrants();
        summary.graduated = graduated;

        let breeder = Breeder::new(&self.config, &self.slot_pools);
        let room = self
            .config
            .max_immigrant_pool()
            .saturating_sub(self.population.immigrants().len());
        for _ in 0..self.config.immigrants_per_epoch().min(room) {
            for _ in 0..=self.config.max_breeding_retries {
                let member = breeder.random_member(rng, Tier::Immigrant, epoch);
                if self.population.is_duplicate(&member.identity_key()) {
                    continue;
                }
                if self.population.add_member(member) {
                    summary.immigrants += 1;
                }
                break;
            }
        }

        for _ in 0..self.config.new_members_per_epoch {
            let result = breeder.breed(rng, &self.population, epoch);
            if result.fell_back {
                summary.fallbacks += 1;
            }
            let op = result.operator;
            if self.population.add_member(result.member) {
                summary.bred += 1;
                match op {
                    BreedingOperator::Crossover => summary.crossovers += 1,
                    BreedingOperator::Mutation => summary.mutations += 1,
                    BreedingOperator::Random => {}
                }
            }
        }

        score_pending(&self.slots, self.foods, &mut self.population);
        self.population.rerank();
        summary.culled = self.population.cull_general().len();

        summary.accepted = self.population.stats().accepted;
        summary.diversity = self.population.diversity(epoch);
        self.population.snapshot_elite();
        debug!("{}", summary);
        summary
    }

    /// Runs up to `epochs_per_run` epochs. Stops early once elite turnover
    /// stays at or below the threshold for `convergence_patience` epochs in
    /// a row, or when the callback returns false.
    pub fn run<CB: ProgressCallback>(
        &mut self,
        rng: &mut fastrand::Rng,
        callback: CB,
    ) -> GaRunResult {
        if self.population.is_empty() {
            self.initialize_population(rng);
        }

        let mut epochs = Vec::new();
        let mut stale = 0;
        let mut converged = false;
        let mut aborted = false;
        for _ in 0..self.config.epochs_per_run {
            let summary = self.run_epoch(rng);
            if summary.diversity.elite_turnover <= self.config.convergence_turnover_threshold {
                stale += 1;
            } else {
                stale = 0;
            }
            let keep_going = callback.on_progress(&summary, self.population.general().first());
            epochs.push(summary);

            if !keep_going {
                aborted = true;
                break;
            }
            if self.config.convergence_patience > 0 && stale >= self.config.convergence_patience {
                info!(
                    "Converged after {} epochs (elite unchanged for {})",
                    self.epoch, stale
                );
                converged = true;
                break;
            }
        }

        let mut members: Vec<Member> = self.population.members().cloned().collect();
        members.sort_by(|a, b| b.score().total_cmp(&a.score()));
        GaRunResult {
            members,
            epochs,
            converged,
            aborted,
        }
    }
}

fn evaluate_member(slots: &[SlotContext<'_>], foods: &dyn FoodResolver, member: &Member) -> FitnessResult {
    let mut total = FitnessResult::default();
    for (i, slot) in slots.iter().enumerate() {
        let Some(mut candidate) = member.to_candidate(i, &slot.template) else {
            continue;
        };
        slot.pipeline.annotate(&mut candidate);
        let result = slot.scorer.score_candidate(&candidate, foods);
        if slots.len() == 1 {
            return result;
        }
        total.absorb(i, &slot.template.meal_type, result);
    }
    total
}

fn score_pending(slots: &[SlotContext<'_>], foods: &dyn FoodResolver, population: &mut Population) {
    let scored = population.score_pending(|member| evaluate_member(slots, foods, member));
    debug!("Scored {} new members", scored);
}
