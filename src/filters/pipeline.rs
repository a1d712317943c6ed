use super::{
    run_stage, ConditionalRequirementFilter, FilterMode, FilterStage, FilterStats,
    LeftoverMatchFilter, MutualExclusionFilter, NutrientConstraintFilter, PreScoreFilter,
};
use crate::candidate::Candidate;
use crate::config::PlannerConfig;
use crate::error::MfResult;
use crate::food::FoodResolver;
use crate::pools::ResolvedPools;
use crate::template::GenerationTemplate;
use crate::workspace::Workspace;
use serde::Serialize;
use tracing::debug;
use typed_builder::TypedBuilder;

#[derive(Debug, Default, Serialize)]
pub struct PipelineReport {
    pub passed: Vec<Candidate>,
    pub rejected: Vec<Candidate>,
    pub stats: Vec<FilterStats>,
}

/// Ordered filter stages sharing one routing mode.
pub struct FilterPipeline<'a> {
    stages: Vec<Box<dyn FilterStage + 'a>>,
    mode: FilterMode,
}

impl<'a> FilterPipeline<'a> {
    pub fn new(mode: FilterMode) -> Self {
        Self {
            stages: Vec::new(),
            mode,
        }
    }

    pub fn with_stage<S: FilterStage + 'a>(mut self, stage: S) -> Self {
        self.push(stage);
        self
    }

    pub fn push<S: FilterStage + 'a>(&mut self, stage: S) {
        self.stages.push(Box::new(stage));
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn run(&self, candidates: Vec<Candidate>) -> PipelineReport {
        let mut report = PipelineReport::default();
        let mut current = candidates;
        for stage in &self.stages {
            let outcome = run_stage(stage.as_ref(), current, self.mode);
            debug!("{}", outcome.stats);
            report.rejected.extend(outcome.rejected);
            report.stats.push(outcome.stats);
            current = outcome.passed;
        }
        report.passed = current;
        report
    }

    /// Runs every stage on one candidate without routing, so all reasons and
    /// annotations accumulate on it.
    pub fn annotate(&self, candidate: &mut Candidate) {
        for stage in &self.stages {
            stage.evaluate(candidate);
        }
    }
}

/// Inputs for assembling the configured stages of one meal template.
#[derive(TypedBuilder)]
pub struct PipelineParams<'p, 'f> {
    pub config: &'p PlannerConfig,
    pub pools: &'p ResolvedPools,
    pub foods: &'f dyn FoodResolver,
    pub template: &'p GenerationTemplate,
    #[builder(default)]
    pub workspace: Option<&'p Workspace>,
    /// Overrides `recommendation.collect_all_rejection_reasons`.
    #[builder(default)]
    pub mode: Option<FilterMode>,
}

impl<'p, 'f> PipelineParams<'p, 'f> {
    /// Stages are added only when configured, in the order pre-score,
    /// mutual exclusion, conditional requirement, leftover match, nutrient.
    /// The pipeline only borrows the food resolver; everything else is
    /// resolved into owned stage state.
    pub fn build_pipeline(self) -> MfResult<FilterPipeline<'f>> {
        let mode = self.mode.unwrap_or(if self.config.recommendation.collect_all_rejection_reasons {
            FilterMode::CollectAll
        } else {
            FilterMode::FailFast
        });
        let meal_type = self.template.meal_type.as_str();
        let filters = self.config.filters_for(meal_type).cloned().unwrap_or_default();
        let mut pipeline = FilterPipeline::new(mode);

        if let Some(ws) = self.workspace {
            let pre = PreScoreFilter::new(
                ws.locks_for(meal_type),
                Some(&ws.preferences),
                Some(&ws.inventory),
            );
            if !pre.is_empty() {
                pipeline.push(pre);
            }
        }

        let exclusion = MutualExclusionFilter::new(&filters.mutual_exclusions, self.pools);
        if !exclusion.is_empty() {
            pipeline.push(exclusion);
        }

        let conditional =
            ConditionalRequirementFilter::new(&filters.conditional_requirements, self.pools);
        if !conditional.is_empty() {
            pipeline.push(conditional);
        }

        if let Some(ws) = self.workspace {
            let leftover = LeftoverMatchFilter::new(
                ws.inventory.leftover_multipliers(),
                filters.leftover_match.allow_under_use,
            );
            if !leftover.is_empty() {
                pipeline.push(leftover);
            }
        }

        if let Some(nutrient) =
            NutrientConstraintFilter::from_config(self.config, self.template, self.foods)?
        {
            pipeline.push(nutrient);
        }

        debug!(
            "Pipeline for {}/{} ({}): {:?}",
            meal_type,
            self.template.name,
            mode,
            pipeline.stage_names()
        );
        Ok(pipeline)
    }
}
