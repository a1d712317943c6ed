pub mod selection;
pub mod space;

pub use self::space::{ActiveSlot, CandidateSpace, Combination};

use crate::candidate::{Candidate, GenerationMethod, MealItem, TemplateInfo};
use crate::config::PlannerConfig;
use crate::error::MfResult;
use crate::pools::ResolvedPools;
use crate::template::GenerationTemplate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Size of a template's candidate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CombinationCount {
    /// Unconstrained Cartesian product size.
    pub raw: u128,
    /// Combinations that pass template constraints.
    pub valid: u128,
}

/// Exhaustive, cursor-addressed candidate generation.
pub struct CandidateGenerator<'a> {
    config: &'a PlannerConfig,
    pools: &'a ResolvedPools,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(config: &'a PlannerConfig, pools: &'a ResolvedPools) -> Self {
        Self { config, pools }
    }

    /// Validates the template and binds it to the pools.
    pub fn space(
        &self,
        meal_type: &str,
        template_name: Option<&str>,
    ) -> MfResult<(GenerationTemplate, CandidateSpace)> {
        let template = self.config.generation_template(meal_type, template_name)?;
        let (space, _) = CandidateSpace::new(&template, self.pools);
        Ok((template, space))
    }

    /// Returns up to `count` candidates starting at `cursor`, and the cursor
    /// to resume from. The same cursor always yields the same candidates.
    pub fn generate_batch(
        &self,
        meal_type: &str,
        count: usize,
        cursor: u64,
        template_name: Option<&str>,
    ) -> MfResult<(Vec<Candidate>, u64)> {
        let (template, space) = self.space(meal_type, template_name)?;
        let candidates: Vec<Candidate> = space
            .iter_from(cursor)
            .take(count)
            .map(|combo| build_candidate(&template, &combo))
            .collect();
        let next = cursor + candidates.len() as u64;
        debug!(
            "{}/{}: generated {} candidates, cursor {} -> {}",
            template.meal_type,
            template.name,
            candidates.len(),
            cursor,
            next
        );
        Ok((candidates, next))
    }

    pub fn count_total_combinations(
        &self,
        meal_type: &str,
        template_name: Option<&str>,
    ) -> MfResult<CombinationCount> {
        let (_, space) = self.space(meal_type, template_name)?;
        Ok(CombinationCount {
            raw: space.raw_len(),
            valid: space.count_valid(),
        })
    }
}

pub fn build_candidate(template: &GenerationTemplate, combo: &Combination<'_>) -> Candidate {
    let mut items = Vec::new();
    let mut summary: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (active, codes) in combo {
        for code in codes {
            items.push(MealItem {
                code: code.to_string(),
                mult: active.slot.multiplier,
            });
            summary
                .entry(active.slot.name.clone())
                .or_default()
                .push(code.to_string());
        }
    }
    let mut candidate = Candidate::new(
        &template.meal_type,
        items,
        GenerationMethod::Exhaustive,
        TemplateInfo {
            template_name: template.name.clone(),
            targets_ref: template.targets_ref.clone(),
        },
    );
    candidate.component_summary = summary;
    candidate
}
