use super::FilterStage;
use crate::candidate::Candidate;
use crate::codes::normalize;
use crate::config::ConditionalRule;
use crate::pools::ResolvedPools;
use fnv::FnvHashSet;
use tracing::debug;

#[derive(Debug, Clone)]
struct ResolvedRule {
    name: String,
    triggers: FnvHashSet<String>,
    required: FnvHashSet<String>,
    min: usize,
    max: Option<usize>,
}

/// "If any trigger is present, then between `min` and `max` items of the
/// required set must be present." Inert when no trigger is present.
#[derive(Debug, Clone, Default)]
pub struct ConditionalRequirementFilter {
    rules: Vec<ResolvedRule>,
}

impl ConditionalRequirementFilter {
    pub fn new(rules: &[ConditionalRule], pools: &ResolvedPools) -> Self {
        let rules = rules
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                if !r.enabled {
                    debug!("Conditional rule '{}' disabled", r.name);
                }
                r.enabled
            })
            .map(|(i, r)| ResolvedRule {
                name: if r.name.is_empty() {
                    format!("rule_{}", i + 1)
                } else {
                    r.name.clone()
                },
                triggers: pools.expand_spec(&r.if_present).into_iter().collect(),
                required: pools.expand_spec(&r.then_require.from).into_iter().collect(),
                min: r.then_require.min,
                max: r.then_require.max,
            })
            .collect();
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FilterStage for ConditionalRequirementFilter {
    fn name(&self) -> &'static str {
        "conditional_requirement"
    }

    fn evaluate(&self, candidate: &mut Candidate) -> usize {
        let codes: FnvHashSet<String> = candidate.codes().map(normalize).collect();
        let mut added = 0;
        for rule in &self.rules {
            if !codes.iter().any(|c| rule.triggers.contains(c)) {
                continue;
            }
            let found = codes.iter().filter(|c| rule.required.contains(*c)).count();
            if found < rule.min {
                candidate.reject(format!(
                    "conditional_requirement({}): trigger present but only {} required items found, need at least {}",
                    rule.name, found, rule.min
                ));
                added += 1;
            }
            if let Some(max) = rule.max {
                if found > max {
                    candidate.reject(format!(
                        "conditional_requirement({}): trigger present and {} required items found, max allowed is {}",
                        rule.name, found, max
                    ));
                    added += 1;
                }
            }
        }
        added
    }
}
