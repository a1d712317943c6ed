use super::FilterStage;
use crate::candidate::Candidate;
use crate::codes::normalize;
use crate::config::MutualExclusionRule;
use crate::pools::ResolvedPools;
use fnv::FnvHashSet;
use itertools::Itertools;
use tracing::{debug, warn};

const MAX_ONE_GROUP: &str = "max_one_group";

#[derive(Debug, Clone)]
struct ExclusionGroups {
    name: String,
    groups: Vec<FnvHashSet<String>>,
}

/// Rejects candidates that mix items from more than one group of a rule.
#[derive(Debug, Clone, Default)]
pub struct MutualExclusionFilter {
    rules: Vec<ExclusionGroups>,
}

impl MutualExclusionFilter {
    pub fn new(rules: &[MutualExclusionRule], pools: &ResolvedPools) -> Self {
        let mut resolved = Vec::new();
        for (i, rule) in rules.iter().enumerate() {
            let name = if rule.name.is_empty() {
                format!("rule_{}", i + 1)
            } else {
                rule.name.clone()
            };
            if !rule.enabled {
                debug!("Mutual exclusion rule '{}' disabled", name);
                continue;
            }
            if rule.policy != MAX_ONE_GROUP {
                warn!(
                    "Mutual exclusion rule '{}' uses unsupported policy '{}', ignoring",
                    name, rule.policy
                );
                continue;
            }
            let groups = rule
                .groups
                .iter()
                .map(|spec| pools.expand_spec(spec).into_iter().collect())
                .collect();
            resolved.push(ExclusionGroups { name, groups });
        }
        Self { rules: resolved }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FilterStage for MutualExclusionFilter {
    fn name(&self) -> &'static str {
        "mutual_exclusion"
    }

    fn evaluate(&self, candidate: &mut Candidate) -> usize {
        let codes: Vec<String> = candidate.codes().map(normalize).collect();
        let mut added = 0;
        for rule in &self.rules {
            let present: Vec<usize> = rule
                .groups
                .iter()
                .enumerate()
                .filter(|(_, g)| codes.iter().any(|c| g.contains(c)))
                .map(|(i, _)| i + 1)
                .collect();
            if present.len() > 1 {
                candidate.reject(format!(
                    "mutual_exclusion({}): items from {} groups present (groups [{}]), max allowed is 1",
                    rule.name,
                    present.len(),
                    present.iter().join(", ")
                ));
                added += 1;
            }
        }
        added
    }
}
