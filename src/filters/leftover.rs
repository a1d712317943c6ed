use super::FilterStage;
use crate::candidate::{Candidate, UnderUse};
use crate::codes::{fmt_mult, normalize};
use std::collections::BTreeMap;

/// Relative tolerance for matching a leftover's stored multiplier.
pub const MATCH_TOLERANCE: f64 = 0.001;

/// Leftovers must be used at their stored multiplier. Over-use always
/// rejects; under-use rejects unless `allow_under_use` is set, in which case
/// it is recorded on the candidate for scoring.
#[derive(Debug, Clone, Default)]
pub struct LeftoverMatchFilter {
    leftovers: BTreeMap<String, f64>,
    allow_under_use: bool,
}

impl LeftoverMatchFilter {
    /// `leftovers` maps code to stored multiplier.
    pub fn new(leftovers: BTreeMap<String, f64>, allow_under_use: bool) -> Self {
        let leftovers = leftovers
            .into_iter()
            .map(|(code, mult)| (normalize(&code), mult))
            .collect();
        Self {
            leftovers,
            allow_under_use,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.leftovers.is_empty()
    }
}

impl FilterStage for LeftoverMatchFilter {
    fn name(&self) -> &'static str {
        "leftover_match"
    }

    fn evaluate(&self, candidate: &mut Candidate) -> usize {
        let mut reasons = Vec::new();
        let mut under_use = Vec::new();
        for item in &candidate.items {
            let code = normalize(&item.code);
            let Some(&available) = self.leftovers.get(&code) else {
                continue;
            };
            if (item.mult - available).abs() <= MATCH_TOLERANCE * available.abs() {
                continue;
            }
            if item.mult > available {
                reasons.push(format!(
                    "leftover_overuse: {} needs {}x but only {}x available",
                    code,
                    fmt_mult(item.mult),
                    fmt_mult(available)
                ));
            } else if self.allow_under_use {
                under_use.push(UnderUse {
                    code,
                    used: item.mult,
                    available,
                });
            } else {
                reasons.push(format!(
                    "leftover_mismatch: {} uses {}x but inventory has {}x",
                    code,
                    fmt_mult(item.mult),
                    fmt_mult(available)
                ));
            }
        }

        candidate.leftover_under_use.extend(under_use);
        let n = reasons.len();
        for r in reasons {
            candidate.reject(r);
        }
        n
    }
}
