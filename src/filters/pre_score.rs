use super::FilterStage;
use crate::candidate::Candidate;
use crate::codes::{fmt_mult, normalize, CodePattern};
use crate::workspace::{AvailabilityPrefs, Inventory, Locks};

/// Lock, availability and inventory checks that run before any scoring.
///
/// Reason codes:
/// - `lock_exclude:<pattern>(<code>)`
/// - `lock_missing:<pattern>(<mult>x)`
/// - `unavailable:<pattern>(<code>)`
/// - `reserved:<code>`
/// - `depleted:<code>`
#[derive(Debug, Clone, Default)]
pub struct PreScoreFilter {
    include: Vec<(CodePattern, f64)>,
    exclude: Vec<CodePattern>,
    unavailable: Vec<CodePattern>,
    reserved: Vec<String>,
    depleted: Vec<String>,
}

impl PreScoreFilter {
    pub fn new(
        locks: Option<&Locks>,
        prefs: Option<&AvailabilityPrefs>,
        inventory: Option<&Inventory>,
    ) -> Self {
        let mut f = PreScoreFilter::default();
        if let Some(locks) = locks {
            f.include = locks
                .include
                .iter()
                .map(|(raw, mult)| (CodePattern::parse(raw), *mult))
                .collect();
            f.exclude = locks.exclude.iter().map(|raw| CodePattern::parse(raw)).collect();
        }
        if let Some(prefs) = prefs {
            let ex = &prefs.exclude_from_recommendations;
            f.unavailable = ex
                .patterns
                .iter()
                .chain(ex.items.iter())
                .map(|raw| CodePattern::parse(raw))
                .collect();
        }
        if let Some(inv) = inventory {
            f.reserved = inv.reserved_codes();
            f.depleted = inv.depleted_codes();
        }
        f
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
            && self.exclude.is_empty()
            && self.unavailable.is_empty()
            && self.reserved.is_empty()
            && self.depleted.is_empty()
    }
}

impl FilterStage for PreScoreFilter {
    fn name(&self) -> &'static str {
        "pre_score"
    }

    fn evaluate(&self, candidate: &mut Candidate) -> usize {
        let codes: Vec<String> = candidate.codes().map(normalize).collect();
        let mut reasons = Vec::new();

        for pattern in &self.exclude {
            if let Some(code) = pattern.first_match(codes.iter().map(|c| c.as_str())) {
                reasons.push(format!("lock_exclude:{}({})", pattern, code));
            }
        }
        for (pattern, mult) in &self.include {
            if pattern.first_match(codes.iter().map(|c| c.as_str())).is_none() {
                reasons.push(format!("lock_missing:{}({}x)", pattern, fmt_mult(*mult)));
            }
        }
        for pattern in &self.unavailable {
            if let Some(code) = pattern.first_match(codes.iter().map(|c| c.as_str())) {
                reasons.push(format!("unavailable:{}({})", pattern, code));
            }
        }
        for code in &codes {
            if self.reserved.binary_search(code).is_ok() {
                reasons.push(format!("reserved:{}", code));
            }
            if self.depleted.binary_search(code).is_ok() {
                reasons.push(format!("depleted:{}", code));
            }
        }

        let n = reasons.len();
        for r in reasons {
            candidate.reject(r);
        }
        n
    }
}
