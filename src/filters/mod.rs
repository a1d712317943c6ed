pub mod conditional;
pub mod leftover;
pub mod mutual_exclusion;
pub mod nutrient;
pub mod pipeline;
pub mod pre_score;

pub use self::conditional::ConditionalRequirementFilter;
pub use self::leftover::LeftoverMatchFilter;
pub use self::mutual_exclusion::MutualExclusionFilter;
pub use self::nutrient::NutrientConstraintFilter;
pub use self::pipeline::{FilterPipeline, PipelineParams, PipelineReport};
pub use self::pre_score::PreScoreFilter;

use crate::candidate::Candidate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize)]
#[strum(serialize_all = "kebab-case")]
pub enum FilterMode {
    /// Any violation routes the candidate to `rejected`.
    #[default]
    FailFast,
    /// Violations are recorded but the candidate keeps going.
    CollectAll,
}

/// A filter stage. Stages only inspect and annotate; routing is shared.
pub trait FilterStage {
    fn name(&self) -> &'static str;

    /// Records every violation on `candidate` and returns how many
    /// rejecting violations were added. Non-rejecting annotations (soft
    /// violations, under-use warnings) do not count.
    fn evaluate(&self, candidate: &mut Candidate) -> usize;

    fn filter(&self, candidates: Vec<Candidate>, mode: FilterMode) -> (Vec<Candidate>, Vec<Candidate>) {
        let outcome = run_stage(self, candidates, mode);
        (outcome.passed, outcome.rejected)
    }
}

pub struct StageOutcome {
    pub passed: Vec<Candidate>,
    pub rejected: Vec<Candidate>,
    pub stats: FilterStats,
}

/// Routes candidates through one stage according to `mode`.
pub fn run_stage<S: FilterStage + ?Sized>(
    stage: &S,
    candidates: Vec<Candidate>,
    mode: FilterMode,
) -> StageOutcome {
    let mut stats = FilterStats::new(stage.name(), candidates.len());
    let mut passed = Vec::with_capacity(candidates.len());
    let mut rejected = Vec::new();

    for mut candidate in candidates {
        let before = candidate.rejection_reasons().len();
        let violations = stage.evaluate(&mut candidate);
        if violations == 0 {
            passed.push(candidate);
            continue;
        }
        stats.record(&candidate.rejection_reasons()[before..]);
        match mode {
            FilterMode::FailFast => rejected.push(candidate),
            FilterMode::CollectAll => passed.push(candidate),
        }
    }

    stats.passed = passed.len();
    stats.rejected = rejected.len();
    StageOutcome {
        passed,
        rejected,
        stats,
    }
}

/// Category of a reason string: the text before the first `:` or `(`.
pub fn reason_category(reason: &str) -> &str {
    let end = reason
        .find(|c: char| c == ':' || c == '(')
        .unwrap_or(reason.len());
    &reason[..end]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterStats {
    pub stage: String,
    pub input: usize,
    pub passed: usize,
    pub rejected: usize,
    /// Candidates with at least one violation, routed or not.
    pub flagged: usize,
    pub by_reason: BTreeMap<String, usize>,
}

impl FilterStats {
    pub fn new(stage: &str, input: usize) -> Self {
        Self {
            stage: stage.to_string(),
            input,
            passed: 0,
            rejected: 0,
            flagged: 0,
            by_reason: BTreeMap::new(),
        }
    }

    fn record(&mut self, reasons: &[String]) {
        self.flagged += 1;
        for r in reasons {
            *self.by_reason.entry(reason_category(r).to_string()).or_default() += 1;
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.input == 0 {
            0.0
        } else {
            self.passed as f64 / self.input as f64 * 100.0
        }
    }
}

impl fmt::Display for FilterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: passed {}/{} ({:.1}%)",
            self.stage,
            self.passed,
            self.input,
            self.pass_rate()
        )?;
        if self.rejected > 0 {
            write!(f, ", rejected {}", self.rejected)?;
        }
        if self.flagged > self.rejected {
            write!(f, ", flagged {}", self.flagged)?;
        }
        if !self.by_reason.is_empty() {
            let parts: Vec<String> = self
                .by_reason
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect();
            write!(f, " [{}]", parts.join(", "))?;
        }
        Ok(())
    }
}
