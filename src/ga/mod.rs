//! Genetic search over meal compositions.
//!
//! Members carry one genome per configured meal slot. Each epoch graduates
//! tenured immigrants, draws new immigrants and offspring, scores newcomers
//! through the slot's filter pipeline and fitness scorer, then culls the
//! general tier back to size.

pub mod breeding;
pub mod config;
pub mod engine;
pub mod genome;
pub mod population;
pub mod scoring;

pub use self::breeding::{Breeder, BreedingOperator, BreedingResult};
pub use self::config::{GaConfig, MealSlot};
pub use self::engine::{EpochSummary, GaRunResult, GeneticEngine, ProgressCallback};
pub use self::genome::{Genome, IdentityKey, Member, Origin, Tier};
pub use self::population::{DiversityMetrics, EpochStats, Population};
pub use self::scoring::{FitnessResult, FitnessScorer, NutrientScore, NutrientTarget, ScoreShape};
