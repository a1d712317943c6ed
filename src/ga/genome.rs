use super::config::GaConfig;
use super::scoring::FitnessResult;
use crate::candidate::{Candidate, GenerationMethod, MealItem, TemplateInfo};
use crate::codes::normalize;
use crate::template::GenerationTemplate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Random,
    Bred,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    General,
    Immigrant,
}

/// Composition of one meal slot. Codes are normalized, sorted and unique;
/// every code carries an implicit multiplier of 1.0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genome {
    pub meal_slot: String,
    codes: Vec<String>,
}

impl Genome {
    pub fn new<I, S>(meal_slot: &str, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let codes = codes
            .into_iter()
            .map(|c| normalize(c.as_ref()))
            .filter(|c| !c.is_empty())
            .sorted()
            .dedup()
            .collect();
        Self {
            meal_slot: meal_slot.to_string(),
            codes,
        }
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn size(&self) -> usize {
        self.codes.len()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.binary_search_by(|c| c.as_str().cmp(code)).is_ok()
    }

    /// Copy with `old` swapped for `new`. If `new` is already present the
    /// result is one gene shorter.
    pub fn replace_code(&self, old: &str, new: &str) -> Genome {
        Genome::new(
            &self.meal_slot,
            self.codes
                .iter()
                .map(|c| if c == old { new } else { c.as_str() }),
        )
    }

    pub fn is_valid(&self, min: usize, max: usize) -> bool {
        (min..=max).contains(&self.size())
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.meal_slot, self.codes.join(","))
    }
}

/// Per-slot code lists; two members are the same meal plan iff keys match.
pub type IdentityKey = Vec<Vec<String>>;

/// A GA individual: one genome per configured meal slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    genomes: Vec<Genome>,
    pub origin: Origin,
    pub tier: Tier,
    /// Epochs of culling protection left. Zero for general members.
    pub tenure: usize,
    pub birth_epoch: usize,
    fitness: Option<FitnessResult>,
}

impl Member {
    pub fn new(genomes: Vec<Genome>, origin: Origin, tier: Tier, birth_epoch: usize) -> Self {
        Self {
            id: String::new(),
            genomes,
            origin,
            tier,
            tenure: 0,
            birth_epoch,
            fitness: None,
        }
    }

    /// One genome per meal slot, in slot order. Changes go through
    /// `set_genome`.
    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    pub fn identity_key(&self) -> IdentityKey {
        self.genomes.iter().map(|g| g.codes.clone()).collect()
    }

    pub fn fitness(&self) -> Option<&FitnessResult> {
        self.fitness.as_ref()
    }

    /// Aggregate fitness, `NEG_INFINITY` while unscored.
    pub fn score(&self) -> f64 {
        self.fitness
            .as_ref()
            .map_or(f64::NEG_INFINITY, |f| f.aggregate)
    }

    pub fn is_scored(&self) -> bool {
        self.fitness.is_some()
    }

    pub fn set_fitness(&mut self, fitness: FitnessResult) {
        self.fitness = Some(fitness);
    }

    /// Replaces one genome and drops the now stale fitness.
    pub fn set_genome(&mut self, index: usize, genome: Genome) {
        if let Some(slot) = self.genomes.get_mut(index) {
            *slot = genome;
            self.fitness = None;
        }
    }

    pub fn genome_length(&self) -> usize {
        self.genomes.iter().map(Genome::size).sum()
    }

    /// Genome size issues, empty when the member is valid.
    pub fn validate(&self, config: &GaConfig) -> Vec<String> {
        let mut issues = Vec::new();
        if self.genomes.len() != config.meal_slots.len() {
            issues.push(format!(
                "expected {} genomes (one per meal slot), got {}",
                config.meal_slots.len(),
                self.genomes.len()
            ));
        }
        for (i, genome) in self.genomes.iter().enumerate() {
            if !genome.is_valid(config.min_genome_size, config.max_genome_size) {
                issues.push(format!(
                    "genome {} ({}) has {} codes, expected {}-{}",
                    i,
                    genome.meal_slot,
                    genome.size(),
                    config.min_genome_size,
                    config.max_genome_size
                ));
            }
        }
        issues
    }

    /// The genome at `slot_index` as a filter candidate with multiplier 1.0.
    pub fn to_candidate(
        &self,
        slot_index: usize,
        template: &GenerationTemplate,
    ) -> Option<Candidate> {
        let genome = self.genomes.get(slot_index)?;
        let items = genome
            .codes
            .iter()
            .map(|c| MealItem {
                code: c.clone(),
                mult: 1.0,
            })
            .collect();
        Some(Candidate::new(
            &genome.meal_slot,
            items,
            GenerationMethod::Genetic,
            TemplateInfo {
                template_name: template.name.clone(),
                targets_ref: template.targets_ref.clone(),
            },
        ))
    }

    pub fn description(&self) -> String {
        self.genomes
            .iter()
            .map(|g| g.codes.join(","))
            .join(" | ")
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{}", self.id, self.tier, self.origin)?;
        if let Some(fit) = &self.fitness {
            write!(f, ", fitness {:.3}", fit.aggregate)?;
        }
        write!(f, "): {}", self.description())
    }
}
