use super::config::{GaConfig, MealSlot};
use super::genome::{Genome, Member, Origin, Tier};
use super::population::Population;
use fnv::FnvHashSet;
use strum_macros::{Display, EnumIter, EnumString};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum BreedingOperator {
    Crossover,
    Mutation,
    Random,
}

#[derive(Debug, Clone)]
pub struct BreedingResult {
    pub member: Member,
    pub operator: BreedingOperator,
    /// Duplicate or invalid draws discarded before this one.
    pub retries: usize,
    /// Retries ran out and a plain random member was drawn instead.
    pub fell_back: bool,
}

/// Genetic operators over the resolved per-slot code pools.
pub struct Breeder<'a> {
    config: &'a GaConfig,
    slots: &'a [MealSlot],
    slot_pools: &'a [Vec<String>],
}

impl<'a> Breeder<'a> {
    /// `slot_pools[i]` holds the codes genome `i` draws from.
    pub fn new(config: &'a GaConfig, slot_pools: &'a [Vec<String>]) -> Self {
        Self {
            config,
            slots: &config.meal_slots,
            slot_pools,
        }
    }

    fn bounds(&self, pool_len: usize) -> (usize, usize) {
        let hi = self.config.max_genome_size.min(pool_len);
        (self.config.min_genome_size.min(hi), hi)
    }

    pub fn pick_operator(&self, rng: &mut fastrand::Rng) -> BreedingOperator {
        let total = self.config.operator_rate_sum();
        if total <= 0.0 {
            return BreedingOperator::Random;
        }
        let roll = rng.f64() * total;
        if roll < self.config.crossover_rate {
            BreedingOperator::Crossover
        } else if roll < self.config.crossover_rate + self.config.mutation_rate {
            BreedingOperator::Mutation
        } else {
            BreedingOperator::Random
        }
    }

    pub fn random_genome(&self, rng: &mut fastrand::Rng, slot: usize) -> Genome {
        let pool = &self.slot_pools[slot];
        let (lo, hi) = self.bounds(pool.len());
        let size = if hi > lo { rng.usize(lo..=hi) } else { hi };
        let mut codes = pool.clone();
        rng.shuffle(&mut codes);
        codes.truncate(size);
        Genome::new(&self.slots[slot].meal_type, codes)
    }

    pub fn random_member(&self, rng: &mut fastrand::Rng, tier: Tier, epoch: usize) -> Member {
        let genomes = (0..self.slots.len())
            .map(|i| self.random_genome(rng, i))
            .collect();
        Member::new(genomes, Origin::Random, tier, epoch)
    }

    /// Splices `a` and `b` at one or two cut points, then repairs the child
    /// into the size bounds. Short children are topped up from the larger
    /// parent first; long ones lose codes from the tail segment.
    pub fn crossover(
        &self,
        rng: &mut fastrand::Rng,
        slot: usize,
        a: &Genome,
        b: &Genome,
        two_point: bool,
    ) -> Genome {
        let (pa, pb) = (a.codes(), b.codes());
        let shortest = pa.len().min(pb.len());
        let mut spliced: Vec<&str> = Vec::with_capacity(pa.len() + pb.len());
        if shortest < 2 {
            spliced.extend(pa.iter().map(String::as_str));
        } else if two_point && shortest >= 3 {
            let c1 = rng.usize(1..shortest - 1);
            let c2 = rng.usize(c1 + 1..shortest);
            spliced.extend(pa[..c1].iter().map(String::as_str));
            spliced.extend(pb[c1..c2].iter().map(String::as_str));
            spliced.extend(pa[c2..].iter().map(String::as_str));
        } else {
            let cut = rng.usize(1..shortest);
            spliced.extend(pa[..cut].iter().map(String::as_str));
            spliced.extend(pb[cut..].iter().map(String::as_str));
        }

        let mut seen = FnvHashSet::default();
        let mut child: Vec<&str> = spliced.into_iter().filter(|c| seen.insert(*c)).collect();

        let (lo, hi) = self.bounds(self.slot_pools[slot].len());
        if child.len() < lo {
            let (richer, poorer) = if pa.len() >= pb.len() { (pa, pb) } else { (pb, pa) };
            let fill = richer
                .iter()
                .chain(poorer.iter())
                .chain(self.slot_pools[slot].iter());
            for code in fill {
                if child.len() >= lo {
                    break;
                }
                if seen.insert(code.as_str()) {
                    child.push(code.as_str());
                }
            }
        }
        child.truncate(hi);
        Genome::new(&a.meal_slot, child)
    }

    /// Replaces a random subset of codes with pool codes not already present.
    pub fn mutate(&self, rng: &mut fastrand::Rng, slot: usize, parent: &Genome) -> Genome {
        let pool = &self.slot_pools[slot];
        let mut fresh: Vec<&String> = pool.iter().filter(|c| !parent.contains(c)).collect();
        if fresh.is_empty() || parent.size() == 0 {
            return parent.clone();
        }
        rng.shuffle(&mut fresh);

        let mut positions: Vec<usize> = (0..parent.size()).collect();
        rng.shuffle(&mut positions);
        let count = rng.usize(1..=parent.size().min(fresh.len()));

        let mut codes: Vec<String> = parent.codes().to_vec();
        for (pos, new) in positions.into_iter().take(count).zip(fresh) {
            codes[pos] = new.clone();
        }
        Genome::new(&parent.meal_slot, codes)
    }

    fn offspring(
        &self,
        rng: &mut fastrand::Rng,
        op: BreedingOperator,
        population: &Population,
        epoch: usize,
    ) -> Member {
        match op {
            BreedingOperator::Crossover => match population.select_pair(rng) {
                Some((a, b)) => {
                    let two_point = rng.bool();
                    let genomes = a
                        .genomes()
                        .iter()
                        .zip(b.genomes())
                        .enumerate()
                        .map(|(i, (ga, gb))| self.crossover(rng, i, ga, gb, two_point))
                        .collect();
                    Member::new(genomes, Origin::Bred, Tier::General, epoch)
                }
                None => self.random_member(rng, Tier::General, epoch),
            },
            BreedingOperator::Mutation => match population.select(rng) {
                Some(parent) => {
                    let mut genomes = parent.genomes().to_vec();
                    let target = rng.usize(0..genomes.len().max(1));
                    if let Some(g) = genomes.get_mut(target) {
                        *g = self.mutate(rng, target, g);
                    }
                    Member::new(genomes, Origin::Bred, Tier::General, epoch)
                }
                None => self.random_member(rng, Tier::General, epoch),
            },
            BreedingOperator::Random => self.random_member(rng, Tier::General, epoch),
        }
    }

    fn acceptable(&self, member: &Member, population: &Population) -> bool {
        member.validate(self.config).is_empty() && !population.is_duplicate(&member.identity_key())
    }

    /// Draws one offspring that is valid and new to the population, retrying
    /// up to `max_breeding_retries` times before falling back to random.
    pub fn breed(
        &self,
        rng: &mut fastrand::Rng,
        population: &Population,
        epoch: usize,
    ) -> BreedingResult {
        let op = self.pick_operator(rng);
        for retries in 0..=self.config.max_breeding_retries {
            let member = self.offspring(rng, op, population, epoch);
            if self.acceptable(&member, population) {
                return BreedingResult {
                    member,
                    operator: op,
                    retries,
                    fell_back: false,
                };
            }
        }
        debug!(
            "{} exhausted {} retries, falling back to random",
            op, self.config.max_breeding_retries
        );
        BreedingResult {
            member: self.random_member(rng, Tier::General, epoch),
            operator: BreedingOperator::Random,
            retries: self.config.max_breeding_retries,
            fell_back: true,
        }
    }
}
