use super::config::GaConfig;
use super::genome::{IdentityKey, Member, Tier};
use super::scoring::FitnessResult;
use fnv::FnvHashSet;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

/// Members compared between epochs for elite turnover.
pub const ELITE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EpochStats {
    pub attempted: usize,
    pub accepted: usize,
    pub duplicate_population: usize,
    pub duplicate_history: usize,
    pub graduated: usize,
    /// Immigrants whose tenure was ticked this epoch.
    pub immigrants_ticked: usize,
}

/// Population health for one epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DiversityMetrics {
    /// Share of the previous elite replaced this epoch.
    pub elite_turnover: f64,
    pub acceptance_rate: f64,
    pub duplicate_rate: f64,
    pub immigrant_graduation_rate: f64,
    pub best_score: f64,
    pub median_score: f64,
    pub worst_score: f64,
    pub epoch: usize,
}

impl fmt::Display for DiversityMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "best {:.3} | median {:.3} | worst {:.3} | turnover {:.0}% | accepted {:.0}% | dup {:.0}%",
            self.best_score,
            self.median_score,
            self.worst_score,
            self.elite_turnover * 100.0,
            self.acceptance_rate * 100.0,
            self.duplicate_rate * 100.0
        )
    }
}

fn by_fitness_desc(a: &Member, b: &Member) -> Ordering {
    b.score().total_cmp(&a.score())
}

/// Two-tier container. No identity appears twice across both tiers, and
/// the bounded history keeps recently seen identities from coming back.
#[derive(Debug)]
pub struct Population {
    general: Vec<Member>,
    immigrants: Vec<Member>,
    identities: FnvHashSet<IdentityKey>,
    history: VecDeque<IdentityKey>,
    history_set: FnvHashSet<IdentityKey>,
    history_capacity: usize,
    target_size: usize,
    tenure_epochs: usize,
    selection_pressure: f64,
    next_id: usize,
    stats: EpochStats,
    previous_elite: Vec<IdentityKey>,
}

impl Population {
    pub fn new(config: &GaConfig) -> Self {
        Self {
            general: Vec::new(),
            immigrants: Vec::new(),
            identities: FnvHashSet::default(),
            history: VecDeque::new(),
            history_set: FnvHashSet::default(),
            history_capacity: config.history_capacity.max(1),
            target_size: config.population_size,
            tenure_epochs: config.immigrant_tenure_epochs,
            selection_pressure: config.selection_pressure,
            next_id: 1,
            stats: EpochStats::default(),
            previous_elite: Vec::new(),
        }
    }

    pub fn general(&self) -> &[Member] {
        &self.general
    }

    pub fn immigrants(&self) -> &[Member] {
        &self.immigrants
    }

    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.general.iter().chain(self.immigrants.iter())
    }

    /// Sets fitness on every unscored member and returns how many were
    /// scored. Genomes stay untouched, so the identity index stays valid.
    pub fn score_pending<F>(&mut self, mut score: F) -> usize
    where
        F: FnMut(&Member) -> FitnessResult,
    {
        let mut scored = 0;
        for member in self.general.iter_mut().chain(self.immigrants.iter_mut()) {
            if !member.is_scored() {
                let fitness = score(member);
                member.set_fitness(fitness);
                scored += 1;
            }
        }
        scored
    }

    pub fn len(&self) -> usize {
        self.general.len() + self.immigrants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> EpochStats {
        self.stats
    }

    pub fn begin_epoch(&mut self) {
        self.stats = EpochStats::default();
    }

    /// True if the identity is in either tier or still in history.
    pub fn is_duplicate(&self, key: &IdentityKey) -> bool {
        self.identities.contains(key) || self.history_set.contains(key)
    }

    fn remember(&mut self, key: IdentityKey) {
        if self.history_set.insert(key.clone()) {
            self.history.push_back(key);
        }
        while self.history.len() > self.history_capacity {
            if let Some(old) = self.history.pop_front() {
                self.history_set.remove(&old);
            }
        }
    }

    /// Inserts into the member's tier and assigns its `GA-<n>` id. Returns
    /// false, leaving the population untouched, for a duplicate.
    pub fn add_member(&mut self, mut member: Member) -> bool {
        self.stats.attempted += 1;
        let key = member.identity_key();
        if self.identities.contains(&key) {
            self.stats.duplicate_population += 1;
            return false;
        }
        if self.history_set.contains(&key) {
            self.stats.duplicate_history += 1;
            return false;
        }

        self.remember(key.clone());
        self.identities.insert(key);
        member.id = format!("GA-{}", self.next_id);
        self.next_id += 1;
        match member.tier {
            Tier::Immigrant => {
                member.tenure = self.tenure_epochs;
                self.immigrants.push(member);
            }
            Tier::General => {
                member.tenure = 0;
                self.general.push(member);
            }
        }
        self.stats.accepted += 1;
        true
    }

    /// Stable sort of both tiers, best first. Equal scores keep insertion order.
    pub fn rerank(&mut self) {
        self.general.sort_by(by_fitness_desc);
        self.immigrants.sort_by(by_fitness_desc);
    }

    /// Drops the lowest ranked general members beyond the target size.
    /// Call after `rerank`.
    pub fn cull_general(&mut self) -> Vec<Member> {
        if self.general.len() <= self.target_size {
            return Vec::new();
        }
        let culled = self.general.split_off(self.target_size);
        for m in &culled {
            self.identities.remove(&m.identity_key());
        }
        culled
    }

    /// Ticks every immigrant's tenure once and moves the expired ones into
    /// the general tier. `add_member` keeps identities unique across both
    /// tiers, so a graduate never collides with a general member. Returns
    /// how many graduated.
    pub fn graduate_immigrants(&mut self) -> usize {
        self.stats.immigrants_ticked += self.immigrants.len();
        let (expired, remaining): (Vec<Member>, Vec<Member>) =
            std::mem::take(&mut self.immigrants)
                .into_iter()
                .map(|mut m| {
                    m.tenure = m.tenure.saturating_sub(1);
                    m
                })
                .partition(|m| m.tenure == 0);
        self.immigrants = remaining;

        let graduated = expired.len();
        self.general.extend(expired.into_iter().map(|mut m| {
            m.tier = Tier::General;
            m
        }));
        self.stats.graduated += graduated;
        graduated
    }

    /// Both tiers merged and ranked, best first.
    fn ranked(&self) -> Vec<&Member> {
        let mut all: Vec<&Member> = self.members().collect();
        all.sort_by(|a, b| by_fitness_desc(a, b));
        all
    }

    fn rank_weights(&self, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| ((n - i) as f64).powf(self.selection_pressure))
            .collect()
    }

    fn spin(rng: &mut fastrand::Rng, weights: &[f64], skip: Option<usize>) -> usize {
        let total: f64 = weights
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != skip)
            .map(|(_, w)| w)
            .sum();
        let mut pick = rng.f64() * total;
        let mut last = 0;
        for (i, w) in weights.iter().enumerate() {
            if Some(i) == skip {
                continue;
            }
            last = i;
            if pick < *w {
                return i;
            }
            pick -= w;
        }
        last
    }

    /// Rank roulette over both tiers: the member at rank `i` of `n` is drawn
    /// with weight `(n - i)^selection_pressure`.
    pub fn select<'a>(&'a self, rng: &mut fastrand::Rng) -> Option<&'a Member> {
        let ranked = self.ranked();
        if ranked.is_empty() {
            return None;
        }
        let weights = self.rank_weights(ranked.len());
        Some(ranked[Self::spin(rng, &weights, None)])
    }

    /// Two distinct members, drawn like `select`.
    pub fn select_pair<'a>(&'a self, rng: &mut fastrand::Rng) -> Option<(&'a Member, &'a Member)> {
        let ranked = self.ranked();
        if ranked.len() < 2 {
            return None;
        }
        let weights = self.rank_weights(ranked.len());
        let a = Self::spin(rng, &weights, None);
        let b = Self::spin(rng, &weights, Some(a));
        Some((ranked[a], ranked[b]))
    }

    pub fn snapshot_elite(&mut self) {
        self.previous_elite = self
            .general
            .iter()
            .take(ELITE_SIZE)
            .map(Member::identity_key)
            .collect();
    }

    /// Metrics for the current epoch. Call after `rerank`, before
    /// `snapshot_elite`.
    pub fn diversity(&self, epoch: usize) -> DiversityMetrics {
        let mut m = DiversityMetrics {
            epoch,
            ..DiversityMetrics::default()
        };
        if self.stats.attempted > 0 {
            let attempted = self.stats.attempted as f64;
            m.acceptance_rate = self.stats.accepted as f64 / attempted;
            m.duplicate_rate = (self.stats.duplicate_population + self.stats.duplicate_history)
                as f64
                / attempted;
        }
        if self.stats.immigrants_ticked > 0 {
            m.immigrant_graduation_rate =
                self.stats.graduated as f64 / self.stats.immigrants_ticked as f64;
        }

        let scores: Vec<f64> = self
            .general
            .iter()
            .filter(|x| x.is_scored())
            .map(Member::score)
            .collect();
        if let (Some(first), Some(last)) = (scores.first(), scores.last()) {
            m.best_score = *first;
            m.worst_score = *last;
            m.median_score = scores[scores.len() / 2];
        }

        if !self.previous_elite.is_empty() {
            let current: Vec<IdentityKey> = self
                .general
                .iter()
                .take(self.previous_elite.len())
                .map(Member::identity_key)
                .collect();
            if !current.is_empty() {
                let changed = current
                    .iter()
                    .filter(|k| !self.previous_elite.contains(k))
                    .count();
                m.elite_turnover = changed as f64 / current.len() as f64;
            }
        } else if !self.general.is_empty() {
            m.elite_turnover = 1.0;
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ga::genome::{Genome, Origin};
    use crate::ga::scoring::FitnessResult;

    fn member(codes: &[&str], tier: Tier, score: Option<f64>) -> Member {
        let mut m = Member::new(
            vec![Genome::new("lunch", codes.iter().copied())],
            Origin::Random,
            tier,
            0,
        );
        if let Some(s) = score {
            m.set_fitness(FitnessResult {
                aggregate: s,
                ..FitnessResult::default()
            });
        }
        m
    }

    fn config(size: usize) -> GaConfig {
        GaConfig {
            population_size: size,
            immigrant_tenure_epochs: 2,
            ..GaConfig::default()
        }
    }

    #[test]
    fn test_ids_and_duplicates() {
        let mut pop = Population::new(&config(10));
        assert!(pop.add_member(member(&["A", "B"], Tier::General, None)));
        assert!(!pop.add_member(member(&["B", "A"], Tier::Immigrant, None)));
        assert!(pop.add_member(member(&["A", "C"], Tier::Immigrant, None)));
        assert_eq!(pop.general()[0].id, "GA-1");
        assert_eq!(pop.immigrants()[0].id, "GA-2");
        assert_eq!(pop.immigrants()[0].tenure, 2);
        assert_eq!(pop.stats().duplicate_population, 1);
    }

    #[test]
    fn test_cull_keeps_best_with_stable_ties() {
        let mut pop = Population::new(&config(2));
        pop.add_member(member(&["A", "B"], Tier::General, Some(1.0)));
        pop.add_member(member(&["A", "C"], Tier::General, Some(2.0)));
        pop.add_member(member(&["A", "D"], Tier::General, Some(1.0)));
        pop.rerank();
        let culled = pop.cull_general();
        assert_eq!(culled.len(), 1);
        assert_eq!(culled[0].id, "GA-3");
        assert_eq!(pop.general()[0].id, "GA-2");
        // Culled identities stay blocked by history.
        assert!(pop.is_duplicate(&culled[0].identity_key()));
    }

    #[test]
    fn test_graduation_after_tenure() {
        let mut pop = Population::new(&config(10));
        pop.add_member(member(&["A", "B"], Tier::Immigrant, Some(0.5)));
        assert_eq!(pop.graduate_immigrants(), 0);
        assert_eq!(pop.graduate_immigrants(), 1);
        assert!(pop.immigrants().is_empty());
        assert_eq!(pop.general()[0].tier, Tier::General);
    }

    #[test]
    fn test_select_pair_is_distinct() {
        let mut pop = Population::new(&config(10));
        pop.add_member(member(&["A", "B"], Tier::General, Some(1.0)));
        pop.add_member(member(&["A", "C"], Tier::Immigrant, Some(0.0)));
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..20 {
            let (a, b) = pop.select_pair(&mut rng).unwrap();
            assert_ne!(a.id, b.id);
        }
    }
}
