use super::selection::SlotSelections;
use crate::codes::base_code;
use crate::pools::ResolvedPools;
use crate::template::{ComponentSlot, GenerationTemplate};
use fnv::FnvHashSet;
use tracing::warn;

/// A template slot bound to its resolved pool.
#[derive(Debug, Clone)]
pub struct ActiveSlot {
    pub slot: ComponentSlot,
    pub pool: Vec<String>,
    pub selections: SlotSelections,
}

/// The Cartesian product of every active slot's selections. Position `r`
/// is decoded mixed-radix with the last slot varying fastest.
#[derive(Debug, Clone)]
pub struct CandidateSpace {
    slots: Vec<ActiveSlot>,
    raw_len: u128,
    max_total: Option<usize>,
    base_unique: bool,
}

/// One point of the space: per active slot, the chosen codes.
pub type Combination<'a> = Vec<(&'a ActiveSlot, Vec<&'a str>)>;

impl CandidateSpace {
    /// Binds template slots to pools. A slot whose pool is missing or empty
    /// is skipped with a warning, which is returned alongside.
    pub fn new(template: &GenerationTemplate, pools: &ResolvedPools) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        let mut slots = Vec::new();
        for slot in &template.slots {
            let pool = match pools.get(&slot.pool_ref) {
                Some(p) if !p.is_empty() => p.to_vec(),
                Some(_) => {
                    warnings.push(format!(
                        "pool '{}' for component '{}' is empty, skipping component",
                        slot.pool_ref, slot.name
                    ));
                    continue;
                }
                None => {
                    warnings.push(format!(
                        "pool '{}' referenced by component '{}' not found, skipping component",
                        slot.pool_ref, slot.name
                    ));
                    continue;
                }
            };
            let selections = SlotSelections::new(pool.len(), slot.effective_min(), slot.max);
            slots.push(ActiveSlot {
                slot: slot.clone(),
                pool,
                selections,
            });
        }
        for w in &warnings {
            warn!("{}/{}: {}", template.meal_type, template.name, w);
        }

        let raw_len = if slots.is_empty() {
            0
        } else {
            slots
                .iter()
                .fold(1u128, |acc, s| acc.saturating_mul(s.selections.len()))
        };

        (
            Self {
                slots,
                raw_len,
                max_total: template.max_total_components,
                base_unique: template.base_code_uniqueness,
            },
            warnings,
        )
    }

    pub fn slots(&self) -> &[ActiveSlot] {
        &self.slots
    }

    /// Size of the unconstrained product.
    pub fn raw_len(&self) -> u128 {
        self.raw_len
    }

    /// True when every raw position is a valid combination.
    pub fn is_unconstrained(&self) -> bool {
        self.max_total.is_none() && !self.base_unique
    }

    fn digits(&self, mut raw: u128) -> Vec<u128> {
        let mut digits = vec![0u128; self.slots.len()];
        for (i, s) in self.slots.iter().enumerate().rev() {
            let radix = s.selections.len();
            digits[i] = raw % radix;
            raw /= radix;
        }
        digits
    }

    /// Decodes raw position `raw` without applying constraints.
    pub fn combination_at(&self, raw: u128) -> Combination<'_> {
        self.digits(raw)
            .into_iter()
            .zip(self.slots.iter())
            .map(|(d, s)| {
                let codes = s
                    .selections
                    .selection_at(d)
                    .into_iter()
                    .map(|i| s.pool[i].as_str())
                    .collect();
                (s, codes)
            })
            .collect()
    }

    /// Template-level constraints. Size is checked from the digits before
    /// any codes are decoded.
    pub fn accepts(&self, raw: u128) -> bool {
        if self.is_unconstrained() {
            return true;
        }
        let digits = self.digits(raw);
        if let Some(limit) = self.max_total {
            let total: usize = digits
                .iter()
                .zip(self.slots.iter())
                .map(|(&d, s)| s.selections.size_at(d))
                .sum();
            if total > limit {
                return false;
            }
        }
        if self.base_unique {
            let mut seen: FnvHashSet<&str> = FnvHashSet::default();
            for (&d, s) in digits.iter().zip(self.slots.iter()) {
                for i in s.selections.selection_at(d) {
                    if !seen.insert(base_code(&s.pool[i])) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Raw position of the `cursor`-th valid combination, skipping lazily.
    /// Unconstrained spaces jump straight there.
    pub fn raw_position(&self, cursor: u64) -> Option<u128> {
        if self.is_unconstrained() {
            let raw = cursor as u128;
            return (raw < self.raw_len).then_some(raw);
        }
        let mut seen: u64 = 0;
        let mut raw = 0u128;
        while raw < self.raw_len {
            if self.accepts(raw) {
                if seen == cursor {
                    return Some(raw);
                }
                seen += 1;
            }
            raw += 1;
        }
        None
    }

    /// Valid combinations starting at the `cursor`-th one.
    pub fn iter_from(&self, cursor: u64) -> SpaceIter<'_> {
        let next_raw = self.raw_position(cursor).unwrap_or(self.raw_len);
        SpaceIter {
            space: self,
            next_raw,
        }
    }

    /// Exact number of valid combinations.
    pub fn count_valid(&self) -> u128 {
        if self.is_unconstrained() {
            return self.raw_len;
        }
        (0..self.raw_len).filter(|&r| self.accepts(r)).count() as u128
    }
}

pub struct SpaceIter<'a> {
    space: &'a CandidateSpace,
    next_raw: u128,
}

impl<'a> Iterator for SpaceIter<'a> {
    type Item = Combination<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_raw < self.space.raw_len {
            let raw = self.next_raw;
            self.next_raw += 1;
            if self.space.accepts(raw) {
                return Some(self.space.combination_at(raw));
            }
        }
        None
    }
}
