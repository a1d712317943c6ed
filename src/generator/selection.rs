//! Per-slot selection sequences addressed by rank.
//!
//! A slot with pool size `n` and count range `[lo, hi]` owns the virtual
//! sequence of every `lo`-combination of the pool in lexicographic order,
//! then every `lo+1`-combination, up to `hi`. Any position in it decodes
//! directly, so nothing is materialized.

/// `C(n, k)`, saturating at `u128::MAX`.
pub fn binomial(n: usize, k: usize) -> u128 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        // acc * (n - i) / (i + 1) stays integral at every step
        acc = match acc.checked_mul((n - i) as u128) {
            Some(v) => v / (i as u128 + 1),
            None => return u128::MAX,
        };
    }
    acc
}

/// Decodes the `rank`-th k-combination of `0..n` in lexicographic order.
pub fn unrank_combination(n: usize, k: usize, mut rank: u128) -> Vec<usize> {
    let mut out = Vec::with_capacity(k);
    let mut x = 0;
    for i in 0..k {
        loop {
            let remaining = binomial(n - x - 1, k - i - 1);
            if rank < remaining {
                out.push(x);
                x += 1;
                break;
            }
            rank -= remaining;
            x += 1;
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotSelections {
    pool_len: usize,
    /// (selection size, number of selections of that size)
    blocks: Vec<(usize, u128)>,
    len: u128,
}

impl SlotSelections {
    pub fn new(pool_len: usize, lo: usize, hi: usize) -> Self {
        let mut blocks = Vec::new();
        let mut len: u128 = 0;
        for k in lo..=hi {
            let count = binomial(pool_len, k);
            if count == 0 {
                continue;
            }
            blocks.push((k, count));
            len = len.saturating_add(count);
        }
        Self {
            pool_len,
            blocks,
            len,
        }
    }

    pub fn len(&self) -> u128 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn locate(&self, mut idx: u128) -> (usize, u128) {
        for &(k, count) in &self.blocks {
            if idx < count {
                return (k, idx);
            }
            idx -= count;
        }
        // Callers stay below len(); clamp to the final element otherwise.
        match self.blocks.last() {
            Some(&(k, count)) => (k, count - 1),
            None => (0, 0),
        }
    }

    /// Number of items in the selection at `idx`.
    pub fn size_at(&self, idx: u128) -> usize {
        self.locate(idx).0
    }

    /// Pool indices (ascending) of the selection at `idx`.
    pub fn selection_at(&self, idx: u128) -> Vec<usize> {
        let (k, rank) = self.locate(idx);
        unrank_combination(self.pool_len, k, rank)
    }
}
