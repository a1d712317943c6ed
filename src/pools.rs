//! Component pool resolution: `@pool` references, `PREFIX.` patterns and
//! code validation, flattened once per run into plain code lists.

use crate::codes::{is_prefix_pattern, normalize};
use crate::config::CodeSpec;
use crate::food::FoodResolver;
use fnv::FnvHashSet;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Most `@reference` hops followed from one pool. Deeper references are
/// dropped.
pub const MAX_REFERENCE_DEPTH: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolWarning {
    NotAList { pool: String },
    UnknownReference { pool: String, reference: String },
    UnresolvedReference { pool: String, reference: String },
    ReferenceCycle { pool: String, reference: String },
    PatternNoMatch { pool: String, pattern: String },
    UnknownCode { pool: String, code: String },
    DuplicateCode { pool: String, code: String },
    EmptyPool { pool: String },
}

impl fmt::Display for PoolWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolWarning::NotAList { pool } => write!(f, "pool '{}' is not a list, skipping", pool),
            PoolWarning::UnknownReference { pool, reference } => {
                write!(f, "pool '{}' references unknown pool '@{}'", pool, reference)
            }
            PoolWarning::UnresolvedReference { pool, reference } => write!(
                f,
                "pool '{}': '@{}' is more than {} references deep, dropped",
                pool, reference, MAX_REFERENCE_DEPTH
            ),
            PoolWarning::ReferenceCycle { pool, reference } => write!(
                f,
                "pool '{}': '@{}' closes a reference cycle, dropped",
                pool, reference
            ),
            PoolWarning::PatternNoMatch { pool, pattern } => {
                write!(f, "pool '{}': pattern '{}' matched no codes", pool, pattern)
            }
            PoolWarning::UnknownCode { pool, code } => {
                write!(f, "pool '{}': unknown code '{}' dropped", pool, code)
            }
            PoolWarning::DuplicateCode { pool, code } => {
                write!(f, "pool '{}': duplicate code '{}' dropped", pool, code)
            }
            PoolWarning::EmptyPool { pool } => {
                write!(f, "pool '{}' is empty after resolution, omitted", pool)
            }
        }
    }
}

/// Flat, validated pools. Read-only for the rest of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedPools {
    pools: BTreeMap<String, Vec<String>>,
}

impl ResolvedPools {
    pub fn from_map(pools: BTreeMap<String, Vec<String>>) -> Self {
        Self { pools }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.pools.get(name).map(|v| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.pools.iter()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Expands a group spec into normalized codes. `pool:<name>` entries
    /// pull in that pool; unknown pools expand to nothing.
    pub fn expand_spec(&self, spec: &CodeSpec) -> Vec<String> {
        let raw: Vec<&str> = match spec {
            CodeSpec::One(s) => vec![s.as_str()],
            CodeSpec::Many(v) => v.iter().map(|s| s.as_str()).collect(),
        };
        let mut out = Vec::new();
        for entry in raw {
            match entry.trim().strip_prefix("pool:") {
                Some(name) => match self.get(name.trim()) {
                    Some(codes) => out.extend(codes.iter().cloned()),
                    None => warn!("Group references unknown pool '{}'", name.trim()),
                },
                None => out.push(normalize(entry)),
            }
        }
        out.sort();
        out.dedup();
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct PoolResolution {
    pub pools: ResolvedPools,
    pub warnings: Vec<PoolWarning>,
}

fn reference_of(item: &str) -> Option<&str> {
    item.trim().strip_prefix('@').map(str::trim)
}

/// Depth-first `@reference` expansion for one root pool. Each pool is
/// pasted in at most once per root, so repeated or cyclic references
/// cannot grow the result. A reference back into the current path is a
/// cycle and is dropped with a warning.
struct ReferenceWalk<'a, 'w> {
    pools: &'a BTreeMap<String, Vec<String>>,
    visited: FnvHashSet<&'a str>,
    path: Vec<&'a str>,
    warnings: &'w mut Vec<PoolWarning>,
}

impl<'a> ReferenceWalk<'a, '_> {
    fn warn_once(&mut self, warning: PoolWarning) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    fn visit(&mut self, name: &'a str, out: &mut Vec<String>) {
        let pools = self.pools;
        let Some(items) = pools.get(name) else {
            return;
        };
        self.visited.insert(name);
        self.path.push(name);
        for item in items {
            let Some(target) = reference_of(item) else {
                out.push(item.clone());
                continue;
            };
            if self.path.contains(&target) {
                self.warn_once(PoolWarning::ReferenceCycle {
                    pool: name.to_string(),
                    reference: target.to_string(),
                });
            } else if self.visited.contains(&target) {
                debug!("pool '{}': '@{}' already expanded", name, target);
            } else if !pools.contains_key(target) {
                self.warn_once(PoolWarning::UnknownReference {
                    pool: name.to_string(),
                    reference: target.to_string(),
                });
            } else if self.path.len() > MAX_REFERENCE_DEPTH {
                self.warn_once(PoolWarning::UnresolvedReference {
                    pool: name.to_string(),
                    reference: target.to_string(),
                });
            } else {
                self.visit(target, out);
            }
        }
        self.path.pop();
    }
}

/// Resolves the configured pools against the food index. Never fails:
/// every data-quality problem becomes a [`PoolWarning`].
pub fn resolve_pools<F>(config: &Map<String, Value>, foods: &F) -> PoolResolution
where
    F: FoodResolver + ?Sized,
{
    let mut warnings = Vec::new();

    // 1. Literal lists
    let mut working: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in config {
        if name.starts_with('_') {
            continue;
        }
        match value.as_array() {
            Some(items) => {
                let list = items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                working.insert(name.clone(), list);
            }
            None => warnings.push(PoolWarning::NotAList { pool: name.clone() }),
        }
    }

    // 2. References
    let expanded: BTreeMap<String, Vec<String>> = working
        .keys()
        .map(|name| {
            let mut out = Vec::new();
            let mut walk = ReferenceWalk {
                pools: &working,
                visited: FnvHashSet::default(),
                path: Vec::new(),
                warnings: &mut warnings,
            };
            walk.visit(name, &mut out);
            (name.clone(), out)
        })
        .collect();

    // 3. Patterns, 4. validation
    let index = foods.sorted_codes();
    let mut resolved = BTreeMap::new();
    for (name, items) in expanded {
        let mut seen: FnvHashSet<String> = FnvHashSet::default();
        let mut codes = Vec::with_capacity(items.len());
        let mut accept = |code: String, warnings: &mut Vec<PoolWarning>| {
            if !foods.contains(&code) {
                warnings.push(PoolWarning::UnknownCode {
                    pool: name.clone(),
                    code,
                });
            } else if !seen.insert(code.clone()) {
                warnings.push(PoolWarning::DuplicateCode {
                    pool: name.clone(),
                    code,
                });
            } else {
                codes.push(code);
            }
        };

        for item in items {
            if is_prefix_pattern(&item) {
                let prefix = normalize(item.trim().trim_end_matches('*'));
                let start = index.partition_point(|c| c.as_str() < prefix.as_str());
                let matched: Vec<String> = index[start..]
                    .iter()
                    .take_while(|c| c.starts_with(prefix.as_str()))
                    .cloned()
                    .collect();
                if matched.is_empty() {
                    warnings.push(PoolWarning::PatternNoMatch {
                        pool: name.clone(),
                        pattern: item.clone(),
                    });
                }
                for code in matched {
                    accept(code, &mut warnings);
                }
            } else {
                accept(normalize(&item), &mut warnings);
            }
        }

        if codes.is_empty() {
            warnings.push(PoolWarning::EmptyPool { pool: name.clone() });
        } else {
            resolved.insert(name, codes);
        }
    }

    for w in &warnings {
        warn!("{}", w);
    }

    PoolResolution {
        pools: ResolvedPools::from_map(resolved),
        warnings,
    }
}
