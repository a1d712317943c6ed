use crate::codes::normalize;
use crate::error::MfResult;
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{AsRefStr, Display, EnumCount as EnumCountMacro, EnumIter, EnumString};
use tracing::{debug, warn};

/// Nutrients the engine can total, constrain and score. The string form is
/// the key used in template targets and scoring weights.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    EnumCountMacro,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum Nutrient {
    Calories,
    Protein,
    Carbs,
    Fat,
    Fiber,
    Sugar,
    Gl,
}

impl Nutrient {
    /// Column name in the food table.
    pub fn column(self) -> &'static str {
        match self {
            Nutrient::Calories => "cal",
            Nutrient::Protein => "prot_g",
            Nutrient::Carbs => "carbs_g",
            Nutrient::Fat => "fat_g",
            Nutrient::Fiber => "fiber_g",
            Nutrient::Sugar => "sugar_g",
            Nutrient::Gl => "GL",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Nutrient::Calories | Nutrient::Gl => "",
            _ => "g",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        key.trim().parse().ok()
    }
}

/// Fixed-size nutrient vector indexed by [`Nutrient`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientVector {
    values: [f64; Nutrient::COUNT],
}

impl NutrientVector {
    pub fn get(&self, n: Nutrient) -> f64 {
        self.values[n as usize]
    }

    pub fn set(&mut self, n: Nutrient, value: f64) {
        self.values[n as usize] = value;
    }

    pub fn with(mut self, n: Nutrient, value: f64) -> Self {
        self.set(n, value);
        self
    }

    pub fn add_scaled(&mut self, other: &NutrientVector, mult: f64) {
        for (acc, v) in self.values.iter_mut().zip(other.values.iter()) {
            *acc += v * mult;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Nutrient, f64)> + '_ {
        Nutrient::iter().map(move |n| (n, self.get(n)))
    }
}

/// Immutable nutrient record for one food code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEntry {
    pub code: String,
    pub name: String,
    pub nutrients: NutrientVector,
    pub glycemic_index: Option<f64>,
}

impl FoodEntry {
    pub fn new(code: &str, name: &str, nutrients: NutrientVector) -> Self {
        Self {
            code: normalize(code),
            name: name.to_string(),
            nutrients,
            glycemic_index: None,
        }
    }
}

/// Read-only food lookup consumed by the pool resolver, the filters and
/// the fitness scorer. Codes passed in are normalized.
pub trait FoodResolver {
    fn lookup(&self, code: &str) -> Option<&FoodEntry>;

    /// All known codes, sorted ascending.
    fn sorted_codes(&self) -> &[String];

    fn contains(&self, code: &str) -> bool {
        self.lookup(code).is_some()
    }
}

/// Sums `nutrient × multiplier` over items. Unknown codes contribute nothing.
pub fn sum_nutrients<'a, I, F>(items: I, foods: &F) -> NutrientVector
where
    I: IntoIterator<Item = (&'a str, f64)>,
    F: FoodResolver + ?Sized,
{
    let mut totals = NutrientVector::default();
    for (code, mult) in items {
        match foods.lookup(code) {
            Some(entry) => totals.add_scaled(&entry.nutrients, mult),
            None => debug!("No food entry for {}, contributing zero", code),
        }
    }
    totals
}

#[derive(Debug, Deserialize)]
struct FoodRow {
    code: String,
    #[serde(default)]
    option: Option<String>,
    #[serde(default)]
    cal: Option<f64>,
    #[serde(default)]
    prot_g: Option<f64>,
    #[serde(default)]
    carbs_g: Option<f64>,
    #[serde(default)]
    fat_g: Option<f64>,
    #[serde(default)]
    fiber_g: Option<f64>,
    #[serde(default)]
    sugar_g: Option<f64>,
    #[serde(default, rename = "GI")]
    gi: Option<f64>,
    #[serde(default, rename = "GL")]
    gl: Option<f64>,
}

impl From<FoodRow> for FoodEntry {
    fn from(row: FoodRow) -> Self {
        let nutrients = NutrientVector::default()
            .with(Nutrient::Calories, row.cal.unwrap_or(0.0))
            .with(Nutrient::Protein, row.prot_g.unwrap_or(0.0))
            .with(Nutrient::Carbs, row.carbs_g.unwrap_or(0.0))
            .with(Nutrient::Fat, row.fat_g.unwrap_or(0.0))
            .with(Nutrient::Fiber, row.fiber_g.unwrap_or(0.0))
            .with(Nutrient::Sugar, row.sugar_g.unwrap_or(0.0))
            .with(Nutrient::Gl, row.gl.unwrap_or(0.0));
        let mut entry = FoodEntry::new(&row.code, row.option.as_deref().unwrap_or(""), nutrients);
        entry.glycemic_index = row.gi;
        entry
    }
}

/// In-memory food database with a sorted code index.
#[derive(Debug, Clone, Default)]
pub struct FoodTable {
    entries: FnvHashMap<String, FoodEntry>,
    index: Vec<String>,
}

impl FoodTable {
    pub fn from_entries<I: IntoIterator<Item = FoodEntry>>(entries: I) -> Self {
        let mut map = FnvHashMap::default();
        for mut e in entries {
            e.code = normalize(&e.code);
            if map.contains_key(&e.code) {
                warn!("Duplicate food code {} (later row wins)", e.code);
            }
            map.insert(e.code.clone(), e);
        }
        let mut index: Vec<String> = map.keys().cloned().collect();
        index.sort();
        Self {
            entries: map,
            index,
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> MfResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let mut rows = Vec::new();
        for record in rdr.deserialize::<FoodRow>() {
            let row = record?;
            if row.code.trim().is_empty() {
                continue;
            }
            rows.push(FoodEntry::from(row));
        }
        Ok(Self::from_entries(rows))
    }

    pub fn load_csv<P: AsRef<Path>>(path: P) -> MfResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FoodResolver for FoodTable {
    fn lookup(&self, code: &str) -> Option<&FoodEntry> {
        match self.entries.get(code) {
            Some(e) => Some(e),
            None => self.entries.get(&normalize(code)),
        }
    }

    fn sorted_codes(&self) -> &[String] {
        &self.index
    }
}
