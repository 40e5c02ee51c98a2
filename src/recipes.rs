//! Static recipe data: ore refining yields and assembler recipes
//!
//! Both tables are process-wide constants. Recipes are written in a compact
//! `Ingot:Amount,Ingot:Amount` grammar and parsed once on first use.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::inventory::QueuedItems;

/// kg of ingot produced per kg of ore, keyed by ingot name.
pub const ORE_EFFICIENCY: &[(&str, f64)] = &[
    ("Gold", 0.02),
    ("Platinum", 0.1),
    ("Stone", 0.014),
    ("Iron", 1.4),
    ("Silicon", 1.4),
    ("Nickel", 0.8),
    ("Cobalt", 0.6),
    ("Silver", 0.2),
    ("Uranium", 0.02),
    ("Magnesium", 0.014),
];

// Amounts are a third of the survival values, rounded to 2 decimals.
const RECIPE_TEXT: &[(&str, &str)] = &[
    ("ThrustComponent", "Iron:10,Cobalt:3.33,Gold:0.33,Platinum:0.13"),
    ("BulletproofGlass", "Silicon:1.66"),
    ("Computer", "Iron:0.06,Silicon:0.02"),
    ("ConstructionComponent", "Iron:0.9"),
    ("DetectorComponent", "Iron:0.56,Nickel:1.67"),
    (
        "Missile200mm",
        "Iron:18.33,Nickel:2.33,Silicon:0.07,Uranium:0.03,Platinum:0.01,Magnesium:0.4",
    ),
    ("ReactorComponent", "Iron:5,Gravel:6.67,Silver:1.67"),
];

static REGISTRY: LazyLock<RecipeRegistry> = LazyLock::new(|| {
    RecipeRegistry::from_entries(RECIPE_TEXT.iter().copied())
});

/// Refining yield for an ingot, if the ingot is known
pub fn ore_yield(ingot: &str) -> Option<f64> {
    ORE_EFFICIENCY
        .iter()
        .find(|(name, _)| *name == ingot)
        .map(|(_, efficiency)| *efficiency)
}

/// The built-in recipe registry
pub fn registry() -> &'static RecipeRegistry {
    &REGISTRY
}

/// One ingot requirement of a recipe
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub ingot: String,
    pub amount: f64,
}

/// Ingots needed to assemble one unit of an item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recipe {
    resources: Vec<Resource>,
}

impl Recipe {
    /// Parse `Name:Amount,Name:Amount,...`.
    ///
    /// Never fails. Entries with the wrong number of fields, an ingot missing
    /// from [`ORE_EFFICIENCY`], or an amount that is not a positive number are
    /// skipped and the rest of the list is kept.
    pub fn parse(text: &str) -> Self {
        let resources = text
            .split(',')
            .filter_map(|entry| {
                let fields: Vec<&str> = entry.split(':').collect();
                let [name, amount] = fields.as_slice() else {
                    return None;
                };
                let name = name.trim();
                ore_yield(name)?;
                let amount: f64 = amount.trim().parse().ok()?;
                if amount <= 0.0 || !amount.is_finite() {
                    return None;
                }
                Some(Resource {
                    ingot: name.to_string(),
                    amount,
                })
            })
            .collect();

        Self { resources }
    }

    /// Ingots needed to assemble `count` units, scaled linearly.
    pub fn resources_needed(&self, count: i64) -> HashMap<String, f64> {
        let mut needed = HashMap::new();
        for resource in &self.resources {
            *needed.entry(resource.ingot.clone()).or_default() += resource.amount * count as f64;
        }
        needed
    }
}

impl std::fmt::Display for Recipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, resource) in self.resources.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}:{}", resource.ingot, resource.amount)?;
        }
        Ok(())
    }
}

/// Crafted item name to recipe
#[derive(Debug, Default)]
pub struct RecipeRegistry {
    recipes: HashMap<String, Recipe>,
}

impl RecipeRegistry {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let recipes = entries
            .into_iter()
            .map(|(item, text)| (item.to_string(), Recipe::parse(text)))
            .collect();
        Self { recipes }
    }

    /// Look up a recipe. `None` means the recipe is unknown, which is reported, not an error.
    pub fn get(&self, item: &str) -> Option<&Recipe> {
        self.recipes.get(item)
    }

    pub fn contains(&self, item: &str) -> bool {
        self.recipes.contains_key(item)
    }

    /// All entries sorted by item name
    pub fn sorted(&self) -> Vec<(&str, &Recipe)> {
        let mut entries: Vec<_> = self
            .recipes
            .iter()
            .map(|(item, recipe)| (item.as_str(), recipe))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Total ingots needed to assemble everything queued. Items without a recipe are skipped.
    pub fn needed_ingots(&self, queued: &QueuedItems) -> HashMap<String, f64> {
        let mut total: HashMap<String, f64> = HashMap::new();
        for (item, count) in queued.iter() {
            let Some(recipe) = self.get(item) else {
                continue;
            };
            for (ingot, amount) in recipe.resources_needed(count) {
                *total.entry(ingot).or_default() += amount;
            }
        }
        total
    }
}
