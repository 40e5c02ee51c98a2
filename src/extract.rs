//! Recipe extraction from game blueprint definitions
//!
//! Scans the game's `Content/Data` tree for `*.sbc` files and turns every
//! `<Blueprint>` whose prerequisites are all ingots into a recipe line in the
//! registry grammar, ready to be reviewed and pasted into the recipe table.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const INGOT_TYPE: &str = "Ingot";

/// A blueprint reduced to ingots per assembled unit
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRecipe {
    pub blueprint: String,
    pub resources: Vec<(String, f64)>,
}

impl std::fmt::Display for ExtractedRecipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} => ", self.blueprint)?;
        for (i, (ingot, amount)) in self.resources.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}:{}", ingot, amount)?;
        }
        Ok(())
    }
}

struct BlueprintPatterns {
    blueprint: Regex,
    id_element: Regex,
    id_attribute: Regex,
    prerequisites: Regex,
    item: Regex,
    result: Regex,
    attribute: Regex,
}

impl BlueprintPatterns {
    fn new() -> Result<Self> {
        Ok(Self {
            blueprint: Regex::new(r"(?s)<Blueprint\b[^>]*>(.*?)</Blueprint>")?,
            // <Id><TypeId>BlueprintDefinition</TypeId><SubtypeId>X</SubtypeId></Id>
            id_element: Regex::new(r"(?s)<Id>.*?<SubtypeId>\s*([^<\s]+)\s*</SubtypeId>.*?</Id>")?,
            // <Id Type="BlueprintDefinition" Subtype="X" />
            id_attribute: Regex::new(r#"<Id\s[^>]*Subtype="([^"]+)""#)?,
            prerequisites: Regex::new(r"(?s)<Prerequisites>(.*?)</Prerequisites>")?,
            item: Regex::new(r"<Item\b([^>]*?)/?>")?,
            result: Regex::new(r"<Result\b([^>]*?)/?>")?,
            attribute: Regex::new(r#"(\w+)\s*=\s*"([^"]*)""#)?,
        })
    }

    fn attribute<'t>(&self, attributes: &'t str, name: &str) -> Option<&'t str> {
        self.attribute
            .captures_iter(attributes)
            .find(|cap| &cap[1] == name)
            .and_then(|cap| cap.get(2))
            .map(|m| m.as_str())
    }
}

/// Find all `.sbc` definition files under a directory
pub fn find_definition_files(content_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(content_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("sbc"))
        })
        .collect()
}

/// Parse every blueprint in one definition file.
///
/// Blueprints needing anything other than ingots (ore refining, disassembly)
/// are counted as skipped.
fn parse_definitions(
    patterns: &BlueprintPatterns,
    content: &str,
    scale: f64,
    stats: &mut ExtractStats,
) -> Vec<ExtractedRecipe> {
    let mut recipes = Vec::new();

    for cap in patterns.blueprint.captures_iter(content) {
        let body = &cap[1];
        stats.blueprints += 1;

        let Some(blueprint) = patterns
            .id_element
            .captures(body)
            .or_else(|| patterns.id_attribute.captures(body))
            .map(|c| c[1].to_string())
        else {
            stats.skipped += 1;
            continue;
        };

        let Some(prerequisites) = patterns.prerequisites.captures(body) else {
            debug!(%blueprint, "No prerequisites");
            stats.skipped += 1;
            continue;
        };

        // A blueprint producing several units lists the total cost.
        let result_amount = patterns
            .result
            .captures(body)
            .and_then(|c| patterns.attribute(c.get(1)?.as_str(), "Amount"))
            .and_then(|a| a.parse::<f64>().ok())
            .filter(|a| *a > 0.0)
            .unwrap_or(1.0);

        let mut resources = Vec::new();
        let mut all_ingots = true;
        for item in patterns.item.captures_iter(&prerequisites[1]) {
            let attributes = &item[1];
            let type_id = patterns.attribute(attributes, "TypeId").unwrap_or_default();
            let subtype = patterns.attribute(attributes, "SubtypeId");
            let amount = patterns
                .attribute(attributes, "Amount")
                .and_then(|a| a.parse::<f64>().ok());

            match (type_id, subtype, amount) {
                (INGOT_TYPE, Some(subtype), Some(amount)) => {
                    resources.push((subtype.to_string(), round_amount(amount * scale / result_amount)));
                }
                _ => {
                    all_ingots = false;
                    break;
                }
            }
        }

        if !all_ingots || resources.is_empty() {
            debug!(%blueprint, "Not an ingot-only blueprint");
            stats.skipped += 1;
            continue;
        }

        stats.recipes += 1;
        recipes.push(ExtractedRecipe {
            blueprint,
            resources,
        });
    }

    recipes
}

/// Two decimals, the precision of the built-in recipe table
fn round_amount(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Extract ingot recipes from every definition file under `content_dir`, sorted by blueprint.
pub fn extract_recipes(content_dir: &Path, scale: f64) -> Result<(Vec<ExtractedRecipe>, ExtractStats)> {
    let patterns = BlueprintPatterns::new()?;
    let mut stats = ExtractStats::default();
    let mut recipes = Vec::new();

    info!(dir = %content_dir.display(), "Scanning for blueprint definitions");
    let files = find_definition_files(content_dir);
    info!(count = files.len(), "Found definition files");

    for path in &files {
        match fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display())) {
            Ok(content) => {
                stats.files += 1;
                recipes.extend(parse_definitions(&patterns, &content, scale, &mut stats));
            }
            Err(e) => {
                warn!("{:#}", e);
                stats.errors += 1;
            }
        }
    }

    recipes.sort_by(|a, b| a.blueprint.cmp(&b.blueprint));
    Ok((recipes, stats))
}

#[derive(Debug, Default, PartialEq)]
pub struct ExtractStats {
    pub files: usize,
    pub blueprints: usize,
    pub recipes: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl std::fmt::Display for ExtractStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Read {} files, {} blueprints: {} ingot recipes. Skipped: {}, Errors: {}",
            self.files, self.blueprints, self.recipes, self.skipped, self.errors
        )
    }
}
