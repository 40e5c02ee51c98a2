//! Routing directives: which report goes to which screen
//!
//! A command is a `;`-separated list of `key=screen name` directives, e.g.
//! `coverage=LCD Ingots;missing=LCD Ore`. Keys are case-insensitive and have
//! several synonyms. Screen names are searched on the controller's construct.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use regex::Regex;
use tracing::{debug, warn};

use crate::host::GridHost;
use crate::models::TextSurface;

/// Switch that appends a command to the stored one instead of replacing it.
/// Matched in any letter case.
pub const ADD_SWITCH: &str = "-add";

/// The five reports the controller produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportKind {
    MissingOre,
    IngotCoverage,
    TotalCoverage,
    QueuedItems,
    UnknownRecipes,
}

impl ReportKind {
    pub const ALL: [ReportKind; 5] = [
        ReportKind::MissingOre,
        ReportKind::IngotCoverage,
        ReportKind::TotalCoverage,
        ReportKind::QueuedItems,
        ReportKind::UnknownRecipes,
    ];

    /// Match a directive key. Unrecognized keys yield `None` and are skipped by the caller.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_lowercase().as_str() {
            "missing ore" | "missingore" | "missing" => Some(ReportKind::MissingOre),
            "coverage" => Some(ReportKind::IngotCoverage),
            "totalcoverage" | "total coverage" | "total" => Some(ReportKind::TotalCoverage),
            "queue" | "queued items" | "queueditems" => Some(ReportKind::QueuedItems),
            "missingrecipe" | "unknown" => Some(ReportKind::UnknownRecipes),
            _ => None,
        }
    }

    /// Name used in "displaying on N displays" diagnostics
    pub fn label(self) -> &'static str {
        match self {
            ReportKind::MissingOre => "Missing ore",
            ReportKind::IngotCoverage => "Ingot coverage",
            ReportKind::TotalCoverage => "Ingot + ore coverage",
            ReportKind::QueuedItems => "Queued items",
            ReportKind::UnknownRecipes => "Missing recipes",
        }
    }
}

/// Screens registered for each report kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingTable {
    routes: BTreeMap<ReportKind, BTreeSet<TextSurface>>,
}

impl RoutingTable {
    /// Build a fresh table from a command string.
    ///
    /// Directives without exactly one `=` and directives with an unknown key
    /// are skipped silently. The screen name is searched exactly as written,
    /// surrounding spaces included. A name that matches no text surface on the
    /// controller's construct is echoed as a warning and skipped. Only host
    /// failures are errors.
    pub fn parse<H: GridHost + ?Sized>(command: &str, host: &mut H) -> Result<Self> {
        let mut table = RoutingTable::default();
        let construct = host.controller_construct();

        for directive in command.split(';') {
            let fields: Vec<&str> = directive.split('=').collect();
            let [key, target] = fields.as_slice() else {
                if !directive.trim().is_empty() {
                    debug!(directive, "Skipping malformed directive");
                }
                continue;
            };

            let Some(kind) = ReportKind::from_key(key) else {
                debug!(key = key.trim(), "Ignoring unknown report key");
                continue;
            };

            let target = *target;
            let surfaces: Vec<TextSurface> = if target.is_empty() {
                Vec::new()
            } else {
                host.search_text_surfaces(target)?
                    .into_iter()
                    .filter(|s| s.construct == construct)
                    .collect()
            };

            if surfaces.is_empty() {
                warn!(screen = target, ?kind, "No text surface found for directive");
                host.echo(&format!("No text surface by the name of '{}'", target));
                continue;
            }

            table.routes.entry(kind).or_default().extend(surfaces);
        }

        Ok(table)
    }

    pub fn targets(&self, kind: ReportKind) -> impl Iterator<Item = &TextSurface> {
        self.routes.get(&kind).into_iter().flatten()
    }

    pub fn target_count(&self, kind: ReportKind) -> usize {
        self.routes.get(&kind).map_or(0, BTreeSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// True when the command carries the `-add` switch as its own token.
pub fn has_add_switch(command: &str) -> bool {
    command
        .split_whitespace()
        .any(|token| token.eq_ignore_ascii_case(ADD_SWITCH))
}

/// Append `fragment` to `stored`, removing every literal `-add` from the
/// fragment regardless of case.
pub fn append_fragment(stored: &str, fragment: &str) -> Result<String> {
    let switch = Regex::new(&format!("(?i){}", regex::escape(ADD_SWITCH)))?;
    Ok(format!("{};{}", stored, switch.replace_all(fragment, "")))
}
