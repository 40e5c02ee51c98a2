//! Text reports and their delivery to screens

use anyhow::Result;
use tracing::debug;

use crate::calculator::Coverage;
use crate::command::{ReportKind, RoutingTable};
use crate::host::GridHost;
use crate::inventory::QueuedItems;
use crate::models::ContentType;
use crate::recipes::RecipeRegistry;

/// Ore still to be mined, rounded up to whole kg. Fully covered ingots are left out.
pub fn format_missing_ore(coverages: &[Coverage]) -> String {
    let mut output = String::from("Missing Ore:\n");
    for coverage in coverages {
        let missing = coverage.missing_ore().ceil();
        if missing != 0.0 {
            output.push_str(&format!("---{}: {}kg\n", coverage.ingot, missing));
        }
    }
    output
}

pub fn format_ingot_coverage(coverages: &[Coverage]) -> String {
    let mut output = String::from("Ingot Coverage:\n");
    for coverage in coverages {
        output.push_str(&format!(
            "---{}: {}\n",
            coverage.ingot,
            format_percent(coverage.ingot_coverage())
        ));
    }
    output
}

pub fn format_total_coverage(coverages: &[Coverage]) -> String {
    let mut output = String::from("Ingot + Ore Coverage:\n");
    for coverage in coverages {
        output.push_str(&format!(
            "---{}: {}\n",
            coverage.ingot,
            format_percent(coverage.total_coverage())
        ));
    }
    output
}

pub fn format_queued_items(queued: &QueuedItems) -> String {
    let mut output = String::from("Queued Items:\n");
    for (item, count) in queued.iter() {
        output.push_str(&format!("---{}: {}\n", item, count));
    }
    output
}

/// Queued items with no recipe, in queue order
pub fn format_unknown_recipes(queued: &QueuedItems, registry: &RecipeRegistry) -> String {
    let mut output = String::from("Unknown recipes:\n");
    for (item, _) in queued.iter().filter(|(item, _)| !registry.contains(item)) {
        output.push_str(item);
        output.push('\n');
    }
    output
}

fn format_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Every report body for one cycle, in [`ReportKind::ALL`] order
pub fn build_reports(
    coverages: &[Coverage],
    queued: &QueuedItems,
    registry: &RecipeRegistry,
) -> Vec<(ReportKind, String)> {
    ReportKind::ALL
        .into_iter()
        .map(|kind| {
            let body = match kind {
                ReportKind::MissingOre => format_missing_ore(coverages),
                ReportKind::IngotCoverage => format_ingot_coverage(coverages),
                ReportKind::TotalCoverage => format_total_coverage(coverages),
                ReportKind::QueuedItems => format_queued_items(queued),
                ReportKind::UnknownRecipes => format_unknown_recipes(queued, registry),
            };
            (kind, body)
        })
        .collect()
}

/// Write a report to every screen routed for it, or echo it when none are.
///
/// Returns the number of screens written.
pub fn deliver<H: GridHost + ?Sized>(
    host: &mut H,
    routes: &RoutingTable,
    kind: ReportKind,
    body: &str,
) -> Result<usize> {
    let count = routes.target_count(kind);
    if count == 0 {
        host.echo(&format!("{}\n", body));
        return Ok(0);
    }

    for surface in routes.targets(kind) {
        debug!(surface = %surface.name, ?kind, "Writing report");
        host.write_text(surface.id, ContentType::TextAndImage, body)?;
    }
    host.echo(&format!("{} displaying on {} displays.", kind.label(), count));
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::{HOME, MemoryHost};
    use crate::recipes::registry;

    fn queued(entries: &[(&str, i64)]) -> QueuedItems {
        let mut queued = QueuedItems::default();
        for (item, count) in entries {
            queued.add(item, *count);
        }
        queued
    }

    #[test]
    fn test_missing_ore_rounds_up_and_skips_covered() {
        let coverages = vec![
            Coverage::new("Gold", 1.0, 5.0, 0.0),
            Coverage::new("Iron", 20.0, 0.0, 0.0),
            Coverage::new("Nickel", 10.0, 9.5, 0.0),
        ];
        assert_eq!(
            format_missing_ore(&coverages),
            "Missing Ore:\n---Iron: 15kg\n---Nickel: 1kg\n"
        );
    }

    #[test]
    fn test_coverage_percentages() {
        let coverages = vec![
            Coverage::new("Gold", 1.0, 0.0, 0.0),
            Coverage::new("Iron", 10.0, 5.0, 25.0),
            Coverage::new("Silver", 3.0, 1.0, 0.0),
        ];
        assert_eq!(
            format_ingot_coverage(&coverages),
            "Ingot Coverage:\n---Gold: 0.0%\n---Iron: 50.0%\n---Silver: 33.3%\n"
        );
        assert_eq!(
            format_total_coverage(&coverages),
            "Ingot + Ore Coverage:\n---Gold: 0.0%\n---Iron: 100.0%\n---Silver: 33.3%\n"
        );
    }

    #[test]
    fn test_queue_reports_keep_queue_order() {
        let queued = queued(&[("SteelPlate", 40), ("ThrustComponent", 2), ("Motor", 6)]);
        assert_eq!(
            format_queued_items(&queued),
            "Queued Items:\n---SteelPlate: 40\n---ThrustComponent: 2\n---Motor: 6\n"
        );
        assert_eq!(
            format_unknown_recipes(&queued, registry()),
            "Unknown recipes:\nSteelPlate\nMotor\n"
        );
    }

    #[test]
    fn test_empty_reports_are_headers_only() {
        let reports = build_reports(&[], &QueuedItems::default(), registry());
        let bodies: Vec<&str> = reports.iter().map(|(_, body)| body.as_str()).collect();
        assert_eq!(
            bodies,
            vec![
                "Missing Ore:\n",
                "Ingot Coverage:\n",
                "Ingot + Ore Coverage:\n",
                "Queued Items:\n",
                "Unknown recipes:\n",
            ]
        );
    }

    #[test]
    fn test_deliver_writes_routed_screens() {
        let mut host = MemoryHost::new()
            .with_surface(10, "LCD Ore", HOME)
            .with_surface(11, "LCD Ore 2", HOME);
        let routes = RoutingTable::parse("missing=LCD Ore", &mut host).unwrap();

        let written = deliver(&mut host, &routes, ReportKind::MissingOre, "Missing Ore:\n").unwrap();

        assert_eq!(written, 2);
        assert_eq!(host.screen(10), Some("Missing Ore:\n"));
        assert_eq!(host.screen(11), Some("Missing Ore:\n"));
        assert_eq!(host.screens[&10].0, ContentType::TextAndImage);
        assert_eq!(host.echoes, vec!["Missing ore displaying on 2 displays."]);
    }

    #[test]
    fn test_deliver_falls_back_to_echo() {
        let mut host = MemoryHost::new();
        let routes = RoutingTable::default();

        let written =
            deliver(&mut host, &routes, ReportKind::QueuedItems, "Queued Items:\n").unwrap();

        assert_eq!(written, 0);
        assert!(host.screens.is_empty());
        assert_eq!(host.echoes, vec!["Queued Items:\n\n"]);
    }
}
