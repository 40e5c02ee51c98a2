//! The tracker program: command handling and the per-run evaluation cycle

use anyhow::Result;
use tracing::{debug, info};

use crate::calculator::calculate_coverage;
use crate::command::{RoutingTable, append_fragment, has_add_switch};
use crate::host::{GridHost, ProgramStorage};
use crate::inventory::{collect_inventory, collect_queued_items};
use crate::models::{ContentType, Trigger};
use crate::recipes::registry;
use crate::report;

/// Long-lived program state: the stored command and the routes built from it
#[derive(Debug, Default)]
pub struct Controller {
    stored: String,
    routes: RoutingTable,
}

impl Controller {
    /// Read the storage slot and rebuild routes from it.
    pub fn start<H: GridHost + ProgramStorage>(host: &mut H) -> Result<Self> {
        let stored = host.load()?;
        let mut controller = Self::default();
        controller.apply_command(host, &stored)?;
        if controller.routes.is_empty() {
            info!("No report routes configured; reports go to echo");
        }
        info!(command = %controller.stored, "Controller started");
        Ok(controller)
    }

    /// Handle an operator command.
    ///
    /// `update` reparses the stored command. `output` writes the stored command
    /// to the controller's own screen and leaves the routes alone. With `-add`
    /// the command is appended to the stored one. Anything else replaces it.
    pub fn apply_command<H: GridHost + ProgramStorage>(
        &mut self,
        host: &mut H,
        argument: &str,
    ) -> Result<()> {
        let mut command = argument.to_string();
        if command.trim().eq_ignore_ascii_case("update") {
            command = self.stored.clone();
        }

        if command.trim().eq_ignore_ascii_case("output") {
            host.write_controller_text(ContentType::None, &self.stored)?;
            return Ok(());
        }

        if has_add_switch(&command) {
            command = append_fragment(&self.stored, &command)?;
        }

        self.routes = RoutingTable::parse(&command, host)?;
        debug!(command = %command, "Routes rebuilt");

        self.stored = command;
        host.save(&self.stored)?;
        Ok(())
    }

    /// One invocation by the host: take the argument if it is new, then report.
    pub fn run<H: GridHost + ProgramStorage>(
        &mut self,
        host: &mut H,
        argument: &str,
        trigger: Trigger,
    ) -> Result<CycleStats> {
        debug!(?trigger, argument, "Controller invoked");

        if !argument.trim().is_empty() && argument != self.stored {
            self.apply_command(host, argument)?;
        }

        self.evaluate(host)
    }

    /// Rebuild every total from the grid and deliver the five reports.
    fn evaluate<H: GridHost>(&self, host: &mut H) -> Result<CycleStats> {
        let construct = host.controller_construct();
        let snapshot = collect_inventory(&host.inventory_blocks()?, construct);
        let queued = collect_queued_items(&host.production_blocks()?, construct);

        let registry = registry();
        let needed = registry.needed_ingots(&queued);
        let coverages = calculate_coverage(&needed, &snapshot.ingots, &snapshot.ores);

        if queued.is_empty() {
            debug!("No assembler has anything queued");
        }

        let mut stats = CycleStats {
            queued_items: queued.len(),
            unknown_recipes: queued
                .iter()
                .filter(|(item, _)| !registry.contains(item))
                .count(),
            ingots_needed: coverages.len(),
            ingots_short: coverages.iter().filter(|c| c.missing_ingots() > 0.0).count(),
            ore_short: coverages.iter().filter(|c| c.missing_total() > 0.0).count(),
            screens_written: 0,
        };

        for (kind, body) in report::build_reports(&coverages, &queued, registry) {
            stats.screens_written += report::deliver(host, &self.routes, kind, &body)?;
        }

        info!(
            queued = stats.queued_items,
            ingots = stats.ingots_needed,
            short = stats.ingots_short,
            short_after_ore = stats.ore_short,
            screens = stats.screens_written,
            "Cycle complete"
        );
        Ok(stats)
    }
}

/// What one evaluation cycle saw and did
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CycleStats {
    pub queued_items: usize,
    pub unknown_recipes: usize,
    pub ingots_needed: usize,
    pub ingots_short: usize,
    pub ore_short: usize,
    pub screens_written: usize,
}

impl std::fmt::Display for CycleStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} queued items ({} without recipe), {} ingots needed ({} short, {} short after refining ore). Screens written: {}",
            self.queued_items,
            self.unknown_recipes,
            self.ingots_needed,
            self.ingots_short,
            self.ore_short,
            self.screens_written
        )
    }
}
