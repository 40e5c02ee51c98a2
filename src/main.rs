//! Ingot Tracker
//!
//! Tracks whether the ingots and ore on a Space Engineers grid cover what its
//! assemblers have queued, and routes the reports to named LCD panels.

mod calculator;
mod command;
mod controller;
mod db;
mod error;
mod extract;
mod host;
mod inventory;
mod models;
mod recipes;
mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use crate::controller::Controller;
use crate::db::SqliteHost;
use crate::host::ProgramStorage;
use crate::models::Trigger;

#[derive(Parser)]
#[command(name = "ingot-tracker")]
#[command(about = "Ingot and ore coverage tracker for Space Engineers assembler queues")]
struct Cli {
    /// Path to the grid snapshot database
    #[arg(short, long, default_value = "ingot_tracker.db")]
    database: PathBuf,

    /// Name of the programmable block running the tracker
    #[arg(short, long, default_value = "Ingot Tracker")]
    controller: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Load a sample grid for testing
    LoadSample,

    /// Run the tracker, optionally with an argument
    /// (e.g. "coverage=LCD Coverage;missing=LCD Ore", "-add queue=LCD Queue", "update", "output")
    Run {
        argument: Option<String>,

        /// Invoke as the periodic update instead of a terminal run
        #[arg(long)]
        periodic: bool,

        /// Total number of invocations; the extra ones are periodic updates
        #[arg(long, default_value_t = 1)]
        cycles: u32,
    },

    /// Show what every text panel currently displays
    Panels,

    /// Show the tracker's stored command
    Storage,

    /// List ore yields and known recipes
    Recipes,

    /// Extract ingot recipes from the game's blueprint definitions (*.sbc)
    Extract {
        /// Path to the game's Content/Data directory
        content_dir: PathBuf,

        /// Multiplier applied to every amount (1/3 matches the built-in table)
        #[arg(short, long, default_value = "1.0")]
        scale: f64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            open_database(&cli.database)?;
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            let conn = open_database(&cli.database)?;
            let blocks = load_sample_data(&conn, &cli.controller)?;
            println!("Loaded {} sample blocks", blocks);
            println!("Sample grid loaded successfully!");
        }

        Commands::Run {
            argument,
            periodic,
            cycles,
        } => {
            let conn = open_database(&cli.database)?;
            let mut host = SqliteHost::open(&conn, &cli.controller)?;
            let mut controller = Controller::start(&mut host)?;

            let trigger = if periodic {
                Trigger::Periodic
            } else {
                Trigger::Terminal
            };
            let mut stats = controller.run(&mut host, argument.as_deref().unwrap_or(""), trigger)?;
            for _ in 1..cycles {
                host.flush_echo()?;
                stats = controller.run(&mut host, "", Trigger::Periodic)?;
            }

            for line in host.flush_echo()? {
                println!("{}", line);
            }
            println!("{}", stats);
        }

        Commands::Panels => {
            let conn = open_database(&cli.database)?;
            let surfaces = db::list_surfaces(&conn)?;
            if surfaces.is_empty() {
                println!("No text panels in database. Run 'load-sample' first.");
            }
            for surface in surfaces {
                println!(
                    "=== {} (#{}, {}) ===",
                    surface.name,
                    surface.block_id,
                    surface.content_type.as_str()
                );
                println!("{}", surface.content);
            }
        }

        Commands::Storage => {
            let conn = open_database(&cli.database)?;
            let host = SqliteHost::open(&conn, &cli.controller)?;
            let stored = host.load()?;
            if stored.is_empty() {
                println!("No stored command for '{}'", host.controller().name);
            } else {
                println!("{}", stored);
            }

            let echo = db::last_echo(&conn, host.controller().id)?;
            if !echo.is_empty() {
                println!("\nLast run output:");
                for line in echo {
                    println!("  {}", line);
                }
            }
        }

        Commands::Recipes => print_recipes(),

        Commands::Extract { content_dir, scale } => {
            let (recipes, stats) = extract::extract_recipes(&content_dir, scale)?;
            for recipe in recipes {
                println!("{}", recipe);
            }
            println!("\n{}", stats);
        }
    }

    Ok(())
}

fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    db::init_schema(&conn)?;
    Ok(conn)
}

fn print_recipes() {
    println!("{:<12} {:>8}", "Ingot", "kg/kg ore");
    println!("{}", "-".repeat(21));
    for (ingot, efficiency) in recipes::ORE_EFFICIENCY {
        println!("{:<12} {:>8}", ingot, efficiency);
    }
    println!();

    println!("Recipes (ingots per unit):");
    for (item, recipe) in recipes::registry().sorted() {
        println!("  {:<24} {}", item, recipe);
    }
}

/// Load a sample station with a docked ship for testing without a live game.
///
/// Returns the number of blocks loaded.
fn load_sample_data(conn: &Connection, controller_name: &str) -> Result<usize> {
    use crate::models::{Block, INGOT_TYPE_ID, InventoryItem, ORE_TYPE_ID, ProductionItem};

    const STATION: i64 = 1;
    const DOCKED_SHIP: i64 = 2;
    const KG: i64 = 1_000_000;

    db::clear_grid(conn)?;

    let block = |id: i64, name: &str, construct: i64| Block {
        id,
        name: name.to_string(),
        construct,
        inventory_count: 0,
        is_assembler: false,
        is_text_surface: false,
        is_controller: false,
    };

    db::upsert_block(conn, &Block { is_controller: true, ..block(1, controller_name, STATION) })?;

    // Assemblers have an input and an output inventory.
    for (id, name) in [(2, "Assembler 1"), (3, "Assembler 2")] {
        db::upsert_block(
            conn,
            &Block {
                inventory_count: 2,
                is_assembler: true,
                ..block(id, name, STATION)
            },
        )?;
    }
    db::push_queue_item(conn, 2, &ProductionItem::new("ThrustComponent", 12 * KG))?;
    db::push_queue_item(conn, 2, &ProductionItem::new("SteelPlate", 200 * KG))?;
    db::push_queue_item(conn, 2, &ProductionItem::new("Computer", 150 * KG))?;
    db::push_queue_item(conn, 3, &ProductionItem::new("Missile200mm", 20 * KG))?;
    db::push_queue_item(conn, 3, &ProductionItem::new("MotorComponent", 30 * KG))?;
    db::push_queue_item(conn, 3, &ProductionItem::new("ThrustComponent", 4 * KG))?;

    db::upsert_block(conn, &Block { inventory_count: 1, ..block(4, "Large Cargo Container", STATION) })?;
    db::upsert_block(conn, &Block { inventory_count: 2, ..block(5, "Refinery", STATION) })?;

    let ingot = |subtype: &str, kg: f64| InventoryItem::new(INGOT_TYPE_ID, subtype, (kg * KG as f64) as i64);
    let ore = |subtype: &str, kg: f64| InventoryItem::new(ORE_TYPE_ID, subtype, (kg * KG as f64) as i64);

    db::insert_inventory_item(conn, 2, 0, &ingot("Iron", 45.5))?;
    db::insert_inventory_item(conn, 3, 0, &ingot("Nickel", 12.0))?;
    db::insert_inventory_item(conn, 3, 1, &InventoryItem::new("MyObjectBuilder_Component", "SteelPlate", 50 * KG))?;
    db::insert_inventory_item(conn, 4, 0, &ingot("Iron", 120.0))?;
    db::insert_inventory_item(conn, 4, 0, &ingot("Cobalt", 18.25))?;
    db::insert_inventory_item(conn, 4, 0, &ingot("Silicon", 40.0))?;
    db::insert_inventory_item(conn, 4, 0, &ingot("Uranium", 0.2))?;
    db::insert_inventory_item(conn, 4, 0, &ore("Gold", 500.0))?;
    db::insert_inventory_item(conn, 4, 0, &ore("Magnesium", 150.0))?;
    db::insert_inventory_item(conn, 5, 0, &ore("Iron", 300.0))?;
    db::insert_inventory_item(conn, 5, 0, &ore("Platinum", 5.0))?;
    db::insert_inventory_item(conn, 5, 1, &ingot("Gold", 1.5))?;

    for (id, name) in [(6, "LCD Ore"), (7, "LCD Coverage"), (8, "LCD Queue")] {
        db::upsert_block(conn, &Block { is_text_surface: true, ..block(id, name, STATION) })?;
    }

    // A docked miner: its cargo and panels belong to another construct.
    db::upsert_block(conn, &Block { inventory_count: 1, ..block(20, "Miner Cargo", DOCKED_SHIP) })?;
    db::insert_inventory_item(conn, 20, 0, &ingot("Platinum", 40.0))?;
    db::insert_inventory_item(conn, 20, 0, &ore("Iron", 5000.0))?;
    db::upsert_block(conn, &Block { is_text_surface: true, ..block(21, "LCD Ore (Miner)", DOCKED_SHIP) })?;

    db::block_count(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::GridHost;

    #[test]
    fn test_sample_grid_runs_a_cycle() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();

        let loaded = load_sample_data(&conn, "Ingot Tracker").unwrap();
        assert_eq!(loaded, db::block_count(&conn).unwrap());
        assert!(loaded > 0);

        // Reloading replaces the grid instead of adding to it.
        assert_eq!(load_sample_data(&conn, "Ingot Tracker").unwrap(), loaded);

        let mut host = SqliteHost::open(&conn, "Ingot Tracker").unwrap();
        assert!(host.search_text_surfaces("LCD Ore").unwrap().len() >= 2);

        let mut controller = Controller::start(&mut host).unwrap();
        let stats = controller
            .run(&mut host, "missing=LCD Ore;queue=LCD Queue", Trigger::Terminal)
            .unwrap();
        // The miner's panel shares the name but sits on another construct.
        assert_eq!(stats.screens_written, 2);
        assert!(stats.queued_items > 0);
    }
}
