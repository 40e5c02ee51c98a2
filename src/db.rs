//! Grid snapshot database: schema, loading helpers and the SQLite-backed host

use std::collections::HashMap;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::error::HostError;
use crate::host::{GridHost, ProgramStorage};
use crate::models::{
    Block, BlockId, ContentType, InventoryBlock, InventoryItem, ProductionBlock, ProductionItem,
    SurfaceContent, TextSurface,
};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Every terminal block of every construct in range
        CREATE TABLE IF NOT EXISTS blocks (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            construct INTEGER NOT NULL,
            inventory_count INTEGER NOT NULL DEFAULT 0,
            is_assembler INTEGER NOT NULL DEFAULT 0,
            is_text_surface INTEGER NOT NULL DEFAULT 0,
            is_controller INTEGER NOT NULL DEFAULT 0
        );

        -- Item stacks; raw_amount has 6 implied decimals
        CREATE TABLE IF NOT EXISTS inventory_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            block_id INTEGER NOT NULL,
            inventory_index INTEGER NOT NULL,
            type_id TEXT NOT NULL,
            subtype_id TEXT NOT NULL,
            raw_amount INTEGER NOT NULL
        );

        -- Assembler queues; raw_amount has 6 implied decimals
        CREATE TABLE IF NOT EXISTS production_queue (
            block_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            blueprint_subtype TEXT NOT NULL,
            raw_amount INTEGER NOT NULL,
            PRIMARY KEY (block_id, position)
        );

        -- What each screen currently shows
        CREATE TABLE IF NOT EXISTS surface_text (
            block_id INTEGER PRIMARY KEY,
            content_type TEXT NOT NULL,
            content TEXT NOT NULL
        );

        -- Durable storage slot of each programmable block
        CREATE TABLE IF NOT EXISTS program_storage (
            controller_id INTEGER PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Echo output of the last run
        CREATE TABLE IF NOT EXISTS echo_log (
            controller_id INTEGER NOT NULL,
            line_no INTEGER NOT NULL,
            line TEXT NOT NULL,
            PRIMARY KEY (controller_id, line_no)
        );

        CREATE INDEX IF NOT EXISTS idx_inventory_items_block ON inventory_items(block_id);
        CREATE INDEX IF NOT EXISTS idx_blocks_construct ON blocks(construct);
        "#,
    )?;
    Ok(())
}

/// Insert or replace a block
pub fn upsert_block(conn: &Connection, block: &Block) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO blocks (id, name, construct, inventory_count, is_assembler, is_text_surface, is_controller)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            block.id,
            &block.name,
            block.construct,
            block.inventory_count,
            block.is_assembler,
            block.is_text_surface,
            block.is_controller,
        ),
    )?;
    Ok(())
}

/// Insert an item stack into one of a block's inventories
pub fn insert_inventory_item(
    conn: &Connection,
    block_id: BlockId,
    inventory_index: i64,
    item: &InventoryItem,
) -> Result<()> {
    conn.execute(
        "INSERT INTO inventory_items (block_id, inventory_index, type_id, subtype_id, raw_amount)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            block_id,
            inventory_index,
            &item.type_id,
            &item.subtype_id,
            item.raw_amount,
        ),
    )?;
    Ok(())
}

/// Append an entry to an assembler's queue
pub fn push_queue_item(conn: &Connection, block_id: BlockId, item: &ProductionItem) -> Result<()> {
    conn.execute(
        "INSERT INTO production_queue (block_id, position, blueprint_subtype, raw_amount)
         VALUES (?1, (SELECT COALESCE(MAX(position), -1) + 1 FROM production_queue WHERE block_id = ?1), ?2, ?3)",
        (block_id, &item.blueprint, item.raw_amount),
    )?;
    Ok(())
}

/// Clear the grid, keeping nothing (for reloading a snapshot)
pub fn clear_grid(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM echo_log;
        DELETE FROM program_storage;
        DELETE FROM surface_text;
        DELETE FROM production_queue;
        DELETE FROM inventory_items;
        DELETE FROM blocks;
        "#,
    )?;
    Ok(())
}

/// Number of blocks in the snapshot
pub fn block_count(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM blocks", [], |row| row.get(0))?;
    Ok(usize::try_from(count).unwrap_or(0))
}

/// List every text surface and what it shows, including blank ones
pub fn list_surfaces(conn: &Connection) -> Result<Vec<SurfaceContent>> {
    let mut stmt = conn.prepare(
        "SELECT b.id, b.name, COALESCE(s.content_type, 'none'), COALESCE(s.content, '')
         FROM blocks b
         LEFT JOIN surface_text s ON s.block_id = b.id
         WHERE b.is_text_surface = 1 OR b.is_controller = 1
         ORDER BY b.name, b.id",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(SurfaceContent {
            block_id: row.get(0)?,
            name: row.get(1)?,
            content_type: ContentType::from_db(&row.get::<_, String>(2)?),
            content: row.get(3)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Echo lines left by a controller's last run
pub fn last_echo(conn: &Connection, controller_id: BlockId) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT line FROM echo_log WHERE controller_id = ?1 ORDER BY line_no")?;
    let rows = stmt.query_map([controller_id], |row| row.get(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Find the programmable block running the tracker
pub fn find_controller(conn: &Connection, name: &str) -> Result<Block> {
    let mut stmt = conn.prepare(
        "SELECT id, name, construct, inventory_count, is_assembler, is_text_surface, is_controller
         FROM blocks WHERE is_controller = 1 AND name = ?1",
    )?;
    let rows = stmt.query_map([name], |row| {
        Ok(Block {
            id: row.get(0)?,
            name: row.get(1)?,
            construct: row.get(2)?,
            inventory_count: row.get(3)?,
            is_assembler: row.get(4)?,
            is_text_surface: row.get(5)?,
            is_controller: row.get(6)?,
        })
    })?;

    let mut matches = Vec::new();
    for row in rows {
        matches.push(row?);
    }

    match matches.len() {
        0 => Err(HostError::ControllerNotFound(name.to_string()).into()),
        1 => Ok(matches.remove(0)),
        count => Err(HostError::AmbiguousController {
            name: name.to_string(),
            count,
        }
        .into()),
    }
}

/// Host backed by a grid snapshot database, seen from one controller block
pub struct SqliteHost<'a> {
    conn: &'a Connection,
    controller: Block,
    echoes: Vec<String>,
}

impl<'a> SqliteHost<'a> {
    pub fn open(conn: &'a Connection, controller_name: &str) -> Result<Self> {
        let controller = find_controller(conn, controller_name)?;
        debug!(
            controller = %controller.name,
            construct = controller.construct,
            "Attached to controller"
        );
        Ok(Self {
            conn,
            controller,
            echoes: Vec::new(),
        })
    }

    pub fn controller(&self) -> &Block {
        &self.controller
    }

    /// Persist this run's echo output, replacing the previous run's, and return it.
    pub fn flush_echo(&mut self) -> Result<Vec<String>> {
        let lines = std::mem::take(&mut self.echoes);
        self.conn.execute(
            "DELETE FROM echo_log WHERE controller_id = ?1",
            [self.controller.id],
        )?;
        for (line_no, line) in lines.iter().enumerate() {
            self.conn.execute(
                "INSERT INTO echo_log (controller_id, line_no, line) VALUES (?1, ?2, ?3)",
                (self.controller.id, line_no as i64, line),
            )?;
        }
        Ok(lines)
    }

    fn set_surface_text(
        &self,
        block_id: BlockId,
        content_type: ContentType,
        text: &str,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO surface_text (block_id, content_type, content) VALUES (?1, ?2, ?3)",
            (block_id, content_type.as_str(), text),
        )?;
        Ok(())
    }
}

impl GridHost for SqliteHost<'_> {
    fn controller_construct(&self) -> i64 {
        self.controller.construct
    }

    fn inventory_blocks(&self) -> Result<Vec<InventoryBlock>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, construct, inventory_count FROM blocks WHERE inventory_count > 0 ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            let slots = usize::try_from(row.get::<_, i64>(3)?).unwrap_or(0);
            Ok(InventoryBlock {
                id: row.get(0)?,
                name: row.get(1)?,
                construct: row.get(2)?,
                inventories: vec![Vec::new(); slots],
            })
        })?;

        let mut blocks = Vec::new();
        for row in rows {
            blocks.push(row?);
        }
        let positions: HashMap<BlockId, usize> =
            blocks.iter().enumerate().map(|(i, b)| (b.id, i)).collect();

        let mut stmt = self.conn.prepare(
            "SELECT block_id, inventory_index, type_id, subtype_id, raw_amount
             FROM inventory_items ORDER BY block_id, inventory_index, id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, BlockId>(0)?,
                row.get::<_, i64>(1)?,
                InventoryItem {
                    type_id: row.get(2)?,
                    subtype_id: row.get(3)?,
                    raw_amount: row.get(4)?,
                },
            ))
        })?;

        for row in rows {
            let (block_id, index, item) = row?;
            let slot = match (positions.get(&block_id), usize::try_from(index)) {
                (Some(&i), Ok(index)) => blocks[i].inventories.get_mut(index),
                _ => None,
            };
            match slot {
                Some(slot) => slot.push(item),
                None => debug!(block_id, index, "Item outside any inventory slot, skipped"),
            }
        }

        Ok(blocks)
    }

    fn production_blocks(&self) -> Result<Vec<ProductionBlock>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, construct FROM blocks WHERE is_assembler = 1 ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ProductionBlock {
                id: row.get(0)?,
                name: row.get(1)?,
                construct: row.get(2)?,
                queue: Vec::new(),
            })
        })?;

        let mut blocks = Vec::new();
        for row in rows {
            blocks.push(row?);
        }

        let mut stmt = self.conn.prepare(
            "SELECT blueprint_subtype, raw_amount FROM production_queue
             WHERE block_id = ?1 ORDER BY position",
        )?;
        for block in &mut blocks {
            let rows = stmt.query_map([block.id], |row| {
                Ok(ProductionItem {
                    blueprint: row.get(0)?,
                    raw_amount: row.get(1)?,
                })
            })?;
            for row in rows {
                block.queue.push(row?);
            }
        }

        Ok(blocks)
    }

    fn search_text_surfaces(&self, name: &str) -> Result<Vec<TextSurface>> {
        // instr() is case-sensitive, unlike LIKE.
        let mut stmt = self.conn.prepare(
            "SELECT id, name, construct FROM blocks
             WHERE is_text_surface = 1 AND instr(name, ?1) > 0 ORDER BY id",
        )?;
        let rows = stmt.query_map([name], |row| {
            Ok(TextSurface {
                id: row.get(0)?,
                name: row.get(1)?,
                construct: row.get(2)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    fn write_text(
        &mut self,
        surface: BlockId,
        content_type: ContentType,
        text: &str,
    ) -> Result<()> {
        let is_surface: Option<bool> = self
            .conn
            .query_row(
                "SELECT is_text_surface FROM blocks WHERE id = ?1",
                [surface],
                |row| row.get(0),
            )
            .optional()?;
        if is_surface != Some(true) {
            return Err(HostError::NotATextSurface(surface).into());
        }
        self.set_surface_text(surface, content_type, text)
    }

    fn write_controller_text(&mut self, content_type: ContentType, text: &str) -> Result<()> {
        self.set_surface_text(self.controller.id, content_type, text)
    }

    fn echo(&mut self, text: &str) {
        self.echoes.push(text.to_string());
    }
}

impl ProgramStorage for SqliteHost<'_> {
    fn load(&self) -> Result<String> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM program_storage WHERE controller_id = ?1",
                [self.controller.id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read program storage")?;
        Ok(value.unwrap_or_default())
    }

    fn save(&mut self, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO program_storage (controller_id, value) VALUES (?1, ?2)",
                (self.controller.id, value),
            )
            .context("Failed to write program storage")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{INGOT_TYPE_ID, ORE_TYPE_ID};

    fn block(id: BlockId, name: &str, construct: i64) -> Block {
        Block {
            id,
            name: name.to_string(),
            construct,
            inventory_count: 0,
            is_assembler: false,
            is_text_surface: false,
            is_controller: false,
        }
    }

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        upsert_block(&conn, &Block { is_controller: true, ..block(1, "Tracker", 100) }).unwrap();
        upsert_block(&conn, &Block { inventory_count: 2, is_assembler: true, ..block(2, "Assembler", 100) })
            .unwrap();
        upsert_block(&conn, &Block { inventory_count: 1, ..block(3, "Cargo", 100) }).unwrap();
        upsert_block(&conn, &Block { is_text_surface: true, ..block(4, "LCD Ingots", 100) }).unwrap();
        upsert_block(&conn, &Block { is_text_surface: true, ..block(5, "lcd ingots", 100) }).unwrap();
        conn
    }

    #[test]
    fn test_find_controller() {
        let conn = setup();
        assert_eq!(find_controller(&conn, "Tracker").unwrap().id, 1);

        let err = find_controller(&conn, "Cargo").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HostError>(),
            Some(HostError::ControllerNotFound(_))
        ));

        upsert_block(&conn, &Block { is_controller: true, ..block(9, "Tracker", 200) }).unwrap();
        let err = find_controller(&conn, "Tracker").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HostError>(),
            Some(HostError::AmbiguousController { count: 2, .. })
        ));
    }

    #[test]
    fn test_inventory_blocks_group_items_by_slot() {
        let conn = setup();
        insert_inventory_item(&conn, 2, 0, &InventoryItem::new(INGOT_TYPE_ID, "Iron", 5_000_000))
            .unwrap();
        insert_inventory_item(&conn, 2, 1, &InventoryItem::new(ORE_TYPE_ID, "Gold", 1_000_000))
            .unwrap();
        insert_inventory_item(&conn, 3, 0, &InventoryItem::new(INGOT_TYPE_ID, "Iron", 2_000_000))
            .unwrap();
        // Slot 4 does not exist on a single-inventory container.
        insert_inventory_item(&conn, 3, 4, &InventoryItem::new(INGOT_TYPE_ID, "Iron", 7_000_000))
            .unwrap();

        let host = SqliteHost::open(&conn, "Tracker").unwrap();
        let blocks = host.inventory_blocks().unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].inventories.len(), 2);
        assert_eq!(blocks[0].inventories[0][0].subtype_id, "Iron");
        assert_eq!(blocks[0].inventories[1][0].subtype_id, "Gold");
        assert_eq!(blocks[1].inventories, vec![vec![InventoryItem::new(INGOT_TYPE_ID, "Iron", 2_000_000)]]);
    }

    #[test]
    fn test_block_count() {
        let conn = setup();
        assert_eq!(block_count(&conn).unwrap(), 5);
        clear_grid(&conn).unwrap();
        assert_eq!(block_count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_production_queue_order() {
        let conn = setup();
        push_queue_item(&conn, 2, &ProductionItem::new("SteelPlate", 3_000_000)).unwrap();
        push_queue_item(&conn, 2, &ProductionItem::new("Computer", 1_000_000)).unwrap();

        let host = SqliteHost::open(&conn, "Tracker").unwrap();
        let blocks = host.production_blocks().unwrap();

        assert_eq!(blocks.len(), 1);
        let queue: Vec<&str> = blocks[0].queue.iter().map(|q| q.blueprint.as_str()).collect();
        assert_eq!(queue, vec!["SteelPlate", "Computer"]);
    }

    #[test]
    fn test_search_is_case_sensitive_substring() {
        let conn = setup();
        let host = SqliteHost::open(&conn, "Tracker").unwrap();

        let ids: Vec<BlockId> = host.search_text_surfaces("Ingots").unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![4]);
        assert!(host.search_text_surfaces("Cargo").unwrap().is_empty());
    }

    #[test]
    fn test_storage_round_trip() {
        let conn = setup();
        let mut host = SqliteHost::open(&conn, "Tracker").unwrap();

        assert_eq!(host.load().unwrap(), "");
        host.save("coverage=LCD Ingots").unwrap();
        host.save("missing=LCD Ingots").unwrap();
        assert_eq!(host.load().unwrap(), "missing=LCD Ingots");
    }

    #[test]
    fn test_write_text_and_echo() {
        let conn = setup();
        let mut host = SqliteHost::open(&conn, "Tracker").unwrap();

        host.write_text(4, ContentType::TextAndImage, "Ingot Coverage:\n").unwrap();
        let err = host.write_text(3, ContentType::TextAndImage, "nope").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HostError>(),
            Some(HostError::NotATextSurface(3))
        ));
        host.write_controller_text(ContentType::None, "stored").unwrap();

        host.echo("first");
        host.echo("second");
        assert_eq!(host.flush_echo().unwrap(), vec!["first", "second"]);
        assert_eq!(last_echo(&conn, 1).unwrap(), vec!["first", "second"]);

        host.echo("third");
        host.flush_echo().unwrap();
        assert_eq!(last_echo(&conn, 1).unwrap(), vec!["third"]);

        let surfaces = list_surfaces(&conn).unwrap();
        let ingots = surfaces.iter().find(|s| s.block_id == 4).unwrap();
        assert_eq!(ingots.content, "Ingot Coverage:\n");
        assert_eq!(ingots.content_type, ContentType::TextAndImage);
        let controller = surfaces.iter().find(|s| s.block_id == 1).unwrap();
        assert_eq!(controller.content, "stored");
        assert_eq!(controller.content_type, ContentType::None);
    }
}
