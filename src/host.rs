//! Interfaces to the game host
//!
//! The controller never enumerates blocks or touches screens directly; it goes
//! through these traits. [`crate::db::SqliteHost`] implements them over a grid
//! snapshot database.

use anyhow::Result;

use crate::models::{BlockId, ContentType, InventoryBlock, ProductionBlock, TextSurface};

/// Block access for the grid the controller is built on
pub trait GridHost {
    /// Construct the controller belongs to. Blocks on any other construct are foreign.
    fn controller_construct(&self) -> i64;

    /// Every block with at least one inventory, on any construct
    fn inventory_blocks(&self) -> Result<Vec<InventoryBlock>>;

    /// Every assembler, on any construct
    fn production_blocks(&self) -> Result<Vec<ProductionBlock>>;

    /// Text surfaces whose name matches `name` (case-sensitive substring), on any construct
    fn search_text_surfaces(&self, name: &str) -> Result<Vec<TextSurface>>;

    /// Replace what a text surface shows
    fn write_text(&mut self, surface: BlockId, content_type: ContentType, text: &str)
    -> Result<()>;

    /// Replace what the controller's own screen shows
    fn write_controller_text(&mut self, content_type: ContentType, text: &str) -> Result<()>;

    /// Append to the controller's diagnostic output
    fn echo(&mut self, text: &str);
}

/// The controller's durable string slot
pub trait ProgramStorage {
    fn load(&self) -> Result<String>;
    fn save(&mut self, value: &str) -> Result<()>;
}
