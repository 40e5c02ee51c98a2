//! Data models for grid blocks, inventories and assembler queues

/// Raw amounts reported by the game carry 6 implied decimal digits.
pub const FIXED_POINT_SCALE: f64 = 1_000_000.0;

pub const INGOT_TYPE_ID: &str = "MyObjectBuilder_Ingot";
pub const ORE_TYPE_ID: &str = "MyObjectBuilder_Ore";

/// Identifier of a block inside the host grid
pub type BlockId = i64;

/// A single stack in one inventory slot
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryItem {
    pub type_id: String,
    pub subtype_id: String,
    pub raw_amount: i64,
}

impl InventoryItem {
    pub fn new(type_id: &str, subtype_id: &str, raw_amount: i64) -> Self {
        Self {
            type_id: type_id.to_string(),
            subtype_id: subtype_id.to_string(),
            raw_amount,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self.type_id.as_str() {
            INGOT_TYPE_ID => ItemKind::Ingot,
            ORE_TYPE_ID => ItemKind::Ore,
            _ => ItemKind::Other,
        }
    }

    pub fn mass_kg(&self) -> f64 {
        self.raw_amount as f64 / FIXED_POINT_SCALE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Ingot,
    Ore,
    Other,
}

/// A block with one or more inventories (cargo containers, refineries, assemblers...)
#[derive(Debug, Clone)]
pub struct InventoryBlock {
    pub id: BlockId,
    pub name: String,
    pub construct: i64,
    /// One entry per inventory slot; assemblers have an input and an output slot.
    pub inventories: Vec<Vec<InventoryItem>>,
}

/// One entry of an assembler's production queue
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionItem {
    pub blueprint: String,
    pub raw_amount: i64,
}

impl ProductionItem {
    pub fn new(blueprint: &str, raw_amount: i64) -> Self {
        Self {
            blueprint: blueprint.to_string(),
            raw_amount,
        }
    }

    /// Whole units queued; fractional amounts are truncated.
    pub fn count(&self) -> i64 {
        self.raw_amount / FIXED_POINT_SCALE as i64
    }
}

/// A production-capable block and its queue
#[derive(Debug, Clone)]
pub struct ProductionBlock {
    pub id: BlockId,
    pub name: String,
    pub construct: i64,
    pub queue: Vec<ProductionItem>,
}

/// A text-output-capable block found by name search
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextSurface {
    pub id: BlockId,
    pub name: String,
    pub construct: i64,
}

/// What a text surface is set to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    None,
    TextAndImage,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::None => "none",
            ContentType::TextAndImage => "text_and_image",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "text_and_image" => ContentType::TextAndImage,
            _ => ContentType::None,
        }
    }
}

/// A row of the grid snapshot's block table
#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub name: String,
    pub construct: i64,
    pub inventory_count: i64,
    pub is_assembler: bool,
    pub is_text_surface: bool,
    pub is_controller: bool,
}

/// Current content of a screen
#[derive(Debug, Clone)]
pub struct SurfaceContent {
    pub block_id: BlockId,
    pub name: String,
    pub content_type: ContentType,
    pub content: String,
}

/// Why the host invoked the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Operator command or a timer block
    Terminal,
    /// The host's fixed update cadence
    Periodic,
}
