//! Aggregation of grid inventories and assembler queues
//!
//! Every cycle rebuilds these totals from scratch. Nothing is carried over
//! from a previous cycle.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::trace;

use crate::models::{InventoryBlock, ItemKind, ProductionBlock};

/// Ingots and ore on hand, in kg, keyed by subtype name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventorySnapshot {
    pub ingots: HashMap<String, f64>,
    pub ores: HashMap<String, f64>,
}

/// Queued item counts summed over every assembler, in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueuedItems {
    items: IndexMap<String, i64>,
}

impl QueuedItems {
    pub fn add(&mut self, item: &str, count: i64) {
        *self.items.entry(item.to_string()).or_default() += count;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.items.iter().map(|(name, count)| (name.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Sum every ingot and ore stack held by blocks on `construct`.
///
/// Items that are neither ingots nor ore are ignored, as are blocks on other
/// constructs (docked ships, neighbouring grids).
pub fn collect_inventory(blocks: &[InventoryBlock], construct: i64) -> InventorySnapshot {
    let mut ingots: HashMap<String, f64> = HashMap::new();
    let mut ores: HashMap<String, f64> = HashMap::new();

    for block in blocks.iter().filter(|b| b.construct == construct) {
        trace!(block_id = block.id, block = %block.name, slots = block.inventories.len(), "Counting inventory");
        for item in block.inventories.iter().flatten() {
            let bucket = match item.kind() {
                ItemKind::Ingot => &mut ingots,
                ItemKind::Ore => &mut ores,
                ItemKind::Other => continue,
            };
            *bucket.entry(item.subtype_id.clone()).or_default() += item.mass_kg();
        }
    }

    InventorySnapshot { ingots, ores }
}

/// Sum queued counts per blueprint across every assembler on `construct`.
pub fn collect_queued_items(blocks: &[ProductionBlock], construct: i64) -> QueuedItems {
    let mut queued = QueuedItems::default();

    for block in blocks.iter().filter(|b| b.construct == construct) {
        trace!(block_id = block.id, assembler = %block.name, entries = block.queue.len(), "Reading queue");
        for entry in &block.queue {
            queued.add(&entry.blueprint, entry.count());
        }
    }

    queued
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{INGOT_TYPE_ID, InventoryItem, ORE_TYPE_ID, ProductionItem};

    fn block(id: i64, construct: i64, inventories: Vec<Vec<InventoryItem>>) -> InventoryBlock {
        InventoryBlock {
            id,
            name: format!("Block {id}"),
            construct,
            inventories,
        }
    }

    #[test]
    fn test_collect_inventory_sums_across_slots() {
        let blocks = vec![
            block(
                1,
                7,
                vec![
                    vec![
                        InventoryItem::new(INGOT_TYPE_ID, "Iron", 100_000_000),
                        InventoryItem::new(ORE_TYPE_ID, "Iron", 50_500_000),
                    ],
                    vec![InventoryItem::new(INGOT_TYPE_ID, "Iron", 25_000_000)],
                ],
            ),
            block(
                2,
                7,
                vec![vec![
                    InventoryItem::new(INGOT_TYPE_ID, "Gold", 1_250_000),
                    InventoryItem::new("MyObjectBuilder_Component", "SteelPlate", 9_000_000),
                ]],
            ),
        ];

        let snapshot = collect_inventory(&blocks, 7);
        assert_eq!(snapshot.ingots.len(), 2);
        assert!((snapshot.ingots["Iron"] - 125.0).abs() < 1e-9);
        assert!((snapshot.ingots["Gold"] - 1.25).abs() < 1e-9);
        assert_eq!(snapshot.ores.len(), 1);
        assert!((snapshot.ores["Iron"] - 50.5).abs() < 1e-9);
    }

    #[test]
    fn test_collect_inventory_ignores_other_constructs_and_empty_blocks() {
        let blocks = vec![
            block(1, 7, vec![]),
            block(2, 7, vec![vec![]]),
            block(3, 8, vec![vec![InventoryItem::new(INGOT_TYPE_ID, "Iron", 1_000_000)]]),
        ];

        let snapshot = collect_inventory(&blocks, 7);
        assert!(snapshot.ingots.is_empty());
        assert!(snapshot.ores.is_empty());
    }

    #[test]
    fn test_collect_queued_items_keeps_first_seen_order() {
        let blocks = vec![
            ProductionBlock {
                id: 1,
                name: "Assembler A".to_string(),
                construct: 7,
                queue: vec![
                    ProductionItem::new("SteelPlate", 10_000_000),
                    ProductionItem::new("Computer", 4_000_000),
                ],
            },
            ProductionBlock {
                id: 2,
                name: "Assembler B".to_string(),
                construct: 7,
                queue: vec![
                    ProductionItem::new("ThrustComponent", 2_000_000),
                    ProductionItem::new("SteelPlate", 5_000_000),
                ],
            },
            ProductionBlock {
                id: 3,
                name: "Docked Assembler".to_string(),
                construct: 8,
                queue: vec![ProductionItem::new("Computer", 99_000_000)],
            },
            ProductionBlock {
                id: 4,
                name: "Idle Assembler".to_string(),
                construct: 7,
                queue: vec![],
            },
        ];

        let queued = collect_queued_items(&blocks, 7);
        let items: Vec<(&str, i64)> = queued.iter().collect();
        assert_eq!(
            items,
            vec![("SteelPlate", 15), ("Computer", 4), ("ThrustComponent", 2)]
        );
    }
}
