//! Ingot coverage calculation
//!
//! Compares the ingots needed by the assembler queues with the ingots and ore
//! on hand.

use std::collections::HashMap;

use crate::recipes::ore_yield;

/// Needed and on-hand amounts for one ingot. Every other figure is derived on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct Coverage {
    pub ingot: String,
    pub needed: f64,
    pub ingots_on_hand: f64,
    pub ore_on_hand: f64,
}

impl Coverage {
    pub fn new(ingot: &str, needed: f64, ingots_on_hand: f64, ore_on_hand: f64) -> Self {
        Self {
            ingot: ingot.to_string(),
            needed,
            ingots_on_hand,
            ore_on_hand,
        }
    }

    /// kg of ingot per kg of ore. Unknown ingots never reach here through a
    /// parsed recipe; they are treated as unrefinable.
    fn efficiency(&self) -> f64 {
        ore_yield(&self.ingot).unwrap_or(0.0)
    }

    pub fn missing_ingots(&self) -> f64 {
        (self.needed - self.ingots_on_hand).max(0.0)
    }

    /// Ingots the ore on hand would refine into
    pub fn ore_as_ingots(&self) -> f64 {
        self.ore_on_hand * self.efficiency()
    }

    pub fn total_available(&self) -> f64 {
        self.ingots_on_hand + self.ore_as_ingots()
    }

    /// Ingots still missing after refining all ore on hand
    pub fn missing_total(&self) -> f64 {
        (self.needed - self.total_available()).max(0.0)
    }

    /// kg of ore to mine to cover the shortfall
    pub fn missing_ore(&self) -> f64 {
        let efficiency = self.efficiency();
        if efficiency > 0.0 {
            self.missing_total() / efficiency
        } else {
            0.0
        }
    }

    /// Fraction of the need covered by ingots alone, capped at 1.0
    pub fn ingot_coverage(&self) -> f64 {
        coverage_ratio(self.ingots_on_hand, self.needed)
    }

    /// Fraction of the need covered by ingots plus refined ore, capped at 1.0
    pub fn total_coverage(&self) -> f64 {
        coverage_ratio(self.total_available(), self.needed)
    }
}

/// Nothing needed counts as fully covered.
fn coverage_ratio(available: f64, needed: f64) -> f64 {
    if needed <= 0.0 {
        return 1.0;
    }
    (available / needed).min(1.0)
}

/// One coverage record per needed ingot, sorted by ingot name.
///
/// Ingots or ore missing from the on-hand maps count as zero.
pub fn calculate_coverage(
    needed: &HashMap<String, f64>,
    ingots: &HashMap<String, f64>,
    ores: &HashMap<String, f64>,
) -> Vec<Coverage> {
    let mut coverages: Vec<Coverage> = needed
        .iter()
        .map(|(ingot, amount)| {
            Coverage::new(
                ingot,
                *amount,
                ingots.get(ingot).copied().unwrap_or_default(),
                ores.get(ingot).copied().unwrap_or_default(),
            )
        })
        .collect();

    coverages.sort_by(|a, b| a.ingot.cmp(&b.ingot));
    coverages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_coverage_sorted_by_name() {
        let coverages = calculate_coverage(
            &map(&[("Iron", 10.0), ("Gold", 1.0)]),
            &map(&[("Iron", 5.0)]),
            &HashMap::new(),
        );

        let names: Vec<&str> = coverages.iter().map(|c| c.ingot.as_str()).collect();
        assert_eq!(names, vec!["Gold", "Iron"]);

        let gold = &coverages[0];
        assert!(approx(gold.missing_ingots(), 1.0));
        assert!(approx(gold.ingot_coverage(), 0.0));

        let iron = &coverages[1];
        assert!(approx(iron.missing_ingots(), 5.0));
        assert!(approx(iron.ingot_coverage(), 0.5));
    }

    #[test]
    fn test_zero_needed_is_fully_covered() {
        for (ingots, ore) in [(0.0, 0.0), (5.0, 0.0), (0.0, 100.0)] {
            let coverage = Coverage::new("Iron", 0.0, ingots, ore);
            assert!(approx(coverage.ingot_coverage(), 1.0));
            assert!(approx(coverage.total_coverage(), 1.0));
            assert!(coverage.ingot_coverage().is_finite());
            assert!(approx(coverage.missing_ore(), 0.0));
        }
    }

    #[test]
    fn test_ore_counts_toward_total_coverage() {
        // 10 ingots + 20 kg ore * 1.4 = 38 of 50 needed
        let coverage = Coverage::new("Iron", 50.0, 10.0, 20.0);
        assert!(approx(coverage.ore_as_ingots(), 28.0));
        assert!(approx(coverage.total_available(), 38.0));
        assert!(approx(coverage.missing_ingots(), 40.0));
        assert!(approx(coverage.missing_total(), 12.0));
        assert!(approx(coverage.missing_ore(), 12.0 / 1.4));
        assert!(approx(coverage.ingot_coverage(), 0.2));
        assert!(approx(coverage.total_coverage(), 0.76));
    }

    #[test]
    fn test_coverage_capped_at_one() {
        let coverage = Coverage::new("Gold", 1.0, 3.0, 500.0);
        assert!(approx(coverage.ingot_coverage(), 1.0));
        assert!(approx(coverage.total_coverage(), 1.0));
        assert!(approx(coverage.missing_ingots(), 0.0));
        assert!(approx(coverage.missing_ore(), 0.0));
    }

    #[test]
    fn test_missing_ore_with_nothing_on_hand() {
        let coverage = Coverage::new("Iron", 20.0, 0.0, 0.0);
        assert_eq!(coverage.missing_ore().ceil(), 15.0);
    }
}
