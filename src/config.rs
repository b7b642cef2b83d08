//! Engine-wide tunables that spec.md leaves as defaults rather than
//! hard constants (see SPEC_FULL.md §D).

use serde::{Deserialize, Serialize};

/// Bounds and default thresholds for the dice and combat engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Health-fraction threshold below which an enemy flees (spec §3, §4.9).
    pub default_flee_threshold: f64,
    /// Maximum dice count per group (spec §3 `DiceRoll` invariant).
    pub max_dice_count: u32,
    /// Maximum sides per die (spec §3 `DiceRoll` invariant).
    pub max_die_sides: u32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            default_flee_threshold: 0.25,
            max_dice_count: 1000,
            max_die_sides: 1000,
        }
    }
}
