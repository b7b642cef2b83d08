//! One-call parse+roll facade (spec §4.3), plus the supplemented
//! human-readable breakdown formatter (SPEC_FULL.md §G.1).

use crate::config::CombatConfig;
use crate::error::ParseError;
use crate::rng::DiceRng;

use super::expression::{self, DiceExpression};
use super::roller::{self, DiceStatistics, RollResult};

/// Stateless facade over the parser and roller, configured with the
/// dice bounds from `CombatConfig` (spec §4.3: "composes the parser and
/// roller; it introduces no new semantics").
#[derive(Debug, Clone, Default)]
pub struct DiceService {
    config: CombatConfig,
}

impl DiceService {
    pub fn new(config: CombatConfig) -> Self {
        Self { config }
    }

    pub fn validate_expression(&self, text: &str) -> Result<DiceExpression, ParseError> {
        expression::parse_with_bounds(text, self.config.max_dice_count, self.config.max_die_sides)
    }

    pub fn roll(&self, text: &str, rng: &mut dyn DiceRng) -> Result<RollResult, ParseError> {
        let expr = self.validate_expression(text)?;
        Ok(roller::roll(&expr, rng))
    }

    pub fn get_statistics(&self, text: &str) -> Result<DiceStatistics, ParseError> {
        let expr = self.validate_expression(text)?;
        Ok(roller::get_statistics(&expr))
    }

    /// Roll a pre-parsed expression directly, skipping re-parsing. Used
    /// by the combat module, which builds expressions programmatically
    /// (e.g. the doubled-dice crit expression) rather than from raw text.
    pub fn roll_expression(&self, expression: &DiceExpression, rng: &mut dyn DiceRng) -> RollResult {
        roller::roll(expression, rng)
    }

    /// Human-readable breakdown of a roll, e.g. `"2d6[4, 5] + 1d4[2] + 3 = 14"`.
    pub fn describe(&self, result: &RollResult) -> String {
        let mut parts: Vec<String> = Vec::new();

        for (key, outcomes) in &result.rolls_by_group {
            let rolls_str = outcomes
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            parts.push(format!("{}[{}]", key, rolls_str));
        }

        // Standalone/per-group modifiers are not individually recoverable
        // from `RollResult` alone (they're already folded into
        // `subtotals_by_group`), so the breakdown shows the single
        // aggregate modifier term rather than re-deriving each piece.
        if result.total_modifier > 0 {
            parts.push(format!("+ {}", result.total_modifier));
        } else if result.total_modifier < 0 {
            parts.push(format!("- {}", result.total_modifier.abs()));
        }

        format!("{} = {}", parts.join(" + "), result.final_total).replace("+ - ", "- ")
    }
}
