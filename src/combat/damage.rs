//! Weapon damage rolling (spec §4.6).

use crate::dice::DiceService;
use crate::error::CombatError;
use crate::rng::DiceRng;

/// Roll damage for a hit: parse `weapon_expression`, double its dice
/// count on a critical (not the result), add `modifier`, apply
/// resistance/vulnerability, and floor at 1.
///
/// Callers must only invoke this for a hit; a miss deals 0 damage and
/// never reaches this function.
pub fn roll_damage(
    weapon_expression: &str,
    modifier: i64,
    is_critical: bool,
    resistant: bool,
    vulnerable: bool,
    dice: &DiceService,
    rng: &mut dyn DiceRng,
) -> Result<i64, CombatError> {
    let mut expression = dice
        .validate_expression(weapon_expression)
        .map_err(CombatError::from)?;

    if is_critical {
        expression = expression.doubled_dice();
    }
    expression.modifiers.push(modifier);

    let result = dice.roll_expression(&expression, rng);
    let mut damage = result.final_total;

    if resistant {
        damage = damage.div_euclid(2);
    }
    if vulnerable {
        damage *= 2;
    }

    Ok(damage.max(1))
}
