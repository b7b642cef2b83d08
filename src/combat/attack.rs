//! d20 attack resolution (spec §4.5).

use serde::{Deserialize, Serialize};

use crate::error::CombatError;
use crate::rng::DiceRng;

use super::combatant::Combatant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackOutcome {
    pub d20_roll: u32,
    pub total: i64,
    pub is_hit: bool,
    pub is_critical: bool,
    pub is_critical_miss: bool,
}

/// Roll `1d20 + attacker.attack_modifier` against `target.armor_class`
/// (spec §4.5). A natural 20 always hits and is critical; a natural 1
/// always misses, regardless of total.
pub fn resolve_attack(
    attacker: &Combatant,
    target: &Combatant,
    rng: &mut dyn DiceRng,
) -> Result<AttackOutcome, CombatError> {
    if !target.is_active() {
        return Err(CombatError::InvalidTarget(format!(
            "target {} is not Active",
            target.id
        )));
    }

    let d20_roll = rng.roll_die(20);
    let total = d20_roll as i64 + attacker.attack_modifier;
    let is_critical = d20_roll == 20;
    let is_critical_miss = d20_roll == 1;
    let is_hit = if is_critical_miss {
        false
    } else if is_critical {
        true
    } else {
        total >= target.armor_class
    };

    Ok(AttackOutcome {
        d20_roll,
        total,
        is_hit,
        is_critical,
        is_critical_miss,
    })
}
