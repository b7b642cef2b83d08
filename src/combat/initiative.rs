//! Turn-order sorting (spec §4.4).

use uuid::Uuid;

use super::combatant::Combatant;

/// Sort combatants into initiative order: `initiativeScore` descending,
/// then `dexterityModifier` descending, then the stable per-combatant
/// tiebreak key descending. Pure given the combatants' current state and
/// stable keys — no re-rolling.
pub fn compute_order(combatants: &[Combatant]) -> Vec<Uuid> {
    let mut ordered: Vec<&Combatant> = combatants.iter().collect();
    ordered.sort_by(|a, b| {
        b.initiative_score()
            .cmp(&a.initiative_score())
            .then_with(|| b.dexterity_modifier.cmp(&a.dexterity_modifier))
            .then_with(|| b.tiebreak_key.cmp(&a.tiebreak_key))
    });
    ordered.into_iter().map(|c| c.id).collect()
}
