//! Enemy behaviour state machine (spec §4.9).

use uuid::Uuid;

use super::combatant::{AiState, Combatant, DEFAULT_FLEE_THRESHOLD};

/// The action an AI-controlled combatant selects on its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiAction {
    Attack { target_id: Uuid },
    Flee,
    /// No valid target and not fleeing: the turn still advances.
    Pass,
}

/// `h = currentHealth / maxHealth`, evaluated at the start of the
/// enemy's turn, against `enemy`'s own `flee_threshold` (spec
/// `Enemy.fleeThreshold`) rather than a single engine-wide value — each
/// enemy may be configured to flee earlier or later than another.
pub fn evaluate_state(enemy: &Combatant) -> AiState {
    let h = enemy.health_fraction();
    let flee_threshold = enemy.flee_threshold.unwrap_or(DEFAULT_FLEE_THRESHOLD);
    if h > 0.50 {
        AiState::Aggressive
    } else if h > flee_threshold {
        AiState::Defensive
    } else {
        AiState::Flee
    }
}

/// Pick an action for `enemy` (already known to be in `state`) given the
/// Active combatants on the opposing side.
pub fn select_action(state: AiState, opponents: &[&Combatant]) -> AiAction {
    let active: Vec<&&Combatant> = opponents.iter().filter(|c| c.is_active()).collect();

    match state {
        AiState::Flee => AiAction::Flee,
        AiState::Aggressive => active
            .into_iter()
            .max_by_key(|c| (c.max_health, c.current_health, c.id))
            .map(|c| AiAction::Attack { target_id: c.id })
            .unwrap_or(AiAction::Pass),
        AiState::Defensive => active
            .into_iter()
            .min_by_key(|c| (c.current_health, std::cmp::Reverse(c.id)))
            .map(|c| AiAction::Attack { target_id: c.id })
            .unwrap_or(AiAction::Pass),
    }
}
