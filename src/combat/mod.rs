//! Combat encounter subsystem: combatants, initiative, attack/damage
//! resolution, the encounter aggregate, the AI state machine, and the
//! orchestrating service (spec §4.4-§4.9).

pub mod ai;
pub mod attack;
pub mod combatant;
pub mod damage;
pub mod encounter;
pub mod initiative;
pub mod repository;
pub mod service;

pub use ai::{evaluate_state, select_action, AiAction};
pub use attack::{resolve_attack, AttackOutcome};
pub use combatant::{AiState, Combatant, CombatantSpec, CombatantStatus, CombatantType};
pub use damage::roll_damage;
pub use encounter::{CombatEncounter, CombatLogEntry, CombatStatus, Winner};
pub use initiative::compute_order;
pub use repository::{EncounterRepository, InMemoryEncounterRepository};
pub use service::{
    AiTurnOutcome, AttackSummary, CombatService, CombatSnapshot, CombatantSummary,
    InitiateRequest, TurnResult,
};
