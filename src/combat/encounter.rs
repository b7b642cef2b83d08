//! The combat encounter aggregate (spec §4.7).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CombatError;

use super::combatant::{Combatant, CombatantStatus, CombatantType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CombatStatus {
    NotStarted,
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Winner {
    Player,
    Enemy,
    Draw,
}

/// An append-only narration of what happened during the encounter
/// (SPEC_FULL.md §G.4). Purely additive: it never drives a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum CombatLogEntry {
    CombatStarted,
    AttackResolved {
        attacker_id: Uuid,
        target_id: Uuid,
        is_hit: bool,
        is_critical: bool,
        damage: Option<i64>,
    },
    CombatantDefeated {
        combatant_id: Uuid,
    },
    CombatantFled {
        combatant_id: Uuid,
    },
    CombatantDefended {
        combatant_id: Uuid,
    },
    RoundAdvanced {
        round: u32,
    },
    CombatEnded {
        winner: Winner,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatEncounter {
    pub id: Uuid,
    pub adventure_id: Uuid,
    pub combatants: Vec<Combatant>,
    pub initiative_order: Vec<Uuid>,
    pub current_turn_index: usize,
    pub current_round: u32,
    pub status: CombatStatus,
    pub winner: Option<Winner>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub version: u64,
    pub log: Vec<CombatLogEntry>,
}

impl CombatEncounter {
    /// Validate and construct a `NotStarted` encounter (spec §4.7
    /// `Create`): at least one Character and one Enemy.
    pub fn create(adventure_id: Uuid, combatants: Vec<Combatant>) -> Result<Self, CombatError> {
        let has_character = combatants
            .iter()
            .any(|c| c.combatant_type == CombatantType::Character);
        let has_enemy = combatants
            .iter()
            .any(|c| c.combatant_type == CombatantType::Enemy);
        if !has_character || !has_enemy {
            return Err(CombatError::Validation(
                "an encounter requires at least one Character and one Enemy".to_string(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            adventure_id,
            combatants,
            initiative_order: Vec::new(),
            current_turn_index: 0,
            current_round: 1,
            status: CombatStatus::NotStarted,
            winner: None,
            started_at: None,
            ended_at: None,
            version: 0,
            log: Vec::new(),
        })
    }

    /// Activate the encounter with a precomputed initiative order (spec
    /// §4.7 `StartCombat`). `initiative_order` must be a permutation of
    /// this encounter's combatant ids.
    pub fn start_combat(&mut self, initiative_order: Vec<Uuid>) -> Result<(), CombatError> {
        if self.status != CombatStatus::NotStarted {
            return Err(CombatError::InvalidState(
                "combat has already been started".to_string(),
            ));
        }
        if !self.is_permutation_of_combatants(&initiative_order) {
            return Err(CombatError::Validation(
                "initiative order must be a permutation of the encounter's combatants"
                    .to_string(),
            ));
        }

        self.initiative_order = initiative_order;
        self.status = CombatStatus::Active;
        self.started_at = Some(Utc::now());
        self.log.push(CombatLogEntry::CombatStarted);
        Ok(())
    }

    fn is_permutation_of_combatants(&self, order: &[Uuid]) -> bool {
        if order.len() != self.combatants.len() {
            return false;
        }
        let mut expected: Vec<Uuid> = self.combatants.iter().map(|c| c.id).collect();
        let mut got: Vec<Uuid> = order.to_vec();
        expected.sort();
        got.sort();
        expected == got
    }

    fn require_active(&self) -> Result<(), CombatError> {
        if self.status != CombatStatus::Active {
            return Err(CombatError::InvalidState(format!(
                "operation requires an Active encounter, found {:?}",
                self.status
            )));
        }
        Ok(())
    }

    pub fn combatant(&self, id: Uuid) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    pub fn combatant_mut(&mut self, id: Uuid) -> Option<&mut Combatant> {
        self.combatants.iter_mut().find(|c| c.id == id)
    }

    /// `initiativeOrder[currentTurnIndex]` while Active (spec §4.7
    /// derived observable).
    pub fn current_active_combatant_id(&self) -> Option<Uuid> {
        if self.status != CombatStatus::Active {
            return None;
        }
        self.initiative_order.get(self.current_turn_index).copied()
    }

    pub fn is_active(&self) -> bool {
        self.status == CombatStatus::Active
    }

    /// Advance the turn pointer, skipping past non-Active combatants and
    /// wrapping the round counter exactly once per wrap (spec §4.7
    /// `AdvanceToNextTurn`). The open skip-policy question (§9) is
    /// resolved here, inside the aggregate, rather than in the service.
    pub fn advance_to_next_turn(&mut self) -> Result<(), CombatError> {
        self.require_active()?;
        let len = self.initiative_order.len();
        if len == 0 {
            return Err(CombatError::InvalidState(
                "encounter has no initiative order".to_string(),
            ));
        }

        for _ in 0..len {
            let next_index = (self.current_turn_index + 1) % len;
            if next_index == 0 {
                self.current_round += 1;
                self.log.push(CombatLogEntry::RoundAdvanced {
                    round: self.current_round,
                });
            }
            self.current_turn_index = next_index;

            if self
                .combatant(self.initiative_order[next_index])
                .map(|c| c.is_active())
                .unwrap_or(false)
            {
                return Ok(());
            }
        }

        // A full cycle found no Active combatant; end detection (run by
        // the caller immediately after) will complete the encounter.
        Ok(())
    }

    /// Returns the winner if combat has ended, else `None` (spec §4.7
    /// `CheckCombatEnd`).
    pub fn check_combat_end(&self) -> Option<Winner> {
        let any_character_active = self
            .combatants
            .iter()
            .any(|c| c.combatant_type == CombatantType::Character && c.is_active());
        let any_enemy_active = self
            .combatants
            .iter()
            .any(|c| c.combatant_type == CombatantType::Enemy && c.is_active());

        if !any_character_active && !any_enemy_active {
            return Some(Winner::Draw);
        }
        if !any_enemy_active && any_character_active {
            return Some(Winner::Player);
        }
        if !any_character_active && any_enemy_active {
            return Some(Winner::Enemy);
        }
        None
    }

    /// Terminate the encounter. Idempotent when called again with the
    /// same `winner` (spec §4.7, §8).
    pub fn end_combat(&mut self, winner: Winner) -> Result<(), CombatError> {
        if self.status == CombatStatus::NotStarted {
            return Err(CombatError::InvalidState(
                "combat has not been started".to_string(),
            ));
        }
        if self.status == CombatStatus::Completed {
            return if self.winner == Some(winner) {
                Ok(())
            } else {
                Err(CombatError::InvalidState(
                    "combat already completed with a different winner".to_string(),
                ))
            };
        }

        self.status = CombatStatus::Completed;
        self.winner = Some(winner);
        self.ended_at = Some(Utc::now());
        self.log.push(CombatLogEntry::CombatEnded { winner });
        Ok(())
    }

    pub fn require_not_completed(&self) -> Result<(), CombatError> {
        if self.status == CombatStatus::Completed {
            return Err(CombatError::CombatEnded(format!(
                "encounter {} has already ended",
                self.id
            )));
        }
        Ok(())
    }
}
