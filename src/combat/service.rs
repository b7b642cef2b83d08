//! The combat orchestrator (spec §4.8): the one surface a transport
//! layer calls. Each operation loads the encounter, checks status and
//! turn ownership, delegates to the domain helpers in this module and
//! in `dice`, mutates the aggregate, persists it, and returns a
//! snapshot DTO — never a raw `CombatEncounter`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::CombatConfig;
use crate::dice::DiceService;
use crate::error::CombatError;
use crate::rng::DiceRng;

use super::ai::{self, AiAction};
use super::attack::{self, AttackOutcome};
use super::combatant::{AiState, Combatant, CombatantSpec, CombatantStatus, CombatantType};
use super::damage;
use super::encounter::{CombatEncounter, CombatStatus, Winner};
use super::initiative;
use super::repository::EncounterRepository;

/// Inputs to `CombatService::initiate` (spec §4.8 `Initiate`, §6 request
/// shape). The transport layer has already resolved `characterIds`/
/// `enemyIds` into full stat blocks by this point — the core has no
/// access to the character/enemy domain services that own that lookup
/// (spec §1, §3 "Enemy … external reference, read-only to the core").
pub struct InitiateRequest {
    pub adventure_id: Uuid,
    pub characters: Vec<CombatantSpec>,
    pub enemies: Vec<CombatantSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatantSummary {
    pub id: Uuid,
    pub display_name: String,
    pub combatant_type: CombatantType,
    pub current_health: i64,
    pub max_health: i64,
    pub status: CombatantStatus,
    pub ai_state: Option<AiState>,
}

impl From<&Combatant> for CombatantSummary {
    fn from(c: &Combatant) -> Self {
        Self {
            id: c.id,
            display_name: c.display_name.clone(),
            combatant_type: c.combatant_type,
            current_health: c.current_health,
            max_health: c.max_health,
            status: c.status,
            ai_state: c.ai_state,
        }
    }
}

/// The DTO every `CombatService` operation returns (spec §6 "Combat
/// snapshot").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatSnapshot {
    pub encounter_id: Uuid,
    pub status: CombatStatus,
    pub round: u32,
    pub current_combatant_id: Option<Uuid>,
    pub initiative_order: Vec<Uuid>,
    pub winner: Option<Winner>,
    pub combatants: Vec<CombatantSummary>,
    pub active_combatants: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub version: u64,
}

fn snapshot(encounter: &CombatEncounter) -> CombatSnapshot {
    let active_combatants = encounter
        .combatants
        .iter()
        .filter(|c| c.is_active())
        .count();
    CombatSnapshot {
        encounter_id: encounter.id,
        status: encounter.status,
        round: encounter.current_round,
        current_combatant_id: encounter.current_active_combatant_id(),
        initiative_order: encounter.initiative_order.clone(),
        winner: encounter.winner,
        combatants: encounter.combatants.iter().map(CombatantSummary::from).collect(),
        active_combatants,
        started_at: encounter.started_at,
        ended_at: encounter.ended_at,
        version: encounter.version,
    }
}

/// The result of an attack (player-driven or AI-driven): the d20
/// resolution plus the damage actually applied, if any (spec §6
/// "Attack + damage summary").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackSummary {
    pub attacker_id: Uuid,
    pub target_id: Uuid,
    pub outcome: AttackOutcome,
    pub damage: Option<i64>,
    pub target_defeated: bool,
}

/// What `ResolveAITurn` actually did (spec §4.8, §4.9): an enemy turn
/// may attack, flee, or pass if no legal target exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum AiTurnOutcome {
    Attacked(AttackSummary),
    Fled { combatant_id: Uuid },
    Passed { combatant_id: Uuid },
}

/// Final result type every service operation returns: the snapshot plus
/// whatever happened this call.
pub struct TurnResult<T> {
    pub outcome: T,
    pub snapshot: CombatSnapshot,
}

/// Orchestrates the dice and combat domain modules behind the operation
/// table in spec §4.8. Generic over the repository port so tests and the
/// CLI can run against `InMemoryEncounterRepository` while a production
/// deployment supplies its own.
pub struct CombatService {
    repository: Arc<dyn EncounterRepository>,
    dice: DiceService,
}

impl CombatService {
    pub fn new(repository: Arc<dyn EncounterRepository>, config: CombatConfig) -> Self {
        let dice = DiceService::new(config);
        Self { repository, dice }
    }

    /// `Initiate` (spec §4.8): build combatants for both sides, roll
    /// initiative, start combat immediately, and persist the new
    /// encounter. Fails with `Validation` if either side is empty (the
    /// same invariant `CombatEncounter::create` enforces).
    pub async fn initiate(
        &self,
        request: InitiateRequest,
        rng: &mut dyn RngCore,
    ) -> Result<CombatSnapshot, CombatError> {
        if request.characters.is_empty() || request.enemies.is_empty() {
            return Err(CombatError::Validation(
                "initiating combat requires at least one character and one enemy".to_string(),
            ));
        }

        let mut combatants = Vec::with_capacity(request.characters.len() + request.enemies.len());
        for spec in request.characters {
            combatants.push(Combatant::new(CombatantType::Character, spec, rng)?);
        }
        for spec in request.enemies {
            combatants.push(Combatant::new(CombatantType::Enemy, spec, rng)?);
        }

        let order = initiative::compute_order(&combatants);
        let mut encounter = CombatEncounter::create(request.adventure_id, combatants)?;
        encounter.start_combat(order)?;

        log::info!(
            "encounter {} initiated with {} combatants",
            encounter.id,
            encounter.combatants.len()
        );

        self.repository.create(encounter.clone()).await?;
        Ok(snapshot(&encounter))
    }

    /// `GetStatus` (spec §4.8).
    pub async fn get_status(&self, encounter_id: Uuid) -> Result<CombatSnapshot, CombatError> {
        let (encounter, _version) = self.repository.load(encounter_id).await?;
        Ok(snapshot(&encounter))
    }

    /// `ResolveTurn` (spec §4.8): a player-driven attack. Verifies turn
    /// ownership and target legality, resolves the d20 roll, rolls
    /// damage on a hit, advances the turn, and runs end detection.
    pub async fn resolve_turn(
        &self,
        encounter_id: Uuid,
        attacker_id: Uuid,
        target_id: Uuid,
        rng: &mut dyn DiceRng,
    ) -> Result<TurnResult<AttackSummary>, CombatError> {
        let (mut encounter, version) = self.repository.load(encounter_id).await?;
        encounter.require_not_completed()?;
        self.require_current_actor(&encounter, attacker_id)?;
        self.require_opposing_target(&encounter, attacker_id, target_id)?;

        let summary = self.execute_attack(&mut encounter, attacker_id, target_id, rng)?;
        self.finish_turn(&mut encounter, version).await?;
        Ok(TurnResult {
            outcome: summary,
            snapshot: snapshot(&encounter),
        })
    }

    /// `ResolveAITurn` (spec §4.8, §4.9): evaluate the active enemy's AI
    /// state, pick an action, and apply it exactly as a player action
    /// would be applied.
    pub async fn resolve_ai_turn(
        &self,
        encounter_id: Uuid,
        rng: &mut dyn DiceRng,
    ) -> Result<TurnResult<AiTurnOutcome>, CombatError> {
        let (mut encounter, version) = self.repository.load(encounter_id).await?;
        encounter.require_not_completed()?;
        if !encounter.is_active() {
            return Err(CombatError::InvalidState(
                "encounter is not Active".to_string(),
            ));
        }
        let actor_id = encounter.current_active_combatant_id().ok_or_else(|| {
            CombatError::InvalidState("encounter has no current combatant".to_string())
        })?;

        let actor = encounter
            .combatant(actor_id)
            .ok_or_else(|| CombatError::NotFound(format!("combatant {} not found", actor_id)))?;
        if actor.combatant_type != CombatantType::Enemy {
            return Err(CombatError::NotYourTurn(
                "it is not an enemy's turn".to_string(),
            ));
        }

        let state = ai::evaluate_state(actor);
        let opponents: Vec<&Combatant> = encounter
            .combatants
            .iter()
            .filter(|c| c.combatant_type == CombatantType::Character)
            .collect();
        let action = ai::select_action(state, &opponents);

        if let Some(enemy) = encounter.combatant_mut(actor_id) {
            enemy.ai_state = Some(state);
        }
        log::debug!("enemy {} evaluated AI state {:?}", actor_id, state);

        let outcome = match action {
            AiAction::Attack { target_id } => {
                let summary = self.execute_attack(&mut encounter, actor_id, target_id, rng)?;
                AiTurnOutcome::Attacked(summary)
            }
            AiAction::Flee => {
                if let Some(enemy) = encounter.combatant_mut(actor_id) {
                    enemy.mark_fled();
                }
                encounter
                    .log
                    .push(super::encounter::CombatLogEntry::CombatantFled {
                        combatant_id: actor_id,
                    });
                AiTurnOutcome::Fled {
                    combatant_id: actor_id,
                }
            }
            AiAction::Pass => AiTurnOutcome::Passed {
                combatant_id: actor_id,
            },
        };

        self.finish_turn(&mut encounter, version).await?;
        Ok(TurnResult {
            outcome,
            snapshot: snapshot(&encounter),
        })
    }

    /// `Flee` (spec §4.8): the acting combatant voluntarily leaves
    /// combat. Turn ownership rules are identical to an attack.
    pub async fn flee(
        &self,
        encounter_id: Uuid,
        combatant_id: Uuid,
    ) -> Result<CombatSnapshot, CombatError> {
        let (mut encounter, version) = self.repository.load(encounter_id).await?;
        encounter.require_not_completed()?;
        self.require_current_actor(&encounter, combatant_id)?;

        let combatant = encounter.combatant_mut(combatant_id).ok_or_else(|| {
            CombatError::NotFound(format!("combatant {} not found", combatant_id))
        })?;
        combatant.mark_fled();
        encounter
            .log
            .push(super::encounter::CombatLogEntry::CombatantFled { combatant_id });

        self.finish_turn(&mut encounter, version).await?;
        Ok(snapshot(&encounter))
    }

    /// `Defend` (SPEC_FULL.md §G.3): a turn-consuming no-op. spec §9 names
    /// `Defend` as a tagged action variant alongside Attack/Flee/Pass but
    /// never resolves its mechanical effect, so this crate grants none —
    /// it only consumes the acting combatant's turn.
    pub async fn defend(
        &self,
        encounter_id: Uuid,
        combatant_id: Uuid,
    ) -> Result<CombatSnapshot, CombatError> {
        let (mut encounter, version) = self.repository.load(encounter_id).await?;
        encounter.require_not_completed()?;
        self.require_current_actor(&encounter, combatant_id)?;

        encounter
            .log
            .push(super::encounter::CombatLogEntry::CombatantDefended { combatant_id });

        self.finish_turn(&mut encounter, version).await?;
        Ok(snapshot(&encounter))
    }

    fn require_current_actor(
        &self,
        encounter: &CombatEncounter,
        actor_id: Uuid,
    ) -> Result<(), CombatError> {
        if !encounter.is_active() {
            return Err(CombatError::InvalidState(
                "encounter is not Active".to_string(),
            ));
        }
        match encounter.current_active_combatant_id() {
            Some(current) if current == actor_id => Ok(()),
            _ => Err(CombatError::NotYourTurn(format!(
                "combatant {} is not the active combatant",
                actor_id
            ))),
        }
    }

    fn require_opposing_target(
        &self,
        encounter: &CombatEncounter,
        attacker_id: Uuid,
        target_id: Uuid,
    ) -> Result<(), CombatError> {
        let attacker = encounter
            .combatant(attacker_id)
            .ok_or_else(|| CombatError::NotFound(format!("combatant {} not found", attacker_id)))?;
        let target = encounter
            .combatant(target_id)
            .ok_or_else(|| CombatError::NotFound(format!("combatant {} not found", target_id)))?;
        if target.combatant_type == attacker.combatant_type {
            return Err(CombatError::InvalidTarget(
                "target is on the same side as the attacker".to_string(),
            ));
        }
        Ok(())
    }

    /// Shared by `ResolveTurn` and `ResolveAITurn`: roll the attack, roll
    /// damage on a hit, and apply it to the target.
    fn execute_attack(
        &self,
        encounter: &mut CombatEncounter,
        attacker_id: Uuid,
        target_id: Uuid,
        rng: &mut dyn DiceRng,
    ) -> Result<AttackSummary, CombatError> {
        let attacker = encounter
            .combatant(attacker_id)
            .ok_or_else(|| CombatError::NotFound(format!("combatant {} not found", attacker_id)))?
            .clone();
        let target = encounter
            .combatant(target_id)
            .ok_or_else(|| CombatError::NotFound(format!("combatant {} not found", target_id)))?
            .clone();

        let outcome = attack::resolve_attack(&attacker, &target, rng)?;

        let mut damage = None;
        let mut target_defeated = false;
        if outcome.is_hit {
            let amount = damage::roll_damage(
                &attacker.weapon_damage_expression,
                attacker.attack_modifier,
                outcome.is_critical,
                target.resistant,
                target.vulnerable,
                &self.dice,
                rng,
            )?;
            damage = Some(amount);
            if let Some(t) = encounter.combatant_mut(target_id) {
                t.apply_damage(amount);
                target_defeated = t.status == CombatantStatus::Defeated;
            }
        }

        log::info!(
            "attack {} -> {}: d20={} hit={} crit={} damage={:?}",
            attacker_id,
            target_id,
            outcome.d20_roll,
            outcome.is_hit,
            outcome.is_critical,
            damage
        );

        encounter
            .log
            .push(super::encounter::CombatLogEntry::AttackResolved {
                attacker_id,
                target_id,
                is_hit: outcome.is_hit,
                is_critical: outcome.is_critical,
                damage,
            });
        if target_defeated {
            encounter
                .log
                .push(super::encounter::CombatLogEntry::CombatantDefeated {
                    combatant_id: target_id,
                });
        }

        Ok(AttackSummary {
            attacker_id,
            target_id,
            outcome,
            damage,
            target_defeated,
        })
    }

    /// Advance the turn, run end detection, and persist — the tail every
    /// mutating operation shares (spec §4.8 "Turn protocol").
    async fn finish_turn(
        &self,
        encounter: &mut CombatEncounter,
        expected_version: u64,
    ) -> Result<(), CombatError> {
        encounter.advance_to_next_turn()?;
        if let Some(winner) = encounter.check_combat_end() {
            encounter.end_combat(winner)?;
            log::info!("encounter {} ended: {:?}", encounter.id, winner);
        }
        self.repository.save(encounter, expected_version).await?;
        encounter.version = expected_version + 1;
        Ok(())
    }
}
