//! The combat participant entity (spec §3 `Combatant`).

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CombatError;

/// Default `Enemy.fleeThreshold` when a combatant's spec doesn't set one
/// (spec §3).
pub const DEFAULT_FLEE_THRESHOLD: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CombatantType {
    Character,
    Enemy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CombatantStatus {
    Active,
    Defeated,
    Fled,
}

/// Enemy behaviour state (spec §4.9). `None` for `Character` combatants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AiState {
    Aggressive,
    Defensive,
    Flee,
}

/// A single participant in a `CombatEncounter`.
///
/// `attack_modifier` and `weapon_damage_expression` are the minimal
/// attack data `ResolveTurn`/`ResolveAITurn` need to be self-contained
/// (spec §4.8's operation table takes only attacker/target ids, not a
/// per-call modifier) — they're populated once at creation from whatever
/// external character/enemy sheet supplied the combatant, which this
/// crate does not otherwise model (out of scope per §1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Combatant {
    pub id: Uuid,
    pub display_name: String,
    pub combatant_type: CombatantType,
    pub character_id: Option<Uuid>,
    pub enemy_id: Option<Uuid>,
    pub current_health: i64,
    pub max_health: i64,
    pub armor_class: i64,
    pub dexterity_modifier: i64,
    pub attack_modifier: i64,
    pub weapon_damage_expression: String,
    pub initiative_roll: u32,
    pub status: CombatantStatus,
    pub ai_state: Option<AiState>,
    pub resistant: bool,
    pub vulnerable: bool,
    /// The enemy's own flee threshold (spec §3 `Enemy.fleeThreshold`,
    /// default `0.25`), resolved at construction time. `None` for
    /// `Character` combatants, which have no AI to flee.
    pub flee_threshold: Option<f64>,
    /// Stable random key assigned once at creation, the final initiative
    /// tiebreaker (spec §4.4).
    pub tiebreak_key: u64,
}

/// Everything needed to stand up a `Combatant` except its initiative
/// roll and tiebreak key, which `Combatant::new` rolls itself.
pub struct CombatantSpec {
    pub display_name: String,
    pub character_id: Option<Uuid>,
    pub enemy_id: Option<Uuid>,
    pub max_health: i64,
    pub armor_class: i64,
    pub dexterity_modifier: i64,
    pub attack_modifier: i64,
    pub weapon_damage_expression: String,
    pub resistant: bool,
    pub vulnerable: bool,
    /// `Enemy.fleeThreshold` (spec §3): `None` means "use the default of
    /// 0.25". Ignored for `Character` combatants.
    pub flee_threshold: Option<f64>,
}

impl Combatant {
    /// Validate and construct a combatant, rolling its initiative die and
    /// assigning its stable tiebreak key (spec §3, §4.4).
    pub fn new(
        combatant_type: CombatantType,
        spec: CombatantSpec,
        rng: &mut dyn rand::RngCore,
    ) -> Result<Self, CombatError> {
        match combatant_type {
            CombatantType::Character => {
                if spec.character_id.is_none() || spec.enemy_id.is_some() {
                    return Err(CombatError::Validation(
                        "a Character combatant must set characterId and not enemyId".to_string(),
                    ));
                }
            }
            CombatantType::Enemy => {
                if spec.enemy_id.is_none() || spec.character_id.is_some() {
                    return Err(CombatError::Validation(
                        "an Enemy combatant must set enemyId and not characterId".to_string(),
                    ));
                }
            }
        }
        if spec.max_health <= 0 {
            return Err(CombatError::Validation(
                "maxHealth must be positive".to_string(),
            ));
        }
        if spec.armor_class < 10 {
            return Err(CombatError::Validation(
                "armorClass must be at least 10".to_string(),
            ));
        }
        if let Some(threshold) = spec.flee_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(CombatError::Validation(
                    "fleeThreshold must be within [0,1]".to_string(),
                ));
            }
        }

        let initiative_roll = rng.gen_range(1..=20u32);
        let tiebreak_key = rng.gen::<u64>();
        let ai_state = matches!(combatant_type, CombatantType::Enemy).then_some(AiState::Aggressive);
        let flee_threshold = matches!(combatant_type, CombatantType::Enemy)
            .then(|| spec.flee_threshold.unwrap_or(DEFAULT_FLEE_THRESHOLD));

        Ok(Self {
            id: Uuid::new_v4(),
            display_name: spec.display_name,
            combatant_type,
            character_id: spec.character_id,
            enemy_id: spec.enemy_id,
            current_health: spec.max_health,
            max_health: spec.max_health,
            armor_class: spec.armor_class,
            dexterity_modifier: spec.dexterity_modifier,
            attack_modifier: spec.attack_modifier,
            weapon_damage_expression: spec.weapon_damage_expression,
            initiative_roll,
            status: CombatantStatus::Active,
            ai_state,
            resistant: spec.resistant,
            vulnerable: spec.vulnerable,
            flee_threshold,
            tiebreak_key,
        })
    }

    pub fn initiative_score(&self) -> i64 {
        self.initiative_roll as i64 + self.dexterity_modifier
    }

    pub fn health_fraction(&self) -> f64 {
        self.current_health as f64 / self.max_health as f64
    }

    pub fn is_active(&self) -> bool {
        self.status == CombatantStatus::Active
    }

    /// Reduce health by `amount` (floored at 0) and mark `Defeated` if it
    /// reaches zero (spec §3 invariant: `status = Defeated ⇔ currentHealth = 0`).
    pub fn apply_damage(&mut self, amount: i64) {
        self.current_health = (self.current_health - amount).max(0);
        if self.current_health == 0 {
            self.status = CombatantStatus::Defeated;
        }
    }

    /// A `Fled` combatant is never reactivated (spec §3 invariant).
    pub fn mark_fled(&mut self) {
        self.status = CombatantStatus::Fled;
    }
}
