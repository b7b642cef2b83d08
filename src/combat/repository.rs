//! Repository port for `CombatEncounter` persistence (spec §5, SPEC_FULL.md §F).
//!
//! The core depends on this trait but never implements real persistence
//! itself — that collaborator is excluded per spec §1. `CombatService`
//! is generic over it; `InMemoryEncounterRepository` exists so this
//! crate's own tests (and the `cli` binary) have something real to run
//! against.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CombatError;

use super::encounter::CombatEncounter;

/// `Load`/`Save` contract from spec §5: "No other assumptions." `create`
/// is this crate's own addition — spec §5 is silent on how a brand-new
/// encounter enters storage, and `CombatService::initiate` needs exactly
/// one write that isn't a compare-and-swap against an existing version.
#[async_trait]
pub trait EncounterRepository: Send + Sync {
    async fn create(&self, encounter: CombatEncounter) -> Result<(), CombatError>;
    async fn load(&self, id: Uuid) -> Result<(CombatEncounter, u64), CombatError>;
    async fn save(&self, encounter: &CombatEncounter, expected_version: u64)
        -> Result<(), CombatError>;
}

/// An in-process repository backed by a mutex-guarded map. Compare-and-swaps
/// on `version` exactly as spec §5 requires; not a production persistence
/// layer (no durability beyond process lifetime).
#[derive(Default)]
pub struct InMemoryEncounterRepository {
    encounters: Mutex<HashMap<Uuid, (CombatEncounter, u64)>>,
}

impl InMemoryEncounterRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous convenience for tests that don't want to stand up an
    /// executor just to seed the map; equivalent to `create` without the
    /// duplicate-id check.
    pub fn insert(&self, encounter: CombatEncounter) {
        let mut guard = self.encounters.lock().unwrap_or_else(|e| e.into_inner());
        let version = encounter.version;
        guard.insert(encounter.id, (encounter, version));
    }
}

#[async_trait]
impl EncounterRepository for InMemoryEncounterRepository {
    async fn create(&self, encounter: CombatEncounter) -> Result<(), CombatError> {
        let mut guard = self.encounters.lock().unwrap_or_else(|e| e.into_inner());
        if guard.contains_key(&encounter.id) {
            return Err(CombatError::Validation(format!(
                "encounter {} already exists",
                encounter.id
            )));
        }
        let version = encounter.version;
        guard.insert(encounter.id, (encounter, version));
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<(CombatEncounter, u64), CombatError> {
        let guard = self.encounters.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .get(&id)
            .cloned()
            .ok_or_else(|| CombatError::NotFound(format!("encounter {} not found", id)))
    }

    async fn save(
        &self,
        encounter: &CombatEncounter,
        expected_version: u64,
    ) -> Result<(), CombatError> {
        let mut guard = self.encounters.lock().unwrap_or_else(|e| e.into_inner());
        match guard.get(&encounter.id) {
            None => {
                return Err(CombatError::NotFound(format!(
                    "encounter {} not found",
                    encounter.id
                )))
            }
            Some((_, stored_version)) if *stored_version != expected_version => {
                return Err(CombatError::Conflict(format!(
                    "encounter {} is at version {}, expected {}",
                    encounter.id, stored_version, expected_version
                )))
            }
            Some(_) => {}
        }

        let mut saved = encounter.clone();
        saved.version = expected_version + 1;
        guard.insert(encounter.id, (saved, expected_version + 1));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::combatant::{CombatantSpec, CombatantType};
    use crate::rng::seeded_rng;

    fn encounter() -> CombatEncounter {
        let mut rng = seeded_rng(1);
        let hero = crate::combat::combatant::Combatant::new(
            CombatantType::Character,
            CombatantSpec {
                display_name: "Hero".to_string(),
                character_id: Some(Uuid::new_v4()),
                enemy_id: None,
                max_health: 20,
                armor_class: 15,
                dexterity_modifier: 2,
                attack_modifier: 5,
                weapon_damage_expression: "1d8+3".to_string(),
                resistant: false,
                vulnerable: false,
                flee_threshold: None,
            },
            &mut rng,
        )
        .unwrap();
        let goblin = crate::combat::combatant::Combatant::new(
            CombatantType::Enemy,
            CombatantSpec {
                display_name: "Goblin".to_string(),
                character_id: None,
                enemy_id: Some(Uuid::new_v4()),
                max_health: 10,
                armor_class: 13,
                dexterity_modifier: 1,
                attack_modifier: 3,
                weapon_damage_expression: "1d6".to_string(),
                resistant: false,
                vulnerable: false,
                flee_threshold: None,
            },
            &mut rng,
        )
        .unwrap();
        CombatEncounter::create(Uuid::new_v4(), vec![hero, goblin]).unwrap()
    }

    #[tokio::test]
    async fn round_trips_through_load_and_save() {
        let repo = InMemoryEncounterRepository::new();
        let mut encounter = encounter();
        repo.insert(encounter.clone());

        let (mut loaded, version) = repo.load(encounter.id).await.unwrap();
        assert_eq!(version, 0);
        loaded.current_round = 2;
        repo.save(&loaded, version).await.unwrap();

        let (reloaded, version2) = repo.load(encounter.id).await.unwrap();
        assert_eq!(reloaded.current_round, 2);
        assert_eq!(version2, 1);
        encounter = reloaded;
        let _ = encounter;
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let repo = InMemoryEncounterRepository::new();
        let encounter = encounter();
        repo.insert(encounter.clone());

        repo.save(&encounter, 0).await.unwrap();
        assert!(matches!(
            repo.save(&encounter, 0).await,
            Err(CombatError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn load_missing_encounter_is_not_found() {
        let repo = InMemoryEncounterRepository::new();
        assert!(matches!(
            repo.load(Uuid::new_v4()).await,
            Err(CombatError::NotFound(_))
        ));
    }
}
