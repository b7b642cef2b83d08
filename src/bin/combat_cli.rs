//! Manual exploration tool for the dice and combat engines (SPEC_FULL.md
//! §A). Not the external interface from spec §6 — that's HTTP, owned by
//! the excluded transport layer — and nothing in this crate's own tests
//! depends on it.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use combat_core::combat::{
    AiTurnOutcome, CombatService, CombatantSpec, InMemoryEncounterRepository, InitiateRequest,
};
use combat_core::config::CombatConfig;
use combat_core::dice::DiceService;
use combat_core::rng;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "combat_cli")]
#[command(about = "Roll dice notation and run scripted encounters against combat-core")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Roll a dice expression and print its breakdown.
    Roll {
        /// Dice notation, e.g. "2d6+1d4+3" or "1d20a"
        expression: String,
        /// RNG seed for a reproducible roll (defaults to the OS CSPRNG)
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Print the min/max/mean of a dice expression without rolling it.
    Stats {
        /// Dice notation
        expression: String,
    },
    /// Run a scripted encounter from a scenario file to completion,
    /// printing a turn-by-turn log.
    Simulate {
        /// Path to a scenario JSON file (see `ScenarioFile`)
        scenario: PathBuf,
        /// RNG seed for a reproducible run (defaults to the OS CSPRNG)
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Roll { expression, seed } => run_roll(&expression, seed),
        Commands::Stats { expression } => run_stats(&expression),
        Commands::Simulate { scenario, seed } => run_simulate(&scenario, seed),
    }
}

fn run_roll(expression: &str, seed: Option<u64>) {
    let dice = DiceService::default();
    let mut rng = seed.map(rng::seeded_rng).unwrap_or_else(rng::secure_rng);
    match dice.roll(expression, &mut rng) {
        Ok(result) => println!("{}", dice.describe(&result)),
        Err(err) => eprintln!("error: {err}"),
    }
}

fn run_stats(expression: &str) {
    let dice = DiceService::default();
    match dice.get_statistics(expression) {
        Ok(stats) => println!(
            "min={} max={} mean={:.2}",
            stats.min, stats.max, stats.mean
        ),
        Err(err) => eprintln!("error: {err}"),
    }
}

/// A stat block for one side of a scripted encounter.
#[derive(Debug, Deserialize)]
struct ScenarioCombatant {
    name: String,
    max_health: i64,
    armor_class: i64,
    #[serde(default)]
    dexterity_modifier: i64,
    attack_modifier: i64,
    weapon: String,
    #[serde(default)]
    resistant: bool,
    #[serde(default)]
    vulnerable: bool,
    /// Enemy-only `fleeThreshold` override (spec §3); ignored for
    /// characters. Absent or `null` means "use the default of 0.25".
    #[serde(default)]
    flee_threshold: Option<f64>,
}

impl ScenarioCombatant {
    fn into_spec(self, character_id: Option<Uuid>, enemy_id: Option<Uuid>) -> CombatantSpec {
        CombatantSpec {
            display_name: self.name,
            character_id,
            enemy_id,
            max_health: self.max_health,
            armor_class: self.armor_class,
            dexterity_modifier: self.dexterity_modifier,
            attack_modifier: self.attack_modifier,
            weapon_damage_expression: self.weapon,
            resistant: self.resistant,
            vulnerable: self.vulnerable,
            flee_threshold: self.flee_threshold,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScenarioFile {
    characters: Vec<ScenarioCombatant>,
    enemies: Vec<ScenarioCombatant>,
}

fn run_simulate(scenario_path: &PathBuf, seed: Option<u64>) {
    let content = match fs::read_to_string(scenario_path) {
        Ok(c) => c,
        Err(err) => {
            eprintln!("error: could not read {}: {err}", scenario_path.display());
            return;
        }
    };
    let scenario: ScenarioFile = match serde_json::from_str(&content) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("error: invalid scenario JSON: {err}");
            return;
        }
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("failed to build runtime");
    runtime.block_on(simulate(scenario, seed));
}

async fn simulate(scenario: ScenarioFile, seed: Option<u64>) {
    let mut rng = seed.map(rng::seeded_rng).unwrap_or_else(rng::secure_rng);
    let repository = Arc::new(InMemoryEncounterRepository::new());
    let service = CombatService::new(repository, CombatConfig::default());

    let characters = scenario
        .characters
        .into_iter()
        .map(|c| c.into_spec(Some(Uuid::new_v4()), None))
        .collect();
    let enemies = scenario
        .enemies
        .into_iter()
        .map(|e| e.into_spec(None, Some(Uuid::new_v4())))
        .collect();

    let mut snapshot = match service
        .initiate(
            InitiateRequest {
                adventure_id: Uuid::new_v4(),
                characters,
                enemies,
            },
            &mut rng,
        )
        .await
    {
        Ok(s) => s,
        Err(err) => {
            eprintln!("error: could not initiate combat: {err}");
            return;
        }
    };
    println!(
        "Encounter {} started with {} combatants, round {}",
        snapshot.encounter_id,
        snapshot.combatants.len(),
        snapshot.round
    );

    // No interactive player: every combatant's turn is resolved by the
    // AI-turn path against the opposing side's first Active target, so
    // the whole encounter can be driven to completion from the CLI.
    let mut guard = 0;
    while snapshot.winner.is_none() && guard < 10_000 {
        guard += 1;
        let current_id = match snapshot.current_combatant_id {
            Some(id) => id,
            None => break,
        };
        let current = snapshot
            .combatants
            .iter()
            .find(|c| c.id == current_id)
            .expect("current combatant id must be in the snapshot");

        if current.combatant_type == combat_core::combat::CombatantType::Enemy {
            match service.resolve_ai_turn(snapshot.encounter_id, &mut rng).await {
                Ok(turn) => {
                    describe_ai_outcome(&turn.outcome);
                    snapshot = turn.snapshot;
                }
                Err(err) => {
                    eprintln!("error: {err}");
                    return;
                }
            }
        } else {
            let target_id = snapshot
                .combatants
                .iter()
                .find(|c| c.combatant_type == combat_core::combat::CombatantType::Enemy)
                .map(|c| c.id);
            let Some(target_id) = target_id else {
                break;
            };
            match service
                .resolve_turn(snapshot.encounter_id, current_id, target_id, &mut rng)
                .await
            {
                Ok(turn) => {
                    println!(
                        "{} attacks {}: d20={} hit={} crit={} damage={:?}",
                        current.display_name,
                        target_id,
                        turn.outcome.outcome.d20_roll,
                        turn.outcome.outcome.is_hit,
                        turn.outcome.outcome.is_critical,
                        turn.outcome.damage
                    );
                    snapshot = turn.snapshot;
                }
                Err(err) => {
                    eprintln!("error: {err}");
                    return;
                }
            }
        }
    }

    println!(
        "Combat ended after round {}: status={:?} winner={:?}",
        snapshot.round, snapshot.status, snapshot.winner
    );
}

fn describe_ai_outcome(outcome: &AiTurnOutcome) {
    match outcome {
        AiTurnOutcome::Attacked(summary) => println!(
            "enemy {} attacks {}: d20={} hit={} crit={} damage={:?}",
            summary.attacker_id,
            summary.target_id,
            summary.outcome.d20_roll,
            summary.outcome.is_hit,
            summary.outcome.is_critical,
            summary.damage
        ),
        AiTurnOutcome::Fled { combatant_id } => println!("enemy {combatant_id} flees"),
        AiTurnOutcome::Passed { combatant_id } => {
            println!("enemy {combatant_id} has no valid target and passes")
        }
    }
}
