//! `combat-core`: the dice expression engine and turn-based combat
//! encounter subsystem described in this repository's design
//! documents. A transport layer, persistence layer, and the wider
//! adventure/character/inventory domain consume this crate through
//! [`combat::CombatService`] and [`combat::EncounterRepository`]; none
//! of those collaborators live here.

pub mod combat;
pub mod config;
pub mod dice;
pub mod error;
pub mod rng;

pub use config::CombatConfig;
pub use error::{CombatError, ParseError};
