//! Error taxonomy for the combat core.
//!
//! Every operation exposed by this crate returns a typed error from one
//! of the two enums below instead of throwing across a module boundary
//! (see spec §7 / §9). `CombatError::code` maps each variant to the
//! stable string the transport layer uses in its error response body.

use thiserror::Error;

/// Errors from dice notation parsing and validation (spec §4.1, §7).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The text does not conform to the dice expression grammar.
    #[error("invalid dice expression: {0}")]
    InvalidExpression(String),
    /// The text parses but violates a semantic bound (dice/sides count).
    #[error("dice expression validation failed: {0}")]
    Validation(String),
}

/// Errors from combat domain operations (spec §7).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombatError {
    /// Creation or request inputs violate a domain invariant.
    #[error("validation failed: {0}")]
    Validation(String),
    /// The referenced encounter, combatant, or entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The operation is not permitted in the encounter's current status.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// The acting combatant is not the currently active combatant.
    #[error("not your turn: {0}")]
    NotYourTurn(String),
    /// The target is not a legal target for this operation.
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    /// The encounter has already completed.
    #[error("combat has ended: {0}")]
    CombatEnded(String),
    /// Optimistic-concurrency version mismatch on save.
    #[error("version conflict: {0}")]
    Conflict(String),
}

impl CombatError {
    /// The stable error code from spec §6, for transport-layer mapping.
    pub fn code(&self) -> &'static str {
        match self {
            CombatError::Validation(_) => "VALIDATION",
            CombatError::NotFound(_) => "NOT_FOUND",
            CombatError::InvalidState(_) => "INVALID_STATE",
            CombatError::NotYourTurn(_) => "NOT_YOUR_TURN",
            CombatError::InvalidTarget(_) => "INVALID_TARGET",
            CombatError::CombatEnded(_) => "COMBAT_ENDED",
            CombatError::Conflict(_) => "CONFLICT",
        }
    }
}

impl From<ParseError> for CombatError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::InvalidExpression(msg) => CombatError::Validation(msg),
            ParseError::Validation(msg) => CombatError::Validation(msg),
        }
    }
}
