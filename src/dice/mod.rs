//! Dice notation: parsing, rolling, and statistics (spec §4.1-§4.3).

pub mod expression;
pub mod roller;
pub mod service;

pub use crate::error::ParseError;
pub use expression::{
    parse, parse_with_bounds, DiceExpression, DiceRollGroup, DEFAULT_MAX_DICE_COUNT,
    DEFAULT_MAX_DIE_SIDES,
};
pub use roller::{get_statistics, roll, DiceStatistics, RollResult};
pub use service::DiceService;
