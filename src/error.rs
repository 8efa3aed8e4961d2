use thiserror::Error;

use crate::input::Action;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("fighter id must be 1 or 2, got {0}")]
    InvalidFighterId(u8),
    #[error("no input symbol bound to {0:?}")]
    EmptySymbol(Action),
    #[error("symbol {symbol:?} is bound to both {first:?} and {second:?}")]
    DuplicateSymbol {
        symbol: String,
        first: Action,
        second: Action,
    },
    #[error("symbol {0:?} is bound for both fighters")]
    SharedSymbol(String),
    #[error("fighters must have distinct ids")]
    DuplicateFighterId,
}
