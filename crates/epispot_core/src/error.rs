//! Errors raised by model construction, integration and data handling.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EpiError>;

#[derive(Debug, Error)]
pub enum EpiError {
    #[error("failed to parse `{expression}`: {message}")]
    Parse { expression: String, message: String },

    #[error("unknown symbol `{0}`")]
    UnknownSymbol(String),

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("invalid compartment {target} found connected to compartment {from}")]
    InvalidConnection { from: String, target: String },

    #[error(
        "the {0} compartment must have exactly one connection to either the Infected or Exposed compartment"
    )]
    SusceptibleFanOut(String),

    #[error("custom compartment {0} cannot be checked; compile with custom checks disabled")]
    UncheckedCustom(String),

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("model has not been compiled yet")]
    NotCompiled,

    #[error("state has {found} entries but the model has {expected} compartments")]
    StateDimension { expected: usize, found: usize },

    #[error("invalid timesteps: {0}")]
    Timesteps(String),

    #[error("no match found for `{0}`; try a different query or register the estimate manually")]
    NoMatch(String),

    #[error("invalid data: {0}")]
    Data(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
