//! Error taxonomy of the interpretive core.

use spirit_rules::{ConditionError, RulesError};
use thiserror::Error;

/// Referenced data that is not there. Terminal for the session that hit it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("story `{0}` could not be found")]
    MissingStory(String),

    #[error("spirit `{0}` could not be found")]
    MissingSpirit(String),

    #[error("person `{0}` could not be found")]
    MissingNpc(String),

    #[error("unknown data collection `{0}`")]
    UnknownCollection(String),

    #[error("collection `{name}` is malformed: {reason}")]
    Malformed { name: String, reason: String },
}

/// A sub-flow that was abandoned or answered with the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubFlowError {
    #[error("sub-flow `{0}` was cancelled")]
    Cancelled(String),

    #[error("sub-flow `{key}` answered with an unexpected result")]
    UnexpectedResponse { key: String },

    #[error("sub-flow `{key}` failed: {reason}")]
    Failed { key: String, reason: String },
}

/// Option provider failures. Always recovered by falling back to local options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("option provider is not ready")]
    NotReady,

    #[error("option provider returned {0} options")]
    BadOptionCount(usize),

    #[error("option provider failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save storage failed: {0}")]
    Storage(String),

    #[error(transparent)]
    Payload(#[from] RulesError),

    #[error("settings could not be encoded: {0}")]
    Settings(#[from] serde_json::Error),
}

/// Top-level error of the core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Condition(#[from] ConditionError),

    #[error(transparent)]
    SubFlow(#[from] SubFlowError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error("negotiation with `{0}` has already ended")]
    SessionClosed(String),
}

impl CoreError {
    /// Message suitable for showing to the player before the session closes.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Data(DataError::MissingStory(_)) => {
                "This story could not be found.".to_string()
            }
            CoreError::Data(DataError::MissingSpirit(_)) => {
                "That spirit is nowhere to be found.".to_string()
            }
            CoreError::Data(DataError::MissingNpc(_)) => {
                "That person is nowhere to be found.".to_string()
            }
            CoreError::Data(_) => "Game data could not be read.".to_string(),
            other => other.to_string(),
        }
    }
}
