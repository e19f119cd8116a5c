//! Error types for the rules layer.

use thiserror::Error;

/// A malformed condition string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("unknown condition kind `{kind}` in `{raw}`")]
    UnknownKind { kind: String, raw: String },
}

/// Errors raised by the rules crate outside of condition parsing.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error(transparent)]
    Condition(#[from] ConditionError),

    #[error("invalid engine config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid world payload: {0}")]
    Payload(#[from] serde_json::Error),
}
