// This file is part of rla-core.
// Based on the error taxonomy of a risk-limiting audit service; adapted from
// the structure of raire-rs's RaireError (thiserror + serde, clonable so it
// can be embedded in a result that itself gets serialized to JSON).

//! The error taxonomy for the audit engine: input validation, illegal state
//! transitions, missing entities, unauditable contests, and internal
//! failures. Every core operation returns one of these rather than
//! panicking or silently coercing bad input.

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum RlaError {
    /// Bad contest totals, malformed manifest row, missing CSV field, non-integer count.
    #[error("invalid input: {0}")]
    InputValidation(String),

    /// Illegal state transition: sample size changed after round 1 closed,
    /// draw attempted before manifest upload, reopening a closed round.
    #[error("illegal state transition: {0}")]
    State(String),

    /// Unknown election/jurisdiction/round/ballot identifier.
    #[error("not found: {0}")]
    NotFound(String),

    /// Reported margin is <= 0.5 for some winner/loser pair. Fatal for the audit;
    /// surfaced before any sampling is attempted.
    #[error("contest is not auditable by ballot polling: {0}")]
    Unauditable(String),

    /// Unexpected internal failure (e.g. inconsistent audited totals).
    #[error("internal error: {0}")]
    Internal(String),
}

impl RlaError {
    /// The taxonomy tag used on the HTTP/JSON boundary's `errorType` field.
    pub fn error_type(&self) -> &'static str {
        match self {
            RlaError::InputValidation(_) => "InputValidationError",
            RlaError::State(_) => "StateError",
            RlaError::NotFound(_) => "NotFoundError",
            RlaError::Unauditable(_) => "Unauditable",
            RlaError::Internal(_) => "InternalError",
        }
    }
}

pub type RlaResult<T> = Result<T, RlaError>;
