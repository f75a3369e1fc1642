//! Cross-cutting error types for Panel.
//!
//! Storage errors live in `panel-db` (`DatabaseError`), which wraps
//! `CoreError` so domain failures surface unchanged through the service.

use thiserror::Error;

use crate::enums::EntityType;

/// Domain failures raised by any Panel operation.
///
/// Every variant aborts the operation with no partial writes.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: EntityType, id: String },

    /// A state machine transition was attempted that is not allowed, or the
    /// record changed status since it was read.
    #[error("Invalid state transition: {entity_type} {id} from {from} to {to}")]
    InvalidTransition {
        entity_type: EntityType,
        id: String,
        from: String,
        to: String,
    },

    /// A selection or assignment rule was broken (duplicate reviewer,
    /// reviewer is the author, missing capability, panel too large).
    #[error("Policy violation: {0}")]
    PolicyViolation(String),

    /// The caller lacks the capability or ownership the action requires.
    #[error("Forbidden: user {user_id} may not {action}")]
    Forbidden { user_id: String, action: String },

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoreError {
    pub fn not_found(entity_type: EntityType, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn invalid_transition(
        entity_type: EntityType,
        id: impl Into<String>,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        Self::InvalidTransition {
            entity_type,
            id: id.into(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn forbidden(user_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Forbidden {
            user_id: user_id.into(),
            action: action.into(),
        }
    }
}
