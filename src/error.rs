use crate::entity::{EntityId, SpecError};
use crate::Tick;
use thiserror::Error;

/// Errors returned by engine operations.
///
/// Every variant leaves engine state unchanged. Subscriber handler failures are
/// not represented here: the event bus isolates and logs them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Spawn request is missing or has ill-typed fields for its variant
    #[error("invalid entity spec: {0}")]
    InvalidEntitySpec(#[from] SpecError),

    /// Operation targets an unknown or tombstoned entity
    #[error("invalid entity id {0}")]
    InvalidEntityId(EntityId),

    /// Requested anchor tick is not in the snapshot window
    #[error("rollback anchor tick {anchor} out of range (stored window: {})", window(.oldest, .newest))]
    RollbackOutOfRange {
        anchor: Tick,
        oldest: Option<Tick>,
        newest: Option<Tick>,
    },

    /// Engine configuration failed validation
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
}

fn window(oldest: &Option<Tick>, newest: &Option<Tick>) -> String {
    match (oldest, newest) {
        (Some(oldest), Some(newest)) => format!("{}..={}", oldest, newest),
        _ => "empty".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message_names_window() {
        let err = EngineError::RollbackOutOfRange {
            anchor: 3,
            oldest: Some(10),
            newest: Some(20),
        };
        assert_eq!(
            err.to_string(),
            "rollback anchor tick 3 out of range (stored window: 10..=20)"
        );

        let empty = EngineError::RollbackOutOfRange {
            anchor: 3,
            oldest: None,
            newest: None,
        };
        assert!(empty.to_string().ends_with("(stored window: empty)"));
    }

    #[test]
    fn test_spec_error_converts() {
        let err: EngineError = SpecError::MissingField("pos").into();
        assert_eq!(err, EngineError::InvalidEntitySpec(SpecError::MissingField("pos")));
        assert_eq!(err.to_string(), "invalid entity spec: pos is required");
    }
}
