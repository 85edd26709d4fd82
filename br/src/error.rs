//! Pattern error types

use thiserror::Error;

/// Errors raised while building or driving patterns.
///
/// Everything except [`PatternError::RngUnavailable`] is an authoring mistake:
/// it is detected when a property set or loop is constructed and is never
/// retried. Clipping and cancellation are not errors; they surface as a
/// `done(false)` completion.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("Parametrization {strategy} requires a max-times repeat count")]
    RepeatCountRequired { strategy: String },

    #[error("Laser-time indexing requires a laser emitter, but {emitter} is not one")]
    NotLaser { emitter: String },

    #[error("A summon-along handler cannot be combined with an offset function")]
    TrackingWithOffsetFunction,

    #[error("Unpause requires a while predicate")]
    UnpauseWithoutWhile,

    #[error("{kind} patterns are not allowed to have property {property}")]
    PropertyNotAllowed { property: String, kind: String },

    #[error("Expected a {expected} property set, got {found}")]
    KindMismatch { expected: String, found: String },

    #[error("Random draw requested outside of a simulation tick")]
    RngUnavailable,

    #[error("Script error: {0}")]
    Script(String),
}

impl PatternError {
    /// Check if this error is an authoring mistake detected at construction
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::RngUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_count_message() {
        let err = PatternError::RepeatCountRequired {
            strategy: "mod".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("mod"));
        assert!(msg.contains("max-times"));
    }

    #[test]
    fn test_property_not_allowed_message() {
        let err = PatternError::PropertyNotAllowed {
            property: "wait".to_string(),
            kind: "sync".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.starts_with("sync patterns"));
        assert!(msg.contains("wait"));
    }

    #[test]
    fn test_is_configuration() {
        assert!(PatternError::UnpauseWithoutWhile.is_configuration());
        assert!(PatternError::TrackingWithOffsetFunction.is_configuration());
        assert!(!PatternError::RngUnavailable.is_configuration());
    }
}
