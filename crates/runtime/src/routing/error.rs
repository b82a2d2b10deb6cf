//! Error types for the routing module

use thiserror::Error;

/// Errors raised while building or reloading routing tables
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("Rule '{rule}' targets unknown handler '{handler}'")]
    UnknownTarget { rule: String, handler: String },

    #[error("Duplicate rule name: {rule}")]
    DuplicateRule { rule: String },

    #[error("Invalid rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("Invalid regex in rule '{rule}': {pattern} - {source}")]
    InvalidPattern {
        rule: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Intent pattern #{index} is invalid: {reason}")]
    InvalidIntent { index: usize, reason: String },

    #[error("Intent pattern #{index} targets unknown handler '{handler}'")]
    UnknownIntentTarget { index: usize, handler: String },
}

impl RoutingError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RoutingError::UnknownTarget { .. } | RoutingError::UnknownIntentTarget { .. } => {
                ErrorSeverity::High
            }
            RoutingError::InvalidPattern { .. } => ErrorSeverity::High,
            RoutingError::DuplicateRule { .. } => ErrorSeverity::Medium,
            RoutingError::InvalidRule { .. } | RoutingError::InvalidIntent { .. } => {
                ErrorSeverity::Medium
            }
        }
    }
}

/// Error severity levels
///
/// `High` means the table references something that does not exist;
/// `Medium` covers malformed but self-contained entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Medium,
    High,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dangling_targets_are_high_severity() {
        let err = RoutingError::UnknownTarget {
            rule: "r".into(),
            handler: "ghost".into(),
        };
        assert_eq!(err.severity(), ErrorSeverity::High);

        let err = RoutingError::UnknownIntentTarget {
            index: 0,
            handler: "ghost".into(),
        };
        assert_eq!(err.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_malformed_entries_are_medium_severity() {
        let err = RoutingError::DuplicateRule { rule: "r".into() };
        assert_eq!(err.severity(), ErrorSeverity::Medium);

        let err = RoutingError::InvalidIntent {
            index: 2,
            reason: "no keywords".into(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Medium);
    }
}
