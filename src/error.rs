//! Typed errors for the probe engine.
//!
//! Uses `thiserror` for library errors (not `anyhow`). There is deliberately
//! one error type: every violation a target can commit — a missing member, a
//! shape mismatch, a broken constraint — means its observable contract has
//! changed, and the extraction session that noticed it cannot recover. Each
//! variant is fatal to that one session and to nothing else.

use thiserror::Error;

/// The sole failure classification of the engine.
///
/// Raised by a typed accessor on shape mismatch or constraint violation, or
/// explicitly by an extraction script that detects an impossible combination
/// of observed values. Aborts exactly one extraction session; callers convert
/// it into an [`Outcome::Abandoned`](crate::types::outcome::Outcome)
/// diagnostic at the session driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbandonExtraction {
    /// A named member could not be resolved on the target's runtime type.
    #[error("member `{member}` not found on target of kind `{kind}`")]
    NotFound {
        /// Kind of the target that was searched.
        kind: String,
        /// Member name that failed to resolve.
        member: String,
    },

    /// The runtime value's shape does not match the requested type.
    #[error("member `{member}` has the wrong shape: expected {expected}, observed {observed}")]
    Shape {
        /// Member the value was read from.
        member: String,
        /// What the accessor expected (type or arity).
        expected: String,
        /// The offending value, rendered for diagnostics.
        observed: String,
    },

    /// The value converted cleanly but violates a declared constraint.
    #[error("member `{member}` violates its contract: {detail}")]
    Constraint {
        /// Member the value was read from.
        member: String,
        /// The first failing clause, with the offending value embedded.
        detail: String,
    },

    /// An extraction script declared the observed state impossible.
    #[error("{message}")]
    Script {
        /// Script-supplied diagnostic.
        message: String,
    },
}

impl AbandonExtraction {
    /// Abandon from script code with a free-form diagnostic.
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, AbandonExtraction>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_embeds_member_and_condition() {
        let err = AbandonExtraction::Shape {
            member: "stageCount".into(),
            expected: "an integer".into(),
            observed: "\"three\"".into(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("stageCount"));
        assert!(rendered.contains("an integer"));
        assert!(rendered.contains("\"three\""));
    }

    #[test]
    fn script_helper_passes_message_through() {
        let err = AbandonExtraction::script("no stage was ever displayed");
        assert_eq!(err.to_string(), "no stage was ever displayed");
    }
}
