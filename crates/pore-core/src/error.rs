//! Mutation errors
//!
//! Resolution never fails; broken graphs surface as `ValueSource` tags.
//! Mutations are rejected synchronously with a [`MutationError`] and leave the
//! prior state untouched.

use pore_graph::GraphError;
use pore_types::{CallSiteId, CodecError, FunctionId, NameError, ParameterName};

/// Errors rejecting a mutation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    /// The identity's call-site no longer exists
    #[error("call-site destroyed: {0}")]
    CallSiteDestroyed(CallSiteId),

    /// The called function does not declare the input
    #[error("input not declared: {0}")]
    UnknownInput(ParameterName),

    /// Resource-typed inputs never hold inline values
    #[error("input '{0}' is resource-typed and cannot hold an inline value")]
    ResourceTyped(ParameterName),

    /// Type has no inline representation
    #[error("type '{0}' cannot be encoded inline")]
    NotInlineEncodable(String),

    /// Byte payload has the wrong size for the declared type
    #[error("malformed value: expected {expected} bytes, got {actual}")]
    MalformedValue { expected: usize, actual: usize },

    /// Source type is not assignable to the input type
    #[error("incompatible type: expected {expected}, got {actual}")]
    IncompatibleType { expected: String, actual: String },

    /// Type does not accept expression inputs
    #[error("type '{0}' does not support expressions")]
    ExpressionsUnsupported(String),

    /// Function to instantiate is unknown
    #[error("function not found: {0}")]
    UnknownFunction(FunctionId),

    /// Call-site was not inherited from a live parent
    #[error("call-site {0} has no inherited source")]
    NoInheritedSource(CallSiteId),

    /// Parent override cannot be interpreted, so there is nothing to copy
    #[error("inherited override of '{0}' cannot be interpreted")]
    InvalidInheritedOverride(ParameterName),

    /// No default can be derived for the input
    #[error("no default available for {0}")]
    DefaultUnavailable(ParameterName),

    /// Operation requires a resource-typed input
    #[error("input '{0}' is not resource-typed")]
    NotResourceTyped(ParameterName),

    /// Value could not be encoded for the graph
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Child name could not be derived
    #[error("invalid name: {0}")]
    InvalidName(#[from] NameError),

    /// The graph rejected an edit
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
}

impl MutationError {
    /// Create incompatible type error
    pub fn incompatible(expected: impl ToString, actual: impl ToString) -> Self {
        Self::IncompatibleType {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Check if the caller passed a value of the wrong type or shape
    #[must_use]
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            Self::ResourceTyped(_)
                | Self::NotInlineEncodable(_)
                | Self::MalformedValue { .. }
                | Self::IncompatibleType { .. }
                | Self::ExpressionsUnsupported(_)
                | Self::NotResourceTyped(_)
                | Self::Codec(_)
        )
    }

    /// Check if the graph itself must be repaired before retrying
    #[must_use]
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            Self::CallSiteDestroyed(_)
                | Self::UnknownInput(_)
                | Self::DefaultUnavailable(_)
                | Self::InvalidInheritedOverride(_)
                | Self::InvalidName(_)
                | Self::Graph(_)
        )
    }
}

/// Result of a successful mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// State changed
    Applied,
    /// State already matched the request
    Unchanged,
}

impl MutationOutcome {
    /// Check if state changed
    #[inline]
    #[must_use]
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Result type alias for mutations
pub type MutationResult<T = MutationOutcome> = Result<T, MutationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incompatible_display() {
        let err = MutationError::incompatible("float", "vec3");
        assert_eq!(err.to_string(), "incompatible type: expected float, got vec3");
        assert!(err.is_type_error());
        assert!(!err.requires_user_action());
    }

    #[test]
    fn lifetime_errors_need_user_action() {
        let err = MutationError::CallSiteDestroyed(CallSiteId::new());
        assert!(err.requires_user_action());
        assert!(!err.is_type_error());
    }

    #[test]
    fn codec_conversion() {
        let err: MutationError = CodecError::NotInline("CurveData".into()).into();
        assert!(matches!(err, MutationError::Codec(_)));
    }
}
