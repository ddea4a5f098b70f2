//! Graph errors
//!
//! Raised by the write half of [`crate::GraphAccessor`] and by the
//! [`crate::ScriptGraph`] builder when an id does not refer to a live object.

use pore_types::{CallSiteId, FunctionId, GraphId, NodeId, PinId, ResourceId};

/// Errors during graph edits
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Call-site is unknown or was destroyed
    #[error("call-site not found: {0}")]
    UnknownCallSite(CallSiteId),

    /// Function is not declared
    #[error("function not found: {0}")]
    UnknownFunction(FunctionId),

    /// Graph is not registered
    #[error("graph not found: {0}")]
    UnknownGraph(GraphId),

    /// Pin is unknown or was removed with its subgraph
    #[error("pin not found: {0}")]
    UnknownPin(PinId),

    /// Node is unknown
    #[error("node not found: {0}")]
    UnknownNode(NodeId),

    /// Resource instance is not owned by the graph
    #[error("resource not found: {0}")]
    UnknownResource(ResourceId),

    /// Function input is not declared
    #[error("function '{function}' has no input '{input}'")]
    UnknownInput { function: String, input: String },

    /// Function input declared twice
    #[error("function '{function}' already declares input '{input}'")]
    DuplicateInput { function: String, input: String },
}

impl GraphError {
    /// Create unknown input error
    pub fn unknown_input(function: impl Into<String>, input: impl Into<String>) -> Self {
        Self::UnknownInput {
            function: function.into(),
            input: input.into(),
        }
    }

    /// Check if the error means the referenced object no longer exists
    #[must_use]
    pub fn is_lifetime_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownCallSite(_) | Self::UnknownPin(_) | Self::UnknownNode(_)
        )
    }
}

/// Result type alias for graph edits
pub type GraphResult<T> = Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_input_display() {
        let err = GraphError::unknown_input("Drag", "Speed");
        assert_eq!(err.to_string(), "function 'Drag' has no input 'Speed'");
    }

    #[test]
    fn lifetime_classification() {
        assert!(GraphError::UnknownCallSite(CallSiteId::new()).is_lifetime_error());
        assert!(!GraphError::UnknownFunction(FunctionId::new()).is_lifetime_error());
    }
}
