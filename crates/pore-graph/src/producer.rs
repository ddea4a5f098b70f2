//! Producer classification
//!
//! The resolver never inspects node types directly. The graph reports what
//! feeds a pin as a closed [`Producer`] tag and the resolver switches on it.

use pore_types::{CallNodeHandle, GraphId, NodeId, ObjectRef, ParameterName, PinId, ResourceHandle};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Pin inside a graph that a value flows into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionPoint {
    /// Graph containing the pin
    pub graph: GraphId,
    /// The pin
    pub pin: PinId,
}

impl ConnectionPoint {
    /// Build a connection point
    #[inline]
    #[must_use]
    pub fn new(graph: GraphId, pin: PinId) -> Self {
        Self { graph, pin }
    }
}

impl Display for ConnectionPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.graph, self.pin)
    }
}

/// What currently feeds a connection point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Producer {
    /// Unconnected pin holding an inline literal
    Literal(String),
    /// Unconnected pin without a literal
    Empty,
    /// Resource-instantiation node
    Resource(ResourceHandle),
    /// Read-parameter node
    ReadParameter {
        /// The reading node, used for cycle detection
        node: NodeId,
        /// Parameter being read
        name: ParameterName,
        /// The node's own default pin, when something is wired into it
        next: Option<ConnectionPoint>,
    },
    /// Textual expression node
    Expression(String),
    /// Nested function-call node
    NestedCall(CallNodeHandle),
    /// Object asset reference node
    ObjectAsset(ObjectRef),
    /// More than one producer wired to the pin
    MultipleProducers(usize),
    /// Unknown pin or a node kind with no value interpretation
    Malformed,
}

impl Producer {
    /// Short label for logs
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Literal(_) => "literal",
            Self::Empty => "empty",
            Self::Resource(_) => "resource",
            Self::ReadParameter { .. } => "read-parameter",
            Self::Expression(_) => "expression",
            Self::NestedCall(_) => "nested-call",
            Self::ObjectAsset(_) => "object-asset",
            Self::MultipleProducers(_) => "multiple-producers",
            Self::Malformed => "malformed",
        }
    }
}

/// Declared default of a function input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultSpec {
    /// Nothing declared; inline types fall back to their zero value
    #[default]
    None,
    /// Bound to a named source; wins over any wired default
    Binding(ParameterName),
    /// Inline literal on the input declaration
    Literal(String),
    /// Default-producing pin inside the function graph
    Connected(ConnectionPoint),
}
