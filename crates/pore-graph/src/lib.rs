//! PORE Graph - collaborator contract
//!
//! The resolution engine reads and edits the node graph only through
//! [`GraphAccessor`]. This crate defines that contract, the change tokens used
//! for memo invalidation, the producer classification and the shared
//! placeholder resource manager, plus [`ScriptGraph`], a complete in-memory
//! implementation used by tools and tests.
//!
//! # Example
//!
//! ```rust
//! use pore_graph::{DefaultSpec, GraphAccessor, ScriptGraph};
//! use pore_types::{ParameterIdentity, TypeDef};
//!
//! let mut graph = ScriptGraph::new();
//! let script = graph.add_script("Fountain");
//! let drag = graph.add_function("Drag", None);
//! graph.declare_input(drag, "Speed", TypeDef::float()).unwrap();
//! graph.set_input_default(drag, "Speed", DefaultSpec::Literal("1.0".into())).unwrap();
//! let site = graph.add_call_site(script, drag, "Drag_001").unwrap();
//!
//! let id = ParameterIdentity::new("Module.Speed".parse().unwrap(), TypeDef::float(), site);
//! assert!(graph.declared_input(&id).is_some());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod accessor;
pub mod error;
pub mod hierarchy;
pub mod producer;
pub mod resources;
pub mod script_graph;
pub mod tokens;

// Re-exports for convenience
pub use accessor::{CallSiteInfo, DeclaredInput, FunctionSignature, GraphAccessor, SignatureInput};
pub use error::{GraphError, GraphResult};
pub use hierarchy::{HierarchyEntry, HierarchySection, InputHierarchy, Placement};
pub use producer::{ConnectionPoint, DefaultSpec, Producer};
pub use resources::{PlaceholderArena, PlaceholderResourceManager, ResourceArena, ResourceInstance};
pub use script_graph::{GraphKind, ScriptGraph};
pub use tokens::{ChangeTokens, GraphVersion, VersionCounter};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the graph contract
    pub use crate::{
        ChangeTokens, ConnectionPoint, DefaultSpec, GraphAccessor, PlaceholderArena,
        PlaceholderResourceManager, Producer, ScriptGraph,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
