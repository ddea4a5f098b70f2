//! PORE Core - parameter override and resolution engine
//!
//! For every exposed input of a function call embedded in a script graph,
//! [`ResolutionEngine`] determines the single effective [`ValueSource`]
//! (override wiring, rapid cache, default chain) and provides the operations
//! that change which source is active.
//!
//! # Example
//!
//! ```rust
//! use pore_core::prelude::*;
//! use pore_graph::{DefaultSpec, ScriptGraph};
//! use pore_types::{LocalValue, ParameterIdentity, TypeDef};
//!
//! let mut graph = ScriptGraph::new();
//! let script = graph.add_script("Fountain");
//! let drag = graph.add_function("Drag", None);
//! graph.declare_input(drag, "Speed", TypeDef::float()).unwrap();
//! graph.set_input_default(drag, "Speed", DefaultSpec::Literal("1.0".into())).unwrap();
//! let site = graph.add_call_site(script, drag, "Drag_001").unwrap();
//!
//! let mut engine = ResolutionEngine::new(graph);
//! let ctx = ResolutionContext::with_engine_defaults();
//! let id = ParameterIdentity::new("Module.Speed".parse().unwrap(), TypeDef::float(), site);
//!
//! assert_eq!(engine.resolve(&id, &ctx), ValueSource::Local(LocalValue::float(1.0)));
//! engine.set_local(&id, &2.5f32.to_le_bytes(), &ctx).unwrap();
//! assert_eq!(engine.resolve(&id, &ctx), ValueSource::Local(LocalValue::float(2.5)));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod expansion;
pub mod memo;
pub mod mutator;
pub mod rapid_cache;
pub mod resolver;

// Re-exports for convenience
pub use config::{ConfigError, ResolverConfig};
pub use context::{NameScope, ResolutionContext, ScopeKind};
pub use engine::{PurgeReport, ResolutionEngine};
pub use error::{MutationError, MutationOutcome, MutationResult};
pub use expansion::ChildInput;
pub use memo::{MemoStamp, MemoStats, ResolutionMemo};
pub use rapid_cache::{RapidCache, RapidCacheEntry, RapidCacheStore, RapidKey};

pub use pore_types::ValueSource;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the engine
    pub use crate::{
        ChildInput, MutationError, MutationOutcome, ResolutionContext, ResolutionEngine,
        ResolverConfig, ValueSource,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
