//! PORE Types
//!
//! Value model shared by the graph contract and the resolution engine.
//!
//! # Core Concepts
//!
//! - [`ParameterName`]: namespace-qualified name (`Category.Name`)
//! - [`TypeDef`]: declared type, byte layout and literal codec
//! - [`ParameterIdentity`]: one input slot at one call-site
//! - [`OverrideKey`]: aliased key of an override pin
//! - [`ValueSource`]: where an input's effective value comes from
//! - [`Fingerprint`]: Blake3 digest used to detect stale derived state
//!
//! # Example
//!
//! ```rust
//! use pore_types::{CallSiteId, OverrideKey, ParameterIdentity, TypeDef};
//!
//! let id = ParameterIdentity::new("Module.Speed".parse().unwrap(), TypeDef::float(), CallSiteId::new());
//! let key = OverrideKey::for_identity(&id, "Drag_001");
//! assert_eq!(key.aliased_name().to_string(), "Drag_001.Speed");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod codec;
mod hash;
mod identity;
mod ids;
mod name;
mod type_def;
mod value;

// Re-exports
pub use codec::{CodecError, ValueBytes};
pub use hash::{Fingerprint, FingerprintError};
pub use identity::{OverrideKey, ParameterIdentity};
pub use ids::{CallSiteId, FunctionId, GraphId, NodeId, PinId, ResourceId};
pub use name::{NameError, ParameterName, ENGINE_NAMESPACE, MODULE_NAMESPACE, USER_NAMESPACE};
pub use type_def::{TypeDef, TypeKind};
pub use value::{
    CallNodeHandle, LinkedParameter, LocalValue, ObjectRef, ResourceHandle, ValueSource,
    ValueSourceKind,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with PORE types
    pub use crate::{
        CallSiteId, Fingerprint, LocalValue, OverrideKey, ParameterIdentity, ParameterName,
        TypeDef, TypeKind, ValueSource,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
