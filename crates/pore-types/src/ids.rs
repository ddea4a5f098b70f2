//! Opaque identifiers for graph entities
//!
//! All ids are random v4 UUIDs, so ids minted by independent graphs never
//! collide and never get reused after an entity is destroyed.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Mint a fresh id
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Raw UUID bytes
            #[inline]
            #[must_use]
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0.simple())
            }
        }
    };
}

define_id!(
    /// One instantiation of a reusable function inside a larger graph
    CallSiteId,
    "call"
);

define_id!(
    /// A reusable function (module, dynamic input) definition
    FunctionId,
    "fn"
);

define_id!(
    /// A graph whose version is tracked for invalidation
    GraphId,
    "graph"
);

define_id!(
    /// A node inside a graph
    NodeId,
    "node"
);

define_id!(
    /// An input pin (connection point) on a node
    PinId,
    "pin"
);

define_id!(
    /// A stateful resource instance
    ResourceId,
    "res"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(CallSiteId::new(), CallSiteId::new());
        assert_ne!(PinId::new(), PinId::new());
    }

    #[test]
    fn display_carries_prefix() {
        let id = FunctionId::new();
        let text = id.to_string();
        assert!(text.starts_with("fn:"));
        assert_eq!(text.len(), 3 + 32);
    }
}
