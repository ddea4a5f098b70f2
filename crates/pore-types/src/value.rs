//! Value sources
//!
//! [`ValueSource`] is the tagged answer to "where does this input's value
//! currently come from". Exactly one tag is active per resolution.

use crate::codec::{self, ValueBytes};
use crate::ids::{CallSiteId, FunctionId, ResourceId};
use crate::name::ParameterName;
use crate::type_def::{TypeDef, TypeKind};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Inline constant, owned and copied by value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalValue {
    type_def: TypeDef,
    bytes: ValueBytes,
}

impl LocalValue {
    /// Wrap bytes that are already known to match `type_def`
    #[inline]
    #[must_use]
    pub fn new(type_def: TypeDef, bytes: ValueBytes) -> Self {
        debug_assert!(
            type_def.check_bytes(&bytes).is_ok(),
            "LocalValue bytes do not match type {type_def}"
        );
        Self { type_def, bytes }
    }

    /// Convenience constructor for `float`
    #[must_use]
    pub fn float(value: f32) -> Self {
        Self::new(TypeDef::float(), ValueBytes::from_slice(&value.to_le_bytes()))
    }

    /// Convenience constructor for `int`
    #[must_use]
    pub fn int(value: i32) -> Self {
        Self::new(TypeDef::int(), ValueBytes::from_slice(&value.to_le_bytes()))
    }

    /// Convenience constructor for `bool`
    #[must_use]
    pub fn bool(value: bool) -> Self {
        Self::new(TypeDef::bool(), ValueBytes::from_slice(&[u8::from(value)]))
    }

    /// Declared type of the constant
    #[inline]
    #[must_use]
    pub fn type_def(&self) -> &TypeDef {
        &self.type_def
    }

    /// Encoded bytes
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Read as `float`
    #[must_use]
    pub fn as_f32(&self) -> f32 {
        debug_assert!(matches!(self.type_def.kind(), TypeKind::Float), "not a float: {}", self.type_def);
        codec::read_f32(&self.bytes, 0)
    }

    /// Read as `int` (also valid for enum indices)
    #[must_use]
    pub fn as_i32(&self) -> i32 {
        debug_assert!(
            matches!(self.type_def.kind(), TypeKind::Int | TypeKind::Enum { .. }),
            "not an int: {}",
            self.type_def
        );
        codec::read_i32(&self.bytes, 0)
    }

    /// Read as `bool`
    #[must_use]
    pub fn as_bool(&self) -> bool {
        debug_assert!(matches!(self.type_def.kind(), TypeKind::Bool), "not a bool: {}", self.type_def);
        self.bytes[0] != 0
    }

    /// Read every float component (vectors, colors, quats, matrices)
    #[must_use]
    pub fn components(&self) -> Vec<f32> {
        debug_assert!(
            !matches!(
                self.type_def.kind(),
                TypeKind::Bool | TypeKind::Int | TypeKind::Enum { .. }
            ),
            "not a float aggregate: {}",
            self.type_def
        );
        (0..self.bytes.len() / 4)
            .map(|i| codec::read_f32(&self.bytes, i * 4))
            .collect()
    }
}

/// Weak reference to another parameter, resolved lazily by the consumer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkedParameter {
    /// Referenced name
    pub name: ParameterName,
    /// Type the reference is read as
    pub type_def: TypeDef,
}

impl LinkedParameter {
    /// Build a reference
    #[inline]
    #[must_use]
    pub fn new(name: ParameterName, type_def: TypeDef) -> Self {
        Self { name, type_def }
    }
}

/// Reference to an instantiated nested call node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallNodeHandle {
    /// Call-site created for the nested call
    pub call_site: CallSiteId,
    /// Function the call instantiates
    pub function: FunctionId,
}

/// Borrowed view of a graph-owned resource instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHandle {
    /// Instance id
    pub id: ResourceId,
    /// Resource class (the declared type name)
    pub class: String,
}

/// Reference to an externally persisted asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Asset path
    pub path: String,
}

impl ObjectRef {
    /// Reference an asset by path
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Where an input's value currently comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueSource {
    /// No determinable value (graph malformed or call-site gone)
    None,
    /// Inline constant
    Local(LocalValue),
    /// Value of another parameter
    Linked(LinkedParameter),
    /// Computed by a nested function call wired as an override
    Dynamic(CallNodeHandle),
    /// Computed by an inline textual expression
    Expression(String),
    /// External stateful resource owned by the graph
    Data(ResourceHandle),
    /// Externally persisted asset
    ObjectAsset(ObjectRef),
    /// Nested function call reached through the default chain
    DefaultFunction(CallNodeHandle),
    /// An override exists but cannot be interpreted
    InvalidOverride,
    /// The default could not be interpreted
    UnsupportedDefault,
}

/// Bare tag of a [`ValueSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueSourceKind {
    /// [`ValueSource::None`]
    None,
    /// [`ValueSource::Local`]
    Local,
    /// [`ValueSource::Linked`]
    Linked,
    /// [`ValueSource::Dynamic`]
    Dynamic,
    /// [`ValueSource::Expression`]
    Expression,
    /// [`ValueSource::Data`]
    Data,
    /// [`ValueSource::ObjectAsset`]
    ObjectAsset,
    /// [`ValueSource::DefaultFunction`]
    DefaultFunction,
    /// [`ValueSource::InvalidOverride`]
    InvalidOverride,
    /// [`ValueSource::UnsupportedDefault`]
    UnsupportedDefault,
}

impl ValueSource {
    /// Bare tag
    #[must_use]
    pub fn kind(&self) -> ValueSourceKind {
        match self {
            Self::None => ValueSourceKind::None,
            Self::Local(_) => ValueSourceKind::Local,
            Self::Linked(_) => ValueSourceKind::Linked,
            Self::Dynamic(_) => ValueSourceKind::Dynamic,
            Self::Expression(_) => ValueSourceKind::Expression,
            Self::Data(_) => ValueSourceKind::Data,
            Self::ObjectAsset(_) => ValueSourceKind::ObjectAsset,
            Self::DefaultFunction(_) => ValueSourceKind::DefaultFunction,
            Self::InvalidOverride => ValueSourceKind::InvalidOverride,
            Self::UnsupportedDefault => ValueSourceKind::UnsupportedDefault,
        }
    }

    /// States a compiler must never consume; the user has to act (usually reset)
    #[inline]
    #[must_use]
    pub fn needs_user_action(&self) -> bool {
        matches!(
            self,
            Self::None | Self::InvalidOverride | Self::UnsupportedDefault
        )
    }

    /// Nested call wrapped by `Dynamic` or `DefaultFunction`
    #[inline]
    #[must_use]
    pub fn call_handle(&self) -> Option<CallNodeHandle> {
        match self {
            Self::Dynamic(handle) | Self::DefaultFunction(handle) => Some(*handle),
            _ => None,
        }
    }

    /// Inline constant, if any
    #[inline]
    #[must_use]
    pub fn as_local(&self) -> Option<&LocalValue> {
        match self {
            Self::Local(local) => Some(local),
            _ => None,
        }
    }

    /// Comparison used by the reset predicates
    ///
    /// Byte compare for `Local`, name compare for `Linked`, and always
    /// `false` when either side wraps a nested graph, since nested-graph
    /// equality is not attempted.
    #[must_use]
    pub fn structurally_equal(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Local(a), Self::Local(b)) => a.type_def() == b.type_def() && a.bytes() == b.bytes(),
            (Self::Linked(a), Self::Linked(b)) => a.name == b.name,
            (Self::Expression(a), Self::Expression(b)) => a == b,
            (Self::Data(a), Self::Data(b)) => a.id == b.id,
            (Self::ObjectAsset(a), Self::ObjectAsset(b)) => a == b,
            (Self::Dynamic(_) | Self::DefaultFunction(_), _)
            | (_, Self::Dynamic(_) | Self::DefaultFunction(_)) => false,
            (a, b) => a.kind() == b.kind(),
        }
    }
}

impl Display for ValueSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Local(local) => match local.type_def().encode_literal(local.bytes()) {
                Ok(text) => write!(f, "local({text})"),
                Err(_) => write!(f, "local(<{} bytes>)", local.bytes().len()),
            },
            Self::Linked(linked) => write!(f, "linked({})", linked.name),
            Self::Dynamic(handle) => write!(f, "dynamic({})", handle.call_site),
            Self::Expression(code) => write!(f, "expression({code})"),
            Self::Data(handle) => write!(f, "data({} {})", handle.class, handle.id),
            Self::ObjectAsset(object) => write!(f, "object({})", object.path),
            Self::DefaultFunction(handle) => write!(f, "default-function({})", handle.call_site),
            Self::InvalidOverride => f.write_str("invalid-override"),
            Self::UnsupportedDefault => f.write_str("unsupported-default"),
        }
    }
}
