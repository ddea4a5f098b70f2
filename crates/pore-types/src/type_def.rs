//! Declared parameter types
//!
//! [`TypeDef`] describes the declared type of an input slot and owns the rules
//! that depend on it: byte layout, whether the type may be written inline,
//! whether it is eligible for the rapid cache and which types it accepts.

use crate::codec::{self, CodecError, ValueBytes};
use crate::hash::Fingerprint;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Shape of a declared type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    /// Boolean stored as one byte
    Bool,
    /// 32-bit signed integer
    Int,
    /// 32-bit float
    Float,
    /// Two floats
    Vec2,
    /// Three floats
    Vec3,
    /// Three floats with world-position semantics
    Position,
    /// Four floats
    Vec4,
    /// Linear RGBA color
    Color,
    /// Rotation quaternion
    Quat,
    /// 4x4 float matrix; inline but too large for the rapid cache
    Matrix4,
    /// Enumeration stored as a 32-bit index
    Enum {
        /// Variant names in declaration order
        variants: Vec<String>,
    },
    /// Stateful resource (data object); never inline-encoded
    Resource,
    /// Reference to an externally persisted asset; never inline-encoded
    Object,
}

/// Declared type of a parameter
///
/// Two types are equal when both name and kind match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDef {
    name: String,
    kind: TypeKind,
}

impl TypeDef {
    /// Build a type from name and kind
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// `bool`
    #[must_use]
    pub fn bool() -> Self {
        Self::new("bool", TypeKind::Bool)
    }

    /// `int`
    #[must_use]
    pub fn int() -> Self {
        Self::new("int", TypeKind::Int)
    }

    /// `float`
    #[must_use]
    pub fn float() -> Self {
        Self::new("float", TypeKind::Float)
    }

    /// `vec2`
    #[must_use]
    pub fn vec2() -> Self {
        Self::new("vec2", TypeKind::Vec2)
    }

    /// `vec3`
    #[must_use]
    pub fn vec3() -> Self {
        Self::new("vec3", TypeKind::Vec3)
    }

    /// `position`
    #[must_use]
    pub fn position() -> Self {
        Self::new("position", TypeKind::Position)
    }

    /// `vec4`
    #[must_use]
    pub fn vec4() -> Self {
        Self::new("vec4", TypeKind::Vec4)
    }

    /// `color`
    #[must_use]
    pub fn color() -> Self {
        Self::new("color", TypeKind::Color)
    }

    /// `quat`
    #[must_use]
    pub fn quat() -> Self {
        Self::new("quat", TypeKind::Quat)
    }

    /// `matrix4`
    #[must_use]
    pub fn matrix4() -> Self {
        Self::new("matrix4", TypeKind::Matrix4)
    }

    /// Named enumeration
    #[must_use]
    pub fn enumeration<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            TypeKind::Enum {
                variants: variants.into_iter().map(Into::into).collect(),
            },
        )
    }

    /// Resource class
    #[must_use]
    pub fn resource(class: impl Into<String>) -> Self {
        Self::new(class, TypeKind::Resource)
    }

    /// Object asset class
    #[must_use]
    pub fn object(class: impl Into<String>) -> Self {
        Self::new(class, TypeKind::Object)
    }

    /// Type name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Resource types are owned by the graph and never written inline
    #[inline]
    #[must_use]
    pub fn is_resource(&self) -> bool {
        matches!(self.kind, TypeKind::Resource)
    }

    /// Object asset references
    #[inline]
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self.kind, TypeKind::Object)
    }

    /// Types whose values can be stored as inline literal bytes
    #[inline]
    #[must_use]
    pub fn is_inline(&self) -> bool {
        !self.is_resource() && !self.is_object()
    }

    /// Plain numeric/vector/bool types eligible for the rapid cache
    #[inline]
    #[must_use]
    pub fn is_plain(&self) -> bool {
        self.is_inline() && !matches!(self.kind, TypeKind::Matrix4)
    }

    /// Whether an inline textual expression may produce this type
    #[inline]
    #[must_use]
    pub fn supports_expressions(&self) -> bool {
        self.is_inline()
    }

    /// Encoded size in bytes, `None` for non-inline types
    #[must_use]
    pub fn byte_size(&self) -> Option<usize> {
        codec::byte_size(&self.kind)
    }

    /// Whether a value of type `source` may flow into a slot of this type
    #[must_use]
    pub fn is_assignable_from(&self, source: &TypeDef) -> bool {
        if self == source {
            return true;
        }
        matches!(
            (&self.kind, &source.kind),
            (TypeKind::Vec3, TypeKind::Position) | (TypeKind::Position, TypeKind::Vec3)
        )
    }

    /// Fingerprint of the full declaration
    ///
    /// Changes whenever the name, the kind or the enum variant list change.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        let tag = codec::kind_tag(&self.kind);
        let variants: &[String] = match &self.kind {
            TypeKind::Enum { variants } => variants,
            _ => &[],
        };
        Fingerprint::of_parts(
            [self.name.as_str(), tag]
                .into_iter()
                .chain(variants.iter().map(String::as_str)),
        )
    }

    /// Decode an inline literal into value bytes
    ///
    /// # Errors
    /// Returns error for non-inline types or unparsable text
    pub fn decode_literal(&self, text: &str) -> Result<ValueBytes, CodecError> {
        codec::decode(self, text)
    }

    /// Encode value bytes as an inline literal
    ///
    /// # Errors
    /// Returns error for non-inline types or a wrong byte length
    pub fn encode_literal(&self, bytes: &[u8]) -> Result<String, CodecError> {
        codec::encode(self, bytes)
    }

    /// Check that `bytes` is a well-formed value of this type
    ///
    /// # Errors
    /// Returns error for non-inline types, a wrong length or an out-of-range
    /// enum index
    pub fn check_bytes(&self, bytes: &[u8]) -> Result<(), CodecError> {
        codec::check(self, bytes)
    }

    /// Implicit default used when an inline input declares none
    #[must_use]
    pub fn zero_value(&self) -> Option<ValueBytes> {
        self.byte_size().map(|size| {
            let mut bytes = ValueBytes::new();
            bytes.resize(size, 0);
            if matches!(self.kind, TypeKind::Quat) {
                // identity rotation: w = 1
                bytes[12..16].copy_from_slice(&1.0f32.to_le_bytes());
            }
            bytes
        })
    }
}

impl Display for TypeDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_inline_classification() {
        assert!(TypeDef::float().is_plain());
        assert!(TypeDef::vec3().is_plain());
        assert!(TypeDef::enumeration("Mode", ["A", "B"]).is_plain());
        assert!(TypeDef::matrix4().is_inline());
        assert!(!TypeDef::matrix4().is_plain());
        assert!(!TypeDef::resource("Curve").is_inline());
        assert!(!TypeDef::object("Mesh").is_plain());
    }

    #[test]
    fn expressions_only_for_inline_types() {
        assert!(TypeDef::int().supports_expressions());
        assert!(!TypeDef::resource("Grid").supports_expressions());
        assert!(!TypeDef::object("Mesh").supports_expressions());
    }

    #[test]
    fn assignability() {
        assert!(TypeDef::float().is_assignable_from(&TypeDef::float()));
        assert!(!TypeDef::float().is_assignable_from(&TypeDef::int()));
        assert!(TypeDef::vec3().is_assignable_from(&TypeDef::position()));
        assert!(TypeDef::position().is_assignable_from(&TypeDef::vec3()));
        assert!(!TypeDef::vec4().is_assignable_from(&TypeDef::vec3()));
    }

    #[test]
    fn fingerprint_tracks_enum_variants() {
        let a = TypeDef::enumeration("Mode", ["A", "B"]);
        let b = TypeDef::enumeration("Mode", ["A", "B", "C"]);
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
    }

    #[test]
    fn zero_values() {
        assert_eq!(TypeDef::float().zero_value().unwrap().as_slice(), &[0, 0, 0, 0]);
        let quat = TypeDef::quat().zero_value().unwrap();
        assert_eq!(&quat[12..16], &1.0f32.to_le_bytes());
        assert!(TypeDef::resource("Grid").zero_value().is_none());
    }
}
