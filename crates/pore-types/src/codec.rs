//! Inline literal codec
//!
//! Values are stored as little-endian bytes. The textual literal form used on
//! override pins is a comma-separated component list (`1.0,2.0,3.0`),
//! `true`/`false` for booleans and the variant name or index for enums.

use crate::type_def::{TypeDef, TypeKind};
use smallvec::SmallVec;

/// Encoded value bytes; every plain type fits inline
pub type ValueBytes = SmallVec<[u8; 16]>;

/// Errors raised while encoding or decoding inline values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Type has no inline representation
    #[error("type '{0}' cannot be encoded inline")]
    NotInline(String),

    /// Byte payload has the wrong size
    #[error("type '{type_name}' expects {expected} bytes, got {actual}")]
    WrongLength {
        type_name: String,
        expected: usize,
        actual: usize,
    },

    /// Literal has the wrong number of components
    #[error("type '{type_name}' expects {expected} components, got {actual}")]
    WrongArity {
        type_name: String,
        expected: usize,
        actual: usize,
    },

    /// A component failed to parse
    #[error("invalid component '{component}' for type '{type_name}'")]
    InvalidComponent { type_name: String, component: String },

    /// Boolean byte other than 0 or 1
    #[error("type '{type_name}' expects a bool byte of 0 or 1, got {value}")]
    InvalidBool { type_name: String, value: u8 },

    /// Enum index outside the declared variants
    #[error("enum '{type_name}' has no variant {index}")]
    UnknownVariant { type_name: String, index: i64 },
}

pub(crate) fn byte_size(kind: &TypeKind) -> Option<usize> {
    match kind {
        TypeKind::Bool => Some(1),
        TypeKind::Int | TypeKind::Float | TypeKind::Enum { .. } => Some(4),
        TypeKind::Vec2 => Some(8),
        TypeKind::Vec3 | TypeKind::Position => Some(12),
        TypeKind::Vec4 | TypeKind::Color | TypeKind::Quat => Some(16),
        TypeKind::Matrix4 => Some(64),
        TypeKind::Resource | TypeKind::Object => None,
    }
}

pub(crate) fn kind_tag(kind: &TypeKind) -> &'static str {
    match kind {
        TypeKind::Bool => "bool",
        TypeKind::Int => "int",
        TypeKind::Float => "float",
        TypeKind::Vec2 => "vec2",
        TypeKind::Vec3 => "vec3",
        TypeKind::Position => "position",
        TypeKind::Vec4 => "vec4",
        TypeKind::Color => "color",
        TypeKind::Quat => "quat",
        TypeKind::Matrix4 => "matrix4",
        TypeKind::Enum { .. } => "enum",
        TypeKind::Resource => "resource",
        TypeKind::Object => "object",
    }
}

fn float_count(kind: &TypeKind) -> Option<usize> {
    match kind {
        TypeKind::Bool | TypeKind::Int | TypeKind::Enum { .. } => None,
        _ => byte_size(kind).map(|size| size / 4),
    }
}

pub(crate) fn decode(ty: &TypeDef, text: &str) -> Result<ValueBytes, CodecError> {
    let invalid = |component: &str| CodecError::InvalidComponent {
        type_name: ty.name().to_string(),
        component: component.to_string(),
    };
    let text = text.trim();
    let mut bytes = ValueBytes::new();

    match ty.kind() {
        TypeKind::Resource | TypeKind::Object => {
            return Err(CodecError::NotInline(ty.name().to_string()));
        }
        TypeKind::Bool => {
            let value = match text {
                "true" | "1" => 1u8,
                "false" | "0" => 0u8,
                other => return Err(invalid(other)),
            };
            bytes.push(value);
        }
        TypeKind::Int => {
            let value: i32 = text.parse().map_err(|_| invalid(text))?;
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        TypeKind::Enum { variants } => {
            let index = match variants.iter().position(|v| v == text) {
                Some(index) => i64::try_from(index).map_err(|_| invalid(text))?,
                None => text.parse::<i64>().map_err(|_| invalid(text))?,
            };
            let in_range = usize::try_from(index).is_ok_and(|i| i < variants.len());
            if !in_range {
                return Err(CodecError::UnknownVariant {
                    type_name: ty.name().to_string(),
                    index,
                });
            }
            let value = i32::try_from(index).map_err(|_| invalid(text))?;
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        kind => {
            let expected = float_count(kind).unwrap_or(0);
            let components: Vec<&str> = text.split(',').map(str::trim).collect();
            if components.len() != expected {
                return Err(CodecError::WrongArity {
                    type_name: ty.name().to_string(),
                    expected,
                    actual: components.len(),
                });
            }
            for component in components {
                let value = parse_f32(component).ok_or_else(|| invalid(component))?;
                bytes.extend_from_slice(&value.to_le_bytes());
            }
        }
    }
    Ok(bytes)
}

pub(crate) fn check(ty: &TypeDef, bytes: &[u8]) -> Result<(), CodecError> {
    let expected = byte_size(ty.kind()).ok_or_else(|| CodecError::NotInline(ty.name().to_string()))?;
    if bytes.len() != expected {
        return Err(CodecError::WrongLength {
            type_name: ty.name().to_string(),
            expected,
            actual: bytes.len(),
        });
    }
    if matches!(ty.kind(), TypeKind::Bool) && bytes[0] > 1 {
        return Err(CodecError::InvalidBool {
            type_name: ty.name().to_string(),
            value: bytes[0],
        });
    }
    if let TypeKind::Enum { variants } = ty.kind() {
        let index = read_i32(bytes, 0);
        let in_range = usize::try_from(index).is_ok_and(|i| i < variants.len());
        if !in_range {
            return Err(CodecError::UnknownVariant {
                type_name: ty.name().to_string(),
                index: i64::from(index),
            });
        }
    }
    Ok(())
}

pub(crate) fn encode(ty: &TypeDef, bytes: &[u8]) -> Result<String, CodecError> {
    check(ty, bytes)?;
    let text = match ty.kind() {
        TypeKind::Bool => if bytes[0] == 0 { "false" } else { "true" }.to_string(),
        TypeKind::Int => read_i32(bytes, 0).to_string(),
        TypeKind::Enum { variants } => {
            let index = read_i32(bytes, 0);
            usize::try_from(index)
                .ok()
                .and_then(|i| variants.get(i))
                .cloned()
                .unwrap_or_else(|| index.to_string())
        }
        _ => bytes
            .chunks_exact(4)
            .map(|chunk| format_f32(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])))
            .collect::<Vec<_>>()
            .join(","),
    };
    Ok(text)
}

/// Shortest text that parses back to the same bits
///
/// NaN payloads and signs do not survive decimal text, so NaNs are written
/// as their raw bit pattern (`nan:0x7fc00001`).
fn format_f32(value: f32) -> String {
    if value.is_nan() {
        format!("nan:{:#010x}", value.to_bits())
    } else {
        format!("{value:?}")
    }
}

fn parse_f32(text: &str) -> Option<f32> {
    match text.strip_prefix("nan:0x") {
        Some(hex) => u32::from_str_radix(hex, 16)
            .ok()
            .map(f32::from_bits)
            .filter(|value| value.is_nan()),
        None => text.parse().ok(),
    }
}

pub(crate) fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    i32::from_le_bytes(raw)
}

pub(crate) fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    f32::from_le_bytes(raw)
}
