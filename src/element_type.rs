//! Element types.
//!
//! A plan carries the [`ElementType`] of the elements it transfers so that the I/O layer can allocate and interpret buffers.
//! Types are named the way dataset element types are commonly spelled:
//!  - explicit endianness: `<f32`, `>f64`, `<i8` .. `>u64`, `<b8` .. `>b64`,
//!  - native endianness: `char`, `short`, `int`, `long`, `llong` and their `u` prefixed forms, `float`, `double`, `cfloat`, `cdouble`, `b8` .. `b64`, `hbool`, `hsize`, `hssize`, `haddr`, `herr`,
//!  - strings: `S` or `a`.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The endianness of each element, either `big` or `little`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
pub enum Endianness {
    /// Little endian.
    Little,

    /// Big endian.
    Big,
}

impl Endianness {
    /// Return true if the endianness matches the endianness of the CPU.
    #[must_use]
    pub fn is_native(self) -> bool {
        self == NATIVE_ENDIAN
    }

    const fn symbol(self) -> char {
        match self {
            Self::Little => '<',
            Self::Big => '>',
        }
    }
}

/// The endianness of the CPU.
pub const NATIVE_ENDIAN: Endianness = if cfg!(target_endian = "big") {
    Endianness::Big
} else {
    Endianness::Little
};

/// A scalar element type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ScalarType {
    /// `bool`.
    Bool,
    /// `i8`.
    Int8,
    /// `i16`.
    Int16,
    /// `i32`.
    Int32,
    /// `i64`.
    Int64,
    /// `u8`.
    UInt8,
    /// `u16`.
    UInt16,
    /// `u32`.
    UInt32,
    /// `u64`.
    UInt64,
    /// `f32`.
    Float32,
    /// `f64`.
    Float64,
    /// A complex number of two `f32`.
    Complex64,
    /// A complex number of two `f64`.
    Complex128,
    /// A bitfield of the given number of bytes.
    Bits(usize),
    /// A single byte character string.
    String,
}

impl ScalarType {
    /// Return the size in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 | Self::String => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 | Self::Complex64 => 8,
            Self::Complex128 => 16,
            Self::Bits(size) => *size,
        }
    }
}

/// An unsupported element type error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unsupported element type {0}")]
pub struct UnsupportedElementTypeError(String);

/// The type of the elements of a plan.
///
/// An element type without an explicit endianness uses the native endianness of the CPU.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ElementType {
    scalar: ScalarType,
    endianness: Option<Endianness>,
    name: String,
}

impl ElementType {
    /// Return the scalar type.
    #[must_use]
    pub const fn scalar(&self) -> ScalarType {
        self.scalar
    }

    /// Return the explicit endianness, if any.
    #[must_use]
    pub const fn endianness(&self) -> Option<Endianness> {
        self.endianness
    }

    /// Return the endianness of the elements, falling back to the native endianness.
    #[must_use]
    pub fn effective_endianness(&self) -> Endianness {
        self.endianness.unwrap_or(NATIVE_ENDIAN)
    }

    /// Return the name of the element type.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the size of an element in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.scalar.size()
    }
}

#[allow(clippy::match_same_arms)]
fn native_scalar(name: &str) -> Option<ScalarType> {
    Some(match name {
        "char" | "schar" => ScalarType::Int8,
        "uchar" => ScalarType::UInt8,
        "short" => ScalarType::Int16,
        "ushort" => ScalarType::UInt16,
        "int" => ScalarType::Int32,
        "uint" => ScalarType::UInt32,
        "long" | "llong" | "hssize" => ScalarType::Int64,
        "ulong" | "ullong" | "hsize" | "haddr" => ScalarType::UInt64,
        "herr" => ScalarType::Int32,
        "hbool" => ScalarType::Bool,
        "float" => ScalarType::Float32,
        "double" => ScalarType::Float64,
        "cfloat" => ScalarType::Complex64,
        "cdouble" => ScalarType::Complex128,
        "S" | "a" => ScalarType::String,
        _ => bits_scalar(name)?,
    })
}

fn bits_scalar(name: &str) -> Option<ScalarType> {
    match name {
        "b8" => Some(ScalarType::Bits(1)),
        "b16" => Some(ScalarType::Bits(2)),
        "b32" => Some(ScalarType::Bits(4)),
        "b64" => Some(ScalarType::Bits(8)),
        _ => None,
    }
}

fn explicit_scalar(name: &str) -> Option<ScalarType> {
    match name {
        "f32" => Some(ScalarType::Float32),
        "f64" => Some(ScalarType::Float64),
        "i8" => Some(ScalarType::Int8),
        "i16" => Some(ScalarType::Int16),
        "i32" => Some(ScalarType::Int32),
        "i64" => Some(ScalarType::Int64),
        "u8" => Some(ScalarType::UInt8),
        "u16" => Some(ScalarType::UInt16),
        "u32" => Some(ScalarType::UInt32),
        "u64" => Some(ScalarType::UInt64),
        _ => bits_scalar(name),
    }
}

impl std::str::FromStr for ElementType {
    type Err = UnsupportedElementTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (endianness, scalar) = if let Some(rest) = s.strip_prefix('<') {
            (Some(Endianness::Little), explicit_scalar(rest))
        } else if let Some(rest) = s.strip_prefix('>') {
            (Some(Endianness::Big), explicit_scalar(rest))
        } else {
            (None, native_scalar(s))
        };
        let scalar = scalar.ok_or_else(|| UnsupportedElementTypeError(s.to_string()))?;
        Ok(Self {
            scalar,
            endianness,
            name: s.to_string(),
        })
    }
}

impl From<ScalarType> for ElementType {
    /// Create a native endian element type from a scalar type.
    fn from(scalar: ScalarType) -> Self {
        let name = match scalar {
            ScalarType::Bool => "hbool".to_string(),
            ScalarType::Int8 => "char".to_string(),
            ScalarType::Int16 => "short".to_string(),
            ScalarType::Int32 => "int".to_string(),
            ScalarType::Int64 => "llong".to_string(),
            ScalarType::UInt8 => "uchar".to_string(),
            ScalarType::UInt16 => "ushort".to_string(),
            ScalarType::UInt32 => "uint".to_string(),
            ScalarType::UInt64 => "ullong".to_string(),
            ScalarType::Float32 => "float".to_string(),
            ScalarType::Float64 => "double".to_string(),
            ScalarType::Complex64 => "cfloat".to_string(),
            ScalarType::Complex128 => "cdouble".to_string(),
            ScalarType::Bits(size) => format!("b{}", size * 8),
            ScalarType::String => "S".to_string(),
        };
        Self {
            scalar,
            endianness: None,
            name,
        }
    }
}

impl Default for ElementType {
    fn default() -> Self {
        ScalarType::Float64.into()
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            write!(
                f,
                "{}{:?} ({} bytes)",
                self.effective_endianness().symbol(),
                self.scalar,
                self.size()
            )
        } else {
            write!(f, "{}", self.name)
        }
    }
}

impl Serialize for ElementType {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.name)
    }
}

impl<'de> Deserialize<'de> for ElementType {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
