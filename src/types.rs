//! Primitive type catalog and field types.

use crate::error::SchemaError;
use std::fmt;
use std::str::FromStr;

/// MAVLink primitive wire type. Declaration order is the catalog order and defines [`PrimitiveType::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Char,
    Uint8,
    Int8,
    Uint16,
    Int16,
    Uint32,
    Int32,
    Uint64,
    Int64,
    Float,
    Double,
    /// `uint8_t_mavlink_version`: a `uint8_t` filled with the protocol version.
    Uint8Version,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 12] = [
        PrimitiveType::Char,
        PrimitiveType::Uint8,
        PrimitiveType::Int8,
        PrimitiveType::Uint16,
        PrimitiveType::Int16,
        PrimitiveType::Uint32,
        PrimitiveType::Int32,
        PrimitiveType::Uint64,
        PrimitiveType::Int64,
        PrimitiveType::Float,
        PrimitiveType::Double,
        PrimitiveType::Uint8Version,
    ];

    /// Position in the catalog; used as the numeric type id by generated code.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Size in bytes on the wire.
    pub fn size(self) -> usize {
        match self {
            PrimitiveType::Char
            | PrimitiveType::Uint8
            | PrimitiveType::Int8
            | PrimitiveType::Uint8Version => 1,
            PrimitiveType::Uint16 | PrimitiveType::Int16 => 2,
            PrimitiveType::Uint32 | PrimitiveType::Int32 | PrimitiveType::Float => 4,
            PrimitiveType::Uint64 | PrimitiveType::Int64 | PrimitiveType::Double => 8,
        }
    }

    /// Name as written in definition files.
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Char => "char",
            PrimitiveType::Uint8 => "uint8_t",
            PrimitiveType::Int8 => "int8_t",
            PrimitiveType::Uint16 => "uint16_t",
            PrimitiveType::Int16 => "int16_t",
            PrimitiveType::Uint32 => "uint32_t",
            PrimitiveType::Int32 => "int32_t",
            PrimitiveType::Uint64 => "uint64_t",
            PrimitiveType::Int64 => "int64_t",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::Uint8Version => "uint8_t_mavlink_version",
        }
    }

    /// Name hashed into the CRC-extra seed: the version marker counts as a plain `uint8_t`.
    pub fn crc_name(self) -> &'static str {
        match self {
            PrimitiveType::Uint8Version => PrimitiveType::Uint8.name(),
            other => other.name(),
        }
    }

    /// Upper-case identifier token shared by every backend (`UINT8`, `UINT8_VERSION`, ...).
    pub fn id_token(self) -> &'static str {
        match self {
            PrimitiveType::Char => "CHAR",
            PrimitiveType::Uint8 => "UINT8",
            PrimitiveType::Int8 => "INT8",
            PrimitiveType::Uint16 => "UINT16",
            PrimitiveType::Int16 => "INT16",
            PrimitiveType::Uint32 => "UINT32",
            PrimitiveType::Int32 => "INT32",
            PrimitiveType::Uint64 => "UINT64",
            PrimitiveType::Int64 => "INT64",
            PrimitiveType::Float => "FLOAT",
            PrimitiveType::Double => "DOUBLE",
            PrimitiveType::Uint8Version => "UINT8_VERSION",
        }
    }

    pub fn is_integer(self) -> bool {
        !matches!(
            self,
            PrimitiveType::Float | PrimitiveType::Double | PrimitiveType::Char
        )
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PrimitiveType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrimitiveType::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| SchemaError::UnknownType(s.to_string()))
    }
}

/// Primitive plus optional fixed array length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldType {
    pub primitive: PrimitiveType,
    /// Declared array length; `None` for scalars. Bounded by one byte since it is hashed as one.
    pub count: Option<u8>,
}

impl FieldType {
    pub fn scalar(primitive: PrimitiveType) -> Self {
        FieldType { primitive, count: None }
    }

    pub fn array(primitive: PrimitiveType, count: u8) -> Self {
        FieldType { primitive, count: Some(count) }
    }

    /// Parse `type` or `type[N]`.
    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        let text = text.trim();
        let Some(open) = text.find('[') else {
            return Ok(FieldType::scalar(text.parse()?));
        };
        let primitive: PrimitiveType = text[..open].trim().parse()?;
        let count = text[open + 1..]
            .strip_suffix(']')
            .map(str::trim)
            .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|&n| n > 0)
            .ok_or_else(|| SchemaError::MalformedCount(text.to_string()))?;
        Ok(FieldType::array(primitive, count))
    }

    /// Effective element count (1 for scalars).
    pub fn count(&self) -> usize {
        self.count.map(usize::from).unwrap_or(1)
    }

    pub fn is_array(&self) -> bool {
        self.count.is_some()
    }

    /// A `char` array is a fixed-length string, not an element array.
    pub fn is_string(&self) -> bool {
        self.primitive == PrimitiveType::Char && self.count.is_some()
    }

    /// Bytes occupied on the wire.
    pub fn wire_size(&self) -> usize {
        if self.primitive == PrimitiveType::Char {
            // a string costs its declared length
            self.count()
        } else {
            self.primitive.size() * self.count()
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.count {
            Some(n) => write!(f, "{}[{}]", self.primitive, n),
            None => write!(f, "{}", self.primitive),
        }
    }
}
