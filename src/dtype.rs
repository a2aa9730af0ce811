//! Sample type resolution.
//!
//! Maps a semantic descriptor (byte order, element kind, byte width) to the
//! concrete on-disk scalar type. The recognized set is spelled out as a
//! single match over the full tuple so it can be tested exhaustively.

use crate::error::{Error, Result};

/// Byte order of scalar elements as they are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    Little,
    Big,
    /// Single-byte kinds have no byte order.
    NotApplicable,
}

impl ByteOrder {
    /// Parse the numpy-style byte order character: `<`, `>` or `|`.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '<' => Some(ByteOrder::Little),
            '>' => Some(ByteOrder::Big),
            '|' => Some(ByteOrder::NotApplicable),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            ByteOrder::Little => '<',
            ByteOrder::Big => '>',
            ByteOrder::NotApplicable => '|',
        }
    }
}

/// Semantic element kind, before width resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    SignedInt,
    UnsignedInt,
    Float,
    Double,
    SignedByte,
    UnsignedByte,
}

impl ElementKind {
    /// Parse the numpy-style kind character.
    ///
    /// `h` (short) and `l` (long) are accepted as aliases for the signed
    /// integer kind; the byte width still has to match.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'i' | 'h' | 'l' => Some(ElementKind::SignedInt),
            'u' => Some(ElementKind::UnsignedInt),
            'f' => Some(ElementKind::Float),
            'd' => Some(ElementKind::Double),
            'b' => Some(ElementKind::SignedByte),
            'B' => Some(ElementKind::UnsignedByte),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            ElementKind::SignedInt => 'i',
            ElementKind::UnsignedInt => 'u',
            ElementKind::Float => 'f',
            ElementKind::Double => 'd',
            ElementKind::SignedByte => 'b',
            ElementKind::UnsignedByte => 'B',
        }
    }
}

/// Concrete on-disk scalar type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    F32Le,
    F32Be,
    F64Le,
    F64Be,
    I16Le,
    I16Be,
    I32Le,
    I32Be,
    I64Le,
    I64Be,
    U16Le,
    U16Be,
    U32Le,
    U32Be,
    U64Le,
    U64Be,
    I8,
    U8,
}

impl SampleType {
    /// Width of one scalar element in bytes.
    pub fn byte_width(self) -> usize {
        match self {
            SampleType::I8 | SampleType::U8 => 1,
            SampleType::I16Le | SampleType::I16Be | SampleType::U16Le | SampleType::U16Be => 2,
            SampleType::F32Le
            | SampleType::F32Be
            | SampleType::I32Le
            | SampleType::I32Be
            | SampleType::U32Le
            | SampleType::U32Be => 4,
            SampleType::F64Le
            | SampleType::F64Be
            | SampleType::I64Le
            | SampleType::I64Be
            | SampleType::U64Le
            | SampleType::U64Be => 8,
        }
    }

    /// Stable one-byte code stamped into file headers.
    pub fn code(self) -> u8 {
        match self {
            SampleType::F32Le => 0x01,
            SampleType::F32Be => 0x02,
            SampleType::F64Le => 0x03,
            SampleType::F64Be => 0x04,
            SampleType::I16Le => 0x05,
            SampleType::I16Be => 0x06,
            SampleType::I32Le => 0x07,
            SampleType::I32Be => 0x08,
            SampleType::I64Le => 0x09,
            SampleType::I64Be => 0x0a,
            SampleType::U16Le => 0x0b,
            SampleType::U16Be => 0x0c,
            SampleType::U32Le => 0x0d,
            SampleType::U32Be => 0x0e,
            SampleType::U64Le => 0x0f,
            SampleType::U64Be => 0x10,
            SampleType::I8 => 0x11,
            SampleType::U8 => 0x12,
        }
    }

    /// Short name recorded in the channel properties sidecar.
    pub fn name(self) -> &'static str {
        match self {
            SampleType::F32Le => "f32le",
            SampleType::F32Be => "f32be",
            SampleType::F64Le => "f64le",
            SampleType::F64Be => "f64be",
            SampleType::I16Le => "i16le",
            SampleType::I16Be => "i16be",
            SampleType::I32Le => "i32le",
            SampleType::I32Be => "i32be",
            SampleType::I64Le => "i64le",
            SampleType::I64Be => "i64be",
            SampleType::U16Le => "u16le",
            SampleType::U16Be => "u16be",
            SampleType::U32Le => "u32le",
            SampleType::U32Be => "u32be",
            SampleType::U64Le => "u64le",
            SampleType::U64Be => "u64be",
            SampleType::I8 => "i8",
            SampleType::U8 => "u8",
        }
    }
}

/// Resolve a `(byte order, kind, width)` triple to a concrete sample type.
///
/// Width is ignored for float/double and for the single-byte kinds (which
/// are also byte-order independent). Integer kinds require width 2, 4 or 8
/// and an explicit little or big byte order; nothing is widened implicitly.
///
/// # Errors
///
/// - `Error::UnsupportedType` for any triple outside the recognized set.
pub fn resolve(order: ByteOrder, kind: ElementKind, width: usize) -> Result<SampleType> {
    use ByteOrder::*;
    use ElementKind::*;

    let resolved = match (order, kind, width) {
        (Little, Float, _) => Some(SampleType::F32Le),
        (Big, Float, _) => Some(SampleType::F32Be),
        (Little, Double, _) => Some(SampleType::F64Le),
        (Big, Double, _) => Some(SampleType::F64Be),

        (Little, SignedInt, 2) => Some(SampleType::I16Le),
        (Little, SignedInt, 4) => Some(SampleType::I32Le),
        (Little, SignedInt, 8) => Some(SampleType::I64Le),
        (Big, SignedInt, 2) => Some(SampleType::I16Be),
        (Big, SignedInt, 4) => Some(SampleType::I32Be),
        (Big, SignedInt, 8) => Some(SampleType::I64Be),

        (Little, UnsignedInt, 2) => Some(SampleType::U16Le),
        (Little, UnsignedInt, 4) => Some(SampleType::U32Le),
        (Little, UnsignedInt, 8) => Some(SampleType::U64Le),
        (Big, UnsignedInt, 2) => Some(SampleType::U16Be),
        (Big, UnsignedInt, 4) => Some(SampleType::U32Be),
        (Big, UnsignedInt, 8) => Some(SampleType::U64Be),

        (_, SignedByte, _) => Some(SampleType::I8),
        (_, UnsignedByte, _) => Some(SampleType::U8),

        _ => None,
    };

    resolved.ok_or(Error::UnsupportedType {
        byte_order: order.as_char(),
        kind: kind.as_char(),
        width,
    })
}
