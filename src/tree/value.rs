//! Attribute types and the dynamically-typed value union

/// The 34 attribute type tags used by LSF and LSX.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum AttributeType {
    None = 0,
    Byte = 1,
    Short = 2,
    UShort = 3,
    Int = 4,
    UInt = 5,
    Float = 6,
    Double = 7,
    IVec2 = 8,
    IVec3 = 9,
    IVec4 = 10,
    Vec2 = 11,
    Vec3 = 12,
    Vec4 = 13,
    Mat2 = 14,
    Mat3 = 15,
    Mat3x4 = 16,
    Mat4x3 = 17,
    Mat4 = 18,
    Bool = 19,
    String = 20,
    Path = 21,
    FixedString = 22,
    LsString = 23,
    ULongLong = 24,
    ScratchBuffer = 25,
    Long = 26,
    Int8 = 27,
    TranslatedString = 28,
    WString = 29,
    LsWString = 30,
    Uuid = 31,
    Int64 = 32,
    TranslatedFsString = 33,
}

impl AttributeType {
    /// Numeric tag as stored in `typeAndLength`.
    #[must_use]
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Resolve a numeric tag.
    #[must_use]
    pub fn from_id(id: u32) -> Option<Self> {
        use AttributeType::*;
        Some(match id {
            0 => None,
            1 => Byte,
            2 => Short,
            3 => UShort,
            4 => Int,
            5 => UInt,
            6 => Float,
            7 => Double,
            8 => IVec2,
            9 => IVec3,
            10 => IVec4,
            11 => Vec2,
            12 => Vec3,
            13 => Vec4,
            14 => Mat2,
            15 => Mat3,
            16 => Mat3x4,
            17 => Mat4x3,
            18 => Mat4,
            19 => Bool,
            20 => String,
            21 => Path,
            22 => FixedString,
            23 => LsString,
            24 => ULongLong,
            25 => ScratchBuffer,
            26 => Long,
            27 => Int8,
            28 => TranslatedString,
            29 => WString,
            30 => LsWString,
            31 => Uuid,
            32 => Int64,
            33 => TranslatedFsString,
            _ => return Option::None,
        })
    }

    /// LSX type name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            AttributeType::None => "None",
            AttributeType::Byte => "Byte",
            AttributeType::Short => "Short",
            AttributeType::UShort => "UShort",
            AttributeType::Int => "Int",
            AttributeType::UInt => "UInt",
            AttributeType::Float => "Float",
            AttributeType::Double => "Double",
            AttributeType::IVec2 => "IVec2",
            AttributeType::IVec3 => "IVec3",
            AttributeType::IVec4 => "IVec4",
            AttributeType::Vec2 => "Vec2",
            AttributeType::Vec3 => "Vec3",
            AttributeType::Vec4 => "Vec4",
            AttributeType::Mat2 => "Mat2",
            AttributeType::Mat3 => "Mat3",
            AttributeType::Mat3x4 => "Mat3x4",
            AttributeType::Mat4x3 => "Mat4x3",
            AttributeType::Mat4 => "Mat4",
            AttributeType::Bool => "Bool",
            AttributeType::String => "String",
            AttributeType::Path => "Path",
            AttributeType::FixedString => "FixedString",
            AttributeType::LsString => "LSString",
            AttributeType::ULongLong => "ULongLong",
            AttributeType::ScratchBuffer => "ScratchBuffer",
            AttributeType::Long => "Long",
            AttributeType::Int8 => "Int8",
            AttributeType::TranslatedString => "TranslatedString",
            AttributeType::WString => "WString",
            AttributeType::LsWString => "LSWString",
            AttributeType::Uuid => "UUID",
            AttributeType::Int64 => "Int64",
            AttributeType::TranslatedFsString => "TranslatedFSString",
        }
    }

    /// Resolve an LSX type name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        use AttributeType::*;
        Some(match name {
            "None" => None,
            "Byte" | "uint8" => Byte,
            "Short" | "int16" => Short,
            "UShort" | "uint16" => UShort,
            "Int" | "int32" | "int" => Int,
            "UInt" | "uint32" => UInt,
            "Float" | "float" => Float,
            "Double" | "double" => Double,
            "IVec2" | "ivec2" => IVec2,
            "IVec3" | "ivec3" => IVec3,
            "IVec4" | "ivec4" => IVec4,
            "Vec2" | "fvec2" => Vec2,
            "Vec3" | "fvec3" => Vec3,
            "Vec4" | "fvec4" => Vec4,
            "Mat2" | "mat2x2" => Mat2,
            "Mat3" | "mat3x3" => Mat3,
            "Mat3x4" | "mat3x4" => Mat3x4,
            "Mat4x3" | "mat4x3" => Mat4x3,
            "Mat4" | "mat4x4" => Mat4,
            "Bool" | "bool" => Bool,
            "String" | "string" => String,
            "Path" | "path" => Path,
            "FixedString" => FixedString,
            "LSString" => LsString,
            "ULongLong" | "uint64" => ULongLong,
            "ScratchBuffer" => ScratchBuffer,
            "Long" | "old_int64" => Long,
            "Int8" | "int8" => Int8,
            "TranslatedString" => TranslatedString,
            "WString" => WString,
            "LSWString" => LsWString,
            "UUID" | "guid" => Uuid,
            "Int64" | "int64" => Int64,
            "TranslatedFSString" => TranslatedFsString,
            _ => return Option::None,
        })
    }

    /// Element count for vector and matrix types.
    #[must_use]
    pub fn columns(self) -> Option<usize> {
        match self {
            AttributeType::IVec2 | AttributeType::Vec2 => Some(2),
            AttributeType::IVec3 | AttributeType::Vec3 => Some(3),
            AttributeType::IVec4 | AttributeType::Vec4 => Some(4),
            AttributeType::Mat2 => Some(4),
            AttributeType::Mat3 => Some(9),
            AttributeType::Mat3x4 | AttributeType::Mat4x3 => Some(12),
            AttributeType::Mat4 => Some(16),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_float_vector(self) -> bool {
        matches!(
            self,
            AttributeType::Vec2
                | AttributeType::Vec3
                | AttributeType::Vec4
                | AttributeType::Mat2
                | AttributeType::Mat3
                | AttributeType::Mat3x4
                | AttributeType::Mat4x3
                | AttributeType::Mat4
        )
    }
}

/// A localization-aware string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslatedString {
    pub value: String,
    pub handle: String,
}

/// A localization-aware string with nested argument substitutions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslatedFsString {
    pub value: String,
    pub handle: String,
    /// Serialization version prefix used by BG3 resources; not surfaced in LSX.
    pub version: u16,
    pub arguments: Vec<TranslatedFsArgument>,
}

/// One substitution argument of a [`TranslatedFsString`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslatedFsArgument {
    pub key: String,
    pub string: TranslatedFsString,
    pub value: String,
}

/// Dynamically-typed attribute value.
///
/// The type tag of the owning [`Attribute`] decides which variant is valid;
/// both codecs branch on the tag exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    None,
    Byte(u8),
    Short(i16),
    UShort(u16),
    Int(i32),
    UInt(u32),
    Float(f32),
    Double(f64),
    IVec(Vec<i32>),
    Vec(Vec<f32>),
    Bool(bool),
    String(String),
    ULongLong(u64),
    Buffer(Vec<u8>),
    Long(i64),
    Int8(i8),
    TranslatedString(TranslatedString),
    Uuid(uuid::Uuid),
    TranslatedFsString(TranslatedFsString),
}

impl Default for AttributeValue {
    fn default() -> Self {
        AttributeValue::None
    }
}

/// A typed attribute of a [`crate::tree::Node`].
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub ty: AttributeType,
    pub value: AttributeValue,
}

impl Attribute {
    #[must_use]
    pub fn new(ty: AttributeType, value: AttributeValue) -> Self {
        Attribute { ty, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tag_roundtrips_through_id_and_name() {
        for id in 0..=33u32 {
            let ty = AttributeType::from_id(id).unwrap();
            assert_eq!(ty.id(), id);
            assert_eq!(AttributeType::from_name(ty.name()), Some(ty));
        }
        assert_eq!(AttributeType::from_id(34), None);
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(AttributeType::from_name("NotAType"), None);
    }
}
