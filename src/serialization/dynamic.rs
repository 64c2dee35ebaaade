//! 动态类型字段的编解码
//!
//! `DynamicValue` 是显式的标签联合类型。写入时先写 1 字节类型码，再写值；
//! 读取时按类型码分派到具体类型。枚举值额外写入类型标签和底层宽度，
//! 读取后可以通过 [`BoxedEnum::to`] 还原为具体枚举。

use std::fmt;

use crate::core::error::{Result, SerializationError};
use crate::math::{Color, Matrix4, Vector2, Vector3, Vector4};

use super::wire_enum::{EnumWidth, WireEnum};
use super::{BinaryReader, BinaryWriter, FourCC};

/// 动态值的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Byte,
    SByte,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    String,
    Bytes,
    Vector2,
    Vector3,
    Vector4,
    Color,
    Matrix,
    Enum,
}

impl ValueKind {
    const ALL: [ValueKind; 20] = [
        ValueKind::Null,
        ValueKind::Bool,
        ValueKind::Byte,
        ValueKind::SByte,
        ValueKind::Short,
        ValueKind::UShort,
        ValueKind::Int,
        ValueKind::UInt,
        ValueKind::Long,
        ValueKind::ULong,
        ValueKind::Float,
        ValueKind::Double,
        ValueKind::String,
        ValueKind::Bytes,
        ValueKind::Vector2,
        ValueKind::Vector3,
        ValueKind::Vector4,
        ValueKind::Color,
        ValueKind::Matrix,
        ValueKind::Enum,
    ];

    /// 线上的类型码
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Byte => "u8",
            ValueKind::SByte => "i8",
            ValueKind::Short => "i16",
            ValueKind::UShort => "u16",
            ValueKind::Int => "i32",
            ValueKind::UInt => "u32",
            ValueKind::Long => "i64",
            ValueKind::ULong => "u64",
            ValueKind::Float => "f32",
            ValueKind::Double => "f64",
            ValueKind::String => "string",
            ValueKind::Bytes => "bytes",
            ValueKind::Vector2 => "vector2",
            ValueKind::Vector3 => "vector3",
            ValueKind::Vector4 => "vector4",
            ValueKind::Color => "color",
            ValueKind::Matrix => "matrix",
            ValueKind::Enum => "enum",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 装箱的枚举值：类型标签 + 底层宽度 + 位模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoxedEnum {
    pub tag: FourCC,
    pub width: EnumWidth,
    pub bits: u64,
}

impl BoxedEnum {
    pub fn of<E: WireEnum>(value: E) -> Self {
        Self {
            tag: E::TAG,
            width: E::WIDTH,
            bits: value.to_bits() & E::WIDTH.mask(),
        }
    }

    /// 还原为具体枚举，类型标签、宽度或值不匹配时失败
    pub fn to<E: WireEnum>(&self) -> Result<E> {
        if self.tag != E::TAG {
            return Err(SerializationError::TypeMismatch {
                expected: E::NAME,
                found: "enum with another type tag",
            }
            .into());
        }
        if self.width != E::WIDTH {
            return Err(SerializationError::TypeMismatch {
                expected: E::NAME,
                found: "enum with another underlying width",
            }
            .into());
        }
        E::from_bits(self.bits).ok_or_else(|| {
            SerializationError::InvalidEnum {
                name: E::NAME,
                value: self.bits,
            }
            .into()
        })
    }
}

/// 动态类型的值
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicValue {
    Null,
    Bool(bool),
    Byte(u8),
    SByte(i8),
    Short(i16),
    UShort(u16),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Vector2(Vector2),
    Vector3(Vector3),
    Vector4(Vector4),
    Color(Color),
    Matrix(Matrix4),
    Enum(BoxedEnum),
}

impl DynamicValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            DynamicValue::Null => ValueKind::Null,
            DynamicValue::Bool(_) => ValueKind::Bool,
            DynamicValue::Byte(_) => ValueKind::Byte,
            DynamicValue::SByte(_) => ValueKind::SByte,
            DynamicValue::Short(_) => ValueKind::Short,
            DynamicValue::UShort(_) => ValueKind::UShort,
            DynamicValue::Int(_) => ValueKind::Int,
            DynamicValue::UInt(_) => ValueKind::UInt,
            DynamicValue::Long(_) => ValueKind::Long,
            DynamicValue::ULong(_) => ValueKind::ULong,
            DynamicValue::Float(_) => ValueKind::Float,
            DynamicValue::Double(_) => ValueKind::Double,
            DynamicValue::String(_) => ValueKind::String,
            DynamicValue::Bytes(_) => ValueKind::Bytes,
            DynamicValue::Vector2(_) => ValueKind::Vector2,
            DynamicValue::Vector3(_) => ValueKind::Vector3,
            DynamicValue::Vector4(_) => ValueKind::Vector4,
            DynamicValue::Color(_) => ValueKind::Color,
            DynamicValue::Matrix(_) => ValueKind::Matrix,
            DynamicValue::Enum(_) => ValueKind::Enum,
        }
    }

    /// 枚举装箱
    pub fn from_enum<E: WireEnum>(value: E) -> Self {
        DynamicValue::Enum(BoxedEnum::of(value))
    }

    pub fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_u8(self.kind().code());
        match self {
            DynamicValue::Null => {}
            DynamicValue::Bool(v) => w.write_bool(*v),
            DynamicValue::Byte(v) => w.write_u8(*v),
            DynamicValue::SByte(v) => w.write_i8(*v),
            DynamicValue::Short(v) => w.write_i16(*v),
            DynamicValue::UShort(v) => w.write_u16(*v),
            DynamicValue::Int(v) => w.write_i32(*v),
            DynamicValue::UInt(v) => w.write_u32(*v),
            DynamicValue::Long(v) => w.write_i64(*v),
            DynamicValue::ULong(v) => w.write_u64(*v),
            DynamicValue::Float(v) => w.write_f32(*v),
            DynamicValue::Double(v) => w.write_f64(*v),
            DynamicValue::String(v) => w.write_string(v)?,
            DynamicValue::Bytes(v) => w.write_byte_array(v)?,
            DynamicValue::Vector2(v) => w.write_vector2(v),
            DynamicValue::Vector3(v) => w.write_vector3(v),
            DynamicValue::Vector4(v) => w.write_vector4(v),
            DynamicValue::Color(v) => w.write_color(v),
            DynamicValue::Matrix(v) => w.write_matrix(v),
            DynamicValue::Enum(e) => {
                w.write_fourcc(e.tag);
                w.write_u8(e.width.bytes() as u8);
                let bits = e.bits.to_le_bytes();
                w.write_raw(&bits[..e.width.bytes()]);
            }
        }
        Ok(())
    }

    pub fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        let offset = r.position();
        let code = r.read_u8()?;
        let kind = ValueKind::from_code(code)
            .ok_or(SerializationError::UnknownDynamicType { code, offset })?;

        Ok(match kind {
            ValueKind::Null => DynamicValue::Null,
            ValueKind::Bool => DynamicValue::Bool(r.read_bool()?),
            ValueKind::Byte => DynamicValue::Byte(r.read_u8()?),
            ValueKind::SByte => DynamicValue::SByte(r.read_i8()?),
            ValueKind::Short => DynamicValue::Short(r.read_i16()?),
            ValueKind::UShort => DynamicValue::UShort(r.read_u16()?),
            ValueKind::Int => DynamicValue::Int(r.read_i32()?),
            ValueKind::UInt => DynamicValue::UInt(r.read_u32()?),
            ValueKind::Long => DynamicValue::Long(r.read_i64()?),
            ValueKind::ULong => DynamicValue::ULong(r.read_u64()?),
            ValueKind::Float => DynamicValue::Float(r.read_f32()?),
            ValueKind::Double => DynamicValue::Double(r.read_f64()?),
            ValueKind::String => DynamicValue::String(r.read_string()?),
            ValueKind::Bytes => DynamicValue::Bytes(r.read_byte_array()?),
            ValueKind::Vector2 => DynamicValue::Vector2(r.read_vector2()?),
            ValueKind::Vector3 => DynamicValue::Vector3(r.read_vector3()?),
            ValueKind::Vector4 => DynamicValue::Vector4(r.read_vector4()?),
            ValueKind::Color => DynamicValue::Color(r.read_color()?),
            ValueKind::Matrix => DynamicValue::Matrix(r.read_matrix()?),
            ValueKind::Enum => {
                let tag = r.read_fourcc()?;
                let width_offset = r.position();
                let width_byte = r.read_u8()?;
                let width = EnumWidth::from_byte(width_byte).ok_or_else(|| {
                    SerializationError::InvalidValue {
                        field: format!("enum width at {:#x}", width_offset),
                        reason: format!("{} is not 1, 2, 4 or 8", width_byte),
                    }
                })?;
                let mut bits = [0u8; 8];
                bits[..width.bytes()].copy_from_slice(r.read_raw(width.bytes())?);
                DynamicValue::Enum(BoxedEnum {
                    tag,
                    width,
                    bits: u64::from_le_bytes(bits),
                })
            }
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DynamicValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DynamicValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// 整数类的值统一转为 i64（超出 i64 范围的 u64 返回 `None`）
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            DynamicValue::Byte(v) => Some(v as i64),
            DynamicValue::SByte(v) => Some(v as i64),
            DynamicValue::Short(v) => Some(v as i64),
            DynamicValue::UShort(v) => Some(v as i64),
            DynamicValue::Int(v) => Some(v as i64),
            DynamicValue::UInt(v) => Some(v as i64),
            DynamicValue::Long(v) => Some(v),
            DynamicValue::ULong(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            DynamicValue::Float(v) => Some(v),
            DynamicValue::Double(v) => Some(v as f32),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DynamicValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            DynamicValue::Color(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_enum<E: WireEnum>(&self) -> Result<E> {
        match self {
            DynamicValue::Enum(e) => e.to(),
            other => Err(SerializationError::TypeMismatch {
                expected: E::NAME,
                found: other.kind().name(),
            }
            .into()),
        }
    }
}

impl fmt::Display for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicValue::Null => f.write_str("null"),
            DynamicValue::Bool(v) => write!(f, "{}", v),
            DynamicValue::Byte(v) => write!(f, "{}", v),
            DynamicValue::SByte(v) => write!(f, "{}", v),
            DynamicValue::Short(v) => write!(f, "{}", v),
            DynamicValue::UShort(v) => write!(f, "{}", v),
            DynamicValue::Int(v) => write!(f, "{}", v),
            DynamicValue::UInt(v) => write!(f, "{}", v),
            DynamicValue::Long(v) => write!(f, "{}", v),
            DynamicValue::ULong(v) => write!(f, "{}", v),
            DynamicValue::Float(v) => write!(f, "{}", v),
            DynamicValue::Double(v) => write!(f, "{}", v),
            DynamicValue::String(v) => write!(f, "{:?}", v),
            DynamicValue::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            DynamicValue::Vector2(v) => write!(f, "({}, {})", v.x, v.y),
            DynamicValue::Vector3(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            DynamicValue::Vector4(v) => write!(f, "({}, {}, {}, {})", v.x, v.y, v.z, v.w),
            DynamicValue::Color(c) => write!(f, "rgba({}, {}, {}, {})", c.r, c.g, c.b, c.a),
            DynamicValue::Matrix(_) => f.write_str("<matrix>"),
            DynamicValue::Enum(e) => write!(f, "{}({})", e.tag, e.bits),
        }
    }
}

macro_rules! impl_from_for_dynamic {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for DynamicValue {
                fn from(v: $ty) -> Self {
                    DynamicValue::$variant(v)
                }
            }
        )+
    };
}

impl_from_for_dynamic! {
    bool => Bool,
    u8 => Byte,
    i8 => SByte,
    i16 => Short,
    u16 => UShort,
    i32 => Int,
    u32 => UInt,
    i64 => Long,
    u64 => ULong,
    f32 => Float,
    f64 => Double,
    String => String,
    Vec<u8> => Bytes,
    Vector2 => Vector2,
    Vector3 => Vector3,
    Vector4 => Vector4,
    Color => Color,
    Matrix4 => Matrix,
}

impl From<&str> for DynamicValue {
    fn from(v: &str) -> Self {
        DynamicValue::String(v.to_string())
    }
}
