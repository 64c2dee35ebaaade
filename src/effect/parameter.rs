//! 着色器参数
//!
//! `Parameter` 是公共前缀（名称、类别、类型）。`ResourceParameter` 与
//! `ValueTypeParameter` 先写公共前缀，再写各自字段，线上没有子类型标签：
//! 具体类型由所在位置决定（常量缓冲区中的是值类型参数，
//! `Shader::resource_parameters` 中的是资源参数）。

use crate::core::error::Result;
use crate::serialization::{BinaryReader, BinaryWriter, DataSerializable};

crate::wire_enum! {
    /// 参数类别，数值与 `D3D_SHADER_VARIABLE_CLASS` 相同
    pub enum ParameterClass: u8, tag = b"PCLS" {
        Scalar = 0,
        Vector = 1,
        MatrixRows = 2,
        MatrixColumns = 3,
        Object = 4,
        Struct = 5,
        InterfaceClass = 6,
        InterfacePointer = 7,
    }
}

crate::wire_enum! {
    /// 参数类型，数值与 `D3D_SHADER_VARIABLE_TYPE` 相同
    pub enum ParameterType: u8, tag = b"PTYP" {
        Void = 0,
        Bool = 1,
        Int = 2,
        Float = 3,
        String = 4,
        Texture = 5,
        Texture1D = 6,
        Texture2D = 7,
        Texture3D = 8,
        TextureCube = 9,
        Sampler = 10,
        Sampler1D = 11,
        Sampler2D = 12,
        Sampler3D = 13,
        SamplerCube = 14,
        PixelShader = 15,
        VertexShader = 16,
        PixelFragment = 17,
        VertexFragment = 18,
        UInt = 19,
        UInt8 = 20,
        GeometryShader = 21,
        Rasterizer = 22,
        DepthStencil = 23,
        Blend = 24,
        Buffer = 25,
        CBuffer = 26,
        TBuffer = 27,
        Texture1DArray = 28,
        Texture2DArray = 29,
        RenderTargetView = 30,
        DepthStencilView = 31,
        Texture2DMultisampled = 32,
        Texture2DMultisampledArray = 33,
        TextureCubeArray = 34,
        HullShader = 35,
        DomainShader = 36,
        InterfacePointer = 37,
        ComputeShader = 38,
        Double = 39,
        RWTexture1D = 40,
        RWTexture1DArray = 41,
        RWTexture2D = 42,
        RWTexture2DArray = 43,
        RWTexture3D = 44,
        RWBuffer = 45,
        ByteAddressBuffer = 46,
        RWByteAddressBuffer = 47,
        StructuredBuffer = 48,
        RWStructuredBuffer = 49,
        AppendStructuredBuffer = 50,
        ConsumeStructuredBuffer = 51,
    }
}

/// 参数的公共部分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub class: ParameterClass,
    pub ty: ParameterType,
}

impl Parameter {
    pub fn new(name: impl Into<String>, class: ParameterClass, ty: ParameterType) -> Self {
        Self {
            name: name.into(),
            class,
            ty,
        }
    }
}

impl DataSerializable for Parameter {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_string(&self.name)?;
        w.write_enum(self.class);
        w.write_enum(self.ty);
        Ok(())
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            name: r.read_string()?,
            class: r.read_enum()?,
            ty: r.read_enum()?,
        })
    }
}

/// 资源参数（纹理、采样器、缓冲区等绑定到寄存器槽位的对象）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceParameter {
    pub base: Parameter,
    /// 起始寄存器槽位
    pub slot: u8,
    /// 占用的槽位数
    pub count: u8,
}

impl DataSerializable for ResourceParameter {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        self.base.write(w)?;
        w.write_u8(self.slot);
        w.write_u8(self.count);
        Ok(())
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            base: Parameter::read(r)?,
            slot: r.read_u8()?,
            count: r.read_u8()?,
        })
    }
}

/// 常量缓冲区中的值类型参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueTypeParameter {
    pub base: Parameter,
    /// 在常量缓冲区中的字节偏移
    pub offset: i32,
    /// 数组元素数（非数组为 0）
    pub count: i32,
    /// 字节大小
    pub size: i32,
    pub row_count: u8,
    pub column_count: u8,
    /// 默认值（着色器中未声明初值时为 `None`）
    pub default_value: Option<Vec<u8>>,
}

impl DataSerializable for ValueTypeParameter {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        self.base.write(w)?;
        w.write_packed_i32(self.offset);
        w.write_packed_i32(self.count);
        w.write_packed_i32(self.size);
        w.write_u8(self.row_count);
        w.write_u8(self.column_count);
        w.write_nullable(self.default_value.as_deref(), |w, v| w.write_byte_array(v))
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            base: Parameter::read(r)?,
            offset: r.read_packed_i32()?,
            count: r.read_packed_i32()?,
            size: r.read_packed_i32()?,
            row_count: r.read_u8()?,
            column_count: r.read_u8()?,
            default_value: r.read_nullable(|r| r.read_byte_array())?,
        })
    }
}

/// 对两种参数的借用视图，用于遍历一个着色器的全部参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterVariant<'a> {
    Resource(&'a ResourceParameter),
    Value(&'a ValueTypeParameter),
}

impl<'a> ParameterVariant<'a> {
    pub fn base(&self) -> &'a Parameter {
        match self {
            ParameterVariant::Resource(p) => &p.base,
            ParameterVariant::Value(p) => &p.base,
        }
    }

    pub fn name(&self) -> &'a str {
        &self.base().name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_value_parameter() -> ValueTypeParameter {
        ValueTypeParameter {
            base: Parameter::new("World", ParameterClass::MatrixColumns, ParameterType::Float),
            offset: 64,
            count: 0,
            size: 64,
            row_count: 4,
            column_count: 4,
            default_value: None,
        }
    }

    #[test]
    fn test_base_fields_written_first_without_tag() {
        let param = ResourceParameter {
            base: Parameter::new("Texture", ParameterClass::Object, ParameterType::Texture2D),
            slot: 3,
            count: 1,
        };
        let mut w = BinaryWriter::new();
        param.write(&mut w).unwrap();
        let bytes = w.finish().unwrap();
        // 名称长度 + "Texture" + 类别 + 类型 + 槽位 + 数量
        let mut expected = vec![7u8];
        expected.extend_from_slice(b"Texture");
        expected.extend_from_slice(&[4, 7, 3, 1]);
        assert_eq!(bytes, expected);

        let mut r = BinaryReader::new(&bytes);
        assert_eq!(ResourceParameter::read(&mut r).unwrap(), param);
    }

    #[test]
    fn test_value_parameter_default_value() {
        let mut param = sample_value_parameter();
        param.default_value = Some(vec![0; 4]);
        let mut w = BinaryWriter::new();
        param.write(&mut w).unwrap();
        let bytes = w.finish().unwrap();
        let mut r = BinaryReader::new(&bytes);
        assert_eq!(ValueTypeParameter::read(&mut r).unwrap(), param);
    }

    #[test]
    fn test_base_prefix_readable_from_either_subtype() {
        let param = sample_value_parameter();
        let mut w = BinaryWriter::new();
        param.write(&mut w).unwrap();
        let bytes = w.finish().unwrap();
        // 读取方只知道公共前缀时也能读出它
        let mut r = BinaryReader::new(&bytes);
        assert_eq!(Parameter::read(&mut r).unwrap(), param.base);
    }

    #[test]
    fn test_variant_view() {
        let param = sample_value_parameter();
        let view = ParameterVariant::Value(&param);
        assert_eq!(view.name(), "World");
        assert_eq!(view.base().class, ParameterClass::MatrixColumns);
    }

    #[test]
    fn test_invalid_class_rejected() {
        let bytes = [1u8, b'x', 99, 0];
        let mut r = BinaryReader::new(&bytes);
        assert!(Parameter::read(&mut r).is_err());
    }
}
