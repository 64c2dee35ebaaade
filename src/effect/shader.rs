//! 编译后的着色器及其反射信息

use crate::core::error::Result;
use crate::serialization::{BinaryReader, BinaryWriter, DataSerializable};

use super::parameter::{ParameterVariant, ResourceParameter, ValueTypeParameter};

crate::wire_enum! {
    /// 着色器阶段
    pub enum ShaderType: u8, tag = b"SHTY" {
        Vertex = 0,
        Hull = 1,
        Domain = 2,
        Geometry = 3,
        Pixel = 4,
        Compute = 5,
    }
}

crate::wire_enum! {
    /// 目标特性级别，数值与 `D3D_FEATURE_LEVEL` 相同
    pub enum FeatureLevel: u32, tag = b"FLVL" {
        Level9_1 = 0x9100,
        Level9_2 = 0x9200,
        Level9_3 = 0x9300,
        Level10_0 = 0xa000,
        Level10_1 = 0xa100,
        Level11_0 = 0xb000,
        Level11_1 = 0xb100,
        Level12_0 = 0xc000,
        Level12_1 = 0xc100,
    }
}

impl ShaderType {
    pub const ALL: [ShaderType; 6] = [
        ShaderType::Vertex,
        ShaderType::Hull,
        ShaderType::Domain,
        ShaderType::Geometry,
        ShaderType::Pixel,
        ShaderType::Compute,
    ];

    /// 在 `Pipeline` 中的槽位
    pub fn slot(self) -> usize {
        self as usize
    }
}

/// 输入 / 输出签名中的一个语义
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Semantic {
    pub name: String,
    pub index: u8,
    pub register: u8,
    pub system_value_type: u8,
    pub component_type: u8,
    pub usage_mask: u8,
    pub read_write_mask: u8,
    pub stream: u8,
}

impl DataSerializable for Semantic {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_string(&self.name)?;
        w.write_u8(self.index);
        w.write_u8(self.register);
        w.write_u8(self.system_value_type);
        w.write_u8(self.component_type);
        w.write_u8(self.usage_mask);
        w.write_u8(self.read_write_mask);
        w.write_u8(self.stream);
        Ok(())
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            name: r.read_string()?,
            index: r.read_u8()?,
            register: r.read_u8()?,
            system_value_type: r.read_u8()?,
            component_type: r.read_u8()?,
            usage_mask: r.read_u8()?,
            read_write_mask: r.read_u8()?,
            stream: r.read_u8()?,
        })
    }
}

/// 着色器签名
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    pub bytecode: Vec<u8>,
    pub hashcode: i32,
    pub semantics: Vec<Semantic>,
}

impl DataSerializable for Signature {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_byte_array(&self.bytecode)?;
        w.write_i32(self.hashcode);
        w.write_list(&self.semantics)
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            bytecode: r.read_byte_array()?,
            hashcode: r.read_i32()?,
            semantics: r.read_list()?,
        })
    }
}

/// 常量缓冲区
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConstantBuffer {
    pub name: String,
    /// 字节大小
    pub size: i32,
    pub parameters: Vec<ValueTypeParameter>,
}

impl DataSerializable for ConstantBuffer {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_string(&self.name)?;
        w.write_packed_i32(self.size);
        w.write_list(&self.parameters)
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            name: r.read_string()?,
            size: r.read_packed_i32()?,
            parameters: r.read_list()?,
        })
    }
}

/// 编译后的着色器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shader {
    /// 导出名称，匿名着色器为 `None`
    pub name: Option<String>,
    pub ty: ShaderType,
    pub compiler_flags: u32,
    pub level: FeatureLevel,
    pub bytecode: Vec<u8>,
    pub input_signature: Signature,
    pub output_signature: Signature,
    pub constant_buffers: Vec<ConstantBuffer>,
    pub resource_parameters: Vec<ResourceParameter>,
}

impl Shader {
    /// 只有类型和字节码的着色器
    pub fn new(ty: ShaderType, bytecode: Vec<u8>) -> Self {
        Self {
            name: None,
            ty,
            compiler_flags: 0,
            level: FeatureLevel::Level11_0,
            bytecode,
            input_signature: Signature::default(),
            output_signature: Signature::default(),
            constant_buffers: Vec::new(),
            resource_parameters: Vec::new(),
        }
    }

    /// 遍历全部参数：先是各常量缓冲区中的值类型参数，然后是资源参数
    pub fn parameters(&self) -> impl Iterator<Item = ParameterVariant<'_>> {
        self.constant_buffers
            .iter()
            .flat_map(|cb| cb.parameters.iter().map(ParameterVariant::Value))
            .chain(self.resource_parameters.iter().map(ParameterVariant::Resource))
    }
}

impl DataSerializable for Shader {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_optional_string(self.name.as_deref())?;
        w.write_enum(self.ty);
        w.write_u32(self.compiler_flags);
        w.write_enum(self.level);
        w.write_byte_array(&self.bytecode)?;
        self.input_signature.write(w)?;
        self.output_signature.write(w)?;
        w.write_list(&self.constant_buffers)?;
        w.write_list(&self.resource_parameters)
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            name: r.read_optional_string()?,
            ty: r.read_enum()?,
            compiler_flags: r.read_u32()?,
            level: r.read_enum()?,
            bytecode: r.read_byte_array()?,
            input_signature: Signature::read(r)?,
            output_signature: Signature::read(r)?,
            constant_buffers: r.read_list()?,
            resource_parameters: r.read_list()?,
        })
    }
}
