//! 效果、技术、通道与管线

use crate::core::error::{Result, SerializationError};
use crate::serialization::{BinaryReader, BinaryWriter, DataSerializable, DynamicValue};

use super::shader::{Shader, ShaderType};

/// 管线阶段数（顶点、外壳、域、几何、像素、计算）
pub const STAGE_COUNT: usize = 6;

/// 流输出声明中的一项
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamOutputElement {
    pub stream: i32,
    /// `None` 表示填充空位
    pub semantic_name: Option<String>,
    pub semantic_index: i32,
    pub start_component: u8,
    pub component_count: u8,
    pub output_slot: u8,
}

impl DataSerializable for StreamOutputElement {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_packed_i32(self.stream);
        w.write_optional_string(self.semantic_name.as_deref())?;
        w.write_packed_i32(self.semantic_index);
        w.write_u8(self.start_component);
        w.write_u8(self.component_count);
        w.write_u8(self.output_slot);
        Ok(())
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            stream: r.read_packed_i32()?,
            semantic_name: r.read_optional_string()?,
            semantic_index: r.read_packed_i32()?,
            start_component: r.read_u8()?,
            component_count: r.read_u8()?,
            output_slot: r.read_u8()?,
        })
    }
}

/// 通道到着色器的引用
///
/// 要么按下标引用 `EffectData::shaders` 中的着色器，要么按名称引用
/// 另一个效果导出的着色器。不拥有着色器本身。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderLink {
    /// 着色器下标，`-1` 表示没有下标引用
    pub index: i32,
    pub import_name: Option<String>,
    pub stream_output_elements: Option<Vec<StreamOutputElement>>,
    pub stream_output_strides: Option<Vec<i32>>,
    pub stream_output_rasterized_stream: i32,
}

impl Default for ShaderLink {
    fn default() -> Self {
        Self {
            index: Self::NO_INDEX,
            import_name: None,
            stream_output_elements: None,
            stream_output_strides: None,
            stream_output_rasterized_stream: 0,
        }
    }
}

impl ShaderLink {
    pub const NO_INDEX: i32 = -1;

    /// 按下标引用
    pub fn to_index(index: usize) -> Self {
        Self {
            index: index as i32,
            ..Self::default()
        }
    }

    /// 按导出名称引用
    pub fn import(name: impl Into<String>) -> Self {
        Self {
            import_name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn is_import(&self) -> bool {
        self.index < 0 && self.import_name.is_some()
    }

    pub fn shader_index(&self) -> Option<usize> {
        usize::try_from(self.index).ok()
    }

    /// 在着色器列表中解析引用
    ///
    /// 下标优先；没有下标时按导出名称查找。
    pub fn resolve<'s>(&self, shaders: &'s [Shader]) -> Option<&'s Shader> {
        match self.shader_index() {
            Some(index) => shaders.get(index),
            None => {
                let name = self.import_name.as_deref()?;
                shaders.iter().find(|s| s.name.as_deref() == Some(name))
            }
        }
    }
}

impl DataSerializable for ShaderLink {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_packed_i32(self.index);
        w.write_optional_string(self.import_name.as_deref())?;
        w.write_nullable(self.stream_output_elements.as_deref(), |w, v| w.write_list(v))?;
        w.write_nullable(self.stream_output_strides.as_deref(), |w, v| {
            w.write_list_with(v, |w, s| {
                w.write_packed_i32(*s);
                Ok(())
            })
        })?;
        w.write_packed_i32(self.stream_output_rasterized_stream);
        Ok(())
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            index: r.read_packed_i32()?,
            import_name: r.read_optional_string()?,
            stream_output_elements: r.read_nullable(|r| r.read_list())?,
            stream_output_strides: r
                .read_nullable(|r| r.read_list_with(|r| r.read_packed_i32()))?,
            stream_output_rasterized_stream: r.read_packed_i32()?,
        })
    }
}

/// 六个阶段槽位，任意槽位可为空
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pipeline {
    pub links: [Option<ShaderLink>; STAGE_COUNT],
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stage: ShaderType) -> Option<&ShaderLink> {
        self.links[stage.slot()].as_ref()
    }

    pub fn set(&mut self, stage: ShaderType, link: Option<ShaderLink>) {
        self.links[stage.slot()] = link;
    }

    /// 非空槽位
    pub fn iter(&self) -> impl Iterator<Item = (ShaderType, &ShaderLink)> {
        ShaderType::ALL
            .iter()
            .zip(self.links.iter())
            .filter_map(|(stage, link)| link.as_ref().map(|l| (*stage, l)))
    }

    pub(crate) fn links_mut(&mut self) -> impl Iterator<Item = &mut ShaderLink> {
        self.links.iter_mut().flatten()
    }
}

impl DataSerializable for Pipeline {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        for link in &self.links {
            w.write_nullable(link.as_ref(), |w, l| l.write(w))?;
        }
        Ok(())
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        let mut pipeline = Pipeline::default();
        for slot in pipeline.links.iter_mut() {
            *slot = r.read_nullable(ShaderLink::read)?;
        }
        Ok(pipeline)
    }
}

/// 通道上的命名属性（渲染状态等）
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: DynamicValue,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<DynamicValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl DataSerializable for Attribute {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_string(&self.name)?;
        w.write_dynamic(&self.value)
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            name: r.read_string()?,
            value: r.read_dynamic()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pass {
    pub name: Option<String>,
    /// 子通道只在父通道之后执行，不单独出现在技术的通道列表中
    pub is_sub_pass: bool,
    pub attributes: Vec<Attribute>,
    pub pipeline: Pipeline,
}

impl Pass {
    pub fn attribute(&self, name: &str) -> Option<&DynamicValue> {
        self.attributes.iter().find(|a| a.name == name).map(|a| &a.value)
    }
}

impl DataSerializable for Pass {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_optional_string(self.name.as_deref())?;
        w.write_bool(self.is_sub_pass);
        w.write_list(&self.attributes)?;
        self.pipeline.write(w)
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            name: r.read_optional_string()?,
            is_sub_pass: r.read_bool()?,
            attributes: r.read_list()?,
            pipeline: Pipeline::read(r)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Technique {
    pub name: Option<String>,
    pub passes: Vec<Pass>,
}

impl DataSerializable for Technique {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_optional_string(self.name.as_deref())?;
        w.write_list(&self.passes)
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            name: r.read_optional_string()?,
            passes: r.read_list()?,
        })
    }
}

/// 预处理宏定义
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderMacro {
    pub name: String,
    pub value: String,
}

impl DataSerializable for ShaderMacro {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_string(&self.name)?;
        w.write_string(&self.value)
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            name: r.read_string()?,
            value: r.read_string()?,
        })
    }
}

/// 重新编译效果所需的参数
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompilerArguments {
    pub file_path: String,
    pub dependency_file_path: Option<String>,
    pub compiler_flags: u32,
    pub macros: Vec<ShaderMacro>,
    pub include_directories: Vec<String>,
}

impl DataSerializable for CompilerArguments {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_string(&self.file_path)?;
        w.write_optional_string(self.dependency_file_path.as_deref())?;
        w.write_u32(self.compiler_flags);
        w.write_list(&self.macros)?;
        w.write_list(&self.include_directories)
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            file_path: r.read_string()?,
            dependency_file_path: r.read_optional_string()?,
            compiler_flags: r.read_u32()?,
            macros: r.read_list()?,
            include_directories: r.read_list()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Effect {
    pub name: String,
    pub share_constant_buffers: bool,
    pub techniques: Vec<Technique>,
    pub arguments: Option<CompilerArguments>,
}

impl Effect {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn technique(&self, name: &str) -> Option<&Technique> {
        self.techniques.iter().find(|t| t.name.as_deref() == Some(name))
    }

    /// 检查所有下标引用都落在 `shader_count` 以内
    pub fn check_links(&self, shader_count: usize) -> Result<()> {
        for technique in &self.techniques {
            for pass in &technique.passes {
                for (stage, link) in pass.pipeline.iter() {
                    let out_of_range = link.shader_index().is_some_and(|i| i >= shader_count);
                    if out_of_range || (link.index < ShaderLink::NO_INDEX) {
                        return Err(SerializationError::InvalidValue {
                            field: format!("{}.{:?}.index", self.name, stage),
                            reason: format!(
                                "shader index {} outside 0..{}",
                                link.index, shader_count
                            ),
                        }
                        .into());
                    }
                }
            }
        }
        Ok(())
    }

    pub(crate) fn links_mut(&mut self) -> impl Iterator<Item = &mut ShaderLink> {
        self.techniques
            .iter_mut()
            .flat_map(|t| t.passes.iter_mut())
            .flat_map(|p| p.pipeline.links_mut())
    }
}

impl DataSerializable for Effect {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_string(&self.name)?;
        w.write_bool(self.share_constant_buffers);
        w.write_list(&self.techniques)?;
        w.write_nullable(self.arguments.as_ref(), |w, a| a.write(w))
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            name: r.read_string()?,
            share_constant_buffers: r.read_bool()?,
            techniques: r.read_list()?,
            arguments: r.read_nullable(CompilerArguments::read)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T: DataSerializable>(value: &T) -> T {
        let mut w = BinaryWriter::new();
        value.write(&mut w).unwrap();
        let bytes = w.finish().unwrap();
        let mut r = BinaryReader::new(&bytes);
        let out = T::read(&mut r).unwrap();
        assert!(r.is_at_end());
        out
    }

    #[test]
    fn test_empty_pipeline_is_six_null_flags() {
        let mut w = BinaryWriter::new();
        Pipeline::new().write(&mut w).unwrap();
        assert_eq!(w.finish().unwrap(), vec![0u8; STAGE_COUNT]);
    }

    #[test]
    fn test_pass_with_stream_output() {
        let mut link = ShaderLink::to_index(2);
        link.stream_output_elements = Some(vec![StreamOutputElement {
            semantic_name: Some("POSITION".to_string()),
            component_count: 4,
            ..StreamOutputElement::default()
        }]);
        link.stream_output_strides = Some(vec![16]);

        let mut pass = Pass {
            name: Some("P0".to_string()),
            attributes: vec![Attribute::new("Blending", "AlphaBlend"), Attribute::new("StencilRef", 3)],
            ..Pass::default()
        };
        pass.pipeline.set(ShaderType::Geometry, Some(link));

        let out = round_trip(&pass);
        assert_eq!(out, pass);
        assert_eq!(out.attribute("StencilRef").and_then(|v| v.as_i64()), Some(3));
        assert_eq!(out.pipeline.get(ShaderType::Geometry).and_then(|l| l.shader_index()), Some(2));
        assert!(out.pipeline.get(ShaderType::Vertex).is_none());
    }

    #[test]
    fn test_effect_with_compiler_arguments() {
        let effect = Effect {
            name: "Basic".to_string(),
            share_constant_buffers: true,
            techniques: vec![Technique {
                name: None,
                passes: vec![Pass::default()],
            }],
            arguments: Some(CompilerArguments {
                file_path: "basic.fx".to_string(),
                dependency_file_path: None,
                compiler_flags: 0x800,
                macros: vec![ShaderMacro {
                    name: "SKINNED".to_string(),
                    value: "1".to_string(),
                }],
                include_directories: vec!["shaders".to_string()],
            }),
        };
        assert_eq!(round_trip(&effect), effect);
    }

    #[test]
    fn test_resolve_by_index_and_import() {
        let mut named = Shader::new(ShaderType::Pixel, vec![9]);
        named.name = Some("PSShared".to_string());
        let shaders = vec![Shader::new(ShaderType::Vertex, vec![1]), named];

        let by_index = ShaderLink::to_index(0);
        assert_eq!(by_index.resolve(&shaders).map(|s| s.ty), Some(ShaderType::Vertex));
        assert!(!by_index.is_import());

        let by_name = ShaderLink::import("PSShared");
        assert!(by_name.is_import());
        assert_eq!(by_name.resolve(&shaders).map(|s| s.bytecode.as_slice()), Some(&[9u8][..]));

        assert!(ShaderLink::to_index(5).resolve(&shaders).is_none());
    }

    #[test]
    fn test_check_links() {
        let mut effect = Effect::new("E");
        let mut pass = Pass::default();
        pass.pipeline.set(ShaderType::Pixel, Some(ShaderLink::to_index(1)));
        effect.techniques.push(Technique {
            name: None,
            passes: vec![pass],
        });
        assert!(effect.check_links(2).is_ok());
        assert!(effect.check_links(1).is_err());
    }
}
