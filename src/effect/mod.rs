//! 效果数据容器
//!
//! `EffectData` 保存一组编译后的着色器以及引用它们的效果。
//! 线上格式：
//!
//! ```text
//! TKFX { version 0x101, SHDR { shaders }, EFFX { effects } }
//! ```

pub mod parameter;
pub mod shader;
pub mod technique;

pub use parameter::{
    Parameter, ParameterClass, ParameterType, ParameterVariant, ResourceParameter,
    ValueTypeParameter,
};
pub use shader::{ConstantBuffer, FeatureLevel, Semantic, Shader, ShaderType, Signature};
pub use technique::{
    Attribute, CompilerArguments, Effect, Pass, Pipeline, ShaderLink, ShaderMacro,
    StreamOutputElement, Technique, STAGE_COUNT,
};

use crate::core::error::{DistToolkitError, Result};
use crate::serialization::{BinaryReader, BinaryWriter, Container, FourCC};

const SHADERS_CHUNK: FourCC = FourCC::new(*b"SHDR");
const EFFECTS_CHUNK: FourCC = FourCC::new(*b"EFFX");

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EffectData {
    pub shaders: Vec<Shader>,
    pub effects: Vec<Effect>,
}

impl EffectData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn effect(&self, name: &str) -> Option<&Effect> {
        self.effects.iter().find(|e| e.name == name)
    }

    /// 把 `source` 中的着色器和效果合并进来
    ///
    /// 完全相同的着色器只保留一份，`source` 中效果的下标引用会重新映射到
    /// 合并后的位置。效果名称冲突时返回 `Merge` 错误，此时 `self` 不变。
    pub fn merge_from(&mut self, source: &EffectData) -> Result<()> {
        for (i, effect) in source.effects.iter().enumerate() {
            if source.effects[..i].iter().any(|e| e.name == effect.name) {
                return Err(DistToolkitError::Merge(format!(
                    "effect '{}' appears more than once in the merged data",
                    effect.name
                )));
            }
            if self.effect(&effect.name).is_some() {
                return Err(DistToolkitError::Merge(format!(
                    "effect '{}' already exists",
                    effect.name
                )));
            }
            effect.check_links(source.shaders.len())?;
        }

        let mut shaders = self.shaders.clone();
        let remap: Vec<usize> = source
            .shaders
            .iter()
            .map(|shader| match shaders.iter().position(|s| s == shader) {
                Some(existing) => existing,
                None => {
                    shaders.push(shader.clone());
                    shaders.len() - 1
                }
            })
            .collect();

        let mut effects = source.effects.clone();
        for effect in &mut effects {
            for link in effect.links_mut() {
                if let Some(index) = link.shader_index() {
                    link.index = remap[index] as i32;
                }
            }
        }

        let added = shaders.len() - self.shaders.len();
        crate::codec_debug!(
            shaders_added = added,
            shaders_shared = source.shaders.len() - added,
            effects_added = effects.len(),
            "effect data merged"
        );
        self.shaders = shaders;
        self.effects.extend(effects);
        Ok(())
    }
}

impl Container for EffectData {
    const NAME: &'static str = "EffectData";
    const MAGIC: FourCC = FourCC::new(*b"TKFX");
    const VERSION: u32 = 0x101;

    fn write_body(&self, w: &mut BinaryWriter) -> Result<()> {
        w.begin_chunk(SHADERS_CHUNK)?;
        w.write_list(&self.shaders)?;
        w.end_chunk()?;

        w.begin_chunk(EFFECTS_CHUNK)?;
        w.write_list(&self.effects)?;
        w.end_chunk()
    }

    fn read_body(r: &mut BinaryReader<'_>) -> Result<Self> {
        r.begin_chunk(SHADERS_CHUNK)?;
        let shaders: Vec<Shader> = r.read_list()?;
        r.end_chunk()?;
        crate::codec_trace!(count = shaders.len(), "shaders read");

        r.begin_chunk(EFFECTS_CHUNK)?;
        let effects: Vec<Effect> = r.read_list()?;
        r.end_chunk()?;
        crate::codec_trace!(count = effects.len(), "effects read");

        Ok(Self { shaders, effects })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::DynamicValue;

    fn linked_effect(name: &str, stage: ShaderType, index: usize) -> Effect {
        let mut pass = Pass::default();
        pass.pipeline.set(stage, Some(ShaderLink::to_index(index)));
        Effect {
            name: name.to_string(),
            techniques: vec![Technique {
                name: Some("Default".to_string()),
                passes: vec![pass],
            }],
            ..Effect::default()
        }
    }

    #[test]
    fn test_chunk_layout() {
        let data = EffectData::new();
        let bytes = data.save().unwrap();
        assert_eq!(&bytes[0..4], b"TKFX");
        assert_eq!(&bytes[8..12], &0x101u32.to_le_bytes());
        assert_eq!(&bytes[12..16], b"SHDR");
        // SHDR 载荷只有一个空列表计数
        assert_eq!(&bytes[16..20], &1u32.to_le_bytes());
        assert_eq!(&bytes[21..25], b"EFFX");
    }

    #[test]
    fn test_round_trip_with_attributes() {
        let mut data = EffectData::new();
        data.shaders.push(Shader::new(ShaderType::Vertex, vec![7; 16]));
        let mut effect = linked_effect("Sprite", ShaderType::Vertex, 0);
        effect.techniques[0].passes[0]
            .attributes
            .push(Attribute::new("Blend", DynamicValue::from_enum(ShaderType::Pixel)));
        data.effects.push(effect);

        let loaded = EffectData::load(&data.save().unwrap()).unwrap().unwrap();
        assert_eq!(loaded, data);
        let attr = loaded.effects[0].techniques[0].passes[0].attribute("Blend").unwrap();
        assert_eq!(attr.as_enum::<ShaderType>().unwrap(), ShaderType::Pixel);
    }

    #[test]
    fn test_swapped_chunks_are_corrupt() {
        let mut w = BinaryWriter::new();
        w.begin_chunk(EffectData::MAGIC).unwrap();
        w.write_u32(EffectData::VERSION);
        w.begin_chunk(EFFECTS_CHUNK).unwrap();
        w.write_packed_u32(0);
        w.end_chunk().unwrap();
        w.end_chunk().unwrap();
        let bytes = w.finish().unwrap();
        assert!(EffectData::load(&bytes).is_err());
    }

    #[test]
    fn test_merge_deduplicates_and_remaps() {
        let vs = Shader::new(ShaderType::Vertex, vec![1]);
        let ps = Shader::new(ShaderType::Pixel, vec![2]);

        let mut target = EffectData {
            shaders: vec![vs.clone()],
            effects: vec![linked_effect("A", ShaderType::Vertex, 0)],
        };
        let source = EffectData {
            shaders: vec![ps.clone(), vs.clone()],
            effects: vec![linked_effect("B", ShaderType::Pixel, 0), linked_effect("C", ShaderType::Vertex, 1)],
        };

        target.merge_from(&source).unwrap();
        assert_eq!(target.shaders, vec![vs, ps]);
        let b = target.effect("B").unwrap();
        let link = b.techniques[0].passes[0].pipeline.get(ShaderType::Pixel).unwrap();
        assert_eq!(link.index, 1);
        let c = target.effect("C").unwrap();
        let link = c.techniques[0].passes[0].pipeline.get(ShaderType::Vertex).unwrap();
        assert_eq!(link.index, 0);
    }

    #[test]
    fn test_merge_rejects_duplicate_names() {
        let mut target = EffectData {
            shaders: vec![Shader::new(ShaderType::Vertex, vec![1])],
            effects: vec![linked_effect("A", ShaderType::Vertex, 0)],
        };
        let before = target.clone();
        let source = EffectData {
            shaders: vec![Shader::new(ShaderType::Pixel, vec![3])],
            effects: vec![linked_effect("A", ShaderType::Pixel, 0)],
        };
        let err = target.merge_from(&source).unwrap_err();
        assert!(matches!(err, DistToolkitError::Merge(_)));
        assert_eq!(target, before);
    }

    #[test]
    fn test_merge_rejects_duplicates_within_source() {
        let mut target = EffectData::new();
        let source = EffectData {
            shaders: vec![Shader::new(ShaderType::Pixel, vec![3])],
            effects: vec![
                linked_effect("Twice", ShaderType::Pixel, 0),
                linked_effect("Twice", ShaderType::Pixel, 0),
            ],
        };
        let err = target.merge_from(&source).unwrap_err();
        assert!(matches!(err, DistToolkitError::Merge(_)));
        assert_eq!(target, EffectData::new());
    }

    #[test]
    fn test_merge_keeps_import_links() {
        let mut effect = Effect::new("Imported");
        let mut pass = Pass::default();
        pass.pipeline.set(ShaderType::Pixel, Some(ShaderLink::import("PSShared")));
        effect.techniques.push(Technique { name: None, passes: vec![pass] });
        let source = EffectData {
            shaders: vec![],
            effects: vec![effect],
        };
        let mut target = EffectData::new();
        target.merge_from(&source).unwrap();
        let link = target.effects[0].techniques[0].passes[0].pipeline.get(ShaderType::Pixel).unwrap();
        assert!(link.is_import());
    }
}
