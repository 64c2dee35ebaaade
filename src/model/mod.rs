//! 模型数据容器
//!
//! ```text
//! TKMD { version 0x100, TEXS { textures }, MATL { materials },
//!        BONE { bones }, MESH { meshes }, properties }
//! ```
//!
//! 材质、骨骼、网格之间只用下标相互引用。

pub mod bone;
pub mod import;
pub mod material;
pub mod mesh;
pub mod property;
pub mod vertex;

pub use bone::Bone;
pub use import::{ModelImporter, ObjImporter};
pub use material::{
    BlendMode, Material, MaterialKey, MaterialKeyRegistry, MaterialPropertyCollection,
    MaterialTexture, ShadingMode, TextureAddressMode, TextureOperation, TextureType,
};
pub use mesh::{BufferRange, IndexBuffer, Mesh, MeshPart, VertexBuffer, VertexElement};
pub use property::PropertyCollection;
pub use vertex::Vertex;

use crate::core::error::Result;
use crate::serialization::{
    load_container_with, BinaryReader, BinaryWriter, Container, DataSerializable, FourCC,
    ReaderOptions,
};

const TEXTURES_CHUNK: FourCC = FourCC::new(*b"TEXS");
const MATERIALS_CHUNK: FourCC = FourCC::new(*b"MATL");
const BONES_CHUNK: FourCC = FourCC::new(*b"BONE");
const MESHES_CHUNK: FourCC = FourCC::new(*b"MESH");

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelData {
    /// 嵌入纹理的原始文件内容
    pub textures: Vec<Vec<u8>>,
    pub materials: Vec<Material>,
    pub bones: Vec<Bone>,
    pub meshes: Vec<Mesh>,
    pub properties: PropertyCollection,
}

impl ModelData {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用指定的材质键注册表加载
    pub fn load_with_registry(
        data: &[u8],
        options: ReaderOptions,
        registry: &MaterialKeyRegistry,
    ) -> Result<Option<Self>> {
        load_container_with(data, options, |r| Self::read_body_with(r, registry))
    }

    /// 检查骨骼树以及网格中的下标引用
    pub fn validate(&self) -> Result<()> {
        bone::validate_bones(&self.bones)?;
        for mesh in &self.meshes {
            mesh.validate(self.bones.len(), self.materials.len())?;
        }
        Ok(())
    }

    pub fn root_bones(&self) -> impl Iterator<Item = &Bone> {
        self.bones.iter().filter(|b| b.is_root())
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes
            .iter()
            .flat_map(|m| &m.vertex_buffers)
            .map(VertexBuffer::vertex_count)
            .sum()
    }

    fn read_body_with(r: &mut BinaryReader<'_>, registry: &MaterialKeyRegistry) -> Result<Self> {
        r.begin_chunk(TEXTURES_CHUNK)?;
        let textures = r.read_list_with(|r| r.read_byte_array())?;
        r.end_chunk()?;

        r.begin_chunk(MATERIALS_CHUNK)?;
        let materials = r.read_list_with(|r| Material::read_with(r, registry))?;
        r.end_chunk()?;

        r.begin_chunk(BONES_CHUNK)?;
        let bones: Vec<Bone> = r.read_list()?;
        r.end_chunk()?;

        r.begin_chunk(MESHES_CHUNK)?;
        let meshes: Vec<Mesh> = r.read_list()?;
        r.end_chunk()?;

        let properties = PropertyCollection::read(r)?;
        crate::codec_trace!(
            textures = textures.len(),
            materials = materials.len(),
            bones = bones.len(),
            meshes = meshes.len(),
            "model body read"
        );

        Ok(Self {
            textures,
            materials,
            bones,
            meshes,
            properties,
        })
    }
}

impl Container for ModelData {
    const NAME: &'static str = "ModelData";
    const MAGIC: FourCC = FourCC::new(*b"TKMD");
    const VERSION: u32 = 0x100;

    fn write_body(&self, w: &mut BinaryWriter) -> Result<()> {
        w.begin_chunk(TEXTURES_CHUNK)?;
        w.write_list_with(&self.textures, |w, t| w.write_byte_array(t))?;
        w.end_chunk()?;

        w.begin_chunk(MATERIALS_CHUNK)?;
        w.write_list(&self.materials)?;
        w.end_chunk()?;

        w.begin_chunk(BONES_CHUNK)?;
        w.write_list(&self.bones)?;
        w.end_chunk()?;

        w.begin_chunk(MESHES_CHUNK)?;
        w.write_list(&self.meshes)?;
        w.end_chunk()?;

        self.properties.write(w)
    }

    fn read_body(r: &mut BinaryReader<'_>) -> Result<Self> {
        Self::read_body_with(r, MaterialKeyRegistry::standard())
    }
}
