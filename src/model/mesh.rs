//! 网格、顶点缓冲区与索引缓冲区

use crate::core::error::{Result, SerializationError};
use crate::format::PixelFormat;
use crate::math::BoundingSphere;
use crate::serialization::{BinaryReader, BinaryWriter, DataSerializable};

use super::property::PropertyCollection;

/// 缓冲区中的一段：缓冲区槽位 + 起始元素 + 元素数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferRange {
    pub slot: i32,
    pub start: i32,
    pub count: i32,
}

impl BufferRange {
    pub fn new(slot: i32, start: i32, count: i32) -> Self {
        Self { slot, start, count }
    }

    /// 是否落在 `slot_count` 个缓冲区、每个 `len_of(slot)` 个元素之内
    fn fits(&self, slot_count: usize, len_of: impl Fn(usize) -> usize) -> bool {
        let (Ok(slot), Ok(start), Ok(count)) = (
            usize::try_from(self.slot),
            usize::try_from(self.start),
            usize::try_from(self.count),
        ) else {
            return false;
        };
        slot < slot_count && start + count <= len_of(slot)
    }
}

impl DataSerializable for BufferRange {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_packed_i32(self.slot);
        w.write_packed_i32(self.start);
        w.write_packed_i32(self.count);
        Ok(())
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            slot: r.read_packed_i32()?,
            start: r.read_packed_i32()?,
            count: r.read_packed_i32()?,
        })
    }
}

/// 顶点布局中的一个元素
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexElement {
    pub semantic_name: String,
    pub semantic_index: i32,
    pub format: PixelFormat,
    pub aligned_byte_offset: i32,
}

impl VertexElement {
    pub fn new(semantic_name: &str, semantic_index: i32, format: PixelFormat, offset: i32) -> Self {
        Self {
            semantic_name: semantic_name.to_string(),
            semantic_index,
            format,
            aligned_byte_offset: offset,
        }
    }
}

impl DataSerializable for VertexElement {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_string(&self.semantic_name)?;
        w.write_packed_i32(self.semantic_index);
        self.format.write(w)?;
        w.write_packed_i32(self.aligned_byte_offset);
        Ok(())
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            semantic_name: r.read_string()?,
            semantic_index: r.read_packed_i32()?,
            format: PixelFormat::read(r)?,
            aligned_byte_offset: r.read_packed_i32()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexBuffer {
    pub layout: Vec<VertexElement>,
    pub count: i32,
    pub buffer: Vec<u8>,
}

impl VertexBuffer {
    /// 由布局推算的顶点步长，布局含未知格式时返回 `None`
    pub fn stride(&self) -> Option<usize> {
        self.layout.iter().try_fold(0usize, |stride, e| {
            let end = e.aligned_byte_offset.max(0) as usize + e.format.size_in_bytes()?;
            Some(stride.max(end))
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.count.max(0) as usize
    }
}

impl DataSerializable for VertexBuffer {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_list(&self.layout)?;
        w.write_packed_i32(self.count);
        w.write_byte_array(&self.buffer)
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            layout: r.read_list()?,
            count: r.read_packed_i32()?,
            buffer: r.read_byte_array()?,
        })
    }
}

/// 索引缓冲区，16 / 32 位由字节数与索引数推出
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexBuffer {
    pub count: i32,
    pub buffer: Vec<u8>,
}

impl IndexBuffer {
    pub fn from_u16(indices: &[u16]) -> Self {
        Self {
            count: indices.len() as i32,
            buffer: bytemuck::cast_slice(indices).to_vec(),
        }
    }

    pub fn from_u32(indices: &[u32]) -> Self {
        Self {
            count: indices.len() as i32,
            buffer: bytemuck::cast_slice(indices).to_vec(),
        }
    }

    pub fn index_count(&self) -> usize {
        self.count.max(0) as usize
    }

    pub fn is_32bit(&self) -> bool {
        self.count > 0 && self.buffer.len() == self.index_count() * 4
    }

    /// 展开为 32 位索引
    pub fn indices(&self) -> Result<Vec<u32>> {
        let count = self.index_count();
        if self.is_32bit() {
            Ok(self
                .buffer
                .chunks_exact(4)
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect())
        } else if self.buffer.len() == count * 2 {
            Ok(self
                .buffer
                .chunks_exact(2)
                .map(|b| u16::from_le_bytes([b[0], b[1]]) as u32)
                .collect())
        } else {
            Err(SerializationError::InvalidValue {
                field: "IndexBuffer.buffer".to_string(),
                reason: format!("{} bytes for {} indices", self.buffer.len(), count),
            }
            .into())
        }
    }
}

impl DataSerializable for IndexBuffer {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_packed_i32(self.count);
        w.write_byte_array(&self.buffer)
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            count: r.read_packed_i32()?,
            buffer: r.read_byte_array()?,
        })
    }
}

/// 网格中使用同一材质绘制的一部分
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshPart {
    /// 材质下标，`-1` 表示无材质
    pub material_index: i32,
    pub index_buffer_range: BufferRange,
    pub vertex_buffer_range: BufferRange,
    pub properties: PropertyCollection,
}

impl DataSerializable for MeshPart {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_packed_i32(self.material_index);
        self.index_buffer_range.write(w)?;
        self.vertex_buffer_range.write(w)?;
        self.properties.write(w)
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            material_index: r.read_packed_i32()?,
            index_buffer_range: BufferRange::read(r)?,
            vertex_buffer_range: BufferRange::read(r)?,
            properties: PropertyCollection::read(r)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub name: String,
    /// 挂接的骨骼下标，`-1` 表示无
    pub parent_bone_index: i32,
    pub bounding_sphere: BoundingSphere,
    pub vertex_buffers: Vec<VertexBuffer>,
    pub index_buffers: Vec<IndexBuffer>,
    pub mesh_parts: Vec<MeshPart>,
    pub properties: PropertyCollection,
}

impl Mesh {
    /// 检查网格部分引用的缓冲区范围和材质下标
    pub fn validate(&self, bone_count: usize, material_count: usize) -> Result<()> {
        let err = |field: String, reason: String| -> Result<()> {
            Err(SerializationError::InvalidValue { field, reason }.into())
        };

        if self.parent_bone_index != -1
            && usize::try_from(self.parent_bone_index).map_or(true, |i| i >= bone_count)
        {
            return err(
                format!("{}.parent_bone_index", self.name),
                format!("{} outside 0..{}", self.parent_bone_index, bone_count),
            );
        }

        for (i, part) in self.mesh_parts.iter().enumerate() {
            if part.material_index != -1
                && usize::try_from(part.material_index).map_or(true, |m| m >= material_count)
            {
                return err(
                    format!("{}.mesh_parts[{}].material_index", self.name, i),
                    format!("{} outside 0..{}", part.material_index, material_count),
                );
            }
            let ib = &part.index_buffer_range;
            if !ib.fits(self.index_buffers.len(), |s| self.index_buffers[s].index_count()) {
                return err(
                    format!("{}.mesh_parts[{}].index_buffer_range", self.name, i),
                    format!("{:?} exceeds the index buffers", ib),
                );
            }
            let vb = &part.vertex_buffer_range;
            if !vb.fits(self.vertex_buffers.len(), |s| self.vertex_buffers[s].vertex_count()) {
                return err(
                    format!("{}.mesh_parts[{}].vertex_buffer_range", self.name, i),
                    format!("{:?} exceeds the vertex buffers", vb),
                );
            }
        }
        Ok(())
    }
}

impl DataSerializable for Mesh {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_string(&self.name)?;
        w.write_packed_i32(self.parent_bone_index);
        w.write_bounding_sphere(&self.bounding_sphere);
        w.write_list(&self.vertex_buffers)?;
        w.write_list(&self.index_buffers)?;
        w.write_list(&self.mesh_parts)?;
        self.properties.write(w)
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            name: r.read_string()?,
            parent_bone_index: r.read_packed_i32()?,
            bounding_sphere: r.read_bounding_sphere()?,
            vertex_buffers: r.read_list()?,
            index_buffers: r.read_list()?,
            mesh_parts: r.read_list()?,
            properties: PropertyCollection::read(r)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_mesh() -> Mesh {
        let layout = vec![
            VertexElement::new("POSITION", 0, PixelFormat::R32G32B32_FLOAT, 0),
            VertexElement::new("TEXCOORD", 0, PixelFormat::R32G32_FLOAT, 12),
        ];
        Mesh {
            name: "Quad".to_string(),
            parent_bone_index: 0,
            vertex_buffers: vec![VertexBuffer {
                layout,
                count: 4,
                buffer: vec![0; 4 * 20],
            }],
            index_buffers: vec![IndexBuffer::from_u16(&[0, 1, 2, 2, 1, 3])],
            mesh_parts: vec![MeshPart {
                material_index: 0,
                index_buffer_range: BufferRange::new(0, 0, 6),
                vertex_buffer_range: BufferRange::new(0, 0, 4),
                properties: PropertyCollection::new(),
            }],
            ..Mesh::default()
        }
    }

    #[test]
    fn test_index_width_derived_from_size() {
        let short = IndexBuffer::from_u16(&[1, 2, 3]);
        assert!(!short.is_32bit());
        assert_eq!(short.indices().unwrap(), vec![1, 2, 3]);

        let long = IndexBuffer::from_u32(&[70000, 1]);
        assert!(long.is_32bit());
        assert_eq!(long.indices().unwrap(), vec![70000, 1]);

        let broken = IndexBuffer {
            count: 2,
            buffer: vec![0; 3],
        };
        assert!(broken.indices().is_err());
    }

    #[test]
    fn test_stride_from_layout() {
        let mesh = quad_mesh();
        assert_eq!(mesh.vertex_buffers[0].stride(), Some(20));
    }

    #[test]
    fn test_mesh_round_trip() {
        let mut mesh = quad_mesh();
        mesh.properties.set("LOD", 0);
        let mut w = BinaryWriter::new();
        mesh.write(&mut w).unwrap();
        let bytes = w.finish().unwrap();
        let mut r = BinaryReader::new(&bytes);
        assert_eq!(Mesh::read(&mut r).unwrap(), mesh);
        assert!(r.is_at_end());
    }

    #[test]
    fn test_validate_ranges() {
        let mesh = quad_mesh();
        assert!(mesh.validate(1, 1).is_ok());
        assert!(mesh.validate(0, 1).is_err());
        assert!(mesh.validate(1, 0).is_err());

        let mut bad = quad_mesh();
        bad.mesh_parts[0].index_buffer_range = BufferRange::new(0, 4, 6);
        assert!(bad.validate(1, 1).is_err());

        let mut bad = quad_mesh();
        bad.mesh_parts[0].vertex_buffer_range = BufferRange::new(1, 0, 1);
        assert!(bad.validate(1, 1).is_err());
    }
}
