use crate::core::error::{Result, SerializationError};
use crate::math::{BoundingSphere, Color, Matrix4, Rectangle, Vector2, Vector3, Vector4};

use super::dynamic::DynamicValue;
use super::wire_enum::WireEnum;
use super::{DataSerializable, FourCC};

struct OpenChunk {
    tag: FourCC,
    /// 长度字段在缓冲区中的位置
    size_pos: usize,
}

/// 写入器，构建字节缓冲区。所有定长写入均为小端序。
///
/// 块以 `begin_chunk` / `end_chunk` 成对出现，长度在 `end_chunk` 时回填。
pub struct BinaryWriter {
    buf: Vec<u8>,
    chunks: Vec<OpenChunk>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            chunks: Vec::new(),
        }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
            chunks: Vec::new(),
        }
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    /// 当前打开的块数量
    pub fn depth(&self) -> usize {
        self.chunks.len()
    }

    /// 开始一个块：写入标签并预留长度字段。标签必须是可打印 ASCII。
    pub fn begin_chunk(&mut self, tag: impl Into<FourCC>) -> Result<()> {
        let tag = tag.into();
        if !tag.is_ascii() {
            return Err(SerializationError::InvalidValue {
                field: "chunk tag".to_string(),
                reason: format!("{} is not printable ASCII", tag),
            }
            .into());
        }
        self.write_fourcc(tag);
        let size_pos = self.buf.len();
        self.write_u32(0);
        crate::codec_trace!(%tag, depth = self.chunks.len(), "begin chunk (write)");
        self.chunks.push(OpenChunk { tag, size_pos });
        Ok(())
    }

    /// 结束最内层的块并回填长度
    pub fn end_chunk(&mut self) -> Result<()> {
        let chunk = self.chunks.pop().ok_or(SerializationError::NoOpenChunk)?;
        let start = chunk.size_pos + 4;
        let size = u32::try_from(self.buf.len() - start).map_err(|_| {
            SerializationError::LimitExceeded {
                what: "chunk size",
                value: self.buf.len() - start,
                limit: u32::MAX as usize,
            }
        })?;
        self.patch_u32(chunk.size_pos, size);
        crate::codec_trace!(tag = %chunk.tag, size, "end chunk (write)");
        Ok(())
    }

    /// 取出缓冲区。仍有未关闭的块时失败。
    pub fn finish(self) -> Result<Vec<u8>> {
        if let Some(chunk) = self.chunks.last() {
            return Err(SerializationError::UnclosedChunk { tag: chunk.tag }.into());
        }
        Ok(self.buf)
    }

    /// 写入原始字节（无长度前缀）
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_fourcc(&mut self, tag: FourCC) {
        self.buf.extend_from_slice(&tag.0);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_i8(&mut self, v: i8) {
        self.buf.push(v as u8);
    }

    pub fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// 变长整数：每字节 7 位，低位组在前，最高位为续位标志
    pub fn write_packed_u32(&mut self, v: u32) {
        let mut value = v;
        while value >= 0x80 {
            self.buf.push((value as u8) | 0x80);
            value >>= 7;
        }
        self.buf.push(value as u8);
    }

    /// 有符号变长整数，按 `u32` 位模式编码（负数占 5 字节）
    pub fn write_packed_i32(&mut self, v: i32) {
        self.write_packed_u32(v as u32);
    }

    /// 写入长度或数量
    pub fn write_len(&mut self, len: usize) -> Result<()> {
        let len = u32::try_from(len).map_err(|_| SerializationError::LimitExceeded {
            what: "length",
            value: len,
            limit: u32::MAX as usize,
        })?;
        self.write_packed_u32(len);
        Ok(())
    }

    /// 字符串：变长字节长度 + UTF-8
    pub fn write_string(&mut self, s: &str) -> Result<()> {
        self.write_len(s.len())?;
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    /// 字节数组：变长长度 + 原始字节
    pub fn write_byte_array(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_len(bytes.len())?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// 以枚举的底层宽度写入
    pub fn write_enum<E: WireEnum>(&mut self, value: E) {
        let bits = value.to_bits().to_le_bytes();
        self.buf.extend_from_slice(&bits[..E::WIDTH.bytes()]);
    }

    /// 可空字段：1 字节存在标志，随后是值
    pub fn write_nullable<T: ?Sized>(
        &mut self,
        value: Option<&T>,
        write: impl FnOnce(&mut Self, &T) -> Result<()>,
    ) -> Result<()> {
        match value {
            Some(v) => {
                self.write_bool(true);
                write(self, v)
            }
            None => {
                self.write_bool(false);
                Ok(())
            }
        }
    }

    /// 可空字符串（区分空串与缺失）
    pub fn write_optional_string(&mut self, value: Option<&str>) -> Result<()> {
        self.write_nullable(value, |w, s| w.write_string(s))
    }

    pub fn write_value<T: DataSerializable>(&mut self, value: &T) -> Result<()> {
        value.write(self)
    }

    /// 列表：变长数量 + 元素
    pub fn write_list<T: DataSerializable>(&mut self, items: &[T]) -> Result<()> {
        self.write_list_with(items, |w, item| item.write(w))
    }

    /// 列表，元素使用自定义写入函数
    pub fn write_list_with<T>(
        &mut self,
        items: &[T],
        mut write: impl FnMut(&mut Self, &T) -> Result<()>,
    ) -> Result<()> {
        self.write_len(items.len())?;
        for item in items {
            write(self, item)?;
        }
        Ok(())
    }

    /// 写入动态值（类型码 + 值）
    pub fn write_dynamic(&mut self, value: &DynamicValue) -> Result<()> {
        value.write(self)
    }

    pub fn write_vector2(&mut self, v: &Vector2) {
        self.write_f32(v.x);
        self.write_f32(v.y);
    }

    pub fn write_vector3(&mut self, v: &Vector3) {
        self.write_f32(v.x);
        self.write_f32(v.y);
        self.write_f32(v.z);
    }

    pub fn write_vector4(&mut self, v: &Vector4) {
        self.write_f32(v.x);
        self.write_f32(v.y);
        self.write_f32(v.z);
        self.write_f32(v.w);
    }

    pub fn write_color(&mut self, c: &Color) {
        self.write_f32(c.r);
        self.write_f32(c.g);
        self.write_f32(c.b);
        self.write_f32(c.a);
    }

    /// 矩阵按行优先顺序写入 16 个 f32
    pub fn write_matrix(&mut self, m: &Matrix4) {
        for row in 0..4 {
            for col in 0..4 {
                self.write_f32(m[(row, col)]);
            }
        }
    }

    pub fn write_rectangle(&mut self, r: &Rectangle) {
        self.write_i32(r.x);
        self.write_i32(r.y);
        self.write_i32(r.width);
        self.write_i32(r.height);
    }

    pub fn write_bounding_sphere(&mut self, s: &BoundingSphere) {
        self.write_vector3(&s.center);
        self.write_f32(s.radius);
    }

    fn patch_u32(&mut self, pos: usize, v: u32) {
        self.buf[pos..pos + 4].copy_from_slice(&v.to_le_bytes());
    }
}

impl Default for BinaryWriter {
    fn default() -> Self {
        Self::new()
    }
}
