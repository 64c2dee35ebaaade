use crate::core::error::{Result, SerializationError};
use crate::math::{BoundingSphere, Color, Matrix4, Rectangle, Vector2, Vector3, Vector4};

use super::dynamic::DynamicValue;
use super::wire_enum::WireEnum;
use super::{DataSerializable, FourCC};

/// 反序列化限制
///
/// 数量和长度在分配之前与上限比较，防止损坏数据触发巨大分配。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    pub max_collection_length: usize,
    pub max_string_length: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            max_collection_length: 1 << 24,
            max_string_length: 1 << 20,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenChunk {
    tag: FourCC,
    end: usize,
}

/// 字节切片上的读取游标。所有定长读取均为小端序。
///
/// 打开的块限制了可读范围：块内读取不能越过块尾。
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
    chunks: Vec<OpenChunk>,
    options: ReaderOptions,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_options(data, ReaderOptions::default())
    }

    pub fn with_options(data: &'a [u8], options: ReaderOptions) -> Self {
        Self {
            data,
            pos: 0,
            chunks: Vec::new(),
            options,
        }
    }

    /// 当前字节位置
    pub fn position(&self) -> usize {
        self.pos
    }

    /// 当前可读范围内剩余的字节数
    pub fn remaining(&self) -> usize {
        self.limit().saturating_sub(self.pos)
    }

    /// 当前可读范围是否已读完
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.limit()
    }

    /// 当前打开的块数量
    pub fn depth(&self) -> usize {
        self.chunks.len()
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// 查看下一个 4 字节标签，不移动位置
    pub fn peek_fourcc(&self) -> Option<FourCC> {
        if self.remaining() < 4 {
            return None;
        }
        let mut tag = [0u8; 4];
        tag.copy_from_slice(&self.data[self.pos..self.pos + 4]);
        Some(FourCC(tag))
    }

    /// 开始读取一个块，标签不符时返回 `InvalidChunk`
    pub fn begin_chunk(&mut self, tag: impl Into<FourCC>) -> Result<()> {
        let expected = tag.into();
        let offset = self.pos;
        let found = self.read_fourcc()?;
        if found != expected {
            return Err(SerializationError::InvalidChunk {
                expected,
                found,
                offset,
            }
            .into());
        }

        let size = self.read_u32()? as usize;
        let limit = self.limit();
        if size > limit - self.pos {
            return Err(SerializationError::CorruptChunk {
                tag: expected,
                offset,
                size,
                limit,
            }
            .into());
        }

        crate::codec_trace!(tag = %expected, size, depth = self.chunks.len(), "begin chunk (read)");
        self.chunks.push(OpenChunk {
            tag: expected,
            end: self.pos + size,
        });
        Ok(())
    }

    /// 结束最内层的块，块内容必须恰好读完
    pub fn end_chunk(&mut self) -> Result<()> {
        let chunk = self.chunks.pop().ok_or(SerializationError::NoOpenChunk)?;
        if self.pos != chunk.end {
            return Err(SerializationError::ChunkSizeMismatch {
                tag: chunk.tag,
                expected_end: chunk.end,
                actual: self.pos,
            }
            .into());
        }
        crate::codec_trace!(tag = %chunk.tag, "end chunk (read)");
        Ok(())
    }

    /// 跳过整个块
    pub fn skip_chunk(&mut self, tag: impl Into<FourCC>) -> Result<()> {
        self.begin_chunk(tag)?;
        if let Some(chunk) = self.chunks.last() {
            self.pos = chunk.end;
        }
        self.end_chunk()
    }

    /// 跳过 `n` 个字节
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// 读取 `n` 个原始字节（不复制）
    pub fn read_raw(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_raw(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_fourcc(&mut self) -> Result<FourCC> {
        Ok(FourCC(self.read_array::<4>()?))
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// 读取变长整数（最多 5 字节）
    pub fn read_packed_u32(&mut self) -> Result<u32> {
        let start = self.pos;
        let mut result: u32 = 0;
        let mut shift = 0;
        loop {
            let byte = self.read_u8()?;
            // 第 5 个字节只剩 4 个有效位，且不能再有续位
            if shift == 28 && (byte & 0xf0) != 0 {
                return Err(SerializationError::InvalidPackedInt { offset: start }.into());
            }
            result |= ((byte & 0x7f) as u32) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    pub fn read_packed_i32(&mut self) -> Result<i32> {
        Ok(self.read_packed_u32()? as i32)
    }

    /// 读取长度或数量并检查上限
    pub fn read_len(&mut self, what: &'static str, limit: usize) -> Result<usize> {
        let len = self.read_packed_u32()? as usize;
        if len > limit {
            return Err(SerializationError::LimitExceeded {
                what,
                value: len,
                limit,
            }
            .into());
        }
        Ok(len)
    }

    pub fn read_string(&mut self) -> Result<String> {
        let offset = self.pos;
        let len = self.read_len("string length", self.options.max_string_length)?;
        let bytes = self.read_raw(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|source| SerializationError::InvalidString { offset, source }.into())
    }

    pub fn read_optional_string(&mut self) -> Result<Option<String>> {
        self.read_nullable(|r| r.read_string())
    }

    pub fn read_byte_array(&mut self) -> Result<Vec<u8>> {
        let len = self.read_len("byte array length", self.options.max_collection_length)?;
        Ok(self.read_raw(len)?.to_vec())
    }

    /// 以枚举的底层宽度读取
    pub fn read_enum<E: WireEnum>(&mut self) -> Result<E> {
        let width = E::WIDTH.bytes();
        let mut bits = [0u8; 8];
        bits[..width].copy_from_slice(self.read_raw(width)?);
        let value = u64::from_le_bytes(bits);
        E::from_bits(value).ok_or_else(|| {
            SerializationError::InvalidEnum {
                name: E::NAME,
                value,
            }
            .into()
        })
    }

    /// 可空字段：先读 1 字节存在标志
    pub fn read_nullable<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<Option<T>> {
        if self.read_bool()? {
            Ok(Some(read(self)?))
        } else {
            Ok(None)
        }
    }

    pub fn read_value<T: DataSerializable>(&mut self) -> Result<T> {
        T::read(self)
    }

    pub fn read_list<T: DataSerializable>(&mut self) -> Result<Vec<T>> {
        self.read_list_with(|r| T::read(r))
    }

    /// 列表，元素使用自定义读取函数
    pub fn read_list_with<T>(
        &mut self,
        mut read: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let count = self.read_len("list count", self.options.max_collection_length)?;
        // 每个元素至少 1 字节，容量不会超过剩余数据
        let mut items = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            items.push(read(self)?);
        }
        Ok(items)
    }

    pub fn read_dynamic(&mut self) -> Result<DynamicValue> {
        DynamicValue::read(self)
    }

    pub fn read_vector2(&mut self) -> Result<Vector2> {
        Ok(Vector2::new(self.read_f32()?, self.read_f32()?))
    }

    pub fn read_vector3(&mut self) -> Result<Vector3> {
        Ok(Vector3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    pub fn read_vector4(&mut self) -> Result<Vector4> {
        Ok(Vector4::new(
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ))
    }

    pub fn read_color(&mut self) -> Result<Color> {
        Ok(Color::new(
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ))
    }

    /// 按行优先顺序读取 16 个 f32
    pub fn read_matrix(&mut self) -> Result<Matrix4> {
        let mut m = Matrix4::zeros();
        for row in 0..4 {
            for col in 0..4 {
                m[(row, col)] = self.read_f32()?;
            }
        }
        Ok(m)
    }

    pub fn read_rectangle(&mut self) -> Result<Rectangle> {
        Ok(Rectangle::new(
            self.read_i32()?,
            self.read_i32()?,
            self.read_i32()?,
            self.read_i32()?,
        ))
    }

    pub fn read_bounding_sphere(&mut self) -> Result<BoundingSphere> {
        let center = self.read_vector3()?;
        let radius = self.read_f32()?;
        Ok(BoundingSphere::new(center, radius))
    }

    /// 按 C 风格读取以 0 结尾的字符串（BMFont 使用）
    pub fn read_cstring(&mut self) -> Result<String> {
        let offset = self.pos;
        let limit = self.limit();
        let rest = &self.data[self.pos..limit];
        let len = rest.iter().position(|&b| b == 0).ok_or(SerializationError::UnexpectedEof {
            offset,
            need: rest.len() + 1,
            have: rest.len(),
        })?;
        let bytes = self.read_raw(len)?;
        self.skip(1)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|source| SerializationError::InvalidString { offset, source }.into())
    }

    /// 在当前位置创建一个只覆盖接下来 `len` 字节的子读取器，并跳过这些字节
    pub fn sub_reader(&mut self, len: usize) -> Result<BinaryReader<'a>> {
        let bytes = self.read_raw(len)?;
        Ok(BinaryReader::with_options(bytes, self.options))
    }

    fn limit(&self) -> usize {
        self.chunks.last().map(|c| c.end).unwrap_or(self.data.len())
    }

    fn ensure(&self, n: usize) -> Result<()> {
        let limit = self.limit();
        if self.pos + n > limit {
            return Err(SerializationError::UnexpectedEof {
                offset: self.pos,
                need: n,
                have: limit.saturating_sub(self.pos),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::BinaryWriter;

    fn packed_round_trip(value: i32) -> (i32, usize) {
        let mut w = BinaryWriter::new();
        w.write_packed_i32(value);
        let bytes = w.finish().unwrap();
        let mut r = BinaryReader::new(&bytes);
        (r.read_packed_i32().unwrap(), bytes.len())
    }

    #[test]
    fn test_packed_int_representative_values() {
        for value in [0, 1, 63, 127, 128, 300, 16_383, 16_384, 1 << 21, i32::MAX, -1, i32::MIN] {
            let (decoded, _) = packed_round_trip(value);
            assert_eq!(decoded, value);
        }
        let (_, small) = packed_round_trip(5);
        let (_, large) = packed_round_trip(i32::MAX);
        assert!(small < large);
    }

    #[test]
    fn test_packed_int_overflow_rejected() {
        let bytes = [0xff, 0xff, 0xff, 0xff, 0x1f];
        let mut r = BinaryReader::new(&bytes);
        assert!(matches!(
            r.read_packed_u32().unwrap_err().as_serialization(),
            Some(SerializationError::InvalidPackedInt { offset: 0 })
        ));
    }

    #[test]
    fn test_nested_chunks_round_trip() {
        let mut w = BinaryWriter::new();
        w.begin_chunk(*b"AAAA").unwrap();
        w.write_u8(7);
        w.begin_chunk(*b"BBBB").unwrap();
        w.write_string("inner").unwrap();
        w.end_chunk().unwrap();
        w.end_chunk().unwrap();
        let bytes = w.finish().unwrap();

        let mut r = BinaryReader::new(&bytes);
        assert_eq!(r.peek_fourcc(), Some(FourCC::new(*b"AAAA")));
        r.begin_chunk(*b"AAAA").unwrap();
        assert_eq!(r.read_u8().unwrap(), 7);
        r.begin_chunk(*b"BBBB").unwrap();
        assert_eq!(r.depth(), 2);
        assert_eq!(r.read_string().unwrap(), "inner");
        r.end_chunk().unwrap();
        r.end_chunk().unwrap();
        assert!(r.is_at_end());
        assert!(matches!(
            r.end_chunk().unwrap_err().as_serialization(),
            Some(SerializationError::NoOpenChunk)
        ));
    }

    #[test]
    fn test_wrong_chunk_tag_reports_expected() {
        let mut w = BinaryWriter::new();
        w.begin_chunk(*b"MATL").unwrap();
        w.end_chunk().unwrap();
        let bytes = w.finish().unwrap();

        let mut r = BinaryReader::new(&bytes);
        match r.begin_chunk(*b"TEXS").unwrap_err().as_serialization() {
            Some(SerializationError::InvalidChunk { expected, found, offset }) => {
                assert_eq!(*expected, FourCC::new(*b"TEXS"));
                assert_eq!(*found, FourCC::new(*b"MATL"));
                assert_eq!(*offset, 0);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_partially_consumed_chunk_fails() {
        let mut w = BinaryWriter::new();
        w.begin_chunk(*b"DATA").unwrap();
        w.write_u32(1);
        w.write_u32(2);
        w.end_chunk().unwrap();
        let bytes = w.finish().unwrap();

        let mut r = BinaryReader::new(&bytes);
        r.begin_chunk(*b"DATA").unwrap();
        r.read_u32().unwrap();
        assert!(matches!(
            r.end_chunk().unwrap_err().as_serialization(),
            Some(SerializationError::ChunkSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_reads_cannot_cross_chunk_end() {
        let mut w = BinaryWriter::new();
        w.begin_chunk(*b"TINY").unwrap();
        w.write_u8(1);
        w.end_chunk().unwrap();
        w.write_u32(99);
        let bytes = w.finish().unwrap();

        let mut r = BinaryReader::new(&bytes);
        r.begin_chunk(*b"TINY").unwrap();
        assert!(r.read_u32().is_err());
    }

    #[test]
    fn test_corrupt_chunk_size() {
        let mut bytes = b"HUGE".to_vec();
        bytes.extend_from_slice(&1000u32.to_le_bytes());
        bytes.push(0);
        let mut r = BinaryReader::new(&bytes);
        assert!(matches!(
            r.begin_chunk(*b"HUGE").unwrap_err().as_serialization(),
            Some(SerializationError::CorruptChunk { size: 1000, .. })
        ));
    }

    #[test]
    fn test_skip_chunk() {
        let mut w = BinaryWriter::new();
        w.begin_chunk(*b"SKIP").unwrap();
        w.write_u64(42);
        w.end_chunk().unwrap();
        w.write_u8(9);
        let bytes = w.finish().unwrap();

        let mut r = BinaryReader::new(&bytes);
        r.skip_chunk(*b"SKIP").unwrap();
        assert_eq!(r.read_u8().unwrap(), 9);
    }

    #[test]
    fn test_nullable_string_round_trip() {
        let mut w = BinaryWriter::new();
        w.write_optional_string(None).unwrap();
        w.write_optional_string(Some("")).unwrap();
        w.write_optional_string(Some("name")).unwrap();
        let bytes = w.finish().unwrap();

        let mut r = BinaryReader::new(&bytes);
        assert_eq!(r.read_optional_string().unwrap(), None);
        assert_eq!(r.read_optional_string().unwrap(), Some(String::new()));
        assert_eq!(r.read_optional_string().unwrap(), Some("name".to_string()));
    }

    #[test]
    fn test_string_limit() {
        let mut w = BinaryWriter::new();
        w.write_string("too long").unwrap();
        let bytes = w.finish().unwrap();

        let options = ReaderOptions {
            max_string_length: 4,
            ..ReaderOptions::default()
        };
        let mut r = BinaryReader::with_options(&bytes, options);
        assert!(matches!(
            r.read_string().unwrap_err().as_serialization(),
            Some(SerializationError::LimitExceeded { value: 8, limit: 4, .. })
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let bytes = [2, 0xc3, 0x28];
        let mut r = BinaryReader::new(&bytes);
        assert!(matches!(
            r.read_string().unwrap_err().as_serialization(),
            Some(SerializationError::InvalidString { .. })
        ));
    }

    #[test]
    fn test_matrix_row_major() {
        let mut m = Matrix4::identity();
        m[(0, 3)] = 5.0;
        let mut w = BinaryWriter::new();
        w.write_matrix(&m);
        let bytes = w.finish().unwrap();
        // 第一行第四个元素位于偏移 12
        assert_eq!(f32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]), 5.0);

        let mut r = BinaryReader::new(&bytes);
        assert_eq!(r.read_matrix().unwrap(), m);
    }

    #[test]
    fn test_cstring() {
        let bytes = b"Arial\0rest";
        let mut r = BinaryReader::new(bytes);
        assert_eq!(r.read_cstring().unwrap(), "Arial");
        assert_eq!(r.remaining(), 4);
    }
}
