//! 容器的外层帧格式与加载状态机
//!
//! ```text
//! [magic: 4][size: u32] [version: u32] [body ...]
//! └──────── 外层块 ──────────────────────────────┘
//! ```
//!
//! 加载状态：`Unopened → MagicChecked → VersionChecked → 块序列 → Closed`。
//! 魔数检查失败返回 `Ok(None)`（不是这种格式），之后的任何失败都是致命错误。

use std::io::{Read, Write};
use std::path::Path;

use crate::core::error::{Result, SerializationError};

use super::{BinaryReader, BinaryWriter, FourCC, ReaderOptions};

/// 以魔数 + 版本号标识的根容器
///
/// 主体内容按固定顺序写入，读取时必须以完全相同的顺序读取。
pub trait Container: Sized {
    /// 类型名（用于错误信息）
    const NAME: &'static str;
    /// 4 字节魔数
    const MAGIC: FourCC;
    /// 当前版本，加载时要求完全相等
    const VERSION: u32;

    /// 写入版本号之后的主体
    fn write_body(&self, w: &mut BinaryWriter) -> Result<()>;

    /// 读取版本号之后的主体
    fn read_body(r: &mut BinaryReader<'_>) -> Result<Self>;

    /// 从内存加载，不是这种格式时返回 `Ok(None)`
    fn load(data: &[u8]) -> Result<Option<Self>> {
        load_container(data, ReaderOptions::default())
    }

    /// 从内存加载，使用指定的读取限制
    fn load_with_options(data: &[u8], options: ReaderOptions) -> Result<Option<Self>> {
        load_container(data, options)
    }

    /// 从流加载（读取到流结束）
    fn load_from_reader<R: Read>(reader: &mut R) -> Result<Option<Self>> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::load(&data)
    }

    /// 从文件加载
    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let data = std::fs::read(path)?;
        Self::load(&data)
    }

    /// 序列化到内存
    fn save(&self) -> Result<Vec<u8>> {
        save_container(self)
    }

    /// 序列化到流
    fn save_to_writer<W: Write>(&self, writer: &mut W) -> Result<()> {
        let bytes = self.save()?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// 序列化到文件
    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.save()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// 序列化一个容器
pub fn save_container<T: Container>(value: &T) -> Result<Vec<u8>> {
    let mut w = BinaryWriter::new();
    w.begin_chunk(T::MAGIC)?;
    w.write_u32(T::VERSION);
    value.write_body(&mut w)?;
    w.end_chunk()?;
    let bytes = w.finish()?;
    crate::codec_debug!(container = T::NAME, bytes = bytes.len(), "container saved");
    Ok(bytes)
}

/// 反序列化一个容器
///
/// 前 4 字节不是 `T::MAGIC`（包括数据不足 4 字节）时返回 `Ok(None)`。
pub fn load_container<T: Container>(data: &[u8], options: ReaderOptions) -> Result<Option<T>> {
    load_container_with(data, options, T::read_body)
}

/// 与 [`load_container`] 相同，但主体由 `read_body` 读取
///
/// 用于主体解码需要额外上下文（如材质键注册表）的容器。
pub fn load_container_with<T: Container>(
    data: &[u8],
    options: ReaderOptions,
    read_body: impl FnOnce(&mut BinaryReader<'_>) -> Result<T>,
) -> Result<Option<T>> {
    let mut r = BinaryReader::with_options(data, options);

    // Unopened -> MagicChecked
    if r.peek_fourcc() != Some(T::MAGIC) {
        crate::codec_debug!(container = T::NAME, found = ?r.peek_fourcc(), "magic mismatch, not this format");
        return Ok(None);
    }
    r.begin_chunk(T::MAGIC)?;

    // MagicChecked -> VersionChecked
    let version = r.read_u32()?;
    if version != T::VERSION {
        return Err(SerializationError::VersionMismatch {
            container: T::NAME,
            found: version,
            expected: T::VERSION,
        }
        .into());
    }

    let value = read_body(&mut r)?;
    r.end_chunk()?;

    if !r.is_at_end() {
        return Err(SerializationError::TrailingData {
            offset: r.position(),
            remaining: r.remaining(),
        }
        .into());
    }

    crate::codec_debug!(container = T::NAME, bytes = data.len(), "container loaded");
    Ok(Some(value))
}
