//! AngelCode BMFont 二进制格式（第 3 版）
//!
//! 文件头 `BMF` + 版本字节，随后是若干块，每块为
//! `u8 类型, u32 长度, 载荷`：
//!
//! | 类型 | 内容 |
//! |------|------|
//! | 1 | info：字号、标志、字符集、拉伸、抗锯齿、内边距、间距、描边、字体名 |
//! | 2 | common：行高、基线、纹理尺寸、页数、标志、通道 |
//! | 3 | 页面文件名（以 0 结尾的字符串） |
//! | 4 | 字符，每个 20 字节 |
//! | 5 | 字距调整对，每个 10 字节 |
//!
//! 未知类型的块被跳过。

use crate::core::error::{Result, SerializationError};
use crate::math::{Rectangle, Vector2};
use crate::serialization::BinaryReader;

use super::{FontBitmap, Glyph, Kerning, SpriteFontData};

pub const MAGIC_PREFIX: [u8; 3] = *b"BMF";
pub const VERSION: u8 = 3;

const BLOCK_INFO: u8 = 1;
const BLOCK_COMMON: u8 = 2;
const BLOCK_PAGES: u8 = 3;
const BLOCK_CHARS: u8 = 4;
const BLOCK_KERNING: u8 = 5;

const CHAR_SIZE: usize = 20;
const KERNING_SIZE: usize = 10;

/// info 块中除字体名以外的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InfoBlock {
    pub font_size: i16,
    pub flags: u8,
    pub charset: u8,
    pub stretch_h: u16,
    pub antialiasing: u8,
    pub padding: [u8; 4],
    pub spacing: [u8; 2],
    pub outline: u8,
}

/// common 块
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommonBlock {
    pub line_height: u16,
    pub base: u16,
    pub scale_w: u16,
    pub scale_h: u16,
    pub pages: u16,
    pub flags: u8,
    pub channels: [u8; 4],
}

fn read_info(r: &mut BinaryReader<'_>) -> Result<(InfoBlock, String)> {
    let info = InfoBlock {
        font_size: r.read_i16()?,
        flags: r.read_u8()?,
        charset: r.read_u8()?,
        stretch_h: r.read_u16()?,
        antialiasing: r.read_u8()?,
        padding: [r.read_u8()?, r.read_u8()?, r.read_u8()?, r.read_u8()?],
        spacing: [r.read_u8()?, r.read_u8()?],
        outline: r.read_u8()?,
    };
    let name = r.read_cstring()?;
    Ok((info, name))
}

fn read_common(r: &mut BinaryReader<'_>) -> Result<CommonBlock> {
    Ok(CommonBlock {
        line_height: r.read_u16()?,
        base: r.read_u16()?,
        scale_w: r.read_u16()?,
        scale_h: r.read_u16()?,
        pages: r.read_u16()?,
        flags: r.read_u8()?,
        channels: [r.read_u8()?, r.read_u8()?, r.read_u8()?, r.read_u8()?],
    })
}

fn read_glyph(r: &mut BinaryReader<'_>) -> Result<Glyph> {
    let character = r.read_u32()?;
    let subrect = Rectangle::new(
        r.read_u16()? as i32,
        r.read_u16()? as i32,
        r.read_u16()? as i32,
        r.read_u16()? as i32,
    );
    let offset = Vector2::new(r.read_i16()? as f32, r.read_i16()? as f32);
    let x_advance = r.read_i16()? as f32;
    let page = r.read_u8()?;
    let _channel = r.read_u8()?;
    Ok(Glyph {
        character,
        subrect,
        offset,
        x_advance,
        bitmap_index: page as i32,
    })
}

fn read_kerning(r: &mut BinaryReader<'_>) -> Result<Kerning> {
    Ok(Kerning {
        first: r.read_u32()?,
        second: r.read_u32()?,
        offset: r.read_i16()? as f32,
    })
}

/// 把定长记录块读成列表，块长度必须是记录长度的整数倍
fn read_records<T>(
    block: &mut BinaryReader<'_>,
    record_size: usize,
    what: &'static str,
    mut read: impl FnMut(&mut BinaryReader<'_>) -> Result<T>,
) -> Result<Vec<T>> {
    let len = block.remaining();
    if len % record_size != 0 {
        return Err(SerializationError::InvalidValue {
            field: what.to_string(),
            reason: format!("block size {} is not a multiple of {}", len, record_size),
        }
        .into());
    }
    let count = len / record_size;
    let limit = block.options().max_collection_length;
    if count > limit {
        return Err(SerializationError::LimitExceeded {
            what,
            value: count,
            limit,
        }
        .into());
    }
    (0..count).map(|_| read(block)).collect()
}

/// 从 `BMF` 处开始解码
pub fn decode(r: &mut BinaryReader<'_>) -> Result<SpriteFontData> {
    r.skip(MAGIC_PREFIX.len())?;
    let version = r.read_u8()?;
    if version != VERSION {
        return Err(SerializationError::VersionMismatch {
            container: "BMFont",
            found: version as u32,
            expected: VERSION as u32,
        }
        .into());
    }

    let mut font = SpriteFontData::default();
    while !r.is_at_end() {
        let block_type = r.read_u8()?;
        let size = r.read_u32()? as usize;
        let mut block = r.sub_reader(size)?;
        crate::codec_trace!(block_type, size, "BMFont block");

        match block_type {
            BLOCK_INFO => {
                let (info, name) = read_info(&mut block)?;
                font.font_name = name;
                font.size = (info.font_size as f32).abs();
            }
            BLOCK_COMMON => {
                let common = read_common(&mut block)?;
                font.line_spacing = common.line_height as f32;
                font.base_offset = common.base as f32;
            }
            BLOCK_PAGES => {
                while !block.is_at_end() {
                    font.bitmaps.push(FontBitmap::External(block.read_cstring()?));
                }
            }
            BLOCK_CHARS => {
                font.glyphs = read_records(&mut block, CHAR_SIZE, "BMFont chars", read_glyph)?;
            }
            BLOCK_KERNING => {
                font.kernings = read_records(&mut block, KERNING_SIZE, "BMFont kerning pairs", read_kerning)?;
            }
            other => {
                crate::codec_debug!(block_type = other, size, "skipping unknown BMFont block");
            }
        }
    }

    if let Some(glyph) = font
        .glyphs
        .iter()
        .find(|g| g.bitmap_index as usize >= font.bitmaps.len())
    {
        crate::codec_warn!(
            character = glyph.character,
            page = glyph.bitmap_index,
            pages = font.bitmaps.len(),
            "glyph refers to a missing page"
        );
    }
    Ok(font)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(b: &mut Vec<u8>, ty: u8, payload: &[u8]) {
        b.push(ty);
        b.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        b.extend_from_slice(payload);
    }

    fn sample() -> Vec<u8> {
        let mut b = b"BMF\x03".to_vec();

        let mut info = Vec::new();
        info.extend_from_slice(&(-24i16).to_le_bytes());
        info.extend_from_slice(&[0b0000_0011, 0]);
        info.extend_from_slice(&100u16.to_le_bytes());
        info.extend_from_slice(&[1, 0, 0, 0, 0, 1, 1, 0]);
        info.extend_from_slice(b"Arial\0");
        block(&mut b, BLOCK_INFO, &info);

        let mut common = Vec::new();
        for v in [32u16, 26, 256, 256, 1] {
            common.extend_from_slice(&v.to_le_bytes());
        }
        common.extend_from_slice(&[0, 1, 0, 0, 0]);
        block(&mut b, BLOCK_COMMON, &common);

        block(&mut b, BLOCK_PAGES, b"arial_0.png\0");

        // 未知块
        block(&mut b, 9, &[1, 2, 3]);

        let mut chars = Vec::new();
        chars.extend_from_slice(&('A' as u32).to_le_bytes());
        for v in [10u16, 20, 12, 16] {
            chars.extend_from_slice(&v.to_le_bytes());
        }
        for v in [-1i16, 4, 13] {
            chars.extend_from_slice(&v.to_le_bytes());
        }
        chars.extend_from_slice(&[0, 15]);
        block(&mut b, BLOCK_CHARS, &chars);

        let mut kerning = Vec::new();
        kerning.extend_from_slice(&('A' as u32).to_le_bytes());
        kerning.extend_from_slice(&('V' as u32).to_le_bytes());
        kerning.extend_from_slice(&(-2i16).to_le_bytes());
        block(&mut b, BLOCK_KERNING, &kerning);
        b
    }

    #[test]
    fn test_decode() {
        let bytes = sample();
        let font = decode(&mut BinaryReader::new(&bytes)).unwrap();
        assert_eq!(font.font_name, "Arial");
        assert_eq!(font.size, 24.0);
        assert_eq!(font.line_spacing, 32.0);
        assert_eq!(font.base_offset, 26.0);
        assert_eq!(font.bitmaps, vec![FontBitmap::External("arial_0.png".to_string())]);

        let glyph = &font.glyphs[0];
        assert_eq!(glyph.subrect, Rectangle::new(10, 20, 12, 16));
        assert_eq!(glyph.offset, Vector2::new(-1.0, 4.0));
        assert_eq!(glyph.x_advance, 13.0);
        assert_eq!(font.kernings[0].offset, -2.0);
    }

    #[test]
    fn test_wrong_version() {
        let mut bytes = sample();
        bytes[3] = 2;
        let err = decode(&mut BinaryReader::new(&bytes)).unwrap_err();
        assert!(matches!(
            err.as_serialization(),
            Some(SerializationError::VersionMismatch { found: 2, expected: 3, .. })
        ));
    }

    #[test]
    fn test_ragged_chars_block() {
        let mut b = b"BMF\x03".to_vec();
        block(&mut b, BLOCK_CHARS, &[0; 21]);
        assert!(decode(&mut BinaryReader::new(&b)).is_err());
    }

    #[test]
    fn test_block_overrunning_file() {
        let mut b = b"BMF\x03".to_vec();
        b.push(BLOCK_PAGES);
        b.extend_from_slice(&100u32.to_le_bytes());
        b.extend_from_slice(b"x.png\0");
        assert!(decode(&mut BinaryReader::new(&b)).is_err());
    }
}
