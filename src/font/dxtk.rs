//! MakeSpriteFont 二进制格式
//!
//! ```text
//! "DXTK" "font"
//! u32 glyph_count
//! glyph_count × { u32 character, i32 left, top, right, bottom,
//!                 f32 x_offset, y_offset, x_advance }
//! f32 line_spacing
//! u32 default_character
//! u32 width, height, dxgi_format, stride, rows
//! stride × rows 字节像素
//! ```
//!
//! 所有整数为小端定长。

use crate::core::error::{Result, SerializationError};
use crate::format::PixelFormat;
use crate::math::{Rectangle, Vector2};
use crate::serialization::{BinaryReader, FourCC};

use super::{BitmapData, FontBitmap, Glyph, SpriteFontData};

pub const MAGIC: FourCC = FourCC::new(*b"DXTK");
pub const SUB_MAGIC: FourCC = FourCC::new(*b"font");

const GLYPH_SIZE: usize = 32;

/// 从 `DXTK` 处开始解码
pub fn decode(r: &mut BinaryReader<'_>) -> Result<SpriteFontData> {
    r.read_fourcc()?;
    let sub = r.read_fourcc()?;
    if sub != SUB_MAGIC {
        return Err(SerializationError::InvalidMagic {
            expected: b"DXTKfont".to_vec(),
            found: [MAGIC.as_bytes().as_slice(), sub.as_bytes().as_slice()].concat(),
        }
        .into());
    }

    let glyph_count = r.read_u32()? as usize;
    let limit = r.options().max_collection_length.min(r.remaining() / GLYPH_SIZE);
    if glyph_count > limit {
        return Err(SerializationError::LimitExceeded {
            what: "glyph count",
            value: glyph_count,
            limit,
        }
        .into());
    }

    let mut glyphs = Vec::with_capacity(glyph_count);
    for _ in 0..glyph_count {
        let character = r.read_u32()?;
        let subrect = Rectangle::from_ltrb(r.read_i32()?, r.read_i32()?, r.read_i32()?, r.read_i32()?);
        let offset = Vector2::new(r.read_f32()?, r.read_f32()?);
        let x_advance = r.read_f32()?;
        glyphs.push(Glyph {
            character,
            subrect,
            offset,
            x_advance: offset.x + subrect.width as f32 + x_advance,
            bitmap_index: 0,
        });
    }
    crate::codec_trace!(count = glyphs.len(), "DXTK glyphs read");

    let line_spacing = r.read_f32()?;
    let default_character = match r.read_u32()? {
        0 => None,
        c => Some(c),
    };

    let width = r.read_u32()?;
    let height = r.read_u32()?;
    let format = PixelFormat(r.read_u32()?);
    let pitch = r.read_u32()?;
    let rows = r.read_u32()?;
    let size = (pitch as usize)
        .checked_mul(rows as usize)
        .filter(|&n| n <= r.remaining())
        .ok_or(SerializationError::UnexpectedEof {
            offset: r.position(),
            need: (pitch as usize).saturating_mul(rows as usize),
            have: r.remaining(),
        })?;
    let pixels = r.read_raw(size)?.to_vec();
    crate::codec_trace!(width, height, format = %format, "DXTK texture read");

    Ok(SpriteFontData {
        font_name: String::new(),
        size: line_spacing,
        base_offset: 0.0,
        line_spacing,
        default_character,
        glyphs,
        bitmaps: vec![FontBitmap::Image(BitmapData {
            width,
            height,
            format,
            pitch,
            rows,
            pixels,
        })],
        kernings: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(b"DXTKfont");
        b.extend_from_slice(&1u32.to_le_bytes());
        b.extend_from_slice(&('A' as u32).to_le_bytes());
        for v in [2i32, 3, 10, 15] {
            b.extend_from_slice(&v.to_le_bytes());
        }
        for v in [1.0f32, 0.5, 2.0] {
            b.extend_from_slice(&v.to_le_bytes());
        }
        b.extend_from_slice(&16.0f32.to_le_bytes());
        b.extend_from_slice(&('?' as u32).to_le_bytes());
        for v in [2u32, 1, PixelFormat::A8_UNORM.0, 2, 1] {
            b.extend_from_slice(&v.to_le_bytes());
        }
        b.extend_from_slice(&[0x00, 0xff]);
        b
    }

    #[test]
    fn test_decode() {
        let bytes = sample();
        let font = decode(&mut BinaryReader::new(&bytes)).unwrap();
        assert_eq!(font.glyphs.len(), 1);
        let glyph = &font.glyphs[0];
        assert_eq!(glyph.subrect, Rectangle::new(2, 3, 8, 12));
        // 1.0 + 8 + 2.0
        assert_eq!(glyph.x_advance, 11.0);
        assert_eq!(font.line_spacing, 16.0);
        assert_eq!(font.default_character, Some('?' as u32));
        let FontBitmap::Image(bitmap) = &font.bitmaps[0] else {
            panic!("expected embedded bitmap");
        };
        assert_eq!(bitmap.pixels, vec![0x00, 0xff]);
    }

    #[test]
    fn test_bad_sub_magic() {
        let mut bytes = sample();
        bytes[4..8].copy_from_slice(b"fnt!");
        let err = decode(&mut BinaryReader::new(&bytes)).unwrap_err();
        assert!(matches!(
            err.as_serialization(),
            Some(SerializationError::InvalidMagic { .. })
        ));
    }

    #[test]
    fn test_truncated_pixels() {
        let bytes = sample();
        assert!(decode(&mut BinaryReader::new(&bytes[..bytes.len() - 1])).is_err());
    }

    #[test]
    fn test_absurd_glyph_count() {
        let mut bytes = sample();
        bytes[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(decode(&mut BinaryReader::new(&bytes)).is_err());
    }
}
