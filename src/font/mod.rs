//! 位图字体数据
//!
//! 只支持读取两种既有二进制格式：
//!
//! - MakeSpriteFont 输出（`DXTKfont`），见 [`dxtk`]
//! - AngelCode BMFont 二进制第 3 版（`BMF\x03`），见 [`bmfont`]
//!
//! 两条解码路径互不共享状态，只填充同一个 [`SpriteFontData`]。
//! 不支持写出。

pub mod bitmap;
pub mod bmfont;
pub mod dxtk;

pub use bitmap::BitmapData;

use std::io::Read;
use std::path::Path;

use crate::core::error::{Result, SerializationError};
use crate::math::{Rectangle, Vector2};
use crate::serialization::{BinaryReader, ReaderOptions};

/// 字形
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// Unicode 码位
    pub character: u32,
    /// 在位图中的区域
    pub subrect: Rectangle,
    /// 绘制偏移
    pub offset: Vector2,
    /// 绘制后光标前进的距离
    pub x_advance: f32,
    /// 所在位图在 `SpriteFontData::bitmaps` 中的下标
    pub bitmap_index: i32,
}

/// 字距调整对
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kerning {
    pub first: u32,
    pub second: u32,
    pub offset: f32,
}

/// 字体位图：外部文件或嵌入的像素数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontBitmap {
    External(String),
    Image(BitmapData),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpriteFontData {
    pub font_name: String,
    pub size: f32,
    /// 基线到行顶的距离
    pub base_offset: f32,
    pub line_spacing: f32,
    pub default_character: Option<u32>,
    pub glyphs: Vec<Glyph>,
    pub bitmaps: Vec<FontBitmap>,
    pub kernings: Vec<Kerning>,
}

impl SpriteFontData {
    pub const NAME: &'static str = "SpriteFontData";

    /// 从内存加载，按前 4 字节判断格式，都不匹配时返回 `Ok(None)`
    pub fn load(data: &[u8]) -> Result<Option<Self>> {
        Self::load_with_options(data, ReaderOptions::default())
    }

    pub fn load_with_options(data: &[u8], options: ReaderOptions) -> Result<Option<Self>> {
        let mut r = BinaryReader::with_options(data, options);
        let font = match r.peek_fourcc() {
            Some(tag) if tag == dxtk::MAGIC => dxtk::decode(&mut r)?,
            Some(tag) if tag.as_bytes()[..3] == bmfont::MAGIC_PREFIX => bmfont::decode(&mut r)?,
            other => {
                crate::codec_debug!(found = ?other, "not a sprite font");
                return Ok(None);
            }
        };
        if !r.is_at_end() {
            crate::codec_warn!(remaining = r.remaining(), "trailing bytes after sprite font");
        }
        crate::codec_debug!(
            font = %font.font_name,
            glyphs = font.glyphs.len(),
            bitmaps = font.bitmaps.len(),
            kernings = font.kernings.len(),
            "sprite font loaded"
        );
        Ok(Some(font))
    }

    pub fn load_from_reader<R: Read>(reader: &mut R) -> Result<Option<Self>> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::load(&data)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let data = std::fs::read(path)?;
        Self::load(&data)
    }

    /// 写出未实现
    pub fn save(&self) -> Result<Vec<u8>> {
        Err(SerializationError::Unsupported(format!("{} cannot be saved", Self::NAME)).into())
    }

    pub fn glyph(&self, c: char) -> Option<&Glyph> {
        self.glyphs.iter().find(|g| g.character == c as u32)
    }

    /// 查找字形，找不到时退回默认字符
    pub fn glyph_or_default(&self, c: char) -> Option<&Glyph> {
        self.glyph(c).or_else(|| {
            let fallback = self.default_character?;
            self.glyphs.iter().find(|g| g.character == fallback)
        })
    }

    /// 字距调整量，没有对应条目时为 0
    pub fn kerning(&self, first: char, second: char) -> f32 {
        self.kernings
            .iter()
            .find(|k| k.first == first as u32 && k.second == second as u32)
            .map_or(0.0, |k| k.offset)
    }

    /// 测量文本占用的宽高
    ///
    /// `\n` 换行，`\r` 忽略，没有字形也没有默认字符的字符不占宽度。
    pub fn measure(&self, text: &str) -> Vector2 {
        let mut width = 0.0f32;
        let mut x = 0.0f32;
        let mut lines = 0usize;
        let mut previous: Option<char> = None;

        for c in text.chars() {
            if lines == 0 {
                lines = 1;
            }
            match c {
                '\r' => continue,
                '\n' => {
                    width = width.max(x);
                    x = 0.0;
                    lines += 1;
                    previous = None;
                }
                _ => {
                    if let Some(glyph) = self.glyph_or_default(c) {
                        if let Some(p) = previous {
                            x += self.kerning(p, c);
                        }
                        x += glyph.x_advance;
                    }
                    previous = Some(c);
                }
            }
        }
        width = width.max(x);
        Vector2::new(width, lines as f32 * self.line_spacing)
    }
}
