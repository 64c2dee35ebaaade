//! 嵌入的字体位图

use std::path::Path;

use image::RgbaImage;

use crate::core::error::{DistToolkitError, Result, SerializationError};
use crate::format::PixelFormat;

/// 一张原始像素图
///
/// `rows` 是像素行数（块压缩格式为块行数），每行 `pitch` 字节。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapData {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pitch: u32,
    pub rows: u32,
    pub pixels: Vec<u8>,
}

impl BitmapData {
    /// 转为 RGBA8 图像
    ///
    /// 支持 `R8G8B8A8_UNORM`、`B8G8R8A8_UNORM`、`B4G4R4A4_UNORM`，以及
    /// 作为白色字形透明度的 `A8_UNORM` / `R8_UNORM`。其余格式返回 `Unsupported`。
    pub fn to_rgba_image(&self) -> Result<RgbaImage> {
        let texel_size = match self.format {
            f if f.is_block_compressed() => None,
            f => f.size_in_bytes(),
        };
        let Some(texel_size) = texel_size else {
            return Err(unsupported(self.format));
        };

        let (width, height, pitch) = (self.width as usize, self.height as usize, self.pitch as usize);
        if width == 0 || height == 0 {
            return Ok(RgbaImage::new(self.width, self.height));
        }
        if pitch < width * texel_size || self.pixels.len() < pitch * height {
            return Err(SerializationError::InvalidValue {
                field: "BitmapData.pixels".to_string(),
                reason: format!(
                    "{} bytes cannot hold {}x{} {} with pitch {}",
                    self.pixels.len(),
                    width,
                    height,
                    self.format,
                    pitch
                ),
            }
            .into());
        }

        let convert: fn(&[u8]) -> [u8; 4] = match self.format {
            PixelFormat::R8G8B8A8_UNORM => |p| [p[0], p[1], p[2], p[3]],
            PixelFormat::B8G8R8A8_UNORM => |p| [p[2], p[1], p[0], p[3]],
            PixelFormat::B4G4R4A4_UNORM => |p| {
                let v = u16::from_le_bytes([p[0], p[1]]);
                let expand = |shift: u16| (((v >> shift) & 0xf) as u8) * 17;
                [expand(8), expand(4), expand(0), expand(12)]
            },
            PixelFormat::A8_UNORM | PixelFormat::R8_UNORM => |p| [255, 255, 255, p[0]],
            other => return Err(unsupported(other)),
        };

        let mut rgba = Vec::with_capacity(width * height * 4);
        for row in self.pixels.chunks_exact(pitch).take(height) {
            for texel in row[..width * texel_size].chunks_exact(texel_size) {
                rgba.extend_from_slice(&convert(texel));
            }
        }

        RgbaImage::from_raw(self.width, self.height, rgba)
            .ok_or_else(|| DistToolkitError::Runtime("RGBA buffer size mismatch".to_string()))
    }

    /// 以 PNG 格式写入文件
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.to_rgba_image()?
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| DistToolkitError::Runtime(format!("failed to write {}: {}", path.display(), e)))
    }
}

fn unsupported(format: PixelFormat) -> DistToolkitError {
    SerializationError::Unsupported(format!("bitmap conversion from {}", format)).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_bitmap_with_padding() {
        let bitmap = BitmapData {
            width: 2,
            height: 2,
            format: PixelFormat::A8_UNORM,
            pitch: 4,
            rows: 2,
            pixels: vec![10, 20, 0xee, 0xee, 30, 40, 0xee, 0xee],
        };
        let image = bitmap.to_rgba_image().unwrap();
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.get_pixel(1, 0).0, [255, 255, 255, 20]);
        assert_eq!(image.get_pixel(0, 1).0, [255, 255, 255, 30]);
    }

    #[test]
    fn test_bgra_and_4444() {
        let bgra = BitmapData {
            width: 1,
            height: 1,
            format: PixelFormat::B8G8R8A8_UNORM,
            pitch: 4,
            rows: 1,
            pixels: vec![1, 2, 3, 4],
        };
        assert_eq!(bgra.to_rgba_image().unwrap().get_pixel(0, 0).0, [3, 2, 1, 4]);

        let packed = BitmapData {
            width: 1,
            height: 1,
            format: PixelFormat::B4G4R4A4_UNORM,
            pitch: 2,
            rows: 1,
            pixels: 0xf0a5u16.to_le_bytes().to_vec(),
        };
        // a=f r=0 g=a b=5
        assert_eq!(packed.to_rgba_image().unwrap().get_pixel(0, 0).0, [0, 170, 85, 255]);
    }

    #[test]
    fn test_block_compressed_unsupported() {
        let bitmap = BitmapData {
            width: 4,
            height: 4,
            format: PixelFormat::BC3_UNORM,
            pitch: 16,
            rows: 1,
            pixels: vec![0; 16],
        };
        assert!(matches!(
            bitmap.to_rgba_image().unwrap_err().as_serialization(),
            Some(SerializationError::Unsupported(_))
        ));
    }

    #[test]
    fn test_short_buffer_rejected() {
        let bitmap = BitmapData {
            width: 4,
            height: 4,
            format: PixelFormat::R8G8B8A8_UNORM,
            pitch: 16,
            rows: 4,
            pixels: vec![0; 20],
        };
        assert!(bitmap.to_rgba_image().is_err());
    }
}
