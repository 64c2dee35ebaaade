use dist_toolkit::core::SerializationError;
use dist_toolkit::font::{FontBitmap, SpriteFontData};
use dist_toolkit::format::PixelFormat;
use dist_toolkit::math::Vector2;

fn push_u32s(b: &mut Vec<u8>, values: &[u32]) {
    for v in values {
        b.extend_from_slice(&v.to_le_bytes());
    }
}

/// 两个字形、2x2 RGBA 纹理
fn dxtk_font() -> Vec<u8> {
    let mut b = b"DXTKfont".to_vec();
    push_u32s(&mut b, &[2]);
    for (c, left) in [('H', 0i32), ('i', 4)] {
        push_u32s(&mut b, &[c as u32]);
        for v in [left, 0, left + 4, 8] {
            b.extend_from_slice(&v.to_le_bytes());
        }
        for v in [0.0f32, 0.0, 1.0] {
            b.extend_from_slice(&v.to_le_bytes());
        }
    }
    b.extend_from_slice(&10.0f32.to_le_bytes());
    push_u32s(&mut b, &[0]);
    push_u32s(&mut b, &[2, 2, PixelFormat::R8G8B8A8_UNORM.0, 8, 2]);
    b.extend((0..16).map(|i| i as u8 * 16));
    b
}

fn bmfont_block(b: &mut Vec<u8>, ty: u8, payload: &[u8]) {
    b.push(ty);
    b.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    b.extend_from_slice(payload);
}

fn bmfont() -> Vec<u8> {
    let mut b = b"BMF\x03".to_vec();

    let mut info = 18i16.to_le_bytes().to_vec();
    info.extend_from_slice(&[0, 0]);
    info.extend_from_slice(&100u16.to_le_bytes());
    info.extend_from_slice(&[1, 0, 0, 0, 0, 0, 0, 0]);
    info.extend_from_slice(b"Mono\0");
    bmfont_block(&mut b, 1, &info);

    let mut common = Vec::new();
    for v in [20u16, 16, 128, 128, 2] {
        common.extend_from_slice(&v.to_le_bytes());
    }
    common.extend_from_slice(&[0, 0, 0, 0, 0]);
    bmfont_block(&mut b, 2, &common);

    bmfont_block(&mut b, 3, b"mono_0.png\0mono_1.png\0");

    let mut chars = Vec::new();
    for (c, page) in [('a', 0u8), ('b', 1)] {
        chars.extend_from_slice(&(c as u32).to_le_bytes());
        for v in [0u16, 0, 7, 12] {
            chars.extend_from_slice(&v.to_le_bytes());
        }
        for v in [0i16, 2, 8] {
            chars.extend_from_slice(&v.to_le_bytes());
        }
        chars.extend_from_slice(&[page, 15]);
    }
    bmfont_block(&mut b, 4, &chars);

    let mut kerning = Vec::new();
    push_u32s(&mut kerning, &['a' as u32, 'b' as u32]);
    kerning.extend_from_slice(&(-1i16).to_le_bytes());
    bmfont_block(&mut b, 5, &kerning);
    b
}

#[test]
fn loads_makespritefont_output() {
    let font = SpriteFontData::load(&dxtk_font()).unwrap().unwrap();
    assert_eq!(font.glyphs.len(), 2);
    assert_eq!(font.line_spacing, 10.0);
    assert_eq!(font.default_character, None);
    // 0 + 4 + 1
    assert_eq!(font.glyph('i').unwrap().x_advance, 5.0);
    assert_eq!(font.measure("Hi"), Vector2::new(10.0, 10.0));

    let FontBitmap::Image(bitmap) = &font.bitmaps[0] else {
        panic!("expected embedded bitmap");
    };
    let image = bitmap.to_rgba_image().unwrap();
    assert_eq!(image.dimensions(), (2, 2));
    assert_eq!(image.get_pixel(1, 1).0, [192, 208, 224, 240]);
}

#[test]
fn exports_embedded_page_as_png() {
    let font = SpriteFontData::load(&dxtk_font()).unwrap().unwrap();
    let FontBitmap::Image(bitmap) = &font.bitmaps[0] else {
        panic!("expected embedded bitmap");
    };
    let path = std::env::temp_dir().join(format!("dist_toolkit_font_{}.png", std::process::id()));
    bitmap.save_png(&path).unwrap();
    let reloaded = image::open(&path).unwrap().to_rgba8();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(reloaded, bitmap.to_rgba_image().unwrap());
}

#[test]
fn loads_bmfont_binary() {
    let font = SpriteFontData::load(&bmfont()).unwrap().unwrap();
    assert_eq!(font.font_name, "Mono");
    assert_eq!(font.size, 18.0);
    assert_eq!(font.line_spacing, 20.0);
    assert_eq!(font.base_offset, 16.0);
    assert_eq!(
        font.bitmaps,
        vec![
            FontBitmap::External("mono_0.png".to_string()),
            FontBitmap::External("mono_1.png".to_string()),
        ]
    );
    assert_eq!(font.glyph('b').unwrap().bitmap_index, 1);
    assert_eq!(font.kerning('a', 'b'), -1.0);
    assert_eq!(font.measure("ab\nab"), Vector2::new(15.0, 40.0));
}

#[test]
fn other_formats_are_not_fonts() {
    assert!(SpriteFontData::load(b"TKFX\x00\x00\x00\x00").unwrap().is_none());
    assert!(SpriteFontData::load(b"").unwrap().is_none());
}

#[test]
fn unsupported_bmfont_version_is_fatal() {
    let mut bytes = bmfont();
    bytes[3] = 4;
    let err = SpriteFontData::load(&bytes).unwrap_err();
    assert!(matches!(
        err.as_serialization(),
        Some(SerializationError::VersionMismatch { found: 4, .. })
    ));
}

#[test]
fn truncated_fonts_fail() {
    let dxtk = dxtk_font();
    assert!(SpriteFontData::load(&dxtk[..dxtk.len() - 1]).is_err());
    let bmf = bmfont();
    assert!(SpriteFontData::load(&bmf[..bmf.len() - 1]).is_err());
}
