//! 像素 / 顶点元素格式
//!
//! 数值与 `DXGI_FORMAT` 相同。格式集合是开放的（文件里可能出现任何 DXGI 值），
//! 因此用 `u32` 新类型而不是枚举表示，未知值原样保留。

use std::fmt;

use crate::core::error::Result;
use crate::serialization::{BinaryReader, BinaryWriter, DataSerializable};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelFormat(pub u32);

impl PixelFormat {
    pub const UNKNOWN: Self = Self(0);
    pub const R32G32B32A32_FLOAT: Self = Self(2);
    pub const R32G32B32_FLOAT: Self = Self(6);
    pub const R32G32_FLOAT: Self = Self(16);
    pub const R8G8B8A8_UNORM: Self = Self(28);
    pub const R8G8B8A8_UINT: Self = Self(30);
    pub const R32_FLOAT: Self = Self(41);
    pub const R32_UINT: Self = Self(42);
    pub const R16_UINT: Self = Self(57);
    pub const R8_UNORM: Self = Self(61);
    pub const A8_UNORM: Self = Self(65);
    pub const BC1_UNORM: Self = Self(71);
    pub const BC2_UNORM: Self = Self(74);
    pub const BC3_UNORM: Self = Self(77);
    pub const B4G4R4A4_UNORM: Self = Self(115);
    pub const B8G8R8A8_UNORM: Self = Self(87);

    /// 每像素（或每个顶点元素）的字节数，块压缩或未知格式返回 `None`
    pub fn size_in_bytes(&self) -> Option<usize> {
        match *self {
            Self::R32G32B32A32_FLOAT => Some(16),
            Self::R32G32B32_FLOAT => Some(12),
            Self::R32G32_FLOAT => Some(8),
            Self::R8G8B8A8_UNORM | Self::R8G8B8A8_UINT | Self::B8G8R8A8_UNORM => Some(4),
            Self::R32_FLOAT | Self::R32_UINT => Some(4),
            Self::R16_UINT | Self::B4G4R4A4_UNORM => Some(2),
            Self::R8_UNORM | Self::A8_UNORM => Some(1),
            _ => None,
        }
    }

    /// 是否为 BC 块压缩格式
    pub fn is_block_compressed(&self) -> bool {
        matches!(*self, Self::BC1_UNORM | Self::BC2_UNORM | Self::BC3_UNORM)
    }

    pub fn name(&self) -> Option<&'static str> {
        Some(match *self {
            Self::UNKNOWN => "UNKNOWN",
            Self::R32G32B32A32_FLOAT => "R32G32B32A32_FLOAT",
            Self::R32G32B32_FLOAT => "R32G32B32_FLOAT",
            Self::R32G32_FLOAT => "R32G32_FLOAT",
            Self::R8G8B8A8_UNORM => "R8G8B8A8_UNORM",
            Self::R8G8B8A8_UINT => "R8G8B8A8_UINT",
            Self::R32_FLOAT => "R32_FLOAT",
            Self::R32_UINT => "R32_UINT",
            Self::R16_UINT => "R16_UINT",
            Self::R8_UNORM => "R8_UNORM",
            Self::A8_UNORM => "A8_UNORM",
            Self::BC1_UNORM => "BC1_UNORM",
            Self::BC2_UNORM => "BC2_UNORM",
            Self::BC3_UNORM => "BC3_UNORM",
            Self::B4G4R4A4_UNORM => "B4G4R4A4_UNORM",
            Self::B8G8R8A8_UNORM => "B8G8R8A8_UNORM",
            _ => return None,
        })
    }
}

impl fmt::Debug for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "PixelFormat({})", self.0),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl DataSerializable for PixelFormat {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_u32(self.0);
        Ok(())
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self(r.read_u32()?))
    }
}
