use std::fmt;

/// 4 字节 ASCII 标签，用于魔数和块标识
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// 按小端序解释为整数（BMFont 的 `0x03464D42` 即 "BMF\3"）
    pub const fn as_u32(&self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    pub const fn from_u32(value: u32) -> Self {
        Self(value.to_le_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// 是否全部为可打印 ASCII
    pub fn is_ascii(&self) -> bool {
        self.0.iter().all(|b| b.is_ascii_graphic() || *b == b' ')
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC(\"{}\")", self)
    }
}

impl From<[u8; 4]> for FourCC {
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

impl From<&[u8; 4]> for FourCC {
    fn from(bytes: &[u8; 4]) -> Self {
        Self(*bytes)
    }
}
