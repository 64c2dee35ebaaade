//! 按底层整数宽度序列化的枚举
//!
//! 枚举总是以声明的底层宽度读写，不会截断成固定宽度。
//! 使用 [`wire_enum!`](crate::wire_enum) 宏同时定义枚举和 [`WireEnum`] 实现。

use super::FourCC;

/// 枚举底层整数宽度（字节数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumWidth {
    W1 = 1,
    W2 = 2,
    W4 = 4,
    W8 = 8,
}

impl EnumWidth {
    /// 由 `size_of::<Repr>()` 得到宽度
    pub const fn from_size(size: usize) -> Self {
        match size {
            1 => EnumWidth::W1,
            2 => EnumWidth::W2,
            4 => EnumWidth::W4,
            8 => EnumWidth::W8,
            _ => panic!("unsupported enum width"),
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(EnumWidth::W1),
            2 => Some(EnumWidth::W2),
            4 => Some(EnumWidth::W4),
            8 => Some(EnumWidth::W8),
            _ => None,
        }
    }

    pub fn bytes(self) -> usize {
        self as usize
    }

    /// 该宽度内有效位的掩码
    pub fn mask(self) -> u64 {
        match self {
            EnumWidth::W8 => u64::MAX,
            w => (1u64 << (w.bytes() * 8)) - 1,
        }
    }
}

/// 可以按底层宽度序列化的枚举
pub trait WireEnum: Copy + Sized + 'static {
    /// 类型名（用于错误信息）
    const NAME: &'static str;
    /// 装箱到动态值时使用的类型标签
    const TAG: FourCC;
    /// 底层整数宽度
    const WIDTH: EnumWidth;

    /// 转为底层整数的位模式（有符号值符号扩展）
    fn to_bits(self) -> u64;

    /// 由位模式还原，未定义的值返回 `None`
    ///
    /// 位模式可以是按宽度截断的，也可以是符号扩展的；超出宽度的其余位
    /// 必须与这两种形式之一一致。
    fn from_bits(bits: u64) -> Option<Self>;
}

/// 定义一个实现 [`WireEnum`] 的枚举
///
/// ```
/// dist_toolkit::wire_enum! {
///     /// 混合模式
///     pub enum BlendMode: u8, tag = b"BLND" {
///         Opaque = 0,
///         Additive = 1,
///     }
/// }
/// ```
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $repr:ident, tag = $tag:literal {
            $( $(#[$vmeta:meta])* $variant:ident = $value:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr($repr)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant = $value ),+
        }

        impl $crate::serialization::WireEnum for $name {
            const NAME: &'static str = stringify!($name);
            const TAG: $crate::serialization::FourCC = $crate::serialization::FourCC::new(*$tag);
            const WIDTH: $crate::serialization::EnumWidth =
                $crate::serialization::EnumWidth::from_size(::std::mem::size_of::<$repr>());

            fn to_bits(self) -> u64 {
                self as $repr as u64
            }

            fn from_bits(bits: u64) -> Option<Self> {
                let value = bits as $repr;
                let extended = value as u64;
                let mask = <Self as $crate::serialization::WireEnum>::WIDTH.mask();
                if bits != extended && bits != extended & mask {
                    return None;
                }
                $(
                    if value == $name::$variant as $repr {
                        return Some($name::$variant);
                    }
                )+
                None
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::wire_enum! {
        enum Small: u8, tag = b"SMAL" {
            A = 0,
            B = 200,
        }
    }

    crate::wire_enum! {
        enum Signed: i32, tag = b"SIGN" {
            Negative = -5,
            Large = 0x7fff_0000,
        }
    }

    #[test]
    fn test_width_follows_repr() {
        assert_eq!(Small::WIDTH, EnumWidth::W1);
        assert_eq!(Signed::WIDTH, EnumWidth::W4);
        assert_eq!(Signed::NAME, "Signed");
    }

    #[test]
    fn test_bits_round_trip() {
        assert_eq!(Small::from_bits(Small::B.to_bits()), Some(Small::B));
        assert_eq!(Small::from_bits(7), None);
        // 负值按 4 字节截断后仍能还原
        let bits = Signed::Negative.to_bits() & 0xffff_ffff;
        assert_eq!(Signed::from_bits(bits), Some(Signed::Negative));
        assert_eq!(Signed::from_bits(0x7fff_0000), Some(Signed::Large));
        assert_eq!(Signed::from_bits(Signed::Negative.to_bits()), Some(Signed::Negative));
    }

    #[test]
    fn test_bits_beyond_width_rejected() {
        // 低 8 位是 B，但高位不为 0
        assert_eq!(Small::from_bits(0x100 | 200), None);
        assert_eq!(Signed::from_bits(0x1_7fff_0000), None);
        assert_eq!(EnumWidth::W2.mask(), 0xffff);
        assert_eq!(EnumWidth::W8.mask(), u64::MAX);
    }
}
