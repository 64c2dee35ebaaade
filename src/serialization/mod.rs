//! 分块二进制序列化
//!
//! 三层结构：
//! - **块帧**（`writer` / `reader`）：4 字节标签 + 回填长度，可任意嵌套
//! - **原始类型**：定长小端整数、变长整数、字符串、可空字段、枚举、列表
//! - **动态值**（`dynamic`）：类型码 + 值
//!
//! 格式是线性的、非自描述的：读取顺序必须与写入顺序完全一致。
//! 多态的 `Parameter` 家族不写子类型标签，读取方必须事先知道具体类型。

pub mod container;
pub mod dynamic;
pub mod fourcc;
pub mod reader;
pub mod wire_enum;
pub mod writer;

pub use container::{load_container, load_container_with, save_container, Container};
pub use dynamic::{BoxedEnum, DynamicValue, ValueKind};
pub use fourcc::FourCC;
pub use reader::{BinaryReader, ReaderOptions};
pub use wire_enum::{EnumWidth, WireEnum};
pub use writer::BinaryWriter;

use crate::core::error::Result;

/// 可以写入 / 读出分块二进制流的类型
///
/// 写入与读取必须是对称的：`read` 按 `write` 的顺序读取相同的字段。
pub trait DataSerializable: Sized {
    fn write(&self, w: &mut BinaryWriter) -> Result<()>;
    fn read(r: &mut BinaryReader<'_>) -> Result<Self>;
}

impl DataSerializable for String {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_string(self)
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        r.read_string()
    }
}

impl DataSerializable for DynamicValue {
    fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_dynamic(self)
    }

    fn read(r: &mut BinaryReader<'_>) -> Result<Self> {
        r.read_dynamic()
    }
}
