//! 错误处理模块
//!
//! 定义了工具包中使用的统一错误类型。
//!
//! # 错误分类
//!
//! - 格式不匹配（最外层魔数不对）不是错误，加载函数返回 `Ok(None)`
//! - 版本不匹配：格式已识别但版本不受支持，致命错误
//! - 块损坏：魔数通过之后发现的块标签或长度不一致，致命错误
//! - 其余 IO、配置、导入错误

use std::fmt;
use std::path::PathBuf;

use crate::serialization::FourCC;

/// 工具包统一的 Result 类型
pub type Result<T> = std::result::Result<T, DistToolkitError>;

/// 工具包的错误类型
#[derive(Debug)]
pub enum DistToolkitError {
    /// 配置错误
    Config(ConfigError),

    /// 序列化 / 反序列化错误
    Serialization(SerializationError),

    /// 模型导入错误
    Import(ImportError),

    /// IO 错误
    Io(std::io::Error),

    /// 日志系统错误
    Log(String),

    /// 效果数据合并冲突
    Merge(String),

    /// 运行时错误
    Runtime(String),
}

/// 配置相关的错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),

    /// 配置文件解析失败
    ParseError(String),

    /// 配置值无效
    InvalidValue { field: String, reason: String },
}

/// 二进制块格式的编解码错误
#[derive(Debug)]
pub enum SerializationError {
    /// 块标签与期望不符
    InvalidChunk {
        expected: FourCC,
        found: FourCC,
        offset: usize,
    },

    /// 块长度超出外层块或数据末尾
    CorruptChunk {
        tag: FourCC,
        offset: usize,
        size: usize,
        limit: usize,
    },

    /// 结束块时读取位置与块尾不一致
    ChunkSizeMismatch {
        tag: FourCC,
        expected_end: usize,
        actual: usize,
    },

    /// 没有打开的块时调用了 `end_chunk`
    NoOpenChunk,

    /// 写入结束时仍有未关闭的块
    UnclosedChunk { tag: FourCC },

    /// 版本号不匹配
    VersionMismatch {
        container: &'static str,
        found: u32,
        expected: u32,
    },

    /// 次级魔数不匹配（格式已识别）
    InvalidMagic { expected: Vec<u8>, found: Vec<u8> },

    /// 数据提前结束
    UnexpectedEof {
        offset: usize,
        need: usize,
        have: usize,
    },

    /// 变长整数编码无效
    InvalidPackedInt { offset: usize },

    /// 字符串不是有效的 UTF-8
    InvalidString {
        offset: usize,
        source: std::string::FromUtf8Error,
    },

    /// 枚举值超出定义范围
    InvalidEnum { name: &'static str, value: u64 },

    /// 动态值类型码未知
    UnknownDynamicType { code: u8, offset: usize },

    /// 动态值类型与期望不符
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// 长度或数量超出配置上限
    LimitExceeded {
        what: &'static str,
        value: usize,
        limit: usize,
    },

    /// 字段值无效
    InvalidValue { field: String, reason: String },

    /// 容器结束后仍有多余数据
    TrailingData { offset: usize, remaining: usize },

    /// 不支持的操作
    Unsupported(String),
}

/// 模型导入相关的错误
#[derive(Debug)]
pub enum ImportError {
    /// 文件不存在
    FileNotFound(PathBuf),

    /// 不支持的文件格式
    UnsupportedFormat(String),

    /// 解析失败
    ParseError(String),

    /// 几何数据无效
    InvalidGeometry(String),
}

impl fmt::Display for DistToolkitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistToolkitError::Config(e) => write!(f, "Configuration error: {}", e),
            DistToolkitError::Serialization(e) => write!(f, "Serialization error: {}", e),
            DistToolkitError::Import(e) => write!(f, "Import error: {}", e),
            DistToolkitError::Io(e) => write!(f, "IO error: {}", e),
            DistToolkitError::Log(msg) => write!(f, "Log error: {}", msg),
            DistToolkitError::Merge(msg) => write!(f, "Merge error: {}", msg),
            DistToolkitError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationError::InvalidChunk { expected, found, offset } => write!(
                f,
                "invalid chunk at offset {:#x}: expected '{}', found '{}'",
                offset, expected, found
            ),
            SerializationError::CorruptChunk { tag, offset, size, limit } => write!(
                f,
                "chunk '{}' at offset {:#x} declares {} bytes, past limit {:#x}",
                tag, offset, size, limit
            ),
            SerializationError::ChunkSizeMismatch { tag, expected_end, actual } => write!(
                f,
                "chunk '{}' should end at {:#x} but stream is at {:#x}",
                tag, expected_end, actual
            ),
            SerializationError::NoOpenChunk => write!(f, "end_chunk called with no open chunk"),
            SerializationError::UnclosedChunk { tag } => {
                write!(f, "chunk '{}' was never closed", tag)
            }
            SerializationError::VersionMismatch { container, found, expected } => write!(
                f,
                "{} version {:#x} is not supported (expected {:#x})",
                container, found, expected
            ),
            SerializationError::InvalidMagic { expected, found } => write!(
                f,
                "invalid magic: expected {:?}, found {:?}",
                String::from_utf8_lossy(expected),
                String::from_utf8_lossy(found)
            ),
            SerializationError::UnexpectedEof { offset, need, have } => write!(
                f,
                "unexpected end of data at offset {:#x} (need {} bytes, have {})",
                offset, need, have
            ),
            SerializationError::InvalidPackedInt { offset } => {
                write!(f, "invalid packed integer at offset {:#x}", offset)
            }
            SerializationError::InvalidString { offset, source } => write!(
                f,
                "string at offset {:#x} is not valid UTF-8: {}",
                offset, source
            ),
            SerializationError::InvalidEnum { name, value } => {
                write!(f, "value {} is not a valid {}", value, name)
            }
            SerializationError::UnknownDynamicType { code, offset } => write!(
                f,
                "unknown dynamic type code {} at offset {:#x}",
                code, offset
            ),
            SerializationError::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            SerializationError::LimitExceeded { what, value, limit } => {
                write!(f, "{} {} exceeds limit {}", what, value, limit)
            }
            SerializationError::InvalidValue { field, reason } => {
                write!(f, "invalid value for '{}': {}", field, reason)
            }
            SerializationError::TrailingData { offset, remaining } => write!(
                f,
                "{} trailing bytes after container end at offset {:#x}",
                remaining, offset
            ),
            SerializationError::Unsupported(msg) => write!(f, "unsupported: {}", msg),
        }
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::FileNotFound(path) => write!(f, "Model file not found: {}", path.display()),
            ImportError::UnsupportedFormat(msg) => write!(f, "Unsupported model format: {}", msg),
            ImportError::ParseError(msg) => write!(f, "Failed to parse model: {}", msg),
            ImportError::InvalidGeometry(msg) => write!(f, "Invalid geometry data: {}", msg),
        }
    }
}

impl std::error::Error for DistToolkitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DistToolkitError::Io(e) => Some(e),
            DistToolkitError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for ImportError {}

impl std::error::Error for SerializationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SerializationError::InvalidString { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl DistToolkitError {
    /// 若为序列化错误则返回其内部值
    pub fn as_serialization(&self) -> Option<&SerializationError> {
        match self {
            DistToolkitError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DistToolkitError {
    fn from(err: std::io::Error) -> Self {
        DistToolkitError::Io(err)
    }
}

impl From<ConfigError> for DistToolkitError {
    fn from(err: ConfigError) -> Self {
        DistToolkitError::Config(err)
    }
}

impl From<SerializationError> for DistToolkitError {
    fn from(err: SerializationError) -> Self {
        DistToolkitError::Serialization(err)
    }
}

impl From<ImportError> for DistToolkitError {
    fn from(err: ImportError) -> Self {
        DistToolkitError::Import(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_mismatch_names_both_versions() {
        let err = SerializationError::VersionMismatch {
            container: "EffectData",
            found: 0x999,
            expected: 0x101,
        };
        let msg = err.to_string();
        assert!(msg.contains("0x999"));
        assert!(msg.contains("0x101"));
    }

    #[test]
    fn test_invalid_chunk_names_expected_tag() {
        let err: DistToolkitError = SerializationError::InvalidChunk {
            expected: FourCC::new(*b"SHDR"),
            found: FourCC::new(*b"XXXX"),
            offset: 12,
        }
        .into();
        assert!(err.to_string().contains("SHDR"));
        assert!(err.as_serialization().is_some());
    }
}
