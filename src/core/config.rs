//! 配置管理模块
//!
//! 提供工具配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (dist_toolkit.toml)
//!
//! ```toml
//! [logging]
//! level = "info"      # trace, debug, info, warn, error
//! file_output = false
//! log_file = "dist_toolkit.log"
//!
//! [serialization]
//! max_collection_length = 16777216
//! max_string_length = 1048576
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, Result};
use crate::serialization::ReaderOptions;

/// 工具配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,

    /// 反序列化限制
    #[serde(default)]
    pub serialization: SerializationConfig,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 反序列化配置
///
/// 损坏的数据可能声明巨大的数量或长度，这两个上限在分配之前检查。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializationConfig {
    /// 列表 / 字节数组的最大元素数
    #[serde(default = "default_max_collection_length")]
    pub max_collection_length: usize,

    /// 字符串的最大字节数
    #[serde(default = "default_max_string_length")]
    pub max_string_length: usize,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// 默认值函数
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "dist_toolkit.log".to_string() }
fn default_max_collection_length() -> usize { 1 << 24 }
fn default_max_string_length() -> usize { 1 << 20 }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl Default for SerializationConfig {
    fn default() -> Self {
        Self {
            max_collection_length: default_max_collection_length(),
            max_string_length: default_max_string_length(),
        }
    }
}

impl LogLevel {
    /// `EnvFilter` 使用的过滤字符串
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl From<&SerializationConfig> for ReaderOptions {
    fn from(config: &SerializationConfig) -> Self {
        ReaderOptions {
            max_collection_length: config.max_collection_length,
            max_string_length: config.max_string_length,
        }
    }
}

impl Config {
    /// 从配置文件加载
    ///
    /// # 参数
    ///
    /// * `path` - 配置文件路径
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str.clone()))?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--verbose`: 日志级别设为 debug
    /// - `--trace`: 日志级别设为 trace
    /// - `--quiet`: 日志级别设为 warn
    /// - `--log-file <path>`: 同时输出到日志文件
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        if args.iter().any(|a| a == "--verbose") {
            self.logging.level = LogLevel::Debug;
        }

        if args.iter().any(|a| a == "--trace") {
            self.logging.level = LogLevel::Trace;
        }

        if args.iter().any(|a| a == "--quiet") {
            self.logging.level = LogLevel::Warn;
        }

        if let Some(idx) = args.iter().position(|a| a == "--log-file") {
            if let Some(path) = args.get(idx + 1) {
                self.logging.file_output = true;
                self.logging.log_file = path.clone();
            }
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.serialization.max_collection_length == 0 {
            return Err(ConfigError::InvalidValue {
                field: "serialization.max_collection_length".to_string(),
                reason: "Limit must be greater than 0".to_string(),
            }.into());
        }

        if self.serialization.max_string_length == 0 {
            return Err(ConfigError::InvalidValue {
                field: "serialization.max_string_length".to_string(),
                reason: "Limit must be greater than 0".to_string(),
            }.into());
        }

        if self.logging.file_output && self.logging.log_file.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "logging.log_file".to_string(),
                reason: "File output requires a log file path".to_string(),
            }.into());
        }

        Ok(())
    }

    /// 由配置生成读取器选项
    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions::from(&self.serialization)
    }
}
