//! 核心功能模块
//!
//! 本模块提供工具包的基础功能：日志系统、配置管理和错误处理。
//! 这些模块独立于具体的数据格式。
//!
//! # 模块组织
//!
//! - `log`：日志系统，基于 tracing
//! - `config`：配置管理，支持从 TOML 文件加载
//! - `error`：错误处理，定义统一的错误类型

pub mod config;
pub mod error;
pub mod log;

// 重新导出常用类型，方便使用
pub use config::Config;
pub use error::{DistToolkitError, Result, SerializationError};
