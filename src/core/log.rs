//! 日志系统模块
//!
//! 基于 `tracing` 提供结构化的日志记录功能。
//! 编解码器在块边界输出 trace 级别日志，加载完成后输出 debug 级别摘要。
//!
//! # 使用示例
//!
//! ```no_run
//! use dist_toolkit::core::{log, config::LogLevel};
//!
//! log::init_logger(LogLevel::Info, false, None);
//! tracing::info!(path = "font.spritefont", "Loading font");
//! ```

use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use super::config::LogLevel;

/// 初始化日志系统
///
/// 必须在程序开始时调用一次。
///
/// # 参数
///
/// * `level` - 日志级别
/// * `file_output` - 是否输出到文件
/// * `log_file_path` - 日志文件路径（可选，默认为 "dist_toolkit.log"）
pub fn init_logger(level: LogLevel, file_output: bool, log_file_path: Option<&str>) {
    let filter = EnvFilter::new(level.as_filter());

    if file_output {
        let log_path = log_file_path.unwrap_or("dist_toolkit.log");
        let path = Path::new(log_path);
        let directory = path.parent().unwrap_or(Path::new("."));
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("dist_toolkit.log");

        // 每天滚动
        let file_appender = RollingFileAppender::new(Rotation::DAILY, directory, filename);

        let console_layer = fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_ansi(true);

        let file_layer = fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .with(file_layer)
            .init();
    } else {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// 编解码器日志 - Trace 级别（块边界）
#[macro_export]
macro_rules! codec_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "dist_toolkit::codec", $($arg)*)
    };
}

/// 编解码器日志 - Debug 级别
#[macro_export]
macro_rules! codec_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "dist_toolkit::codec", $($arg)*)
    };
}

/// 编解码器日志 - Warn 级别
#[macro_export]
macro_rules! codec_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "dist_toolkit::codec", $($arg)*)
    };
}

/// 应用层日志 - Info 级别
#[macro_export]
macro_rules! app_info {
    ($($arg:tt)*) => {
        tracing::info!(target: "dist_toolkit::app", $($arg)*)
    };
}

/// 应用层日志 - Error 级别
#[macro_export]
macro_rules! app_error {
    ($($arg:tt)*) => {
        tracing::error!(target: "dist_toolkit::app", $($arg)*)
    };
}
