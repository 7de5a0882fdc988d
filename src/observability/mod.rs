//! 可观测性
//!
//! 日志写到 stderr，避免与 stdout 上的对话交错；RUST_LOG 优先于配置的默认级别。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 安装全局 subscriber；default_level 解析失败时退回 warn
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
