//! 日志初始化
//!
//! 安装 `tracing-subscriber` 的 fmt subscriber（`EnvFilter`，默认 `info`，
//! 可由 `RUST_LOG` 覆盖），并桥接 `log` 记录（`serialport` 等依赖使用 `log`）。

use tracing_subscriber::EnvFilter;

/// 以默认级别 `info` 初始化日志
///
/// 重复调用是安全的：只有第一次生效。
pub fn init_logger() {
    init_logger_with("info");
}

/// 以指定的默认过滤指令初始化日志（`RUST_LOG` 优先）
pub fn init_logger_with(default_directives: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    // 只有本次安装成功时才接管 `log` 记录
    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        let _ = tracing_log::LogTracer::init();
    }
}
