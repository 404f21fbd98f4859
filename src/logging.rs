// ==========================================
// 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// 支持环境变量配置日志级别
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

fn env_filter() -> EnvFilter {
    // 从环境变量读取日志级别，默认为 info
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: info）
///   例如: RUST_LOG=debug 或 RUST_LOG=routing_designer=trace
///
/// # 示例
/// ```no_run
/// use routing_designer::logging;
/// logging::init();
/// ```
pub fn init() {
    // 日志输出到 stderr，stdout 留给导出结果
    fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
}

/// 初始化 JSON 行格式日志（供宿主日志采集）
pub fn init_json() {
    fmt()
        .json()
        .with_env_filter(env_filter())
        .with_current_span(false)
        .with_writer(std::io::stderr)
        .init();
}

/// 初始化测试环境的日志系统
///
/// 使用更详细的日志级别，便于调试；重复调用不会 panic
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
