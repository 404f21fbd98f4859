// ==========================================
// 工艺路线编排系统 - 配置层
// ==========================================
// 职责: 系统配置管理（历史上限、拖拽间距、导出兜底列、登记顺序等）
// 存储: JSON 文件
// ==========================================

pub mod config_manager;
pub mod routing_config;

// 重导出核心配置管理器
pub use config_manager::{config_keys, default_config_path, ConfigManager};
pub use routing_config::{RoutingConfig, DEFAULT_FALLBACK_COLUMNS};
