// ==========================================
// 工艺路线编排系统 - 核心库
// ==========================================
// 职责: 工艺路线编排（推荐桶 / 时间轴 / 撤销重做）
//       路线矩阵检测与导出数据合成
// 系统定位: 决策支持系统 (人工最终控制权)
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 编排状态与投影算法
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 导出层 - 序列化协作方
pub mod export;

// 保存协作方接口
pub mod repository;

// 配置层 - 系统配置
pub mod config;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 多物料上下文
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ExportFormat, HistoryAction, MappingType, MatrixSource};

// 领域实体
pub use domain::{
    BucketKey, CandidateRecommendation, DragPayload, ExportDataset, MappingRow, MatrixCombo,
    MatrixFilter, Operation, OperationKey, ProcessGroup, SaveGroupRequest, TimelineStep,
};

// 引擎
pub use engine::{
    ExportResolver, MatrixDetector, RecommendationBuckets, ResolutionConfig, RoutingSession,
    TimelineHistory, TimelineSequencer,
};

// API
pub use api::{ApiError, ApiResult, ExportApi, RoutingWorkspace, TimelineView};

// 配置
pub use config::{ConfigManager, RoutingConfig};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "工艺路线编排系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(!APP_NAME.is_empty());
    }
}
