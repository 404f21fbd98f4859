// ==========================================
// 工艺路线编排系统 - 引擎层
// ==========================================
// 职责: 编排状态模型与只读投影算法
// - 推荐工序桶（默认 / 自定义 / 隐藏叠加）
// - 时间轴排序器 + 撤销/重做历史
// - 路线矩阵组合检测
// - 导出列解析
// 红线: 引擎内不做 I/O，不阻塞，所有调用同步完成
// ==========================================

pub mod bucket;
pub mod export_resolver;
pub mod history;
pub mod matrix_detector;
pub mod sequencer;
pub mod session;

// 重导出核心引擎
pub use bucket::{
    CustomOperationForm, EditSession, FormValidationError, OperationOrigin,
    RecommendationBuckets, StaleEditPolicy, VisibleOperation,
};
pub use export_resolver::{
    ExportResolver, RegistrationTier, ResolutionConfig, SourceRegistry,
    DEFAULT_REGISTRATION_ORDER,
};
pub use history::{HistoryEntry, TimelineHistory};
pub use matrix_detector::MatrixDetector;
pub use sequencer::{
    drop_index_for_offset, SequentialStepIdGenerator, StepIdGenerator, TimelineSequencer,
    UuidStepIdGenerator,
};
pub use session::RoutingSession;
