// ==========================================
// 工艺路线编排系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、键
// 红线: 不含状态管理逻辑,不含解析算法
// ==========================================

pub mod group;
pub mod mapping;
pub mod matrix;
pub mod operation;
pub mod step;
pub mod types;

// 重导出核心类型
pub use group::{SaveGroupRequest, SavedGroup};
pub use mapping::{ColumnDef, ExportDataset, ExportRow, MappingRow, ProcessGroup, ResolutionGap};
pub use matrix::{
    ComboKey, MatrixCombo, MatrixDefinition, MatrixField, MatrixFilter, MatrixOption,
    MatrixSummary,
};
pub use operation::{
    BucketKey, CandidateRecommendation, CustomEntry, DragPayload, Operation, OperationKey,
};
pub use step::{
    RoutingCodesPatch, StepSummary, StepTimesPatch, TimelineMetrics, TimelineStep,
};
pub use types::{ExportFormat, HistoryAction, MappingType, MatrixSource};
