// ==========================================
// 工艺路线编排系统 - 应用层
// ==========================================
// 职责: 宿主集成，持有多物料编排上下文
// ==========================================

pub mod state;

// 重导出
pub use state::AppState;
