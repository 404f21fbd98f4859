// ==========================================
// 工艺路线编排系统 - API 层
// ==========================================
// 职责: 面向宿主界面的同步门面，返回只读视图
// 说明: 仅保存协作方调用为异步
// ==========================================

pub mod error;
pub mod export_api;
pub mod routing_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use export_api::ExportApi;
pub use routing_api::{RoutingWorkspace, TimelineUpdate, TimelineView};
