// ==========================================
// 工艺路线编排系统 - 保存协作方接口层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 工艺路线组的保存/查询接口，屏蔽存储细节
// ==========================================

pub mod error;
pub mod routing_group_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use routing_group_repo::{InMemoryRoutingGroupRepository, RoutingGroupRepository};
