// ==========================================
// 工艺路线编排系统 - 工艺路线组保存接口
// ==========================================
// 职责: 定义外部保存协作方接口 + 内存实现
// 红线: Repository 不含业务规则，只做数据存取
// 说明: 引擎同步计算出保存载荷后才调用本接口，引擎内部从不等待 I/O
// ==========================================

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::domain::group::{SaveGroupRequest, SavedGroup};
use crate::repository::error::{RepositoryError, RepositoryResult};

// ==========================================
// RoutingGroupRepository Trait
// ==========================================
// 实现者: InMemoryRoutingGroupRepository（宿主可替换为远程服务）
#[async_trait]
pub trait RoutingGroupRepository: Send + Sync {
    /// 保存工艺路线组
    ///
    /// # 返回
    /// - Ok(SavedGroup): 不透明的组 ID + 保存时间
    /// - Err: 存储失败（引擎状态不受影响）
    async fn save(&self, request: SaveGroupRequest) -> RepositoryResult<SavedGroup>;

    /// 按组 ID 查询已保存载荷
    async fn get(&self, group_id: &str) -> RepositoryResult<Option<SaveGroupRequest>>;

    /// 列出已保存的组（按保存时间升序）
    async fn list(&self) -> RepositoryResult<Vec<SavedGroup>>;
}

// ==========================================
// InMemoryRoutingGroupRepository
// ==========================================
#[derive(Debug, Default)]
pub struct InMemoryRoutingGroupRepository {
    groups: RwLock<HashMap<String, (SavedGroup, SaveGroupRequest)>>,
}

impl InMemoryRoutingGroupRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoutingGroupRepository for InMemoryRoutingGroupRepository {
    async fn save(&self, request: SaveGroupRequest) -> RepositoryResult<SavedGroup> {
        let group_name = request.group_name.trim().to_string();
        if group_name.is_empty() {
            return Err(RepositoryError::FieldValueError {
                field: "groupName".to_string(),
                message: "组名不能为空".to_string(),
            });
        }

        let mut groups = self.groups.write().await;
        if groups.values().any(|(saved, _)| saved.group_name == group_name) {
            return Err(RepositoryError::UniqueConstraintViolation(format!(
                "组名已存在: {}",
                group_name
            )));
        }

        let saved = SavedGroup {
            group_id: Uuid::new_v4().to_string(),
            group_name,
            saved_at: Utc::now(),
        };
        info!(
            group_id = %saved.group_id,
            group_name = %saved.group_name,
            steps = request.steps.len(),
            rows = request.rows.len(),
            "工艺路线组已保存"
        );
        groups.insert(saved.group_id.clone(), (saved.clone(), request));
        Ok(saved)
    }

    async fn get(&self, group_id: &str) -> RepositoryResult<Option<SaveGroupRequest>> {
        let groups = self.groups.read().await;
        Ok(groups.get(group_id).map(|(_, request)| request.clone()))
    }

    async fn list(&self) -> RepositoryResult<Vec<SavedGroup>> {
        let groups = self.groups.read().await;
        let mut saved: Vec<SavedGroup> = groups.values().map(|(s, _)| s.clone()).collect();
        saved.sort_by(|a, b| {
            a.saved_at
                .cmp(&b.saved_at)
                .then_with(|| a.group_name.cmp(&b.group_name))
        });
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::MatrixSource;

    fn request(name: &str) -> SaveGroupRequest {
        SaveGroupRequest {
            group_name: name.to_string(),
            steps: vec![],
            item_codes: vec!["ITEM-1".to_string()],
            rows: vec![],
            columns: vec!["PROC_CD".to_string()],
            matrix: vec![],
            matrix_source: MatrixSource::Detected,
            process_group: None,
        }
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let repo = InMemoryRoutingGroupRepository::new();
        let saved = repo.save(request(" 主线路 ")).await.unwrap();

        assert_eq!(saved.group_name, "主线路");
        let loaded = repo.get(&saved.group_id).await.unwrap().unwrap();
        assert_eq!(loaded.item_codes, vec!["ITEM-1".to_string()]);
        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_and_duplicate_names_rejected() {
        let repo = InMemoryRoutingGroupRepository::new();
        assert!(matches!(
            repo.save(request("  ")).await,
            Err(RepositoryError::FieldValueError { .. })
        ));

        repo.save(request("A")).await.unwrap();
        assert!(matches!(
            repo.save(request("A")).await,
            Err(RepositoryError::UniqueConstraintViolation(_))
        ));
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }
}
