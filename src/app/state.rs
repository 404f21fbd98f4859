// ==========================================
// 工艺路线编排系统 - 应用状态
// ==========================================
// 职责: 管理多物料编排上下文与共享 API 实例
// 红线: 各物料上下文互相独立，切换活动物料不合并状态
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::api::{ExportApi, RoutingWorkspace};
use crate::config::config_manager::ConfigManager;
use crate::config::RoutingConfig;
use crate::domain::operation::CandidateRecommendation;
use crate::repository::{InMemoryRoutingGroupRepository, RoutingGroupRepository};

/// 物料代码统一去除首尾空白后作为工作区键
fn normalize_item_code(item_code: &str) -> String {
    item_code.trim().to_string()
}

/// 应用状态
///
/// 包含共享配置、导出 API 与按物料代码划分的编排工作区
pub struct AppState {
    /// 共享配置（只读）
    config: Arc<RoutingConfig>,

    /// 导出与保存 API
    pub export_api: Arc<ExportApi>,

    /// 物料代码 → 编排工作区
    workspaces: HashMap<String, RoutingWorkspace>,

    /// 当前活动物料
    active_item: Option<String>,
}

impl AppState {
    /// 创建新的 AppState 实例
    ///
    /// # 参数
    /// - config_manager: 已加载的配置
    /// - group_repo: 保存协作方
    pub fn new(config_manager: &ConfigManager, group_repo: Arc<dyn RoutingGroupRepository>) -> Self {
        let config = config_manager.shared();
        info!(locale = %config.locale, history_limit = config.history_limit, "初始化AppState");

        Self {
            config,
            export_api: Arc::new(ExportApi::new(group_repo)),
            workspaces: HashMap::new(),
            active_item: None,
        }
    }

    /// 使用内存保存协作方创建（测试与命令行使用）
    pub fn in_memory(config: RoutingConfig) -> Self {
        Self::new(
            &ConfigManager::new(config),
            Arc::new(InMemoryRoutingGroupRepository::new()),
        )
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// 切换活动物料（不存在时创建空白工作区）
    pub fn activate_item(&mut self, item_code: &str) -> &mut RoutingWorkspace {
        let item_code = normalize_item_code(item_code);
        if self.active_item.as_deref() != Some(item_code.as_str()) {
            info!(from = ?self.active_item, to = %item_code, "切换活动物料");
        }
        self.active_item = Some(item_code.clone());

        let config = Arc::clone(&self.config);
        self.workspaces
            .entry(item_code.clone())
            .or_insert_with(|| RoutingWorkspace::new(item_code, config))
    }

    pub fn active_item(&self) -> Option<&str> {
        self.active_item.as_deref()
    }

    pub fn active(&self) -> Option<&RoutingWorkspace> {
        self.active_item
            .as_deref()
            .and_then(|code| self.workspaces.get(code))
    }

    pub fn active_mut(&mut self) -> Option<&mut RoutingWorkspace> {
        match self.active_item.as_deref() {
            Some(code) => self.workspaces.get_mut(code),
            None => None,
        }
    }

    pub fn workspace(&self, item_code: &str) -> Option<&RoutingWorkspace> {
        self.workspaces.get(&normalize_item_code(item_code))
    }

    /// 已打开的物料代码（升序）
    pub fn item_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.workspaces.keys().cloned().collect();
        codes.sort();
        codes
    }

    /// 关闭物料上下文；若为活动物料则清空活动状态
    pub fn close_item(&mut self, item_code: &str) -> Option<RoutingWorkspace> {
        let item_code = normalize_item_code(item_code);
        let removed = self.workspaces.remove(&item_code)?;
        if self.active_item.as_deref() == Some(item_code.as_str()) {
            self.active_item = None;
        }
        info!(item_code = %item_code, "关闭物料上下文");
        Some(removed)
    }

    /// 按物料代码分发候选推荐（缺少工作区时创建，不改变活动物料）
    pub fn load_candidates(&mut self, records: Vec<CandidateRecommendation>) {
        let mut by_item: HashMap<String, Vec<CandidateRecommendation>> = HashMap::new();
        for mut record in records {
            record.item_code = normalize_item_code(&record.item_code);
            by_item
                .entry(record.item_code.clone())
                .or_default()
                .push(record);
        }

        for (item_code, records) in by_item {
            let config = Arc::clone(&self.config);
            self.workspaces
                .entry(item_code.clone())
                .or_insert_with(|| RoutingWorkspace::new(item_code, config))
                .load_candidates(records);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::operation::{DragPayload, Operation};

    #[test]
    fn test_contexts_are_isolated() {
        let mut state = AppState::in_memory(RoutingConfig::default());

        state.activate_item("ITEM-1").insert(
            &DragPayload::new("ITEM-1", None, Operation::new("CUT", 10)),
            None,
        );
        state.activate_item("ITEM-2");
        assert_eq!(state.active_item(), Some("ITEM-2"));
        assert!(state.active().unwrap().steps().is_empty());
        assert!(!state.active().unwrap().view().can_undo);

        state.activate_item("ITEM-1");
        assert_eq!(state.active().unwrap().steps().len(), 1);
        assert_eq!(state.item_codes(), vec!["ITEM-1".to_string(), "ITEM-2".to_string()]);
    }

    #[test]
    fn test_load_candidates_dispatches_by_item() {
        let mut state = AppState::in_memory(RoutingConfig::default());
        state.load_candidates(vec![
            CandidateRecommendation {
                item_code: "A".to_string(),
                candidate_id: None,
                operations: vec![Operation::new("X", 1)],
            },
            CandidateRecommendation {
                item_code: "B".to_string(),
                candidate_id: Some("C1".to_string()),
                operations: vec![Operation::new("Y", 1), Operation::new("Z", 2)],
            },
        ]);

        assert!(state.active_item().is_none());
        let b = state.workspace("B").unwrap();
        assert_eq!(b.visible_operations(&b.bucket_key(Some("C1")), None).len(), 2);
        let a = state.workspace("A").unwrap();
        assert!(a.visible_operations(&a.bucket_key(Some("C1")), None).is_empty());
    }

    #[test]
    fn test_close_active_item() {
        let mut state = AppState::in_memory(RoutingConfig::default());
        state.activate_item("ITEM-1");
        assert!(state.close_item("ITEM-1").is_some());
        assert!(state.active().is_none());
        assert!(state.active_mut().is_none());
        assert!(state.close_item("ITEM-1").is_none());
    }

    #[test]
    fn test_item_codes_are_trimmed_everywhere() {
        let mut state = AppState::in_memory(RoutingConfig::default());
        state.activate_item(" A ");
        assert_eq!(state.active_item(), Some("A"));
        assert!(state.workspace(" A").is_some());
        assert!(state.workspace("A").is_some());

        state.load_candidates(vec![CandidateRecommendation {
            item_code: "A  ".to_string(),
            candidate_id: None,
            operations: vec![Operation::new("X", 1)],
        }]);
        assert_eq!(state.item_codes(), vec!["A".to_string()]);
        let a = state.workspace("A").unwrap();
        assert_eq!(a.visible_operations(&a.bucket_key(None), None).len(), 1);

        assert!(state.close_item(" A").is_some());
        assert!(state.active().is_none());
        assert!(state.item_codes().is_empty());
    }
}
