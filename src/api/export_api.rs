// ==========================================
// 工艺路线编排系统 - 导出与保存 API
// ==========================================
// 职责: 导出预览、序列化、工艺路线组保存
// 说明: 保存载荷在同步阶段组装完毕，之后才交给异步保存协作方
// ==========================================

use std::sync::Arc;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::routing_api::RoutingWorkspace;
use crate::domain::group::{SaveGroupRequest, SavedGroup};
use crate::domain::mapping::ExportDataset;
use crate::domain::types::ExportFormat;
use crate::engine::export_resolver::ResolutionConfig;
use crate::export::serializer::serializer_for;
use crate::i18n::t;
use crate::repository::routing_group_repo::RoutingGroupRepository;

// ==========================================
// ExportApi
// ==========================================

/// 导出与保存 API
///
/// 职责：
/// 1. 导出数据集预览
/// 2. 按格式序列化
/// 3. 组装并提交保存请求
pub struct ExportApi {
    group_repo: Arc<dyn RoutingGroupRepository>,
}

impl ExportApi {
    pub fn new(group_repo: Arc<dyn RoutingGroupRepository>) -> Self {
        Self { group_repo }
    }

    /// 导出预览（纯计算）
    pub fn preview(&self, workspace: &RoutingWorkspace, config: &ResolutionConfig) -> ExportDataset {
        workspace.resolve_export(config)
    }

    /// 序列化数据集
    ///
    /// # 返回
    /// - Ok(bytes): 序列化结果
    /// - Err(ApiError::ExportError): 格式不支持或写出失败
    pub fn serialize(&self, dataset: &ExportDataset, format: ExportFormat) -> ApiResult<Vec<u8>> {
        let serializer = serializer_for(format)?;
        let bytes = serializer.serialize(dataset)?;
        info!(
            format = %format,
            rows = dataset.rows.len(),
            columns = dataset.columns.len(),
            "导出完成"
        );
        Ok(bytes)
    }

    /// 预览 + 序列化
    pub fn export(
        &self,
        workspace: &RoutingWorkspace,
        config: &ResolutionConfig,
        format: ExportFormat,
    ) -> ApiResult<Vec<u8>> {
        let dataset = self.preview(workspace, config);
        if !dataset.gaps.is_empty() {
            warn!(
                item_code = %workspace.item_code(),
                gaps = dataset.gaps.len(),
                "导出存在必填列空值"
            );
        }
        self.serialize(&dataset, format)
    }

    /// 组装保存请求
    ///
    /// # 校验规则
    /// 1. 组名去空白后不能为空
    /// 2. 时间轴不能为空
    ///
    /// # 返回
    /// 组名、步骤摘要、物料代码（按首次出现去重）、导出行列、矩阵汇总、工序组
    pub fn build_save_request(
        &self,
        workspace: &RoutingWorkspace,
        group_name: &str,
        config: &ResolutionConfig,
    ) -> ApiResult<SaveGroupRequest> {
        let group_name = group_name.trim();
        if group_name.is_empty() {
            return Err(ApiError::ValidationError {
                field: "groupName".to_string(),
                message: t("group.name_required"),
            });
        }

        let steps = workspace.steps();
        if steps.is_empty() {
            return Err(ApiError::BusinessRuleViolation(t("group.empty_timeline")));
        }

        let mut item_codes: Vec<String> = Vec::new();
        for step in steps {
            if !item_codes.iter().any(|c| c == &step.item_code) {
                item_codes.push(step.item_code.clone());
            }
        }

        let dataset = workspace.resolve_export(config);
        let matrix = workspace.matrix_summary();

        Ok(SaveGroupRequest {
            group_name: group_name.to_string(),
            steps: steps.iter().map(|s| s.summary()).collect(),
            item_codes,
            rows: dataset.rows,
            columns: dataset.columns,
            matrix: matrix.combos,
            matrix_source: matrix.source,
            process_group: config.process_group.clone(),
        })
    }

    /// 提交保存请求给保存协作方
    ///
    /// 失败时引擎状态不受影响，调用方可直接重试
    pub async fn save_group(&self, request: SaveGroupRequest) -> ApiResult<SavedGroup> {
        let group_name = request.group_name.clone();
        match self.group_repo.save(request).await {
            Ok(saved) => {
                info!(group_id = %saved.group_id, group_name = %saved.group_name, "保存工艺路线组");
                Ok(saved)
            }
            Err(e) => {
                warn!(group_name = %group_name, error = %e, "保存工艺路线组失败");
                Err(e.into())
            }
        }
    }

    /// 查询已保存的组
    pub async fn list_groups(&self) -> ApiResult<Vec<SavedGroup>> {
        Ok(self.group_repo.list().await?)
    }

    /// 读取已保存的载荷
    pub async fn load_group(&self, group_id: &str) -> ApiResult<SaveGroupRequest> {
        self.group_repo
            .get(group_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("RoutingGroup(id={})不存在", group_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoutingConfig;
    use crate::domain::operation::{DragPayload, Operation};
    use crate::domain::types::MatrixSource;
    use crate::repository::InMemoryRoutingGroupRepository;

    fn api() -> ExportApi {
        ExportApi::new(Arc::new(InMemoryRoutingGroupRepository::new()))
    }

    fn workspace() -> RoutingWorkspace {
        let mut ws = RoutingWorkspace::new("ITEM-1", Arc::new(RoutingConfig::default()));
        ws.insert(
            &DragPayload::new("ITEM-1", None, Operation::new("CUT", 10)),
            None,
        );
        ws.insert(
            &DragPayload::new("ITEM-2", None, Operation::new("WELD", 20)),
            None,
        );
        ws.insert(
            &DragPayload::new("ITEM-1", None, Operation::new("PACK", 30)),
            None,
        );
        ws
    }

    #[test]
    fn test_blank_group_name_rejected() {
        let ws = workspace();
        let err = api()
            .build_save_request(&ws, "   ", &ws.resolution_config())
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError { field, .. } if field == "groupName"));
    }

    #[test]
    fn test_empty_timeline_rejected() {
        let ws = RoutingWorkspace::new("ITEM-1", Arc::new(RoutingConfig::default()));
        let result = api().build_save_request(&ws, "G1", &ws.resolution_config());
        assert!(matches!(result, Err(ApiError::BusinessRuleViolation(_))));
    }

    #[test]
    fn test_save_request_shape() {
        let ws = workspace();
        let request = api()
            .build_save_request(&ws, " 主线路 ", &ws.resolution_config())
            .unwrap();

        assert_eq!(request.group_name, "主线路");
        assert_eq!(request.steps.len(), 3);
        assert_eq!(request.item_codes, vec!["ITEM-1".to_string(), "ITEM-2".to_string()]);
        assert_eq!(request.rows.len(), 3);
        assert_eq!(request.matrix_source, MatrixSource::Detected);
        assert_eq!(request.matrix.len(), 1);
        assert_eq!(request.matrix[0].count, 3);
    }

    #[test]
    fn test_unsupported_format_is_export_error() {
        let ws = workspace();
        let result = api().export(&ws, &ws.resolution_config(), ExportFormat::Xml);
        assert!(matches!(result, Err(ApiError::ExportError(_))));
    }

    #[tokio::test]
    async fn test_save_and_load_group() {
        let api = api();
        let ws = workspace();
        let request = api
            .build_save_request(&ws, "G1", &ws.resolution_config())
            .unwrap();

        let saved = api.save_group(request.clone()).await.unwrap();
        assert_eq!(saved.group_name, "G1");
        assert_eq!(api.load_group(&saved.group_id).await.unwrap(), request);
        assert_eq!(api.list_groups().await.unwrap().len(), 1);

        let duplicate = api.save_group(request).await;
        assert!(matches!(duplicate, Err(ApiError::BusinessRuleViolation(_))));
        assert!(matches!(
            api.load_group("missing").await,
            Err(ApiError::NotFound(_))
        ));
    }
}
