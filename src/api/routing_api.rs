// ==========================================
// 工艺路线编排系统 - 编排工作区 API
// ==========================================
// 职责: 单个物料上下文的同步门面
// - 推荐桶（默认 / 自定义 / 隐藏）
// - 时间轴编排 + 撤销/重做
// - 路线矩阵检测与级联过滤
// 说明: 每次变更同步返回最新只读视图，调用方不直接持有引擎
// ==========================================

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::error::ApiResult;
use crate::config::RoutingConfig;
use crate::domain::mapping::ExportDataset;
use crate::domain::matrix::{MatrixDefinition, MatrixField, MatrixFilter, MatrixOption, MatrixSummary};
use crate::domain::operation::{
    BucketKey, CandidateRecommendation, CustomEntry, DragPayload, Operation, OperationKey,
};
use crate::domain::step::{RoutingCodesPatch, StepTimesPatch, TimelineMetrics, TimelineStep};
use crate::engine::bucket::{CustomOperationForm, EditSession, RecommendationBuckets, VisibleOperation};
use crate::engine::export_resolver::{ExportResolver, ResolutionConfig};
use crate::engine::matrix_detector::MatrixDetector;
use crate::engine::sequencer::{drop_index_for_offset, StepIdGenerator, UuidStepIdGenerator};
use crate::engine::session::RoutingSession;
use crate::importer::CandidateMapper;

// ==========================================
// 只读视图
// ==========================================

/// 时间轴只读视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineView {
    pub item_code: String,
    pub steps: Vec<TimelineStep>,
    pub metrics: TimelineMetrics,
    pub can_undo: bool,
    pub can_redo: bool,
}

/// 时间轴变更结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineUpdate {
    /// 状态是否发生变化（false 表示空操作）
    pub changed: bool,
    /// 插入操作生成的步骤 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    pub view: TimelineView,
}

// ==========================================
// RoutingWorkspace - 单物料编排工作区
// ==========================================

/// 单个物料的编排上下文
///
/// 职责：
/// 1. 持有时间轴会话（排序器 + 历史）
/// 2. 持有推荐桶与编辑会话
/// 3. 持有矩阵过滤条件与用户定义组合
pub struct RoutingWorkspace {
    config: Arc<RoutingConfig>,
    session: RoutingSession,
    buckets: RecommendationBuckets,
    detector: MatrixDetector,
    resolver: ExportResolver,
    matrix_filter: MatrixFilter,
    matrix_definitions: Vec<MatrixDefinition>,
}

impl RoutingWorkspace {
    pub fn new(item_code: impl Into<String>, config: Arc<RoutingConfig>) -> Self {
        Self::with_id_generator(item_code, config, Box::new(UuidStepIdGenerator))
    }

    /// 指定步骤 ID 生成器（测试使用顺序生成器）
    pub fn with_id_generator(
        item_code: impl Into<String>,
        config: Arc<RoutingConfig>,
        id_gen: Box<dyn StepIdGenerator>,
    ) -> Self {
        let item_code = item_code.into();
        debug!(item_code = %item_code, history_limit = config.history_limit, "创建编排工作区");
        Self {
            session: RoutingSession::new(item_code, id_gen, config.history_limit),
            buckets: RecommendationBuckets::new(config.stale_edit_policy),
            detector: MatrixDetector::new(),
            resolver: ExportResolver::new(),
            matrix_filter: MatrixFilter::default(),
            matrix_definitions: Vec::new(),
            config,
        }
    }

    pub fn item_code(&self) -> &str {
        self.session.item_code()
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    pub fn steps(&self) -> &[TimelineStep] {
        self.session.steps()
    }

    /// 本物料的桶键
    pub fn bucket_key(&self, candidate_id: Option<&str>) -> BucketKey {
        BucketKey::new(self.item_code(), candidate_id)
    }

    // ==========================================
    // 时间轴
    // ==========================================

    pub fn view(&self) -> TimelineView {
        TimelineView {
            item_code: self.item_code().to_string(),
            steps: self.session.steps().to_vec(),
            metrics: self.session.metrics(),
            can_undo: self.session.can_undo(),
            can_redo: self.session.can_redo(),
        }
    }

    fn update(&self, changed: bool, step_id: Option<String>) -> TimelineUpdate {
        TimelineUpdate {
            changed,
            step_id,
            view: self.view(),
        }
    }

    /// 插入拖拽载荷（index 为 None 表示追加到末尾）
    pub fn insert(&mut self, payload: &DragPayload, index: Option<i64>) -> TimelineUpdate {
        let step_id = self.session.insert(payload, index);
        self.update(step_id.is_some(), step_id)
    }

    /// 插入拖拽层传来的原始 JSON 载荷
    ///
    /// 无法解析或缺少 operation 的载荷被忽略（changed = false）
    pub fn insert_json(&mut self, payload_json: &str, index: Option<i64>) -> TimelineUpdate {
        match CandidateMapper.parse_drag_payload(payload_json) {
            Some(payload) => self.insert(&payload, index),
            None => self.update(false, None),
        }
    }

    /// 按落点像素偏移插入
    pub fn insert_at_offset(&mut self, payload: &DragPayload, offset_px: f64) -> TimelineUpdate {
        let index = self.drop_index(offset_px);
        self.insert(payload, Some(index as i64))
    }

    /// 落点像素偏移 → 插入下标（使用配置的步骤间距）
    pub fn drop_index(&self, offset_px: f64) -> usize {
        drop_index_for_offset(
            offset_px,
            self.config.drop_origin_px,
            self.config.step_pitch_px,
            self.session.steps().len(),
        )
    }

    pub fn move_step(&mut self, step_id: &str, to_index: i64) -> TimelineUpdate {
        let changed = self.session.move_step(step_id, to_index);
        self.update(changed, None)
    }

    pub fn remove_step(&mut self, step_id: &str) -> TimelineUpdate {
        let changed = self.session.remove(step_id).is_some();
        self.update(changed, None)
    }

    pub fn update_step_times(&mut self, step_id: &str, patch: &StepTimesPatch) -> TimelineUpdate {
        let changed = self.session.update_step_times(step_id, patch);
        self.update(changed, None)
    }

    pub fn update_step_routing(
        &mut self,
        step_id: &str,
        patch: &RoutingCodesPatch,
    ) -> TimelineUpdate {
        let changed = self.session.update_step_routing(step_id, patch);
        self.update(changed, None)
    }

    /// 记录步骤的布局坐标（不写入历史）
    pub fn set_position_x(&mut self, step_id: &str, x: f64) -> bool {
        self.session.set_position_x(step_id, x)
    }

    /// 载入已保存的步骤列表（可撤销）
    pub fn replace_steps(&mut self, steps: Vec<TimelineStep>) -> TimelineUpdate {
        self.session.replace_steps(steps);
        self.update(true, None)
    }

    pub fn clear(&mut self) -> TimelineUpdate {
        let changed = self.session.clear();
        self.update(changed, None)
    }

    pub fn undo(&mut self) -> TimelineUpdate {
        let changed = self.session.undo();
        self.update(changed, None)
    }

    pub fn redo(&mut self) -> TimelineUpdate {
        let changed = self.session.redo();
        self.update(changed, None)
    }

    // ==========================================
    // 推荐桶
    // ==========================================

    /// 载入预测服务的候选推荐
    pub fn load_candidates(&mut self, records: Vec<CandidateRecommendation>) {
        info!(item_code = %self.item_code(), candidates = records.len(), "载入候选推荐");
        self.buckets.load_candidates(records);
    }

    pub fn set_defaults(&mut self, key: &BucketKey, operations: Vec<Operation>) {
        self.buckets.set_defaults(key, operations);
    }

    pub fn visible_operations(
        &self,
        key: &BucketKey,
        filter_text: Option<&str>,
    ) -> Vec<VisibleOperation> {
        self.buckets.visible_operations(key, filter_text)
    }

    pub fn hide_operation(&mut self, key: &BucketKey, op_key: OperationKey) -> bool {
        self.buckets.hide_operation(key, op_key)
    }

    pub fn restore_operation(&mut self, key: &BucketKey, op_key: &OperationKey) -> bool {
        self.buckets.restore_operation(key, op_key)
    }

    pub fn restore_all(&mut self, key: &BucketKey) -> usize {
        self.buckets.restore_all(key)
    }

    pub fn hidden_operations(&self, key: &BucketKey) -> Vec<Operation> {
        self.buckets.hidden_operations(key)
    }

    pub fn add_custom(&mut self, key: &BucketKey, form: &CustomOperationForm) -> ApiResult<CustomEntry> {
        Ok(self.buckets.add_custom(key, form)?)
    }

    pub fn update_custom(
        &mut self,
        key: &BucketKey,
        entry_id: &str,
        form: &CustomOperationForm,
    ) -> ApiResult<Option<CustomEntry>> {
        Ok(self.buckets.update_custom(key, entry_id, form)?)
    }

    pub fn remove_custom(&mut self, key: &BucketKey, entry_id: &str) -> Option<CustomEntry> {
        self.buckets.remove_custom(key, entry_id)
    }

    pub fn begin_edit(&mut self, key: &BucketKey, entry_id: &str) -> Option<CustomOperationForm> {
        self.buckets.begin_edit(key, entry_id)
    }

    pub fn edit_session(&self) -> Option<&EditSession> {
        self.buckets.edit_session()
    }

    pub fn update_edit_form(&mut self, form: CustomOperationForm) -> bool {
        self.buckets.update_edit_form(form)
    }

    pub fn commit_edit(&mut self) -> ApiResult<Option<CustomEntry>> {
        Ok(self.buckets.commit_edit()?)
    }

    pub fn cancel_edit(&mut self) {
        self.buckets.cancel_edit();
    }

    // ==========================================
    // 路线矩阵
    // ==========================================

    pub fn matrix_filter(&self) -> &MatrixFilter {
        &self.matrix_filter
    }

    /// 级联选择某一维度（下游维度被清空）
    pub fn select_matrix_field(&mut self, field: MatrixField, value: Option<&str>) -> MatrixFilter {
        self.matrix_filter.select(field, value);
        debug!(item_code = %self.item_code(), ?field, filter = ?self.matrix_filter, "更新矩阵过滤");
        self.matrix_filter.clone()
    }

    pub fn clear_matrix_filter(&mut self) {
        self.matrix_filter = MatrixFilter::default();
    }

    /// 某一维度的下拉选项（仅应用上游条件）
    pub fn matrix_options(&self, field: MatrixField) -> Vec<MatrixOption> {
        self.detector
            .options(self.session.steps(), field, &self.matrix_filter)
    }

    pub fn set_matrix_definitions(&mut self, definitions: Vec<MatrixDefinition>) {
        self.matrix_definitions = definitions;
    }

    pub fn matrix_definitions(&self) -> &[MatrixDefinition] {
        &self.matrix_definitions
    }

    /// 矩阵汇总: 有用户定义组合时按定义计数，否则自动检测
    pub fn matrix_summary(&self) -> MatrixSummary {
        self.detector
            .summarize(self.session.steps(), Some(self.matrix_definitions.as_slice()))
    }

    /// 当前过滤条件下的步骤
    pub fn filtered_steps(&self) -> Vec<&TimelineStep> {
        self.detector
            .filter_steps(self.session.steps(), Some(&self.matrix_filter))
    }

    // ==========================================
    // 导出
    // ==========================================

    /// 基于配置与当前矩阵过滤构造解析配置
    pub fn resolution_config(&self) -> ResolutionConfig {
        ResolutionConfig::from_config(&self.config).with_filter(self.matrix_filter.clone())
    }

    pub fn resolve_export(&self, config: &ResolutionConfig) -> ExportDataset {
        self.resolver.resolve(self.session.steps(), config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::MatrixSource;
    use crate::engine::sequencer::SequentialStepIdGenerator;

    fn workspace() -> RoutingWorkspace {
        RoutingWorkspace::with_id_generator(
            "ITEM-1",
            Arc::new(RoutingConfig::default()),
            Box::new(SequentialStepIdGenerator::new("s")),
        )
    }

    fn payload(code: &str, seq: i64) -> DragPayload {
        DragPayload::new("ITEM-1", Some("C1"), Operation::new(code, seq))
    }

    #[test]
    fn test_insert_returns_view() {
        let mut ws = workspace();
        let update = ws.insert(&payload("CUT", 10), None);

        assert!(update.changed);
        assert_eq!(update.step_id.as_deref(), Some("s-1"));
        assert_eq!(update.view.steps.len(), 1);
        assert!(update.view.can_undo);
        assert!(!update.view.can_redo);
    }

    #[test]
    fn test_malformed_json_payload_is_noop() {
        let mut ws = workspace();
        let update = ws.insert_json("{not json", None);
        assert!(!update.changed);
        assert!(update.view.steps.is_empty());
        assert!(!update.view.can_undo);

        let update = ws.insert_json(r#"{"itemCode":"ITEM-1"}"#, None);
        assert!(!update.changed);
    }

    #[test]
    fn test_insert_at_offset_uses_pitch() {
        let mut ws = workspace();
        ws.insert(&payload("A", 10), None);
        ws.insert(&payload("B", 20), None);

        // 默认间距 180px: 200px 落在第 1 个槽位
        let update = ws.insert_at_offset(&payload("X", 15), 200.0);
        let codes: Vec<&str> = update
            .view
            .steps
            .iter()
            .map(|s| s.process_code.as_str())
            .collect();
        assert_eq!(codes, vec!["A", "X", "B"]);
        assert_eq!(ws.drop_index(-50.0), 0);
        assert_eq!(ws.drop_index(10_000.0), 3);
    }

    #[test]
    fn test_noop_mutations_report_unchanged() {
        let mut ws = workspace();
        assert!(!ws.move_step("missing", 0).changed);
        assert!(!ws.remove_step("missing").changed);
        assert!(!ws.undo().changed);
        assert!(!ws.clear().changed);
    }

    #[test]
    fn test_bucket_operations_through_workspace() {
        let mut ws = workspace();
        let key = ws.bucket_key(Some("C1"));
        ws.load_candidates(vec![CandidateRecommendation {
            item_code: "ITEM-1".to_string(),
            candidate_id: Some("C1".to_string()),
            operations: vec![Operation::new("A", 10), Operation::new("B", 20)],
        }]);

        assert!(ws.hide_operation(&key, OperationKey::new("A", 10)));
        assert_eq!(ws.visible_operations(&key, None).len(), 1);
        assert_eq!(ws.hidden_operations(&key).len(), 1);

        let bad = CustomOperationForm {
            process_code: " ".to_string(),
            seq: "1".to_string(),
            ..Default::default()
        };
        assert!(ws.add_custom(&key, &bad).is_err());

        let form = CustomOperationForm {
            process_code: "Z".to_string(),
            seq: "5".to_string(),
            ..Default::default()
        };
        let entry = ws.add_custom(&key, &form).unwrap();
        let visible = ws.visible_operations(&key, None);
        assert_eq!(visible.len(), 2);
        assert!(visible[0].is_custom());

        assert!(ws.remove_custom(&key, &entry.id).is_some());
        assert_eq!(ws.restore_all(&key), 1);
        assert_eq!(ws.visible_operations(&key, None).len(), 2);
    }

    #[test]
    fn test_matrix_filter_and_summary() {
        let mut ws = workspace();
        for (code, set) in [("A", "R1"), ("B", "R1"), ("C", "R2")] {
            let id = ws.insert(&payload(code, 10), None).step_id.unwrap();
            ws.update_step_routing(
                &id,
                &RoutingCodesPatch {
                    routing_set_code: Some(set.to_string()),
                    ..Default::default()
                },
            );
        }

        let options = ws.matrix_options(MatrixField::RoutingSet);
        assert_eq!(options[0].value, "R1");
        assert_eq!(options[0].count, 2);

        ws.select_matrix_field(MatrixField::RoutingSet, Some("R2"));
        assert_eq!(ws.filtered_steps().len(), 1);
        let dataset = ws.resolve_export(&ws.resolution_config());
        assert_eq!(dataset.rows.len(), 1);

        let summary = ws.matrix_summary();
        assert_eq!(summary.source, MatrixSource::Detected);
        assert_eq!(summary.combos.len(), 2);

        ws.set_matrix_definitions(vec![MatrixDefinition {
            label: Some("主线".to_string()),
            routing_set_code: Some("R1".to_string()),
            ..Default::default()
        }]);
        let summary = ws.matrix_summary();
        assert_eq!(summary.source, MatrixSource::Defined);
        assert_eq!(summary.combos[0].count, 2);
    }
}
