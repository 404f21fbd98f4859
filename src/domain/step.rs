// ==========================================
// 工艺路线编排系统 - 时间轴步骤领域模型
// ==========================================
// 职责: TimelineStep（可变步骤）、字段级补丁、汇总指标、步骤摘要
// 红线: id 在移动前后保持稳定; seq 由排序器统一重编号
// ==========================================

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::domain::operation::Operation;

// ==========================================
// 元数据别名键
// ==========================================
// 步骤字段为空时，按顺序在 metadata 中查找这些键
pub mod meta_keys {
    pub const ROUTING_SET: &[&str] = &["routingSetCode", "ROUTING_SET_CD", "ROUT_SET_CD"];
    pub const VARIANT: &[&str] = &["variantCode", "VARIANT_CD"];
    pub const PRIMARY_ROUTING: &[&str] = &["primaryRoutingCode", "PRIMARY_ROUTING_CD"];
    pub const SECONDARY_ROUTING: &[&str] = &["secondaryRoutingCode", "SECONDARY_ROUTING_CD"];
    pub const BRANCH_CODE: &[&str] = &["branchCode", "BRANCH_CD"];
    pub const BRANCH_LABEL: &[&str] = &["branchLabel", "BRANCH_LABEL"];
    pub const BRANCH_PATH: &[&str] = &["branchPath", "BRANCH_PATH"];

    /// 原始附加值容器（导出时逐项展开）
    pub const EXTRA: &str = "extra";
    pub const SQL_VALUES: &str = "sqlValues";
}

/// 将 JSON 标量转为非空字符串（空白/null/复合值返回 None）
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ==========================================
// TimelineStep - 时间轴步骤
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineStep {
    // ===== 身份 =====
    pub id: String,                    // 生成器分配，移动后不变
    pub seq: u32,                      // 1..N 连续，由排序器维护

    // ===== 来源 =====
    pub item_code: String,             // 来源物料
    pub candidate_id: Option<String>,  // 来源候选方案

    // ===== 工序信息 =====
    pub process_code: String,
    pub description: Option<String>,
    pub setup_time: Option<f64>,
    pub run_time: Option<f64>,
    pub wait_time: Option<f64>,

    // ===== 画布位置 =====
    pub position_x: Option<f64>,

    // ===== 路线矩阵维度 =====
    pub routing_set_code: Option<String>,
    pub variant_code: Option<String>,
    pub primary_routing_code: Option<String>,
    pub secondary_routing_code: Option<String>,

    // ===== 分支 =====
    pub branch_code: Option<String>,
    pub branch_label: Option<String>,
    pub branch_path: Option<String>,

    // ===== 其他 =====
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default)]
    pub violations: Vec<String>,
}

impl TimelineStep {
    /// 由工序构造新步骤
    ///
    /// # 说明
    /// - operation.extra 整体复制到 metadata
    /// - 可识别的路线/分支代码从 extra 提升为步骤字段
    /// - seq 暂置 0，插入后由排序器重编号
    pub fn from_operation(
        id: String,
        item_code: &str,
        candidate_id: Option<&str>,
        operation: &Operation,
    ) -> Self {
        let metadata = operation.extra.clone();
        let lift = |aliases: &[&str]| lookup_alias(&metadata, aliases);

        Self {
            id,
            seq: 0,
            item_code: item_code.to_string(),
            candidate_id: candidate_id.map(|c| c.to_string()),
            process_code: operation.process_code.clone(),
            description: operation.description.clone(),
            setup_time: operation.setup_time,
            run_time: operation.run_time,
            wait_time: operation.wait_time,
            position_x: None,
            routing_set_code: lift(meta_keys::ROUTING_SET),
            variant_code: lift(meta_keys::VARIANT),
            primary_routing_code: lift(meta_keys::PRIMARY_ROUTING),
            secondary_routing_code: lift(meta_keys::SECONDARY_ROUTING),
            branch_code: lift(meta_keys::BRANCH_CODE),
            branch_label: lift(meta_keys::BRANCH_LABEL),
            branch_path: lift(meta_keys::BRANCH_PATH),
            metadata,
            violations: Vec::new(),
        }
    }

    /// 步骤字段优先，否则按别名查 metadata
    pub fn field_or_meta(&self, field: &Option<String>, aliases: &[&str]) -> Option<String> {
        match field.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => Some(v.to_string()),
            _ => lookup_alias(&self.metadata, aliases),
        }
    }

    /// 应用时间补丁，返回是否有字段实际变化
    pub fn apply_times(&mut self, patch: &StepTimesPatch) -> bool {
        let mut changed = false;
        changed |= patch_field(&mut self.setup_time, patch.setup_time);
        changed |= patch_field(&mut self.run_time, patch.run_time);
        changed |= patch_field(&mut self.wait_time, patch.wait_time);
        changed
    }

    /// 应用路线代码补丁，返回是否有字段实际变化
    pub fn apply_routing(&mut self, patch: &RoutingCodesPatch) -> bool {
        let mut changed = false;
        changed |= patch_field(&mut self.routing_set_code, patch.routing_set_code.clone());
        changed |= patch_field(&mut self.variant_code, patch.variant_code.clone());
        changed |= patch_field(&mut self.primary_routing_code, patch.primary_routing_code.clone());
        changed |= patch_field(
            &mut self.secondary_routing_code,
            patch.secondary_routing_code.clone(),
        );
        changed |= patch_field(&mut self.branch_code, patch.branch_code.clone());
        changed |= patch_field(&mut self.branch_label, patch.branch_label.clone());
        changed |= patch_field(&mut self.branch_path, patch.branch_path.clone());
        changed
    }

    pub fn summary(&self) -> StepSummary {
        StepSummary {
            id: self.id.clone(),
            seq: self.seq,
            item_code: self.item_code.clone(),
            process_code: self.process_code.clone(),
            description: self.description.clone(),
            setup_time: self.setup_time,
            run_time: self.run_time,
            wait_time: self.wait_time,
            routing_set_code: self.routing_set_code.clone(),
            variant_code: self.variant_code.clone(),
            primary_routing_code: self.primary_routing_code.clone(),
            secondary_routing_code: self.secondary_routing_code.clone(),
        }
    }
}

fn lookup_alias(metadata: &BTreeMap<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|alias| metadata.get(*alias))
        .find_map(scalar_to_string)
}

// 补丁中 None 表示"不修改"，而不是清空
fn patch_field<T: PartialEq>(target: &mut Option<T>, value: Option<T>) -> bool {
    match value {
        Some(v) if target.as_ref() != Some(&v) => {
            *target = Some(v);
            true
        }
        _ => false,
    }
}

// ==========================================
// StepTimesPatch - 时间字段补丁
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTimesPatch {
    #[serde(default)]
    pub setup_time: Option<f64>,
    #[serde(default)]
    pub run_time: Option<f64>,
    #[serde(default)]
    pub wait_time: Option<f64>,
}

impl StepTimesPatch {
    pub fn is_empty(&self) -> bool {
        self.setup_time.is_none() && self.run_time.is_none() && self.wait_time.is_none()
    }
}

// ==========================================
// RoutingCodesPatch - 路线代码补丁
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingCodesPatch {
    #[serde(default)]
    pub routing_set_code: Option<String>,
    #[serde(default)]
    pub variant_code: Option<String>,
    #[serde(default)]
    pub primary_routing_code: Option<String>,
    #[serde(default)]
    pub secondary_routing_code: Option<String>,
    #[serde(default)]
    pub branch_code: Option<String>,
    #[serde(default)]
    pub branch_label: Option<String>,
    #[serde(default)]
    pub branch_path: Option<String>,
}

impl RoutingCodesPatch {
    pub fn is_empty(&self) -> bool {
        self.routing_set_code.is_none()
            && self.variant_code.is_none()
            && self.primary_routing_code.is_none()
            && self.secondary_routing_code.is_none()
            && self.branch_code.is_none()
            && self.branch_label.is_none()
            && self.branch_path.is_none()
    }
}

// ==========================================
// TimelineMetrics - 汇总指标
// ==========================================
// 缺失值按 0 计入，不跳过
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineMetrics {
    pub step_count: usize,
    pub total_setup_time: f64,
    pub total_run_time: f64,
    pub total_wait_time: f64,
}

impl TimelineMetrics {
    pub fn from_steps(steps: &[TimelineStep]) -> Self {
        Self {
            step_count: steps.len(),
            total_setup_time: steps.iter().map(|s| s.setup_time.unwrap_or(0.0)).sum(),
            total_run_time: steps.iter().map(|s| s.run_time.unwrap_or(0.0)).sum(),
            total_wait_time: steps.iter().map(|s| s.wait_time.unwrap_or(0.0)).sum(),
        }
    }
}

// ==========================================
// StepSummary - 保存用步骤摘要
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSummary {
    pub id: String,
    pub seq: u32,
    pub item_code: String,
    pub process_code: String,
    pub description: Option<String>,
    pub setup_time: Option<f64>,
    pub run_time: Option<f64>,
    pub wait_time: Option<f64>,
    pub routing_set_code: Option<String>,
    pub variant_code: Option<String>,
    pub primary_routing_code: Option<String>,
    pub secondary_routing_code: Option<String>,
}
