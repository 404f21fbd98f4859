// ==========================================
// 工艺路线编排系统 - 工艺路线组保存载荷
// ==========================================
// 职责: 交给外部保存协作方的请求/响应结构
// 说明: 本系统不做持久化，只负责组装载荷
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::mapping::{ExportRow, ProcessGroup};
use crate::domain::matrix::MatrixCombo;
use crate::domain::step::StepSummary;
use crate::domain::types::MatrixSource;

/// 保存请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveGroupRequest {
    pub group_name: String,
    pub steps: Vec<StepSummary>,
    pub item_codes: Vec<String>,
    pub rows: Vec<ExportRow>,
    pub columns: Vec<String>,
    pub matrix: Vec<MatrixCombo>,
    pub matrix_source: MatrixSource,
    pub process_group: Option<ProcessGroup>,
}

/// 保存结果（group_id 对本系统不透明）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedGroup {
    pub group_id: String,
    pub group_name: String,
    pub saved_at: DateTime<Utc>,
}
