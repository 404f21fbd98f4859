// ==========================================
// 工艺路线编排系统 - 导出映射领域模型
// ==========================================
// 职责: MappingRow（源字段→目标列）、ProcessGroup（固定值列组）、
//       ExportDataset（解析结果: 列清单 + 行集）
// 红线: 缺值为 null，不省略单元格，不丢弃行
// ==========================================

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::domain::types::MappingType;

// ==========================================
// MappingRow - 映射行
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRow {
    pub source: String,                 // 源字段键
    pub mapped: String,                 // 目标列名
    #[serde(rename = "type", default)]
    pub data_type: MappingType,         // 目标数据类型
    #[serde(default)]
    pub required: bool,                 // 是否必填（缺值记录到 gaps）
    #[serde(default)]
    pub default_value: Option<String>,  // 缺值时的默认值
}

impl MappingRow {
    pub fn new(source: impl Into<String>, mapped: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            mapped: mapped.into(),
            ..Default::default()
        }
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    pub fn with_type(mut self, data_type: MappingType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// 非空白的默认值
    pub fn effective_default(&self) -> Option<&str> {
        self.default_value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

// ==========================================
// ColumnDef / ProcessGroup - 工序组
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    pub key: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub data_type: MappingType,
}

/// 工序组: 对所有导出行注入固定列与常量值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessGroup {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub group_type: Option<String>,
    #[serde(default)]
    pub default_columns: Vec<ColumnDef>,
    #[serde(default)]
    pub fixed_values: BTreeMap<String, Value>,
}

impl ProcessGroup {
    /// 固定值查找: 精确匹配优先，其次大小写不敏感
    pub fn fixed_value(&self, column: &str) -> Option<&Value> {
        self.fixed_values.get(column).or_else(|| {
            self.fixed_values
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(column))
                .map(|(_, v)| v)
        })
    }
}

// ==========================================
// ExportDataset - 导出数据集
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub step_id: String,
    /// 与 ExportDataset.columns 一一对应
    pub cells: Vec<Value>,
}

/// 必填列缺值记录（不影响行输出）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionGap {
    pub step_id: String,
    pub column: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDataset {
    pub columns: Vec<String>,
    #[serde(default)]
    pub column_labels: BTreeMap<String, String>,
    pub rows: Vec<ExportRow>,
    #[serde(default)]
    pub gaps: Vec<ResolutionGap>,
}

impl ExportDataset {
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.cells.get(idx))
    }

    /// 表头显示名（工序组有标签时使用标签）
    pub fn header_label<'a>(&'a self, column: &'a str) -> &'a str {
        self.column_labels
            .get(column)
            .map(String::as_str)
            .unwrap_or(column)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mapping_row_serde_type_field() {
        let row: MappingRow = serde_json::from_value(json!({
            "source": "RES_CD",
            "mapped": "RESOURCE",
            "type": "number",
            "required": true,
            "defaultValue": "0"
        }))
        .unwrap();
        assert_eq!(row.data_type, MappingType::Number);
        assert!(row.required);
        assert_eq!(row.effective_default(), Some("0"));
    }

    #[test]
    fn test_blank_default_is_ignored() {
        let row = MappingRow::new("A", "B").with_default("   ");
        assert_eq!(row.effective_default(), None);
    }

    #[test]
    fn test_fixed_value_case_insensitive() {
        let mut fixed = BTreeMap::new();
        fixed.insert("PLANT".to_string(), json!("P100"));
        let group = ProcessGroup {
            id: "G1".to_string(),
            name: "Group".to_string(),
            group_type: None,
            default_columns: vec![],
            fixed_values: fixed,
        };
        assert_eq!(group.fixed_value("plant"), Some(&json!("P100")));
        assert_eq!(group.fixed_value("OTHER"), None);
    }
}
