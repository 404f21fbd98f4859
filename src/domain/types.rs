// ==========================================
// 工艺路线编排系统 - 领域类型定义
// ==========================================
// 职责: 枚举/标签类型（导出格式、映射数据类型、矩阵来源、历史动作）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 导出格式 (Export Format)
// ==========================================
// 序列化格式: 大写标签 (与前端/ERP 约定一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ExportFormat {
    #[default]
    #[serde(rename = "CSV")]
    Csv,
    #[serde(rename = "JSON")]
    Json,
    #[serde(rename = "XML")]
    Xml,
    #[serde(rename = "Excel")]
    Excel,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => write!(f, "CSV"),
            ExportFormat::Json => write!(f, "JSON"),
            ExportFormat::Xml => write!(f, "XML"),
            ExportFormat::Excel => write!(f, "Excel"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CSV" => Ok(ExportFormat::Csv),
            "JSON" => Ok(ExportFormat::Json),
            "XML" => Ok(ExportFormat::Xml),
            "EXCEL" | "XLSX" => Ok(ExportFormat::Excel),
            other => Err(format!("未知导出格式: {}", other)),
        }
    }
}

// ==========================================
// 映射数据类型 (Mapping Type)
// ==========================================
// 决定导出单元格的类型转换方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MappingType {
    #[default]
    String,
    Number,
    Integer,
    Boolean,
    Date,
}

impl fmt::Display for MappingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingType::String => write!(f, "string"),
            MappingType::Number => write!(f, "number"),
            MappingType::Integer => write!(f, "integer"),
            MappingType::Boolean => write!(f, "boolean"),
            MappingType::Date => write!(f, "date"),
        }
    }
}

impl FromStr for MappingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "string" | "text" | "varchar" => Ok(MappingType::String),
            "number" | "numeric" | "decimal" | "float" => Ok(MappingType::Number),
            "integer" | "int" => Ok(MappingType::Integer),
            "boolean" | "bool" => Ok(MappingType::Boolean),
            "date" | "datetime" => Ok(MappingType::Date),
            other => Err(format!("未知映射类型: {}", other)),
        }
    }
}

// ==========================================
// 矩阵来源 (Matrix Source)
// ==========================================
// Detected: 从时间轴自动识别; Defined: 用户手工定义
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatrixSource {
    #[default]
    Detected,
    Defined,
}

impl fmt::Display for MatrixSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatrixSource::Detected => write!(f, "detected"),
            MatrixSource::Defined => write!(f, "defined"),
        }
    }
}

// ==========================================
// 历史动作 (History Action)
// ==========================================
// 记录每个快照由哪类变更产生，供撤销菜单显示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    Insert,
    Move,
    Remove,
    UpdateTimes,
    UpdateRouting,
    Replace,
    Clear,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Insert => "INSERT",
            HistoryAction::Move => "MOVE",
            HistoryAction::Remove => "REMOVE",
            HistoryAction::UpdateTimes => "UPDATE_TIMES",
            HistoryAction::UpdateRouting => "UPDATE_ROUTING",
            HistoryAction::Replace => "REPLACE",
            HistoryAction::Clear => "CLEAR",
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_format_parse() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!(" Json ".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("xlsx".parse::<ExportFormat>().unwrap(), ExportFormat::Excel);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_export_format_serde_tag() {
        let json = serde_json::to_string(&ExportFormat::Excel).unwrap();
        assert_eq!(json, "\"Excel\"");
        let back: ExportFormat = serde_json::from_str("\"CSV\"").unwrap();
        assert_eq!(back, ExportFormat::Csv);
    }

    #[test]
    fn test_mapping_type_parse() {
        assert_eq!("".parse::<MappingType>().unwrap(), MappingType::String);
        assert_eq!("INT".parse::<MappingType>().unwrap(), MappingType::Integer);
        assert_eq!("decimal".parse::<MappingType>().unwrap(), MappingType::Number);
        assert!("blob".parse::<MappingType>().is_err());
    }
}
