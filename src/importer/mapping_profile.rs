// ==========================================
// 工艺路线编排系统 - 映射配置表导入
// ==========================================
// 职责: CSV / Excel 映射配置表 → Vec<MappingRow>
// 表头: source, mapped, type, required, default（支持别名）
// ==========================================

use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

use crate::domain::mapping::MappingRow;
use crate::domain::types::MappingType;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{RawRecord, UniversalFileParser};

/// 映射配置表列名别名
pub mod profile_headers {
    pub const SOURCE: &[&str] = &["source", "SOURCE", "源字段", "sourceKey"];
    pub const MAPPED: &[&str] = &["mapped", "MAPPED", "目标列", "target", "column"];
    pub const TYPE: &[&str] = &["type", "TYPE", "数据类型", "dataType"];
    pub const REQUIRED: &[&str] = &["required", "REQUIRED", "必填"];
    pub const DEFAULT: &[&str] = &["default", "DEFAULT", "默认值", "defaultValue"];
}

pub struct MappingProfileImporter;

impl MappingProfileImporter {
    /// 从文件读取映射行（按扩展名选择 CSV / Excel）
    pub fn load<P: AsRef<Path>>(&self, path: P) -> ImportResult<Vec<MappingRow>> {
        let path = path.as_ref();
        let records = UniversalFileParser.parse(path)?;
        let rows = self.map_records(&records)?;
        info!(path = %path.display(), rows = rows.len(), "映射配置表导入完成");
        Ok(rows)
    }

    /// 将表格记录转换为映射行
    ///
    /// 目标列为空的行跳过; 类型无法识别时报错
    pub fn map_records(&self, records: &[RawRecord]) -> ImportResult<Vec<MappingRow>> {
        let mut rows = Vec::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            let line = idx + 2; // 表头占第 1 行

            let Some(mapped) = get_cell(record, profile_headers::MAPPED) else {
                warn!(line, "映射行缺少目标列，已跳过");
                continue;
            };
            let source = get_cell(record, profile_headers::SOURCE).unwrap_or_else(|| mapped.clone());

            let data_type = match get_cell(record, profile_headers::TYPE) {
                None => MappingType::default(),
                Some(raw) => MappingType::from_str(&raw).map_err(|_| {
                    ImportError::TypeConversionError {
                        record: line,
                        field: profile_headers::TYPE[0].to_string(),
                        message: format!("未知数据类型: {}", raw),
                    }
                })?,
            };

            let required = match get_cell(record, profile_headers::REQUIRED) {
                None => false,
                Some(raw) => parse_flag(&raw).ok_or_else(|| ImportError::TypeConversionError {
                    record: line,
                    field: profile_headers::REQUIRED[0].to_string(),
                    message: format!("无法解析为布尔值: {}", raw),
                })?,
            };

            rows.push(MappingRow {
                source,
                mapped,
                data_type,
                required,
                default_value: get_cell(record, profile_headers::DEFAULT),
            });
        }
        Ok(rows)
    }
}

fn get_cell(record: &RawRecord, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|alias| record.get(*alias))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .map(|v| v.to_string())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "1" | "是" => Some(true),
        "n" | "no" | "false" | "0" | "否" => Some(false),
        _ => None,
    }
}
