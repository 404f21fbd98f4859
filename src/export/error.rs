// ==========================================
// 工艺路线编排系统 - 导出模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

use crate::domain::types::ExportFormat;
use crate::i18n::t_with_args;

/// 导出模块错误类型
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("导出格式不支持: {0}")]
    UnsupportedFormat(ExportFormat),

    #[error("CSV 写入失败: {0}")]
    CsvWriteError(String),

    #[error("JSON 写入失败: {0}")]
    JsonWriteError(String),

    #[error("数据集结构错误 (行 {row}): 期望 {expected} 列，实际 {actual} 列")]
    ShapeMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

impl ExportError {
    /// 本地化的用户提示
    pub fn user_message(&self) -> String {
        match self {
            ExportError::UnsupportedFormat(format) => {
                t_with_args("export.unsupported_format", &[("format", format.to_string().as_str())])
            }
            other => t_with_args("export.failed", &[("reason", other.to_string().as_str())]),
        }
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::CsvWriteError(err.to_string())
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::JsonWriteError(err.to_string())
    }
}

/// Result 类型别名
pub type ExportResult<T> = Result<T, ExportError>;
