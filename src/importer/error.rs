// ==========================================
// 工艺路线编排系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv/.json）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("JSON 解析失败: {0}")]
    JsonParseError(String),

    // ===== 数据映射错误 =====
    #[error("字段缺失 (记录 {record}): {field}")]
    MissingField { record: usize, field: String },

    #[error("类型转换失败 (记录 {record}, 字段 {field}): {message}")]
    TypeConversionError {
        record: usize,
        field: String,
        message: String,
    },

    #[error("记录结构错误 (记录 {record}): {message}")]
    InvalidRecord { record: usize, message: String },
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::JsonParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
