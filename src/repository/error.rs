// ==========================================
// 工艺路线编排系统 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 存储错误 =====
    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    // ===== 数据质量错误 =====
    #[error("字段值错误 (field={field}): {message}")]
    FieldValueError { field: String, message: String },
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
