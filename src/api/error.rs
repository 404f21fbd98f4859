// ==========================================
// 工艺路线编排系统 - API层错误类型
// ==========================================
// 职责: 汇总各层错误，转换为用户友好的错误消息
// 说明: 未找到 / 载荷格式错误不属于错误（返回 false / None）
// ==========================================

use thiserror::Error;

use crate::engine::bucket::FormValidationError;
use crate::export::error::ExportError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入错误
    // ==========================================
    /// 表单校验失败（message 已本地化）
    #[error("数据验证失败 (字段 {field}): {message}")]
    ValidationError { field: String, message: String },

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 协作方错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("导出失败: {0}")]
    ExportError(String),
}

// ==========================================
// 从 FormValidationError 转换
// ==========================================
impl From<FormValidationError> for ApiError {
    fn from(err: FormValidationError) -> Self {
        ApiError::ValidationError {
            field: err.field().to_string(),
            message: err.user_message(),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        ApiError::ImportError(err.to_string())
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        ApiError::ExportError(err.user_message())
    }
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将存储层的技术错误转换为用户友好的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::ValidationError { field, message }
            }
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_error_keeps_field() {
        let err: ApiError = FormValidationError::InvalidSequence {
            value: "0".to_string(),
        }
        .into();
        match err {
            ApiError::ValidationError { field, .. } => assert_eq!(field, "seq"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_repository_errors_map_to_business_errors() {
        let err: ApiError = RepositoryError::UniqueConstraintViolation("G1".to_string()).into();
        assert!(matches!(err, ApiError::BusinessRuleViolation(msg) if msg.contains("G1")));

        let err: ApiError = RepositoryError::FieldValueError {
            field: "groupName".to_string(),
            message: "blank".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::ValidationError { field, .. } if field == "groupName"));
    }

    #[test]
    fn test_import_error_keeps_reason() {
        let err: ApiError = ImportError::FileNotFound("draft.json".to_string()).into();
        assert!(matches!(err, ApiError::ImportError(msg) if msg.contains("draft.json")));
    }
}
