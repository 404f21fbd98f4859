// ==========================================
// 工艺路线编排系统 - 编排配置
// ==========================================
// 职责: 历史上限、拖拽落点、导出兜底列、来源登记顺序等可调参数
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::types::ExportFormat;
use crate::engine::bucket::StaleEditPolicy;
use crate::engine::export_resolver::{RegistrationTier, DEFAULT_REGISTRATION_ORDER};

/// 默认兜底导出列（映射与数据均为空时使用）
pub const DEFAULT_FALLBACK_COLUMNS: &[&str] = &[
    "PROC_SEQ",
    "PROC_CD",
    "PROC_DESC",
    "SETUP_TIME",
    "RUN_TIME",
    "WAIT_TIME",
];

/// 工艺路线编排配置（持久化对象）
///
/// 存储位置：JSON 文件（见 ConfigManager），所有字段均有默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// 撤销历史上限（0 表示不限）
    pub history_limit: usize,

    /// 时间轴每个步骤占用的像素间距（拖拽落点计算）
    pub step_pitch_px: f64,

    /// 时间轴首个步骤的像素起点
    pub drop_origin_px: f64,

    /// 兜底导出列
    pub fallback_columns: Vec<String>,

    /// 导出来源字段登记顺序（先写者胜）
    pub registration_order: Vec<RegistrationTier>,

    /// 编辑中的自定义工序被删除时的处理策略
    pub stale_edit_policy: StaleEditPolicy,

    /// 默认导出格式
    pub default_export_format: ExportFormat,

    /// 界面语言（zh-CN / en）
    pub locale: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            history_limit: 0,
            step_pitch_px: 180.0,
            drop_origin_px: 0.0,
            fallback_columns: DEFAULT_FALLBACK_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            registration_order: DEFAULT_REGISTRATION_ORDER.to_vec(),
            stale_edit_policy: StaleEditPolicy::default(),
            default_export_format: ExportFormat::Csv,
            locale: "zh-CN".to_string(),
        }
    }
}

impl RoutingConfig {
    /// 校验配置取值
    ///
    /// # 返回
    /// - Ok(()): 配置有效
    /// - Err(String): 配置无效,返回错误描述
    pub fn validate(&self) -> Result<(), String> {
        if !self.step_pitch_px.is_finite() || self.step_pitch_px <= 0.0 {
            return Err(format!("step_pitch_px 必须为正数: {}", self.step_pitch_px));
        }
        if !self.drop_origin_px.is_finite() {
            return Err("drop_origin_px 不能为 NaN 或无穷大".to_string());
        }
        if self.registration_order.is_empty() {
            return Err("registration_order 不能为空".to_string());
        }
        let mut seen = Vec::new();
        for tier in &self.registration_order {
            if seen.contains(tier) {
                return Err(format!("registration_order 重复: {:?}", tier));
            }
            seen.push(*tier);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RoutingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fallback_columns.len(), 6);
        assert_eq!(config.history_limit, 0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RoutingConfig =
            serde_json::from_str(r#"{"history_limit": 5, "locale": "en"}"#).unwrap();
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.locale, "en");
        assert_eq!(config.step_pitch_px, 180.0);
    }

    #[test]
    fn test_duplicate_tier_rejected() {
        let config = RoutingConfig {
            registration_order: vec![RegistrationTier::Metadata, RegistrationTier::Metadata],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_pitch_rejected() {
        let config = RoutingConfig {
            step_pitch_px: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
