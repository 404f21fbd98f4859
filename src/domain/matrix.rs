// ==========================================
// 工艺路线编排系统 - 路线矩阵领域模型
// ==========================================
// 职责: ComboKey（四维路线代码元组）、MatrixCombo、MatrixFilter、
//       MatrixDefinition（用户定义组合）
// 红线: 分组使用结构化元组，不使用字符串拼接（避免 "::" 冲突）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::step::{meta_keys, TimelineStep};
use crate::domain::types::MatrixSource;

// ==========================================
// MatrixField - 矩阵维度（级联顺序）
// ==========================================
// 顺序: 路线集 → 变体 → 主路线 → 副路线
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatrixField {
    RoutingSet,
    Variant,
    PrimaryRouting,
    SecondaryRouting,
}

impl MatrixField {
    pub const ALL: [MatrixField; 4] = [
        MatrixField::RoutingSet,
        MatrixField::Variant,
        MatrixField::PrimaryRouting,
        MatrixField::SecondaryRouting,
    ];

    /// 步骤上该维度的取值（步骤字段优先，metadata 兜底）
    pub fn resolve(&self, step: &TimelineStep) -> Option<String> {
        match self {
            MatrixField::RoutingSet => {
                step.field_or_meta(&step.routing_set_code, meta_keys::ROUTING_SET)
            }
            MatrixField::Variant => step.field_or_meta(&step.variant_code, meta_keys::VARIANT),
            MatrixField::PrimaryRouting => {
                step.field_or_meta(&step.primary_routing_code, meta_keys::PRIMARY_ROUTING)
            }
            MatrixField::SecondaryRouting => {
                step.field_or_meta(&step.secondary_routing_code, meta_keys::SECONDARY_ROUTING)
            }
        }
    }
}

fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

// ==========================================
// ComboKey - 路线组合键
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComboKey {
    pub routing_set_code: Option<String>,
    pub variant_code: Option<String>,
    pub primary_routing_code: Option<String>,
    pub secondary_routing_code: Option<String>,
}

impl ComboKey {
    pub fn new(
        routing_set_code: Option<&str>,
        variant_code: Option<&str>,
        primary_routing_code: Option<&str>,
        secondary_routing_code: Option<&str>,
    ) -> Self {
        Self {
            routing_set_code: normalize(routing_set_code),
            variant_code: normalize(variant_code),
            primary_routing_code: normalize(primary_routing_code),
            secondary_routing_code: normalize(secondary_routing_code),
        }
    }

    pub fn from_step(step: &TimelineStep) -> Self {
        Self {
            routing_set_code: MatrixField::RoutingSet.resolve(step),
            variant_code: MatrixField::Variant.resolve(step),
            primary_routing_code: MatrixField::PrimaryRouting.resolve(step),
            secondary_routing_code: MatrixField::SecondaryRouting.resolve(step),
        }
    }

    pub fn get(&self, field: MatrixField) -> Option<&str> {
        match field {
            MatrixField::RoutingSet => self.routing_set_code.as_deref(),
            MatrixField::Variant => self.variant_code.as_deref(),
            MatrixField::PrimaryRouting => self.primary_routing_code.as_deref(),
            MatrixField::SecondaryRouting => self.secondary_routing_code.as_deref(),
        }
    }

    /// 旧格式标签: null → ""，以 "::" 连接
    ///
    /// 仅用于排序的次级比较键，不作为分组键
    pub fn legacy_label(&self) -> String {
        MatrixField::ALL
            .iter()
            .map(|f| self.get(*f).unwrap_or(""))
            .collect::<Vec<_>>()
            .join("::")
    }
}

impl fmt::Display for ComboKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.legacy_label())
    }
}

// ==========================================
// MatrixCombo - 路线组合（派生，不持久化）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixCombo {
    #[serde(flatten)]
    pub key: ComboKey,
    pub count: usize,
    /// 用户定义组合的显示名（检测模式下为空）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

// ==========================================
// MatrixFilter - 矩阵过滤条件
// ==========================================
// 缺省/空白字段不构成约束
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixFilter {
    #[serde(default)]
    pub routing_set_code: Option<String>,
    #[serde(default)]
    pub variant_code: Option<String>,
    #[serde(default)]
    pub primary_routing_code: Option<String>,
    #[serde(default)]
    pub secondary_routing_code: Option<String>,
}

impl MatrixFilter {
    pub fn get(&self, field: MatrixField) -> Option<&str> {
        let raw = match field {
            MatrixField::RoutingSet => self.routing_set_code.as_deref(),
            MatrixField::Variant => self.variant_code.as_deref(),
            MatrixField::PrimaryRouting => self.primary_routing_code.as_deref(),
            MatrixField::SecondaryRouting => self.secondary_routing_code.as_deref(),
        };
        raw.map(str::trim).filter(|v| !v.is_empty())
    }

    fn slot(&mut self, field: MatrixField) -> &mut Option<String> {
        match field {
            MatrixField::RoutingSet => &mut self.routing_set_code,
            MatrixField::Variant => &mut self.variant_code,
            MatrixField::PrimaryRouting => &mut self.primary_routing_code,
            MatrixField::SecondaryRouting => &mut self.secondary_routing_code,
        }
    }

    pub fn is_empty(&self) -> bool {
        MatrixField::ALL.iter().all(|f| self.get(*f).is_none())
    }

    /// 级联选择: 设置某一维度并清空其所有下游维度
    pub fn select(&mut self, field: MatrixField, value: Option<&str>) {
        *self.slot(field) = normalize(value);
        for downstream in MatrixField::ALL.iter().filter(|f| **f > field) {
            *self.slot(*downstream) = None;
        }
    }

    /// 仅保留 field 之前（上游）的条件，用于计算该维度的下拉选项
    pub fn upstream_of(&self, field: MatrixField) -> MatrixFilter {
        let mut upstream = MatrixFilter::default();
        for f in MatrixField::ALL.iter().filter(|f| **f < field) {
            *upstream.slot(*f) = self.get(*f).map(|v| v.to_string());
        }
        upstream
    }

    pub fn matches_key(&self, key: &ComboKey) -> bool {
        MatrixField::ALL.iter().all(|field| match self.get(*field) {
            None => true,
            Some(expected) => key.get(*field) == Some(expected),
        })
    }

    pub fn matches_step(&self, step: &TimelineStep) -> bool {
        MatrixField::ALL.iter().all(|field| match self.get(*field) {
            None => true,
            Some(expected) => field.resolve(step).as_deref() == Some(expected),
        })
    }
}

// ==========================================
// MatrixDefinition - 用户定义组合行
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixDefinition {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub routing_set_code: Option<String>,
    #[serde(default)]
    pub variant_code: Option<String>,
    #[serde(default)]
    pub primary_routing_code: Option<String>,
    #[serde(default)]
    pub secondary_routing_code: Option<String>,
}

impl MatrixDefinition {
    pub fn as_filter(&self) -> MatrixFilter {
        MatrixFilter {
            routing_set_code: self.routing_set_code.clone(),
            variant_code: self.variant_code.clone(),
            primary_routing_code: self.primary_routing_code.clone(),
            secondary_routing_code: self.secondary_routing_code.clone(),
        }
    }

    pub fn combo_key(&self) -> ComboKey {
        ComboKey::new(
            self.routing_set_code.as_deref(),
            self.variant_code.as_deref(),
            self.primary_routing_code.as_deref(),
            self.secondary_routing_code.as_deref(),
        )
    }
}

// ==========================================
// MatrixOption - 下拉选项
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixOption {
    pub value: String,
    pub count: usize,
}

// ==========================================
// MatrixSummary - 矩阵汇总（随保存请求提交）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixSummary {
    pub source: MatrixSource,
    pub combos: Vec<MatrixCombo>,
}
