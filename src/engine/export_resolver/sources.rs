// ==========================================
// 工艺路线编排系统 - 导出来源登记
// ==========================================
// 职责: 为单个步骤构建 "规范键 → 值" 来源表
// 规则:
// - 按 RegistrationTier 顺序登记
// - 键首次出现即记录（值为空也记录，保证列存在）
// - 同一键只有第一个非空值生效，后续重复登记不覆盖
// ==========================================

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::HashMap;

use crate::domain::step::{meta_keys, TimelineStep};
use crate::domain::types::MappingType;

/// 步骤字段的规范导出键
pub mod source_keys {
    pub const PROC_SEQ: &str = "PROC_SEQ";
    pub const PROC_CD: &str = "PROC_CD";
    pub const PROC_DESC: &str = "PROC_DESC";
    pub const SETUP_TIME: &str = "SETUP_TIME";
    pub const RUN_TIME: &str = "RUN_TIME";
    pub const WAIT_TIME: &str = "WAIT_TIME";
    pub const ROUTING_SET_CD: &str = "ROUTING_SET_CD";
    pub const VARIANT_CD: &str = "VARIANT_CD";
    pub const PRIMARY_ROUTING_CD: &str = "PRIMARY_ROUTING_CD";
    pub const SECONDARY_ROUTING_CD: &str = "SECONDARY_ROUTING_CD";
    pub const BRANCH_CD: &str = "BRANCH_CD";
    pub const BRANCH_LABEL: &str = "BRANCH_LABEL";
    pub const BRANCH_PATH: &str = "BRANCH_PATH";
    pub const ITEM_CD: &str = "ITEM_CD";
}

// ==========================================
// RegistrationTier - 登记层级
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationTier {
    /// 步骤自身字段（seq、工序代码、时间、路线代码等）
    StepFields,
    /// metadata 顶层条目（不含 extra / sqlValues 容器）
    Metadata,
    /// metadata.extra 内的条目
    MetadataExtra,
    /// metadata.sqlValues 内的条目
    MetadataSqlValues,
}

/// 默认登记顺序: 步骤字段优先于任何元数据
pub const DEFAULT_REGISTRATION_ORDER: [RegistrationTier; 4] = [
    RegistrationTier::StepFields,
    RegistrationTier::Metadata,
    RegistrationTier::MetadataExtra,
    RegistrationTier::MetadataSqlValues,
];

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

// ==========================================
// SourceRegistry - 有序来源表（insert-if-absent）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRegistry {
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个键
    ///
    /// # 返回
    /// - true: 本次写入了值
    /// - false: 键已有非空值，或本次值为空
    pub fn register(&mut self, key: &str, value: Value) -> bool {
        let key = key.trim();
        if key.is_empty() {
            return false;
        }
        let value = if is_blank(&value) { Value::Null } else { value };

        match self.index.get(key) {
            Some(&idx) => {
                let slot = &mut self.entries[idx].1;
                if slot.is_null() && !value.is_null() {
                    *slot = value;
                    true
                } else {
                    false
                }
            }
            None => {
                let assigned = !value.is_null();
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), value));
                assigned
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&idx| &self.entries[idx].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// 按 原样 → 大写 → 小写 查找第一个非空值
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        [key.to_string(), key.to_uppercase(), key.to_lowercase()]
            .iter()
            .filter_map(|variant| self.get(variant))
            .find(|v| !v.is_null())
    }

    /// 登记顺序的键列表
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按给定层级顺序构建步骤来源表
    pub fn for_step(step: &TimelineStep, order: &[RegistrationTier]) -> Self {
        let mut registry = Self::new();
        for tier in order {
            match tier {
                RegistrationTier::StepFields => registry.register_step_fields(step),
                RegistrationTier::Metadata => {
                    for (key, value) in &step.metadata {
                        if key == meta_keys::EXTRA || key == meta_keys::SQL_VALUES {
                            continue;
                        }
                        registry.register(key, value.clone());
                    }
                }
                RegistrationTier::MetadataExtra => {
                    registry.register_nested(step, meta_keys::EXTRA)
                }
                RegistrationTier::MetadataSqlValues => {
                    registry.register_nested(step, meta_keys::SQL_VALUES)
                }
            }
        }
        registry
    }

    fn register_step_fields(&mut self, step: &TimelineStep) {
        use self::source_keys::*;

        let text = |v: Option<String>| v.map(Value::String).unwrap_or(Value::Null);
        let num = |v: Option<f64>| v.and_then(Number::from_f64).map(Value::Number).unwrap_or(Value::Null);

        self.register(PROC_SEQ, Value::from(step.seq));
        self.register(PROC_CD, Value::String(step.process_code.clone()));
        self.register(PROC_DESC, text(step.description.clone()));
        self.register(SETUP_TIME, num(step.setup_time));
        self.register(RUN_TIME, num(step.run_time));
        self.register(WAIT_TIME, num(step.wait_time));
        self.register(
            ROUTING_SET_CD,
            text(step.field_or_meta(&step.routing_set_code, meta_keys::ROUTING_SET)),
        );
        self.register(
            VARIANT_CD,
            text(step.field_or_meta(&step.variant_code, meta_keys::VARIANT)),
        );
        self.register(
            PRIMARY_ROUTING_CD,
            text(step.field_or_meta(&step.primary_routing_code, meta_keys::PRIMARY_ROUTING)),
        );
        self.register(
            SECONDARY_ROUTING_CD,
            text(step.field_or_meta(&step.secondary_routing_code, meta_keys::SECONDARY_ROUTING)),
        );
        self.register(
            BRANCH_CD,
            text(step.field_or_meta(&step.branch_code, meta_keys::BRANCH_CODE)),
        );
        self.register(
            BRANCH_LABEL,
            text(step.field_or_meta(&step.branch_label, meta_keys::BRANCH_LABEL)),
        );
        self.register(
            BRANCH_PATH,
            text(step.field_or_meta(&step.branch_path, meta_keys::BRANCH_PATH)),
        );
        self.register(ITEM_CD, Value::String(step.item_code.clone()));
    }

    fn register_nested(&mut self, step: &TimelineStep, container: &str) {
        if let Some(Value::Object(map)) = step.metadata.get(container) {
            for (key, value) in map {
                self.register(key, value.clone());
            }
        }
    }
}

// ==========================================
// 类型转换
// ==========================================

/// 按映射类型转换已解析值
///
/// 无法转换的值原样保留; null 始终为 null
pub fn coerce_value(value: Value, data_type: MappingType) -> Value {
    match (data_type, value) {
        (_, Value::Null) => Value::Null,
        (MappingType::Number, Value::String(s)) => parse_number(&s).unwrap_or(Value::String(s)),
        (MappingType::Integer, Value::String(s)) => {
            parse_integer(&s).map(Value::from).unwrap_or(Value::String(s))
        }
        (MappingType::Integer, Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Value::from(f as i64)
            }
            _ => Value::Number(n),
        },
        (MappingType::Boolean, Value::String(s)) => {
            parse_bool(&s).map(Value::Bool).unwrap_or(Value::String(s))
        }
        (MappingType::Boolean, Value::Number(n)) => match n.as_i64() {
            Some(0) => Value::Bool(false),
            Some(1) => Value::Bool(true),
            _ => Value::Number(n),
        },
        (MappingType::String, Value::Number(n)) => Value::String(n.to_string()),
        (MappingType::String, Value::Bool(b)) => Value::String(b.to_string()),
        (_, other) => other,
    }
}

fn parse_number(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Value::from(i));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn parse_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    trimmed.parse::<i64>().ok().or_else(|| {
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "1" => Some(true),
        "n" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}
