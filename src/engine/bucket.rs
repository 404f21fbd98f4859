// ==========================================
// 工艺路线编排系统 - 推荐桶解析器
// ==========================================
// 职责: 合并默认推荐、自定义工序与隐藏键，生成可见工序列表
// 键: (itemCode, candidateId | null)
// 规则: 可见 = 自定义（插入顺序） + (默认 − 隐藏)，再按关键字过滤
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::operation::{
    BucketKey, CandidateRecommendation, CustomEntry, Operation, OperationKey,
};
use crate::i18n::t_with_args;

// ==========================================
// 表单校验错误
// ==========================================

/// 自定义工序表单校验错误
///
/// 校验失败时推荐桶状态保持不变
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormValidationError {
    #[error("工序代码不能为空")]
    MissingProcessCode,

    #[error("工序顺序必须为正整数: {value}")]
    InvalidSequence { value: String },

    #[error("时间字段不是数字 (字段 {field}): {value}")]
    NonNumericTime { field: String, value: String },

    #[error("时间字段不能为负数 (字段 {field}): {value}")]
    NegativeTime { field: String, value: String },
}

impl FormValidationError {
    /// 出错字段名
    pub fn field(&self) -> &str {
        match self {
            FormValidationError::MissingProcessCode => "processCode",
            FormValidationError::InvalidSequence { .. } => "seq",
            FormValidationError::NonNumericTime { field, .. }
            | FormValidationError::NegativeTime { field, .. } => field.as_str(),
        }
    }

    /// 面向用户的本地化提示
    pub fn user_message(&self) -> String {
        match self {
            FormValidationError::MissingProcessCode => {
                t_with_args("validation.process_code_required", &[])
            }
            FormValidationError::InvalidSequence { value } => {
                t_with_args("validation.sequence_invalid", &[("value", value.as_str())])
            }
            FormValidationError::NonNumericTime { field, value } => t_with_args(
                "validation.time_not_numeric",
                &[("field", field.as_str()), ("value", value.as_str())],
            ),
            FormValidationError::NegativeTime { field, value } => t_with_args(
                "validation.time_negative",
                &[("field", field.as_str()), ("value", value.as_str())],
            ),
        }
    }
}

// ==========================================
// 自定义工序表单
// ==========================================

/// 自定义工序表单（界面输入，全部为字符串）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomOperationForm {
    pub process_code: String,
    pub seq: String,
    pub description: String,
    pub setup_time: String,
    pub run_time: String,
    pub wait_time: String,
}

impl CustomOperationForm {
    /// 由已有工序回填表单（编辑场景）
    pub fn from_operation(op: &Operation) -> Self {
        let fmt_time = |v: Option<f64>| v.map(|t| t.to_string()).unwrap_or_default();
        Self {
            process_code: op.process_code.clone(),
            seq: op.seq.to_string(),
            description: op.description.clone().unwrap_or_default(),
            setup_time: fmt_time(op.setup_time),
            run_time: fmt_time(op.run_time),
            wait_time: fmt_time(op.wait_time),
        }
    }

    /// 校验并转换为工序
    ///
    /// # 校验规则
    /// 1. 工序代码去空白后不能为空
    /// 2. 顺序号必须为 > 0 的整数
    /// 3. 时间字段可为空；非空时必须为有限且 >= 0 的数字
    pub fn validate(&self) -> Result<Operation, FormValidationError> {
        let process_code = self.process_code.trim();
        if process_code.is_empty() {
            return Err(FormValidationError::MissingProcessCode);
        }

        let seq_raw = self.seq.trim();
        let seq = match seq_raw.parse::<i64>() {
            Ok(v) if v > 0 => v,
            _ => {
                return Err(FormValidationError::InvalidSequence {
                    value: seq_raw.to_string(),
                })
            }
        };

        let description = Some(self.description.trim())
            .filter(|d| !d.is_empty())
            .map(|d| d.to_string());

        Ok(Operation {
            process_code: process_code.to_string(),
            seq,
            description,
            setup_time: parse_time("setupTime", &self.setup_time)?,
            run_time: parse_time("runTime", &self.run_time)?,
            wait_time: parse_time("waitTime", &self.wait_time)?,
            extra: Default::default(),
        })
    }
}

fn parse_time(field: &str, raw: &str) -> Result<Option<f64>, FormValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value = trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| FormValidationError::NonNumericTime {
            field: field.to_string(),
            value: trimmed.to_string(),
        })?;
    if value < 0.0 {
        return Err(FormValidationError::NegativeTime {
            field: field.to_string(),
            value: trimmed.to_string(),
        });
    }
    Ok(Some(value))
}

// ==========================================
// 编辑会话与失效策略
// ==========================================

/// 编辑中的自定义工序被删除时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StaleEditPolicy {
    /// 丢弃编辑表单
    #[default]
    Discard,
    /// 保留表单但脱离原条目，提交时作为新条目添加
    Retain,
}

/// 自定义工序编辑会话
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSession {
    pub bucket_key: BucketKey,
    /// None 表示原条目已被删除（Retain 策略下的脱离状态）
    pub entry_id: Option<String>,
    pub form: CustomOperationForm,
}

// ==========================================
// 可见工序
// ==========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OperationOrigin {
    Custom {
        #[serde(rename = "entryId")]
        entry_id: String,
    },
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleOperation {
    pub origin: OperationOrigin,
    pub operation: Operation,
}

impl VisibleOperation {
    pub fn is_custom(&self) -> bool {
        matches!(self.origin, OperationOrigin::Custom { .. })
    }
}

// ==========================================
// RecommendationBuckets - 推荐桶集合
// ==========================================

#[derive(Debug, Clone, Default)]
struct BucketState {
    defaults: Vec<Operation>,
    custom: Vec<CustomEntry>,
    hidden: HashSet<OperationKey>,
}

/// 推荐桶集合
///
/// 桶在首次被引用（写操作）时隐式创建; 读不存在的桶返回空列表
#[derive(Debug, Clone, Default)]
pub struct RecommendationBuckets {
    buckets: HashMap<BucketKey, BucketState>,
    edit: Option<EditSession>,
    policy: StaleEditPolicy,
}

impl RecommendationBuckets {
    pub fn new(policy: StaleEditPolicy) -> Self {
        Self {
            buckets: HashMap::new(),
            edit: None,
            policy,
        }
    }

    fn bucket_mut(&mut self, key: &BucketKey) -> &mut BucketState {
        self.buckets.entry(key.clone()).or_default()
    }

    // ==========================================
    // 默认推荐
    // ==========================================

    /// 设置某个桶的默认推荐（重新拉取时调用）
    ///
    /// 隐藏键与自定义条目保留不变
    pub fn set_defaults(&mut self, key: &BucketKey, operations: Vec<Operation>) {
        debug!(bucket = %key, count = operations.len(), "更新默认推荐");
        self.bucket_mut(key).defaults = operations;
    }

    /// 批量装载预测服务输出
    pub fn load_candidates(&mut self, records: Vec<CandidateRecommendation>) {
        let total = records.len();
        for record in records {
            let key = record.bucket_key();
            self.set_defaults(&key, record.operations);
        }
        info!(buckets = total, "候选推荐装载完成");
    }

    pub fn defaults(&self, key: &BucketKey) -> &[Operation] {
        self.buckets
            .get(key)
            .map(|b| b.defaults.as_slice())
            .unwrap_or(&[])
    }

    // ==========================================
    // 可见列表
    // ==========================================

    /// 计算可见工序列表
    ///
    /// # 参数
    /// - key: 桶键
    /// - filter_text: 关键字（对“工序代码+描述”拼接串做大小写不敏感的包含匹配；空白视为无过滤）
    ///
    /// # 返回
    /// 自定义条目（插入顺序）在前，未隐藏的默认推荐（原顺序）在后
    pub fn visible_operations(
        &self,
        key: &BucketKey,
        filter_text: Option<&str>,
    ) -> Vec<VisibleOperation> {
        let Some(bucket) = self.buckets.get(key) else {
            return Vec::new();
        };

        let needle = filter_text
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());
        let keep = |op: &Operation| match &needle {
            None => true,
            Some(n) => {
                let haystack = format!(
                    "{}{}",
                    op.process_code,
                    op.description.as_deref().unwrap_or_default()
                );
                haystack.to_lowercase().contains(n)
            }
        };

        let custom = bucket
            .custom
            .iter()
            .filter(|entry| keep(&entry.operation))
            .map(|entry| VisibleOperation {
                origin: OperationOrigin::Custom {
                    entry_id: entry.id.clone(),
                },
                operation: entry.operation.clone(),
            });

        let defaults = bucket
            .defaults
            .iter()
            .filter(|op| !bucket.hidden.contains(&op.key()))
            .filter(|op| keep(*op))
            .map(|op| VisibleOperation {
                origin: OperationOrigin::Default,
                operation: op.clone(),
            });

        custom.chain(defaults).collect()
    }

    // ==========================================
    // 隐藏 / 恢复
    // ==========================================

    /// 隐藏默认推荐，返回是否新隐藏
    pub fn hide_operation(&mut self, key: &BucketKey, op_key: OperationKey) -> bool {
        let inserted = self.bucket_mut(key).hidden.insert(op_key.clone());
        debug!(bucket = %key, operation = %op_key, inserted, "隐藏推荐工序");
        inserted
    }

    /// 恢复单个隐藏推荐，返回是否确实恢复
    pub fn restore_operation(&mut self, key: &BucketKey, op_key: &OperationKey) -> bool {
        let removed = self
            .buckets
            .get_mut(key)
            .map(|b| b.hidden.remove(op_key))
            .unwrap_or(false);
        debug!(bucket = %key, operation = %op_key, removed, "恢复推荐工序");
        removed
    }

    /// 清空某个桶的隐藏键，返回恢复数量
    pub fn restore_all(&mut self, key: &BucketKey) -> usize {
        let count = self
            .buckets
            .get_mut(key)
            .map(|b| {
                let n = b.hidden.len();
                b.hidden.clear();
                n
            })
            .unwrap_or(0);
        info!(bucket = %key, count, "恢复全部隐藏推荐");
        count
    }

    pub fn is_hidden(&self, key: &BucketKey, op_key: &OperationKey) -> bool {
        self.buckets
            .get(key)
            .map(|b| b.hidden.contains(op_key))
            .unwrap_or(false)
    }

    /// 被隐藏的默认推荐（按默认顺序，供"恢复"选择器使用）
    pub fn hidden_operations(&self, key: &BucketKey) -> Vec<Operation> {
        self.buckets
            .get(key)
            .map(|b| {
                b.defaults
                    .iter()
                    .filter(|op| b.hidden.contains(&op.key()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    // ==========================================
    // 自定义工序 CRUD
    // ==========================================

    /// 添加自定义工序
    ///
    /// # 返回
    /// - Ok(CustomEntry): 新条目
    /// - Err(FormValidationError): 表单无效，状态不变
    pub fn add_custom(
        &mut self,
        key: &BucketKey,
        form: &CustomOperationForm,
    ) -> Result<CustomEntry, FormValidationError> {
        let operation = form.validate().map_err(|e| {
            warn!(bucket = %key, field = e.field(), error = %e, "自定义工序校验失败");
            e
        })?;

        let entry = CustomEntry {
            id: format!("custom-{}", Uuid::new_v4()),
            item_code: key.item_code.clone(),
            candidate_id: key.candidate_id.clone(),
            operation,
        };
        self.bucket_mut(key).custom.push(entry.clone());
        info!(bucket = %key, entry_id = %entry.id, "添加自定义工序");
        Ok(entry)
    }

    /// 更新自定义工序
    ///
    /// # 返回
    /// - Ok(Some(entry)): 更新后的条目
    /// - Ok(None): 条目不存在
    /// - Err: 表单无效，状态不变
    pub fn update_custom(
        &mut self,
        key: &BucketKey,
        entry_id: &str,
        form: &CustomOperationForm,
    ) -> Result<Option<CustomEntry>, FormValidationError> {
        let operation = form.validate()?;

        let Some(entry) = self
            .buckets
            .get_mut(key)
            .and_then(|b| b.custom.iter_mut().find(|e| e.id == entry_id))
        else {
            debug!(bucket = %key, entry_id, "自定义工序不存在，忽略更新");
            return Ok(None);
        };

        entry.operation = operation;
        info!(bucket = %key, entry_id, "更新自定义工序");
        Ok(Some(entry.clone()))
    }

    /// 删除自定义工序
    ///
    /// 若该条目正处于编辑中，按 StaleEditPolicy 处理编辑会话
    pub fn remove_custom(&mut self, key: &BucketKey, entry_id: &str) -> Option<CustomEntry> {
        let bucket = self.buckets.get_mut(key)?;
        let pos = bucket.custom.iter().position(|e| e.id == entry_id)?;
        let removed = bucket.custom.remove(pos);

        let editing_removed = self
            .edit
            .as_ref()
            .map(|s| &s.bucket_key == key && s.entry_id.as_deref() == Some(entry_id))
            .unwrap_or(false);
        if editing_removed {
            match self.policy {
                StaleEditPolicy::Discard => {
                    self.edit = None;
                    info!(entry_id, "编辑中的自定义工序被删除，编辑表单已丢弃");
                }
                StaleEditPolicy::Retain => {
                    if let Some(session) = self.edit.as_mut() {
                        session.entry_id = None;
                    }
                    info!(entry_id, "编辑中的自定义工序被删除，编辑表单保留为新条目");
                }
            }
        }

        info!(bucket = %key, entry_id, "删除自定义工序");
        Some(removed)
    }

    pub fn custom_entries(&self, key: &BucketKey) -> &[CustomEntry] {
        self.buckets
            .get(key)
            .map(|b| b.custom.as_slice())
            .unwrap_or(&[])
    }

    // ==========================================
    // 编辑会话
    // ==========================================

    /// 开始编辑，返回回填表单；条目不存在时返回 None
    pub fn begin_edit(&mut self, key: &BucketKey, entry_id: &str) -> Option<CustomOperationForm> {
        let entry = self
            .custom_entries(key)
            .iter()
            .find(|e| e.id == entry_id)?;
        let form = CustomOperationForm::from_operation(&entry.operation);
        self.edit = Some(EditSession {
            bucket_key: key.clone(),
            entry_id: Some(entry_id.to_string()),
            form: form.clone(),
        });
        Some(form)
    }

    pub fn edit_session(&self) -> Option<&EditSession> {
        self.edit.as_ref()
    }

    /// 更新编辑中的表单内容，无会话时返回 false
    pub fn update_edit_form(&mut self, form: CustomOperationForm) -> bool {
        match self.edit.as_mut() {
            Some(session) => {
                session.form = form;
                true
            }
            None => false,
        }
    }

    /// 提交编辑
    ///
    /// # 返回
    /// - Ok(Some(entry)): 已更新（或脱离状态下新增）的条目
    /// - Ok(None): 无编辑会话
    /// - Err: 表单无效，会话保留以便修正
    pub fn commit_edit(&mut self) -> Result<Option<CustomEntry>, FormValidationError> {
        let Some(session) = self.edit.clone() else {
            return Ok(None);
        };

        let result = match &session.entry_id {
            Some(entry_id) => self.update_custom(&session.bucket_key, entry_id, &session.form)?,
            None => Some(self.add_custom(&session.bucket_key, &session.form)?),
        };
        self.edit = None;
        Ok(result)
    }

    pub fn cancel_edit(&mut self) {
        self.edit = None;
    }
}
