// ==========================================
// 工艺路线编排系统 - 工序与推荐桶领域模型
// ==========================================
// 职责: Operation（不可变工序描述）、OperationKey、BucketKey、
//       自定义工序条目、候选推荐记录、拖拽载荷
// ==========================================

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ==========================================
// Operation - 工序描述
// ==========================================
// 由外部预测服务产生或人工录入，进入时间轴前不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub process_code: String,         // 工序代码 (PROC_CD)
    pub seq: i64,                     // 顺序提示 (PROC_SEQ)
    #[serde(default)]
    pub description: Option<String>,  // 工序描述
    #[serde(default)]
    pub setup_time: Option<f64>,      // 准备时间
    #[serde(default)]
    pub run_time: Option<f64>,        // 加工时间
    #[serde(default)]
    pub wait_time: Option<f64>,       // 等待时间
    /// 其余来源字段（资源代码、路线代码等），原样保留
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl Operation {
    /// 以最少字段创建工序
    pub fn new(process_code: impl Into<String>, seq: i64) -> Self {
        Self {
            process_code: process_code.into(),
            seq,
            description: None,
            setup_time: None,
            run_time: None,
            wait_time: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_times(mut self, setup: Option<f64>, run: Option<f64>, wait: Option<f64>) -> Self {
        self.setup_time = setup;
        self.run_time = run;
        self.wait_time = wait;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// 内容稳定的推荐键（processCode + seq）
    ///
    /// 重新拉取默认推荐后，相同键视为同一条推荐，隐藏状态得以保留
    pub fn key(&self) -> OperationKey {
        OperationKey::new(self.process_code.clone(), self.seq)
    }
}

// ==========================================
// OperationKey - 推荐工序键
// ==========================================
// 结构化元组，不依赖字符串拼接; Display 仅用于兼容旧格式 "CODE::SEQ"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationKey {
    pub process_code: String,
    pub seq: i64,
}

impl OperationKey {
    pub fn new(process_code: impl Into<String>, seq: i64) -> Self {
        Self {
            process_code: process_code.into(),
            seq,
        }
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.process_code, self.seq)
    }
}

impl FromStr for OperationKey {
    type Err = String;

    /// 按最后一个 "::" 切分（seq 为数字，工序代码中含 "::" 也能还原）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (code, seq) = s
            .rsplit_once("::")
            .ok_or_else(|| format!("工序键格式错误（缺少 '::'）: {}", s))?;
        let seq = seq
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("工序键顺序号不是整数: {}", s))?;
        Ok(Self::new(code, seq))
    }
}

// ==========================================
// BucketKey - 推荐桶键
// ==========================================
// (itemCode, candidateId | null)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketKey {
    pub item_code: String,
    pub candidate_id: Option<String>,
}

impl BucketKey {
    pub fn new(item_code: impl Into<String>, candidate_id: Option<&str>) -> Self {
        Self {
            item_code: item_code.into(),
            candidate_id: candidate_id.map(|c| c.to_string()),
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.candidate_id {
            Some(candidate) => write!(f, "{}#{}", self.item_code, candidate),
            None => write!(f, "{}#-", self.item_code),
        }
    }
}

// ==========================================
// CustomEntry - 用户自定义工序条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEntry {
    pub id: String,
    pub item_code: String,
    pub candidate_id: Option<String>,
    pub operation: Operation,
}

impl CustomEntry {
    pub fn bucket_key(&self) -> BucketKey {
        BucketKey {
            item_code: self.item_code.clone(),
            candidate_id: self.candidate_id.clone(),
        }
    }
}

// ==========================================
// CandidateRecommendation - 预测服务输出
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecommendation {
    pub item_code: String,
    #[serde(default)]
    pub candidate_id: Option<String>,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl CandidateRecommendation {
    pub fn bucket_key(&self) -> BucketKey {
        BucketKey {
            item_code: self.item_code.clone(),
            candidate_id: self.candidate_id.clone(),
        }
    }
}

// ==========================================
// DragPayload - 拖拽传输载荷
// ==========================================
// 插入时间轴的唯一跨边界契约; operation 缺失的载荷被静默忽略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragPayload {
    #[serde(default)]
    pub item_code: String,
    #[serde(default)]
    pub candidate_id: Option<String>,
    #[serde(default)]
    pub operation: Option<Operation>,
}

impl DragPayload {
    pub fn new(item_code: impl Into<String>, candidate_id: Option<&str>, operation: Operation) -> Self {
        Self {
            item_code: item_code.into(),
            candidate_id: candidate_id.map(|c| c.to_string()),
            operation: Some(operation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_key_display_and_parse() {
        let op = Operation::new("CUT-01", 1);
        let key = op.key();
        assert_eq!(key.to_string(), "CUT-01::1");
        assert_eq!("CUT-01::1".parse::<OperationKey>().unwrap(), key);
    }

    #[test]
    fn test_operation_key_code_with_separator() {
        let key = OperationKey::new("A::B", 7);
        let parsed: OperationKey = key.to_string().parse().unwrap();
        assert_eq!(parsed.process_code, "A::B");
        assert_eq!(parsed.seq, 7);
    }

    #[test]
    fn test_operation_key_invalid() {
        assert!("CUT-01".parse::<OperationKey>().is_err());
        assert!("CUT-01::x".parse::<OperationKey>().is_err());
    }

    #[test]
    fn test_drag_payload_without_operation() {
        let payload: DragPayload =
            serde_json::from_str(r#"{"itemCode":"ITEM-1","candidateId":null}"#).unwrap();
        assert!(payload.operation.is_none());
    }

    #[test]
    fn test_operation_serde_camel_case() {
        let op = Operation::new("MILL-02", 2).with_extra("RES_CD", "M01");
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["processCode"], "MILL-02");
        assert_eq!(json["extra"]["RES_CD"], "M01");
    }
}
