// ==========================================
// 工艺路线编排系统 - 候选推荐字段映射器
// ==========================================
// 职责: 宽松 JSON（预测服务输出 / 拖拽载荷）→ 领域类型
// 规则:
// - 字段按别名列表查找（PROC_CD / processCode / process_code ...）
// - 数值字段允许以字符串形式出现
// - 未识别字段原样保留到 Operation.extra
// ==========================================

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::domain::mapping::{MappingRow, ProcessGroup};
use crate::domain::operation::{CandidateRecommendation, DragPayload, Operation};
use crate::domain::step::scalar_to_string;
use crate::importer::error::{ImportError, ImportResult};

/// 字段别名表
pub mod field_aliases {
    pub const ITEM_CODE: &[&str] = &["itemCode", "ITEM_CD", "item_code", "ITEM_CODE"];
    pub const CANDIDATE_ID: &[&str] = &["candidateId", "CANDIDATE_ID", "candidate_id"];
    pub const OPERATIONS: &[&str] = &["operations", "OPERATIONS", "routing", "steps"];
    pub const OPERATION: &[&str] = &["operation", "OPERATION"];
    pub const MAPPING: &[&str] = &["mapping", "mappingRows", "MAPPING"];
    pub const PROCESS_GROUP: &[&str] = &["processGroup", "process_group"];

    pub const PROCESS_CODE: &[&str] = &["PROC_CD", "processCode", "process_code", "PROCESS_CODE"];
    pub const SEQ: &[&str] = &["PROC_SEQ", "seq", "sequence", "SEQ"];
    pub const DESCRIPTION: &[&str] = &["PROC_DESC", "description", "desc", "PROC_NM"];
    pub const SETUP_TIME: &[&str] = &["SETUP_TIME", "setupTime", "setup_time"];
    pub const RUN_TIME: &[&str] = &["RUN_TIME", "runTime", "run_time"];
    pub const WAIT_TIME: &[&str] = &["WAIT_TIME", "waitTime", "wait_time"];
}

/// 工艺路线草稿（命令行导出输入）
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingDraft {
    pub candidate: CandidateRecommendation,
    pub mapping: Vec<MappingRow>,
    pub process_group: Option<ProcessGroup>,
}

pub struct CandidateMapper;

impl CandidateMapper {
    // ==========================================
    // 候选推荐
    // ==========================================

    /// 读取候选推荐 JSON 文件
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> ImportResult<Vec<CandidateRecommendation>> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        self.parse_candidates(&content)
    }

    /// 解析候选推荐数组
    ///
    /// 顶层也接受单个对象（视为长度为 1 的数组）
    pub fn parse_candidates(&self, json: &str) -> ImportResult<Vec<CandidateRecommendation>> {
        let value: Value = serde_json::from_str(json)?;
        let records = match value {
            Value::Array(items) => items,
            obj @ Value::Object(_) => vec![obj],
            other => {
                return Err(ImportError::InvalidRecord {
                    record: 0,
                    message: format!("顶层应为数组或对象，实际为 {}", json_kind(&other)),
                })
            }
        };

        let candidates = records
            .iter()
            .enumerate()
            .map(|(idx, record)| self.map_candidate(record, idx + 1))
            .collect::<ImportResult<Vec<_>>>()?;

        info!(
            candidates = candidates.len(),
            operations = candidates.iter().map(|c| c.operations.len()).sum::<usize>(),
            "候选推荐解析完成"
        );
        Ok(candidates)
    }

    // ==========================================
    // 草稿
    // ==========================================

    /// 读取草稿文件 {itemCode, operations, mapping?, processGroup?}
    pub fn load_draft<P: AsRef<Path>>(&self, path: P) -> ImportResult<RoutingDraft> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        let raw = fs::read_to_string(path)?;
        self.parse_draft(&raw)
    }

    pub fn parse_draft(&self, json: &str) -> ImportResult<RoutingDraft> {
        let value: Value = serde_json::from_str(json)?;
        let candidate = self.map_candidate(&value, 1)?;

        let obj = value.as_object();
        let mapping = match obj.and_then(|o| self.get_value(o, field_aliases::MAPPING)) {
            None => Vec::new(),
            Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| {
                ImportError::TypeConversionError {
                    record: 1,
                    field: field_aliases::MAPPING[0].to_string(),
                    message: e.to_string(),
                }
            })?,
        };
        let process_group = match obj.and_then(|o| self.get_value(o, field_aliases::PROCESS_GROUP)) {
            None => None,
            Some(raw) => Some(serde_json::from_value(raw.clone()).map_err(|e| {
                ImportError::TypeConversionError {
                    record: 1,
                    field: field_aliases::PROCESS_GROUP[0].to_string(),
                    message: e.to_string(),
                }
            })?),
        };

        info!(
            item_code = %candidate.item_code,
            operations = candidate.operations.len(),
            mapping_rows = mapping.len(),
            "草稿解析完成"
        );
        Ok(RoutingDraft {
            candidate,
            mapping,
            process_group,
        })
    }

    /// 映射单条候选记录（record 从 1 开始）
    pub fn map_candidate(&self, value: &Value, record: usize) -> ImportResult<CandidateRecommendation> {
        let obj = value.as_object().ok_or_else(|| ImportError::InvalidRecord {
            record,
            message: format!("应为对象，实际为 {}", json_kind(value)),
        })?;

        let item_code = self
            .get_string(obj, field_aliases::ITEM_CODE)
            .ok_or_else(|| ImportError::MissingField {
                record,
                field: field_aliases::ITEM_CODE[0].to_string(),
            })?;
        let candidate_id = self.get_string(obj, field_aliases::CANDIDATE_ID);

        let operations = match self.get_value(obj, field_aliases::OPERATIONS) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(op_idx, item)| {
                    let op_obj = item.as_object().ok_or_else(|| ImportError::InvalidRecord {
                        record,
                        message: format!("operations[{}] 应为对象", op_idx),
                    })?;
                    self.map_operation(op_obj, record, op_idx)
                })
                .collect::<ImportResult<Vec<_>>>()?,
            Some(other) => {
                return Err(ImportError::TypeConversionError {
                    record,
                    field: field_aliases::OPERATIONS[0].to_string(),
                    message: format!("应为数组，实际为 {}", json_kind(other)),
                })
            }
        };

        Ok(CandidateRecommendation {
            item_code,
            candidate_id,
            operations,
        })
    }

    /// 映射单条工序记录
    ///
    /// 顺序缺失时以 "位置 + 1" 作为顺序提示
    pub fn map_operation(
        &self,
        obj: &Map<String, Value>,
        record: usize,
        op_index: usize,
    ) -> ImportResult<Operation> {
        let field_name = |alias: &[&str]| format!("operations[{}].{}", op_index, alias[0]);

        let process_code = self
            .get_string(obj, field_aliases::PROCESS_CODE)
            .ok_or_else(|| ImportError::MissingField {
                record,
                field: field_name(field_aliases::PROCESS_CODE),
            })?;

        let seq = match self.get_value(obj, field_aliases::SEQ) {
            None | Some(Value::Null) => {
                debug!(record, op_index, "工序缺少顺序，使用位置作为顺序提示");
                op_index as i64 + 1
            }
            Some(v) => parse_i64(v).ok_or_else(|| ImportError::TypeConversionError {
                record,
                field: field_name(field_aliases::SEQ),
                message: format!("无法解析为整数: {}", v),
            })?,
        };

        let time = |aliases: &[&str]| -> ImportResult<Option<f64>> {
            match self.get_value(obj, aliases) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
                Some(v) => parse_f64(v).map(Some).ok_or_else(|| {
                    ImportError::TypeConversionError {
                        record,
                        field: field_name(aliases),
                        message: format!("无法解析为数值: {}", v),
                    }
                }),
            }
        };
        let setup_time = time(field_aliases::SETUP_TIME)?;
        let run_time = time(field_aliases::RUN_TIME)?;
        let wait_time = time(field_aliases::WAIT_TIME)?;

        let known: HashSet<&str> = [
            field_aliases::PROCESS_CODE,
            field_aliases::SEQ,
            field_aliases::DESCRIPTION,
            field_aliases::SETUP_TIME,
            field_aliases::RUN_TIME,
            field_aliases::WAIT_TIME,
        ]
        .iter()
        .flat_map(|aliases| aliases.iter().copied())
        .collect();
        let extra: BTreeMap<String, Value> = obj
            .iter()
            .filter(|(k, _)| !known.contains(k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Operation {
            process_code,
            seq,
            description: self.get_string(obj, field_aliases::DESCRIPTION),
            setup_time,
            run_time,
            wait_time,
            extra,
        })
    }

    // ==========================================
    // 拖拽载荷
    // ==========================================

    /// 解析拖拽载荷
    ///
    /// 载荷格式错误或缺少 operation 时返回 None（仅记录日志，不报错）
    pub fn parse_drag_payload(&self, json: &str) -> Option<DragPayload> {
        let value: Value = match serde_json::from_str(json) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "拖拽载荷不是合法 JSON，已忽略");
                return None;
            }
        };
        let Some(obj) = value.as_object() else {
            warn!(kind = json_kind(&value), "拖拽载荷不是对象，已忽略");
            return None;
        };

        let item_code = self
            .get_string(obj, field_aliases::ITEM_CODE)
            .unwrap_or_default();
        let candidate_id = self.get_string(obj, field_aliases::CANDIDATE_ID);

        let op_obj = match self.get_value(obj, field_aliases::OPERATION) {
            Some(Value::Object(op)) => op,
            _ => {
                warn!(item_code = %item_code, "拖拽载荷缺少 operation，已忽略");
                return None;
            }
        };

        match self.map_operation(op_obj, 1, 0) {
            Ok(operation) => Some(DragPayload {
                item_code,
                candidate_id,
                operation: Some(operation),
            }),
            Err(e) => {
                warn!(item_code = %item_code, error = %e, "拖拽载荷中的工序无法解析，已忽略");
                None
            }
        }
    }

    // ==========================================
    // 字段读取
    // ==========================================

    /// 按别名顺序取第一个非 null 值
    fn get_value<'a>(&self, obj: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
        aliases
            .iter()
            .filter_map(|alias| obj.get(*alias))
            .find(|v| !v.is_null())
    }

    /// 按别名顺序取第一个非空标量（修剪后）
    fn get_string(&self, obj: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
        aliases
            .iter()
            .filter_map(|alias| obj.get(*alias))
            .find_map(scalar_to_string)
    }
}

fn parse_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn parse_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
