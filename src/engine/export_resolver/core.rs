// ==========================================
// 工艺路线编排系统 - 导出列解析引擎
// ==========================================
// 算法:
// 1. 按矩阵过滤条件筛选步骤（无条件则全部）
// 2. 为每个步骤构建来源表（先写者胜）
// 3. 列清单 = 映射目标列 ∪ 兜底列 ∪ 来源键 ∪ 工序组默认列（按插入顺序去重）
// 4. 单元格取值顺序:
//    a. 来源表（原样 → 大写 → 小写）
//    b. 别名（别名表优先，其次映射行 source）
//    c. 映射行默认值
//    d. 工序组固定值
//    均未命中则为 null
// ==========================================

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

use crate::config::{RoutingConfig, DEFAULT_FALLBACK_COLUMNS};
use crate::domain::mapping::{ExportDataset, ExportRow, MappingRow, ProcessGroup, ResolutionGap};
use crate::domain::matrix::MatrixFilter;
use crate::domain::step::TimelineStep;
use crate::engine::matrix_detector::MatrixDetector;

use super::sources::{coerce_value, RegistrationTier, SourceRegistry, DEFAULT_REGISTRATION_ORDER};

// ==========================================
// ResolutionConfig - 解析配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolutionConfig {
    /// 映射行（为空时使用 default_columns 作为目标列）
    pub mapping_rows: Vec<MappingRow>,
    /// 调用方默认目标列
    pub default_columns: Vec<String>,
    /// 别名表: 列 → 备用来源键
    pub aliases: HashMap<String, String>,
    /// 当前工序组（只读）
    pub process_group: Option<ProcessGroup>,
    /// 始终包含的兜底列
    pub fallback_columns: Vec<String>,
    /// 矩阵过滤条件
    pub filter: Option<MatrixFilter>,
    /// 来源登记顺序
    pub registration_order: Vec<RegistrationTier>,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            mapping_rows: Vec::new(),
            default_columns: Vec::new(),
            aliases: HashMap::new(),
            process_group: None,
            fallback_columns: DEFAULT_FALLBACK_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            filter: None,
            registration_order: DEFAULT_REGISTRATION_ORDER.to_vec(),
        }
    }
}

impl ResolutionConfig {
    /// 以系统配置中的兜底列与登记顺序为基础
    pub fn from_config(config: &RoutingConfig) -> Self {
        Self {
            fallback_columns: config.fallback_columns.clone(),
            registration_order: config.registration_order.clone(),
            ..Self::default()
        }
    }

    pub fn with_mapping_rows(mut self, rows: Vec<MappingRow>) -> Self {
        self.mapping_rows = rows;
        self
    }

    pub fn with_default_columns(mut self, columns: Vec<String>) -> Self {
        self.default_columns = columns;
        self
    }

    pub fn with_alias(mut self, column: impl Into<String>, source: impl Into<String>) -> Self {
        self.aliases.insert(column.into(), source.into());
        self
    }

    pub fn with_process_group(mut self, group: ProcessGroup) -> Self {
        self.process_group = Some(group);
        self
    }

    pub fn with_filter(mut self, filter: MatrixFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_registration_order(mut self, order: Vec<RegistrationTier>) -> Self {
        self.registration_order = order;
        self
    }

    /// 目标列对应的映射行（大小写不敏感）
    fn mapping_for(&self, column: &str) -> Option<&MappingRow> {
        self.mapping_rows
            .iter()
            .find(|row| row.mapped.trim().eq_ignore_ascii_case(column))
    }

    /// 目标列的别名候选: 别名表（精确 → 大小写不敏感），其次映射行 source
    fn alias_candidates(&self, column: &str) -> Vec<String> {
        let mut candidates = Vec::new();
        let explicit = self.aliases.get(column).or_else(|| {
            self.aliases
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(column))
                .map(|(_, v)| v)
        });
        if let Some(alias) = explicit {
            candidates.push(alias.trim().to_string());
        }
        if let Some(row) = self.mapping_for(column) {
            candidates.push(row.source.trim().to_string());
        }
        candidates.retain(|c| !c.is_empty() && c != column);
        candidates.dedup();
        candidates
    }

    fn effective_order(&self) -> &[RegistrationTier] {
        if self.registration_order.is_empty() {
            &DEFAULT_REGISTRATION_ORDER
        } else {
            &self.registration_order
        }
    }
}

/// 单列的预计算解析规则
#[derive(Debug)]
struct ColumnPlan<'a> {
    name: &'a str,
    mapping: Option<&'a MappingRow>,
    aliases: Vec<String>,
}

/// 有序去重集合（修剪空白，丢弃空串）
#[derive(Debug, Default)]
struct ColumnSet {
    columns: Vec<String>,
    seen: HashSet<String>,
}

impl ColumnSet {
    fn push(&mut self, raw: &str) {
        let column = raw.trim();
        if column.is_empty() || self.seen.contains(column) {
            return;
        }
        self.seen.insert(column.to_string());
        self.columns.push(column.to_string());
    }

    fn extend<'a>(&mut self, items: impl IntoIterator<Item = &'a str>) {
        for item in items {
            self.push(item);
        }
    }
}

// ==========================================
// ExportResolver - 导出列解析器
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct ExportResolver {
    detector: MatrixDetector,
}

impl ExportResolver {
    pub fn new() -> Self {
        Self {
            detector: MatrixDetector::new(),
        }
    }

    /// 解析导出数据集
    ///
    /// # 说明
    /// - 每个保留步骤输出一行，行内单元格与列清单一一对应
    /// - 缺值为 null，不丢行
    /// - 必填映射列为 null 时记录到 gaps
    pub fn resolve(&self, steps: &[TimelineStep], config: &ResolutionConfig) -> ExportDataset {
        let kept = self.detector.filter_steps(steps, config.filter.as_ref());
        let order = config.effective_order();

        let registries: Vec<SourceRegistry> = kept
            .iter()
            .map(|step| SourceRegistry::for_step(step, order))
            .collect();

        let columns = self.collect_columns(config, &registries);
        let plans: Vec<ColumnPlan<'_>> = columns
            .iter()
            .map(|name| ColumnPlan {
                name: name.as_str(),
                mapping: config.mapping_for(name),
                aliases: config.alias_candidates(name),
            })
            .collect();

        let mut rows = Vec::with_capacity(kept.len());
        let mut gaps = Vec::new();
        for (step, registry) in kept.iter().zip(registries.iter()) {
            let cells: Vec<Value> = plans
                .iter()
                .map(|plan| {
                    let cell = self.resolve_cell(plan, registry, config);
                    if cell.is_null() && plan.mapping.map(|m| m.required).unwrap_or(false) {
                        gaps.push(ResolutionGap {
                            step_id: step.id.clone(),
                            column: plan.name.to_string(),
                        });
                    }
                    cell
                })
                .collect();
            rows.push(ExportRow {
                step_id: step.id.clone(),
                cells,
            });
        }

        let column_labels = Self::column_labels(config.process_group.as_ref(), &columns);

        info!(
            steps = steps.len(),
            rows = rows.len(),
            columns = columns.len(),
            gaps = gaps.len(),
            "导出数据集解析完成"
        );

        ExportDataset {
            columns,
            column_labels,
            rows,
            gaps,
        }
    }

    /// 列清单（不解析单元格）
    pub fn resolve_columns(&self, steps: &[TimelineStep], config: &ResolutionConfig) -> Vec<String> {
        let order = config.effective_order();
        let registries: Vec<SourceRegistry> = self
            .detector
            .filter_steps(steps, config.filter.as_ref())
            .into_iter()
            .map(|step| SourceRegistry::for_step(step, order))
            .collect();
        self.collect_columns(config, &registries)
    }

    fn collect_columns(&self, config: &ResolutionConfig, registries: &[SourceRegistry]) -> Vec<String> {
        let mut set = ColumnSet::default();

        if config.mapping_rows.is_empty() {
            set.extend(config.default_columns.iter().map(String::as_str));
        } else {
            set.extend(config.mapping_rows.iter().map(|row| row.mapped.as_str()));
        }
        set.extend(config.fallback_columns.iter().map(String::as_str));
        for registry in registries {
            set.extend(registry.keys());
        }
        if let Some(group) = &config.process_group {
            set.extend(group.default_columns.iter().map(|c| c.key.as_str()));
        }

        if set.columns.is_empty() {
            debug!("列清单为空，使用内置兜底列");
            set.extend(DEFAULT_FALLBACK_COLUMNS.iter().copied());
        }
        set.columns
    }

    fn resolve_cell(
        &self,
        plan: &ColumnPlan<'_>,
        registry: &SourceRegistry,
        config: &ResolutionConfig,
    ) -> Value {
        let resolved = registry
            .lookup(plan.name)
            .cloned()
            .or_else(|| {
                plan.aliases
                    .iter()
                    .find_map(|alias| registry.lookup(alias).cloned())
            })
            .or_else(|| {
                plan.mapping
                    .and_then(|m| m.effective_default())
                    .map(|d| Value::String(d.to_string()))
            })
            .or_else(|| {
                config
                    .process_group
                    .as_ref()
                    .and_then(|g| g.fixed_value(plan.name))
                    .filter(|v| !v.is_null())
                    .cloned()
            })
            .unwrap_or(Value::Null);

        match plan.mapping {
            Some(mapping) => coerce_value(resolved, mapping.data_type),
            None => resolved,
        }
    }

    fn column_labels(group: Option<&ProcessGroup>, columns: &[String]) -> BTreeMap<String, String> {
        let Some(group) = group else {
            return BTreeMap::new();
        };
        group
            .default_columns
            .iter()
            .filter_map(|def| {
                let label = def.label.as_deref()?.trim();
                let key = def.key.trim();
                (!label.is_empty() && columns.iter().any(|c| c == key))
                    .then(|| (key.to_string(), label.to_string()))
            })
            .collect()
    }
}
