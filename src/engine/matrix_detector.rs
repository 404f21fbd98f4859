// ==========================================
// 工艺路线编排系统 - 路线矩阵组合检测
// ==========================================
// 职责: 按 (路线集, 变体, 主路线, 副路线) 元组对步骤分组计数
// 排序: count 降序 → 旧格式标签升序 → 元组升序
// 模式:
// - 检测模式: 由时间轴自行分组
// - 定义模式: 按用户定义行逐一匹配计数（0 次也保留）
// ==========================================

use std::collections::HashMap;

use tracing::debug;

use crate::domain::matrix::{
    ComboKey, MatrixCombo, MatrixDefinition, MatrixField, MatrixFilter, MatrixOption,
    MatrixSummary,
};
use crate::domain::step::TimelineStep;
use crate::domain::types::MatrixSource;

/// 路线矩阵检测器（无状态）
#[derive(Debug, Default, Clone, Copy)]
pub struct MatrixDetector;

impl MatrixDetector {
    pub fn new() -> Self {
        Self
    }

    /// 检测时间轴中出现的全部组合
    pub fn detect(&self, steps: &[TimelineStep]) -> Vec<MatrixCombo> {
        let mut counts: HashMap<ComboKey, usize> = HashMap::new();
        for step in steps {
            *counts.entry(ComboKey::from_step(step)).or_insert(0) += 1;
        }

        let mut ranked: Vec<(String, ComboKey, usize)> = counts
            .into_iter()
            .map(|(key, count)| (key.legacy_label(), key, count))
            .collect();
        ranked.sort_by(|a, b| {
            b.2.cmp(&a.2)
                .then_with(|| a.0.cmp(&b.0))
                .then_with(|| a.1.cmp(&b.1))
        });

        debug!(steps = steps.len(), combos = ranked.len(), "路线组合检测完成");

        ranked
            .into_iter()
            .map(|(_, key, count)| MatrixCombo {
                key,
                count,
                label: None,
            })
            .collect()
    }

    /// 按用户定义行计数
    ///
    /// 保持定义顺序；定义中的空字段视为通配
    pub fn count_definitions(
        &self,
        steps: &[TimelineStep],
        definitions: &[MatrixDefinition],
    ) -> Vec<MatrixCombo> {
        definitions
            .iter()
            .map(|def| {
                let filter = def.as_filter();
                let count = steps.iter().filter(|s| filter.matches_step(s)).count();
                MatrixCombo {
                    key: def.combo_key(),
                    count,
                    label: def
                        .label
                        .as_deref()
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(|l| l.to_string()),
                }
            })
            .collect()
    }

    /// 汇总: 提供定义（非空）时走定义模式，否则检测模式
    pub fn summarize(
        &self,
        steps: &[TimelineStep],
        definitions: Option<&[MatrixDefinition]>,
    ) -> MatrixSummary {
        match definitions {
            Some(defs) if !defs.is_empty() => MatrixSummary {
                source: MatrixSource::Defined,
                combos: self.count_definitions(steps, defs),
            },
            _ => MatrixSummary {
                source: MatrixSource::Detected,
                combos: self.detect(steps),
            },
        }
    }

    /// 组合是否满足过滤条件
    pub fn matches(&self, combo: &MatrixCombo, filter: &MatrixFilter) -> bool {
        filter.matches_key(&combo.key)
    }

    /// 按过滤条件筛选步骤（无条件时返回全部）
    pub fn filter_steps<'a>(
        &self,
        steps: &'a [TimelineStep],
        filter: Option<&MatrixFilter>,
    ) -> Vec<&'a TimelineStep> {
        match filter {
            Some(f) if !f.is_empty() => steps.iter().filter(|s| f.matches_step(s)).collect(),
            _ => steps.iter().collect(),
        }
    }

    /// 级联下拉选项
    ///
    /// 只应用 field 上游的条件；空值不作为选项
    pub fn options(
        &self,
        steps: &[TimelineStep],
        field: MatrixField,
        filter: &MatrixFilter,
    ) -> Vec<MatrixOption> {
        let upstream = filter.upstream_of(field);
        let mut counts: HashMap<String, usize> = HashMap::new();
        for step in steps.iter().filter(|s| upstream.matches_step(s)) {
            if let Some(value) = field.resolve(step) {
                *counts.entry(value).or_insert(0) += 1;
            }
        }

        let mut options: Vec<MatrixOption> = counts
            .into_iter()
            .map(|(value, count)| MatrixOption { value, count })
            .collect();
        options.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::operation::Operation;
    use serde_json::json;

    fn step(id: &str, rs: Option<&str>, variant: Option<&str>) -> TimelineStep {
        let mut s = TimelineStep::from_operation(id.to_string(), "ITEM-1", None, &Operation::new("P", 1));
        s.routing_set_code = rs.map(|v| v.to_string());
        s.variant_code = variant.map(|v| v.to_string());
        s
    }

    #[test]
    fn test_detect_orders_by_count_desc() {
        let steps = vec![step("1", Some("A"), None), step("2", Some("B"), None), step("3", Some("A"), None)];
        let combos = MatrixDetector::new().detect(&steps);

        assert_eq!(combos.len(), 2);
        assert_eq!(combos[0].key.routing_set_code.as_deref(), Some("A"));
        assert_eq!(combos[0].count, 2);
        assert_eq!(combos[1].key.routing_set_code.as_deref(), Some("B"));
        assert_eq!(combos[1].count, 1);
    }

    #[test]
    fn test_detect_is_permutation_stable() {
        let steps = vec![
            step("1", Some("B"), Some("V1")),
            step("2", Some("A"), None),
            step("3", None, None),
            step("4", Some("A"), Some("V1")),
            step("5", Some("B"), Some("V1")),
        ];
        let mut reversed = steps.clone();
        reversed.reverse();

        let detector = MatrixDetector::new();
        assert_eq!(detector.detect(&steps), detector.detect(&reversed));

        let labels: Vec<String> = detector
            .detect(&steps)
            .iter()
            .map(|c| c.key.legacy_label())
            .collect();
        assert_eq!(labels, vec!["B::V1::::", "::::::", "A::::::", "A::V1::::"]);
    }

    #[test]
    fn test_separator_inside_code_does_not_collide() {
        // ("A::B", "C") 与 ("A", "B::C") 的旧标签相同，但元组不同
        let steps = vec![step("1", Some("A::B"), Some("C")), step("2", Some("A"), Some("B::C"))];
        assert_eq!(
            ComboKey::from_step(&steps[0]).legacy_label(),
            ComboKey::from_step(&steps[1]).legacy_label()
        );
        let combos = MatrixDetector::new().detect(&steps);
        assert_eq!(combos.len(), 2);
        assert!(combos.iter().all(|c| c.count == 1));
    }

    #[test]
    fn test_metadata_fallback_is_used() {
        let mut s = step("1", None, None);
        s.metadata.insert("ROUTING_SET_CD".to_string(), json!("RS9"));
        let combos = MatrixDetector::new().detect(&[s]);
        assert_eq!(combos[0].key.routing_set_code.as_deref(), Some("RS9"));
    }

    #[test]
    fn test_definitions_keep_zero_counts() {
        let steps = vec![step("1", Some("A"), None), step("2", Some("A"), Some("V"))];
        let defs = vec![
            MatrixDefinition {
                label: Some("A 全部".to_string()),
                routing_set_code: Some("A".to_string()),
                ..Default::default()
            },
            MatrixDefinition {
                routing_set_code: Some("Z".to_string()),
                ..Default::default()
            },
        ];

        let summary = MatrixDetector::new().summarize(&steps, Some(defs.as_slice()));
        assert_eq!(summary.source, MatrixSource::Defined);
        assert_eq!(summary.combos[0].count, 2);
        assert_eq!(summary.combos[0].label.as_deref(), Some("A 全部"));
        assert_eq!(summary.combos[1].count, 0);

        let detected = MatrixDetector::new().summarize(&steps, Some(&[][..]));
        assert_eq!(detected.source, MatrixSource::Detected);
    }

    #[test]
    fn test_filter_steps_keeps_uncoded_steps_without_filter() {
        let steps = vec![step("1", None, None), step("2", Some("A"), None)];
        let detector = MatrixDetector::new();
        assert_eq!(detector.filter_steps(&steps, None).len(), 2);

        let filter = MatrixFilter {
            routing_set_code: Some("A".to_string()),
            ..Default::default()
        };
        let kept = detector.filter_steps(&steps, Some(&filter));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "2");
    }

    #[test]
    fn test_options_use_upstream_filter_only() {
        let steps = vec![
            step("1", Some("A"), Some("V1")),
            step("2", Some("A"), Some("V2")),
            step("3", Some("A"), Some("V2")),
            step("4", Some("B"), Some("V3")),
        ];
        let mut filter = MatrixFilter::default();
        filter.select(MatrixField::RoutingSet, Some("A"));
        filter.select(MatrixField::Variant, Some("V1"));

        let options = MatrixDetector::new().options(&steps, MatrixField::Variant, &filter);
        let values: Vec<(&str, usize)> = options.iter().map(|o| (o.value.as_str(), o.count)).collect();
        assert_eq!(values, vec![("V2", 2), ("V1", 1)]);

        let sets = MatrixDetector::new().options(&steps, MatrixField::RoutingSet, &filter);
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].value, "A");
    }

    #[test]
    fn test_matches_combo() {
        let combo = MatrixCombo {
            key: ComboKey::new(Some("A"), Some("V"), None, None),
            count: 1,
            label: None,
        };
        let filter = MatrixFilter {
            variant_code: Some("V".to_string()),
            primary_routing_code: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(MatrixDetector::new().matches(&combo, &filter));
    }
}
