use super::*;
use crate::domain::mapping::{ColumnDef, MappingRow, ProcessGroup};
use crate::domain::matrix::MatrixFilter;
use crate::domain::operation::Operation;
use crate::domain::step::TimelineStep;
use crate::domain::types::MappingType;
use serde_json::{json, Value};
use std::collections::BTreeMap;

// ==========================================
// 测试辅助函数
// ==========================================

fn create_step(id: &str, seq: u32, code: &str) -> TimelineStep {
    let mut step =
        TimelineStep::from_operation(id.to_string(), "ITEM-1", None, &Operation::new(code, seq as i64));
    step.seq = seq;
    step
}

fn create_step_with_meta(id: &str, seq: u32, code: &str, meta: Value) -> TimelineStep {
    let mut step = create_step(id, seq, code);
    if let Value::Object(map) = meta {
        step.metadata = map.into_iter().collect();
    }
    step
}

fn create_group(fixed: Value, columns: &[(&str, Option<&str>)]) -> ProcessGroup {
    let fixed_values: BTreeMap<String, Value> = match fixed {
        Value::Object(map) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    };
    ProcessGroup {
        id: "PG-1".to_string(),
        name: "标准组".to_string(),
        group_type: None,
        default_columns: columns
            .iter()
            .map(|(key, label)| ColumnDef {
                key: key.to_string(),
                label: label.map(|l| l.to_string()),
                data_type: MappingType::String,
            })
            .collect(),
        fixed_values,
    }
}

// ==========================================
// 别名与默认值
// ==========================================

#[test]
fn test_alias_resolves_mapped_column() {
    let steps = vec![create_step_with_meta("s1", 1, "CUT-01", json!({"RES_CD": "M01"}))];
    let config = ResolutionConfig::default()
        .with_mapping_rows(vec![MappingRow::new("RES_CD", "RESOURCE")])
        .with_alias("RESOURCE", "RES_CD");

    let dataset = ExportResolver::new().resolve(&steps, &config);

    assert_eq!(dataset.columns[0], "RESOURCE");
    assert_eq!(dataset.cell(0, "RESOURCE"), Some(&json!("M01")));
}

#[test]
fn test_mapping_default_used_when_source_missing() {
    let steps = vec![create_step("s1", 1, "CUT-01")];
    let config = ResolutionConfig::default()
        .with_mapping_rows(vec![MappingRow::new("RES_CD", "RESOURCE").with_default("UNKNOWN")])
        .with_alias("RESOURCE", "RES_CD");

    let dataset = ExportResolver::new().resolve(&steps, &config);
    assert_eq!(dataset.cell(0, "RESOURCE"), Some(&json!("UNKNOWN")));
}

#[test]
fn test_mapping_source_acts_as_alias_without_alias_table() {
    let steps = vec![create_step_with_meta("s1", 1, "CUT-01", json!({"WORK_CENTER": "WC-7"}))];
    let config = ResolutionConfig::default()
        .with_mapping_rows(vec![MappingRow::new("WORK_CENTER", "wc")]);

    let dataset = ExportResolver::new().resolve(&steps, &config);
    assert_eq!(dataset.cell(0, "wc"), Some(&json!("WC-7")));
}

#[test]
fn test_case_variants_are_tried() {
    let steps = vec![create_step_with_meta("s1", 1, "CUT-01", json!({"res_cd": "m-lower"}))];
    let config = ResolutionConfig::default()
        .with_mapping_rows(vec![MappingRow::new("x", "RES_CD")]);

    let dataset = ExportResolver::new().resolve(&steps, &config);
    // 列名 RES_CD 原样未命中，大写未命中，小写命中
    assert_eq!(dataset.cell(0, "RES_CD"), Some(&json!("m-lower")));
}

// ==========================================
// 工序组
// ==========================================

#[test]
fn test_process_group_fixed_value_is_last_tier() {
    let steps = vec![create_step_with_meta("s1", 1, "CUT-01", json!({"PLANT": "P-STEP"})), create_step("s2", 2, "MILL-02")];
    let group = create_group(json!({"PLANT": "P-FIXED", "factory": "F1"}), &[("FACTORY", Some("工厂"))]);
    let config = ResolutionConfig::default().with_process_group(group);

    let dataset = ExportResolver::new().resolve(&steps, &config);

    assert_eq!(dataset.cell(0, "PLANT"), Some(&json!("P-STEP")));
    assert_eq!(dataset.cell(1, "PLANT"), Some(&json!("P-FIXED")));
    // 固定值键大小写不敏感
    assert_eq!(dataset.cell(0, "FACTORY"), Some(&json!("F1")));
    assert_eq!(dataset.header_label("FACTORY"), "工厂");
    assert_eq!(dataset.header_label("PROC_CD"), "PROC_CD");
}

// ==========================================
// 列清单
// ==========================================

#[test]
fn test_column_union_order() {
    let steps = vec![create_step_with_meta("s1", 1, "CUT-01", json!({"ZETA": 1}))];
    let group = create_group(json!({}), &[("GROUP_COL", None)]);
    let config = ResolutionConfig::default()
        .with_mapping_rows(vec![
            MappingRow::new("PROC_CD", " OP_CODE "),
            MappingRow::new("PROC_SEQ", "PROC_SEQ"),
            MappingRow::new("", ""),
        ])
        .with_process_group(group);

    let columns = ExportResolver::new().resolve_columns(&steps, &config);

    assert_eq!(&columns[..3], &["OP_CODE", "PROC_SEQ", "PROC_CD"]);
    assert!(columns.contains(&"ZETA".to_string()));
    assert_eq!(columns.last().map(String::as_str), Some("GROUP_COL"));
    let unique: std::collections::HashSet<_> = columns.iter().collect();
    assert_eq!(unique.len(), columns.len());
}

#[test]
fn test_default_columns_used_without_mapping_rows() {
    let config = ResolutionConfig::default()
        .with_default_columns(vec!["CUSTOM_A".to_string(), "PROC_CD".to_string()]);
    let columns = ExportResolver::new().resolve_columns(&[], &config);
    assert_eq!(&columns[..2], &["CUSTOM_A", "PROC_CD"]);
}

#[test]
fn test_empty_union_falls_back_to_builtin_columns() {
    let mut config = ResolutionConfig::default();
    config.fallback_columns.clear();
    let dataset = ExportResolver::new().resolve(&[], &config);
    assert_eq!(dataset.columns[0], "PROC_SEQ");
    assert_eq!(dataset.columns.len(), 6);
    assert!(dataset.is_empty());
}

// ==========================================
// 覆盖性与过滤
// ==========================================

#[test]
fn test_every_cell_is_present() {
    let steps = vec![
        create_step_with_meta("s1", 1, "CUT-01", json!({"ONLY_ON_FIRST": "x"})),
        create_step("s2", 2, "MILL-02"),
        create_step_with_meta("s3", 3, "DRILL-03", json!({"sqlValues": {"SQL_ONLY": 9}})),
    ];
    let dataset = ExportResolver::new().resolve(&steps, &ResolutionConfig::default());

    assert_eq!(dataset.rows.len(), 3);
    for row in &dataset.rows {
        assert_eq!(row.cells.len(), dataset.columns.len());
    }
    assert_eq!(dataset.cell(1, "ONLY_ON_FIRST"), Some(&Value::Null));
    assert_eq!(dataset.cell(2, "SQL_ONLY"), Some(&json!(9)));
    assert_eq!(dataset.cell(1, "PROC_DESC"), Some(&Value::Null));
}

#[test]
fn test_filter_keeps_matching_steps_only() {
    let mut a = create_step("s1", 1, "CUT-01");
    a.routing_set_code = Some("A".to_string());
    let b = create_step("s2", 2, "MILL-02");

    let filter = MatrixFilter {
        routing_set_code: Some("A".to_string()),
        ..Default::default()
    };
    let dataset = ExportResolver::new()
        .resolve(&[a.clone(), b.clone()], &ResolutionConfig::default().with_filter(filter));
    assert_eq!(dataset.rows.len(), 1);
    assert_eq!(dataset.rows[0].step_id, "s1");
    assert_eq!(dataset.cell(0, "ROUTING_SET_CD"), Some(&json!("A")));

    // 无过滤时无代码的步骤同样输出
    let all = ExportResolver::new().resolve(&[a, b], &ResolutionConfig::default());
    assert_eq!(all.rows.len(), 2);
    assert_eq!(all.cell(1, "ROUTING_SET_CD"), Some(&Value::Null));
}

// ==========================================
// 登记顺序
// ==========================================

#[test]
fn test_step_fields_win_over_metadata_by_default() {
    let step = create_step_with_meta(
        "s1",
        1,
        "CUT-01",
        json!({"PROC_CD": "META-CODE", "extra": {"NOTE": "from-extra"}, "NOTE": ""}),
    );
    let dataset = ExportResolver::new().resolve(&[step], &ResolutionConfig::default());

    assert_eq!(dataset.cell(0, "PROC_CD"), Some(&json!("CUT-01")));
    // 顶层空值不阻挡 extra 中的非空值
    assert_eq!(dataset.cell(0, "NOTE"), Some(&json!("from-extra")));
    assert!(dataset.column_index("extra").is_none());
}

#[test]
fn test_registration_order_is_configurable() {
    let step = create_step_with_meta("s1", 1, "CUT-01", json!({"PROC_CD": "META-CODE"}));
    let config = ResolutionConfig::default().with_registration_order(vec![
        RegistrationTier::Metadata,
        RegistrationTier::StepFields,
    ]);
    let dataset = ExportResolver::new().resolve(&[step], &config);
    assert_eq!(dataset.cell(0, "PROC_CD"), Some(&json!("META-CODE")));
}

#[test]
fn test_registry_first_non_empty_write_wins() {
    let mut registry = SourceRegistry::new();
    assert!(!registry.register("K", Value::Null));
    assert!(registry.contains_key("K"));
    assert!(registry.register("K", json!("first")));
    assert!(!registry.register("K", json!("second")));
    assert_eq!(registry.get("K"), Some(&json!("first")));
    assert!(!registry.register("  ", json!("x")));
    assert_eq!(registry.len(), 1);
}

// ==========================================
// 类型转换与必填
// ==========================================

#[test]
fn test_mapping_type_coercion() {
    let step = create_step_with_meta(
        "s1",
        1,
        "CUT-01",
        json!({"QTY": "12", "RATE": "1.5", "ACTIVE": "Y", "CODE": 7, "BAD": "abc"}),
    );
    let config = ResolutionConfig::default().with_mapping_rows(vec![
        MappingRow::new("QTY", "QTY").with_type(MappingType::Integer),
        MappingRow::new("RATE", "RATE").with_type(MappingType::Number),
        MappingRow::new("ACTIVE", "ACTIVE").with_type(MappingType::Boolean),
        MappingRow::new("CODE", "CODE").with_type(MappingType::String),
        MappingRow::new("BAD", "BAD").with_type(MappingType::Number),
    ]);
    let dataset = ExportResolver::new().resolve(&[step], &config);

    assert_eq!(dataset.cell(0, "QTY"), Some(&json!(12)));
    assert_eq!(dataset.cell(0, "RATE"), Some(&json!(1.5)));
    assert_eq!(dataset.cell(0, "ACTIVE"), Some(&json!(true)));
    assert_eq!(dataset.cell(0, "CODE"), Some(&json!("7")));
    assert_eq!(dataset.cell(0, "BAD"), Some(&json!("abc")));
}

#[test]
fn test_required_null_cells_reported_as_gaps() {
    let steps = vec![
        create_step_with_meta("s1", 1, "CUT-01", json!({"RES_CD": "M01"})),
        create_step("s2", 2, "MILL-02"),
    ];
    let config = ResolutionConfig::default()
        .with_mapping_rows(vec![MappingRow::new("RES_CD", "RESOURCE").required()]);

    let dataset = ExportResolver::new().resolve(&steps, &config);

    assert_eq!(dataset.rows.len(), 2);
    assert_eq!(dataset.gaps.len(), 1);
    assert_eq!(dataset.gaps[0].step_id, "s2");
    assert_eq!(dataset.gaps[0].column, "RESOURCE");
}
