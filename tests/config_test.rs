// ==========================================
// 配置集成测试
// ==========================================
// 测试目标: 配置文件取值驱动工作区行为
// ==========================================


use routing_designer::app::AppState;
use routing_designer::config::ConfigManager;
use routing_designer::engine::CustomOperationForm;
use test_helpers::{append_all, write_temp_file, OperationBuilder};

fn manager(json: &str) -> ConfigManager {
    let file = write_temp_file(".json", json);
    ConfigManager::load_from_path(file.path()).expect("Failed to load config")
}

#[test]
fn test_pitch_and_origin_drive_drop_index() {
    let manager = manager(r#"{"step_pitch_px": 100.0, "drop_origin_px": 40.0}"#);
    let mut state = AppState::in_memory(manager.config().clone());
    let ws = state.activate_item("ITEM-1");
    append_all(
        ws,
        vec![
            OperationBuilder::new("A", 1).build(),
            OperationBuilder::new("B", 2).build(),
        ],
    );

    assert_eq!(ws.drop_index(30.0), 0);
    assert_eq!(ws.drop_index(140.0), 1);
    assert_eq!(ws.drop_index(239.0), 1);
    assert_eq!(ws.drop_index(5_000.0), 2);
}

#[test]
fn test_retain_policy_readds_detached_edit() {
    let manager = manager(r#"{"stale_edit_policy": "retain"}"#);
    let mut state = AppState::in_memory(manager.config().clone());
    let ws = state.activate_item("ITEM-1");
    let key = ws.bucket_key(None);

    let form = CustomOperationForm {
        process_code: "CUT".to_string(),
        seq: "1".to_string(),
        ..Default::default()
    };
    let entry = ws.add_custom(&key, &form).unwrap();
    ws.begin_edit(&key, &entry.id).unwrap();
    ws.remove_custom(&key, &entry.id).unwrap();

    let session = ws.edit_session().expect("retain 策略下编辑会话保留");
    assert!(session.entry_id.is_none());

    let readded = ws.commit_edit().unwrap().unwrap();
    assert_ne!(readded.id, entry.id);
    assert_eq!(ws.visible_operations(&key, None).len(), 1);
}

#[test]
fn test_discard_policy_drops_edit() {
    let mut state = AppState::in_memory(ConfigManager::default().config().clone());
    let ws = state.activate_item("ITEM-1");
    let key = ws.bucket_key(None);

    let form = CustomOperationForm {
        process_code: "CUT".to_string(),
        seq: "1".to_string(),
        ..Default::default()
    };
    let entry = ws.add_custom(&key, &form).unwrap();
    ws.begin_edit(&key, &entry.id).unwrap();
    ws.remove_custom(&key, &entry.id).unwrap();

    assert!(ws.edit_session().is_none());
    assert!(ws.commit_edit().unwrap().is_none());
    assert!(ws.visible_operations(&key, None).is_empty());
}

#[test]
fn test_fallback_columns_from_config() {
    let manager = manager(r#"{"fallback_columns": ["PROC_CD", "EXTRA_COL"]}"#);
    let mut state = AppState::in_memory(manager.config().clone());
    let ws = state.activate_item("ITEM-1");
    append_all(ws, vec![OperationBuilder::new("A", 1).build()]);

    let dataset = ws.resolve_export(&ws.resolution_config());
    assert_eq!(&dataset.columns[..2], &["PROC_CD", "EXTRA_COL"]);
    assert_eq!(dataset.cell(0, "EXTRA_COL"), Some(&serde_json::Value::Null));
}
