// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 验证配置读取与 AppState 装配时的生效时机
// ==========================================


use enrollment_allocation::app::AppState;
use enrollment_allocation::config::{config_keys, AllocationConfig, ConfigManager};
use enrollment_allocation::engine::FixedClock;
use std::sync::Arc;
use test_helpers::{create_test_db, setup_env_with, start_time, RecordingPublisher};

#[test]
fn test_config_manager_defaults_on_empty_table() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    let config = config_manager.get_allocation_config().unwrap();
    assert_eq!(config, AllocationConfig::default());
    assert!(!config.pending_expiry_enabled());
}

#[test]
fn test_config_overrides_persist_across_managers() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    {
        let writer = ConfigManager::new(&db_path).unwrap();
        writer
            .set_global_config_value(config_keys::PENDING_EXPIRY_HOURS, "48")
            .unwrap();
        writer
            .set_global_config_value(config_keys::STAND_NUMBER_WIDTH, "3")
            .unwrap();
    }

    let reader = ConfigManager::new(&db_path).unwrap();
    let config = reader.get_allocation_config().unwrap();
    assert_eq!(config.pending_expiry_hours, 48);
    assert_eq!(config.stand_number_width, 3);
    assert_eq!(config.stand_code_scheme().code_for(0), "A001");
}

#[test]
fn test_config_is_read_when_state_is_built() {
    let env = setup_env_with(
        &[
            (config_keys::STAND_ROW_WIDTH, "2"),
            (config_keys::LOCK_RESIZE_WHEN_CONFIRMED, "false"),
        ],
        RecordingPublisher::default(),
    );
    assert_eq!(env.state.config.stand_row_width, 2);
    assert!(!env.state.config.lock_resize_when_confirmed);

    env.state
        .pool_api
        .create_pool("FAIR-1", "internal_fair", 3, "admin")
        .unwrap();
    let codes: Vec<String> = env
        .state
        .pool_api
        .occupancy_map("FAIR-1")
        .unwrap()
        .into_iter()
        .map(|s| s.slot_code)
        .collect();
    assert_eq!(codes, vec!["A01", "A02", "B01"]);

    // 已建的池沿用建池时的编号规则
    env.state
        .config_manager
        .set_global_config_value(config_keys::STAND_ROW_WIDTH, "10")
        .unwrap();
    env.state.pool_api.resize("FAIR-1", 4, "admin").unwrap();
    let last = env
        .state
        .pool_api
        .occupancy_map("FAIR-1")
        .unwrap()
        .pop()
        .unwrap();
    assert_eq!(last.slot_code, "B02");
}

#[test]
fn test_pool_keeps_code_scheme_after_config_change_and_restart() {
    let env = setup_env_with(
        &[(config_keys::STAND_ROW_WIDTH, "5")],
        RecordingPublisher::default(),
    );
    env.state
        .pool_api
        .create_pool("FAIR-1", "internal_fair", 10, "admin")
        .unwrap();

    env.state
        .config_manager
        .set_global_config_value(config_keys::STAND_ROW_WIDTH, "10")
        .unwrap();
    let restarted = AppState::with_dependencies(
        env.db_path.clone(),
        Arc::new(FixedClock::new(start_time())),
        None,
    )
    .unwrap();
    assert_eq!(restarted.config.stand_row_width, 10);

    let outcome = restarted.pool_api.resize("FAIR-1", 11, "admin").unwrap();
    assert!(outcome.changed);
    let codes: Vec<String> = restarted
        .pool_api
        .occupancy_map("FAIR-1")
        .unwrap()
        .into_iter()
        .map(|s| s.slot_code)
        .collect();
    assert_eq!(codes[4], "A05");
    assert_eq!(codes[9], "B05");
    assert_eq!(codes[10], "C01");

    // 新建的池使用新的编号规则
    restarted
        .pool_api
        .create_pool("FAIR-2", "internal_fair", 11, "admin")
        .unwrap();
    let last = restarted
        .pool_api
        .occupancy_map("FAIR-2")
        .unwrap()
        .pop()
        .unwrap();
    assert_eq!(last.slot_code, "B01");
}
