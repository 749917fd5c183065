// ==========================================
// 报名分配引擎 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 说明: 单进程单连接, 引擎与查询服务共享同一池锁注册表
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{EnrollmentApi, PoolApi, PostCommit};
use crate::config::{AllocationConfig, ConfigManager};
use crate::db::{init_schema, open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};
use crate::engine::{
    AllocationEngine, Clock, EnrollmentEventPublisher, OptionalEventPublisher, PendingSweeper,
    QueryService, SystemClock,
};
use crate::repository::{ActionLogRepository, AllocationStore, SqliteAllocationStore};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 启动时加载的引擎配置
    pub config: AllocationConfig,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 分配引擎
    pub engine: Arc<AllocationEngine>,

    /// 查询服务
    pub query: Arc<QueryService>,

    /// pending 过期清理
    pub sweeper: Arc<PendingSweeper>,

    /// 容量池API
    pub pool_api: Arc<PoolApi>,

    /// 报名API
    pub enrollment_api: Arc<EnrollmentApi>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 使用系统时钟、不发布事件创建 AppState
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::with_dependencies(db_path, Arc::new(SystemClock), None)
    }

    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    /// - clock: 时间戳来源
    /// - event_publisher: 通知层 (None 表示不发布)
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并初始化表结构
    /// 2. 从 config_kv 加载引擎配置
    /// 3. 初始化存储、引擎、查询服务
    /// 4. 创建所有API实例
    pub fn with_dependencies(
        db_path: String,
        clock: Arc<dyn Clock>,
        event_publisher: Option<Arc<dyn EnrollmentEventPublisher>>,
    ) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        // 创建数据库连接（共享连接）
        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("无法初始化数据库表结构: {}", e))?;
        check_schema_version(&conn)?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let config = config_manager
            .get_allocation_config()
            .map_err(|e| format!("无法加载引擎配置: {}", e))?;
        tracing::info!("引擎配置: {:?}", config);

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let store: Arc<dyn AllocationStore> = Arc::new(SqliteAllocationStore::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let engine = Arc::new(AllocationEngine::new(store.clone(), clock.clone(), config));
        let query = Arc::new(QueryService::new(store, engine.locks()));
        let sweeper = Arc::new(PendingSweeper::new(
            engine.clone(),
            query.clone(),
            config.pending_expiry_hours,
        ));

        let events = match event_publisher {
            Some(publisher) => OptionalEventPublisher::with_publisher(publisher),
            None => OptionalEventPublisher::none(),
        };
        let post_commit = Arc::new(PostCommit::new(action_log_repo.clone(), events, clock));

        // ==========================================
        // 初始化API层
        // ==========================================
        let pool_api = Arc::new(PoolApi::new(
            engine.clone(),
            query.clone(),
            action_log_repo.clone(),
            post_commit.clone(),
        ));
        let enrollment_api = Arc::new(EnrollmentApi::new(
            engine.clone(),
            query.clone(),
            sweeper.clone(),
            post_commit,
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            config,
            config_manager,
            engine,
            query,
            sweeper,
            pool_api,
            enrollment_api,
            action_log_repo,
        })
    }
}

/// 校验数据库 schema 版本
///
/// 数据库版本高于代码期望时拒绝启动 (旧程序不能写新库)
fn check_schema_version(conn: &rusqlite::Connection) -> Result<(), String> {
    match read_schema_version(conn).map_err(|e| format!("无法读取schema版本: {}", e))? {
        Some(v) if v > CURRENT_SCHEMA_VERSION => Err(format!(
            "数据库schema版本({})高于程序支持的版本({})",
            v, CURRENT_SCHEMA_VERSION
        )),
        Some(v) if v < CURRENT_SCHEMA_VERSION => {
            tracing::warn!(
                "数据库schema版本({})低于期望版本({})",
                v,
                CURRENT_SCHEMA_VERSION
            );
            Ok(())
        }
        Some(_) => Ok(()),
        None => {
            tracing::warn!("数据库缺少 schema_version 记录");
            Ok(())
        }
    }
}

/// 默认数据库路径
///
/// 优先级: 环境变量 ENROLLMENT_ENGINE_DB_PATH → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("ENROLLMENT_ENGINE_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./enrollment_allocation.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        let dir = data_dir.join("enrollment-allocation-dev");

        #[cfg(not(debug_assertions))]
        let dir = data_dir.join("enrollment-allocation");

        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("enrollment_allocation.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_on_temp_db() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let db_path = temp.path().to_string_lossy().to_string();

        let state = AppState::new(db_path.clone()).unwrap();
        assert_eq!(state.db_path, db_path);
        assert_eq!(state.config, AllocationConfig::default());
        assert!(!state.sweeper.is_enabled());
        assert!(state.pool_api.list_pools().unwrap().is_empty());
    }

    #[test]
    fn test_newer_schema_version_is_refused() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let db_path = temp.path().to_string_lossy().to_string();
        {
            let conn = open_sqlite_connection(&db_path).unwrap();
            init_schema(&conn).unwrap();
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [CURRENT_SCHEMA_VERSION + 1],
            )
            .unwrap();
        }

        let err = AppState::new(db_path).err().unwrap();
        assert!(err.contains("schema"));
    }
}
