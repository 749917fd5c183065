// ==========================================
// 报名分配引擎 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为 (外键、busy_timeout)
// - 统一建表 (幂等), 统一时间戳格式
// ==========================================

use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 2;

/// 时间戳存储格式 (微秒精度, 保证同一秒内的报名顺序)
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const DATETIME_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化数据库 schema (幂等)
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS slot_pool (
            pool_id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            mode TEXT NOT NULL,
            capacity INTEGER NOT NULL CHECK (capacity >= 0),
            stand_row_width INTEGER NOT NULL DEFAULT 10,
            stand_number_width INTEGER NOT NULL DEFAULT 2,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS pool_slot (
            slot_id TEXT PRIMARY KEY,
            pool_id TEXT NOT NULL REFERENCES slot_pool(pool_id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            code TEXT NOT NULL,
            occupied INTEGER NOT NULL DEFAULT 0,
            UNIQUE (pool_id, position),
            UNIQUE (pool_id, code)
        );

        CREATE TABLE IF NOT EXISTS enrollment (
            enrollment_id TEXT PRIMARY KEY,
            pool_id TEXT NOT NULL REFERENCES slot_pool(pool_id) ON DELETE CASCADE,
            subject_id TEXT NOT NULL,
            status TEXT NOT NULL,
            slot_ref TEXT,
            requested_at TEXT NOT NULL,
            decided_at TEXT,
            decision_reason TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_enrollment_pool ON enrollment(pool_id, status);
        CREATE INDEX IF NOT EXISTS idx_enrollment_subject ON enrollment(subject_id);

        -- 同一展位最多被一条 pending/approved 记录持有
        CREATE UNIQUE INDEX IF NOT EXISTS idx_enrollment_slot_holder
            ON enrollment(slot_ref)
            WHERE slot_ref IS NOT NULL AND status IN ('pending', 'approved');

        CREATE TABLE IF NOT EXISTS action_log (
            action_id TEXT PRIMARY KEY,
            pool_id TEXT NOT NULL,
            enrollment_id TEXT,
            action_type TEXT NOT NULL,
            action_ts TEXT NOT NULL,
            actor TEXT NOT NULL,
            payload_json TEXT,
            detail TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_action_log_pool_ts ON action_log(pool_id, action_ts);
        CREATE INDEX IF NOT EXISTS idx_action_log_enrollment ON action_log(enrollment_id);
        "#,
    )?;
    ensure_slot_pool_scheme_columns(conn)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// v1 → v2: slot_pool 增加建池时的编号规则列
///
/// v1 库中的池按默认编号规则补齐
fn ensure_slot_pool_scheme_columns(conn: &Connection) -> rusqlite::Result<()> {
    let has_col: i32 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info('slot_pool') WHERE name = 'stand_row_width'",
        [],
        |row| row.get(0),
    )?;
    if has_col > 0 {
        return Ok(());
    }

    tracing::info!("迁移 slot_pool: 增加编号规则列");
    conn.execute_batch(
        r#"
        ALTER TABLE slot_pool ADD COLUMN stand_row_width INTEGER NOT NULL DEFAULT 10;
        ALTER TABLE slot_pool ADD COLUMN stand_number_width INTEGER NOT NULL DEFAULT 2;
        "#,
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 时间戳 → 存储字符串
pub fn format_datetime(ts: &NaiveDateTime) -> String {
    ts.format(DATETIME_FORMAT).to_string()
}

/// 存储字符串 → 时间戳 (用于 row 映射, 解析失败返回转换错误)
pub fn parse_datetime(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_PARSE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
