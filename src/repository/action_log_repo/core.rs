use crate::db::{format_datetime, parse_datetime};
use crate::domain::action_log::ActionLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT action_id, pool_id, enrollment_id, action_type, action_ts,
           actor, payload_json, detail
    FROM action_log
"#;

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    /// 创建新的操作日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入操作日志
    ///
    /// # 返回
    /// - `Ok(action_id)`: 成功插入
    /// - `Err(...)`: 数据库错误
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO action_log (
                action_id, pool_id, enrollment_id, action_type, action_ts,
                actor, payload_json, detail
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                log.action_id,
                log.pool_id,
                log.enrollment_id,
                log.action_type,
                format_datetime(&log.action_ts),
                log.actor,
                log.payload_json.as_ref().map(|v| v.to_string()),
                log.detail,
            ],
        )?;

        Ok(log.action_id.clone())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, action_id: &str) -> RepositoryResult<Option<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE action_id = ?1", SELECT_COLUMNS);
        let log = conn.query_row(&sql, params![action_id], map_row).optional()?;
        Ok(log)
    }

    /// 查询池的全部操作日志 (时间正序)
    pub fn list_by_pool(&self, pool_id: &str) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE pool_id = ?1 ORDER BY action_ts, action_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![pool_id], map_row)?
            .collect::<SqliteResult<Vec<ActionLog>>>()?;
        Ok(logs)
    }

    /// 查询单条报名的操作历史
    pub fn list_by_enrollment(&self, enrollment_id: &str) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE enrollment_id = ?1 ORDER BY action_ts, action_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![enrollment_id], map_row)?
            .collect::<SqliteResult<Vec<ActionLog>>>()?;
        Ok(logs)
    }

    /// 最近的操作日志 (时间倒序)
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY action_ts DESC, action_id LIMIT ?1", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![limit as i64], map_row)?
            .collect::<SqliteResult<Vec<ActionLog>>>()?;
        Ok(logs)
    }
}

fn map_row(row: &Row<'_>) -> SqliteResult<ActionLog> {
    let payload_raw: Option<String> = row.get(6)?;
    Ok(ActionLog {
        action_id: row.get(0)?,
        pool_id: row.get(1)?,
        enrollment_id: row.get(2)?,
        action_type: row.get(3)?,
        action_ts: parse_datetime(4, &row.get::<_, String>(4)?)?,
        actor: row.get(5)?,
        payload_json: payload_raw.and_then(|raw| serde_json::from_str(&raw).ok()),
        detail: row.get(7)?,
    })
}
