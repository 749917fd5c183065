// ==========================================
// 报名分配引擎 - 报名记录数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑, 不做状态合法性判断
// 表: enrollment
// ==========================================

use crate::db::{format_datetime, parse_datetime};
use crate::domain::enrollment::EnrollmentRecord;
use crate::domain::types::EnrollmentStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::pool_repo::invalid_text;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT enrollment_id, pool_id, subject_id, status, slot_ref,
           requested_at, decided_at, decision_reason
    FROM enrollment
"#;

// ==========================================
// EnrollmentRepository - 报名记录仓储
// ==========================================
pub struct EnrollmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EnrollmentRepository {
    /// 从共享连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按报名ID查询
    pub fn find_by_id(&self, enrollment_id: &str) -> RepositoryResult<Option<EnrollmentRecord>> {
        let conn = self.get_conn()?;
        find_enrollment(&conn, enrollment_id)
    }

    /// 查询池内全部报名 (按申请时间)
    pub fn list_by_pool(&self, pool_id: &str) -> RepositoryResult<Vec<EnrollmentRecord>> {
        let conn = self.get_conn()?;
        list_by_pool(&conn, pool_id)
    }

    /// 查询申请人的全部报名
    pub fn list_by_subject(&self, subject_id: &str) -> RepositoryResult<Vec<EnrollmentRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE subject_id = ?1 ORDER BY requested_at, enrollment_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![subject_id], map_row)?
            .collect::<SqliteResult<Vec<EnrollmentRecord>>>()?;
        Ok(records)
    }

    /// 查询早于指定时间仍为 pending 的报名 (过期清理用)
    pub fn list_pending_before(
        &self,
        cutoff: NaiveDateTime,
    ) -> RepositoryResult<Vec<EnrollmentRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE status = ?1 AND requested_at < ?2 ORDER BY requested_at, enrollment_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(
                params![EnrollmentStatus::Pending.as_str(), format_datetime(&cutoff)],
                map_row,
            )?
            .collect::<SqliteResult<Vec<EnrollmentRecord>>>()?;
        Ok(records)
    }
}

// ==========================================
// 连接级辅助函数 (可在事务内调用)
// ==========================================

pub(crate) fn find_enrollment(
    conn: &Connection,
    enrollment_id: &str,
) -> RepositoryResult<Option<EnrollmentRecord>> {
    let sql = format!("{} WHERE enrollment_id = ?1", SELECT_COLUMNS);
    let record = conn
        .query_row(&sql, params![enrollment_id], map_row)
        .optional()?;
    Ok(record)
}

pub(crate) fn list_by_pool(
    conn: &Connection,
    pool_id: &str,
) -> RepositoryResult<Vec<EnrollmentRecord>> {
    let sql = format!(
        "{} WHERE pool_id = ?1 ORDER BY requested_at, enrollment_id",
        SELECT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map(params![pool_id], map_row)?
        .collect::<SqliteResult<Vec<EnrollmentRecord>>>()?;
    Ok(records)
}

pub(crate) fn insert_enrollment(conn: &Connection, record: &EnrollmentRecord) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO enrollment (
            enrollment_id, pool_id, subject_id, status, slot_ref,
            requested_at, decided_at, decision_reason
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            record.enrollment_id,
            record.pool_id,
            record.subject_id,
            record.status.as_str(),
            record.slot_ref,
            format_datetime(&record.requested_at),
            record.decided_at.as_ref().map(format_datetime),
            record.decision_reason,
        ],
    )?;
    Ok(())
}

pub(crate) fn update_enrollment(conn: &Connection, record: &EnrollmentRecord) -> RepositoryResult<()> {
    let affected = conn.execute(
        r#"
        UPDATE enrollment
        SET status = ?2, slot_ref = ?3, decided_at = ?4, decision_reason = ?5
        WHERE enrollment_id = ?1
        "#,
        params![
            record.enrollment_id,
            record.status.as_str(),
            record.slot_ref,
            record.decided_at.as_ref().map(format_datetime),
            record.decision_reason,
        ],
    )?;
    if affected == 0 {
        return Err(RepositoryError::NotFound {
            entity: "EnrollmentRecord".to_string(),
            id: record.enrollment_id.clone(),
        });
    }
    Ok(())
}

fn map_row(row: &Row<'_>) -> SqliteResult<EnrollmentRecord> {
    let status_raw: String = row.get(3)?;
    let decided_raw: Option<String> = row.get(6)?;
    Ok(EnrollmentRecord {
        enrollment_id: row.get(0)?,
        pool_id: row.get(1)?,
        subject_id: row.get(2)?,
        status: EnrollmentStatus::parse(&status_raw)
            .ok_or_else(|| invalid_text(3, "status", &status_raw))?,
        slot_ref: row.get(4)?,
        requested_at: parse_datetime(5, &row.get::<_, String>(5)?)?,
        decided_at: decided_raw.map(|raw| parse_datetime(6, &raw)).transpose()?,
        decision_reason: row.get(7)?,
    })
}
