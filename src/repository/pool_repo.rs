// ==========================================
// 报名分配引擎 - 容量池数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 表: slot_pool (池) + pool_slot (展位)
// ==========================================

use crate::db::{format_datetime, parse_datetime};
use crate::domain::pool::{Slot, SlotPool};
use crate::domain::stand_code::StandCodeScheme;
use crate::domain::types::{PoolKind, PoolMode};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// SlotPoolRepository - 容量池仓储
// ==========================================
pub struct SlotPoolRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SlotPoolRepository {
    /// 从共享连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入容量池及其全部展位
    pub fn insert(&self, pool: &SlotPool) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        insert_pool(&tx, pool)?;
        tx.commit()?;
        Ok(())
    }

    /// 按池ID查询 (含展位)
    ///
    /// # 返回
    /// - Ok(Some(SlotPool)): 找到
    /// - Ok(None): 未找到
    /// - Err: 数据库错误
    pub fn find_by_id(&self, pool_id: &str) -> RepositoryResult<Option<SlotPool>> {
        let conn = self.get_conn()?;
        load_pool(&conn, pool_id)
    }

    /// 查询全部容量池 (按创建时间)
    pub fn list_all(&self) -> RepositoryResult<Vec<SlotPool>> {
        let conn = self.get_conn()?;
        let ids = {
            let mut stmt =
                conn.prepare("SELECT pool_id FROM slot_pool ORDER BY created_at, pool_id")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<SqliteResult<Vec<String>>>()?;
            ids
        };

        let mut pools = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(pool) = load_pool(&conn, &id)? {
                pools.push(pool);
            }
        }
        Ok(pools)
    }

    /// 删除容量池 (展位与报名记录级联删除)
    ///
    /// # 返回
    /// - Ok(rows): 被删除的池数量 (0 或 1)
    pub fn delete(&self, pool_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM slot_pool WHERE pool_id = ?1", params![pool_id])?;
        Ok(rows)
    }
}

// ==========================================
// 连接级辅助函数 (可在事务内调用)
// ==========================================

/// 插入池行及全部展位
pub(crate) fn insert_pool(conn: &Connection, pool: &SlotPool) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO slot_pool (
            pool_id, kind, mode, capacity, stand_row_width, stand_number_width,
            created_at, updated_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            pool.pool_id,
            pool.kind.as_str(),
            pool.mode.as_str(),
            pool.capacity,
            pool.code_scheme.row_width,
            pool.code_scheme.number_width as i64,
            format_datetime(&pool.created_at),
            format_datetime(&pool.updated_at),
        ],
    )?;

    for slot in &pool.slots {
        upsert_slot(conn, &pool.pool_id, slot)?;
    }
    Ok(())
}

/// 保存池的最新状态: 更新池行、写入展位、删除已移除的展位
pub(crate) fn save_pool(conn: &Connection, pool: &SlotPool) -> RepositoryResult<()> {
    let affected = conn.execute(
        "UPDATE slot_pool SET capacity = ?2, updated_at = ?3 WHERE pool_id = ?1",
        params![pool.pool_id, pool.capacity, format_datetime(&pool.updated_at)],
    )?;
    if affected == 0 {
        return Err(RepositoryError::NotFound {
            entity: "SlotPool".to_string(),
            id: pool.pool_id.clone(),
        });
    }

    conn.execute(
        "DELETE FROM pool_slot WHERE pool_id = ?1 AND position >= ?2",
        params![pool.pool_id, pool.slots.len() as i64],
    )?;

    for slot in &pool.slots {
        upsert_slot(conn, &pool.pool_id, slot)?;
    }
    Ok(())
}

fn upsert_slot(conn: &Connection, pool_id: &str, slot: &Slot) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO pool_slot (slot_id, pool_id, position, code, occupied)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(slot_id) DO UPDATE SET occupied = excluded.occupied
        "#,
        params![slot.slot_id, pool_id, slot.position, slot.code, slot.occupied],
    )?;
    Ok(())
}

/// 读取池及其展位
pub(crate) fn load_pool(conn: &Connection, pool_id: &str) -> RepositoryResult<Option<SlotPool>> {
    let pool = conn
        .query_row(
            r#"
            SELECT pool_id, kind, mode, capacity, stand_row_width, stand_number_width,
                   created_at, updated_at
            FROM slot_pool
            WHERE pool_id = ?1
            "#,
            params![pool_id],
            |row| {
                let kind_raw: String = row.get(1)?;
                let mode_raw: String = row.get(2)?;
                Ok(SlotPool {
                    pool_id: row.get(0)?,
                    kind: PoolKind::parse(&kind_raw)
                        .ok_or_else(|| invalid_text(1, "kind", &kind_raw))?,
                    mode: PoolMode::parse(&mode_raw)
                        .ok_or_else(|| invalid_text(2, "mode", &mode_raw))?,
                    capacity: row.get(3)?,
                    code_scheme: StandCodeScheme::new(
                        row.get(4)?,
                        row.get::<_, u32>(5)? as usize,
                    ),
                    slots: Vec::new(),
                    created_at: parse_datetime(6, &row.get::<_, String>(6)?)?,
                    updated_at: parse_datetime(7, &row.get::<_, String>(7)?)?,
                })
            },
        )
        .optional()?;

    let Some(mut pool) = pool else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        r#"
        SELECT slot_id, position, code, occupied
        FROM pool_slot
        WHERE pool_id = ?1
        ORDER BY position
        "#,
    )?;
    pool.slots = stmt
        .query_map(params![pool_id], |row| {
            Ok(Slot {
                slot_id: row.get(0)?,
                position: row.get(1)?,
                code: row.get(2)?,
                occupied: row.get(3)?,
            })
        })?
        .collect::<SqliteResult<Vec<Slot>>>()?;

    Ok(Some(pool))
}

pub(crate) fn invalid_text(idx: usize, field: &str, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("{} 字段值无效: {}", field, raw).into(),
    )
}
