// ==========================================
// 报名分配引擎 - 分配存储接口
// ==========================================
// 职责: 引擎消费的持久化接口 (池 + 报名记录的读取与原子写入)
// 实现者: SqliteAllocationStore (rusqlite)
// 说明: 存储层不做并发控制, 按池串行化由引擎负责
// ==========================================

use crate::domain::enrollment::EnrollmentRecord;
use crate::domain::pool::SlotPool;
use crate::domain::snapshot::PoolSnapshot;
use crate::repository::enrollment_repo::{self, EnrollmentRepository};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::pool_repo::{self, SlotPoolRepository};
use chrono::NaiveDateTime;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

// ==========================================
// PoolChange - 一次状态迁移的写集
// ==========================================
/// 需要原子写入的变更: 要么全部成功, 要么全部回滚
#[derive(Debug, Clone, Default)]
pub struct PoolChange {
    pub pool: Option<SlotPool>,
    pub inserted: Vec<EnrollmentRecord>,
    pub updated: Vec<EnrollmentRecord>,
}

impl PoolChange {
    pub fn is_empty(&self) -> bool {
        self.pool.is_none() && self.inserted.is_empty() && self.updated.is_empty()
    }
}

// ==========================================
// AllocationStore Trait
// ==========================================
pub trait AllocationStore: Send + Sync {
    /// 创建池 (含展位)
    fn create_pool(&self, pool: &SlotPool) -> RepositoryResult<()>;

    /// 读取池 (含展位)
    fn load_pool(&self, pool_id: &str) -> RepositoryResult<Option<SlotPool>>;

    /// 读取池快照 (池 + 全部报名, 同一次加锁内读取)
    fn load_snapshot(&self, pool_id: &str) -> RepositoryResult<Option<PoolSnapshot>>;

    /// 全部池
    fn list_pools(&self) -> RepositoryResult<Vec<SlotPool>>;

    /// 删除池 (报名记录随池删除)
    fn delete_pool(&self, pool_id: &str) -> RepositoryResult<usize>;

    fn load_enrollment(&self, enrollment_id: &str) -> RepositoryResult<Option<EnrollmentRecord>>;

    fn list_subject_enrollments(&self, subject_id: &str) -> RepositoryResult<Vec<EnrollmentRecord>>;

    /// 早于 cutoff 仍为 pending 的报名
    fn list_pending_before(&self, cutoff: NaiveDateTime) -> RepositoryResult<Vec<EnrollmentRecord>>;

    /// 原子写入一次变更
    fn apply(&self, change: &PoolChange) -> RepositoryResult<()>;
}

// ==========================================
// SqliteAllocationStore - SQLite 实现
// ==========================================
pub struct SqliteAllocationStore {
    conn: Arc<Mutex<Connection>>,
    pool_repo: SlotPoolRepository,
    enrollment_repo: EnrollmentRepository,
}

impl SqliteAllocationStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            pool_repo: SlotPoolRepository::new(conn.clone()),
            enrollment_repo: EnrollmentRepository::new(conn.clone()),
            conn,
        }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

impl AllocationStore for SqliteAllocationStore {
    fn create_pool(&self, pool: &SlotPool) -> RepositoryResult<()> {
        self.pool_repo.insert(pool)
    }

    fn load_pool(&self, pool_id: &str) -> RepositoryResult<Option<SlotPool>> {
        self.pool_repo.find_by_id(pool_id)
    }

    fn load_snapshot(&self, pool_id: &str) -> RepositoryResult<Option<PoolSnapshot>> {
        let conn = self.get_conn()?;
        let Some(pool) = pool_repo::load_pool(&conn, pool_id)? else {
            return Ok(None);
        };
        let enrollments = enrollment_repo::list_by_pool(&conn, pool_id)?;
        Ok(Some(PoolSnapshot { pool, enrollments }))
    }

    fn list_pools(&self) -> RepositoryResult<Vec<SlotPool>> {
        self.pool_repo.list_all()
    }

    fn delete_pool(&self, pool_id: &str) -> RepositoryResult<usize> {
        self.pool_repo.delete(pool_id)
    }

    fn load_enrollment(&self, enrollment_id: &str) -> RepositoryResult<Option<EnrollmentRecord>> {
        self.enrollment_repo.find_by_id(enrollment_id)
    }

    fn list_subject_enrollments(&self, subject_id: &str) -> RepositoryResult<Vec<EnrollmentRecord>> {
        self.enrollment_repo.list_by_subject(subject_id)
    }

    fn list_pending_before(&self, cutoff: NaiveDateTime) -> RepositoryResult<Vec<EnrollmentRecord>> {
        self.enrollment_repo.list_pending_before(cutoff)
    }

    fn apply(&self, change: &PoolChange) -> RepositoryResult<()> {
        if change.is_empty() {
            return Ok(());
        }

        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        // 先释放 (update) 再占用 (insert), 避免展位唯一索引的瞬时冲突
        for record in &change.updated {
            enrollment_repo::update_enrollment(&tx, record)?;
        }
        if let Some(pool) = &change.pool {
            pool_repo::save_pool(&tx, pool)?;
        }
        for record in &change.inserted {
            enrollment_repo::insert_enrollment(&tx, record)?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use crate::domain::capacity_policy::CapacityPolicy;
    use crate::domain::stand_code::StandCodeScheme;
    use crate::domain::types::{EnrollmentStatus, PoolKind};
    use chrono::NaiveDate;

    fn setup_store() -> SqliteAllocationStore {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        SqliteAllocationStore::new(Arc::new(Mutex::new(conn)))
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 6, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_apply_writes_pool_and_record_together() {
        let store = setup_store();
        let policy = CapacityPolicy::new(PoolKind::InternalFair, 2).unwrap();
        let mut pool = SlotPool::create("FAIR-1", &policy, &StandCodeScheme::default(), now());
        store.create_pool(&pool).unwrap();

        let slot = pool.reserve().unwrap();
        let record = EnrollmentRecord::new(
            "FAIR-1",
            "exhibitor-1",
            EnrollmentStatus::Pending,
            Some(slot.slot_id.clone()),
            now(),
        );
        let change = PoolChange {
            pool: Some(pool.clone()),
            inserted: vec![record.clone()],
            updated: vec![],
        };
        store.apply(&change).unwrap();

        let snapshot = store.load_snapshot("FAIR-1").unwrap().unwrap();
        assert_eq!(snapshot.pool.occupied_count(), 1);
        assert_eq!(snapshot.enrollments, vec![record]);
        assert_eq!(snapshot.active_count(), 1);
    }

    #[test]
    fn test_failed_apply_rolls_back_pool_update() {
        let store = setup_store();
        let policy = CapacityPolicy::new(PoolKind::InternalFair, 2).unwrap();
        let mut pool = SlotPool::create("FAIR-2", &policy, &StandCodeScheme::default(), now());
        store.create_pool(&pool).unwrap();

        pool.reserve().unwrap();
        // 池已写入后插入记录触发外键失败 → 整个事务回滚
        let orphan = EnrollmentRecord::new("NO-SUCH-POOL", "ghost", EnrollmentStatus::Pending, None, now());
        let change = PoolChange {
            pool: Some(pool),
            inserted: vec![orphan],
            updated: vec![],
        };
        assert!(store.apply(&change).is_err());

        let reloaded = store.load_pool("FAIR-2").unwrap().unwrap();
        assert_eq!(reloaded.occupied_count(), 0);
    }

    #[test]
    fn test_snapshot_of_missing_pool_is_none() {
        let store = setup_store();
        assert!(store.load_snapshot("nope").unwrap().is_none());
        assert!(store.apply(&PoolChange::default()).is_ok());
    }
}
