// ==========================================
// 报名分配引擎 - 查询服务
// ==========================================
// 职责: 可用容量 / 展位占用图 / 状态统计 / 看板摘要
// 红线: 每个投影只读一次快照, 与写操作在同一池锁下串行
// 口径: 容量计算统一走 PoolSnapshot
// ==========================================

use crate::domain::capacity_policy::Availability;
use crate::domain::enrollment::EnrollmentRecord;
use crate::domain::pool::SlotPool;
use crate::domain::snapshot::PoolSnapshot;
use crate::domain::types::{EnrollmentStatus, PoolKind, PoolMode};
use crate::engine::error::{AllocationError, AllocationResult};
use crate::engine::pool_lock::PoolLocks;
use crate::repository::AllocationStore;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ==========================================
// 投影类型
// ==========================================

/// 展位占用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandOccupancy {
    pub slot_code: String,
    pub occupied: bool,
}

/// 各状态报名数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: u32,
    pub approved: u32,
    pub rejected: u32,
    pub enrolled: u32,
    pub attended: u32,
    pub not_attended: u32,
    pub cancelled: u32,
}

impl StatusCounts {
    pub fn tally<'a>(records: impl IntoIterator<Item = &'a EnrollmentRecord>) -> Self {
        let mut counts = Self::default();
        for record in records {
            *counts.slot_mut(record.status) += 1;
        }
        counts
    }

    pub fn get(&self, status: EnrollmentStatus) -> u32 {
        match status {
            EnrollmentStatus::Pending => self.pending,
            EnrollmentStatus::Approved => self.approved,
            EnrollmentStatus::Rejected => self.rejected,
            EnrollmentStatus::Enrolled => self.enrolled,
            EnrollmentStatus::Attended => self.attended,
            EnrollmentStatus::NotAttended => self.not_attended,
            EnrollmentStatus::Cancelled => self.cancelled,
        }
    }

    fn slot_mut(&mut self, status: EnrollmentStatus) -> &mut u32 {
        match status {
            EnrollmentStatus::Pending => &mut self.pending,
            EnrollmentStatus::Approved => &mut self.approved,
            EnrollmentStatus::Rejected => &mut self.rejected,
            EnrollmentStatus::Enrolled => &mut self.enrolled,
            EnrollmentStatus::Attended => &mut self.attended,
            EnrollmentStatus::NotAttended => &mut self.not_attended,
            EnrollmentStatus::Cancelled => &mut self.cancelled,
        }
    }

    pub fn total(&self) -> u32 {
        EnrollmentStatus::ALL.iter().map(|s| self.get(*s)).sum()
    }

    /// 有效报名数 (rejected / cancelled 以外)
    pub fn active(&self) -> u32 {
        EnrollmentStatus::ALL
            .iter()
            .filter(|s| s.is_active())
            .map(|s| self.get(*s))
            .sum()
    }
}

/// 看板摘要 (同一快照)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSummary {
    pub pool_id: String,
    pub kind: PoolKind,
    pub mode: PoolMode,
    pub capacity: u32,
    pub occupied: u32,
    pub available: Availability,
    pub status_counts: StatusCounts,
}

// ==========================================
// QueryService
// ==========================================
pub struct QueryService {
    store: Arc<dyn AllocationStore>,
    locks: Arc<PoolLocks>,
}

impl QueryService {
    pub fn new(store: Arc<dyn AllocationStore>, locks: Arc<PoolLocks>) -> Self {
        Self { store, locks }
    }

    /// 在池锁内读取快照并计算投影
    fn project<T>(
        &self,
        pool_id: &str,
        f: impl FnOnce(&PoolSnapshot) -> T,
    ) -> AllocationResult<T> {
        self.locks.with_pool(pool_id, || {
            let snapshot = self
                .store
                .load_snapshot(pool_id)?
                .ok_or_else(|| AllocationError::pool_not_found(pool_id))?;
            Ok(f(&snapshot))
        })
    }

    /// 可用容量, capacity = 0 时为 Unlimited
    pub fn available_count(&self, pool_id: &str) -> AllocationResult<Availability> {
        self.project(pool_id, PoolSnapshot::availability)
    }

    /// 已用容量 (编号模式为已占用展位数, 计数模式为有效报名数)
    pub fn occupied_count(&self, pool_id: &str) -> AllocationResult<u32> {
        self.project(pool_id, PoolSnapshot::used_capacity)
    }

    /// 展位占用图, 按顺序号排列; 计数模式返回空列表
    pub fn occupancy_map(&self, pool_id: &str) -> AllocationResult<Vec<StandOccupancy>> {
        self.project(pool_id, |snapshot| {
            let mut slots: Vec<_> = snapshot.pool.slots.iter().collect();
            slots.sort_by_key(|s| s.position);
            slots
                .into_iter()
                .map(|s| StandOccupancy {
                    slot_code: s.code.clone(),
                    occupied: s.occupied,
                })
                .collect()
        })
    }

    pub fn status_counts(&self, pool_id: &str) -> AllocationResult<StatusCounts> {
        self.project(pool_id, |snapshot| StatusCounts::tally(&snapshot.enrollments))
    }

    pub fn pool_summary(&self, pool_id: &str) -> AllocationResult<PoolSummary> {
        self.project(pool_id, |snapshot| PoolSummary {
            pool_id: snapshot.pool.pool_id.clone(),
            kind: snapshot.pool.kind,
            mode: snapshot.pool.mode,
            capacity: snapshot.pool.capacity,
            occupied: snapshot.used_capacity(),
            available: snapshot.availability(),
            status_counts: StatusCounts::tally(&snapshot.enrollments),
        })
    }

    // ==========================================
    // 明细读取
    // ==========================================

    pub fn get_pool(&self, pool_id: &str) -> AllocationResult<SlotPool> {
        self.store
            .load_pool(pool_id)?
            .ok_or_else(|| AllocationError::pool_not_found(pool_id))
    }

    pub fn list_pools(&self) -> AllocationResult<Vec<SlotPool>> {
        Ok(self.store.list_pools()?)
    }

    pub fn get_enrollment(&self, enrollment_id: &str) -> AllocationResult<EnrollmentRecord> {
        self.store
            .load_enrollment(enrollment_id)?
            .ok_or_else(|| AllocationError::enrollment_not_found(enrollment_id))
    }

    pub fn list_enrollments(&self, pool_id: &str) -> AllocationResult<Vec<EnrollmentRecord>> {
        self.project(pool_id, |snapshot| snapshot.enrollments.clone())
    }

    pub fn list_subject_enrollments(
        &self,
        subject_id: &str,
    ) -> AllocationResult<Vec<EnrollmentRecord>> {
        Ok(self.store.list_subject_enrollments(subject_id)?)
    }

    /// 早于 cutoff 仍为 pending 的报名 (过期清理用)
    pub fn list_pending_before(
        &self,
        cutoff: NaiveDateTime,
    ) -> AllocationResult<Vec<EnrollmentRecord>> {
        Ok(self.store.list_pending_before(cutoff)?)
    }
}
