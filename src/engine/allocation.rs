// ==========================================
// 报名分配引擎 - 分配引擎
// ==========================================
// 红线: 容量不变式 (已用 ≤ 容量, capacity = 0 为不限量)
// 红线: 同一展位同时最多被一条 pending/approved 记录持有
// 红线: 非法迁移不产生任何写入
// ==========================================
// 职责: 建池 / 扩缩容 / 报名 / 审核 / 签到 / 取消
// 并发: 每个写操作在池锁内完成 读快照 → 校验 → 单事务写入
// 说明: 事件与审计由上层在提交后执行, 引擎只返回结果
// ==========================================

use crate::config::AllocationConfig;
use crate::domain::capacity_policy::{validate_capacity, CapacityPolicy};
use crate::domain::enrollment::EnrollmentRecord;
use crate::domain::pool::SlotPool;
use crate::domain::snapshot::PoolSnapshot;
use crate::domain::types::{EnrollmentAction, EnrollmentStatus, PoolKind, PoolMode};
use crate::engine::clock::Clock;
use crate::engine::error::{AllocationError, AllocationResult};
use crate::engine::pool_lock::PoolLocks;
use crate::engine::transition;
use crate::repository::{AllocationStore, PoolChange};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// 操作结果
// ==========================================

/// 报名结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub enrollment: EnrollmentRecord,
    pub slot_code: Option<String>, // 编号模式下分配的展位编号
}

/// 状态迁移结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub enrollment: EnrollmentRecord,
    pub previous_status: EnrollmentStatus,
    pub released_slot_code: Option<String>,
    pub changed: bool, // false = 幂等空操作 (如重复取消)
}

/// 容量调整结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResizeOutcome {
    pub pool: SlotPool,
    pub previous_capacity: u32,
    pub changed: bool,
}

// ==========================================
// AllocationEngine
// ==========================================
pub struct AllocationEngine {
    store: Arc<dyn AllocationStore>,
    clock: Arc<dyn Clock>,
    config: AllocationConfig,
    locks: Arc<PoolLocks>,
}

impl AllocationEngine {
    pub fn new(
        store: Arc<dyn AllocationStore>,
        clock: Arc<dyn Clock>,
        config: AllocationConfig,
    ) -> Self {
        Self::with_locks(store, clock, config, Arc::new(PoolLocks::new()))
    }

    /// 与查询服务共享同一池锁注册表
    pub fn with_locks(
        store: Arc<dyn AllocationStore>,
        clock: Arc<dyn Clock>,
        config: AllocationConfig,
        locks: Arc<PoolLocks>,
    ) -> Self {
        Self {
            store,
            clock,
            config,
            locks,
        }
    }

    pub fn locks(&self) -> Arc<PoolLocks> {
        self.locks.clone()
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    // ==========================================
    // 池生命周期
    // ==========================================

    /// 创建容量池
    ///
    /// # 错误
    /// - InvalidCapacity: 容量为负, 或编号模式容量为 0 / 超上限
    /// - PoolAlreadyExists: pool_id 已被占用
    #[instrument(skip(self), fields(pool_id = %pool_id, kind = %kind, capacity = %capacity))]
    pub fn create_pool(
        &self,
        pool_id: &str,
        kind: PoolKind,
        capacity: i64,
    ) -> AllocationResult<SlotPool> {
        let policy = CapacityPolicy::new(kind, capacity)
            .map_err(|e| AllocationError::from_pool_error(pool_id, e))?;

        self.locks.with_pool(pool_id, || {
            if self.store.load_pool(pool_id)?.is_some() {
                return Err(AllocationError::PoolAlreadyExists {
                    pool_id: pool_id.to_string(),
                });
            }

            let pool = SlotPool::create(
                pool_id,
                &policy,
                &self.config.stand_code_scheme(),
                self.clock.now(),
            );
            self.store.create_pool(&pool)?;

            tracing::info!(
                "容量池已创建: pool_id={}, kind={}, mode={}, capacity={}",
                pool.pool_id,
                pool.kind,
                pool.mode,
                pool.capacity
            );
            Ok(pool)
        })
    }

    /// 删除容量池 (展位与报名记录随池删除)
    ///
    /// # 返回
    /// 删除前的池快照
    pub fn destroy_pool(&self, pool_id: &str) -> AllocationResult<PoolSnapshot> {
        self.locks.with_pool(pool_id, || {
            let snapshot = self.load_snapshot(pool_id)?;
            self.store.delete_pool(pool_id)?;

            tracing::info!(
                "容量池已删除: pool_id={}, enrollments={}",
                pool_id,
                snapshot.enrollments.len()
            );
            Ok(snapshot)
        })
    }

    /// 调整容量
    ///
    /// # 规则
    /// - 容量不变: 空操作, 总是允许
    /// - lock_resize_when_confirmed 开启且存在已确认报名: CapacityInUse
    /// - 编号模式缩容只能移除末尾空闲展位
    /// - 计数模式新容量不得低于有效报名数 (改为不限量除外)
    #[instrument(skip(self), fields(pool_id = %pool_id, new_capacity = %new_capacity))]
    pub fn resize(&self, pool_id: &str, new_capacity: i64) -> AllocationResult<ResizeOutcome> {
        self.locks.with_pool(pool_id, || {
            let snapshot = self.load_snapshot(pool_id)?;
            let previous_capacity = snapshot.pool.capacity;

            let validated = validate_capacity(snapshot.pool.mode, new_capacity)
                .map_err(|e| AllocationError::from_pool_error(pool_id, e))?;
            if validated == previous_capacity {
                return Ok(ResizeOutcome {
                    pool: snapshot.pool,
                    previous_capacity,
                    changed: false,
                });
            }

            if self.config.lock_resize_when_confirmed {
                if let Some(confirmed) = snapshot
                    .enrollments
                    .iter()
                    .find(|e| e.status.is_confirmed())
                {
                    tracing::warn!(
                        "存在已确认报名, 拒绝调整容量: pool_id={}, enrollment_id={}, status={}",
                        pool_id,
                        confirmed.enrollment_id,
                        confirmed.status
                    );
                    return Err(AllocationError::CapacityInUse {
                        pool_id: pool_id.to_string(),
                        reason: format!(
                            "报名 {} 已确认 ({})",
                            confirmed.enrollment_id, confirmed.status
                        ),
                    });
                }
            }

            let active_count = snapshot.active_count();
            let mut pool = snapshot.pool;
            pool.resize(new_capacity, active_count)
                .map_err(|e| AllocationError::from_pool_error(pool_id, e))?;
            pool.updated_at = self.clock.now();

            self.store.apply(&PoolChange {
                pool: Some(pool.clone()),
                ..PoolChange::default()
            })?;

            tracing::info!(
                "容量已调整: pool_id={}, {} → {}",
                pool_id,
                previous_capacity,
                pool.capacity
            );
            Ok(ResizeOutcome {
                pool,
                previous_capacity,
                changed: true,
            })
        })
    }

    // ==========================================
    // 报名
    // ==========================================

    /// 提交报名
    ///
    /// # 规则
    /// - 编号模式: 占用顺序号最小的空闲展位, 记录为 pending
    /// - 计数模式: 有效报名数 < 容量 (或不限量) 才接受
    /// - 同一申请人在同一池中最多一条有效报名
    ///
    /// # 错误
    /// - NotFound: 池不存在
    /// - DuplicateEnrollment / PoolExhausted / CapacityExceeded
    #[instrument(skip(self), fields(pool_id = %pool_id, subject_id = %subject_id))]
    pub fn submit(&self, pool_id: &str, subject_id: &str) -> AllocationResult<SubmitOutcome> {
        self.locks.with_pool(pool_id, || {
            let snapshot = self.load_snapshot(pool_id)?;

            if let Some(existing) = snapshot.active_enrollment_of(subject_id) {
                return Err(AllocationError::DuplicateEnrollment {
                    pool_id: pool_id.to_string(),
                    subject_id: subject_id.to_string(),
                    enrollment_id: existing.enrollment_id.clone(),
                });
            }

            let used = snapshot.used_capacity();
            let now = self.clock.now();
            let mut pool = snapshot.pool;
            let status = pool.kind.flow().initial_status();

            let mut change = PoolChange::default();
            let slot = match pool.mode {
                PoolMode::Labeled => {
                    let slot = pool.reserve().map_err(|e| {
                        tracing::debug!("没有空闲展位: pool_id={}", pool_id);
                        AllocationError::from_pool_error(pool_id, e)
                    })?;
                    pool.updated_at = now;
                    change.pool = Some(pool);
                    Some(slot)
                }
                PoolMode::Counted => {
                    let policy = pool.policy();
                    if !policy.has_room(used) {
                        tracing::debug!(
                            "名额已满: pool_id={}, used={}, capacity={}",
                            pool_id,
                            used,
                            policy.capacity
                        );
                        return Err(AllocationError::CapacityExceeded {
                            pool_id: pool_id.to_string(),
                            capacity: policy.capacity,
                        });
                    }
                    None
                }
            };

            let record = EnrollmentRecord::new(
                pool_id,
                subject_id,
                status,
                slot.as_ref().map(|s| s.slot_id.clone()),
                now,
            );
            change.inserted.push(record.clone());
            self.store.apply(&change)?;

            let slot_code = slot.map(|s| s.code);
            tracing::info!(
                "报名已受理: pool_id={}, enrollment_id={}, status={}, slot={}",
                pool_id,
                record.enrollment_id,
                record.status,
                slot_code.as_deref().unwrap_or("-")
            );
            Ok(SubmitOutcome {
                enrollment: record,
                slot_code,
            })
        })
    }

    // ==========================================
    // 状态迁移
    // ==========================================

    /// 审核通过 (pending → approved), 展位保持绑定
    pub fn approve(&self, enrollment_id: &str) -> AllocationResult<TransitionOutcome> {
        self.transition(enrollment_id, EnrollmentAction::Approve, None)
    }

    /// 审核拒绝 (pending → rejected), 释放展位
    pub fn reject(
        &self,
        enrollment_id: &str,
        reason: Option<&str>,
    ) -> AllocationResult<TransitionOutcome> {
        self.transition(enrollment_id, EnrollmentAction::Reject, reason)
    }

    /// 取消报名, 对已失效记录幂等
    pub fn cancel(
        &self,
        enrollment_id: &str,
        reason: Option<&str>,
    ) -> AllocationResult<TransitionOutcome> {
        self.transition(enrollment_id, EnrollmentAction::Cancel, reason)
    }

    /// 登记签到结果, 不影响占用
    pub fn mark_attendance(
        &self,
        enrollment_id: &str,
        attended: bool,
    ) -> AllocationResult<TransitionOutcome> {
        let action = if attended {
            EnrollmentAction::MarkAttended
        } else {
            EnrollmentAction::MarkNotAttended
        };
        self.transition(enrollment_id, action, None)
    }

    /// 撤销签到 (attended / not_attended → enrolled)
    pub fn revert_attendance(&self, enrollment_id: &str) -> AllocationResult<TransitionOutcome> {
        self.transition(enrollment_id, EnrollmentAction::RevertAttendance, None)
    }

    /// 统一迁移入口: 查表 → 释放展位 → 单事务写入
    #[instrument(skip(self, reason), fields(enrollment_id = %enrollment_id, action = %action))]
    fn transition(
        &self,
        enrollment_id: &str,
        action: EnrollmentAction,
        reason: Option<&str>,
    ) -> AllocationResult<TransitionOutcome> {
        // pool_id 不可变, 锁外读取用于定位池锁
        let pool_id = self
            .store
            .load_enrollment(enrollment_id)?
            .ok_or_else(|| AllocationError::enrollment_not_found(enrollment_id))?
            .pool_id;

        self.locks.with_pool(&pool_id, || {
            let snapshot = self.load_snapshot(&pool_id)?;
            let mut record = snapshot
                .find_enrollment(enrollment_id)
                .cloned()
                .ok_or_else(|| AllocationError::enrollment_not_found(enrollment_id))?;
            let from = record.status;

            if action == EnrollmentAction::Cancel && !record.is_active() {
                tracing::debug!(
                    "报名已失效, 取消为空操作: enrollment_id={}, status={}",
                    enrollment_id,
                    from
                );
                return Ok(TransitionOutcome {
                    enrollment: record,
                    previous_status: from,
                    released_slot_code: None,
                    changed: false,
                });
            }

            let flow = snapshot.pool.kind.flow();
            let to = transition::next_status(flow, from, action).ok_or_else(|| {
                tracing::warn!(
                    "非法状态迁移: enrollment_id={}, flow={}, status={}, action={}",
                    enrollment_id,
                    flow,
                    from,
                    action
                );
                AllocationError::InvalidTransition {
                    enrollment_id: enrollment_id.to_string(),
                    from,
                    action,
                }
            })?;

            let now = self.clock.now();
            let mut change = PoolChange::default();
            let mut released_slot_code = None;

            if from.holds_slot() && !to.holds_slot() {
                if let Some(slot_id) = record.slot_ref.take() {
                    let mut pool = snapshot.pool.clone();
                    released_slot_code = pool.find_slot(&slot_id).map(|s| s.code.clone());
                    if pool.release(&slot_id) {
                        pool.updated_at = now;
                        change.pool = Some(pool);
                    }
                }
            }

            record.status = to;
            record.decided_at = Some(now);
            record.decision_reason = reason.map(str::to_string);
            change.updated.push(record.clone());
            self.store.apply(&change)?;

            tracing::info!(
                "报名状态已变更: pool_id={}, enrollment_id={}, {} → {}{}",
                pool_id,
                enrollment_id,
                from,
                to,
                released_slot_code
                    .as_deref()
                    .map(|code| format!(", 释放展位 {}", code))
                    .unwrap_or_default()
            );
            Ok(TransitionOutcome {
                enrollment: record,
                previous_status: from,
                released_slot_code,
                changed: true,
            })
        })
    }

    fn load_snapshot(&self, pool_id: &str) -> AllocationResult<PoolSnapshot> {
        self.store
            .load_snapshot(pool_id)?
            .ok_or_else(|| AllocationError::pool_not_found(pool_id))
    }
}
