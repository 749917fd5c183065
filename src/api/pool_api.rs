// ==========================================
// 报名分配引擎 - 容量池 API
// ==========================================
// 职责: 建池 / 扩缩容 / 删池 / 容量与占用查询 / 操作日志查询
// ==========================================

use std::sync::Arc;

use serde_json::json;

use crate::api::error::{ApiError, ApiResult};
use crate::api::post_commit::{AuditEntry, PostCommit};
use crate::api::validator::{require_actor, require_enrollment_id, require_pool_id};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::pool::SlotPool;
use crate::domain::types::PoolKind;
use crate::engine::allocation::{AllocationEngine, ResizeOutcome};
use crate::engine::events::EnrollmentEvent;
use crate::engine::query::{PoolSummary, QueryService, StandOccupancy, StatusCounts};
use crate::repository::ActionLogRepository;

// ==========================================
// PoolApi - 容量池 API
// ==========================================
pub struct PoolApi {
    engine: Arc<AllocationEngine>,
    query: Arc<QueryService>,
    action_log_repo: Arc<ActionLogRepository>,
    post_commit: Arc<PostCommit>,
}

impl PoolApi {
    pub fn new(
        engine: Arc<AllocationEngine>,
        query: Arc<QueryService>,
        action_log_repo: Arc<ActionLogRepository>,
        post_commit: Arc<PostCommit>,
    ) -> Self {
        Self {
            engine,
            query,
            action_log_repo,
            post_commit,
        }
    }

    /// 创建容量池
    ///
    /// # 参数
    /// - kind: internal_fair / external_fair / activity
    /// - capacity: 0 表示不限量 (编号模式不允许)
    pub fn create_pool(
        &self,
        pool_id: &str,
        kind: &str,
        capacity: i64,
        actor: &str,
    ) -> ApiResult<SlotPool> {
        require_pool_id(pool_id)?;
        require_actor(actor)?;
        let kind = PoolKind::parse(kind.trim())
            .ok_or_else(|| ApiError::InvalidInput(format!("未知的容量池类型: {}", kind)))?;

        let pool = self.engine.create_pool(pool_id, kind, capacity)?;

        let entry = AuditEntry::pool(ActionType::CreatePool, pool_id)
            .with_payload(json!({
                "kind": pool.kind,
                "mode": pool.mode,
                "capacity": pool.capacity,
            }))
            .with_detail(format!("创建容量池: {} 容量 {}", pool.kind, pool.capacity));
        self.post_commit.complete(
            actor,
            entry,
            EnrollmentEvent::pool_changed(pool_id, Some(actor.to_string())),
        );
        Ok(pool)
    }

    /// 调整容量 (容量不变时不写日志)
    pub fn resize(&self, pool_id: &str, new_capacity: i64, actor: &str) -> ApiResult<ResizeOutcome> {
        require_pool_id(pool_id)?;
        require_actor(actor)?;

        let outcome = self.engine.resize(pool_id, new_capacity)?;

        if outcome.changed {
            let entry = AuditEntry::pool(ActionType::ResizePool, pool_id)
                .with_payload(json!({
                    "previous_capacity": outcome.previous_capacity,
                    "capacity": outcome.pool.capacity,
                }))
                .with_detail(format!(
                    "调整容量: {} → {}",
                    outcome.previous_capacity, outcome.pool.capacity
                ));
            self.post_commit.complete(
                actor,
                entry,
                EnrollmentEvent::pool_changed(pool_id, Some(actor.to_string())),
            );
        }
        Ok(outcome)
    }

    /// 删除容量池
    ///
    /// # 返回
    /// 随池删除的报名记录数
    pub fn destroy_pool(&self, pool_id: &str, actor: &str) -> ApiResult<usize> {
        require_pool_id(pool_id)?;
        require_actor(actor)?;

        let snapshot = self.engine.destroy_pool(pool_id)?;
        let removed = snapshot.enrollments.len();

        let entry = AuditEntry::pool(ActionType::DestroyPool, pool_id)
            .with_payload(json!({
                "kind": snapshot.pool.kind,
                "capacity": snapshot.pool.capacity,
                "enrollments": snapshot.enrollments,
            }))
            .with_detail(format!("删除容量池, 报名记录 {} 条", removed));
        self.post_commit.complete(
            actor,
            entry,
            EnrollmentEvent::pool_changed(pool_id, Some(actor.to_string())),
        );
        Ok(removed)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 可用容量
    ///
    /// # 返回
    /// - (count, unlimited): 不限量时 count 为 0
    pub fn available_count(&self, pool_id: &str) -> ApiResult<(u32, bool)> {
        require_pool_id(pool_id)?;
        Ok(self.query.available_count(pool_id)?.as_tuple())
    }

    pub fn occupied_count(&self, pool_id: &str) -> ApiResult<u32> {
        require_pool_id(pool_id)?;
        Ok(self.query.occupied_count(pool_id)?)
    }

    /// 展位占用图 (计数模式为空列表)
    pub fn occupancy_map(&self, pool_id: &str) -> ApiResult<Vec<StandOccupancy>> {
        require_pool_id(pool_id)?;
        Ok(self.query.occupancy_map(pool_id)?)
    }

    pub fn status_counts(&self, pool_id: &str) -> ApiResult<StatusCounts> {
        require_pool_id(pool_id)?;
        Ok(self.query.status_counts(pool_id)?)
    }

    pub fn pool_summary(&self, pool_id: &str) -> ApiResult<PoolSummary> {
        require_pool_id(pool_id)?;
        Ok(self.query.pool_summary(pool_id)?)
    }

    pub fn get_pool(&self, pool_id: &str) -> ApiResult<SlotPool> {
        require_pool_id(pool_id)?;
        Ok(self.query.get_pool(pool_id)?)
    }

    pub fn list_pools(&self) -> ApiResult<Vec<SlotPool>> {
        Ok(self.query.list_pools()?)
    }

    /// 容量池操作日志 (时间正序)
    pub fn list_action_logs(&self, pool_id: &str) -> ApiResult<Vec<ActionLog>> {
        require_pool_id(pool_id)?;
        Ok(self.action_log_repo.list_by_pool(pool_id)?)
    }

    /// 单条报名的操作历史 (池删除后仍可查询)
    pub fn enrollment_history(&self, enrollment_id: &str) -> ApiResult<Vec<ActionLog>> {
        require_enrollment_id(enrollment_id)?;
        Ok(self.action_log_repo.list_by_enrollment(enrollment_id)?)
    }

    /// 最近的操作日志 (时间倒序)
    pub fn recent_action_logs(&self, limit: usize) -> ApiResult<Vec<ActionLog>> {
        if limit == 0 {
            return Err(ApiError::InvalidInput("limit必须大于0".to_string()));
        }
        Ok(self.action_log_repo.list_recent(limit)?)
    }
}
