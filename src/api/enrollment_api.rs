// ==========================================
// 报名分配引擎 - 报名 API
// ==========================================
// 职责: 报名 / 审核 / 签到 / 取消 / 过期清理 / 报名查询
// 流程: 入参校验 → 引擎 (池锁内单事务) → 提交后写日志、发事件
// ==========================================

use std::sync::Arc;

use serde_json::json;

use crate::api::error::ApiResult;
use crate::api::post_commit::{AuditEntry, PostCommit};
use crate::api::validator::{
    require_actor, require_enrollment_id, require_pool_id, require_subject_id,
};
use crate::domain::action_log::ActionType;
use crate::domain::enrollment::EnrollmentRecord;
use crate::domain::types::EnrollmentAction;
use crate::engine::allocation::{AllocationEngine, SubmitOutcome, TransitionOutcome};
use crate::engine::events::{EnrollmentEvent, EnrollmentEventType};
use crate::engine::query::QueryService;
use crate::engine::sweeper::{PendingSweeper, SweepReport};
use crate::engine::transition;

// ==========================================
// EnrollmentApi - 报名 API
// ==========================================

/// 报名API
///
/// 职责：
/// 1. 报名提交（占位 / 计数）
/// 2. 审核、签到、取消等状态迁移
/// 3. pending 过期清理
/// 4. ActionLog记录与事件发布
pub struct EnrollmentApi {
    engine: Arc<AllocationEngine>,
    query: Arc<QueryService>,
    sweeper: Arc<PendingSweeper>,
    post_commit: Arc<PostCommit>,
}

impl EnrollmentApi {
    pub fn new(
        engine: Arc<AllocationEngine>,
        query: Arc<QueryService>,
        sweeper: Arc<PendingSweeper>,
        post_commit: Arc<PostCommit>,
    ) -> Self {
        Self {
            engine,
            query,
            sweeper,
            post_commit,
        }
    }

    /// 提交报名
    ///
    /// # 返回
    /// - Ok(SubmitOutcome): 报名记录 + 展位编号 (计数模式为 None)
    /// - Err(ApiError): PoolExhausted / CapacityExceeded / 重复报名 等
    pub fn submit(&self, pool_id: &str, subject_id: &str, actor: &str) -> ApiResult<SubmitOutcome> {
        require_pool_id(pool_id)?;
        require_subject_id(subject_id)?;
        require_actor(actor)?;

        let outcome = self.engine.submit(pool_id, subject_id)?;

        let record = &outcome.enrollment;
        let entry = AuditEntry::enrollment(ActionType::Submit, pool_id, &record.enrollment_id)
            .with_payload(json!({
                "subject_id": subject_id,
                "status": record.status,
                "slot_code": outcome.slot_code,
            }))
            .with_detail(match &outcome.slot_code {
                Some(code) => format!("报名 {} 分配展位 {}", subject_id, code),
                None => format!("报名 {}", subject_id),
            });
        let event = EnrollmentEvent::enrollment(
            EnrollmentEventType::EnrollmentSubmitted,
            pool_id,
            &record.enrollment_id,
            subject_id,
            None,
            record.status,
            Some(actor.to_string()),
        );
        self.post_commit.complete(actor, entry, event);

        Ok(outcome)
    }

    /// 审核通过
    pub fn approve(&self, enrollment_id: &str, actor: &str) -> ApiResult<TransitionOutcome> {
        self.run_transition(enrollment_id, EnrollmentAction::Approve, None, actor)
    }

    /// 审核拒绝
    pub fn reject(
        &self,
        enrollment_id: &str,
        reason: Option<&str>,
        actor: &str,
    ) -> ApiResult<TransitionOutcome> {
        self.run_transition(enrollment_id, EnrollmentAction::Reject, reason, actor)
    }

    /// 取消报名 (已失效记录为空操作, 不写日志)
    pub fn cancel(
        &self,
        enrollment_id: &str,
        reason: Option<&str>,
        actor: &str,
    ) -> ApiResult<TransitionOutcome> {
        self.run_transition(enrollment_id, EnrollmentAction::Cancel, reason, actor)
    }

    /// 登记签到结果
    pub fn mark_attendance(
        &self,
        enrollment_id: &str,
        attended: bool,
        actor: &str,
    ) -> ApiResult<TransitionOutcome> {
        let action = if attended {
            EnrollmentAction::MarkAttended
        } else {
            EnrollmentAction::MarkNotAttended
        };
        self.run_transition(enrollment_id, action, None, actor)
    }

    /// 撤销签到
    pub fn revert_attendance(&self, enrollment_id: &str, actor: &str) -> ApiResult<TransitionOutcome> {
        self.run_transition(enrollment_id, EnrollmentAction::RevertAttendance, None, actor)
    }

    /// 执行一次 pending 过期清理
    pub fn expire_pending(&self, actor: &str) -> ApiResult<SweepReport> {
        require_actor(actor)?;

        let report = self.sweeper.sweep()?;
        for outcome in &report.expired {
            self.after_transition(actor, ActionType::ExpirePending, outcome);
        }
        Ok(report)
    }

    fn run_transition(
        &self,
        enrollment_id: &str,
        action: EnrollmentAction,
        reason: Option<&str>,
        actor: &str,
    ) -> ApiResult<TransitionOutcome> {
        require_enrollment_id(enrollment_id)?;
        require_actor(actor)?;

        let outcome = match action {
            EnrollmentAction::Approve => self.engine.approve(enrollment_id)?,
            EnrollmentAction::Reject => self.engine.reject(enrollment_id, reason)?,
            EnrollmentAction::Cancel => self.engine.cancel(enrollment_id, reason)?,
            EnrollmentAction::MarkAttended => self.engine.mark_attendance(enrollment_id, true)?,
            EnrollmentAction::MarkNotAttended => {
                self.engine.mark_attendance(enrollment_id, false)?
            }
            EnrollmentAction::RevertAttendance => self.engine.revert_attendance(enrollment_id)?,
        };

        if outcome.changed {
            self.after_transition(actor, audit_type(action), &outcome);
        }
        Ok(outcome)
    }

    fn after_transition(&self, actor: &str, action_type: ActionType, outcome: &TransitionOutcome) {
        let record = &outcome.enrollment;
        let entry = AuditEntry::enrollment(action_type, &record.pool_id, &record.enrollment_id)
            .with_payload(json!({
                "subject_id": record.subject_id,
                "from": outcome.previous_status,
                "to": record.status,
                "reason": record.decision_reason,
                "released_slot_code": outcome.released_slot_code,
            }))
            .with_detail(format!(
                "{} → {}",
                outcome.previous_status, record.status
            ));
        let event = EnrollmentEvent::enrollment(
            EnrollmentEventType::EnrollmentStatusChanged,
            &record.pool_id,
            &record.enrollment_id,
            &record.subject_id,
            Some(outcome.previous_status),
            record.status,
            Some(actor.to_string()),
        );
        self.post_commit.complete(actor, entry, event);
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn get_enrollment(&self, enrollment_id: &str) -> ApiResult<EnrollmentRecord> {
        require_enrollment_id(enrollment_id)?;
        Ok(self.query.get_enrollment(enrollment_id)?)
    }

    pub fn list_enrollments(&self, pool_id: &str) -> ApiResult<Vec<EnrollmentRecord>> {
        require_pool_id(pool_id)?;
        Ok(self.query.list_enrollments(pool_id)?)
    }

    pub fn list_enrollments_by_subject(&self, subject_id: &str) -> ApiResult<Vec<EnrollmentRecord>> {
        require_subject_id(subject_id)?;
        Ok(self.query.list_subject_enrollments(subject_id)?)
    }

    /// 当前状态下可执行的动作
    pub fn allowed_actions(&self, enrollment_id: &str) -> ApiResult<Vec<EnrollmentAction>> {
        let record = self.get_enrollment(enrollment_id)?;
        let pool = self.query.get_pool(&record.pool_id)?;
        Ok(transition::allowed_actions(pool.kind.flow(), record.status))
    }
}

fn audit_type(action: EnrollmentAction) -> ActionType {
    match action {
        EnrollmentAction::Approve => ActionType::Approve,
        EnrollmentAction::Reject => ActionType::Reject,
        EnrollmentAction::Cancel => ActionType::Cancel,
        EnrollmentAction::MarkAttended | EnrollmentAction::MarkNotAttended => {
            ActionType::MarkAttendance
        }
        EnrollmentAction::RevertAttendance => ActionType::RevertAttendance,
    }
}
