// ==========================================
// 报名分配引擎 - 提交后处理
// ==========================================
// 职责: 事务提交后写操作日志、发布事件
// 红线: 在池锁外执行; 失败只记 warn, 不改变已提交操作的结果
// ==========================================

use crate::domain::action_log::{ActionLog, ActionType};
use crate::engine::clock::Clock;
use crate::engine::events::{EnrollmentEvent, OptionalEventPublisher};
use crate::repository::ActionLogRepository;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

/// 一次已提交操作的审计内容
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub action_type: ActionType,
    pub pool_id: String,
    pub enrollment_id: Option<String>,
    pub payload: Option<JsonValue>,
    pub detail: Option<String>,
}

impl AuditEntry {
    pub fn pool(action_type: ActionType, pool_id: &str) -> Self {
        Self {
            action_type,
            pool_id: pool_id.to_string(),
            enrollment_id: None,
            payload: None,
            detail: None,
        }
    }

    pub fn enrollment(action_type: ActionType, pool_id: &str, enrollment_id: &str) -> Self {
        Self {
            enrollment_id: Some(enrollment_id.to_string()),
            ..Self::pool(action_type, pool_id)
        }
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

pub struct PostCommit {
    action_log_repo: Arc<ActionLogRepository>,
    events: OptionalEventPublisher,
    clock: Arc<dyn Clock>,
}

impl PostCommit {
    pub fn new(
        action_log_repo: Arc<ActionLogRepository>,
        events: OptionalEventPublisher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            action_log_repo,
            events,
            clock,
        }
    }

    /// 写日志并发布事件
    pub fn complete(&self, actor: &str, entry: AuditEntry, event: EnrollmentEvent) {
        self.record(actor, entry);
        self.publish(&event);
    }

    fn record(&self, actor: &str, entry: AuditEntry) {
        let action_type = entry.action_type;
        let log = ActionLog {
            action_id: Uuid::new_v4().to_string(),
            pool_id: entry.pool_id,
            enrollment_id: entry.enrollment_id,
            action_type: action_type.as_str().to_string(),
            action_ts: self.clock.now(),
            actor: actor.to_string(),
            payload_json: entry.payload,
            detail: entry.detail,
        };

        if let Err(e) = self.action_log_repo.insert(&log) {
            tracing::warn!(
                error = %e,
                "记录操作日志失败: action_type={}, pool_id={}",
                action_type,
                log.pool_id
            );
        }
    }

    fn publish(&self, event: &EnrollmentEvent) {
        if let Err(e) = self.events.publish(event) {
            tracing::warn!(
                "发布 {} 事件失败: pool_id={}, error={}",
                event.event_type.as_str(),
                event.pool_id,
                e
            );
        }
    }
}
