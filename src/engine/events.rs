// ==========================================
// 报名分配引擎 - 事件发布
// ==========================================
// 职责: 定义报名事件发布 trait, 通知层在此接入
// 红线: 只在事务提交后、池锁外发布; 发布失败不影响已提交的迁移
// ==========================================

use crate::domain::types::EnrollmentStatus;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 报名事件类型
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnrollmentEventType {
    /// 容量池创建 / 调整 / 删除
    PoolChanged,
    /// 新报名
    EnrollmentSubmitted,
    /// 报名状态变更
    EnrollmentStatusChanged,
}

impl EnrollmentEventType {
    pub fn as_str(&self) -> &str {
        match self {
            EnrollmentEventType::PoolChanged => "PoolChanged",
            EnrollmentEventType::EnrollmentSubmitted => "EnrollmentSubmitted",
            EnrollmentEventType::EnrollmentStatusChanged => "EnrollmentStatusChanged",
        }
    }
}

/// 报名事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentEvent {
    pub event_type: EnrollmentEventType,
    pub pool_id: String,
    pub enrollment_id: Option<String>,
    pub subject_id: Option<String>,
    pub from_status: Option<EnrollmentStatus>,
    pub to_status: Option<EnrollmentStatus>,
    /// 事件来源 (操作人)
    pub source: Option<String>,
}

impl EnrollmentEvent {
    /// 池级事件
    pub fn pool_changed(pool_id: &str, source: Option<String>) -> Self {
        Self {
            event_type: EnrollmentEventType::PoolChanged,
            pool_id: pool_id.to_string(),
            enrollment_id: None,
            subject_id: None,
            from_status: None,
            to_status: None,
            source,
        }
    }

    /// 报名级事件
    pub fn enrollment(
        event_type: EnrollmentEventType,
        pool_id: &str,
        enrollment_id: &str,
        subject_id: &str,
        from_status: Option<EnrollmentStatus>,
        to_status: EnrollmentStatus,
        source: Option<String>,
    ) -> Self {
        Self {
            event_type,
            pool_id: pool_id.to_string(),
            enrollment_id: Some(enrollment_id.to_string()),
            subject_id: Some(subject_id.to_string()),
            from_status,
            to_status: Some(to_status),
            source,
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 报名事件发布者
///
/// # 实现说明
/// - 通知层 (邮件 / 站内信) 实现此 trait
/// - 实现方不得回调引擎写操作
pub trait EnrollmentEventPublisher: Send + Sync {
    fn publish(&self, event: &EnrollmentEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl EnrollmentEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: &EnrollmentEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - pool_id={}, event_type={}",
            event.pool_id,
            event.event_type.as_str()
        );
        Ok(())
    }
}

/// 可选的事件发布者包装
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn EnrollmentEventPublisher>>,
}

impl OptionalEventPublisher {
    pub fn with_publisher(publisher: Arc<dyn EnrollmentEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件 (如果有发布者)
    pub fn publish(&self, event: &EnrollmentEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(publisher) => publisher.publish(event),
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者, 跳过事件 - pool_id={}, event_type={}",
                    event.pool_id,
                    event.event_type.as_str()
                );
                Ok(())
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}
