// ==========================================
// 报名分配引擎 - 引擎层错误类型
// ==========================================
// 说明: 所有错误只影响单次操作, 引擎不自动重试
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::capacity_policy::SlotPoolError;
use crate::domain::types::{EnrollmentAction, EnrollmentStatus};
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 分配引擎错误类型
#[derive(Error, Debug)]
pub enum AllocationError {
    // ===== 容量错误 =====
    #[error("容量配置无效: {reason}")]
    InvalidCapacity { reason: String },

    #[error("没有空闲展位: pool_id={pool_id}")]
    PoolExhausted { pool_id: String },

    #[error("名额已满: pool_id={pool_id}, capacity={capacity}")]
    CapacityExceeded { pool_id: String, capacity: u32 },

    #[error("容量使用中, 无法调整: pool_id={pool_id}, {reason}")]
    CapacityInUse { pool_id: String, reason: String },

    // ===== 状态机错误 =====
    #[error("无效的状态转换: enrollment_id={enrollment_id}, status={from}, action={action}")]
    InvalidTransition {
        enrollment_id: String,
        from: EnrollmentStatus,
        action: EnrollmentAction,
    },

    #[error("重复报名: subject_id={subject_id} 在 pool_id={pool_id} 已有有效报名 {enrollment_id}")]
    DuplicateEnrollment {
        pool_id: String,
        subject_id: String,
        enrollment_id: String,
    },

    // ===== 查找错误 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("容量池已存在: pool_id={pool_id}")]
    PoolAlreadyExists { pool_id: String },

    // ===== 存储错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl AllocationError {
    /// 池内操作错误 → 引擎错误 (补充 pool_id)
    pub fn from_pool_error(pool_id: &str, err: SlotPoolError) -> Self {
        match err {
            SlotPoolError::InvalidCapacity { reason } => AllocationError::InvalidCapacity { reason },
            SlotPoolError::PoolExhausted => AllocationError::PoolExhausted {
                pool_id: pool_id.to_string(),
            },
            SlotPoolError::CapacityInUse { reason } => AllocationError::CapacityInUse {
                pool_id: pool_id.to_string(),
                reason,
            },
        }
    }

    pub fn pool_not_found(pool_id: &str) -> Self {
        AllocationError::NotFound {
            entity: "SlotPool".to_string(),
            id: pool_id.to_string(),
        }
    }

    pub fn enrollment_not_found(enrollment_id: &str) -> Self {
        AllocationError::NotFound {
            entity: "EnrollmentRecord".to_string(),
            id: enrollment_id.to_string(),
        }
    }

    /// 调用方可通过释放位置或换池处理的错误 (前端提示"已满")
    pub fn is_capacity_full(&self) -> bool {
        matches!(
            self,
            AllocationError::PoolExhausted { .. } | AllocationError::CapacityExceeded { .. }
        )
    }
}

/// Result 类型别名
pub type AllocationResult<T> = Result<T, AllocationError>;
