// ==========================================
// 报名分配引擎 - API层错误类型
// ==========================================
// 职责: 将引擎 / 存储错误转换为用户可读的错误消息
// 说明: 所有错误信息必须包含显式原因
// ==========================================

use crate::engine::error::AllocationError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 容量错误
    // ==========================================
    #[error("容量配置无效: {0}")]
    InvalidCapacity(String),

    #[error("展位已满: pool_id={pool_id}")]
    PoolExhausted { pool_id: String },

    #[error("名额已满: pool_id={pool_id}, capacity={capacity}")]
    CapacityExceeded { pool_id: String, capacity: u32 },

    #[error("容量使用中: {0}")]
    CapacityInUse(String),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: enrollment_id={enrollment_id}, status={from}, action={action}")]
    InvalidStateTransition {
        enrollment_id: String,
        from: String,
        action: String,
    },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 调用方可通过换池 / 释放名额 / 稍后重试处理的错误
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ApiError::PoolExhausted { .. }
                | ApiError::CapacityExceeded { .. }
                | ApiError::CapacityInUse(_)
        )
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 AllocationError 转换
// ==========================================
impl From<AllocationError> for ApiError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::InvalidCapacity { reason } => ApiError::InvalidCapacity(reason),
            AllocationError::PoolExhausted { pool_id } => ApiError::PoolExhausted { pool_id },
            AllocationError::CapacityExceeded { pool_id, capacity } => {
                ApiError::CapacityExceeded { pool_id, capacity }
            }
            AllocationError::CapacityInUse { pool_id, reason } => {
                ApiError::CapacityInUse(format!("pool_id={}, {}", pool_id, reason))
            }
            AllocationError::InvalidTransition {
                enrollment_id,
                from,
                action,
            } => ApiError::InvalidStateTransition {
                enrollment_id,
                from: from.to_string(),
                action: action.to_string(),
            },
            AllocationError::DuplicateEnrollment {
                pool_id,
                subject_id,
                enrollment_id,
            } => ApiError::BusinessRuleViolation(format!(
                "申请人{}在{}已有有效报名{}",
                subject_id, pool_id, enrollment_id
            )),
            AllocationError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            AllocationError::PoolAlreadyExists { pool_id } => {
                ApiError::BusinessRuleViolation(format!("容量池{}已存在", pool_id))
            }
            AllocationError::Repository(err) => ApiError::from(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
