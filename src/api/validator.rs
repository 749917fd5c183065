// ==========================================
// 报名分配引擎 - 入参校验
// ==========================================
// 职责: 标识符非空校验, 在进入引擎前拒绝无效输入
// ==========================================

use crate::api::error::{ApiError, ApiResult};

/// 校验必填标识符
///
/// # 参数
/// - `label`: 字段中文名 (用于错误消息)
/// - `value`: 原始输入
pub fn require_id(label: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{}不能为空", label)));
    }
    Ok(())
}

pub fn require_pool_id(pool_id: &str) -> ApiResult<()> {
    require_id("容量池ID", pool_id)
}

pub fn require_subject_id(subject_id: &str) -> ApiResult<()> {
    require_id("申请人ID", subject_id)
}

pub fn require_enrollment_id(enrollment_id: &str) -> ApiResult<()> {
    require_id("报名ID", enrollment_id)
}

pub fn require_actor(actor: &str) -> ApiResult<()> {
    require_id("操作人", actor)
}
