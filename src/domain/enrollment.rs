// ==========================================
// 报名分配引擎 - 报名记录领域模型
// ==========================================
// 红线: 报名记录只通过状态机变更, 不做物理删除
// 红线: 编号模式下同一展位同时最多被一条 pending/approved 记录持有
// ==========================================

use crate::domain::types::EnrollmentStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// EnrollmentRecord - 报名记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    // ===== 主键 =====
    pub enrollment_id: String,
    pub pool_id: String,
    pub subject_id: String, // 申请人 / 志愿者

    // ===== 状态 =====
    pub status: EnrollmentStatus,
    pub slot_ref: Option<String>, // 绑定的展位ID (仅编号模式)

    // ===== 时间与原因 =====
    pub requested_at: NaiveDateTime,
    pub decided_at: Option<NaiveDateTime>,
    pub decision_reason: Option<String>,
}

impl EnrollmentRecord {
    /// 新建报名记录
    pub fn new(
        pool_id: &str,
        subject_id: &str,
        status: EnrollmentStatus,
        slot_ref: Option<String>,
        requested_at: NaiveDateTime,
    ) -> Self {
        Self {
            enrollment_id: Uuid::new_v4().to_string(),
            pool_id: pool_id.to_string(),
            subject_id: subject_id.to_string(),
            status,
            slot_ref,
            requested_at,
            decided_at: None,
            decision_reason: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}
