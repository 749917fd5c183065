// ==========================================
// 报名分配引擎 - 操作日志领域模型
// ==========================================
// 红线: 所有已提交的写操作必须记录
// 用途: 审计追踪 (报名记录不物理删除, 池销毁后历史仍在日志中)
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub pool_id: String,
    pub enrollment_id: Option<String>,
    pub action_type: String,
    pub action_ts: NaiveDateTime,
    pub actor: String,

    // ===== 操作负载 =====
    pub payload_json: Option<JsonValue>,
    pub detail: Option<String>,
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    CreatePool,
    ResizePool,
    DestroyPool,
    Submit,
    Approve,
    Reject,
    Cancel,
    MarkAttendance,
    RevertAttendance,
    ExpirePending,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreatePool => "CREATE_POOL",
            ActionType::ResizePool => "RESIZE_POOL",
            ActionType::DestroyPool => "DESTROY_POOL",
            ActionType::Submit => "SUBMIT",
            ActionType::Approve => "APPROVE",
            ActionType::Reject => "REJECT",
            ActionType::Cancel => "CANCEL",
            ActionType::MarkAttendance => "MARK_ATTENDANCE",
            ActionType::RevertAttendance => "REVERT_ATTENDANCE",
            ActionType::ExpirePending => "EXPIRE_PENDING",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
