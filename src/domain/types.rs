// ==========================================
// 报名分配引擎 - 领域类型定义
// ==========================================
// 职责: 池类型、池模式、报名状态、状态动作
// 序列化格式: snake_case (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 池类型 (Pool Kind)
// ==========================================
// 决定容量策略与报名流程
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    InternalFair, // 内部展会: 带编号的展位
    ExternalFair, // 外部展会: 仅数量上限
    Activity,     // 活动: 可选的名额上限
}

impl PoolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolKind::InternalFair => "internal_fair",
            PoolKind::ExternalFair => "external_fair",
            PoolKind::Activity => "activity",
        }
    }

    /// 从数据库字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "internal_fair" => Some(PoolKind::InternalFair),
            "external_fair" => Some(PoolKind::ExternalFair),
            "activity" => Some(PoolKind::Activity),
            _ => None,
        }
    }

    /// 池模式: 只有内部展会使用编号展位
    pub fn mode(&self) -> PoolMode {
        match self {
            PoolKind::InternalFair => PoolMode::Labeled,
            PoolKind::ExternalFair | PoolKind::Activity => PoolMode::Counted,
        }
    }

    /// 报名流程: 展会走审核流程，活动走签到流程
    pub fn flow(&self) -> EnrollmentFlow {
        match self {
            PoolKind::InternalFair | PoolKind::ExternalFair => EnrollmentFlow::Review,
            PoolKind::Activity => EnrollmentFlow::Attendance,
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 池模式 (Pool Mode)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolMode {
    Labeled, // 可寻址的编号位置 (如 A01)
    Counted, // 仅数量上限，无位置身份
}

impl PoolMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolMode::Labeled => "labeled",
            PoolMode::Counted => "counted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "labeled" => Some(PoolMode::Labeled),
            "counted" => Some(PoolMode::Counted),
            _ => None,
        }
    }
}

impl fmt::Display for PoolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 报名流程 (Enrollment Flow)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentFlow {
    Review,     // pending → approved / rejected
    Attendance, // enrolled → attended / not_attended / cancelled
}

impl EnrollmentFlow {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentFlow::Review => "review",
            EnrollmentFlow::Attendance => "attendance",
        }
    }

    /// 新报名记录的初始状态
    pub fn initial_status(&self) -> EnrollmentStatus {
        match self {
            EnrollmentFlow::Review => EnrollmentStatus::Pending,
            EnrollmentFlow::Attendance => EnrollmentStatus::Enrolled,
        }
    }
}

impl fmt::Display for EnrollmentFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 报名状态 (Enrollment Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Pending,     // 待审核
    Approved,    // 已通过
    Rejected,    // 已拒绝
    Enrolled,    // 已报名
    Attended,    // 已出席
    NotAttended, // 未出席
    Cancelled,   // 已取消
}

impl EnrollmentStatus {
    pub const ALL: [EnrollmentStatus; 7] = [
        EnrollmentStatus::Pending,
        EnrollmentStatus::Approved,
        EnrollmentStatus::Rejected,
        EnrollmentStatus::Enrolled,
        EnrollmentStatus::Attended,
        EnrollmentStatus::NotAttended,
        EnrollmentStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Pending => "pending",
            EnrollmentStatus::Approved => "approved",
            EnrollmentStatus::Rejected => "rejected",
            EnrollmentStatus::Enrolled => "enrolled",
            EnrollmentStatus::Attended => "attended",
            EnrollmentStatus::NotAttended => "not_attended",
            EnrollmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(EnrollmentStatus::Pending),
            "approved" => Some(EnrollmentStatus::Approved),
            "rejected" => Some(EnrollmentStatus::Rejected),
            "enrolled" => Some(EnrollmentStatus::Enrolled),
            "attended" => Some(EnrollmentStatus::Attended),
            "not_attended" => Some(EnrollmentStatus::NotAttended),
            "cancelled" => Some(EnrollmentStatus::Cancelled),
            _ => None,
        }
    }

    /// 是否占用容量 (rejected / cancelled 以外均占用)
    pub fn is_active(&self) -> bool {
        !matches!(self, EnrollmentStatus::Rejected | EnrollmentStatus::Cancelled)
    }

    /// 编号模式下是否持有位置
    pub fn holds_slot(&self) -> bool {
        matches!(self, EnrollmentStatus::Pending | EnrollmentStatus::Approved)
    }

    /// 是否为已确认状态 (确认后池不可调整容量)
    pub fn is_confirmed(&self) -> bool {
        matches!(
            self,
            EnrollmentStatus::Approved | EnrollmentStatus::Attended | EnrollmentStatus::NotAttended
        )
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 状态动作 (Enrollment Action)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentAction {
    Approve,
    Reject,
    MarkAttended,
    MarkNotAttended,
    RevertAttendance,
    Cancel,
}

impl EnrollmentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentAction::Approve => "approve",
            EnrollmentAction::Reject => "reject",
            EnrollmentAction::MarkAttended => "mark_attended",
            EnrollmentAction::MarkNotAttended => "mark_not_attended",
            EnrollmentAction::RevertAttendance => "revert_attendance",
            EnrollmentAction::Cancel => "cancel",
        }
    }
}

impl fmt::Display for EnrollmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_db_string() {
        for status in EnrollmentStatus::ALL {
            assert_eq!(EnrollmentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(EnrollmentStatus::parse("unknown"), None);
    }

    #[test]
    fn test_active_statuses() {
        assert!(EnrollmentStatus::Pending.is_active());
        assert!(EnrollmentStatus::NotAttended.is_active());
        assert!(!EnrollmentStatus::Rejected.is_active());
        assert!(!EnrollmentStatus::Cancelled.is_active());
    }

    #[test]
    fn test_kind_determines_mode_and_flow() {
        assert_eq!(PoolKind::InternalFair.mode(), PoolMode::Labeled);
        assert_eq!(PoolKind::ExternalFair.mode(), PoolMode::Counted);
        assert_eq!(PoolKind::ExternalFair.flow(), EnrollmentFlow::Review);
        assert_eq!(PoolKind::Activity.flow(), EnrollmentFlow::Attendance);
        assert_eq!(
            EnrollmentFlow::Attendance.initial_status(),
            EnrollmentStatus::Enrolled
        );
    }
}
