// ==========================================
// 报名分配引擎 - 状态迁移表
// ==========================================
// 红线: 合法迁移只在此表中定义, 表外的一律拒绝
// 审核流程 (展会): pending → approved | rejected | cancelled
// 签到流程 (活动): enrolled → attended | not_attended | cancelled
//                  attended ↔ not_attended
//                  attended | not_attended → enrolled (撤销)
//                  attended | not_attended → cancelled
// ==========================================

use crate::domain::types::{EnrollmentAction, EnrollmentFlow, EnrollmentStatus};

use EnrollmentAction as A;
use EnrollmentFlow as F;
use EnrollmentStatus as S;

/// 迁移规则: (流程, 起始状态, 动作) → 目标状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub flow: EnrollmentFlow,
    pub from: EnrollmentStatus,
    pub action: EnrollmentAction,
    pub to: EnrollmentStatus,
}

const fn rule(flow: F, from: S, action: A, to: S) -> TransitionRule {
    TransitionRule {
        flow,
        from,
        action,
        to,
    }
}

pub const TRANSITIONS: &[TransitionRule] = &[
    // 审核流程
    rule(F::Review, S::Pending, A::Approve, S::Approved),
    rule(F::Review, S::Pending, A::Reject, S::Rejected),
    rule(F::Review, S::Pending, A::Cancel, S::Cancelled),
    // 签到流程
    rule(F::Attendance, S::Enrolled, A::MarkAttended, S::Attended),
    rule(F::Attendance, S::Enrolled, A::MarkNotAttended, S::NotAttended),
    rule(F::Attendance, S::Attended, A::MarkNotAttended, S::NotAttended),
    rule(F::Attendance, S::NotAttended, A::MarkAttended, S::Attended),
    rule(F::Attendance, S::Attended, A::RevertAttendance, S::Enrolled),
    rule(F::Attendance, S::NotAttended, A::RevertAttendance, S::Enrolled),
    rule(F::Attendance, S::Enrolled, A::Cancel, S::Cancelled),
    rule(F::Attendance, S::Attended, A::Cancel, S::Cancelled),
    rule(F::Attendance, S::NotAttended, A::Cancel, S::Cancelled),
];

/// 查询迁移目标状态, 不合法时返回 None
pub fn next_status(
    flow: EnrollmentFlow,
    from: EnrollmentStatus,
    action: EnrollmentAction,
) -> Option<EnrollmentStatus> {
    TRANSITIONS
        .iter()
        .find(|r| r.flow == flow && r.from == from && r.action == action)
        .map(|r| r.to)
}

/// 当前状态下允许的动作 (前端按钮可用性)
pub fn allowed_actions(flow: EnrollmentFlow, from: EnrollmentStatus) -> Vec<EnrollmentAction> {
    TRANSITIONS
        .iter()
        .filter(|r| r.flow == flow && r.from == from)
        .map(|r| r.action)
        .collect()
}

/// 终态: 没有任何出边
pub fn is_terminal(flow: EnrollmentFlow, status: EnrollmentStatus) -> bool {
    allowed_actions(flow, status).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_flow() {
        assert_eq!(next_status(F::Review, S::Pending, A::Approve), Some(S::Approved));
        assert_eq!(next_status(F::Review, S::Pending, A::Reject), Some(S::Rejected));
        assert_eq!(next_status(F::Review, S::Approved, A::Approve), None);
        assert_eq!(next_status(F::Review, S::Approved, A::Reject), None);
        assert_eq!(next_status(F::Review, S::Approved, A::Cancel), None);
        assert_eq!(next_status(F::Review, S::Pending, A::MarkAttended), None);
        assert!(is_terminal(F::Review, S::Approved));
        assert!(is_terminal(F::Review, S::Rejected));
        assert!(!is_terminal(F::Review, S::Pending));
    }

    #[test]
    fn test_attendance_flow() {
        assert_eq!(
            next_status(F::Attendance, S::Enrolled, A::MarkAttended),
            Some(S::Attended)
        );
        assert_eq!(
            next_status(F::Attendance, S::Attended, A::MarkNotAttended),
            Some(S::NotAttended)
        );
        assert_eq!(
            next_status(F::Attendance, S::NotAttended, A::RevertAttendance),
            Some(S::Enrolled)
        );
        assert_eq!(next_status(F::Attendance, S::Enrolled, A::RevertAttendance), None);
        assert_eq!(next_status(F::Attendance, S::Attended, A::MarkAttended), None);
        assert_eq!(next_status(F::Attendance, S::Enrolled, A::Approve), None);
        assert!(is_terminal(F::Attendance, S::Cancelled));
    }

    #[test]
    fn test_cancel_allowed_from_every_active_activity_status() {
        for from in [S::Enrolled, S::Attended, S::NotAttended] {
            assert_eq!(next_status(F::Attendance, from, A::Cancel), Some(S::Cancelled));
        }
        assert_eq!(next_status(F::Attendance, S::Cancelled, A::Cancel), None);
    }

    #[test]
    fn test_no_rule_targets_its_own_state() {
        assert!(TRANSITIONS.iter().all(|r| r.from != r.to));
    }
}
