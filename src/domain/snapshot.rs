// ==========================================
// 报名分配引擎 - 池快照
// ==========================================
// 用途: 引擎与查询服务共用的唯一容量口径
// 口径:
// - 编号模式: 已用 = 已占用展位数
// - 计数模式: 已用 = 有效报名数 (rejected / cancelled 以外)
// ==========================================

use crate::domain::capacity_policy::Availability;
use crate::domain::enrollment::EnrollmentRecord;
use crate::domain::pool::SlotPool;
use crate::domain::types::PoolMode;
use serde::{Deserialize, Serialize};

/// 同一次读取得到的池状态与池内全部报名记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub pool: SlotPool,
    pub enrollments: Vec<EnrollmentRecord>,
}

impl PoolSnapshot {
    /// 有效报名数
    pub fn active_count(&self) -> u32 {
        self.enrollments.iter().filter(|e| e.is_active()).count() as u32
    }

    /// 已用容量
    pub fn used_capacity(&self) -> u32 {
        match self.pool.mode {
            PoolMode::Labeled => self.pool.occupied_count(),
            PoolMode::Counted => self.active_count(),
        }
    }

    /// 可用容量
    pub fn availability(&self) -> Availability {
        self.pool.policy().availability(self.used_capacity())
    }

    pub fn find_enrollment(&self, enrollment_id: &str) -> Option<&EnrollmentRecord> {
        self.enrollments
            .iter()
            .find(|e| e.enrollment_id == enrollment_id)
    }

    /// 申请人在本池中的有效报名
    pub fn active_enrollment_of(&self, subject_id: &str) -> Option<&EnrollmentRecord> {
        self.enrollments
            .iter()
            .find(|e| e.subject_id == subject_id && e.is_active())
    }
}
