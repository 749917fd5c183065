// ==========================================
// 报名分配引擎 - 容量策略
// ==========================================
// 职责: 按池类型校验容量、判断是否还有空位、计算可用数
// 规则:
// - capacity = 0 表示不限量 (仅计数模式)
// - 编号模式必须有至少 1 个展位, 且不超过 MAX_LABELED_SLOTS
// ==========================================

use crate::domain::types::{EnrollmentFlow, PoolKind, PoolMode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 编号模式单池展位上限
pub const MAX_LABELED_SLOTS: i64 = 10_000;

/// 池内操作错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotPoolError {
    #[error("容量配置无效: {reason}")]
    InvalidCapacity { reason: String },

    #[error("没有空闲位置")]
    PoolExhausted,

    #[error("容量调整与已占用位置冲突: {reason}")]
    CapacityInUse { reason: String },
}

// ==========================================
// Availability - 可用容量
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "count", rename_all = "snake_case")]
pub enum Availability {
    Unlimited,
    Limited(u32),
}

impl Availability {
    /// (count, unlimited) 形式, 不限量时 count 为 0
    pub fn as_tuple(&self) -> (u32, bool) {
        match self {
            Availability::Unlimited => (0, true),
            Availability::Limited(n) => (*n, false),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Availability::Unlimited)
    }
}

// ==========================================
// CapacityPolicy - 容量策略值对象
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityPolicy {
    pub kind: PoolKind,
    pub mode: PoolMode,
    pub capacity: u32,
}

impl CapacityPolicy {
    /// 校验原始容量并构造策略
    pub fn new(kind: PoolKind, capacity: i64) -> Result<Self, SlotPoolError> {
        let mode = kind.mode();
        let capacity = validate_capacity(mode, capacity)?;
        Ok(Self {
            kind,
            mode,
            capacity,
        })
    }

    pub fn flow(&self) -> EnrollmentFlow {
        self.kind.flow()
    }

    pub fn is_unlimited(&self) -> bool {
        self.capacity == 0
    }

    /// 已用 used 个时是否还能再分配一个
    pub fn has_room(&self, used: u32) -> bool {
        self.is_unlimited() || used < self.capacity
    }

    /// 已用 used 个时的可用容量
    pub fn availability(&self, used: u32) -> Availability {
        if self.is_unlimited() {
            Availability::Unlimited
        } else {
            Availability::Limited(self.capacity.saturating_sub(used))
        }
    }
}

/// 按池模式校验容量
pub fn validate_capacity(mode: PoolMode, capacity: i64) -> Result<u32, SlotPoolError> {
    if capacity < 0 {
        return Err(SlotPoolError::InvalidCapacity {
            reason: format!("容量不能为负数: {}", capacity),
        });
    }
    if mode == PoolMode::Labeled {
        if capacity == 0 {
            return Err(SlotPoolError::InvalidCapacity {
                reason: "编号模式至少需要 1 个展位".to_string(),
            });
        }
        if capacity > MAX_LABELED_SLOTS {
            return Err(SlotPoolError::InvalidCapacity {
                reason: format!("展位数 {} 超过上限 {}", capacity, MAX_LABELED_SLOTS),
            });
        }
    }
    u32::try_from(capacity).map_err(|_| SlotPoolError::InvalidCapacity {
        reason: format!("容量超出范围: {}", capacity),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_capacity_rejected() {
        let result = CapacityPolicy::new(PoolKind::Activity, -1);
        assert!(matches!(result, Err(SlotPoolError::InvalidCapacity { .. })));
    }

    #[test]
    fn test_labeled_requires_slots() {
        assert!(CapacityPolicy::new(PoolKind::InternalFair, 0).is_err());
        assert!(CapacityPolicy::new(PoolKind::InternalFair, MAX_LABELED_SLOTS + 1).is_err());
        assert!(CapacityPolicy::new(PoolKind::InternalFair, 3).is_ok());
    }

    #[test]
    fn test_counted_zero_is_unlimited() {
        let policy = CapacityPolicy::new(PoolKind::Activity, 0).unwrap();
        assert!(policy.is_unlimited());
        assert!(policy.has_room(1_000));
        assert_eq!(policy.availability(42), Availability::Unlimited);
        assert_eq!(policy.availability(42).as_tuple(), (0, true));
    }

    #[test]
    fn test_availability_never_negative() {
        let policy = CapacityPolicy::new(PoolKind::ExternalFair, 2).unwrap();
        assert!(policy.has_room(1));
        assert!(!policy.has_room(2));
        assert_eq!(policy.availability(1), Availability::Limited(1));
        assert_eq!(policy.availability(5), Availability::Limited(0));
    }
}
