// ==========================================
// 报名分配引擎 - 容量池领域模型
// ==========================================
// 红线: 编号模式下已占用展位数不得超过容量
// 红线: 缩容只能移除末尾的空闲展位
// 红线: 编号规则在建池时固定, 扩容沿用同一规则
// 用途: 展会展位 / 活动名额
// ==========================================

use crate::domain::capacity_policy::{validate_capacity, CapacityPolicy, SlotPoolError};
use crate::domain::stand_code::StandCodeScheme;
use crate::domain::types::{PoolKind, PoolMode};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// Slot - 展位
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub slot_id: String, // 展位ID (不透明)
    pub position: u32,   // 0 起的顺序号, 决定编号
    pub code: String,    // 展位编号 (如 A01)
    pub occupied: bool,  // 是否已占用
}

// ==========================================
// SlotPool - 容量池
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPool {
    // ===== 主键 =====
    pub pool_id: String, // 每个展会 / 活动一个

    // ===== 容量参数 =====
    pub kind: PoolKind,
    pub mode: PoolMode,
    pub capacity: u32, // 0 = 不限量 (仅计数模式)

    // ===== 展位 (仅编号模式) =====
    pub code_scheme: StandCodeScheme, // 建池时的编号规则
    pub slots: Vec<Slot>,

    // ===== 审计 =====
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl SlotPool {
    /// 按策略创建容量池, 编号模式下生成全部展位
    pub fn create(
        pool_id: &str,
        policy: &CapacityPolicy,
        scheme: &StandCodeScheme,
        now: NaiveDateTime,
    ) -> Self {
        let slots = match policy.mode {
            PoolMode::Labeled => (0..policy.capacity)
                .map(|position| new_slot(position, scheme))
                .collect(),
            PoolMode::Counted => Vec::new(),
        };

        Self {
            pool_id: pool_id.to_string(),
            kind: policy.kind,
            mode: policy.mode,
            capacity: policy.capacity,
            code_scheme: *scheme,
            slots,
            created_at: now,
            updated_at: now,
        }
    }

    /// 当前容量策略
    pub fn policy(&self) -> CapacityPolicy {
        CapacityPolicy {
            kind: self.kind,
            mode: self.mode,
            capacity: self.capacity,
        }
    }

    /// 已占用展位数 (计数模式恒为 0, 由报名记录推导)
    pub fn occupied_count(&self) -> u32 {
        self.slots.iter().filter(|s| s.occupied).count() as u32
    }

    pub fn find_slot(&self, slot_id: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.slot_id == slot_id)
    }

    /// 占用一个空闲展位 (顺序号最小者)
    ///
    /// # 返回
    /// - Ok(Slot): 被占用展位的快照
    /// - Err(PoolExhausted): 没有空闲展位
    pub fn reserve(&mut self) -> Result<Slot, SlotPoolError> {
        let slot = self
            .slots
            .iter_mut()
            .filter(|s| !s.occupied)
            .min_by_key(|s| s.position)
            .ok_or(SlotPoolError::PoolExhausted)?;
        slot.occupied = true;
        Ok(slot.clone())
    }

    /// 释放展位, 幂等
    ///
    /// # 返回
    /// - true: 展位从占用变为空闲
    /// - false: 展位本已空闲或不存在
    pub fn release(&mut self, slot_id: &str) -> bool {
        match self.slots.iter_mut().find(|s| s.slot_id == slot_id) {
            Some(slot) if slot.occupied => {
                slot.occupied = false;
                true
            }
            _ => false,
        }
    }

    /// 调整容量
    ///
    /// # 参数
    /// - `new_capacity`: 新容量 (原始值, 需校验)
    /// - `active_count`: 计数模式下的有效报名数
    ///
    /// # 规则
    /// - 编号模式扩容: 追加展位, 按建池时的编号规则顺延
    /// - 编号模式缩容: 只移除末尾空闲展位, 否则 CapacityInUse
    /// - 计数模式: 新容量 > 0 时不得低于有效报名数
    pub fn resize(&mut self, new_capacity: i64, active_count: u32) -> Result<(), SlotPoolError> {
        let new_capacity = validate_capacity(self.mode, new_capacity)?;

        match self.mode {
            PoolMode::Labeled => {
                self.slots.sort_by_key(|s| s.position);
                let current = self.slots.len() as u32;
                if new_capacity >= current {
                    for position in current..new_capacity {
                        self.slots.push(new_slot(position, &self.code_scheme));
                    }
                } else {
                    let removed = &self.slots[new_capacity as usize..];
                    if let Some(busy) = removed.iter().find(|s| s.occupied) {
                        return Err(SlotPoolError::CapacityInUse {
                            reason: format!("展位 {} 已被占用, 无法移除", busy.code),
                        });
                    }
                    self.slots.truncate(new_capacity as usize);
                }
            }
            PoolMode::Counted => {
                if new_capacity > 0 && active_count > new_capacity {
                    return Err(SlotPoolError::CapacityInUse {
                        reason: format!(
                            "有效报名 {} 个, 超过新容量 {}",
                            active_count, new_capacity
                        ),
                    });
                }
            }
        }

        self.capacity = new_capacity;
        Ok(())
    }
}

fn new_slot(position: u32, scheme: &StandCodeScheme) -> Slot {
    Slot {
        slot_id: Uuid::new_v4().to_string(),
        position,
        code: scheme.code_for(position),
        occupied: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn labeled_pool(capacity: i64) -> SlotPool {
        let policy = CapacityPolicy::new(PoolKind::InternalFair, capacity).unwrap();
        SlotPool::create("FAIR-1", &policy, &StandCodeScheme::default(), now())
    }

    #[test]
    fn test_create_materializes_codes() {
        let pool = labeled_pool(3);
        let codes: Vec<&str> = pool.slots.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["A01", "A02", "A03"]);
        assert_eq!(pool.occupied_count(), 0);
    }

    #[test]
    fn test_counted_pool_has_no_slots() {
        let policy = CapacityPolicy::new(PoolKind::Activity, 25).unwrap();
        let pool = SlotPool::create("ACT-1", &policy, &StandCodeScheme::default(), now());
        assert!(pool.slots.is_empty());
        assert_eq!(pool.capacity, 25);
    }

    #[test]
    fn test_reserve_takes_lowest_free_and_exhausts() {
        let mut pool = labeled_pool(2);
        assert_eq!(pool.reserve().unwrap().code, "A01");
        assert_eq!(pool.reserve().unwrap().code, "A02");
        assert_eq!(pool.reserve(), Err(SlotPoolError::PoolExhausted));
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut pool = labeled_pool(2);
        let slot = pool.reserve().unwrap();
        assert!(pool.release(&slot.slot_id));
        assert!(!pool.release(&slot.slot_id));
        assert!(!pool.release("missing"));
        assert_eq!(pool.reserve().unwrap().code, "A01");
    }

    #[test]
    fn test_grow_continues_sequence() {
        let mut pool = labeled_pool(10);
        pool.resize(12, 0).unwrap();
        assert_eq!(pool.slots.len(), 12);
        assert_eq!(pool.slots[10].code, "B01");
        assert_eq!(pool.slots[11].code, "B02");
        assert_eq!(pool.capacity, 12);
    }

    #[test]
    fn test_grow_uses_scheme_fixed_at_create() {
        let policy = CapacityPolicy::new(PoolKind::InternalFair, 10).unwrap();
        let mut pool = SlotPool::create("FAIR-5", &policy, &StandCodeScheme::new(5, 2), now());
        assert_eq!(pool.slots[9].code, "B05");

        pool.resize(11, 0).unwrap();
        assert_eq!(pool.slots[10].code, "C01");
        assert_eq!(pool.code_scheme, StandCodeScheme::new(5, 2));
    }

    #[test]
    fn test_shrink_refuses_occupied_tail() {
        let mut pool = labeled_pool(3);
        for _ in 0..3 {
            pool.reserve().unwrap();
        }
        let result = pool.resize(2, 0);
        assert!(matches!(result, Err(SlotPoolError::CapacityInUse { .. })));
        assert_eq!(pool.slots.len(), 3);
        assert_eq!(pool.capacity, 3);
    }

    #[test]
    fn test_shrink_removes_free_tail() {
        let mut pool = labeled_pool(3);
        pool.reserve().unwrap();
        pool.resize(2, 0).unwrap();
        let codes: Vec<&str> = pool.slots.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["A01", "A02"]);
        assert_eq!(pool.occupied_count(), 1);
    }

    #[test]
    fn test_counted_shrink_below_active_rejected() {
        let policy = CapacityPolicy::new(PoolKind::ExternalFair, 5).unwrap();
        let mut pool = SlotPool::create("EXT-1", &policy, &StandCodeScheme::default(), now());
        assert!(pool.resize(3, 4).is_err());
        assert!(pool.resize(4, 4).is_ok());
        // 改为不限量总是允许
        assert!(pool.resize(0, 4).is_ok());
        assert_eq!(pool.capacity, 0);
    }
}
