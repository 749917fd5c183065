// ==========================================
// 报名分配引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、容量规则
// 红线: 不含数据访问逻辑, 不含并发控制
// ==========================================

pub mod action_log;
pub mod capacity_policy;
pub mod enrollment;
pub mod pool;
pub mod snapshot;
pub mod stand_code;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use capacity_policy::{Availability, CapacityPolicy, SlotPoolError, MAX_LABELED_SLOTS};
pub use enrollment::EnrollmentRecord;
pub use pool::{Slot, SlotPool};
pub use snapshot::PoolSnapshot;
pub use stand_code::StandCodeScheme;
pub use types::{EnrollmentAction, EnrollmentFlow, EnrollmentStatus, PoolKind, PoolMode};
