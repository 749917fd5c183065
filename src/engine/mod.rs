// ==========================================
// 报名分配引擎 - 引擎层
// ==========================================
// 职责: 容量分配与报名状态机, 不拼 SQL
// 红线: 所有写操作按池串行, 状态迁移只查 transition 表
// ==========================================

pub mod allocation;
pub mod clock;
pub mod error;
pub mod events;
pub mod pool_lock;
pub mod query;
pub mod sweeper;
pub mod transition;

// 重导出核心引擎
pub use allocation::{AllocationEngine, ResizeOutcome, SubmitOutcome, TransitionOutcome};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{AllocationError, AllocationResult};
pub use events::{
    EnrollmentEvent, EnrollmentEventPublisher, EnrollmentEventType, NoOpEventPublisher,
    OptionalEventPublisher,
};
pub use pool_lock::PoolLocks;
pub use query::{PoolSummary, QueryService, StandOccupancy, StatusCounts};
pub use sweeper::{PendingSweeper, SweepReport, PENDING_EXPIRED_REASON};
