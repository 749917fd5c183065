// ==========================================
// 报名分配引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod action_log_repo;
pub mod allocation_store;
pub mod enrollment_repo;
pub mod error;
pub mod pool_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use allocation_store::{AllocationStore, PoolChange, SqliteAllocationStore};
pub use enrollment_repo::EnrollmentRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use pool_repo::SlotPoolRepository;
