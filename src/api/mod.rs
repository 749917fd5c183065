// ==========================================
// 报名分配引擎 - API 层
// ==========================================
// 职责: 对外业务接口 (入参校验 + 引擎调用 + 提交后审计)
// ==========================================

pub mod enrollment_api;
pub mod error;
pub mod pool_api;
pub mod post_commit;
pub mod validator;

// 重导出核心类型
pub use enrollment_api::EnrollmentApi;
pub use error::{ApiError, ApiResult};
pub use pool_api::PoolApi;
pub use post_commit::{AuditEntry, PostCommit};
