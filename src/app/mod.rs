// ==========================================
// 报名分配引擎 - 应用层
// ==========================================
// 职责: 组装数据库、引擎与 API
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
