// ==========================================
// 报名分配引擎 - 操作日志数据仓储
// ==========================================
// 表: action_log
// 红线: 所有已提交的写操作必须记录
// ==========================================

mod core;

#[cfg(test)]
mod tests;

pub use core::ActionLogRepository;
