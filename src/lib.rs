// ==========================================
// 报名分配引擎 - 核心库
// ==========================================
// 用途: 展会展位与活动名额的容量分配、报名状态机
// 技术栈: Rust + SQLite
// 红线: 容量不变式、同一展位不重复分配、非法迁移不落库
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 分配与状态机
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/表结构）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{EnrollmentAction, EnrollmentFlow, EnrollmentStatus, PoolKind, PoolMode};

// 领域实体
pub use domain::{ActionLog, ActionType, Availability, EnrollmentRecord, Slot, SlotPool};

// 引擎
pub use engine::{AllocationEngine, AllocationError, PendingSweeper, QueryService};

// API
pub use api::{ApiError, EnrollmentApi, PoolApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "报名分配引擎";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(!APP_NAME.is_empty());
    }
}
