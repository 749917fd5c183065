// ==========================================
// 报名分配引擎 - pending 过期清理
// ==========================================
// 职责: 将超过 pending_expiry_hours 仍未审核的报名拒绝并释放展位
// 红线: 只通过 AllocationEngine::reject 走状态机, 不直接改表
// 说明: 不在引擎内后台运行, 由调用方 (启动流程 / 管理操作) 触发
// ==========================================

use crate::engine::allocation::{AllocationEngine, TransitionOutcome};
use crate::engine::error::{AllocationError, AllocationResult};
use crate::engine::query::QueryService;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 过期拒绝原因
pub const PENDING_EXPIRED_REASON: &str = "pending enrollment expired";

/// 清理结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub cutoff: Option<NaiveDateTime>, // None = 未启用
    pub expired: Vec<TransitionOutcome>,
    pub skipped: usize, // 扫描后已被审核 / 删除的记录
}

impl SweepReport {
    fn disabled() -> Self {
        Self {
            cutoff: None,
            expired: Vec::new(),
            skipped: 0,
        }
    }

    pub fn expired_count(&self) -> usize {
        self.expired.len()
    }
}

pub struct PendingSweeper {
    engine: Arc<AllocationEngine>,
    query: Arc<QueryService>,
    expiry_hours: i64,
}

impl PendingSweeper {
    pub fn new(engine: Arc<AllocationEngine>, query: Arc<QueryService>, expiry_hours: i64) -> Self {
        Self {
            engine,
            query,
            expiry_hours,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.expiry_hours > 0
    }

    /// 执行一次清理
    pub fn sweep(&self) -> AllocationResult<SweepReport> {
        if !self.is_enabled() {
            return Ok(SweepReport::disabled());
        }

        let cutoff = self.engine.now() - Duration::hours(self.expiry_hours);
        let candidates = self.query.list_pending_before(cutoff)?;
        let mut report = SweepReport {
            cutoff: Some(cutoff),
            expired: Vec::with_capacity(candidates.len()),
            skipped: 0,
        };

        for record in candidates {
            match self
                .engine
                .reject(&record.enrollment_id, Some(PENDING_EXPIRED_REASON))
            {
                Ok(outcome) => report.expired.push(outcome),
                Err(AllocationError::InvalidTransition { .. })
                | Err(AllocationError::NotFound { .. }) => {
                    tracing::debug!(
                        "过期清理跳过已变更记录: enrollment_id={}",
                        record.enrollment_id
                    );
                    report.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            "pending 过期清理完成: cutoff={}, expired={}, skipped={}",
            cutoff,
            report.expired.len(),
            report.skipped
        );
        Ok(report)
    }
}
