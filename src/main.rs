// ==========================================
// 报名分配引擎 - 主入口
// ==========================================
// 职责: 初始化日志与数据库, 按配置执行一次 pending 过期清理,
//       输出各容量池摘要
// ==========================================

use enrollment_allocation::app::{get_default_db_path, AppState};
use enrollment_allocation::logging;

/// 启动流程中系统操作的操作人
const SYSTEM_ACTOR: &str = "system";

fn main() {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", enrollment_allocation::APP_NAME);
    tracing::info!("系统版本: {}", enrollment_allocation::VERSION);
    tracing::info!("==================================================");

    if let Err(e) = run() {
        tracing::error!("启动失败: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path)?;

    if state.sweeper.is_enabled() {
        let report = state
            .enrollment_api
            .expire_pending(SYSTEM_ACTOR)
            .map_err(|e| format!("pending 过期清理失败: {}", e))?;
        tracing::info!(
            "pending 过期清理: expired={}, skipped={}",
            report.expired_count(),
            report.skipped
        );
    } else {
        tracing::info!("pending 过期清理未启用");
    }

    let pools = state
        .pool_api
        .list_pools()
        .map_err(|e| format!("读取容量池失败: {}", e))?;
    tracing::info!("容量池数量: {}", pools.len());

    for pool in pools {
        match state.pool_api.pool_summary(&pool.pool_id) {
            Ok(summary) => {
                let (available, unlimited) = summary.available.as_tuple();
                tracing::info!(
                    "pool_id={}, kind={}, capacity={}, occupied={}, available={}, active={}",
                    summary.pool_id,
                    summary.kind,
                    summary.capacity,
                    summary.occupied,
                    if unlimited {
                        "unlimited".to_string()
                    } else {
                        available.to_string()
                    },
                    summary.status_counts.active()
                );
            }
            Err(e) => tracing::warn!("读取容量池摘要失败: pool_id={}, error={}", pool.pool_id, e),
        }
    }

    Ok(())
}
