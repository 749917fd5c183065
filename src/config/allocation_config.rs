use crate::domain::stand_code::{StandCodeScheme, DEFAULT_NUMBER_WIDTH, DEFAULT_ROW_WIDTH};
use serde::{Deserialize, Serialize};

/// 分配引擎运行参数
///
/// 存储位置：config_kv（scope_id='global'），缺省时使用 Default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// 每行展位数（编号规则）
    pub stand_row_width: u32,

    /// 展位序号位数（零填充）
    pub stand_number_width: usize,

    /// 存在已确认报名（approved / attended / not_attended）时禁止调整容量
    pub lock_resize_when_confirmed: bool,

    /// pending 报名过期小时数，0 表示不启用过期清理
    pub pending_expiry_hours: i64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            stand_row_width: DEFAULT_ROW_WIDTH,
            stand_number_width: DEFAULT_NUMBER_WIDTH,
            lock_resize_when_confirmed: true,
            pending_expiry_hours: 0,
        }
    }
}

impl AllocationConfig {
    pub fn stand_code_scheme(&self) -> StandCodeScheme {
        StandCodeScheme::new(self.stand_row_width, self.stand_number_width)
    }

    pub fn pending_expiry_enabled(&self) -> bool {
        self.pending_expiry_hours > 0
    }
}
