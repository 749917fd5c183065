// ==========================================
// 报名分配引擎 - 展位编号规则
// ==========================================
// 规则: 行优先编号, 第 i 个展位 → 行字母 (i / 行宽) + 序号 (i % 行宽 + 1)
// 示例: 行宽 10, 序号宽度 2 → A01..A10, B01..B10, ...
// 超过 Z 的行继续使用 AA, AB, ...
// ==========================================

use serde::{Deserialize, Serialize};

/// 默认每行展位数
pub const DEFAULT_ROW_WIDTH: u32 = 10;

/// 默认序号位数 (零填充)
pub const DEFAULT_NUMBER_WIDTH: usize = 2;

/// 展位编号规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandCodeScheme {
    pub row_width: u32,
    pub number_width: usize,
}

impl Default for StandCodeScheme {
    fn default() -> Self {
        Self {
            row_width: DEFAULT_ROW_WIDTH,
            number_width: DEFAULT_NUMBER_WIDTH,
        }
    }
}

impl StandCodeScheme {
    /// 创建编号规则, 行宽为 0 时回退到默认值
    pub fn new(row_width: u32, number_width: usize) -> Self {
        Self {
            row_width: if row_width == 0 { DEFAULT_ROW_WIDTH } else { row_width },
            number_width,
        }
    }

    /// 计算指定位置的展位编号
    pub fn code_for(&self, position: u32) -> String {
        let row = position / self.row_width;
        let number = position % self.row_width + 1;
        format!(
            "{}{:0width$}",
            row_letters(row),
            number,
            width = self.number_width
        )
    }
}

/// 行号 → 行字母 (0 → A, 25 → Z, 26 → AA)
fn row_letters(row: u32) -> String {
    let mut n = row + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}
