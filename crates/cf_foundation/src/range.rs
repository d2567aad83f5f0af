// crates/cf_foundation/src/range.rs

//! 区间坐标的统一解析
//!
//! 块状赋值格式里的 `(start, end)` 可以是 `[0,1]` 相对坐标，也可以是
//! 1 起始的绝对节点索引。这是整个格式族里最易出错的逻辑，因此全系统
//! 只允许此处这一份实现。
//!
//! 歧义说明：`1. 1.` 既可解释为"第 1 个节点"也可解释为"100%"。
//! 继承原始读取器的行为：两个值都 ≤ 1.0 时按相对坐标处理，
//! 因此 `1. 1.` 表示整个范围的末端单元。这是格式自身的固有歧义，
//! 不在此"修复"。

use serde::{Deserialize, Serialize};

/// 区间坐标模式，来自各文件头部的 mode 标志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeMode {
    /// `[0,1]` 相对坐标，按 `floor(v*N)` 映射
    Relative,
    /// 1 起始绝对索引，转为 0 起始半开区间
    Absolute,
}

impl RangeMode {
    /// 从文件头的整数标志创建：0 = 相对，其余 = 绝对
    pub fn from_flag(flag: i64) -> Self {
        if flag == 0 {
            Self::Relative
        } else {
            Self::Absolute
        }
    }

    /// 写回文件头的整数标志
    pub fn to_flag(self) -> i64 {
        match self {
            Self::Relative => 0,
            Self::Absolute => 1,
        }
    }
}

/// 按给定模式将 `(start, end)` 解析为 0 起始半开区间，上界 `n`
///
/// 相对模式保证至少 1 个单元宽度；两种模式都会裁剪到 `[0, n]`，
/// 颠倒的端点先行交换（旧文件里存在倒序写法）。
pub fn resolve_with_mode(mode: RangeMode, start: f64, end: f64, n: usize) -> (usize, usize) {
    let (start, end) = if start > end { (end, start) } else { (start, end) };
    match mode {
        RangeMode::Relative => {
            // s/N 写回再解析时乘积可能落在整数下方一个 ulp，加微小偏置
            let mut s = (start.max(0.0) * n as f64 + 1e-9).floor() as usize;
            let mut e = (end.max(0.0) * n as f64 + 1e-9).floor() as usize;
            s = s.min(n.saturating_sub(1));
            e = e.min(n);
            if e == s {
                e += 1;
            }
            (s, e.min(n))
        }
        RangeMode::Absolute => {
            let s = ((start as i64 - 1).max(0) as usize).min(n.saturating_sub(1));
            let e = ((end as i64).max(0) as usize).min(n).max(s + 1);
            (s, e.min(n))
        }
    }
}

/// 无模式标志时的自动消歧
///
/// 两个值都 ≤ 1.0 ⇒ 相对坐标，否则 ⇒ 绝对索引。见模块文档的
/// `1. 1.` 歧义说明。
pub fn resolve_auto(start: f64, end: f64, n: usize) -> (usize, usize) {
    let mode = if start <= 1.0 && end <= 1.0 {
        RangeMode::Relative
    } else {
        RangeMode::Absolute
    };
    resolve_with_mode(mode, start, end, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_relative_range() {
        assert_eq!(resolve_auto(0.0, 1.0, 10), (0, 10));
    }

    #[test]
    fn test_absolute_indices() {
        assert_eq!(resolve_auto(1.0, 5.0, 10), (0, 5));
        assert_eq!(resolve_auto(3.0, 3.0, 10), (2, 3));
    }

    #[test]
    fn test_degenerate_relative_widened() {
        // 0.5 0.5 必须扩成 1 个单元
        assert_eq!(resolve_auto(0.5, 0.5, 10), (5, 6));
    }

    #[test]
    fn test_ambiguous_one_one_is_relative() {
        // 继承行为：1. 1. 按相对坐标处理
        assert_eq!(resolve_auto(1.0, 1.0, 10), (9, 10));
    }

    #[test]
    fn test_reversed_endpoints_swapped() {
        assert_eq!(resolve_auto(5.0, 1.0, 10), (0, 5));
        assert_eq!(resolve_with_mode(RangeMode::Relative, 0.8, 0.2, 10), (2, 8));
    }

    #[test]
    fn test_clipping() {
        assert_eq!(resolve_with_mode(RangeMode::Absolute, 1.0, 99.0, 10), (0, 10));
        assert_eq!(resolve_with_mode(RangeMode::Relative, 0.0, 2.5, 10), (0, 10));
    }

    #[test]
    fn test_mode_flag_roundtrip() {
        assert_eq!(RangeMode::from_flag(0), RangeMode::Relative);
        assert_eq!(RangeMode::from_flag(1), RangeMode::Absolute);
        assert_eq!(RangeMode::Relative.to_flag(), 0);
    }
}
