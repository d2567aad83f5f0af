// crates/cf_foundation/src/lib.rs

//! CATFLOW 编解码器基础层
//!
//! 零业务逻辑的基础抽象，供所有文件编解码器共享。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型 (`CfError` / `CfResult`)
//! - [`grid`]: 稠密二维网格存储 (`Grid2`)，内部约定第 0 层为底层
//! - [`scan`]: 去注释的逐行扫描器 (`TokenLines`)
//! - [`range`]: 相对/绝对坐标区间的统一解析（全系统唯一实现）
//! - [`rle`]: 一维游程压缩
//!
//! # 设计原则
//!
//! 1. **单一实现**: 区间消歧是整个格式族最易出错的逻辑，
//!    只在 [`range`] 中实现一次并单独测试
//! 2. **无全局状态**: 所有函数均为纯函数或作用于显式传入的值

#![warn(missing_docs)]

pub mod error;
pub mod grid;
pub mod range;
pub mod rle;
pub mod scan;

pub use error::{CfError, CfResult};
pub use grid::{Grid2, GridDims};
pub use scan::TokenLines;

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::error::{CfError, CfResult};
    pub use crate::grid::{Grid2, GridDims};
    pub use crate::range::{resolve_auto, resolve_with_mode, RangeMode};
    pub use crate::rle::{compress_1d, Run};
    pub use crate::scan::{Line, TokenLines};
}
