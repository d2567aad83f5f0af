// crates/cf_codec/src/lib.rs

//! CATFLOW 文件编解码层
//!
//! 每个模块对应磁盘格式族中的一种文件，提供 `parse`（字符串 → 模型）
//! 与 `write_to`（模型 → 流）的双向转换，以及基于路径的 `load`/`save`
//! 便捷封装。所有逐节点数据的形状由调用方传入的网格尺寸约束，
//! 形状不符是硬错误，绝不静默重排。
//!
//! # 模块概览
//!
//! - [`mesh`]: 曲线坐标网格几何 (`*.geo`)
//! - [`soil`]: 土壤类型逐节点赋值 (`*.bod`)
//! - [`surface`]: 地表节点属性赋值 (`*.pob`)
//! - [`macropore`]: 大孔隙参数场 (`*.mak`)
//! - [`heterogeneity`]: 标量缩放因子网格 (`kstat*/thstat*.dat`)
//! - [`boundary`]: 边界条件 (`boundary.rb`)
//! - [`initial`]: 初始条件，水分与溶质 (`*.ini`)
//! - [`control_volume`]: 控制体块表 (`*.cv`)
//! - [`printout`]: 输出时刻表 (`*.prt`)
//! - [`forcing`]: 驱动序列配置 (`timeser.def` 及其引用文件)
//! - [`soil_library`]: 土壤参数库 (`soils.def`)
//! - [`landuse`]: 土地利用库 (`lu_file.def` + `*.par`)
//! - [`wind`]: 风向因子库 (`winddir.def`)
//! - [`run_control`]: 主控制文件文法 (`run_NN.in`)
//!
//! 依赖顺序（叶子优先）：mesh → 各赋值/条件编解码器 → forcing →
//! run_control；聚合与编排在 `cf_project` 中。

#![warn(missing_docs)]

pub mod boundary;
pub mod control_volume;
pub mod forcing;
pub mod heterogeneity;
pub mod initial;
pub mod landuse;
pub mod macropore;
pub mod mesh;
pub mod printout;
pub mod run_control;
pub mod soil;
pub mod soil_library;
pub mod surface;
pub mod wind;

mod util;

pub use cf_foundation::{CfError, CfResult, Grid2, GridDims};
